//! Reversible share codes for run seeds.
//! Code format: <MODE>-<WORD><NN>, e.g., PC-ORANGE42, RP-WRAITH07

use crate::data::CombatMode;

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash = (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME);
    }
    hash
}

fn sanitize_word(word: &str) -> String {
    word.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

// Word list for share codes
pub const WORD_LIST: [&str; 64] = [
    "ORANGE", "EMBER", "GOLEM", "WRAITH", "THORN", "LANTERN", "DUNE", "JESTER", "MIRROR", "ANVIL",
    "GAUNT", "SPIRIT", "CURSE", "HEX", "OMEN", "RELIC", "DAGGER", "FIST", "LUNGE", "FEINT",
    "STRIKE", "PARRY", "DODGE", "BLADE", "SHIELD", "CROWN", "THRONE", "TOWER", "CRYPT", "ARENA",
    "RUSH", "TIER", "DICE", "CARD", "DECK", "ROLL", "SMOKE", "SHADOW", "GLASS", "IRON", "SAND",
    "STORM", "FROST", "VENOM", "BLOOD", "BONE", "ASH", "RAVEN", "WOLF", "VIPER", "TALON",
    "FANG", "HOWL", "MOON", "SOLAR", "COMET", "NOVA", "RIFT", "VOID", "GLYPH", "RUNE", "SIGIL",
    "WARDEN", "DUELIST",
];

#[inline]
fn pack(word_index: u16, nn: u8) -> u16 {
    word_index & 0x01FF | ((u16::from(nn) & 0x7F) << 9)
}

#[inline]
fn unpack(packed: u16) -> (u16, u8) {
    (packed & 0x01FF, ((packed >> 9) & 0x7F) as u8)
}

/// Two-letter prefix for a mode.
#[must_use]
pub const fn mode_prefix(mode: CombatMode) -> &'static str {
    match mode {
        CombatMode::Passive => "PS",
        CombatMode::PlayerChooses => "PC",
        CombatMode::TraditionalRpg => "RP",
    }
}

fn mode_from_prefix(prefix: &str) -> Option<CombatMode> {
    match prefix.to_ascii_uppercase().as_str() {
        "PS" => Some(CombatMode::Passive),
        "PC" => Some(CombatMode::PlayerChooses),
        "RP" => Some(CombatMode::TraditionalRpg),
        _ => None,
    }
}

fn compose_seed(mode: CombatMode, word_index: u16, nn: u8) -> u64 {
    let packed = pack(word_index, nn);
    // Domain-separated FNV input
    let prefix = mode_prefix(mode).as_bytes();
    let mut buf = [0u8; 11];
    buf[..6].copy_from_slice(b"BRUSH-");
    buf[6..8].copy_from_slice(prefix);
    buf[8] = (packed & 0xFF) as u8;
    buf[9] = (packed >> 8) as u8;
    buf[10] = 0xA5;
    let h = fnv1a64(&buf);
    (h & 0xFFFF_FFFF_FFFF_0000) | u64::from(packed)
}

#[must_use]
pub fn encode_friendly(mode: CombatMode, seed: u64) -> String {
    let packed = (seed & 0xFFFF) as u16;
    let (wi, mut nn) = unpack(packed);
    let word = WORD_LIST
        .get(usize::from(wi) % WORD_LIST.len())
        .copied()
        .unwrap_or("ORANGE");
    if nn > 99 {
        nn %= 100;
    }
    format!("{}-{word}{nn:02}", mode_prefix(mode))
}

/// Parse a share code into its mode and seed.
#[must_use]
pub fn decode_to_seed(code: &str) -> Option<(CombatMode, u64)> {
    let s = code.trim();
    let (m, rest) = s.split_once('-')?;
    let mode = mode_from_prefix(m)?;
    if rest.len() < 3 {
        return None;
    }
    let (word_part, nn_part) = rest.split_at(rest.len() - 2);
    let nn: u8 = nn_part.parse().ok()?;
    let word = sanitize_word(word_part);
    let idx = WORD_LIST.iter().position(|w| sanitize_word(w) == word)?;
    let wi = u16::try_from(idx).ok()?;
    Some((mode, compose_seed(mode, wi, nn)))
}

#[must_use]
pub fn generate_code_from_entropy(mode: CombatMode, entropy: u64) -> String {
    let wi = u16::try_from(entropy % WORD_LIST.len() as u64).unwrap_or(0);
    let nn = ((entropy >> 17) % 100) as u8;
    let seed = compose_seed(mode, wi, nn);
    encode_friendly(mode, seed)
}
