use anyhow::{Context, Result, bail};
use bossrush_game::{CombatMode, decode_to_seed, encode_friendly};
use std::collections::HashMap;

const SHARE_MODES: [CombatMode; 3] = [
    CombatMode::Passive,
    CombatMode::PlayerChooses,
    CombatMode::TraditionalRpg,
];

/// Detailed seed metadata used for simulation runs.
#[derive(Debug, Clone)]
pub struct SeedInfo {
    pub seed: u64,
    pub code: Option<String>,
    pub source_mode: Option<CombatMode>,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self {
            seed,
            code: None,
            source_mode: None,
        }
    }

    #[must_use]
    pub const fn from_share_code(seed: u64, mode: CombatMode, code: String) -> Self {
        Self {
            seed,
            code: Some(code),
            source_mode: Some(mode),
        }
    }

    /// Share codes only apply to the mode they were minted for.
    #[must_use]
    pub fn matches_mode(&self, mode: CombatMode) -> bool {
        self.source_mode.is_none_or(|source_mode| source_mode == mode)
    }

    #[must_use]
    pub fn share_code_for_mode(&self, mode: CombatMode) -> String {
        if let (Some(code), Some(source_mode)) = (&self.code, self.source_mode)
            && source_mode == mode
        {
            return code.clone();
        }

        encode_friendly(mode, self.seed)
    }
}

/// Resolve a list of CLI seed arguments into canonical seed metadata.
///
/// Supports literal integers, share codes, and the special keywords
/// `all` / `available` which expand to every share-code seed.
///
/// # Errors
///
/// Returns an error for tokens that are neither numbers nor share codes.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending: Vec<SeedInfo> = Vec::new();
    let mut request_all = false;

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if token.eq_ignore_ascii_case("all") || token.eq_ignore_ascii_case("available") {
            request_all = true;
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            pending.push(SeedInfo::from_numeric(value.unsigned_abs()));
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            pending.push(SeedInfo::from_numeric(value));
            continue;
        }

        if let Some((mode, seed)) = decode_to_seed(token) {
            pending.push(SeedInfo::from_share_code(seed, mode, token.to_uppercase()));
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    if request_all {
        pending.extend(generate_all_share_code_seeds()?);
    }

    let mut deduped: Vec<SeedInfo> = Vec::new();
    let mut index: HashMap<(u64, u8), usize> = HashMap::new();

    for info in pending {
        let key = (info.seed, mode_tag(info.source_mode));
        if let Some(entry) = index.get(&key).and_then(|existing| deduped.get_mut(*existing)) {
            if entry.code.is_none() && info.code.is_some() {
                *entry = info;
            }
        } else {
            index.insert(key, deduped.len());
            deduped.push(info);
        }
    }

    if deduped.is_empty() {
        deduped.push(SeedInfo::from_numeric(1337));
    }

    Ok(deduped)
}

fn generate_all_share_code_seeds() -> Result<Vec<SeedInfo>> {
    use bossrush_game::seed::{WORD_LIST, mode_prefix};

    let mut seeds = Vec::with_capacity(WORD_LIST.len() * 100 * SHARE_MODES.len());

    for word in WORD_LIST {
        for suffix in 0..100 {
            for mode in SHARE_MODES {
                let code = format!("{}-{word}{suffix:02}", mode_prefix(mode));
                let (mode, seed) = decode_to_seed(&code)
                    .with_context(|| format!("failed to parse share code: {code}"))?;
                seeds.push(SeedInfo::from_share_code(seed, mode, code));
            }
        }
    }

    Ok(seeds)
}

const fn mode_tag(mode: Option<CombatMode>) -> u8 {
    match mode {
        Some(CombatMode::Passive) => 1,
        Some(CombatMode::PlayerChooses) => 2,
        Some(CombatMode::TraditionalRpg) => 3,
        None => 0,
    }
}
