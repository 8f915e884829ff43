use bossrush_game::events::find_combat_end;
use bossrush_game::{
    AbilityCosts, AbilityDefinition, AffinityMultiplier, AffinityType, CombatEvent, CombatMode,
    CombatOutcome, CombatPhase, CurseActivation, CurseCategory, CurseDefinition, CurseEffect,
    DiceModifiers, EngineConfig, EnemyDefinition, EnemyTier, EnemyTierProfile, GameData,
    RunCoordinator, SpendingPolicy, UsageError, data::AffinityRelation,
};

fn warden(threshold: i32, attempts: i32, failure_damage: i32) -> EnemyDefinition {
    EnemyDefinition {
        id: 7,
        name: String::from("Iron Warden"),
        default_affinity: AffinityType::Force,
        relations: vec![
            AffinityRelation {
                affinity: AffinityType::Skill,
                multiplier: AffinityMultiplier::Weak,
            },
            AffinityRelation {
                affinity: AffinityType::Agility,
                multiplier: AffinityMultiplier::Strong,
            },
        ],
        is_spirit: false,
        tiers: vec![EnemyTierProfile {
            tier: EnemyTier::Tier1,
            health_threshold: threshold,
            dice_count: 2,
            max_attempts: attempts,
            failure_damage,
            rpg_health: Some(1),
            rpg_dice_count: Some(1),
        }],
    }
}

fn ability(id: u32, cards: u32, unlock_requirement: u32) -> AbilityDefinition {
    AbilityDefinition {
        id,
        name: format!("Technique {id}"),
        description: String::new(),
        affinity: AffinityType::Force,
        costs: AbilityCosts {
            cards,
            health: 0,
            turns: 0,
        },
        dice: DiceModifiers::default(),
        multiplier_bonus: 0.0,
        card_multiplier: None,
        success_gate: None,
        on_kill_heal: None,
        turn_skip: None,
        unlock_requirement,
        is_basic: false,
    }
}

fn reward_block() -> CurseDefinition {
    CurseDefinition {
        id: 9,
        name: String::from("Empty Purse"),
        description: String::new(),
        category: CurseCategory::Negative,
        activation: CurseActivation::PostCombat,
        effect: CurseEffect::BlockRewards,
        magnitude: 0,
        duration: 2,
        requires_player_activation: false,
        must_activate_on_turn_one: false,
        enemy_health_multiplier: 1.0,
        modes: Vec::new(),
    }
}

fn content(enemy: EnemyDefinition) -> GameData {
    GameData {
        enemies: vec![enemy],
        abilities: vec![ability(10, 1, 0), ability(11, 50, 0), ability(12, 0, 99)],
        curses: vec![reward_block()],
    }
}

fn quiet_config() -> EngineConfig {
    EngineConfig {
        random_card_chance: 0.0,
        ..EngineConfig::default()
    }
}

fn coordinator(enemy: EnemyDefinition, config: EngineConfig) -> RunCoordinator {
    RunCoordinator::new(content(enemy), config, 0x5EED).unwrap()
}

#[test]
fn passive_victory_always_rewards_a_card() {
    let mut run = coordinator(warden(0, 3, 10), quiet_config());
    run.start_new_run(CombatMode::Passive).unwrap();
    assert_eq!(run.combat().selected_affinity(), AffinityType::Force);

    let events = run.player_attempt().unwrap();
    let end = find_combat_end(&events).unwrap();
    assert_eq!(end.outcome, CombatOutcome::Victory);
    assert_eq!(end.score, 1);
    assert!(end.reward_card.is_some());
    assert_eq!(run.player().cards().total(), 6);
    assert_eq!(run.player().score, 1);
    assert_eq!(run.player().stats.combats_won, 1);
    assert!(run.discovery().discovered_for(7).is_empty());
}

#[test]
fn weakness_victory_waits_for_reward_choice() {
    let mut run = coordinator(warden(0, 3, 10), quiet_config());
    run.start_new_run(CombatMode::PlayerChooses).unwrap();
    run.select_attack_type(AffinityType::Skill).unwrap();

    let events = run.player_attempt().unwrap();
    assert!(events.contains(&CombatEvent::WaitingForCardSelection { score: 2 }));
    assert_eq!(
        run.continue_to_next_combat().unwrap_err().as_usage(),
        Some(&UsageError::RewardSelectionPending)
    );
    assert!(run.discovery().is_discovered(7, AffinityType::Skill));

    let force_before = run.player().card_count(AffinityType::Force);
    let events = run.select_reward_card(AffinityType::Force).unwrap();
    let end = find_combat_end(&events).unwrap();
    assert_eq!(end.reward_card, Some(AffinityType::Force));
    assert_eq!(end.score, 2);
    assert_eq!(run.player().card_count(AffinityType::Force), force_before + 1);
    assert_eq!(
        run.select_reward_card(AffinityType::Force).unwrap_err().as_usage(),
        Some(&UsageError::NoRewardPending)
    );
    run.continue_to_next_combat().unwrap();
    assert!(run.combat().is_in_progress());
}

#[test]
fn misses_exhaust_attempts_then_cost_failure_damage() {
    let mut run = coordinator(warden(10_000, 3, 10), quiet_config());
    run.start_new_run(CombatMode::PlayerChooses).unwrap();

    let first = run.player_attempt().unwrap();
    assert!(first.contains(&CombatEvent::AttemptsChanged { remaining: 2 }));
    run.player_attempt().unwrap();
    let last = run.player_attempt().unwrap();
    let end = find_combat_end(&last).unwrap();
    assert_eq!(end.outcome, CombatOutcome::Defeat);
    assert_eq!(end.life_lost, 10);
    assert_eq!(run.player().life(), 90);
    assert_eq!(run.player().stats.turns_used, 3);
    assert_eq!(run.combat().phase(), CombatPhase::Resolved(CombatOutcome::Defeat));

    assert_eq!(
        run.player_attempt().unwrap_err().as_usage(),
        Some(&UsageError::CombatAlreadyResolved)
    );
    run.continue_to_next_combat().unwrap();
    assert_eq!(run.combat().turns_used(), 0);
    assert_eq!(run.combat().current_turn(), 1);
}

#[test]
fn rejected_abilities_leave_state_untouched() {
    let mut run = coordinator(warden(10_000, 3, 10), quiet_config());
    run.start_new_run(CombatMode::PlayerChooses).unwrap();
    let cards = *run.player().cards();
    let life = run.player().life();

    let err = run.player_attempt_with(11).unwrap_err();
    assert!(matches!(err.as_usage(), Some(UsageError::AbilityUnusable { .. })));
    let err = run.player_attempt_with(12).unwrap_err();
    assert_eq!(err.as_usage(), Some(&UsageError::AbilityLocked(12)));

    assert_eq!(run.player().cards(), &cards);
    assert_eq!(run.player().life(), life);
    assert_eq!(run.combat().turn(), 0);
    assert_eq!(run.combat().enemy().map(|enemy| enemy.attempts_remaining), Some(3));
}

#[test]
fn per_instance_spending_is_refunded_on_victory() {
    let mut run = coordinator(warden(0, 3, 10), quiet_config());
    run.start_new_run(CombatMode::PlayerChooses).unwrap();
    run.with_player_mut(|player| player.add_cards(AffinityType::Force, 3));
    let before = run.player().card_count(AffinityType::Force);

    let events = run.player_attempt_with(10).unwrap();
    assert!(find_combat_end(&events).is_some_and(|end| end.victory()));
    assert_eq!(run.player().card_count(AffinityType::Force), before);
}

#[test]
fn absolute_spending_is_permanent() {
    let config = EngineConfig {
        spending_policy: SpendingPolicy::Absolute,
        ..quiet_config()
    };
    let mut run = coordinator(warden(0, 3, 10), config);
    run.start_new_run(CombatMode::PlayerChooses).unwrap();
    run.with_player_mut(|player| player.add_cards(AffinityType::Force, 3));
    let before = run.player().card_count(AffinityType::Force);

    run.player_attempt_with(10).unwrap();
    assert_eq!(run.player().card_count(AffinityType::Force), before - 1);
}

#[test]
fn rpg_hit_drains_health_and_scores_tier() {
    let mut run = coordinator(warden(10_000, 3, 10), quiet_config());
    run.start_new_run(CombatMode::TraditionalRpg).unwrap();
    assert_eq!(run.combat().enemy().map(|enemy| enemy.rpg_health), Some(1));

    let events = run.player_attempt().unwrap();
    let end = find_combat_end(&events).unwrap();
    assert_eq!(end.outcome, CombatOutcome::Victory);
    assert_eq!(end.score, 1);
    assert!(run.combat().enemy().is_some_and(|enemy| enemy.rpg_health <= 0));
}

#[test]
fn reward_block_covers_two_victories() {
    let mut run = coordinator(warden(0, 3, 10), quiet_config());
    run.start_new_run(CombatMode::Passive).unwrap();
    run.player_attempt().unwrap();
    assert_eq!(run.player().cards().total(), 6);

    let events = run.trigger_curse_choice_event().unwrap();
    assert_eq!(
        events[0],
        CombatEvent::CurseChoiceOffered {
            options: vec![9, 9, 9]
        }
    );
    run.choose_curse(1).unwrap();
    assert_eq!(run.player().stats.curses_obtained, 1);

    for remaining in [1_usize, 0] {
        run.continue_to_next_combat().unwrap();
        let events = run.player_attempt().unwrap();
        let end = find_combat_end(&events).unwrap();
        assert!(end.victory());
        assert_eq!(end.reward_card, None);
        assert_eq!(run.curses().active().len(), remaining);
    }
    assert_eq!(run.player().cards().total(), 6);

    run.continue_to_next_combat().unwrap();
    let events = run.player_attempt().unwrap();
    assert!(find_combat_end(&events).is_some_and(|end| end.reward_card.is_some()));
    assert_eq!(run.player().cards().total(), 7);
}

#[test]
fn unanswered_curse_choice_is_discarded_on_continue() {
    let mut run = coordinator(warden(0, 3, 10), quiet_config());
    run.start_new_run(CombatMode::Passive).unwrap();
    run.player_attempt().unwrap();
    run.trigger_curse_choice_event().unwrap();
    assert_eq!(run.pending_curse_choices().len(), 3);

    run.continue_to_next_combat().unwrap();
    assert!(run.pending_curse_choices().is_empty());
    assert_eq!(
        run.choose_curse(0).unwrap_err().as_usage(),
        Some(&UsageError::NoCurseChoicePending)
    );
    assert!(run.curses().active().is_empty());
}

#[test]
fn new_run_resets_player_but_keeps_unlocks() {
    let mut run = coordinator(warden(0, 3, 10), quiet_config());
    let events = run.start_new_run(CombatMode::PlayerChooses).unwrap();
    assert!(events.contains(&CombatEvent::AbilityUnlocked { ability_id: 10 }));
    run.player_attempt().unwrap();
    assert_eq!(run.player().score, 1);

    let events = run.start_new_run(CombatMode::Passive).unwrap();
    assert!(!events.contains(&CombatEvent::AbilityUnlocked { ability_id: 10 }));
    assert!(run.abilities().unlocked_ids().contains(&10));
    assert_eq!(run.player().score, 0);
    assert_eq!(run.player().life(), 100);
    assert_eq!(run.mode(), CombatMode::Passive);
}
