//! The combat state machine: attack resolution, escalation, fatigue, and
//! enemy AI, expressed entirely through [`crate::action::SideEffect`] and
//! [`crate::change::StateChange`] rather than a bespoke mutation path.
//!
//! Grounded in the teacher's `HealthState`/`HealthEffect` (health.rs) for
//! damage application and its `gametools::Spinner`-driven flavor text; the
//! opposed-roll resolution math itself has no teacher equivalent and is new
//! code written in the same free-function-over-snapshot style the teacher
//! uses for `world.rs`'s scope queries.

use serde::{Deserialize, Serialize};

use crate::action::SideEffect;
use crate::change::StateChange;
use crate::health::{
    apply_effects, categorize_damage, CharacterSheet, CombatCondition, ConsciousnessLevel,
    DamageCategory, GeneralCondition, HealthEffect,
};
use crate::id::ItemId;
use crate::rng::RngStream;
use crate::vocab::Direction;
use crate::world::{GameState, Parent};

/// Live bookkeeping for an ongoing fight between the player and one enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    pub enemy_id: ItemId,
    pub round_count: u32,
    pub player_weapon_id: Option<ItemId>,
    pub enemy_weapon_id: Option<ItemId>,
    pub combat_intensity: f64,
    pub player_fatigue: f64,
    pub enemy_fatigue: f64,
}

impl CombatState {
    pub fn new(enemy_id: ItemId) -> Self {
        Self {
            enemy_id,
            round_count: 0,
            player_weapon_id: None,
            enemy_weapon_id: None,
            combat_intensity: 0.0,
            player_fatigue: 0.0,
            enemy_fatigue: 0.0,
        }
    }

    /// Starts a fight already carrying whatever weapon each side is holding
    /// (`Item.is_weapon`), so a disarm on the very first round has a real
    /// item to knock loose.
    pub fn start(state: &GameState, enemy_id: ItemId) -> Self {
        let mut combat = Self::new(enemy_id);
        combat.player_weapon_id = held_weapon_id(state, Parent::Player);
        combat.enemy_weapon_id = held_weapon_id(state, Parent::Item(enemy_id));
        combat
    }
}

/// The lowest-id item marked `is_weapon` that `holder` is currently
/// carrying/wielding, or `None` if it holds nothing of the sort.
pub fn held_weapon_id(state: &GameState, holder: Parent) -> Option<ItemId> {
    state
        .items
        .values()
        .filter(|item| item.is_weapon && item.parent == holder)
        .map(|item| item.id)
        .min()
}

/// What the player declared this combat round.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatAction {
    Attack,
    Defend,
    Flee(Option<Direction>),
    Talk(Option<String>),
    UseItem(ItemId),
    Special(String),
    Other,
}

/// One side's outcome for the round, before translation into changes.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    PlayerAttacks { damage: i32, category: DamageCategory },
    PlayerMisses,
    EnemyAttacks { damage: i32, category: DamageCategory },
    EnemyMisses,
    PlayerDisarmed { weapon: Option<ItemId>, was_fumble: bool },
    EnemyDisarmed { weapon: Option<ItemId>, was_fumble: bool },
    Staggered { who: Combatant },
    Hesitant { who: Combatant },
    Vulnerable { who: Combatant },
    EnemySlain { damage: i32 },
    EnemyUnconscious,
    PlayerSlain,
    PlayerUnconscious,
    EnemyFled { direction: Option<Direction> },
    PlayerFled { direction: Option<Direction> },
    EnemySurrendered,
    EnemyPacified,
    Taunt { who: Combatant },
    CombatInterrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combatant {
    Player,
    Enemy,
}

/// Attack-roll inputs beyond the raw ability scores; callers assemble these
/// from item attributes (weapon bonus), `CombatState` (intensity/fatigue),
/// and situational modifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackContext {
    pub weapon_bonus: i32,
    pub intensity_bonus: i32,
    pub offense_modifier: i32,
    pub defense_adjustment: i32,
    pub fatigue: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct AttackRoll {
    pub natural: i64,
    pub total: i32,
    pub hit: bool,
    pub critical: bool,
    pub critical_miss: bool,
}

/// Attack roll = d20 + attack bonus + weapon bonus + intensity bonus +
/// offense modifier − fatigue penalty, compared against effective AC.
pub fn roll_attack(
    rng: &mut dyn RngStream,
    attacker: &CharacterSheet,
    defender_ac: i32,
    ctx: AttackContext,
) -> AttackRoll {
    let natural = rng.random_int(1..=20);
    let fatigue_penalty = (ctx.fatigue * 5.0).round() as i32;
    let total = natural as i32
        + attacker.attack_bonus
        + ctx.weapon_bonus
        + ctx.intensity_bonus
        + ctx.offense_modifier
        - fatigue_penalty;
    let effective_ac = defender_ac + ctx.defense_adjustment;
    let critical = natural == 20;
    let critical_miss = natural == 1;
    AttackRoll {
        natural,
        total,
        hit: !critical_miss && (critical || total >= effective_ac),
        critical,
        critical_miss,
    }
}

/// Rolled weapon damage plus all flat/multiplicative bonuses described in
/// §4.9.1, producing a damage amount and its flavor category.
#[derive(Debug, Clone, Copy, Default)]
pub struct DamageContext {
    pub weapon_damage: i32,
    pub damage_bonus: i32,
    pub margin_of_hit_bonus: i32,
    pub intensity_bonus: i32,
    pub damage_adjustment_flat: i32,
    pub damage_adjustment_multiplier: f64,
    pub weapon_weakness_multiplier: f64,
}

pub fn resolve_damage(roll: &AttackRoll, effective_ac: i32, ctx: DamageContext, max_health: i32) -> (i32, DamageCategory) {
    let margin = (roll.total - effective_ac).max(0) + ctx.margin_of_hit_bonus;
    let base = ctx.weapon_damage + ctx.damage_bonus + margin + ctx.intensity_bonus + ctx.damage_adjustment_flat;
    let critical_multiplier = if roll.critical { 2.0 + ctx.intensity_bonus.max(0) as f64 * 0.01 } else { 1.0 };
    let amount = ((base as f64)
        * ctx.damage_adjustment_multiplier.max(0.01)
        * ctx.weapon_weakness_multiplier.max(0.01)
        * critical_multiplier)
        .round() as i32;
    let amount = amount.max(1);
    (amount, categorize_damage(amount, max_health))
}

/// Situational threshold for a special event to trigger instead of (or
/// alongside) plain damage: base 25, reduced by escalation/intensity/
/// margin-of-hit/attacker luck, or an automatic trigger on a natural 20.
pub fn special_event_triggers(
    rng: &mut dyn RngStream,
    roll: &AttackRoll,
    combat_intensity: f64,
    margin_of_hit: i32,
    attacker_luck: i32,
) -> bool {
    if roll.critical {
        return true;
    }
    if !roll.hit {
        return false;
    }
    let threshold = (25.0 - combat_intensity * 10.0 - margin_of_hit as f64 - attacker_luck as f64).max(1.0);
    rng.random_double() * 100.0 < threshold
}

/// One combat round: classify the player's action, compute events for both
/// sides, recompute `CombatState`, translate to changes/effects/message.
pub fn resolve_round(
    state: &GameState,
    combat: &CombatState,
    player_action: CombatAction,
    rng: &mut dyn RngStream,
) -> RoundOutcome {
    let mut events = Vec::new();
    let player_sheet = &state.player.character_sheet;
    let enemy = state.item(combat.enemy_id);
    let enemy_sheet = enemy.and_then(|e| e.character_sheet.as_ref());

    let player_can_act = player_sheet.consciousness.can_act();
    if !player_can_act {
        events.push(CombatEvent::CombatInterrupted);
        return RoundOutcome { events, next_state: Some(combat.clone()), combat_ends: false };
    }

    let mut enemy_incapacitated = false;

    match &player_action {
        CombatAction::Attack => {
            if let Some(enemy_sheet) = enemy_sheet {
                let ctx = AttackContext {
                    weapon_bonus: 0,
                    intensity_bonus: (combat.combat_intensity * 4.0) as i32,
                    offense_modifier: 0,
                    defense_adjustment: 0,
                    fatigue: combat.player_fatigue,
                };
                let roll = roll_attack(rng, player_sheet, enemy_sheet.armor_class, ctx);
                if roll.hit {
                    let dctx = DamageContext {
                        weapon_damage: rng.random_int(2..=8) as i32,
                        intensity_bonus: ctx.intensity_bonus,
                        ..Default::default()
                    };
                    let (damage, category) = resolve_damage(&roll, enemy_sheet.armor_class, dctx, enemy_sheet.max_health);
                    events.push(CombatEvent::PlayerAttacks { damage, category });
                    if special_event_triggers(rng, &roll, combat.combat_intensity, 0, 0) {
                        if rng.random_percentage(30) {
                            events.push(CombatEvent::EnemyDisarmed {
                                weapon: combat.enemy_weapon_id,
                                was_fumble: false,
                            });
                        } else {
                            events.push(CombatEvent::Staggered { who: Combatant::Enemy });
                        }
                    }
                    let new_health = (enemy_sheet.health - damage).max(0);
                    if new_health == 0 {
                        if new_health as f64 / enemy_sheet.max_health.max(1) as f64 <= 0.0 {
                            events.push(CombatEvent::EnemySlain { damage });
                            enemy_incapacitated = true;
                        }
                    } else if new_health as f64 / enemy_sheet.max_health.max(1) as f64 <= 0.25 && roll.critical {
                        events.push(CombatEvent::EnemyUnconscious);
                        enemy_incapacitated = true;
                    }
                } else if roll.critical_miss {
                    if rng.random_percentage(30) {
                        events.push(CombatEvent::PlayerDisarmed {
                            weapon: combat.player_weapon_id,
                            was_fumble: true,
                        });
                    } else {
                        events.push(CombatEvent::PlayerMisses);
                    }
                } else {
                    events.push(CombatEvent::PlayerMisses);
                    if rng.random_percentage(20) {
                        events.push(CombatEvent::Staggered { who: Combatant::Enemy });
                    }
                }
            }
        }
        CombatAction::Flee(direction) => {
            events.push(CombatEvent::PlayerFled { direction: *direction });
        }
        CombatAction::Talk(_) => {
            if let Some(enemy_sheet) = enemy_sheet {
                if enemy_sheet.can_be_pacified {
                    let modifier = CharacterSheet::ability_modifier(player_sheet.charisma);
                    if rng.random_int(1..=20) + modifier as i64 >= enemy_sheet.pacify_dc as i64 {
                        events.push(CombatEvent::EnemyPacified);
                        enemy_incapacitated = true;
                    }
                }
            }
        }
        _ => {}
    }

    if !enemy_incapacitated {
        if let Some(enemy_sheet) = enemy_sheet {
            let enemy_event = determine_enemy_action(state, combat, enemy_sheet, player_sheet, &player_action, rng);
            if let Some(event) = enemy_event {
                events.push(event);
            }
        }
    }

    if rng.roll_d20(19) {
        events.push(CombatEvent::Taunt { who: Combatant::Enemy });
    }

    let combat_ends = events.iter().any(|e| {
        matches!(
            e,
            CombatEvent::EnemySlain { .. }
                | CombatEvent::EnemyUnconscious
                | CombatEvent::PlayerSlain
                | CombatEvent::PlayerUnconscious
                | CombatEvent::EnemyFled { .. }
                | CombatEvent::PlayerFled { .. }
                | CombatEvent::EnemySurrendered
                | CombatEvent::EnemyPacified
        )
    });

    let next_state = if combat_ends {
        None
    } else {
        let (intensity_delta, player_fatigue_delta, enemy_fatigue_delta) = deltas_for(&events);
        let player_weapon = held_weapon_id(state, Parent::Player);
        let enemy_weapon = held_weapon_id(state, Parent::Item(combat.enemy_id));
        Some(next_round(combat, intensity_delta, player_fatigue_delta, enemy_fatigue_delta, player_weapon, enemy_weapon))
    };

    RoundOutcome { events, next_state, combat_ends }
}

pub struct RoundOutcome {
    pub events: Vec<CombatEvent>,
    pub next_state: Option<CombatState>,
    pub combat_ends: bool,
}

/// `determineEnemyAction` (§4.9.1): flee, surrender, pacify already handled
/// by the player's own `Talk`, or a counter-attack.
fn determine_enemy_action(
    _state: &GameState,
    combat: &CombatState,
    enemy_sheet: &CharacterSheet,
    player_sheet: &CharacterSheet,
    player_action: &CombatAction,
    rng: &mut dyn RngStream,
) -> Option<CombatEvent> {
    if !enemy_sheet.consciousness.can_act() {
        return None;
    }

    if enemy_sheet.health_percent() <= enemy_sheet.flee_threshold || combat.enemy_fatigue > 0.8 {
        let fatigue_bonus = (combat.enemy_fatigue * 5.0) as i64;
        if rng.random_int(1..=20) + fatigue_bonus >= 12 {
            return Some(CombatEvent::EnemyFled { direction: None });
        }
    }

    let surrender_threshold = if enemy_sheet.intelligence > 14 { 0.35 } else { 0.25 };
    if enemy_sheet.health_percent() <= surrender_threshold && enemy_sheet.intelligence > 14 {
        let wisdom_modifier = CharacterSheet::ability_modifier(enemy_sheet.wisdom);
        let fatigue_bonus = (combat.enemy_fatigue * 5.0) as i64;
        if rng.random_int(1..=20) + wisdom_modifier as i64 + fatigue_bonus > 15 {
            return Some(CombatEvent::EnemySurrendered);
        }
    }

    if !matches!(player_action, CombatAction::Attack) {
        let roll_a = rng.random_int(1..=20);
        let roll_b = rng.random_int(1..=20);
        let best = roll_a.max(roll_b);
        if best >= 14 {
            let condition = if best >= 18 {
                CombatEvent::Vulnerable { who: Combatant::Player }
            } else if best >= 16 {
                CombatEvent::Hesitant { who: Combatant::Player }
            } else {
                CombatEvent::Staggered { who: Combatant::Player }
            };
            return Some(condition);
        }
    }

    let ctx = AttackContext {
        weapon_bonus: 0,
        intensity_bonus: (combat.combat_intensity * 4.0) as i32,
        offense_modifier: 0,
        defense_adjustment: 0,
        fatigue: combat.enemy_fatigue,
    };
    let roll = roll_attack(rng, enemy_sheet, player_sheet.armor_class, ctx);
    if roll.hit {
        let dctx = DamageContext {
            weapon_damage: rng.random_int(2..=6) as i32,
            intensity_bonus: ctx.intensity_bonus,
            ..Default::default()
        };
        let (damage, category) = resolve_damage(&roll, player_sheet.armor_class, dctx, player_sheet.max_health);
        if player_sheet.health - damage <= 0 {
            return Some(if player_sheet.health_percent() <= 0.1 {
                CombatEvent::PlayerUnconscious
            } else {
                CombatEvent::EnemyAttacks { damage, category }
            });
        }
        Some(CombatEvent::EnemyAttacks { damage, category })
    } else {
        Some(CombatEvent::EnemyMisses)
    }
}

/// Per-event intensity/fatigue deltas accumulated across the round.
fn deltas_for(events: &[CombatEvent]) -> (f64, f64, f64) {
    let mut intensity = 0.02;
    let mut player_fatigue = 0.03;
    let mut enemy_fatigue = 0.03;
    for event in events {
        match event {
            CombatEvent::PlayerAttacks { category, .. } | CombatEvent::EnemyAttacks { category, .. } => {
                if matches!(category, DamageCategory::Critical | DamageCategory::Fatal) {
                    intensity += 0.20;
                } else if matches!(category, DamageCategory::Grave) {
                    intensity += 0.15;
                }
            }
            CombatEvent::PlayerDisarmed { .. } | CombatEvent::EnemyDisarmed { .. } => intensity += 0.25,
            _ => {}
        }
    }
    if intensity > 0.7 {
        intensity += 0.1;
    }
    (intensity, player_fatigue, enemy_fatigue)
}

/// `nextRound` (§4.9.2): accumulate deltas, clamp every scalar into [0,1],
/// advance `roundCount`. `new_player_weapon`/`new_enemy_weapon` replace the
/// prior round's weapon ids outright -- `None` means that side now holds no
/// weapon (e.g. it was just disarmed), not "unchanged".
pub fn next_round(
    combat: &CombatState,
    intensity_delta: f64,
    player_fatigue_delta: f64,
    enemy_fatigue_delta: f64,
    new_player_weapon: Option<ItemId>,
    new_enemy_weapon: Option<ItemId>,
) -> CombatState {
    CombatState {
        enemy_id: combat.enemy_id,
        round_count: combat.round_count + 1,
        player_weapon_id: new_player_weapon,
        enemy_weapon_id: new_enemy_weapon,
        combat_intensity: (combat.combat_intensity + intensity_delta).clamp(0.0, 1.0),
        player_fatigue: (combat.player_fatigue + player_fatigue_delta).clamp(0.0, 1.0),
        enemy_fatigue: (combat.enemy_fatigue + enemy_fatigue_delta).clamp(0.0, 1.0),
    }
}

/// Translate one [`CombatEvent`] into a message plus the changes/effects
/// the engine must apply (§4.9.3).
pub fn translate_event(event: &CombatEvent, combat: &CombatState, current_location: crate::id::LocationId) -> (String, Vec<StateChange>, Vec<SideEffect>) {
    match event {
        CombatEvent::PlayerAttacks { damage, category } => (
            format!("You strike a {:?} blow for {} damage.", category, damage),
            vec![],
            vec![],
        ),
        CombatEvent::EnemyAttacks { damage, category } => (
            format!("The enemy lands a {:?} blow for {} damage.", category, damage),
            vec![],
            vec![],
        ),
        CombatEvent::PlayerMisses => ("Your attack misses.".into(), vec![], vec![]),
        CombatEvent::EnemyMisses => ("The enemy's attack misses.".into(), vec![], vec![]),
        CombatEvent::EnemySlain { damage } => (
            format!("The enemy is slain ({} damage)!", damage),
            vec![StateChange::SetCombatState(None)],
            vec![],
        ),
        CombatEvent::EnemyUnconscious => (
            "The enemy falls unconscious.".into(),
            vec![StateChange::SetCombatState(None)],
            vec![SideEffect::StartFuse { id: crate::id::FuseId::new(), turns: 4 }],
        ),
        CombatEvent::PlayerDisarmed { weapon, .. } => (
            "Your weapon is knocked from your hand!".into(),
            weapon
                .map(|w| vec![StateChange::MoveItem { id: w, to_parent: Parent::Location(current_location), expected_old_parent: None }])
                .unwrap_or_default(),
            vec![],
        ),
        CombatEvent::EnemyDisarmed { weapon, .. } => (
            "You knock the weapon from the enemy's grip!".into(),
            weapon
                .map(|w| vec![StateChange::MoveItem { id: w, to_parent: Parent::Location(current_location), expected_old_parent: None }])
                .unwrap_or_default(),
            vec![],
        ),
        CombatEvent::Staggered { who } => (format!("{:?} reels, staggered.", who), vec![], vec![]),
        CombatEvent::Hesitant { who } => (format!("{:?} hesitates.", who), vec![], vec![]),
        CombatEvent::Vulnerable { who } => (format!("{:?} is left wide open.", who), vec![], vec![]),
        CombatEvent::PlayerSlain => ("You have been slain.".into(), vec![StateChange::SetCombatState(None)], vec![]),
        CombatEvent::PlayerUnconscious => ("You collapse, unconscious.".into(), vec![StateChange::SetCombatState(None)], vec![]),
        CombatEvent::EnemyFled { .. } => ("The enemy flees!".into(), vec![StateChange::SetCombatState(None)], vec![]),
        CombatEvent::PlayerFled { .. } => ("You break off and flee.".into(), vec![StateChange::SetCombatState(None)], vec![]),
        CombatEvent::EnemySurrendered => ("The enemy throws down its arms and surrenders.".into(), vec![StateChange::SetCombatState(None)], vec![]),
        CombatEvent::EnemyPacified => ("Your words calm the enemy; the fight ends.".into(), vec![StateChange::SetCombatState(None)], vec![]),
        CombatEvent::Taunt { who } => (format!("{:?} taunts you.", who), vec![], vec![]),
        CombatEvent::CombatInterrupted => ("You are in no condition to act.".into(), vec![], vec![]),
    }
}

pub fn apply_health_event(sheet: CharacterSheet, event: &CombatEvent) -> CharacterSheet {
    let effects = match event {
        CombatEvent::PlayerAttacks { .. } | CombatEvent::EnemyMisses | CombatEvent::PlayerMisses => vec![],
        CombatEvent::EnemyAttacks { damage, category } => {
            vec![HealthEffect::Damage { amount: *damage, category: *category }]
        }
        CombatEvent::EnemySlain { damage } => {
            vec![
                HealthEffect::Damage { amount: *damage, category: DamageCategory::Fatal },
                HealthEffect::SetConsciousness(ConsciousnessLevel::Dead),
                HealthEffect::SetGeneralCondition(GeneralCondition::Incapacitated),
            ]
        }
        CombatEvent::EnemyUnconscious | CombatEvent::PlayerUnconscious => {
            vec![HealthEffect::SetConsciousness(ConsciousnessLevel::Unconscious)]
        }
        CombatEvent::PlayerSlain => vec![HealthEffect::SetConsciousness(ConsciousnessLevel::Dead)],
        CombatEvent::PlayerDisarmed { .. } | CombatEvent::EnemyDisarmed { .. } => {
            vec![HealthEffect::SetCombatCondition(CombatCondition::Disarmed)]
        }
        CombatEvent::Staggered { .. } => vec![HealthEffect::SetCombatCondition(CombatCondition::Staggered)],
        CombatEvent::Hesitant { .. } => vec![HealthEffect::SetCombatCondition(CombatCondition::Hesitant)],
        CombatEvent::Vulnerable { .. } => vec![HealthEffect::SetCombatCondition(CombatCondition::Vulnerable)],
        _ => vec![],
    };
    apply_effects(sheet, &effects).sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRngStream;

    fn sheet(health: i32) -> CharacterSheet {
        CharacterSheet {
            strength: 14,
            constitution: 12,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
            armor_class: 12,
            attack_bonus: 3,
            max_health: 20,
            health,
            consciousness: ConsciousnessLevel::Awake,
            general_condition: GeneralCondition::Fine,
            combat_condition: CombatCondition::None,
            morale: 0.5,
            bravery: 0.5,
            flee_threshold: 0.25,
            can_be_pacified: true,
            pacify_dc: 14,
        }
    }

    #[test]
    fn natural_20_is_always_a_hit_and_critical() {
        let mut rng = ScriptedRngStream::new(vec![20], vec![]);
        let roll = roll_attack(&mut rng, &sheet(20), 30, AttackContext::default());
        assert!(roll.hit);
        assert!(roll.critical);
    }

    #[test]
    fn natural_1_is_always_a_critical_miss() {
        let mut rng = ScriptedRngStream::new(vec![1], vec![]);
        let roll = roll_attack(&mut rng, &sheet(20), 1, AttackContext::default());
        assert!(!roll.hit);
        assert!(roll.critical_miss);
    }

    #[test]
    fn next_round_clamps_into_unit_interval() {
        let combat = CombatState::new(ItemId::new());
        let next = next_round(&combat, 2.0, 2.0, 2.0, None, None);
        assert_eq!(next.combat_intensity, 1.0);
        assert_eq!(next.player_fatigue, 1.0);
        assert_eq!(next.enemy_fatigue, 1.0);
        assert_eq!(next.round_count, 1);
    }

    #[test]
    fn disarm_deltas_raise_intensity_by_at_least_twenty_percent() {
        let events = vec![CombatEvent::EnemyDisarmed { weapon: None, was_fumble: false }];
        let (intensity, _, _) = deltas_for(&events);
        assert!(intensity >= 0.20);
    }

    #[test]
    fn starting_combat_picks_up_the_player_s_held_weapon() {
        use crate::world::{tests_support::empty_state, Item};

        let mut state = empty_state();
        let sword_id = ItemId::new();
        let mut sword = Item::new(sword_id, "sword", Parent::Player);
        sword.is_weapon = true;
        state.items.insert(sword_id, sword);

        let enemy_id = ItemId::new();
        let combat = CombatState::start(&state, enemy_id);
        assert_eq!(combat.player_weapon_id, Some(sword_id));
        assert_eq!(combat.enemy_weapon_id, None);
    }

    #[test]
    fn losing_the_held_weapon_clears_it_on_the_next_round() {
        let combat = CombatState { player_weapon_id: Some(ItemId::new()), ..CombatState::new(ItemId::new()) };
        let next = next_round(&combat, 0.0, 0.0, 0.0, None, combat.enemy_weapon_id);
        assert_eq!(next.player_weapon_id, None);
    }
}
