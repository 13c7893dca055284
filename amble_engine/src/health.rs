//! Character vitals: ability scores, health points, consciousness and
//! condition tracking.
//!
//! Grounded in the teacher's `HealthState`/`HealthEffect` (damage, healing,
//! over-time effect application) but extended with the ability-score and
//! combat-facing fields [`crate::combat`] needs for attack resolution, since
//! the teacher's health model has no opposed-roll combat of its own.

use serde::{Deserialize, Serialize};

/// How awake/aware an entity currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, variantly::Variantly)]
pub enum ConsciousnessLevel {
    Awake,
    Drowsy,
    Asleep,
    Unconscious,
    Dead,
}

impl ConsciousnessLevel {
    pub fn can_act(&self) -> bool {
        matches!(self, Self::Awake | Self::Drowsy)
    }
}

/// Coarse narrative condition, independent of combat-specific status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, variantly::Variantly)]
pub enum GeneralCondition {
    Fine,
    Bruised,
    Wounded,
    GravelyWounded,
    Incapacitated,
}

/// Status imposed by a combat round's special events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, variantly::Variantly)]
pub enum CombatCondition {
    None,
    Staggered,
    Hesitant,
    Vulnerable,
    Disarmed,
    Fleeing,
}

impl Default for CombatCondition {
    fn default() -> Self {
        Self::None
    }
}

/// How severe a landed hit was, used to pick damage flavor text and the
/// intensity delta it contributes in [`crate::combat::next_round`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, variantly::Variantly)]
pub enum DamageCategory {
    Fatal,
    Critical,
    Grave,
    Moderate,
    Light,
    Scratch,
    None,
}

/// The ability scores, health pool, and combat-facing derived stats of the
/// player or an enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub strength: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
    pub armor_class: i32,
    pub attack_bonus: i32,
    pub max_health: i32,
    pub health: i32,
    pub consciousness: ConsciousnessLevel,
    pub general_condition: GeneralCondition,
    pub combat_condition: CombatCondition,
    /// [0, 1], raises escalation contribution and counter-attack aggression.
    pub morale: f64,
    /// [0, 1], lowers flee-chance roll difficulty.
    pub bravery: f64,
    /// Fraction of max health at/below which `determineEnemyAction` considers fleeing.
    pub flee_threshold: f64,
    pub can_be_pacified: bool,
    pub pacify_dc: i32,
}

impl CharacterSheet {
    pub fn ability_modifier(score: i32) -> i32 {
        (score - 10).div_euclid(2)
    }

    pub fn health_percent(&self) -> f64 {
        if self.max_health <= 0 {
            0.0
        } else {
            (self.health as f64 / self.max_health as f64).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        !matches!(self.consciousness, ConsciousnessLevel::Dead)
    }
}

/// A single vitals mutation, applied in order by [`apply_effects`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HealthEffect {
    Damage { amount: i32, category: DamageCategory },
    Heal { amount: i32 },
    SetConsciousness(ConsciousnessLevel),
    SetGeneralCondition(GeneralCondition),
    SetCombatCondition(CombatCondition),
}

/// Outcome of applying a batch of [`HealthEffect`]s: the resulting sheet and
/// whether the subject crossed into unconsciousness or death this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthTickResult {
    pub sheet: CharacterSheet,
    pub newly_unconscious: bool,
    pub newly_dead: bool,
}

pub fn apply_effects(mut sheet: CharacterSheet, effects: &[HealthEffect]) -> HealthTickResult {
    let was_conscious = sheet.consciousness.can_act();
    let was_alive = sheet.is_alive();

    for effect in effects {
        match effect {
            HealthEffect::Damage { amount, .. } => {
                sheet.health = (sheet.health - amount).max(0);
                if sheet.health == 0 && sheet.is_alive() {
                    sheet.consciousness = ConsciousnessLevel::Unconscious;
                }
            }
            HealthEffect::Heal { amount } => {
                sheet.health = (sheet.health + amount).min(sheet.max_health);
            }
            HealthEffect::SetConsciousness(level) => sheet.consciousness = *level,
            HealthEffect::SetGeneralCondition(cond) => sheet.general_condition = *cond,
            HealthEffect::SetCombatCondition(cond) => sheet.combat_condition = *cond,
        }
    }

    HealthTickResult {
        newly_unconscious: was_conscious && !sheet.consciousness.can_act() && sheet.is_alive(),
        newly_dead: was_alive && !sheet.is_alive(),
        sheet,
    }
}

/// Pick a [`DamageCategory`] from a damage amount relative to max health,
/// the way the teacher's flavor-text tables key off health fractions.
pub fn categorize_damage(amount: i32, max_health: i32) -> DamageCategory {
    if amount <= 0 {
        return DamageCategory::None;
    }
    let fraction = amount as f64 / max_health.max(1) as f64;
    match fraction {
        f if f >= 0.9 => DamageCategory::Fatal,
        f if f >= 0.6 => DamageCategory::Critical,
        f if f >= 0.35 => DamageCategory::Grave,
        f if f >= 0.2 => DamageCategory::Moderate,
        f if f >= 0.08 => DamageCategory::Light,
        _ => DamageCategory::Scratch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> CharacterSheet {
        CharacterSheet {
            strength: 14,
            constitution: 12,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
            armor_class: 13,
            attack_bonus: 2,
            max_health: 20,
            health: 20,
            consciousness: ConsciousnessLevel::Awake,
            general_condition: GeneralCondition::Fine,
            combat_condition: CombatCondition::None,
            morale: 0.5,
            bravery: 0.5,
            flee_threshold: 0.25,
            can_be_pacified: false,
            pacify_dc: 15,
        }
    }

    #[test]
    fn damage_to_zero_knocks_unconscious() {
        let result = apply_effects(
            sheet(),
            &[HealthEffect::Damage { amount: 20, category: DamageCategory::Fatal }],
        );
        assert_eq!(result.sheet.health, 0);
        assert!(result.newly_unconscious);
        assert!(!result.newly_dead);
    }

    #[test]
    fn heal_clamps_to_max() {
        let mut s = sheet();
        s.health = 5;
        let result = apply_effects(s, &[HealthEffect::Heal { amount: 1000 }]);
        assert_eq!(result.sheet.health, 20);
    }

    #[test]
    fn ability_modifier_matches_standard_table() {
        assert_eq!(CharacterSheet::ability_modifier(10), 0);
        assert_eq!(CharacterSheet::ability_modifier(14), 2);
        assert_eq!(CharacterSheet::ability_modifier(8), -1);
    }

    #[test]
    fn categorize_damage_buckets_by_fraction() {
        assert_eq!(categorize_damage(0, 20), DamageCategory::None);
        assert_eq!(categorize_damage(19, 20), DamageCategory::Fatal);
        assert_eq!(categorize_damage(1, 20), DamageCategory::Scratch);
    }
}
