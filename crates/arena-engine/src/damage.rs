use crate::elements::get_type_multiplier;
use crate::types::{Ability, Champion, ChampionState, StatType};

/// Result of a single attack computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageRoll {
    pub damage: u32,
    pub mult_x100: u32,
}

/// Sum buff values for a given stat type (buffs only, not debuffs).
pub fn sum_buffs(state: &ChampionState, stat: StatType) -> u32 {
    state
        .buffs
        .iter()
        .filter(|b| b.stat == stat && !b.is_debuff)
        .fold(0u32, |acc, b| acc.saturating_add(b.value))
}

/// Sum debuff values for a given stat type (debuffs only).
pub fn sum_debuffs(state: &ChampionState, stat: StatType) -> u32 {
    state
        .buffs
        .iter()
        .filter(|b| b.stat == stat && b.is_debuff)
        .fold(0u32, |acc, b| acc.saturating_add(b.value))
}

/// Damage of one attack.
///
/// `floor(power * (1 + atk / 20) * mult - def)` evaluated in integers as
/// `power * (20 + atk) * mult_x100 / 2000 - def`, never below 1. Attack is
/// reduced by the attacker's attack debuffs, defense raised by the defender's
/// defense buffs.
pub fn calculate_damage(
    attacker: &Champion,
    defender: &Champion,
    defender_state: &ChampionState,
    ability: &Ability,
    attacker_state: &ChampionState,
) -> DamageRoll {
    let effective_atk = attacker
        .attack
        .saturating_sub(sum_debuffs(attacker_state, StatType::Attack));

    let mult_x100 = get_type_multiplier(attacker.element, defender.element);

    let effective_def = defender
        .defense
        .saturating_add(sum_buffs(defender_state, StatType::Defense));

    // u32 * (u32 + 20) * u32 needs at most 97 bits
    let raw = (ability.power as u128) * (20 + effective_atk as u128) * (mult_x100 as u128) / 2000;

    let damage = raw
        .saturating_sub(effective_def as u128)
        .clamp(1, u32::MAX as u128) as u32;

    DamageRoll { damage, mult_x100 }
}

/// Burn tick damage: 10% of max HP, floored, minimum 1.
pub fn calculate_burn_damage(state: &ChampionState) -> u32 {
    (state.max_hp / 10).max(1)
}
