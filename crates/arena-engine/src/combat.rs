use crate::champions::get_champion;
use crate::damage::{calculate_burn_damage, calculate_damage};
use crate::draft::TEAM_SIZE;
use crate::error::{EngineError, Result};
use crate::types::{
    AbilityType, Buff, ChampionState, ForfeitReason, Side, Submission, TurnAction, TurnEvent,
    MAX_BUFFS,
};

use arrayvec::ArrayVec;

/// Both teams of a match, indexed by [`Side::index`].
pub type Teams = [[ChampionState; TEAM_SIZE]; 2];

/// Initialize champion combat state from champion definition.
pub fn init_champion_state(champion_id: u8) -> Result<ChampionState> {
    let champ = get_champion(champion_id).ok_or(EngineError::UnknownChampion(champion_id))?;
    Ok(ChampionState {
        id: champion_id,
        current_hp: champ.hp,
        max_hp: champ.hp,
        buffs: ArrayVec::new(),
        burn_turns: 0,
        is_ko: false,
        total_damage_dealt: 0,
    })
}

/// Check if every champion on a team is KO'd.
pub fn is_team_eliminated(states: &[ChampionState]) -> bool {
    states.iter().all(|s| s.is_ko)
}

/// Team slot that may act with `action`, or the reason the move is void.
pub fn validate_action(
    team: &[ChampionState],
    action: &TurnAction,
) -> std::result::Result<usize, ForfeitReason> {
    let slot = team
        .iter()
        .position(|s| s.id == action.champion_id)
        .ok_or(ForfeitReason::ChampionUnavailable)?;
    if team[slot].is_ko {
        return Err(ForfeitReason::ChampionUnavailable);
    }
    if action.ability_index as usize >= 2 {
        return Err(ForfeitReason::InvalidAbility);
    }
    Ok(slot)
}

/// An effect planned against the round-start snapshot.
#[derive(Clone, Copy, Debug)]
enum Effect {
    Hit {
        target_slot: usize,
        damage: u32,
        mult_x100: u32,
        burn_turns: u32,
    },
    Heal {
        amount: u32,
    },
    Buff(Buff),
    Debuff {
        target_slot: usize,
        debuff: Buff,
    },
}

struct Planned {
    side: Side,
    actor_slot: usize,
    effect: Effect,
}

/// Resolve one round with simultaneous moves.
///
/// Both effects are computed from the state at round start, then applied:
/// hits first (damage, burn application), then heals on champions still
/// standing, then burn ticks and buff expiry. Buffs and debuffs cast this
/// round are placed after expiry, so a duration of `n` covers the next `n`
/// rounds. Knockouts come last. `fallback_targets` gives the slot hit on a
/// side whose own move was forfeited.
pub fn resolve_round(
    teams: &mut Teams,
    submissions: [Submission; 2],
    fallback_targets: [usize; 2],
) -> Vec<TurnEvent> {
    let mut events = Vec::new();

    // Validate both sides before touching anything
    let mut acting: [Option<(usize, TurnAction)>; 2] = [None, None];
    for side in [Side::A, Side::B] {
        let team = &teams[side.index()];
        let verdict = match submissions[side.index()] {
            Submission::Action(action) => validate_action(team, &action).map(|slot| (slot, action)),
            Submission::Forfeit(reason) => Err(reason),
        };
        match verdict {
            Ok(entry) => acting[side.index()] = Some(entry),
            Err(reason) => events.push(TurnEvent::Forfeit { side, reason }),
        }
    }

    let snapshot = teams.clone();
    let mut planned: Vec<Planned> = Vec::with_capacity(2);
    for side in [Side::A, Side::B] {
        let Some((actor_slot, action)) = acting[side.index()] else {
            continue;
        };
        let foe = side.opponent();
        let target_slot = match acting[foe.index()] {
            Some((slot, _)) => slot,
            None => fallback_targets[foe.index()].min(TEAM_SIZE - 1),
        };
        if let Some(effect) = plan_effect(&snapshot, side, actor_slot, &action, target_slot) {
            planned.push(Planned {
                side,
                actor_slot,
                effect,
            });
        }
    }

    // Hits land first
    for p in planned.iter() {
        if let Effect::Hit {
            target_slot,
            damage,
            mult_x100,
            burn_turns,
        } = p.effect
        {
            let foe = p.side.opponent();
            let attacker_id = teams[p.side.index()][p.actor_slot].id;
            let target = &mut teams[foe.index()][target_slot];
            let dealt = damage.min(target.current_hp);
            target.current_hp -= dealt;
            let defender_id = target.id;
            let burn_lands = burn_turns > 0 && target.current_hp > 0;
            if burn_lands {
                target.burn_turns = target.burn_turns.max(burn_turns);
            }
            let attacker = &mut teams[p.side.index()][p.actor_slot];
            attacker.total_damage_dealt = attacker.total_damage_dealt.saturating_add(dealt);
            events.push(TurnEvent::Attack {
                attacker_id,
                defender_id,
                damage,
                mult_x100,
            });
            if burn_lands {
                events.push(TurnEvent::BurnApplied {
                    target_id: defender_id,
                    duration: burn_turns,
                });
            }
        }
    }

    // Heals only on champions that survived the hits
    for p in planned.iter() {
        let Effect::Heal { amount } = p.effect else {
            continue;
        };
        let actor = &mut teams[p.side.index()][p.actor_slot];
        if actor.current_hp == 0 {
            continue;
        }
        let old_hp = actor.current_hp;
        actor.current_hp = old_hp.saturating_add(amount).min(actor.max_hp);
        events.push(TurnEvent::Heal {
            champion_id: actor.id,
            amount: actor.current_hp - old_hp,
            new_hp: actor.current_hp,
        });
    }

    for team in teams.iter_mut() {
        for state in team.iter_mut() {
            if let Some(damage) = tick_burn(state) {
                events.push(TurnEvent::BurnTick {
                    champion_id: state.id,
                    damage,
                });
            }
        }
    }

    for team in teams.iter_mut() {
        for state in team.iter_mut() {
            tick_buffs(state);
        }
    }

    // Cast after expiry so they count from the next round
    for p in planned.iter() {
        match p.effect {
            Effect::Buff(buff) => {
                let actor = &mut teams[p.side.index()][p.actor_slot];
                if actor.current_hp == 0 {
                    continue;
                }
                insert_buff(actor, buff);
                events.push(TurnEvent::Buff {
                    champion_id: actor.id,
                    stat: buff.stat,
                    value: buff.value,
                    duration: buff.turns_remaining,
                });
            }
            Effect::Debuff {
                target_slot,
                debuff,
            } => {
                let target = &mut teams[p.side.opponent().index()][target_slot];
                if target.current_hp == 0 {
                    continue;
                }
                insert_buff(target, debuff);
                events.push(TurnEvent::Debuff {
                    target_id: target.id,
                    stat: debuff.stat,
                    value: debuff.value,
                    duration: debuff.turns_remaining,
                });
            }
            Effect::Hit { .. } | Effect::Heal { .. } => {}
        }
    }

    for team in teams.iter_mut() {
        for state in team.iter_mut() {
            if !state.is_ko && state.current_hp == 0 {
                state.is_ko = true;
                state.buffs.clear();
                state.burn_turns = 0;
                events.push(TurnEvent::Ko {
                    champion_id: state.id,
                });
            }
        }
    }

    events
}

fn plan_effect(
    snapshot: &Teams,
    side: Side,
    actor_slot: usize,
    action: &TurnAction,
    target_slot: usize,
) -> Option<Effect> {
    let actor_state = &snapshot[side.index()][actor_slot];
    let target_state = &snapshot[side.opponent().index()][target_slot];
    let actor = get_champion(actor_state.id)?;
    let target = get_champion(target_state.id)?;
    let ability = actor.abilities.get(action.ability_index as usize)?;

    let effect = match ability.ability_type {
        AbilityType::Damage | AbilityType::DamageDot => {
            let roll = calculate_damage(actor, target, target_state, ability, actor_state);
            let burn_turns = if ability.ability_type == AbilityType::DamageDot {
                ability.duration
            } else {
                0
            };
            Effect::Hit {
                target_slot,
                damage: roll.damage,
                mult_x100: roll.mult_x100,
                burn_turns,
            }
        }
        AbilityType::Heal => Effect::Heal {
            amount: ability.heal_amount,
        },
        AbilityType::Buff | AbilityType::Debuff => {
            if ability.stat_value == 0 || ability.duration == 0 {
                return None;
            }
            let is_debuff = ability.ability_type == AbilityType::Debuff;
            let buff = Buff {
                stat: ability.stat,
                value: ability.stat_value,
                turns_remaining: ability.duration,
                is_debuff,
            };
            if is_debuff {
                Effect::Debuff {
                    target_slot,
                    debuff: buff,
                }
            } else {
                Effect::Buff(buff)
            }
        }
    };
    Some(effect)
}

/// Apply one burn tick. Returns the damage dealt, if the champion was burning.
fn tick_burn(state: &mut ChampionState) -> Option<u32> {
    if state.burn_turns == 0 || state.current_hp == 0 {
        return None;
    }
    let damage = calculate_burn_damage(state);
    state.current_hp = state.current_hp.saturating_sub(damage);
    state.burn_turns -= 1;
    Some(damage)
}

fn tick_buffs(state: &mut ChampionState) {
    for buff in state.buffs.iter_mut() {
        buff.turns_remaining = buff.turns_remaining.saturating_sub(1);
    }
    state.buffs.retain(|b| b.turns_remaining > 0);
}

/// Add a buff; when all slots are taken the one closest to expiry is replaced.
fn insert_buff(state: &mut ChampionState, buff: Buff) {
    if state.buffs.len() < MAX_BUFFS {
        state.buffs.push(buff);
        return;
    }
    if let Some(weakest) = state.buffs.iter_mut().min_by_key(|b| b.turns_remaining) {
        *weakest = buff;
    }
}
