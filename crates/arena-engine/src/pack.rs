use crate::error::{EngineError, Result};
use crate::types::{Buff, ChampionState, StatType};

use arrayvec::ArrayVec;

/// Goldilocks prime: p = 2^64 - 2^32 + 1
pub const GOLDILOCKS_P: u64 = 0xFFFF_FFFF_0000_0001;

/// Buffs carried by a packed word.
pub const PACKED_BUFFS: usize = 4;

const MAX_BUFF_VALUE: u32 = 0x3F;
const MAX_BUFF_TURNS: u32 = 0x0F;

/// Pack a ChampionState into 4 field-sized values.
///
/// Layout:
///   felt0: (current_hp << 32) | max_hp
///   felt1: (is_ko << 32) | total_damage_dealt
///   felt2: buffs 0-3 packed (4 x 16 bits, buff[0] in MSBs)
///   felt3: burn_turns
///
/// `id` is not packed; it is recovered from the team array on unpack.
pub fn pack_champion_state(state: &ChampionState) -> Result<[u64; 4]> {
    let felt0 = ((state.current_hp as u64) << 32) | (state.max_hp as u64);
    let felt1 = ((state.is_ko as u64) << 32) | (state.total_damage_dealt as u64);
    if felt0 >= GOLDILOCKS_P {
        return Err(EngineError::FieldOverflow("hp"));
    }
    if felt1 >= GOLDILOCKS_P {
        return Err(EngineError::FieldOverflow("damage dealt"));
    }

    let mut felt2: u64 = 0;
    for (i, buff) in state.buffs.iter().take(PACKED_BUFFS).enumerate() {
        let packed = pack_single_buff(buff)?;
        felt2 |= (packed as u64) << ((PACKED_BUFFS - 1 - i) * 16);
    }
    if felt2 >= GOLDILOCKS_P {
        return Err(EngineError::FieldOverflow("buffs"));
    }

    Ok([felt0, felt1, felt2, state.burn_turns as u64])
}

/// Unpack a ChampionState from 4 field-sized values.
pub fn unpack_champion_state(word: [u64; 4], champion_id: u8) -> Result<ChampionState> {
    let mut buffs = ArrayVec::new();
    for i in 0..PACKED_BUFFS {
        let bits = ((word[2] >> ((PACKED_BUFFS - 1 - i) * 16)) & 0xFFFF) as u16;
        if let Some(buff) = unpack_single_buff(bits)? {
            buffs.push(buff);
        }
    }
    let burn_turns =
        u32::try_from(word[3]).map_err(|_| EngineError::FieldOverflow("burn turns"))?;

    Ok(ChampionState {
        id: champion_id,
        current_hp: (word[0] >> 32) as u32,
        max_hp: word[0] as u32,
        buffs,
        burn_turns,
        is_ko: ((word[1] >> 32) & 1) == 1,
        total_damage_dealt: word[1] as u32,
    })
}

/// Pack a single buff into 16 bits.
/// Layout: stat(2) | is_debuff(1) | value(6) | turns(4) | active(1) | reserved(2)
fn pack_single_buff(buff: &Buff) -> Result<u16> {
    if buff.value > MAX_BUFF_VALUE {
        return Err(EngineError::FieldOverflow("buff value"));
    }
    if buff.turns_remaining > MAX_BUFF_TURNS {
        return Err(EngineError::FieldOverflow("buff turns"));
    }
    let stat_bits = (buff.stat as u16) & 0x03;
    let debuff_bit = buff.is_debuff as u16;
    let value_bits = buff.value as u16;
    let turns_bits = buff.turns_remaining as u16;
    let active_bit: u16 = 1;
    Ok((stat_bits << 14) | (debuff_bit << 13) | (value_bits << 7) | (turns_bits << 3) | (active_bit << 2))
}

fn unpack_single_buff(bits: u16) -> Result<Option<Buff>> {
    if (bits >> 2) & 1 == 0 {
        return Ok(None);
    }
    let stat = match (bits >> 14) & 0x03 {
        0 => StatType::Defense,
        1 => StatType::Attack,
        _ => return Err(EngineError::FieldOverflow("buff stat")),
    };
    Ok(Some(Buff {
        stat,
        is_debuff: ((bits >> 13) & 1) == 1,
        value: ((bits >> 7) & 0x3F) as u32,
        turns_remaining: ((bits >> 3) & 0x0F) as u32,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::init_champion_state;

    fn buff(stat: StatType, value: u32, turns_remaining: u32, is_debuff: bool) -> Buff {
        Buff {
            stat,
            value,
            turns_remaining,
            is_debuff,
        }
    }

    #[test]
    fn fresh_champions_survive_packing() {
        for id in 0..10u8 {
            let state = init_champion_state(id).unwrap();
            let packed = pack_champion_state(&state).unwrap();
            assert!(packed.iter().all(|f| *f < GOLDILOCKS_P));
            assert_eq!(unpack_champion_state(packed, id).unwrap(), state);
        }
    }

    #[test]
    fn buffs_damage_and_burn_survive_packing() {
        let mut state = init_champion_state(0).unwrap(); // Inferno, HP 80
        state.current_hp = 45;
        state.total_damage_dealt = 137;
        state.burn_turns = 2;
        state.buffs.push(buff(StatType::Defense, 6, 2, false));
        state.buffs.push(buff(StatType::Attack, 4, 1, true));
        state.buffs.push(buff(StatType::Defense, 5, 3, false));

        let packed = pack_champion_state(&state).unwrap();
        assert_eq!(packed[0], (45u64 << 32) | 80);
        assert_eq!(packed[3], 2);

        let unpacked = unpack_champion_state(packed, 0).unwrap();
        assert_eq!(unpacked, state);
        assert_eq!(unpacked.buffs[1], buff(StatType::Attack, 4, 1, true));
    }

    #[test]
    fn ko_flag_sits_above_damage() {
        let mut state = init_champion_state(7).unwrap(); // Storm, HP 85
        state.current_hp = 0;
        state.is_ko = true;
        state.total_damage_dealt = 250;

        let packed = pack_champion_state(&state).unwrap();
        assert_eq!(packed[1], (1u64 << 32) | 250);
        let unpacked = unpack_champion_state(packed, 7).unwrap();
        assert!(unpacked.is_ko);
        assert_eq!(unpacked.total_damage_dealt, 250);
        assert_eq!(unpacked.max_hp, 85);
    }

    #[test]
    fn only_first_four_buffs_are_packed() {
        let mut state = init_champion_state(3).unwrap();
        for turns in 1..=6 {
            state.buffs.push(buff(StatType::Defense, 3, turns, false));
        }
        let unpacked = unpack_champion_state(pack_champion_state(&state).unwrap(), 3).unwrap();
        assert_eq!(unpacked.buffs.len(), PACKED_BUFFS);
        assert_eq!(unpacked.buffs[3].turns_remaining, 4);
    }

    #[test]
    fn max_buff_values_fit() {
        let mut state = init_champion_state(0).unwrap();
        state.buffs.push(buff(StatType::Attack, 63, 15, true));
        let unpacked = unpack_champion_state(pack_champion_state(&state).unwrap(), 0).unwrap();
        assert_eq!(unpacked.buffs[0], buff(StatType::Attack, 63, 15, true));
    }

    #[test]
    fn oversized_values_are_rejected() {
        let mut state = init_champion_state(0).unwrap();
        state.buffs.push(buff(StatType::Attack, 64, 1, false));
        assert_eq!(
            pack_champion_state(&state),
            Err(EngineError::FieldOverflow("buff value"))
        );

        let mut state = init_champion_state(0).unwrap();
        state.current_hp = u32::MAX;
        state.max_hp = u32::MAX;
        assert_eq!(pack_champion_state(&state), Err(EngineError::FieldOverflow("hp")));
    }

    #[test]
    fn unknown_stat_bits_are_rejected() {
        for stat in [2u64, 3] {
            let bad = (stat << 14 | 1 << 2) << 48;
            assert!(unpack_champion_state([80, 0, bad, 0], 0).is_err());
        }
    }
}
