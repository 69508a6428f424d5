//! Static champion content. Ids are the draft pool indices 0..=9.

use crate::types::{Ability, AbilityType, Champion, Element, StatType};

pub const CHAMPION_COUNT: usize = 10;

const fn strike(name: &'static str, power: u32) -> Ability {
    Ability {
        name,
        power,
        ability_type: AbilityType::Damage,
        stat: StatType::Defense,
        stat_value: 0,
        duration: 0,
        heal_amount: 0,
    }
}

const fn scorch(name: &'static str, power: u32, burn_turns: u32) -> Ability {
    Ability {
        name,
        power,
        ability_type: AbilityType::DamageDot,
        stat: StatType::Defense,
        stat_value: 0,
        duration: burn_turns,
        heal_amount: 0,
    }
}

const fn mend(name: &'static str, heal_amount: u32) -> Ability {
    Ability {
        name,
        power: 0,
        ability_type: AbilityType::Heal,
        stat: StatType::Defense,
        stat_value: 0,
        duration: 0,
        heal_amount,
    }
}

const fn buff(name: &'static str, stat: StatType, value: u32, duration: u32) -> Ability {
    Ability {
        name,
        power: 0,
        ability_type: AbilityType::Buff,
        stat,
        stat_value: value,
        duration,
        heal_amount: 0,
    }
}

const fn debuff(name: &'static str, stat: StatType, value: u32, duration: u32) -> Ability {
    Ability {
        name,
        power: 0,
        ability_type: AbilityType::Debuff,
        stat,
        stat_value: value,
        duration,
        heal_amount: 0,
    }
}

const fn champion(
    id: u8,
    name: &'static str,
    element: Element,
    hp: u32,
    attack: u32,
    defense: u32,
    abilities: [Ability; 2],
) -> Champion {
    Champion {
        id,
        name,
        hp,
        attack,
        defense,
        element,
        abilities,
    }
}

pub const CHAMPIONS: [Champion; CHAMPION_COUNT] = [
    champion(0, "Inferno", Element::Fire, 80, 20, 5, [
        strike("Eruption", 35),
        scorch("Scorch", 15, 3),
    ]),
    champion(1, "Boulder", Element::Earth, 140, 14, 16, [
        strike("Rock Slam", 28),
        buff("Fortify", StatType::Defense, 6, 2),
    ]),
    champion(2, "Ember", Element::Fire, 90, 16, 8, [
        strike("Fireball", 25),
        buff("Flame Shield", StatType::Defense, 5, 2),
    ]),
    champion(3, "Torrent", Element::Water, 110, 12, 12, [
        strike("Tidal Wave", 22),
        mend("Rejuvenate", 25),
    ]),
    champion(4, "Gale", Element::Wind, 75, 15, 6, [
        strike("Wind Blade", 24),
        buff("Wind Wall", StatType::Defense, 5, 2),
    ]),
    champion(5, "Tide", Element::Water, 100, 11, 14, [
        strike("Undertow", 20),
        debuff("Mist", StatType::Attack, 4, 2),
    ]),
    champion(6, "Quake", Element::Earth, 130, 13, 15, [
        strike("Earthquake", 26),
        buff("Stone Skin", StatType::Defense, 8, 1),
    ]),
    champion(7, "Storm", Element::Wind, 85, 17, 7, [
        strike("Lightning", 30),
        buff("Dodge", StatType::Defense, 6, 2),
    ]),
    champion(8, "Phoenix", Element::Fire, 65, 22, 4, [
        strike("Sunfire", 38),
        mend("Rebirth", 30),
    ]),
    champion(9, "Kraken", Element::Water, 120, 10, 16, [
        strike("Crushing Tide", 24),
        buff("Shell", StatType::Defense, 7, 2),
    ]),
];

/// Look up a champion definition; `None` for ids outside the table.
pub fn get_champion(id: u8) -> Option<&'static Champion> {
    CHAMPIONS.get(id as usize)
}
