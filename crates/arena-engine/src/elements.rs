use crate::types::Element;

pub const ADVANTAGE_X100: u32 = 150;
pub const NEUTRAL_X100: u32 = 100;
pub const DISADVANTAGE_X100: u32 = 67;

impl Element {
    /// The element this one is strong against.
    /// Cycle: Fire -> Earth -> Wind -> Water -> Fire
    pub const fn beats(self) -> Element {
        match self {
            Element::Fire => Element::Earth,
            Element::Earth => Element::Wind,
            Element::Wind => Element::Water,
            Element::Water => Element::Fire,
        }
    }
}

/// Type multiplier x100: 150 = super effective, 67 = resisted, 100 = neutral.
pub fn get_type_multiplier(attacker: Element, defender: Element) -> u32 {
    if attacker.beats() == defender {
        ADVANTAGE_X100
    } else if defender.beats() == attacker {
        DISADVANTAGE_X100
    } else {
        NEUTRAL_X100
    }
}
