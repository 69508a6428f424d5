use arrayvec::ArrayVec;

/// The two seats of a match. The host plays side A, the joiner side B.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const fn opponent(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Element {
    Fire = 0,
    Water = 1,
    Earth = 2,
    Wind = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AbilityType {
    Damage = 0,
    /// Damage plus a burn lasting `duration` rounds on the target.
    DamageDot = 1,
    Heal = 2,
    Buff = 3,
    Debuff = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum StatType {
    Defense = 0,
    Attack = 1,
}

#[derive(Clone, Copy, Debug)]
pub struct Ability {
    pub name: &'static str,
    pub power: u32,
    pub ability_type: AbilityType,
    pub stat: StatType,
    pub stat_value: u32,
    pub duration: u32,
    pub heal_amount: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct Champion {
    pub id: u8,
    pub name: &'static str,
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub element: Element,
    pub abilities: [Ability; 2],
}

pub const MAX_BUFFS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Buff {
    pub stat: StatType,
    pub value: u32,
    pub turns_remaining: u32,
    pub is_debuff: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChampionState {
    pub id: u8,
    pub current_hp: u32,
    pub max_hp: u32,
    pub buffs: ArrayVec<Buff, MAX_BUFFS>,
    pub burn_turns: u32,
    pub is_ko: bool,
    pub total_damage_dealt: u32,
}

impl ChampionState {
    pub fn is_alive(&self) -> bool {
        !self.is_ko
    }
}

/// A declared move: which champion acts and which of its two abilities it uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnAction {
    pub champion_id: u8,
    pub ability_index: u8,
}

/// Why a side's move for a round was voided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ForfeitReason {
    /// The reveal did not hash to the published commitment.
    CommitmentMismatch,
    /// The revealed move is outside 1..=20.
    InvalidMove,
    /// The ability index does not exist on the champion.
    InvalidAbility,
    /// The champion is not on the team or is knocked out.
    ChampionUnavailable,
}

/// What a side brought to the round after commitment verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Submission {
    Action(TurnAction),
    Forfeit(ForfeitReason),
}

impl Submission {
    pub fn action(&self) -> Option<&TurnAction> {
        match self {
            Submission::Action(action) => Some(action),
            Submission::Forfeit(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnEvent {
    Attack {
        attacker_id: u8,
        defender_id: u8,
        damage: u32,
        mult_x100: u32,
    },
    Heal {
        champion_id: u8,
        amount: u32,
        new_hp: u32,
    },
    Buff {
        champion_id: u8,
        stat: StatType,
        value: u32,
        duration: u32,
    },
    Debuff {
        target_id: u8,
        stat: StatType,
        value: u32,
        duration: u32,
    },
    BurnApplied {
        target_id: u8,
        duration: u32,
    },
    BurnTick {
        champion_id: u8,
        damage: u32,
    },
    Ko {
        champion_id: u8,
    },
    Forfeit {
        side: Side,
        reason: ForfeitReason,
    },
}

/// One completed round of the battle log.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnRecord {
    pub round: u32,
    pub action_a: Submission,
    pub action_b: Submission,
    pub events: Vec<TurnEvent>,
}

impl TurnRecord {
    pub fn action(&self, side: Side) -> &Submission {
        match side {
            Side::A => &self.action_a,
            Side::B => &self.action_b,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchResult {
    Winner(Side),
    Draw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mvp {
    pub side: Side,
    pub champion_id: u8,
    pub damage_dealt: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchOutcome {
    pub result: MatchResult,
    pub total_rounds: u32,
    pub mvp: Option<Mvp>,
}
