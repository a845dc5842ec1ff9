//! Same-tick resolution order.
//!
//! When several events fall on the same tick they are applied lowest
//! [`Priority`] first; events sharing a bucket keep their insertion order.
//!
//! | rank | bucket                 |
//! |------|------------------------|
//! | 1    | shield combat          |
//! | 2    | driller combat         |
//! | 3    | specialist steal       |
//! | 4    | outpost destruction    |
//! | 5    | friendly arrival       |
//! | 6    | shield regeneration    |
//! | 7    | driller production     |
//! | 8    | player-issued command  |
//!
//! Shields absorb damage before driller counts drop, production settles after
//! combat, and player commands see the settled natural consequences of their
//! tick.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed tie-break bucket. Derived `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    ShieldCombat = 1,
    DrillerCombat = 2,
    SpecialistSteal = 3,
    OutpostDestruction = 4,
    FriendlyArrival = 5,
    ShieldRegeneration = 6,
    Production = 7,
    PlayerCommand = 8,
}

impl Priority {
    /// Every bucket, in resolution order.
    pub const ALL: [Priority; 8] = [
        Priority::ShieldCombat,
        Priority::DrillerCombat,
        Priority::SpecialistSteal,
        Priority::OutpostDestruction,
        Priority::FriendlyArrival,
        Priority::ShieldRegeneration,
        Priority::Production,
        Priority::PlayerCommand,
    ];

    /// Position in the ranking table (1 resolves first).
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// `true` for every bucket except player commands.
    pub fn is_natural(self) -> bool {
        self != Priority::PlayerCommand
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::ShieldCombat => "shield_combat",
            Priority::DrillerCombat => "driller_combat",
            Priority::SpecialistSteal => "specialist_steal",
            Priority::OutpostDestruction => "outpost_destruction",
            Priority::FriendlyArrival => "friendly_arrival",
            Priority::ShieldRegeneration => "shield_regeneration",
            Priority::Production => "production",
            Priority::PlayerCommand => "player_command",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_sorted_and_ranked() {
        let mut sorted = Priority::ALL;
        sorted.sort();
        assert_eq!(sorted, Priority::ALL);
        for (i, p) in Priority::ALL.iter().enumerate() {
            assert_eq!(p.rank() as usize, i + 1);
        }
    }

    #[test]
    fn combat_before_production_before_commands() {
        assert!(Priority::ShieldCombat < Priority::DrillerCombat);
        assert!(Priority::DrillerCombat < Priority::SpecialistSteal);
        assert!(Priority::SpecialistSteal < Priority::Production);
        assert!(Priority::Production < Priority::PlayerCommand);
        assert!(Priority::ALL
            .iter()
            .all(|p| p.is_natural() == (*p != Priority::PlayerCommand)));
    }
}
