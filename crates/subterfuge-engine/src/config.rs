//! Simulation configuration.
//!
//! Balance constants are injected rather than hard-coded: the engine reads
//! production rates, regeneration rates, and sub roster sizes from a
//! [`SimConfig`] supplied when the [`TimeMachine`](crate::time_machine::TimeMachine)
//! is created. Configs deserialize from JSON; missing fields fall back to the
//! [`Default`] values.
//!
//! ```
//! use subterfuge_engine::config::{SimConfig, UndoOrder};
//!
//! let config = SimConfig::from_json_str(r#"{ "base_production_amount": 4 }"#).unwrap();
//! assert_eq!(config.base_production_amount, 4);
//! assert_eq!(config.undo_order, UndoOrder::SameAsForward);
//! ```

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UndoOrder
// ---------------------------------------------------------------------------

/// The order in which a tick's events are reverted when rewinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoOrder {
    /// Revert in the same priority order the tick was applied in.
    ///
    /// Exact whenever the tick's events commute on undo, as batches of
    /// productions do. A combat restores absolute values, so it must not share
    /// a component with a later event of the same tick.
    #[default]
    SameAsForward,
    /// Revert in the reverse of the apply order. Exact for any mix of events
    /// that restore absolute values and events that subtract deltas.
    Reversed,
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating a [`SimConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON could not be parsed into a config.
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An interval was zero.
    #[error("{field} must be at least 1 tick, got 0")]
    ZeroInterval { field: &'static str },

    /// An amount was negative.
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: i32 },
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Injected balance and engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks between two driller productions at a factory.
    pub ticks_per_production: u64,
    /// Drillers produced per production, before the capacity clamp.
    pub base_production_amount: i32,
    /// Ticks between two shield regenerations.
    pub ticks_per_shield_regeneration: u64,
    /// Shields regenerated per regeneration, before the capacity clamp.
    pub base_shield_regeneration: i32,
    /// Specialist slots on a freshly launched sub.
    pub sub_specialist_capacity: usize,
    /// How same-tick events are ordered when rewinding.
    pub undo_order: UndoOrder,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_production: 36,
            base_production_amount: 6,
            ticks_per_shield_regeneration: 12,
            base_shield_regeneration: 1,
            sub_specialist_capacity: 3,
            undo_order: UndoOrder::SameAsForward,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON, or any error returned by
    /// [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that intervals are positive and amounts non-negative.
    ///
    /// # Errors
    ///
    /// The first offending field, as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_production == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "ticks_per_production",
            });
        }
        if self.ticks_per_shield_regeneration == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "ticks_per_shield_regeneration",
            });
        }
        if self.base_production_amount < 0 {
            return Err(ConfigError::NegativeAmount {
                field: "base_production_amount",
                value: self.base_production_amount,
            });
        }
        if self.base_shield_regeneration < 0 {
            return Err(ConfigError::NegativeAmount {
                field: "base_shield_regeneration",
                value: self.base_shield_regeneration,
            });
        }
        Ok(())
    }
}
