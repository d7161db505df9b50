//! Device shadow state model.
//!
//! Two instances exist per session: `desired` (cloud-held target) and
//! `reported` (device-side truth). Only `reported` is ever transmitted;
//! `desired` is only compared against.

use serde::{Deserialize, Serialize};

/// Temperature the device idles at when a session begins.
pub const IDLE_TEMPERATURE: i8 = 35;

/// Passive drift ceiling while the actuator is off.
pub const AMBIENT_CEILING: i8 = 40;

/// One side of the shadow: the actuator power flag and the temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowState {
    pub power_on: bool,
    pub temperature: i8,
}

impl ShadowState {
    /// The state a device reports before any reconciliation has run.
    pub const fn idle() -> Self {
        Self {
            power_on: false,
            temperature: IDLE_TEMPERATURE,
        }
    }

    /// The zeroed target state before the cloud has expressed a desire.
    pub const fn zeroed() -> Self {
        Self {
            power_on: false,
            temperature: 0,
        }
    }
}

/// The desired/reported pair guarded by the report lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowPair {
    pub desired: ShadowState,
    pub reported: ShadowState,
}

impl Default for ShadowPair {
    fn default() -> Self {
        Self {
            desired: ShadowState::zeroed(),
            reported: ShadowState::idle(),
        }
    }
}
