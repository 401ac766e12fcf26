//! Polarity Run - simulation core of a magnet-polarity endless runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (forces, integration, lanes, world streaming)
//! - `tuning`: Data-driven game balance
//! - `logging`: env_logger setup for native hosts

#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
pub mod sim;
pub mod tuning;

pub use tuning::{Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep used by the headless runner (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Below this length a vector is treated as zero
    pub const EPSILON: f32 = 1.0e-5;
    /// Smallest spacing the streaming generator accepts between rows or wall steps
    pub const MIN_SPACING: f32 = 0.5;
}

/// Linear interpolation, `t` clamped to [0, 1]
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Move `value` toward zero by `amount`, landing exactly on zero instead of crossing it
#[inline]
pub fn decay_toward_zero(value: f32, amount: f32) -> f32 {
    if value > 0.0 {
        (value - amount).max(0.0)
    } else if value < 0.0 {
        (value + amount).min(0.0)
    } else {
        0.0
    }
}
