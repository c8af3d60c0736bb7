//! Spike-triggered synaptic conductance.
//!
//! Each cell owns a scalar conductance `g` that low-pass filters its own spike
//! train:
//!
//! ```text
//! dg/dt = (-g + psp_amp * spike_prev) / psp_decay
//! ```
//!
//! `g` is what a cell sends to its postsynaptic targets: it jumps by
//! `psp_amp * dt / psp_decay` on the step after a spike and otherwise decays
//! by the factor `1 - dt / psp_decay` per step.

use crate::error::{ensure_positive, Result};
use serde::{Deserialize, Serialize};

/// Amplitude and time constant of the post-synaptic conductance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynapseParameters {
    pub psp_amp: f64,   //pulse amplitude
    pub psp_decay: f64, //decay time constant (ms)
}

impl Default for SynapseParameters {
    fn default() -> Self {
        Self {
            psp_amp: 1000.0,
            psp_decay: 100.0,
        }
    }
}

impl SynapseParameters {
    pub fn new(psp_amp: f64, psp_decay: f64) -> Self {
        Self { psp_amp, psp_decay }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("psp_decay", self.psp_decay)?;
        if !self.psp_amp.is_finite() {
            return Err(crate::error::SimError::InvalidParameter(format!(
                "psp_amp must be finite, got {}",
                self.psp_amp
            )));
        }
        Ok(())
    }

    /// One forward Euler step of the conductance, driven by the spike flag of
    /// the previous step.
    #[inline]
    pub fn next_conductance(&self, g: f64, spike_prev: bool, dt: f64) -> f64 {
        let drive = if spike_prev { self.psp_amp } else { 0.0 };
        let dgdt = (-g + drive) / self.psp_decay;
        g + dgdt * dt
    }

    /// per-step multiplier applied to `g` while the cell is silent
    pub fn decay_factor(&self, dt: f64) -> f64 {
        1.0 - dt / self.psp_decay
    }
}
