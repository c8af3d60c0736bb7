//! Single-trace membrane models with fixed coefficients.
//!
//! These are the simpler relatives of the general cell model: a leaky
//! membrane, a linear two-state (v, u) system, the quadratic membrane with no
//! reset, and the reduced Izhikevich neuron (`0.04 v² + 5 v + 140`, spike
//! cutoff at 30 mV). They are integrated on their own, one trace at a time,
//! and never take part in a network.

use crate::error::{ensure_positive, Result, SimError};
use serde::{Deserialize, Serialize};

/// spike cutoff of the reduced Izhikevich neuron (mV)
pub const REDUCED_PEAK: f64 = 30.0;

/// ceiling applied to the quadratic membrane after every step (mV)
pub const QUADRATIC_SOFT_CAP: f64 = 60.0;

/// `(a, b, c, d)` presets for the reduced Izhikevich neuron
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReducedPreset {
    RegularSpiking,
    FastSpiking,
    MsnLike,
    PyramidalLike,
}

impl ReducedPreset {
    pub fn parameters(self) -> ReducedParameters {
        let (a, b, c, d) = match self {
            ReducedPreset::RegularSpiking => (0.02, 0.2, -65.0, 8.0),
            ReducedPreset::FastSpiking => (0.10, 0.2, -65.0, 2.0),
            ReducedPreset::MsnLike => (0.01, 0.2, -80.0, 15.0),
            ReducedPreset::PyramidalLike => (0.02, 0.2, -65.0, 8.0),
        };
        ReducedParameters { a, b, c, d }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReducedParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

/// A single-cell model of the teaching progression.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ReducedModel {
    /// dv/dt = (-(v - v_rest) + R I) / tau
    Leaky { v_rest: f64, tau: f64, resistance: f64 },
    /// dv/dt = (-(v + 65) - u + I) / tau_v, du/dt = a (b v - u)
    TwoState { a: f64, b: f64, tau_v: f64 },
    /// dv/dt = 0.04 v² + 5 v + 140 + I, capped at 60 mV, no reset
    Quadratic,
    /// dv/dt = 0.04 v² + 5 v + 140 - u + I, du/dt = a (b v - u), reset at 30 mV
    Izhikevich(ReducedParameters),
}

/// Recorded trajectory of a reduced model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReducedTrace {
    pub v: Vec<f64>,
    pub u: Vec<f64>,
    pub spike: Vec<bool>,
}

impl ReducedTrace {
    pub fn spike_count(&self) -> usize {
        self.spike.iter().filter(|s| **s).count()
    }
}

impl ReducedModel {
    pub fn validate(&self) -> Result<()> {
        match self {
            ReducedModel::Leaky { tau, .. } => ensure_positive("tau", *tau),
            ReducedModel::TwoState { tau_v, .. } => ensure_positive("tau_v", *tau_v),
            ReducedModel::Quadratic | ReducedModel::Izhikevich(_) => Ok(()),
        }
    }

    /// initial recovery value paired with a starting potential
    fn initial_recovery(&self, v0: f64) -> f64 {
        match self {
            ReducedModel::TwoState { b, .. } => b * v0,
            ReducedModel::Izhikevich(p) => p.b * v0,
            ReducedModel::Leaky { .. } | ReducedModel::Quadratic => 0.0,
        }
    }

    /// one Euler step from (v, u) under current i, returns (v, u, spike)
    pub fn advance(&self, v: f64, u: f64, i: f64, dt: f64) -> (f64, f64, bool) {
        match *self {
            ReducedModel::Leaky {
                v_rest,
                tau,
                resistance,
            } => {
                let dvdt = (-(v - v_rest) + resistance * i) / tau;
                (v + dvdt * dt, u, false)
            }
            ReducedModel::TwoState { a, b, tau_v } => {
                let dvdt = (-(v + 65.0) - u + i) / tau_v;
                let dudt = a * (b * v - u);
                (v + dvdt * dt, u + dudt * dt, false)
            }
            ReducedModel::Quadratic => {
                let dvdt = 0.04 * v * v + 5.0 * v + 140.0 + i;
                let next = v + dvdt * dt;
                (next.min(QUADRATIC_SOFT_CAP), u, false)
            }
            ReducedModel::Izhikevich(p) => {
                let dvdt = 0.04 * v * v + 5.0 * v + 140.0 - u + i;
                let dudt = p.a * (p.b * v - u);
                let mut next_v = v + dvdt * dt;
                let mut next_u = u + dudt * dt;
                let spike = next_v >= REDUCED_PEAK;
                if spike {
                    next_v = p.c;
                    next_u += p.d;
                }
                (next_v, next_u, spike)
            }
        }
    }

    /// Integrate from `v0` over `input`, one sample per input value. Sample
    /// `i + 1` is computed from sample `i` and `input[i]`; the last input
    /// value is never consumed.
    pub fn simulate(&self, v0: f64, input: &[f64], dt: f64) -> Result<ReducedTrace> {
        self.validate()?;
        ensure_positive("dt", dt)?;
        if input.is_empty() {
            return Err(SimError::InvalidParameter(
                "input current must have at least one sample".to_string(),
            ));
        }

        let n = input.len();
        let mut trace = ReducedTrace {
            v: vec![0.0; n],
            u: vec![0.0; n],
            spike: vec![false; n],
        };
        trace.v[0] = v0;
        trace.u[0] = self.initial_recovery(v0);

        for i in 0..n - 1 {
            let (v, u, spike) = self.advance(trace.v[i], trace.u[i], input[i], dt);
            trace.v[i + 1] = v;
            trace.u[i + 1] = u;
            trace.spike[i + 1] = spike;
        }
        Ok(trace)
    }
}

/// Square pulse of `amplitude` on `[onset, offset)` ms sampled every `dt` ms
/// over `0..=duration`, the input shape used by the single-cell experiments.
pub fn step_current(duration: f64, dt: f64, onset: f64, offset: f64, amplitude: f64) -> Vec<f64> {
    let n = (duration / dt).round() as usize + 1;
    (0..n)
        .map(|i| {
            let t = i as f64 * dt;
            if t >= onset && t < offset {
                amplitude
            } else {
                0.0
            }
        })
        .collect()
}
