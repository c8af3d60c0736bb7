use crate::error::{ensure_positive, Result, SimError};
use crate::synapse::SynapseParameters;
use serde::{Deserialize, Serialize};

pub mod reduced;

/// Named parameter presets for the cell classes wired into the circuits.
/// A network references these by value, so every cell of a class shares the
/// same numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    /// cortical, pallidal and thalamic cells
    RegularSpiking,
    /// striatal medium spiny (projection) neuron
    StriatalProjection,
}

impl CellType {
    pub fn parameters(self) -> CellParameters {
        match self {
            CellType::RegularSpiking => {
                CellParameters::new(100.0, -60.0, -40.0, 35.0, 0.03, -2.0, -50.0, 100.0, 0.7)
            }
            CellType::StriatalProjection => {
                CellParameters::new(50.0, -80.0, -25.0, 40.0, 0.01, -20.0, -55.0, 150.0, 1.0)
            }
        }
    }
}

///includes all configurable parameters for an Izhikevich cell
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    pub capacitance: f64, //C, membrane capacitance (pF)
    pub v_rest: f64,      //vr, resting potential (mV)
    pub v_threshold: f64, //vt, instantaneous threshold potential (mV)
    pub v_peak: f64,      //vpeak, spike cutoff (mV)
    pub a: f64,           //recovery time scale (1/ms)
    pub b: f64,           //recovery sensitivity to v
    pub c: f64,           //reset potential after a spike (mV)
    pub d: f64,           //recovery jump after a spike
    pub k: f64,           //shape of the quadratic nonlinearity
}

impl Default for CellParameters {
    fn default() -> Self {
        CellType::RegularSpiking.parameters()
    }
}

impl CellParameters {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capacitance: f64,
        v_rest: f64,
        v_threshold: f64,
        v_peak: f64,
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        k: f64,
    ) -> Self {
        Self {
            capacitance,
            v_rest,
            v_threshold,
            v_peak,
            a,
            b,
            c,
            d,
            k,
        }
    }

    /// Rejects parameter sets the integrator cannot use: a capacitance that is
    /// not strictly positive, or any non-finite value.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("capacitance", self.capacitance)?;
        let all = [
            self.v_rest,
            self.v_threshold,
            self.v_peak,
            self.a,
            self.b,
            self.c,
            self.d,
            self.k,
        ];
        if all.iter().any(|x| !x.is_finite()) {
            return Err(SimError::InvalidParameter(format!(
                "cell parameters must be finite: {self:?}"
            )));
        }
        Ok(())
    }

    /// membrane and recovery derivatives at (v, u) under input current i_net
    #[inline]
    pub fn derivatives(&self, v: f64, u: f64, i_net: f64) -> (f64, f64) {
        let dvdt = (self.k * (v - self.v_rest) * (v - self.v_threshold) - u + i_net)
            / self.capacitance;
        let dudt = self.a * (self.b * (v - self.v_rest) - u);
        (dvdt, dudt)
    }
}

/// Dynamic state of one cell at one time step.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CellState {
    pub v: f64,      //membrane potential (mV)
    pub u: f64,      //recovery variable
    pub g: f64,      //synaptic output conductance
    pub spike: bool, //true if the cell crossed v_peak on this step
}

impl CellState {
    /// state of a cell at rest: v on the resting potential shifted by
    /// `jitter` mV, everything else zero. (vr, 0) is the fixed point of the
    /// undriven cell.
    pub fn at_rest(parameters: &CellParameters, jitter: f64) -> Self {
        CellState {
            v: parameters.v_rest + jitter,
            u: 0.0,
            g: 0.0,
            spike: false,
        }
    }

    /// Advance the cell by one forward Euler step of length `dt`.
    ///
    /// Membrane and recovery are driven by `i_net`; the conductance is driven
    /// by this cell's own spike flag from the previous step. If the new
    /// potential reaches `v_peak` the cell is reset (`v = c`, `u += d`) and
    /// the returned state carries `spike = true`. Overwriting the previously
    /// recorded sample with `v_peak` is the recorder's job, not the model's.
    #[inline]
    pub fn advance(
        &self,
        parameters: &CellParameters,
        synapse: &SynapseParameters,
        i_net: f64,
        dt: f64,
    ) -> CellState {
        let (dvdt, dudt) = parameters.derivatives(self.v, self.u, i_net);

        let mut v = self.v + dvdt * dt;
        let mut u = self.u + dudt * dt;
        let g = synapse.next_conductance(self.g, self.spike, dt);

        let spike = v >= parameters.v_peak;
        if spike {
            v = parameters.c;
            u += parameters.d;
        }

        CellState { v, u, g, spike }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        assert!(CellType::RegularSpiking.parameters().validate().is_ok());
        assert!(CellType::StriatalProjection.parameters().validate().is_ok());
    }

    #[test]
    fn zero_capacitance_is_rejected() {
        let mut p = CellParameters::default();
        p.capacitance = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rest_is_a_fixed_point() {
        let p = CellType::StriatalProjection.parameters();
        let syn = SynapseParameters::default();
        let mut s = CellState::at_rest(&p, 0.0);
        for _ in 0..1000 {
            s = s.advance(&p, &syn, 0.0, 0.1);
        }
        assert_eq!(s.v, p.v_rest);
        assert_eq!(s.u, 0.0);
        assert_eq!(s.g, 0.0);
        assert!(!s.spike);
    }

    #[test]
    fn crossing_v_peak_resets_and_flags() {
        let p = CellParameters::default();
        let syn = SynapseParameters::default();
        // one step below the peak with a large drive
        let s = CellState {
            v: 34.0,
            u: 10.0,
            g: 0.0,
            spike: false,
        };
        let (dvdt, dudt) = p.derivatives(s.v, s.u, 500.0);
        let next = s.advance(&p, &syn, 500.0, 0.1);
        assert!(s.v + dvdt * 0.1 >= p.v_peak);
        assert!(next.spike);
        assert_eq!(next.v, p.c);
        assert_eq!(next.u, s.u + dudt * 0.1 + p.d);
    }

    #[test]
    fn conductance_jumps_the_step_after_a_spike() {
        let p = CellParameters::default();
        let syn = SynapseParameters::new(1000.0, 100.0);
        let s = CellState {
            v: p.c,
            u: 0.0,
            g: 0.0,
            spike: true,
        };
        let next = s.advance(&p, &syn, 0.0, 0.1);
        assert!((next.g - 1.0).abs() < 1e-12);
    }
}
