use crate::error::{ensure_positive, Result, SimError};
use crate::neuron::{CellParameters, CellState};
use crate::synapse::SynapseParameters;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

pub mod input;
pub mod json;
pub mod record;

pub use input::{InputSchedule, Pulse};
pub use record::TimeSeries;

/// Number of samples of a run of length `duration` with step `dt`: the
/// ceiling of `duration / dt`, where a quotient within 1e-9 of a positive
/// integer is taken as that integer. Any positive run has at least one sample.
pub fn step_count(duration: f64, dt: f64) -> usize {
    let ratio = duration / dt;
    let nearest = ratio.round();
    if nearest >= 1.0 && (ratio - nearest).abs() < 1e-9 {
        nearest as usize
    } else {
        ratio.ceil() as usize
    }
}

/// The struct Network is a directed, weighted graph of Izhikevich cells.
///
/// `weights[(pre, post)]` is the efficacy of the synapse from `pre` onto
/// `post`; its sign makes the synapse excitatory or inhibitory. A cell never
/// drives itself: the diagonal is cleared at construction. Every cell also
/// receives a constant tonic drive, and owns the synapse constants that shape
/// its own output conductance.
#[derive(Clone, Debug, PartialEq)]
pub struct Network {
    cells: Vec<CellParameters>,
    weights: Array2<f64>,              // [pre, post]
    tonic: Array1<f64>,                // constant drive per cell
    synapses: Vec<SynapseParameters>,  // output synapse of each cell
    labels: Vec<String>,               // display names, "cell{i}" by default
}

impl Network {
    /// Create a network where every cell shares the same synapse constants.
    pub fn new(
        cells: Vec<CellParameters>,
        weights: Array2<f64>,
        tonic: Array1<f64>,
        synapse: SynapseParameters,
    ) -> Result<Self> {
        let synapses = vec![synapse; cells.len()];
        Self::with_synapses(cells, weights, tonic, synapses)
    }

    /// Create a network with per-cell synapse constants.
    pub fn with_synapses(
        cells: Vec<CellParameters>,
        mut weights: Array2<f64>,
        tonic: Array1<f64>,
        synapses: Vec<SynapseParameters>,
    ) -> Result<Self> {
        let n = cells.len();
        let (rows, cols) = weights.dim();
        if rows != cols {
            return Err(SimError::NonSquareWeights { rows, cols });
        }
        if rows != n {
            return Err(SimError::ShapeMismatch {
                what: "weight matrix",
                expected: n,
                actual: rows,
            });
        }
        if tonic.len() != n {
            return Err(SimError::ShapeMismatch {
                what: "tonic drive",
                expected: n,
                actual: tonic.len(),
            });
        }
        if synapses.len() != n {
            return Err(SimError::ShapeMismatch {
                what: "synapse parameters",
                expected: n,
                actual: synapses.len(),
            });
        }
        for cell in &cells {
            cell.validate()?;
        }
        for synapse in &synapses {
            synapse.validate()?;
        }
        if weights.iter().chain(tonic.iter()).any(|x| !x.is_finite()) {
            return Err(SimError::InvalidParameter(
                "weights and tonic drive must be finite".to_string(),
            ));
        }

        for i in 0..n {
            if weights[(i, i)] != 0.0 {
                warn!(cell = i, weight = weights[(i, i)], "ignoring self-connection");
                weights[(i, i)] = 0.0;
            }
        }

        Ok(Network {
            cells,
            weights,
            tonic,
            synapses,
            labels: (0..n).map(|i| format!("cell{i}")).collect(),
        })
    }

    /// Attach display names, one per cell.
    pub fn with_labels<S: Into<String>>(mut self, labels: Vec<S>) -> Result<Self> {
        if labels.len() != self.n_cells() {
            return Err(SimError::ShapeMismatch {
                what: "cell labels",
                expected: self.n_cells(),
                actual: labels.len(),
            });
        }
        self.labels = labels.into_iter().map(Into::into).collect();
        Ok(self)
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[CellParameters] {
        &self.cells
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn tonic_drive(&self) -> &Array1<f64> {
        &self.tonic
    }

    pub fn synapses(&self) -> &[SynapseParameters] {
        &self.synapses
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// index of the cell carrying `label`
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Set one synapse. Self-connections are rejected.
    pub fn set_weight(&mut self, pre: usize, post: usize, weight: f64) -> Result<()> {
        let n_cells = self.n_cells();
        for index in [pre, post] {
            if index >= n_cells {
                return Err(SimError::CellIndexOutOfRange { index, n_cells });
            }
        }
        if pre == post {
            return Err(SimError::InvalidParameter(format!(
                "cell {pre} cannot synapse onto itself"
            )));
        }
        self.weights[(pre, post)] = weight;
        Ok(())
    }

    /// Every cell at its fixed point (v = vr, u = 0, g = 0).
    pub fn rest_state(&self) -> NetworkState {
        self.initial_state(0.0, 0)
    }

    /// Every cell at rest with its potential raised by a uniform draw from
    /// `[0, jitter_mv)`, taken from a generator seeded with `seed`.
    pub fn initial_state(&self, jitter_mv: f64, seed: u64) -> NetworkState {
        let mut rng = StdRng::seed_from_u64(seed);
        let cells: Vec<CellState> = self
            .cells
            .iter()
            .map(|p| CellState::at_rest(p, rng.gen::<f64>() * jitter_mv))
            .collect();
        NetworkState::from_cells(&cells)
    }

    /// Synaptic current reaching each cell: `Wᵀ · g`.
    pub fn synaptic_input(&self, g: &Array1<f64>) -> Array1<f64> {
        self.weights.t().dot(g)
    }

    /// Advance every cell by one synchronous step of length `dt`.
    ///
    /// `state` and `external` must both hold one entry per cell.
    ///
    /// All inputs are computed from the state as it was before the step:
    /// `I_net = Wᵀ·g + external + tonic`. Then every cell integrates its
    /// membrane, recovery and conductance from that same previous state.
    pub fn advance(&self, state: &mut NetworkState, external: &Array1<f64>, dt: f64) {
        debug_assert_eq!(state.v.len(), self.n_cells());
        debug_assert_eq!(external.len(), self.n_cells());
        let mut i_net = self.synaptic_input(&state.g);
        i_net += external;
        i_net += &self.tonic;

        for (j, (cell, synapse)) in self.cells.iter().zip(&self.synapses).enumerate() {
            let next = state.cell(j).advance(cell, synapse, i_net[j], dt);
            state.set_cell(j, next);
        }
    }
}

/// Dynamic state of every cell of a network at one step, owned by whoever
/// drives the integrator.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkState {
    pub v: Array1<f64>,
    pub u: Array1<f64>,
    pub g: Array1<f64>,
    pub spike: Array1<bool>,
}

impl NetworkState {
    pub fn from_cells(cells: &[CellState]) -> Self {
        NetworkState {
            v: cells.iter().map(|c| c.v).collect(),
            u: cells.iter().map(|c| c.u).collect(),
            g: cells.iter().map(|c| c.g).collect(),
            spike: cells.iter().map(|c| c.spike).collect(),
        }
    }

    pub fn cell(&self, index: usize) -> CellState {
        CellState {
            v: self.v[index],
            u: self.u[index],
            g: self.g[index],
            spike: self.spike[index],
        }
    }

    pub fn set_cell(&mut self, index: usize, cell: CellState) {
        self.v[index] = cell.v;
        self.u[index] = cell.u;
        self.g[index] = cell.g;
        self.spike[index] = cell.spike;
    }
}

/// A complete single run: network, time grid, external input and the seed of
/// the initial jitter.
#[derive(Clone, Debug, PartialEq)]
pub struct Simulation {
    pub network: Network,
    pub dt: f64,         // step length (ms)
    pub duration: f64,   // T (ms)
    pub input: InputSchedule,
    pub jitter_mv: f64,  // width of the uniform initial jitter (mV)
    pub seed: u64,
}

impl Simulation {
    /// A run with no external input and no initial jitter.
    pub fn new(network: Network, dt: f64, duration: f64) -> Self {
        Simulation {
            network,
            dt,
            duration,
            input: InputSchedule::none(),
            jitter_mv: 0.0,
            seed: 0,
        }
    }

    pub fn with_input(mut self, input: InputSchedule) -> Self {
        self.input = input;
        self
    }

    pub fn with_jitter(mut self, jitter_mv: f64, seed: u64) -> Self {
        self.jitter_mv = jitter_mv;
        self.seed = seed;
        self
    }

    pub fn n_steps(&self) -> usize {
        step_count(self.duration, self.dt)
    }

    /// Check every configuration constraint that does not depend on the
    /// dynamics, so nothing can fail once stepping has begun.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("dt", self.dt)?;
        ensure_positive("duration", self.duration)?;
        if !self.jitter_mv.is_finite() || self.jitter_mv < 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "jitter must be finite and non-negative, got {}",
                self.jitter_mv
            )));
        }
        self.input.validate(self.network.n_cells(), self.n_steps())
    }

    /// Integrate the network over the whole run and record every sample.
    pub fn run(&self) -> Result<TimeSeries> {
        self.run_until(|_, _| false).map(|(series, _)| series)
    }

    /// Like [`Simulation::run`], but after each recorded sample `stop` may
    /// end the run early. Returns the series cut after the stopping sample
    /// together with its index, or the full series and `None`.
    pub fn run_until<F>(&self, mut stop: F) -> Result<(TimeSeries, Option<usize>)>
    where
        F: FnMut(usize, &NetworkState) -> bool,
    {
        self.validate()?;
        let network = &self.network;
        let n_cells = network.n_cells();
        let n_steps = self.n_steps();

        let mut series = TimeSeries::new(n_cells, n_steps, self.dt);
        let mut state = network.initial_state(self.jitter_mv, self.seed);
        let mut external = Array1::zeros(n_cells);
        series.record(0, &state);

        let mut stopped = None;
        for step in 1..n_steps {
            self.input.current_into(step - 1, &mut external);
            network.advance(&mut state, &external, self.dt);
            series.record(step, &state);
            for (cell, params) in network.cells().iter().enumerate() {
                if state.spike[cell] {
                    series.mark_peak(cell, step - 1, params.v_peak);
                }
            }
            if stop(step, &state) {
                series.truncate(step + 1);
                stopped = Some(step);
                break;
            }
        }

        let spikes: usize = (0..n_cells).map(|c| series.spike_count(c)).sum();
        debug!(n_cells, n_steps = series.n_steps(), spikes, "run finished");
        if !series.is_finite() {
            warn!("run produced non-finite values");
        }
        Ok((series, stopped))
    }
}

/// Run independent simulations in parallel; results come back in input order.
pub fn run_batch(simulations: &[Simulation]) -> Vec<Result<TimeSeries>> {
    simulations.par_iter().map(Simulation::run).collect()
}
