use super::NetworkState;
use ndarray::{s, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Recorded trajectory of every cell over a run.
///
/// Each array has shape (n_cells, n_steps); column 0 is the initial state.
/// When a cell spikes on step `t`, the membrane sample at `t - 1` is
/// overwritten with that cell's `v_peak` so the trace shows a full spike; the
/// dynamics never read this value back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub dt: f64,
    pub v: Array2<f64>,
    pub u: Array2<f64>,
    pub g: Array2<f64>,
    pub spike: Array2<bool>,
}

impl TimeSeries {
    pub(crate) fn new(n_cells: usize, n_steps: usize, dt: f64) -> Self {
        TimeSeries {
            dt,
            v: Array2::zeros((n_cells, n_steps)),
            u: Array2::zeros((n_cells, n_steps)),
            g: Array2::zeros((n_cells, n_steps)),
            spike: Array2::from_elem((n_cells, n_steps), false),
        }
    }

    pub(crate) fn record(&mut self, step: usize, state: &NetworkState) {
        self.v.column_mut(step).assign(&state.v);
        self.u.column_mut(step).assign(&state.u);
        self.g.column_mut(step).assign(&state.g);
        self.spike.column_mut(step).assign(&state.spike);
    }

    pub(crate) fn mark_peak(&mut self, cell: usize, step: usize, v_peak: f64) {
        self.v[(cell, step)] = v_peak;
    }

    /// Keep only the first `n_steps` samples (used when a trial stops early).
    pub(crate) fn truncate(&mut self, n_steps: usize) {
        self.v = self.v.slice(s![.., ..n_steps]).to_owned();
        self.u = self.u.slice(s![.., ..n_steps]).to_owned();
        self.g = self.g.slice(s![.., ..n_steps]).to_owned();
        self.spike = self.spike.slice(s![.., ..n_steps]).to_owned();
    }

    pub fn n_cells(&self) -> usize {
        self.v.nrows()
    }

    pub fn n_steps(&self) -> usize {
        self.v.ncols()
    }

    /// sample times in ms
    pub fn times(&self) -> Vec<f64> {
        (0..self.n_steps()).map(|i| i as f64 * self.dt).collect()
    }

    /// step indices at which `cell` spiked
    pub fn spike_steps(&self, cell: usize) -> Vec<usize> {
        self.spike
            .row(cell)
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.then_some(i))
            .collect()
    }

    pub fn first_spike(&self, cell: usize) -> Option<usize> {
        self.spike.row(cell).iter().position(|s| *s)
    }

    pub fn spike_count(&self, cell: usize) -> usize {
        self.spike.row(cell).iter().filter(|s| **s).count()
    }

    /// largest conductance of `cell` inside the step window
    pub fn peak_conductance(&self, cell: usize, window: Range<usize>) -> f64 {
        self.g
            .slice(s![cell, window])
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// sum of the recorded conductance samples of `cell`
    pub fn accumulated_conductance(&self, cell: usize) -> f64 {
        self.g.row(cell).sum()
    }

    /// per-cell sum of the conductance samples
    pub fn accumulated_conductances(&self) -> Vec<f64> {
        self.g.sum_axis(Axis(1)).to_vec()
    }

    /// false if any recorded value diverged to NaN or infinity
    pub fn is_finite(&self) -> bool {
        self.v.iter().all(|x| x.is_finite())
            && self.u.iter().all(|x| x.is_finite())
            && self.g.iter().all(|x| x.is_finite())
    }
}
