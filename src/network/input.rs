use crate::error::{Result, SimError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Square current pulse delivered to one cell on the step window
/// `[onset, offset)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub cell: usize,
    pub onset: usize,  //first step index (inclusive)
    pub offset: usize, //last step index (exclusive)
    pub amplitude: f64,
}

impl Pulse {
    pub fn new(cell: usize, onset: usize, offset: usize, amplitude: f64) -> Self {
        Pulse {
            cell,
            onset,
            offset,
            amplitude,
        }
    }

    fn is_active(&self, step: usize) -> bool {
        step >= self.onset && step < self.offset
    }
}

/// Experimenter-supplied current for every cell at every step.
///
/// Step `s` is the step the integrator is leaving: the current at index `s`
/// drives the transition from sample `s` to sample `s + 1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSchedule {
    /// sum of square pulses; overlapping pulses on a cell add
    Pulses(Vec<Pulse>),
    /// explicit table of shape (n_cells, n_steps)
    Dense(Array2<f64>),
}

impl Default for InputSchedule {
    fn default() -> Self {
        InputSchedule::Pulses(Vec::new())
    }
}

impl InputSchedule {
    /// no external input at all
    pub fn none() -> Self {
        Self::default()
    }

    pub fn square_pulse(cell: usize, onset: usize, offset: usize, amplitude: f64) -> Self {
        InputSchedule::Pulses(vec![Pulse::new(cell, onset, offset, amplitude)])
    }

    /// Tabulate `f(cell, step)` into a dense schedule.
    pub fn from_fn<F>(n_cells: usize, n_steps: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> f64,
    {
        InputSchedule::Dense(Array2::from_shape_fn((n_cells, n_steps), |(cell, step)| {
            f(cell, step)
        }))
    }

    /// Check the schedule against the network size and run length. Called
    /// before the first step so a bad schedule never fails mid-run.
    pub fn validate(&self, n_cells: usize, n_steps: usize) -> Result<()> {
        match self {
            InputSchedule::Pulses(pulses) => {
                for pulse in pulses {
                    if pulse.cell >= n_cells {
                        return Err(SimError::CellIndexOutOfRange {
                            index: pulse.cell,
                            n_cells,
                        });
                    }
                    if pulse.offset < pulse.onset {
                        return Err(SimError::InvalidParameter(format!(
                            "pulse on cell {} ends (step {}) before it starts (step {})",
                            pulse.cell, pulse.offset, pulse.onset
                        )));
                    }
                    if !pulse.amplitude.is_finite() {
                        return Err(SimError::InvalidParameter(format!(
                            "pulse on cell {} has a non-finite amplitude",
                            pulse.cell
                        )));
                    }
                }
                Ok(())
            }
            InputSchedule::Dense(table) => {
                let (rows, cols) = table.dim();
                if rows != n_cells {
                    return Err(SimError::ShapeMismatch {
                        what: "input schedule rows",
                        expected: n_cells,
                        actual: rows,
                    });
                }
                if cols < n_steps {
                    return Err(SimError::ShapeMismatch {
                        what: "input schedule columns",
                        expected: n_steps,
                        actual: cols,
                    });
                }
                Ok(())
            }
        }
    }

    /// Write the per-cell current for `step` into `out`, replacing its
    /// contents.
    pub fn current_into(&self, step: usize, out: &mut Array1<f64>) {
        match self {
            InputSchedule::Pulses(pulses) => {
                out.fill(0.0);
                for pulse in pulses.iter().filter(|p| p.is_active(step)) {
                    out[pulse.cell] += pulse.amplitude;
                }
            }
            InputSchedule::Dense(table) => out.assign(&table.column(step)),
        }
    }
}
