//! Izhikevich spiking networks: single cells, hand-wired circuits and a
//! reinforcement-learning basal-ganglia model, all integrated with a fixed
//! step forward Euler scheme.

pub mod circuits;
pub mod error;
pub mod learning;
pub mod network;
pub mod neuron;
pub mod synapse;

pub use circuits::Circuit;
pub use error::{Result, SimError};
pub use learning::{CategoryLearning, LearningParameters, LearningResult};
pub use network::{run_batch, InputSchedule, Network, NetworkState, Simulation, TimeSeries};
pub use neuron::{CellParameters, CellState, CellType};
pub use synapse::SynapseParameters;
