//! JSON description of a complete run.
//!
//! A file holds the cells (a named preset or explicit parameters), the weight
//! matrix as nested rows, tonic drive, synapse constants, the time grid, the
//! external input and the seed of the initial jitter.

use super::{InputSchedule, Network, Simulation};
use crate::error::{Result, SimError};
use crate::neuron::{CellParameters, CellType};
use crate::synapse::SynapseParameters;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellData {
    Preset(CellType),
    Custom(CellParameters),
}

impl CellData {
    pub fn parameters(&self) -> CellParameters {
        match self {
            CellData::Preset(preset) => preset.parameters(),
            CellData::Custom(parameters) => *parameters,
        }
    }

    /// Name the preset if `parameters` matches one exactly.
    fn describe(parameters: &CellParameters) -> Self {
        [CellType::RegularSpiking, CellType::StriatalProjection]
            .into_iter()
            .find(|preset| preset.parameters() == *parameters)
            .map(CellData::Preset)
            .unwrap_or(CellData::Custom(*parameters))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    pub cells: Vec<CellData>,
    pub weights: Vec<Vec<f64>>, // rows are presynaptic cells
    #[serde(default)]
    pub tonic: Vec<f64>, // empty means no tonic drive
    #[serde(default)]
    pub synapse: SynapseParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synapses: Option<Vec<SynapseParameters>>, // per-cell override of `synapse`
    pub dt: f64,
    pub duration: f64,
    #[serde(default)]
    pub input: InputSchedule,
    #[serde(default)]
    pub jitter_mv: f64,
    #[serde(default)]
    pub seed: u64,
}

impl NetworkData {
    pub fn from_simulation(simulation: &Simulation) -> Self {
        let network = &simulation.network;
        let synapses = network.synapses();
        let shared = synapses.iter().all(|s| *s == synapses[0]);
        NetworkData {
            labels: Some(network.labels().to_vec()),
            cells: network.cells().iter().map(CellData::describe).collect(),
            weights: network
                .weights()
                .outer_iter()
                .map(|row| row.to_vec())
                .collect(),
            tonic: network.tonic_drive().to_vec(),
            synapse: synapses.first().copied().unwrap_or_default(),
            synapses: (!shared).then(|| synapses.to_vec()),
            dt: simulation.dt,
            duration: simulation.duration,
            input: simulation.input.clone(),
            jitter_mv: simulation.jitter_mv,
            seed: simulation.seed,
        }
    }

    pub fn into_simulation(self) -> Result<Simulation> {
        let n = self.cells.len();
        let cols = self.weights.first().map_or(0, Vec::len);
        if let Some(row) = self.weights.iter().find(|row| row.len() != cols) {
            return Err(SimError::ShapeMismatch {
                what: "weight matrix row",
                expected: cols,
                actual: row.len(),
            });
        }
        let rows = self.weights.len();
        let flat: Vec<f64> = self.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((rows, cols), flat).map_err(|_| {
            SimError::InvalidParameter("weight matrix could not be shaped".to_string())
        })?;

        let tonic = if self.tonic.is_empty() {
            Array1::zeros(n)
        } else {
            Array1::from(self.tonic)
        };
        let cells = self.cells.iter().map(CellData::parameters).collect();
        let synapses = self.synapses.unwrap_or_else(|| vec![self.synapse; n]);

        let mut network = Network::with_synapses(cells, weights, tonic, synapses)?;
        if let Some(labels) = self.labels {
            network = network.with_labels(labels)?;
        }

        let simulation = Simulation {
            network,
            dt: self.dt,
            duration: self.duration,
            input: self.input,
            jitter_mv: self.jitter_mv,
            seed: self.seed,
        };
        simulation.validate()?;
        Ok(simulation)
    }
}

/// Read and validate a run description.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Simulation> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let data: NetworkData = serde_json::from_str(&content)?;
    debug!(path = %path.display(), cells = data.cells.len(), "loaded network file");
    data.into_simulation()
}

pub fn save_to_file<P: AsRef<Path>>(simulation: &Simulation, path: P) -> Result<()> {
    let data = NetworkData::from_simulation(simulation);
    fs::write(path, serde_json::to_string_pretty(&data)?)?;
    Ok(())
}
