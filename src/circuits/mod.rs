//! Catalog of hand-wired networks.
//!
//! Two families: three regular-spiking cells (A, B, C) showing propagation,
//! inhibition and recurrence, and an eight-cell basal-ganglia loop with the
//! direct, indirect and hyperdirect pathways. Every circuit is driven by a
//! square pulse on its first cell over the middle third of the run.

use crate::error::{Result, SimError};
use crate::network::{InputSchedule, Network, Simulation};
use crate::neuron::{CellParameters, CellType};
use crate::synapse::SynapseParameters;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CIRCUIT_DT: f64 = 0.1;
pub const CIRCUIT_DURATION: f64 = 3000.0;
pub const CIRCUIT_JITTER_MV: f64 = 5.0;

/// gain of dopamine on the cortico-striatal weights
pub const K_DA: f64 = 0.6;

pub const DEFAULT_W_STN_GPE: f64 = 20.0;
pub const DEFAULT_W_GPE_STN: f64 = 50.0;

/// Basal-ganglia cell indices.
pub mod bg {
    pub const CTX: usize = 0;
    pub const D1: usize = 1;
    pub const D2: usize = 2;
    pub const GPI: usize = 3;
    pub const GPE: usize = 4;
    pub const TH: usize = 5;
    pub const STN: usize = 6;
    pub const PM: usize = 7;

    pub const LABELS: [&str; 8] = ["ctx", "d1", "d2", "gpi", "gpe", "th", "stn", "pm"];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Circuit {
    /// A -> B -> C
    FeedforwardChain,
    /// A -> B -| C with B tonically active
    TonicDisinhibition,
    /// A excites an inhibitory relay B that silences C
    InhibitoryRelay,
    /// A -> B -> C -> A
    RecurrentLoop,
    /// ctx -> d1 -| gpi -| th -> pm
    DirectPathway,
    /// direct, indirect and hyperdirect pathways with the STN-GPe loop
    BasalGanglia,
}

impl Circuit {
    pub const ALL: [Circuit; 6] = [
        Circuit::FeedforwardChain,
        Circuit::TonicDisinhibition,
        Circuit::InhibitoryRelay,
        Circuit::RecurrentLoop,
        Circuit::DirectPathway,
        Circuit::BasalGanglia,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Circuit::FeedforwardChain => "feedforward-chain",
            Circuit::TonicDisinhibition => "tonic-disinhibition",
            Circuit::InhibitoryRelay => "inhibitory-relay",
            Circuit::RecurrentLoop => "recurrent-loop",
            Circuit::DirectPathway => "direct-pathway",
            Circuit::BasalGanglia => "basal-ganglia",
        }
    }

    /// Build the circuit with its stock parameters.
    pub fn build(self) -> Result<Simulation> {
        match self {
            Circuit::FeedforwardChain => three_cell(&[(0, 1, 80.0), (1, 2, 80.0)], [0.0; 3]),
            Circuit::TonicDisinhibition => {
                three_cell(&[(0, 1, 80.0), (1, 2, -120.0)], [0.0, 300.0, 0.0])
            }
            Circuit::InhibitoryRelay => three_cell(&[(0, 1, 100.0), (1, 2, -140.0)], [0.0; 3]),
            Circuit::RecurrentLoop => {
                three_cell(&[(0, 1, 70.0), (1, 2, 70.0), (2, 0, 70.0)], [0.0; 3])
            }
            Circuit::DirectPathway => direct_pathway(),
            Circuit::BasalGanglia => full_basal_ganglia(DEFAULT_W_STN_GPE, DEFAULT_W_GPE_STN),
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pulse on cell 0 over the middle third of the run.
fn middle_third_pulse(amplitude: f64) -> InputSchedule {
    let n_steps = crate::network::step_count(CIRCUIT_DURATION, CIRCUIT_DT);
    InputSchedule::square_pulse(0, n_steps / 3, 2 * n_steps / 3, amplitude)
}

fn wire(n: usize, edges: &[(usize, usize, f64)]) -> Array2<f64> {
    let mut weights = Array2::zeros((n, n));
    for &(pre, post, w) in edges {
        weights[(pre, post)] = w;
    }
    weights
}

fn three_cell(edges: &[(usize, usize, f64)], tonic: [f64; 3]) -> Result<Simulation> {
    let network = Network::new(
        vec![CellType::RegularSpiking.parameters(); 3],
        wire(3, edges),
        Array1::from(tonic.to_vec()),
        SynapseParameters::default(),
    )?
    .with_labels(vec!["a", "b", "c"])?;

    Ok(Simulation::new(network, CIRCUIT_DT, CIRCUIT_DURATION)
        .with_input(middle_third_pulse(200.0))
        .with_jitter(CIRCUIT_JITTER_MV, 0))
}

fn basal_ganglia_cells() -> Vec<CellParameters> {
    (0..bg::LABELS.len())
        .map(|i| match i {
            bg::D1 | bg::D2 => CellType::StriatalProjection.parameters(),
            _ => CellType::RegularSpiking.parameters(),
        })
        .collect()
}

fn basal_ganglia(edges: &[(usize, usize, f64)], tonic: &[(usize, f64)]) -> Result<Simulation> {
    let n = bg::LABELS.len();
    let mut drive = Array1::zeros(n);
    for &(cell, e) in tonic {
        drive[cell] = e;
    }
    let network = Network::new(
        basal_ganglia_cells(),
        wire(n, edges),
        drive,
        SynapseParameters::default(),
    )?
    .with_labels(bg::LABELS.to_vec())?;

    Ok(Simulation::new(network, CIRCUIT_DT, CIRCUIT_DURATION)
        .with_input(middle_third_pulse(300.0))
        .with_jitter(CIRCUIT_JITTER_MV, 0))
}

const DIRECT_EDGES: [(usize, usize, f64); 4] = [
    (bg::CTX, bg::D1, 250.0),
    (bg::D1, bg::GPI, -150.0),
    (bg::GPI, bg::TH, -120.0),
    (bg::TH, bg::PM, 120.0),
];

pub fn direct_pathway() -> Result<Simulation> {
    basal_ganglia(&DIRECT_EDGES, &[(bg::GPI, 300.0), (bg::TH, 500.0)])
}

/// Full circuit with the STN-GPe loop strengths as parameters;
/// `w_gpe_stn` is the magnitude of the inhibitory GPe -> STN synapse.
pub fn full_basal_ganglia(w_stn_gpe: f64, w_gpe_stn: f64) -> Result<Simulation> {
    let mut edges = DIRECT_EDGES.to_vec();
    edges.extend([
        (bg::CTX, bg::D2, 250.0),
        (bg::D2, bg::GPE, -120.0),
        (bg::GPE, bg::GPI, -40.0),
        (bg::CTX, bg::STN, 220.0),
        (bg::STN, bg::GPI, 80.0),
        (bg::STN, bg::GPE, w_stn_gpe),
        (bg::GPE, bg::STN, -w_gpe_stn),
    ]);
    basal_ganglia(
        &edges,
        &[(bg::GPI, 300.0), (bg::GPE, 260.0), (bg::TH, 500.0)],
    )
}

/// Full circuit with the cortico-striatal weights scaled by dopamine level
/// `da`: D1 gain `max(0, 1 + K_DA da)`, D2 gain `max(0, 1 - K_DA da)`.
pub fn dopamine_modulated(da: f64) -> Result<Simulation> {
    if !da.is_finite() {
        return Err(SimError::InvalidParameter(format!(
            "dopamine level must be finite, got {da}"
        )));
    }
    let mut simulation = full_basal_ganglia(DEFAULT_W_STN_GPE, DEFAULT_W_GPE_STN)?;
    let network = &mut simulation.network;
    let d1 = network.weights()[(bg::CTX, bg::D1)] * (1.0 + K_DA * da).max(0.0);
    let d2 = network.weights()[(bg::CTX, bg::D2)] * (1.0 - K_DA * da).max(0.0);
    network.set_weight(bg::CTX, bg::D1, d1)?;
    network.set_weight(bg::CTX, bg::D2, d2)?;
    Ok(simulation)
}
