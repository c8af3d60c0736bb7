//! Trial-based category learning in a two-pool basal-ganglia loop.
//!
//! Each pool (A and B) is a chain striatum -| GPi -| thalamus -> premotor
//! cortex; the two striatal cells inhibit each other. A visual Gaussian bump
//! drives the striatal and premotor cells through two learned weight
//! matrices of shape `(vis_dim², 2)`, one column per pool. After every trial
//! the pool with the larger accumulated premotor conductance is the response,
//! the critic scores it, and both matrices are updated.

use crate::error::{ensure_positive, Result, SimError};
use crate::network::{InputSchedule, Network, Pulse, Simulation, TimeSeries};
use crate::neuron::CellType;
use crate::synapse::SynapseParameters;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod rules;
pub mod stimulus;

pub use rules::{Critic, HebbianRule, PostsynapticGain, ThreeFactorRule};
pub use stimulus::{visual_field, Category, Stimulus};

/// Cell indices of the learning network, A/B pairs side by side.
pub mod cells {
    pub const MSN_A: usize = 0;
    pub const MSN_B: usize = 1;
    pub const GPI_A: usize = 2;
    pub const GPI_B: usize = 3;
    pub const THL_A: usize = 4;
    pub const THL_B: usize = 5;
    pub const PM_A: usize = 6;
    pub const PM_B: usize = 7;

    pub const LABELS: [&str; 8] = [
        "msn_a", "msn_b", "gpi_a", "gpi_b", "thl_a", "thl_b", "pm_a", "pm_b",
    ];
}

///includes all configurable parameters of the learning task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningParameters {
    pub n_trials: usize,
    pub duration: f64, //trial length T (ms)
    pub dt: f64,
    pub psp_amp: f64,
    pub psp_decay: f64,

    pub vis_dim: usize,   //visual grid side
    pub vis_amp: f64,     //peak visual activity
    pub vis_width: f64,   //bump width in grid units
    pub w_init: (f64, f64), //initial sensory weights drawn from [low, high)

    pub w_msn_msn: f64,
    pub w_msn_gpi: f64,
    pub w_gpi_thl: f64,
    pub w_thl_pm: f64,
    pub tonic_msn: f64,
    pub tonic_gpi: f64,
    pub tonic_thl: f64,
    pub tonic_pm: f64,

    pub alpha_critic: f64,
    pub initial_prediction: f64,
    pub alpha_w: f64, //striatal potentiation rate
    pub beta_w: f64,  //striatal depression rate
    pub gamma_w: f64, //weak-post depression rate, used only with weak_post_ltd
    pub weak_post_ltd: bool,
    pub theta: f64,
    pub alpha_w2: f64, //cortical potentiation rate
    pub beta_w2: f64,  //cortical depression rate
    pub gain: PostsynapticGain,

    /// end a trial as soon as one premotor conductance leads the other by
    /// more than this
    pub response_threshold: Option<f64>,
    pub seed: u64,
}

impl Default for LearningParameters {
    fn default() -> Self {
        LearningParameters {
            n_trials: 500,
            duration: 3000.0,
            dt: 0.1,
            psp_amp: 3e5,
            psp_decay: 100.0,
            vis_dim: 100,
            vis_amp: 2.0,
            vis_width: 10.0,
            w_init: (0.2, 0.4),
            w_msn_msn: -0.5,
            w_msn_gpi: -1.0,
            w_gpi_thl: -1000.0,
            w_thl_pm: 1.0,
            tonic_msn: 0.0,
            tonic_gpi: 100.0,
            tonic_thl: 100.0,
            tonic_pm: 0.0,
            alpha_critic: 0.01,
            initial_prediction: 0.5,
            alpha_w: 0.05,
            beta_w: 0.05,
            gamma_w: 0.01,
            weak_post_ltd: false,
            theta: 0.1,
            alpha_w2: 0.02,
            beta_w2: 0.02,
            gain: PostsynapticGain::Constant,
            response_threshold: None,
            seed: 0,
        }
    }
}

impl LearningParameters {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("dt", self.dt)?;
        ensure_positive("duration", self.duration)?;
        ensure_positive("psp_decay", self.psp_decay)?;
        ensure_positive("vis_width", self.vis_width)?;
        if self.vis_dim == 0 {
            return Err(SimError::InvalidParameter(
                "vis_dim must be at least 1".to_string(),
            ));
        }
        if !self.vis_amp.is_finite() || self.vis_amp < 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "vis_amp must be finite and non-negative, got {}",
                self.vis_amp
            )));
        }
        let (low, high) = self.w_init;
        if !(0.0 <= low && low < high && high <= 1.0) {
            return Err(SimError::InvalidParameter(format!(
                "initial weight range [{low}, {high}) must lie inside [0, 1]"
            )));
        }
        for (name, p) in [
            ("alpha_critic", self.alpha_critic),
            ("initial_prediction", self.initial_prediction),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::InvalidParameter(format!(
                    "{name} must lie in [0, 1], got {p}"
                )));
            }
        }
        for (name, rate) in [
            ("alpha_w", self.alpha_w),
            ("beta_w", self.beta_w),
            ("gamma_w", self.gamma_w),
            ("alpha_w2", self.alpha_w2),
            ("beta_w2", self.beta_w2),
        ] {
            rules::ensure_bounded_rate(name, rate, self.vis_amp)?;
        }
        if !self.theta.is_finite() {
            return Err(SimError::InvalidParameter("theta must be finite".to_string()));
        }
        if let Some(threshold) = self.response_threshold {
            ensure_positive("response_threshold", threshold)?;
        }
        self.gain.validate()
    }

    pub fn n_steps(&self) -> usize {
        crate::network::step_count(self.duration, self.dt)
    }

    /// first step carrying visual input
    pub fn stimulus_onset(&self) -> usize {
        self.n_steps() / 3
    }

    /// The eight-cell network, without visual input.
    pub fn network(&self) -> Result<Network> {
        use cells::*;
        let n = LABELS.len();
        let mut weights = Array2::zeros((n, n));
        for (msn, gpi, thl, pm) in [(MSN_A, GPI_A, THL_A, PM_A), (MSN_B, GPI_B, THL_B, PM_B)] {
            weights[(msn, gpi)] = self.w_msn_gpi;
            weights[(gpi, thl)] = self.w_gpi_thl;
            weights[(thl, pm)] = self.w_thl_pm;
        }
        weights[(MSN_A, MSN_B)] = self.w_msn_msn;
        weights[(MSN_B, MSN_A)] = self.w_msn_msn;

        let tonic = Array1::from_shape_fn(n, |i| match i {
            MSN_A | MSN_B => self.tonic_msn,
            GPI_A | GPI_B => self.tonic_gpi,
            THL_A | THL_B => self.tonic_thl,
            _ => self.tonic_pm,
        });
        let parameters = (0..n)
            .map(|i| match i {
                MSN_A | MSN_B => CellType::StriatalProjection.parameters(),
                _ => CellType::RegularSpiking.parameters(),
            })
            .collect();

        Network::new(
            parameters,
            weights,
            tonic,
            SynapseParameters::new(self.psp_amp, self.psp_decay),
        )?
        .with_labels(LABELS.to_vec())
    }

    fn striatal_rule(&self) -> ThreeFactorRule {
        ThreeFactorRule {
            alpha: self.alpha_w,
            beta: self.beta_w,
            gamma: self.weak_post_ltd.then_some(self.gamma_w),
            theta: self.theta,
            gain: self.gain,
        }
    }

    fn cortical_rule(&self) -> HebbianRule {
        HebbianRule {
            alpha: self.alpha_w2,
            beta: self.beta_w2,
            theta: self.theta,
            gain: self.gain,
        }
    }
}

/// Everything observed on one trial.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial: usize,
    pub stimulus: Stimulus,
    pub category: Category,
    pub response: Category,
    pub reaction_step: usize, //last integrated step
    pub reward: f64,
    pub prediction: f64, //critic prediction before the update
    pub rpe: f64,
}

impl TrialRecord {
    pub fn correct(&self) -> bool {
        self.category == self.response
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearningResult {
    pub trials: Vec<TrialRecord>,
    pub w_vis_msn: Array2<f64>,
    pub w_vis_pm: Array2<f64>,
    pub final_prediction: f64,
    /// full series of the last trial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trial: Option<TimeSeries>,
}

impl LearningResult {
    /// fraction of correct responses over `trials`
    pub fn accuracy(&self, trials: std::ops::Range<usize>) -> f64 {
        let end = trials.end.min(self.trials.len());
        let window = &self.trials[trials.start.min(end)..end];
        if window.is_empty() {
            return 0.0;
        }
        window.iter().filter(|t| t.correct()).count() as f64 / window.len() as f64
    }
}

/// Driver of the learning task; owns the network, both sensory weight
/// matrices, the critic and the random stream.
pub struct CategoryLearning {
    params: LearningParameters,
    network: Network,
    w_vis_msn: Array2<f64>,
    w_vis_pm: Array2<f64>,
    critic: Critic,
    rng: StdRng,
    trial: usize,
}

impl CategoryLearning {
    pub fn new(params: LearningParameters) -> Result<Self> {
        params.validate()?;
        let network = params.network()?;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let (low, high) = params.w_init;
        let n_inputs = params.vis_dim * params.vis_dim;
        let w_vis_msn = Array2::from_shape_fn((n_inputs, 2), |_| rng.gen_range(low..high));
        let w_vis_pm = Array2::from_shape_fn((n_inputs, 2), |_| rng.gen_range(low..high));
        let critic = Critic::new(params.initial_prediction, params.alpha_critic);

        Ok(CategoryLearning {
            params,
            network,
            w_vis_msn,
            w_vis_pm,
            critic,
            rng,
            trial: 0,
        })
    }

    pub fn parameters(&self) -> &LearningParameters {
        &self.params
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn critic(&self) -> &Critic {
        &self.critic
    }

    pub fn weights(&self) -> (&Array2<f64>, &Array2<f64>) {
        (&self.w_vis_msn, &self.w_vis_pm)
    }

    /// Replace both sensory weight matrices.
    pub fn set_weights(&mut self, w_vis_msn: Array2<f64>, w_vis_pm: Array2<f64>) -> Result<()> {
        let expected = (self.params.vis_dim * self.params.vis_dim, 2);
        for w in [&w_vis_msn, &w_vis_pm] {
            if w.dim() != expected {
                return Err(SimError::ShapeMismatch {
                    what: "sensory weight matrix rows",
                    expected: expected.0,
                    actual: w.nrows(),
                });
            }
            if !w.iter().all(|x| (0.0..=1.0).contains(x)) {
                return Err(SimError::InvalidParameter(
                    "sensory weights must lie in [0, 1]".to_string(),
                ));
            }
        }
        self.w_vis_msn = w_vis_msn;
        self.w_vis_pm = w_vis_pm;
        Ok(())
    }

    /// The trial's network input: each pool's visual current, constant from
    /// the stimulus onset to the end of the trial.
    fn trial_input(&self, vis: &Array1<f64>) -> InputSchedule {
        use cells::*;
        let onset = self.params.stimulus_onset();
        let end = self.params.n_steps();
        let mut pulses = Vec::with_capacity(4);
        for pool in [Category::A, Category::B] {
            let p = pool.index();
            let to_msn = vis.dot(&self.w_vis_msn.column(p));
            let to_pm = vis.dot(&self.w_vis_pm.column(p));
            pulses.push(Pulse::new(MSN_A + p, onset, end, to_msn));
            pulses.push(Pulse::new(PM_A + p, onset, end, to_pm));
        }
        InputSchedule::Pulses(pulses)
    }

    /// Present one stimulus, read out the response, then update the critic
    /// and both weight matrices. Returns the record and the trial's series.
    pub fn run_trial_with(&mut self, stimulus: Stimulus) -> Result<(TrialRecord, TimeSeries)> {
        use cells::*;
        let params = &self.params;
        let category = stimulus.category();
        let vis = visual_field(&stimulus, params.vis_dim, params.vis_amp, params.vis_width);

        let simulation = Simulation::new(self.network.clone(), params.dt, params.duration)
            .with_input(self.trial_input(&vis));

        let threshold = params.response_threshold;
        let mut early = None;
        let (series, stopped) = simulation.run_until(|_, state| {
            let Some(threshold) = threshold else {
                return false;
            };
            let lead = state.g[PM_A] - state.g[PM_B];
            if lead > threshold {
                early = Some(Category::A);
            } else if -lead > threshold {
                early = Some(Category::B);
            }
            early.is_some()
        })?;

        let acc = series.accumulated_conductances();
        let response =
            early.unwrap_or_else(|| rules::select_response(acc[PM_A], acc[PM_B]));
        let reaction_step = stopped.unwrap_or(series.n_steps() - 1);

        let reward = if response == category { 1.0 } else { 0.0 };
        let prediction = self.critic.prediction;
        let rpe = self.critic.update(reward);

        let msn_post = rules::inhibit_loser([acc[MSN_A], acc[MSN_B]], response);
        let pm_post = rules::inhibit_loser([acc[PM_A], acc[PM_B]], response);
        let striatal = self.params.striatal_rule();
        let cortical = self.params.cortical_rule();
        for pool in 0..2 {
            striatal.apply(self.w_vis_msn.column_mut(pool), vis.view(), msn_post[pool], rpe);
            cortical.apply(self.w_vis_pm.column_mut(pool), vis.view(), pm_post[pool]);
        }

        let record = TrialRecord {
            trial: self.trial,
            stimulus,
            category,
            response,
            reaction_step,
            reward,
            prediction,
            rpe,
        };
        self.trial += 1;
        debug!(
            trial = record.trial,
            ?category,
            ?response,
            reaction_step,
            rpe,
            "trial finished"
        );
        Ok((record, series))
    }

    /// Draw a stimulus and run one trial.
    pub fn run_trial(&mut self) -> Result<(TrialRecord, TimeSeries)> {
        let stimulus = Stimulus::sample(&mut self.rng, self.params.vis_dim as f64);
        self.run_trial_with(stimulus)
    }

    /// Run every trial and hand back the learned state.
    pub fn run(mut self) -> Result<LearningResult> {
        let n_trials = self.params.n_trials;
        let mut trials = Vec::with_capacity(n_trials);
        let mut last_trial = None;
        for _ in 0..n_trials {
            let (record, series) = self.run_trial()?;
            trials.push(record);
            last_trial = Some(series);
        }

        let result = LearningResult {
            trials,
            w_vis_msn: self.w_vis_msn,
            w_vis_pm: self.w_vis_pm,
            final_prediction: self.critic.prediction,
            last_trial,
        };
        info!(
            n_trials,
            accuracy = result.accuracy(0..n_trials),
            prediction = result.final_prediction,
            "learning finished"
        );
        Ok(result)
    }
}
