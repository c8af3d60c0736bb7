//! Critic, decision read-out and the two plasticity rules of the
//! category-learning task.

use super::stimulus::Category;
use crate::error::{ensure_positive, Result, SimError};
use ndarray::{ArrayView1, ArrayViewMut1, Zip};
use serde::{Deserialize, Serialize};

/// 1 for strictly positive arguments, 0 otherwise
#[inline]
pub fn heaviside(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Scaling of a weight change by how far post-synaptic activity sits from the
/// plasticity threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostsynapticGain {
    /// no dependence beyond the threshold gate
    #[default]
    Constant,
    /// `1 - exp(-lambda (post - theta))` above threshold,
    /// `exp(-lambda (theta - post))` below
    Exponential { lambda: f64 },
}

impl PostsynapticGain {
    pub fn validate(&self) -> Result<()> {
        match self {
            PostsynapticGain::Constant => Ok(()),
            PostsynapticGain::Exponential { lambda } => ensure_positive("lambda", *lambda),
        }
    }

    pub fn potentiation(&self, post: f64, theta: f64) -> f64 {
        match self {
            PostsynapticGain::Constant => 1.0,
            PostsynapticGain::Exponential { lambda } => 1.0 - (-lambda * (post - theta)).exp(),
        }
    }

    pub fn depression(&self, post: f64, theta: f64) -> f64 {
        match self {
            PostsynapticGain::Constant => 1.0,
            PostsynapticGain::Exponential { lambda } => (-lambda * (theta - post)).exp(),
        }
    }
}

/// Scalar reward predictor updated by the prediction error.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Critic {
    pub prediction: f64,
    pub rate: f64,
}

impl Critic {
    pub fn new(prediction: f64, rate: f64) -> Self {
        Critic { prediction, rate }
    }

    /// Compare `reward` with the current prediction, move the prediction
    /// toward it and return the prediction error.
    pub fn update(&mut self, reward: f64) -> f64 {
        let rpe = reward - self.prediction;
        self.prediction += self.rate * rpe;
        rpe
    }
}

/// Pool with the larger signal; a tie goes to A.
pub fn select_response(signal_a: f64, signal_b: f64) -> Category {
    if signal_b > signal_a {
        Category::B
    } else {
        Category::A
    }
}

/// Zero the losing pool's entry of a per-pool pair.
pub fn inhibit_loser(mut post: [f64; 2], winner: Category) -> [f64; 2] {
    post[winner.other().index()] = 0.0;
    post
}

/// Reward-gated update of sensory weights onto one striatal pool.
///
/// With `δ > 0` active synapses potentiate toward 1 at rate `alpha`;
/// otherwise they depress toward 0 at rate `beta`. Both require
/// post-synaptic activity above `theta`. When `gamma` is set, a weak
/// post-synaptic response (below `theta`) also depresses active synapses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreeFactorRule {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: Option<f64>,
    pub theta: f64,
    pub gain: PostsynapticGain,
}

impl ThreeFactorRule {
    pub fn apply(&self, weights: ArrayViewMut1<f64>, pre: ArrayView1<f64>, post: f64, rpe: f64) {
        let ltp = heaviside(post - self.theta) * self.gain.potentiation(post, self.theta);
        let ltd = heaviside(self.theta - post) * self.gain.depression(post, self.theta);
        let (alpha, beta) = (self.alpha, self.beta);
        let gamma = self.gamma.unwrap_or(0.0);

        Zip::from(weights).and(pre).for_each(|w, &x| {
            let mut dw = if rpe > 0.0 {
                alpha * x * ltp * (1.0 - *w) * rpe
            } else {
                beta * x * ltp * *w * rpe
            };
            dw -= gamma * x * ltd * *w;
            *w += dw;
        });
    }
}

/// Reward-free update of sensory weights onto one cortical pool:
/// potentiation toward 1 above `theta`, depression toward 0 below it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HebbianRule {
    pub alpha: f64,
    pub beta: f64,
    pub theta: f64,
    pub gain: PostsynapticGain,
}

impl HebbianRule {
    pub fn apply(&self, weights: ArrayViewMut1<f64>, pre: ArrayView1<f64>, post: f64) {
        let ltp = heaviside(post - self.theta) * self.gain.potentiation(post, self.theta);
        let ltd = heaviside(self.theta - post) * self.gain.depression(post, self.theta);
        let (alpha, beta) = (self.alpha, self.beta);

        Zip::from(weights).and(pre).for_each(|w, &x| {
            *w += alpha * x * ltp * (1.0 - *w) - beta * x * ltd * *w;
        });
    }
}

/// A learning rate that, multiplied by the largest presynaptic activity, must
/// stay within `[0, 1]` for single updates to keep weights inside `[0, 1]`.
pub(crate) fn ensure_bounded_rate(name: &str, rate: f64, max_pre: f64) -> Result<()> {
    if !rate.is_finite() || rate < 0.0 || rate * max_pre > 1.0 {
        return Err(SimError::InvalidParameter(format!(
            "{name} = {rate} with peak visual activity {max_pre} can push weights out of [0, 1]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn striatal(gamma: Option<f64>) -> ThreeFactorRule {
        ThreeFactorRule {
            alpha: 0.5,
            beta: 0.5,
            gamma,
            theta: 0.1,
            gain: PostsynapticGain::Constant,
        }
    }

    #[test]
    fn heaviside_is_strict() {
        assert_eq!(heaviside(1e-12), 1.0);
        assert_eq!(heaviside(0.0), 0.0);
        assert_eq!(heaviside(-3.0), 0.0);
    }

    #[test]
    fn tie_goes_to_pool_a() {
        assert_eq!(select_response(5.0, 5.0), Category::A);
        assert_eq!(select_response(0.0, 0.0), Category::A);
        assert_eq!(select_response(4.0, 5.0), Category::B);
        assert_eq!(select_response(6.0, 5.0), Category::A);
    }

    #[test]
    fn loser_is_silenced() {
        assert_eq!(inhibit_loser([3.0, 4.0], Category::B), [0.0, 4.0]);
        assert_eq!(inhibit_loser([3.0, 4.0], Category::A), [3.0, 0.0]);
    }

    #[test]
    fn critic_converges_to_reward_rate() {
        let mut critic = Critic::new(0.5, 0.01);
        for _ in 0..2000 {
            critic.update(1.0);
        }
        assert!((critic.prediction - 1.0).abs() < 1e-6);

        let mut critic = Critic::new(0.5, 0.01);
        let rpe = critic.update(0.0);
        assert_eq!(rpe, -0.5);
        assert!((critic.prediction - 0.495).abs() < 1e-12);
    }

    #[test]
    fn positive_rpe_potentiates_only_with_active_post() {
        let pre = Array1::from(vec![0.0, 1.0, 2.0]);
        let mut w = Array1::from_elem(3, 0.5);
        striatal(None).apply(w.view_mut(), pre.view(), 10.0, 1.0);
        assert_eq!(w[0], 0.5);
        assert!((w[1] - 0.75).abs() < 1e-12);
        assert!((w[2] - 1.0).abs() < 1e-12);

        let mut w = Array1::from_elem(3, 0.5);
        striatal(None).apply(w.view_mut(), pre.view(), 0.05, 1.0);
        assert_eq!(w, Array1::from_elem(3, 0.5));
    }

    #[test]
    fn negative_rpe_depresses() {
        let pre = Array1::from(vec![1.0]);
        let mut w = Array1::from_elem(1, 0.4);
        striatal(None).apply(w.view_mut(), pre.view(), 10.0, -1.0);
        assert!((w[0] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn weak_post_ltd_is_off_unless_configured() {
        let pre = Array1::from(vec![1.0]);
        let mut w = Array1::from_elem(1, 0.4);
        striatal(None).apply(w.view_mut(), pre.view(), 0.0, 1.0);
        assert_eq!(w[0], 0.4);
        striatal(Some(0.5)).apply(w.view_mut(), pre.view(), 0.0, 1.0);
        assert!((w[0] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn hebbian_rule_depresses_below_threshold() {
        let rule = HebbianRule {
            alpha: 0.5,
            beta: 0.5,
            theta: 0.1,
            gain: PostsynapticGain::Constant,
        };
        let pre = Array1::from(vec![1.0, 0.0]);
        let mut w = Array1::from_elem(2, 0.4);
        rule.apply(w.view_mut(), pre.view(), 0.0);
        assert!((w[0] - 0.2).abs() < 1e-12);
        assert_eq!(w[1], 0.4);

        rule.apply(w.view_mut(), pre.view(), 5.0);
        assert!((w[0] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn exponential_gain_stays_in_unit_interval() {
        let gain = PostsynapticGain::Exponential { lambda: 1e-3 };
        assert!(gain.validate().is_ok());
        assert!(PostsynapticGain::Exponential { lambda: 0.0 }.validate().is_err());
        for post in [0.2, 1.0, 1e3, 1e6] {
            let g = gain.potentiation(post, 0.1);
            assert!(g > 0.0 && g < 1.0 + 1e-15);
        }
        for post in [0.0, -10.0, -1e6] {
            let g = gain.depression(post, 0.1);
            assert!((0.0..=1.0).contains(&g));
        }
    }

    #[test]
    fn updates_never_leave_the_unit_interval() {
        let mut rng = StdRng::seed_from_u64(42);
        let max_pre = 1.5;
        let three = ThreeFactorRule {
            alpha: 0.5,
            beta: 0.5,
            gamma: Some(0.5),
            theta: 0.1,
            gain: PostsynapticGain::Exponential { lambda: 0.01 },
        };
        let hebb = HebbianRule {
            alpha: 0.5,
            beta: 0.5,
            theta: 0.1,
            gain: PostsynapticGain::Constant,
        };
        let mut w = Array2::from_shape_fn((50, 2), |_| rng.gen_range(0.0..=1.0));
        w[(0, 0)] = 0.0;
        w[(1, 0)] = 1.0;

        for _ in 0..500 {
            let pre = Array1::from_shape_fn(50, |_| rng.gen_range(0.0..=max_pre));
            let post = rng.gen_range(-1.0..1000.0);
            let rpe = rng.gen_range(-1.0..=1.0);
            three.apply(w.column_mut(0), pre.view(), post, rpe);
            hebb.apply(w.column_mut(1), pre.view(), post);
            assert!(w.iter().all(|x| (0.0..=1.0).contains(x)));
        }
    }

    #[test]
    fn oversized_rates_are_rejected() {
        assert!(ensure_bounded_rate("alpha_w", 0.05, 2.0).is_ok());
        assert!(ensure_bounded_rate("alpha_w", 0.6, 2.0).is_err());
        assert!(ensure_bounded_rate("alpha_w", -0.1, 2.0).is_err());
    }
}
