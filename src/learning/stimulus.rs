use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Category label, and the pool that reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    A,
    B,
}

impl Category {
    /// column of the pool in the weight matrices, and offset inside a pair
    pub fn index(self) -> usize {
        match self {
            Category::A => 0,
            Category::B => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Category::A => Category::B,
            Category::B => Category::A,
        }
    }
}

/// A point in the two-dimensional feature space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub x: f64,
    pub y: f64,
}

impl Stimulus {
    pub fn new(x: f64, y: f64) -> Self {
        Stimulus { x, y }
    }

    /// both coordinates uniform on `[0, extent)`
    pub fn sample<R: Rng>(rng: &mut R, extent: f64) -> Self {
        Stimulus {
            x: rng.gen_range(0.0..extent),
            y: rng.gen_range(0.0..extent),
        }
    }

    /// A when the stimulus lies below the diagonal (x > y), B otherwise
    pub fn category(&self) -> Category {
        if self.x > self.y {
            Category::A
        } else {
            Category::B
        }
    }
}

/// Gaussian bump of visual activity centred on the stimulus, over a
/// `dim × dim` grid flattened row-major (`row * dim + col`).
///
/// The unit at (row, col) responds with
/// `amp * exp(-((col - x)² + (row - y)²) / (2 width²))`.
pub fn visual_field(stimulus: &Stimulus, dim: usize, amp: f64, width: f64) -> Array1<f64> {
    let denom = 2.0 * width * width;
    Array1::from_shape_fn(dim * dim, |i| {
        let (row, col) = ((i / dim) as f64, (i % dim) as f64);
        let d2 = (col - stimulus.x).powi(2) + (row - stimulus.y).powi(2);
        amp * (-d2 / denom).exp()
    })
}
