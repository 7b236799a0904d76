//! Dense (fully-connected) layer

use super::Layer;
use crate::tensor::{Matrix, Vector};

/// Affine transform between fixed-width frames: `output = W * input + bias`
///
/// Stateless; `reset()` is a no-op.
#[derive(Debug, Clone)]
pub struct Dense {
    weights: Matrix,
    bias: Vector,
}

impl Dense {
    /// Create a dense layer from loaded parameters
    ///
    /// `weights` is `out_width x in_width`, `bias` is `out_width`. Shapes
    /// are validated by the loader before construction.
    pub fn new(weights: Matrix, bias: Vector) -> Self {
        debug_assert_eq!(weights.rows(), bias.len());
        Self { weights, bias }
    }
}

impl Layer for Dense {
    fn layer_type(&self) -> &'static str {
        "dense"
    }

    fn in_width(&self) -> usize {
        self.weights.cols()
    }

    fn out_width(&self) -> usize {
        self.weights.rows()
    }

    fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        self.weights.mul_vec_into(input, output);
        for (out, b) in output.iter_mut().zip(self.bias.iter()) {
            *out += b;
        }
    }

    fn reset(&mut self) {
        // Stateless
    }
}
