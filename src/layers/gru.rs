//! GRU layer
//!
//! Gated recurrent unit with an internal hidden-state vector. Gate order is
//! update (z), reset (r), candidate (h~):
//!
//! ```text
//! z  = sigmoid(Wz*x + Uz*h + bz)
//! r  = sigmoid(Wr*x + Ur*h + br)
//! h~ = tanh(Wh*x + bh + r .* (Uh*h))
//! h' = (1 - z) .* h + z .* h~
//! ```
//!
//! The update gate scales the candidate, so z = 0 freezes the previous
//! hidden state exactly. The reset gate applies to the recurrent matrix
//! product, before the candidate bias.

use super::Layer;
use crate::activation::sigmoid;
use crate::tensor::{Matrix, Vector};

/// Parameters for one GRU gate
///
/// `weights` is `hidden x in_width`, `recurrent` is `hidden x hidden`,
/// `bias` is `hidden`.
#[derive(Debug, Clone)]
pub struct GruGate {
    pub weights: Matrix,
    pub recurrent: Matrix,
    pub bias: Vector,
}

/// Gated recurrent unit
pub struct Gru {
    update: GruGate,
    reset: GruGate,
    candidate: GruGate,
    /// Hidden state, zeroed by `reset()`
    state: Vector,
    // Gate scratch, allocated once at load time
    z: Vector,
    r: Vector,
    cand: Vector,
    recurrent_cand: Vector,
}

impl Gru {
    /// Create a GRU layer from loaded per-gate parameters
    ///
    /// Gate shapes are validated by the loader and must agree with each
    /// other; the hidden width is taken from the update gate.
    pub fn new(update: GruGate, reset: GruGate, candidate: GruGate) -> Self {
        let hidden = update.weights.rows();
        debug_assert_eq!(update.recurrent.rows(), hidden);
        debug_assert_eq!(reset.weights.rows(), hidden);
        debug_assert_eq!(candidate.weights.rows(), hidden);
        Self {
            update,
            reset,
            candidate,
            state: Vector::zeros(hidden),
            z: Vector::zeros(hidden),
            r: Vector::zeros(hidden),
            cand: Vector::zeros(hidden),
            recurrent_cand: Vector::zeros(hidden),
        }
    }

    pub fn hidden_width(&self) -> usize {
        self.state.len()
    }
}

impl Layer for Gru {
    fn layer_type(&self) -> &'static str {
        "gru"
    }

    fn in_width(&self) -> usize {
        self.update.weights.cols()
    }

    fn out_width(&self) -> usize {
        self.state.len()
    }

    fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        // z = sigmoid(Wz*x + Uz*h + bz)
        self.update.weights.mul_vec_into(input, &mut self.z);
        self.update.recurrent.mul_vec_add_into(&self.state, &mut self.z);
        for (z, b) in self.z.iter_mut().zip(self.update.bias.iter()) {
            *z = sigmoid(*z + b);
        }

        // r = sigmoid(Wr*x + Ur*h + br)
        self.reset.weights.mul_vec_into(input, &mut self.r);
        self.reset.recurrent.mul_vec_add_into(&self.state, &mut self.r);
        for (r, b) in self.r.iter_mut().zip(self.reset.bias.iter()) {
            *r = sigmoid(*r + b);
        }

        // h~ = tanh(Wh*x + bh + r .* (Uh*h))
        self.candidate.weights.mul_vec_into(input, &mut self.cand);
        self.candidate
            .recurrent
            .mul_vec_into(&self.state, &mut self.recurrent_cand);
        for j in 0..self.cand.len() {
            let pre = self.cand[j] + self.candidate.bias[j] + self.r[j] * self.recurrent_cand[j];
            self.cand[j] = pre.tanh();
        }

        // h' = (1 - z) .* h + z .* h~
        for j in 0..self.state.len() {
            let h = (1.0 - self.z[j]) * self.state[j] + self.z[j] * self.cand[j];
            self.state[j] = h;
        }
        output.copy_from_slice(&self.state);
    }

    fn reset(&mut self) {
        self.state.fill_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_gate(hidden: usize, in_width: usize, weight: f32, bias: f32) -> GruGate {
        GruGate {
            weights: Matrix::from_rows(&vec![vec![weight; in_width]; hidden]).unwrap(),
            recurrent: Matrix::from_rows(&vec![vec![weight; hidden]; hidden]).unwrap(),
            bias: Vector::from_slice(&vec![bias; hidden]),
        }
    }

    /// 2-in, 2-hidden GRU with every weight 0.1 and zero biases
    fn symmetric_gru() -> Gru {
        Gru::new(
            uniform_gate(2, 2, 0.1, 0.0),
            uniform_gate(2, 2, 0.1, 0.0),
            uniform_gate(2, 2, 0.1, 0.0),
        )
    }

    #[test]
    fn test_gru_widths() {
        let gru = symmetric_gru();
        assert_eq!(gru.in_width(), 2);
        assert_eq!(gru.out_width(), 2);
        assert_eq!(gru.hidden_width(), 2);
        assert_eq!(gru.layer_type(), "gru");
    }

    #[test]
    fn test_gru_forward_reference_values() {
        // Hand-computed with the documented equations:
        // step 1, x = [1, 0]: z = r = sigmoid(0.1), h~ = tanh(0.1)
        //   -> h = 0.05232362
        // step 2, x = [0.5, 0.5] -> h = 0.08018425
        let mut gru = symmetric_gru();
        let mut out = [0.0; 2];

        gru.forward(&[1.0, 0.0], &mut out);
        assert!((out[0] - 0.05232362).abs() < 1e-6);
        assert!((out[1] - 0.05232362).abs() < 1e-6);

        gru.forward(&[0.5, 0.5], &mut out);
        assert!((out[0] - 0.08018425).abs() < 1e-6);
        assert!((out[1] - 0.08018425).abs() < 1e-6);
    }

    #[test]
    fn test_gru_closed_update_gate_freezes_state() {
        // Update-gate bias -100 saturates sigmoid to exactly 0.0 in f32, so
        // the hidden state must stay exactly zero no matter the input.
        let mut gru = Gru::new(
            uniform_gate(4, 3, 0.1, -100.0),
            uniform_gate(4, 3, 0.1, 0.0),
            uniform_gate(4, 3, 0.1, 0.0),
        );
        let mut out = [0.0; 4];
        for x in [[1.0, -1.0, 0.5], [10.0, 10.0, 10.0], [-3.0, 0.0, 3.0]] {
            gru.forward(&x, &mut out);
            assert_eq!(out, [0.0; 4]);
        }
    }

    #[test]
    fn test_gru_reset_reproduces_sequence() {
        let mut gru = symmetric_gru();
        let inputs = [[1.0, 0.0], [0.5, -0.5], [-1.0, 1.0]];
        let mut first = Vec::new();
        let mut out = [0.0; 2];
        for x in &inputs {
            gru.forward(x, &mut out);
            first.push(out);
        }
        gru.reset();
        for (x, expected) in inputs.iter().zip(first.iter()) {
            gru.forward(x, &mut out);
            assert_eq!(&out, expected);
        }
    }

    #[test]
    fn test_gru_state_persists_across_calls() {
        let mut gru = symmetric_gru();
        let mut a = [0.0; 2];
        let mut b = [0.0; 2];
        gru.forward(&[1.0, 1.0], &mut a);
        gru.forward(&[1.0, 1.0], &mut b);
        // Same input twice must differ because hidden state moved
        assert!(a != b);
    }
}
