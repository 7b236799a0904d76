//! Static model
//!
//! The compile-time execution path: layer kinds and widths are fixed by
//! const generics, every buffer lives on the stack (or inline in the model
//! struct), and `forward` resolves with no indirect dispatch. Weights are
//! still loaded from a model document, validated against the compiled
//! topology.
//!
//! Layer semantics are identical to the dynamic variants in `layers`; the
//! two paths must agree to within float rounding on the same document.

use crate::activation::sigmoid;
use crate::layers::GruGate;
use crate::tensor::{Matrix, Vector};

// ============================================================================
// Canonical topology
// ============================================================================

/// Shape of one slot in the compiled topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerShape {
    pub kind: &'static str,
    pub in_width: usize,
    pub out_width: usize,
}

/// The fixed layer sequence the static path is compiled for
pub const TOPOLOGY: [LayerShape; 6] = [
    LayerShape { kind: "dense", in_width: 1, out_width: 8 },
    LayerShape { kind: "activation", in_width: 8, out_width: 8 },
    LayerShape { kind: "conv1d", in_width: 8, out_width: 4 },
    LayerShape { kind: "activation", in_width: 4, out_width: 4 },
    LayerShape { kind: "gru", in_width: 4, out_width: 8 },
    LayerShape { kind: "dense", in_width: 8, out_width: 1 },
];

/// Conv1D hyperparameters baked into the compiled topology
pub const CONV_KERNEL_SIZE: usize = 3;
pub const CONV_DILATION: usize = 1;
pub const CONV_STRIDE: usize = 2;

// ============================================================================
// Typed layers
// ============================================================================

/// Compile-time dense layer: `output = W * input + bias`
#[derive(Debug, Clone)]
pub struct DenseT<const IN: usize, const OUT: usize> {
    weights: [[f32; IN]; OUT],
    bias: [f32; OUT],
    output: [f32; OUT],
}

impl<const IN: usize, const OUT: usize> DenseT<IN, OUT> {
    pub fn new() -> Self {
        Self {
            weights: [[0.0; IN]; OUT],
            bias: [0.0; OUT],
            output: [0.0; OUT],
        }
    }

    /// Copy loader-validated parameters into the inline arrays
    pub(crate) fn load(&mut self, weights: &Matrix, bias: &Vector) {
        debug_assert_eq!(weights.rows(), OUT);
        debug_assert_eq!(weights.cols(), IN);
        for o in 0..OUT {
            for i in 0..IN {
                self.weights[o][i] = weights.get(o, i);
            }
            self.bias[o] = bias[o];
        }
    }

    #[inline]
    pub fn forward(&mut self, input: &[f32; IN]) {
        for o in 0..OUT {
            let mut acc = self.bias[o];
            for i in 0..IN {
                acc += self.weights[o][i] * input[i];
            }
            self.output[o] = acc;
        }
    }

    pub fn reset(&mut self) {
        // Stateless
    }
}

/// Compile-time elementwise tanh
#[derive(Debug, Clone)]
pub struct TanhT<const N: usize> {
    output: [f32; N],
}

impl<const N: usize> TanhT<N> {
    pub fn new() -> Self {
        Self { output: [0.0; N] }
    }

    #[inline]
    pub fn forward(&mut self, input: &[f32; N]) {
        for (out, x) in self.output.iter_mut().zip(input.iter()) {
            *out = x.tanh();
        }
    }

    pub fn reset(&mut self) {
        // Stateless
    }
}

/// Compile-time strided convolution (dilation fixed at 1)
///
/// Ring of `K` input frames; a new output is produced every `S` samples and
/// held in between, exactly like the dynamic `Conv1D`.
#[derive(Debug, Clone)]
pub struct Conv1DT<const IN: usize, const OUT: usize, const K: usize, const S: usize> {
    weights: [[[f32; IN]; K]; OUT],
    bias: [f32; OUT],
    history: [[f32; IN]; K],
    write_frame: usize,
    held: [f32; OUT],
    samples_seen: u64,
    output: [f32; OUT],
}

impl<const IN: usize, const OUT: usize, const K: usize, const S: usize> Conv1DT<IN, OUT, K, S> {
    pub fn new() -> Self {
        Self {
            weights: [[[0.0; IN]; K]; OUT],
            bias: [0.0; OUT],
            history: [[0.0; IN]; K],
            write_frame: 0,
            held: [0.0; OUT],
            samples_seen: 0,
            output: [0.0; OUT],
        }
    }

    /// Copy loader-validated parameters; `kernel` is flattened
    /// `OUT x K x IN`, the same layout the dynamic layer uses
    pub(crate) fn load(&mut self, kernel: &[f32], bias: &Vector) {
        debug_assert_eq!(kernel.len(), OUT * K * IN);
        for o in 0..OUT {
            for t in 0..K {
                for i in 0..IN {
                    self.weights[o][t][i] = kernel[(o * K + t) * IN + i];
                }
            }
            self.bias[o] = bias[o];
        }
    }

    #[inline]
    pub fn forward(&mut self, input: &[f32; IN]) {
        self.history[self.write_frame] = *input;

        if self.samples_seen % S as u64 == 0 {
            for o in 0..OUT {
                let mut acc = self.bias[o];
                for t in 0..K {
                    let steps_back = K - 1 - t;
                    let frame = &self.history[(self.write_frame + K - steps_back) % K];
                    for i in 0..IN {
                        acc += self.weights[o][t][i] * frame[i];
                    }
                }
                self.held[o] = acc;
            }
        }

        self.samples_seen += 1;
        self.write_frame = (self.write_frame + 1) % K;
        self.output = self.held;
    }

    pub fn reset(&mut self) {
        self.history = [[0.0; IN]; K];
        self.held = [0.0; OUT];
        self.output = [0.0; OUT];
        self.write_frame = 0;
        self.samples_seen = 0;
    }
}

/// Compile-time gated recurrent unit
///
/// Same equations and gate conventions as the dynamic `Gru`.
#[derive(Debug, Clone)]
pub struct GruT<const IN: usize, const OUT: usize> {
    w_update: [[f32; IN]; OUT],
    u_update: [[f32; OUT]; OUT],
    b_update: [f32; OUT],
    w_reset: [[f32; IN]; OUT],
    u_reset: [[f32; OUT]; OUT],
    b_reset: [f32; OUT],
    w_cand: [[f32; IN]; OUT],
    u_cand: [[f32; OUT]; OUT],
    b_cand: [f32; OUT],
    state: [f32; OUT],
    output: [f32; OUT],
}

impl<const IN: usize, const OUT: usize> GruT<IN, OUT> {
    pub fn new() -> Self {
        Self {
            w_update: [[0.0; IN]; OUT],
            u_update: [[0.0; OUT]; OUT],
            b_update: [0.0; OUT],
            w_reset: [[0.0; IN]; OUT],
            u_reset: [[0.0; OUT]; OUT],
            b_reset: [0.0; OUT],
            w_cand: [[0.0; IN]; OUT],
            u_cand: [[0.0; OUT]; OUT],
            b_cand: [0.0; OUT],
            state: [0.0; OUT],
            output: [0.0; OUT],
        }
    }

    pub(crate) fn load(&mut self, update: &GruGate, reset: &GruGate, candidate: &GruGate) {
        fn copy_gate<const IN: usize, const OUT: usize>(
            gate: &GruGate,
            w: &mut [[f32; IN]; OUT],
            u: &mut [[f32; OUT]; OUT],
            b: &mut [f32; OUT],
        ) {
            debug_assert_eq!(gate.weights.rows(), OUT);
            debug_assert_eq!(gate.weights.cols(), IN);
            for j in 0..OUT {
                for i in 0..IN {
                    w[j][i] = gate.weights.get(j, i);
                }
                for k in 0..OUT {
                    u[j][k] = gate.recurrent.get(j, k);
                }
                b[j] = gate.bias[j];
            }
        }
        copy_gate(update, &mut self.w_update, &mut self.u_update, &mut self.b_update);
        copy_gate(reset, &mut self.w_reset, &mut self.u_reset, &mut self.b_reset);
        copy_gate(candidate, &mut self.w_cand, &mut self.u_cand, &mut self.b_cand);
    }

    #[inline]
    pub fn forward(&mut self, input: &[f32; IN]) {
        let mut z = [0.0f32; OUT];
        let mut r = [0.0f32; OUT];
        let mut cand = [0.0f32; OUT];

        for j in 0..OUT {
            let mut zj = self.b_update[j];
            let mut rj = self.b_reset[j];
            for i in 0..IN {
                zj += self.w_update[j][i] * input[i];
                rj += self.w_reset[j][i] * input[i];
            }
            for k in 0..OUT {
                zj += self.u_update[j][k] * self.state[k];
                rj += self.u_reset[j][k] * self.state[k];
            }
            z[j] = sigmoid(zj);
            r[j] = sigmoid(rj);
        }

        for j in 0..OUT {
            let mut cj = self.b_cand[j];
            for i in 0..IN {
                cj += self.w_cand[j][i] * input[i];
            }
            let mut rec = 0.0;
            for k in 0..OUT {
                rec += self.u_cand[j][k] * self.state[k];
            }
            cand[j] = (cj + r[j] * rec).tanh();
        }

        for j in 0..OUT {
            self.state[j] = (1.0 - z[j]) * self.state[j] + z[j] * cand[j];
        }
        self.output = self.state;
    }

    pub fn reset(&mut self) {
        self.state = [0.0; OUT];
        self.output = [0.0; OUT];
    }
}

// ============================================================================
// StaticModel
// ============================================================================

/// The canonical compile-time pipeline:
/// Dense(1->8) -> Tanh -> Conv1D(8->4, k3 s2) -> Tanh -> GRU(4->8) -> Dense(8->1)
#[derive(Debug, Clone)]
pub struct StaticModel {
    pub(crate) dense_in: DenseT<1, 8>,
    pub(crate) tanh_in: TanhT<8>,
    pub(crate) conv: Conv1DT<8, 4, CONV_KERNEL_SIZE, CONV_STRIDE>,
    pub(crate) tanh_hidden: TanhT<4>,
    pub(crate) gru: GruT<4, 8>,
    pub(crate) dense_out: DenseT<8, 1>,
}

impl StaticModel {
    /// Create the canonical pipeline with zeroed weights
    pub fn new() -> Self {
        Self {
            dense_in: DenseT::new(),
            tanh_in: TanhT::new(),
            conv: Conv1DT::new(),
            tanh_hidden: TanhT::new(),
            gru: GruT::new(),
            dense_out: DenseT::new(),
        }
    }

    /// Build from a model document, validating the document against the
    /// compiled topology
    pub fn from_document(doc: &crate::loader::ModelDocument) -> crate::error::Result<Self> {
        crate::loader::build_static_model(doc)
    }

    /// Run one sample through the pipeline
    ///
    /// Fully inlined, stack-resident, no dispatch.
    #[inline]
    pub fn forward(&mut self, sample: f32) -> f32 {
        self.dense_in.forward(&[sample]);
        self.tanh_in.forward(&self.dense_in.output);
        self.conv.forward(&self.tanh_in.output);
        self.tanh_hidden.forward(&self.conv.output);
        self.gru.forward(&self.tanh_hidden.output);
        self.dense_out.forward(&self.gru.output);
        self.dense_out.output[0]
    }

    /// Reset every layer's state
    pub fn reset(&mut self) {
        self.dense_in.reset();
        self.tanh_in.reset();
        self.conv.reset();
        self.tanh_hidden.reset();
        self.gru.reset();
        self.dense_out.reset();
    }
}

impl Default for StaticModel {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
