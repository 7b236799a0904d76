//! Conv1D layer
//!
//! Strided temporal convolution over a ring buffer of recent input frames.
//! The ring holds `kernel_size * dilation` frames; tap `t` reads the frame
//! `(kernel_size - 1 - t) * dilation` steps in the past, so the last tap
//! always reads the current frame (causal convolution).

use super::Layer;
use crate::tensor::Vector;

/// One-dimensional convolution with stride and dilation
///
/// A new output frame is produced on calls where the per-instance sample
/// counter hits a stride boundary (the first call after `reset()` produces);
/// between productions the layer emits the held previous output. Before the
/// first production the held output is zero.
pub struct Conv1D {
    in_width: usize,
    out_width: usize,
    kernel_size: usize,
    dilation: usize,
    stride: usize,
    /// Kernel weights, `out_width x kernel_size x in_width`, flattened
    kernel: Box<[f32]>,
    bias: Vector,
    /// Ring of `kernel_size * dilation` input frames
    history: Vector,
    write_frame: usize,
    /// Last produced output, emitted on non-boundary calls
    held: Vector,
    samples_seen: u64,
}

impl Conv1D {
    /// Create a Conv1D layer from loaded parameters
    ///
    /// # Arguments
    /// * `kernel` - flattened `out_width x kernel_size x in_width` weights
    /// * `bias` - `out_width` values
    ///
    /// Shapes and nonzero hyperparameters are validated by the loader.
    pub fn new(
        in_width: usize,
        out_width: usize,
        kernel_size: usize,
        dilation: usize,
        stride: usize,
        kernel: Box<[f32]>,
        bias: Vector,
    ) -> Self {
        debug_assert!(kernel_size >= 1 && dilation >= 1 && stride >= 1);
        debug_assert_eq!(kernel.len(), out_width * kernel_size * in_width);
        debug_assert_eq!(bias.len(), out_width);
        let frames = kernel_size * dilation;
        Self {
            in_width,
            out_width,
            kernel_size,
            dilation,
            stride,
            kernel,
            bias,
            history: Vector::zeros(frames * in_width),
            write_frame: 0,
            held: Vector::zeros(out_width),
            samples_seen: 0,
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn dilation(&self) -> usize {
        self.dilation
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    fn num_frames(&self) -> usize {
        self.kernel_size * self.dilation
    }

    /// Slice of the frame written `steps_back` calls ago
    #[inline]
    fn frame(&self, steps_back: usize) -> &[f32] {
        let frames = self.num_frames();
        let f = (self.write_frame + frames - steps_back) % frames;
        &self.history[f * self.in_width..(f + 1) * self.in_width]
    }
}

impl Layer for Conv1D {
    fn layer_type(&self) -> &'static str {
        "conv1d"
    }

    fn in_width(&self) -> usize {
        self.in_width
    }

    fn out_width(&self) -> usize {
        self.out_width
    }

    fn forward(&mut self, input: &[f32], output: &mut [f32]) {
        let start = self.write_frame * self.in_width;
        self.history[start..start + self.in_width].copy_from_slice(input);

        if self.samples_seen % self.stride as u64 == 0 {
            for o in 0..self.out_width {
                let mut acc = self.bias[o];
                for t in 0..self.kernel_size {
                    let steps_back = (self.kernel_size - 1 - t) * self.dilation;
                    let frame = self.frame(steps_back);
                    let row = (o * self.kernel_size + t) * self.in_width;
                    let taps = &self.kernel[row..row + self.in_width];
                    for (w, x) in taps.iter().zip(frame.iter()) {
                        acc += w * x;
                    }
                }
                self.held[o] = acc;
            }
        }

        self.samples_seen += 1;
        self.write_frame = (self.write_frame + 1) % self.num_frames();
        output.copy_from_slice(&self.held);
    }

    fn reset(&mut self) {
        self.history.fill_zero();
        self.held.fill_zero();
        self.write_frame = 0;
        self.samples_seen = 0;
    }
}
