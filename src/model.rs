//! Dynamic model
//!
//! An ordered sequence of heap-allocated, runtime-polymorphic layers built
//! by the loader in document order. Sample data ping-pongs between two
//! scratch buffers sized to the widest layer boundary; the buffers are
//! allocated while layers are appended, so `forward` itself is
//! allocation-free.

use crate::error::{ModelLoadError, Result};
use crate::layers::Layer;
use crate::tensor::Vector;

/// Runtime-composed layer pipeline
pub struct Model {
    layers: Vec<Box<dyn Layer>>,
    in_width: usize,
    scratch_a: Vector,
    scratch_b: Vector,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("in_width", &self.in_width)
            .field("layers", &self.layers.len())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create an empty model with the declared input width
    pub fn new(in_width: usize) -> Self {
        Self {
            layers: Vec::new(),
            in_width,
            scratch_a: Vector::zeros(in_width.max(1)),
            scratch_b: Vector::zeros(in_width.max(1)),
        }
    }

    /// Append a layer to the end of the pipeline
    ///
    /// Fails with `ShapeMismatch` if the layer's input width does not match
    /// the current output width of the model.
    pub fn push(&mut self, layer: Box<dyn Layer>) -> Result<()> {
        let expected = self.out_width();
        if layer.in_width() != expected {
            return Err(ModelLoadError::ShapeMismatch {
                index: self.layers.len(),
                kind: layer.layer_type(),
                field: "in_width",
                expected,
                actual: layer.in_width(),
            });
        }

        let widest = layer.out_width().max(layer.in_width());
        if widest > self.scratch_a.len() {
            self.scratch_a = Vector::zeros(widest);
            self.scratch_b = Vector::zeros(widest);
        }
        self.layers.push(layer);
        Ok(())
    }

    /// Declared input width of the whole pipeline
    pub fn in_width(&self) -> usize {
        self.in_width
    }

    /// Output width of the last layer (input width while empty)
    pub fn out_width(&self) -> usize {
        self.layers
            .last()
            .map(|l| l.out_width())
            .unwrap_or(self.in_width)
    }

    /// Get the number of layers in the pipeline
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check if the pipeline is empty
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Iterate over the layer kind identifiers in pipeline order
    pub fn layer_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.layers.iter().map(|l| l.layer_type())
    }

    /// Run one sample through every layer in order
    ///
    /// Total function over a loaded model: no allocation, no failure path.
    /// The model must have input and output width 1 (the loader and the
    /// engine both enforce this for the sample-streaming surface).
    pub fn forward(&mut self, sample: f32) -> f32 {
        debug_assert_eq!(self.in_width, 1);
        self.scratch_a[0] = sample;
        let mut width = self.in_width;
        for layer in self.layers.iter_mut() {
            let out_width = layer.out_width();
            layer.forward(&self.scratch_a[..width], &mut self.scratch_b[..out_width]);
            std::mem::swap(&mut self.scratch_a, &mut self.scratch_b);
            width = out_width;
        }
        self.scratch_a[0]
    }

    /// Reset every layer in order
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{Activation, ActivationKind};
    use crate::layers::Dense;
    use crate::tensor::{Matrix, Vector as V};

    fn dense(rows: &[Vec<f32>], bias: &[f32]) -> Box<Dense> {
        Box::new(Dense::new(
            Matrix::from_rows(rows).unwrap(),
            V::from_slice(bias),
        ))
    }

    #[test]
    fn test_model_new_empty() {
        let model = Model::new(1);
        assert!(model.is_empty());
        assert_eq!(model.len(), 0);
        assert_eq!(model.in_width(), 1);
        assert_eq!(model.out_width(), 1);
    }

    #[test]
    fn test_empty_model_passthrough() {
        let mut model = Model::new(1);
        assert_eq!(model.forward(0.75), 0.75);
    }

    #[test]
    fn test_model_push_width_chaining() {
        let mut model = Model::new(1);
        model
            .push(dense(&[vec![1.0], vec![2.0]], &[0.0, 0.0]))
            .unwrap();
        assert_eq!(model.out_width(), 2);

        // 1 -> 2 chain established; a 3-wide layer must be rejected
        let err = model
            .push(dense(&[vec![1.0, 1.0, 1.0]], &[0.0]))
            .unwrap_err();
        match err {
            ModelLoadError::ShapeMismatch {
                index,
                field,
                expected,
                actual,
                ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(field, "in_width");
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
        // Failed push must not have been applied
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_model_forward_dense_tanh_dense() {
        let mut model = Model::new(1);
        model
            .push(dense(&[vec![0.5], vec![-0.5]], &[0.1, 0.1]))
            .unwrap();
        model
            .push(Box::new(Activation::new(ActivationKind::Tanh, 2)))
            .unwrap();
        model.push(dense(&[vec![1.0, 1.0]], &[0.0])).unwrap();

        let expected = (0.5f32 * 2.0 + 0.1).tanh() + (-0.5f32 * 2.0 + 0.1).tanh();
        let got = model.forward(2.0);
        assert!((got - expected).abs() < 1e-6);

        let types: Vec<_> = model.layer_types().collect();
        assert_eq!(types, vec!["dense", "activation", "dense"]);
    }

    #[test]
    fn test_model_reset_reaches_all_layers() {
        use crate::layers::Conv1D;
        let mut model = Model::new(1);
        model
            .push(Box::new(Conv1D::new(
                1,
                1,
                2,
                1,
                1,
                vec![1.0, 1.0].into_boxed_slice(),
                V::from_slice(&[0.0]),
            )))
            .unwrap();

        let first: Vec<f32> = [1.0, 2.0, 3.0].iter().map(|&x| model.forward(x)).collect();
        model.reset();
        let second: Vec<f32> = [1.0, 2.0, 3.0].iter().map(|&x| model.forward(x)).collect();
        assert_eq!(first, second);
    }
}
