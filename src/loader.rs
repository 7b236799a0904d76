//! Model document parsing and model construction
//!
//! A model document is an ordered list of layer descriptions with embedded
//! weights, parsed once on a non-real-time thread. Construction is
//! all-or-nothing: every tensor shape, every width transition and (for the
//! static path) the whole topology are validated before a model is handed
//! back, so nothing can fail once audio is running. The document is not
//! retained after construction.

use serde::Deserialize;
use tracing::debug;

use crate::activation::{Activation, ActivationKind};
use crate::error::{ModelLoadError, Result};
use crate::layers::{Conv1D, Dense, Gru, GruGate, Layer};
use crate::model::Model;
use crate::static_model::{
    StaticModel, CONV_DILATION, CONV_KERNEL_SIZE, CONV_STRIDE, TOPOLOGY,
};
use crate::tensor::{Matrix, Vector};

// ============================================================================
// Document schema
// ============================================================================

fn default_one() -> usize {
    1
}

/// Serialized description of one layer
///
/// `kind` selects the variant; the remaining fields are per-kind. Unknown
/// kinds and missing or mis-shaped fields are load errors, not defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerDescription {
    pub kind: String,
    pub in_width: Option<usize>,
    pub out_width: Option<usize>,
    /// Standalone activation entries: frame width (defaults to the running
    /// width of the chain)
    pub width: Option<usize>,
    /// Standalone activation entries: nonlinearity tag
    pub function: Option<String>,
    /// Inline activation appended after a dense/conv1d/gru layer
    pub activation: Option<String>,
    pub kernel_size: Option<usize>,
    #[serde(default = "default_one")]
    pub dilation: usize,
    #[serde(default = "default_one")]
    pub stride: usize,
    /// Dense weights, `out_width x in_width`
    pub weights: Option<Vec<Vec<f32>>>,
    pub bias: Option<Vec<f32>>,
    /// Conv1D kernel, `out_width x kernel_size x in_width`
    pub kernel: Option<Vec<Vec<Vec<f32>>>>,
    pub update_weights: Option<Vec<Vec<f32>>>,
    pub update_recurrent: Option<Vec<Vec<f32>>>,
    pub update_bias: Option<Vec<f32>>,
    pub reset_weights: Option<Vec<Vec<f32>>>,
    pub reset_recurrent: Option<Vec<Vec<f32>>>,
    pub reset_bias: Option<Vec<f32>>,
    pub candidate_weights: Option<Vec<Vec<f32>>>,
    pub candidate_recurrent: Option<Vec<Vec<f32>>>,
    pub candidate_bias: Option<Vec<f32>>,
}

/// The load-time serialized form of a whole model
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDocument {
    /// Declared input arity of the chain
    pub in_width: usize,
    pub layers: Vec<LayerDescription>,
}

impl ModelDocument {
    /// Parse a document from a byte buffer
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Parse a document from a string
    pub fn from_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

// ============================================================================
// Normalized layer specs
// ============================================================================

/// Validated description of one layer, inline activations expanded into
/// standalone entries
pub(crate) enum LayerSpec {
    Dense {
        in_width: usize,
        out_width: usize,
        weights: Matrix,
        bias: Vector,
    },
    Conv1D {
        in_width: usize,
        out_width: usize,
        kernel_size: usize,
        dilation: usize,
        stride: usize,
        kernel: Box<[f32]>,
        bias: Vector,
    },
    Gru {
        in_width: usize,
        out_width: usize,
        update: GruGate,
        reset: GruGate,
        candidate: GruGate,
    },
    Activation {
        width: usize,
        kind: ActivationKind,
    },
}

impl LayerSpec {
    fn kind(&self) -> &'static str {
        match self {
            LayerSpec::Dense { .. } => "dense",
            LayerSpec::Conv1D { .. } => "conv1d",
            LayerSpec::Gru { .. } => "gru",
            LayerSpec::Activation { .. } => "activation",
        }
    }

    fn in_width(&self) -> usize {
        match self {
            LayerSpec::Dense { in_width, .. }
            | LayerSpec::Conv1D { in_width, .. }
            | LayerSpec::Gru { in_width, .. } => *in_width,
            LayerSpec::Activation { width, .. } => *width,
        }
    }

    fn out_width(&self) -> usize {
        match self {
            LayerSpec::Dense { out_width, .. }
            | LayerSpec::Conv1D { out_width, .. }
            | LayerSpec::Gru { out_width, .. } => *out_width,
            LayerSpec::Activation { width, .. } => *width,
        }
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

fn missing(index: usize, field: &str) -> ModelLoadError {
    ModelLoadError::MalformedWeightData {
        index,
        reason: format!("missing field '{}'", field),
    }
}

fn expect_widths(index: usize, entry: &LayerDescription) -> Result<(usize, usize)> {
    let in_width = entry.in_width.ok_or_else(|| missing(index, "in_width"))?;
    let out_width = entry.out_width.ok_or_else(|| missing(index, "out_width"))?;
    if in_width == 0 || out_width == 0 {
        return Err(ModelLoadError::MalformedWeightData {
            index,
            reason: "layer widths must be nonzero".to_string(),
        });
    }
    Ok((in_width, out_width))
}

fn expect_chain(index: usize, kind: &'static str, expected: usize, actual: usize) -> Result<()> {
    if actual != expected {
        return Err(ModelLoadError::ShapeMismatch {
            index,
            kind,
            field: "in_width",
            expected,
            actual,
        });
    }
    Ok(())
}

fn expect_matrix(
    index: usize,
    kind: &'static str,
    field: &'static str,
    data: Option<&Vec<Vec<f32>>>,
    rows: usize,
    cols: usize,
) -> Result<Matrix> {
    let data = data.ok_or_else(|| missing(index, field))?;
    if data.len() != rows {
        return Err(ModelLoadError::ShapeMismatch {
            index,
            kind,
            field,
            expected: rows,
            actual: data.len(),
        });
    }
    for row in data {
        if row.len() != cols {
            return Err(ModelLoadError::ShapeMismatch {
                index,
                kind,
                field,
                expected: cols,
                actual: row.len(),
            });
        }
    }
    Matrix::from_rows(data).ok_or_else(|| ModelLoadError::MalformedWeightData {
        index,
        reason: format!("empty or ragged tensor in field '{}'", field),
    })
}

fn expect_vector(
    index: usize,
    kind: &'static str,
    field: &'static str,
    data: Option<&Vec<f32>>,
    len: usize,
) -> Result<Vector> {
    let data = data.ok_or_else(|| missing(index, field))?;
    if data.len() != len {
        return Err(ModelLoadError::ShapeMismatch {
            index,
            kind,
            field,
            expected: len,
            actual: data.len(),
        });
    }
    Ok(Vector::from_slice(data))
}

/// Validate and flatten a conv kernel, `out_width x kernel_size x in_width`
fn expect_kernel(
    index: usize,
    data: Option<&Vec<Vec<Vec<f32>>>>,
    out_width: usize,
    kernel_size: usize,
    in_width: usize,
) -> Result<Box<[f32]>> {
    let data = data.ok_or_else(|| missing(index, "kernel"))?;
    if data.len() != out_width {
        return Err(ModelLoadError::ShapeMismatch {
            index,
            kind: "conv1d",
            field: "kernel",
            expected: out_width,
            actual: data.len(),
        });
    }
    let mut flat = Vec::with_capacity(out_width * kernel_size * in_width);
    for taps in data {
        if taps.len() != kernel_size {
            return Err(ModelLoadError::ShapeMismatch {
                index,
                kind: "conv1d",
                field: "kernel",
                expected: kernel_size,
                actual: taps.len(),
            });
        }
        for tap in taps {
            if tap.len() != in_width {
                return Err(ModelLoadError::ShapeMismatch {
                    index,
                    kind: "conv1d",
                    field: "kernel",
                    expected: in_width,
                    actual: tap.len(),
                });
            }
            flat.extend_from_slice(tap);
        }
    }
    Ok(flat.into_boxed_slice())
}

fn expect_activation_kind(index: usize, tag: &str) -> Result<ActivationKind> {
    ActivationKind::parse(tag).ok_or_else(|| ModelLoadError::MalformedWeightData {
        index,
        reason: format!("unknown activation function '{}'", tag),
    })
}

// ============================================================================
// Normalization
// ============================================================================

/// Walk the document in order, validating every entry and expanding inline
/// activation tags into standalone specs
pub(crate) fn normalize(doc: &ModelDocument) -> Result<Vec<LayerSpec>> {
    if doc.in_width == 0 {
        return Err(ModelLoadError::MalformedWeightData {
            index: 0,
            reason: "document in_width must be nonzero".to_string(),
        });
    }

    let mut specs = Vec::new();
    let mut width = doc.in_width;

    for (index, entry) in doc.layers.iter().enumerate() {
        match entry.kind.as_str() {
            "dense" => {
                let (in_width, out_width) = expect_widths(index, entry)?;
                expect_chain(index, "dense", width, in_width)?;
                let weights = expect_matrix(
                    index,
                    "dense",
                    "weights",
                    entry.weights.as_ref(),
                    out_width,
                    in_width,
                )?;
                let bias =
                    expect_vector(index, "dense", "bias", entry.bias.as_ref(), out_width)?;
                specs.push(LayerSpec::Dense {
                    in_width,
                    out_width,
                    weights,
                    bias,
                });
                width = out_width;
            }
            "conv1d" => {
                let (in_width, out_width) = expect_widths(index, entry)?;
                expect_chain(index, "conv1d", width, in_width)?;
                let kernel_size = entry
                    .kernel_size
                    .ok_or_else(|| missing(index, "kernel_size"))?;
                if kernel_size == 0 || entry.dilation == 0 || entry.stride == 0 {
                    return Err(ModelLoadError::MalformedWeightData {
                        index,
                        reason: "kernel_size, dilation and stride must be nonzero".to_string(),
                    });
                }
                let kernel = expect_kernel(
                    index,
                    entry.kernel.as_ref(),
                    out_width,
                    kernel_size,
                    in_width,
                )?;
                let bias =
                    expect_vector(index, "conv1d", "bias", entry.bias.as_ref(), out_width)?;
                specs.push(LayerSpec::Conv1D {
                    in_width,
                    out_width,
                    kernel_size,
                    dilation: entry.dilation,
                    stride: entry.stride,
                    kernel,
                    bias,
                });
                width = out_width;
            }
            "gru" => {
                let (in_width, out_width) = expect_widths(index, entry)?;
                expect_chain(index, "gru", width, in_width)?;
                let update = GruGate {
                    weights: expect_matrix(
                        index,
                        "gru",
                        "update_weights",
                        entry.update_weights.as_ref(),
                        out_width,
                        in_width,
                    )?,
                    recurrent: expect_matrix(
                        index,
                        "gru",
                        "update_recurrent",
                        entry.update_recurrent.as_ref(),
                        out_width,
                        out_width,
                    )?,
                    bias: expect_vector(
                        index,
                        "gru",
                        "update_bias",
                        entry.update_bias.as_ref(),
                        out_width,
                    )?,
                };
                let reset = GruGate {
                    weights: expect_matrix(
                        index,
                        "gru",
                        "reset_weights",
                        entry.reset_weights.as_ref(),
                        out_width,
                        in_width,
                    )?,
                    recurrent: expect_matrix(
                        index,
                        "gru",
                        "reset_recurrent",
                        entry.reset_recurrent.as_ref(),
                        out_width,
                        out_width,
                    )?,
                    bias: expect_vector(
                        index,
                        "gru",
                        "reset_bias",
                        entry.reset_bias.as_ref(),
                        out_width,
                    )?,
                };
                let candidate = GruGate {
                    weights: expect_matrix(
                        index,
                        "gru",
                        "candidate_weights",
                        entry.candidate_weights.as_ref(),
                        out_width,
                        in_width,
                    )?,
                    recurrent: expect_matrix(
                        index,
                        "gru",
                        "candidate_recurrent",
                        entry.candidate_recurrent.as_ref(),
                        out_width,
                        out_width,
                    )?,
                    bias: expect_vector(
                        index,
                        "gru",
                        "candidate_bias",
                        entry.candidate_bias.as_ref(),
                        out_width,
                    )?,
                };
                specs.push(LayerSpec::Gru {
                    in_width,
                    out_width,
                    update,
                    reset,
                    candidate,
                });
                width = out_width;
            }
            "activation" => {
                let declared = entry.width.unwrap_or(width);
                expect_chain(index, "activation", width, declared)?;
                let tag = entry
                    .function
                    .as_deref()
                    .ok_or_else(|| missing(index, "function"))?;
                let kind = expect_activation_kind(index, tag)?;
                specs.push(LayerSpec::Activation { width, kind });
            }
            other => {
                return Err(ModelLoadError::UnknownLayerKind {
                    index,
                    kind: other.to_string(),
                });
            }
        }

        // Inline activation tag expands to a standalone entry after the layer
        if entry.kind != "activation" {
            if let Some(tag) = entry.activation.as_deref() {
                let kind = expect_activation_kind(index, tag)?;
                specs.push(LayerSpec::Activation { width, kind });
            }
        }
    }

    Ok(specs)
}

// ============================================================================
// Builders
// ============================================================================

/// Build a dynamic model from a parsed document
///
/// Fails fast on any unrecognized kind, mis-shaped tensor or broken width
/// chain; on failure no model is returned.
pub fn build_model(doc: &ModelDocument) -> Result<Model> {
    let specs = normalize(doc)?;
    let mut model = Model::new(doc.in_width);
    for spec in specs {
        let layer: Box<dyn Layer> = match spec {
            LayerSpec::Dense { weights, bias, .. } => Box::new(Dense::new(weights, bias)),
            LayerSpec::Conv1D {
                in_width,
                out_width,
                kernel_size,
                dilation,
                stride,
                kernel,
                bias,
            } => Box::new(Conv1D::new(
                in_width,
                out_width,
                kernel_size,
                dilation,
                stride,
                kernel,
                bias,
            )),
            LayerSpec::Gru {
                update,
                reset,
                candidate,
                ..
            } => Box::new(Gru::new(update, reset, candidate)),
            LayerSpec::Activation { width, kind } => Box::new(Activation::new(kind, width)),
        };
        model.push(layer)?;
    }
    debug!(
        layers = model.len(),
        in_width = model.in_width(),
        out_width = model.out_width(),
        "built dynamic model"
    );
    Ok(model)
}

fn topology_mismatch(index: usize, expected: String, actual: String) -> ModelLoadError {
    ModelLoadError::TopologyMismatch {
        index,
        expected,
        actual,
    }
}

/// Build the canonical static model from a parsed document
///
/// The document must describe exactly the compiled topology; weights are
/// copied into the inline arrays after validation.
pub fn build_static_model(doc: &ModelDocument) -> Result<StaticModel> {
    let specs = normalize(doc)?;

    if specs.len() != TOPOLOGY.len() {
        return Err(topology_mismatch(
            specs.len().min(TOPOLOGY.len()),
            format!("{} layers", TOPOLOGY.len()),
            format!("{} layers", specs.len()),
        ));
    }
    for (index, (spec, shape)) in specs.iter().zip(TOPOLOGY.iter()).enumerate() {
        if spec.kind() != shape.kind
            || spec.in_width() != shape.in_width
            || spec.out_width() != shape.out_width
        {
            return Err(topology_mismatch(
                index,
                format!(
                    "{} {}->{}",
                    shape.kind, shape.in_width, shape.out_width
                ),
                format!("{} {}->{}", spec.kind(), spec.in_width(), spec.out_width()),
            ));
        }
    }

    let mut model = StaticModel::new();
    for (index, spec) in specs.iter().enumerate() {
        match (index, spec) {
            (0, LayerSpec::Dense { weights, bias, .. }) => model.dense_in.load(weights, bias),
            (5, LayerSpec::Dense { weights, bias, .. }) => model.dense_out.load(weights, bias),
            (1, LayerSpec::Activation { kind, .. }) | (3, LayerSpec::Activation { kind, .. }) => {
                if *kind != ActivationKind::Tanh {
                    return Err(topology_mismatch(
                        index,
                        "activation tanh".to_string(),
                        format!("activation {}", kind.name()),
                    ));
                }
            }
            (
                2,
                LayerSpec::Conv1D {
                    kernel_size,
                    dilation,
                    stride,
                    kernel,
                    bias,
                    ..
                },
            ) => {
                if *kernel_size != CONV_KERNEL_SIZE
                    || *dilation != CONV_DILATION
                    || *stride != CONV_STRIDE
                {
                    return Err(topology_mismatch(
                        index,
                        format!(
                            "conv1d kernel_size={} dilation={} stride={}",
                            CONV_KERNEL_SIZE, CONV_DILATION, CONV_STRIDE
                        ),
                        format!(
                            "conv1d kernel_size={} dilation={} stride={}",
                            kernel_size, dilation, stride
                        ),
                    ));
                }
                model.conv.load(kernel, bias);
            }
            (
                4,
                LayerSpec::Gru {
                    update,
                    reset,
                    candidate,
                    ..
                },
            ) => model.gru.load(update, reset, candidate),
            // Kinds already checked against TOPOLOGY above
            _ => unreachable!("layer kind validated against compiled topology"),
        }
    }
    debug!("built static model from document");
    Ok(model)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> ModelDocument {
        ModelDocument::from_str(&value.to_string()).unwrap()
    }

    fn uniform_matrix(rows: usize, cols: usize) -> Vec<Vec<f32>> {
        vec![vec![0.1; cols]; rows]
    }

    /// The canonical document: all weights 0.1, all biases 0
    fn canonical_doc() -> ModelDocument {
        doc(json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 8,
                  "weights": uniform_matrix(8, 1), "bias": vec![0.0; 8],
                  "activation": "tanh" },
                { "kind": "conv1d", "in_width": 8, "out_width": 4,
                  "kernel_size": 3, "stride": 2,
                  "kernel": vec![vec![vec![0.1f32; 8]; 3]; 4], "bias": vec![0.0; 4],
                  "activation": "tanh" },
                { "kind": "gru", "in_width": 4, "out_width": 8,
                  "update_weights": uniform_matrix(8, 4),
                  "update_recurrent": uniform_matrix(8, 8),
                  "update_bias": vec![0.0; 8],
                  "reset_weights": uniform_matrix(8, 4),
                  "reset_recurrent": uniform_matrix(8, 8),
                  "reset_bias": vec![0.0; 8],
                  "candidate_weights": uniform_matrix(8, 4),
                  "candidate_recurrent": uniform_matrix(8, 8),
                  "candidate_bias": vec![0.0; 8] },
                { "kind": "dense", "in_width": 8, "out_width": 1,
                  "weights": uniform_matrix(1, 8), "bias": [0.0] }
            ]
        }))
    }

    #[test]
    fn test_parse_and_build_minimal_dense() {
        let doc = doc(json!({
            "in_width": 2,
            "layers": [
                { "kind": "dense", "in_width": 2, "out_width": 1,
                  "weights": [[0.5, -0.5]], "bias": [1.0] }
            ]
        }));
        let model = build_model(&doc).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.in_width(), 2);
        assert_eq!(model.out_width(), 1);
    }

    #[test]
    fn test_inline_activation_expands() {
        let doc = doc(json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 2,
                  "weights": [[1.0], [2.0]], "bias": [0.0, 0.0],
                  "activation": "tanh" }
            ]
        }));
        let model = build_model(&doc).unwrap();
        let types: Vec<_> = model.layer_types().collect();
        assert_eq!(types, vec!["dense", "activation"]);
    }

    #[test]
    fn test_standalone_activation_entry() {
        let doc = doc(json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 2,
                  "weights": [[1.0], [2.0]], "bias": [0.0, 0.0] },
                { "kind": "activation", "width": 2, "function": "relu" }
            ]
        }));
        let model = build_model(&doc).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.out_width(), 2);
    }

    #[test]
    fn test_unknown_layer_kind() {
        let doc = doc(json!({
            "in_width": 1,
            "layers": [ { "kind": "lstm", "in_width": 1, "out_width": 1 } ]
        }));
        match build_model(&doc).unwrap_err() {
            ModelLoadError::UnknownLayerKind { index, kind } => {
                assert_eq!(index, 0);
                assert_eq!(kind, "lstm");
            }
            other => panic!("expected UnknownLayerKind, got {other:?}"),
        }
    }

    #[test]
    fn test_short_bias_is_shape_mismatch() {
        // Dense declares out_width 8 but supplies only 4 bias values
        let doc = doc(json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 8,
                  "weights": uniform_matrix(8, 1), "bias": vec![0.0; 4] }
            ]
        }));
        match build_model(&doc).unwrap_err() {
            ModelLoadError::ShapeMismatch {
                field, expected, actual, ..
            } => {
                assert_eq!(field, "bias");
                assert_eq!(expected, 8);
                assert_eq!(actual, 4);
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_weights_is_malformed() {
        let doc = doc(json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 2, "bias": [0.0, 0.0] }
            ]
        }));
        match build_model(&doc).unwrap_err() {
            ModelLoadError::MalformedWeightData { index, reason } => {
                assert_eq!(index, 0);
                assert!(reason.contains("weights"));
            }
            other => panic!("expected MalformedWeightData, got {other:?}"),
        }
    }

    #[test]
    fn test_broken_width_chain() {
        let doc = doc(json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 8,
                  "weights": uniform_matrix(8, 1), "bias": vec![0.0; 8] },
                { "kind": "dense", "in_width": 4, "out_width": 1,
                  "weights": uniform_matrix(1, 4), "bias": [0.0] }
            ]
        }));
        match build_model(&doc).unwrap_err() {
            ModelLoadError::ShapeMismatch {
                index,
                field,
                expected,
                actual,
                ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(field, "in_width");
                assert_eq!(expected, 8);
                assert_eq!(actual, 4);
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_stride_rejected() {
        let doc = doc(json!({
            "in_width": 1,
            "layers": [
                { "kind": "conv1d", "in_width": 1, "out_width": 1,
                  "kernel_size": 2, "stride": 0,
                  "kernel": [[[1.0], [1.0]]], "bias": [0.0] }
            ]
        }));
        assert!(matches!(
            build_model(&doc).unwrap_err(),
            ModelLoadError::MalformedWeightData { .. }
        ));
    }

    #[test]
    fn test_unknown_activation_function() {
        let doc = doc(json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 1,
                  "weights": [[1.0]], "bias": [0.0], "activation": "swish" }
            ]
        }));
        match build_model(&doc).unwrap_err() {
            ModelLoadError::MalformedWeightData { reason, .. } => {
                assert!(reason.contains("swish"));
            }
            other => panic!("expected MalformedWeightData, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_document_error() {
        let err = ModelDocument::from_slice(b"{ not json").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_DOCUMENT");
    }

    #[test]
    fn test_canonical_doc_builds_both_paths() {
        let doc = canonical_doc();
        let dynamic = build_model(&doc).unwrap();
        let types: Vec<_> = dynamic.layer_types().collect();
        assert_eq!(
            types,
            vec!["dense", "activation", "conv1d", "activation", "gru", "dense"]
        );
        assert_eq!(dynamic.in_width(), 1);
        assert_eq!(dynamic.out_width(), 1);

        build_static_model(&doc).unwrap();
    }

    #[test]
    fn test_static_rejects_foreign_topology() {
        // Valid for the dynamic path, but not the compiled topology
        let doc = doc(json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 4,
                  "weights": uniform_matrix(4, 1), "bias": vec![0.0; 4] }
            ]
        }));
        build_model(&doc).unwrap();
        match build_static_model(&doc).unwrap_err() {
            ModelLoadError::TopologyMismatch { expected, actual, .. } => {
                assert_eq!(expected, "6 layers");
                assert_eq!(actual, "1 layers");
            }
            other => panic!("expected TopologyMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_static_rejects_wrong_stride() {
        // Same topology shape as the compiled one, wrong conv stride
        let value = json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 8,
                  "weights": uniform_matrix(8, 1), "bias": vec![0.0; 8],
                  "activation": "tanh" },
                { "kind": "conv1d", "in_width": 8, "out_width": 4,
                  "kernel_size": 3, "stride": 1,
                  "kernel": vec![vec![vec![0.1f32; 8]; 3]; 4], "bias": vec![0.0; 4],
                  "activation": "tanh" },
                { "kind": "gru", "in_width": 4, "out_width": 8,
                  "update_weights": uniform_matrix(8, 4),
                  "update_recurrent": uniform_matrix(8, 8),
                  "update_bias": vec![0.0; 8],
                  "reset_weights": uniform_matrix(8, 4),
                  "reset_recurrent": uniform_matrix(8, 8),
                  "reset_bias": vec![0.0; 8],
                  "candidate_weights": uniform_matrix(8, 4),
                  "candidate_recurrent": uniform_matrix(8, 8),
                  "candidate_bias": vec![0.0; 8] },
                { "kind": "dense", "in_width": 8, "out_width": 1,
                  "weights": uniform_matrix(1, 8), "bias": [0.0] }
            ]
        });
        let doc = doc(value);
        match build_static_model(&doc).unwrap_err() {
            ModelLoadError::TopologyMismatch { index, actual, .. } => {
                assert_eq!(index, 2);
                assert!(actual.contains("stride=1"));
            }
            other => panic!("expected TopologyMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_static_rejects_non_tanh_activation() {
        let value = json!({
            "in_width": 1,
            "layers": [
                { "kind": "dense", "in_width": 1, "out_width": 8,
                  "weights": uniform_matrix(8, 1), "bias": vec![0.0; 8],
                  "activation": "relu" },
                { "kind": "conv1d", "in_width": 8, "out_width": 4,
                  "kernel_size": 3, "stride": 2,
                  "kernel": vec![vec![vec![0.1f32; 8]; 3]; 4], "bias": vec![0.0; 4],
                  "activation": "tanh" },
                { "kind": "gru", "in_width": 4, "out_width": 8,
                  "update_weights": uniform_matrix(8, 4),
                  "update_recurrent": uniform_matrix(8, 8),
                  "update_bias": vec![0.0; 8],
                  "reset_weights": uniform_matrix(8, 4),
                  "reset_recurrent": uniform_matrix(8, 8),
                  "reset_bias": vec![0.0; 8],
                  "candidate_weights": uniform_matrix(8, 4),
                  "candidate_recurrent": uniform_matrix(8, 8),
                  "candidate_bias": vec![0.0; 8] },
                { "kind": "dense", "in_width": 8, "out_width": 1,
                  "weights": uniform_matrix(1, 8), "bias": [0.0] }
            ]
        });
        let doc = doc(value);
        match build_static_model(&doc).unwrap_err() {
            ModelLoadError::TopologyMismatch { index, expected, actual } => {
                assert_eq!(index, 1);
                assert_eq!(expected, "activation tanh");
                assert_eq!(actual, "activation relu");
            }
            other => panic!("expected TopologyMismatch, got {other:?}"),
        }
    }
}
