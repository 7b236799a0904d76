//! Per-channel inference engine
//!
//! Owns one dynamic and one static model for a single audio channel, both
//! built from the same document, and routes each sample through whichever
//! path the host selects. The selector is externally owned; the engine
//! treats it as an opaque input and keeps no preference of its own.
//!
//! The host allocates one engine per channel: hidden state is never shared
//! across channels or across paths.

use tracing::debug;

use crate::error::{ModelLoadError, Result};
use crate::loader::{build_model, build_static_model, ModelDocument};
use crate::model::Model;
use crate::static_model::StaticModel;

/// Which execution path a sample is routed through
///
/// Converted from the host's raw selector: 0 is the dynamic path, any other
/// value the static path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelPath {
    #[default]
    Dynamic,
    Static,
}

impl From<u32> for ModelPath {
    fn from(raw: u32) -> Self {
        if raw == 0 {
            ModelPath::Dynamic
        } else {
            ModelPath::Static
        }
    }
}

/// Both execution paths for one channel behind a uniform surface
pub struct InferenceEngine {
    dynamic: Model,
    static_model: StaticModel,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine").finish_non_exhaustive()
    }
}

impl InferenceEngine {
    /// Build both models from a parsed document
    ///
    /// The sample-streaming surface requires arity 1 -> 1; a document whose
    /// chain starts or ends wider fails here, before any audio runs.
    pub fn from_document(doc: &ModelDocument) -> Result<Self> {
        let dynamic = build_model(doc)?;
        if dynamic.in_width() != 1 {
            return Err(ModelLoadError::ShapeMismatch {
                index: 0,
                kind: "model",
                field: "in_width",
                expected: 1,
                actual: dynamic.in_width(),
            });
        }
        if dynamic.out_width() != 1 {
            return Err(ModelLoadError::ShapeMismatch {
                index: dynamic.len().saturating_sub(1),
                kind: "model",
                field: "out_width",
                expected: 1,
                actual: dynamic.out_width(),
            });
        }
        let static_model = build_static_model(doc)?;
        debug!(layers = dynamic.len(), "inference engine ready");
        Ok(Self {
            dynamic,
            static_model,
        })
    }

    /// Build both models from a raw document byte buffer
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_document(&ModelDocument::from_slice(bytes)?)
    }

    /// Run one sample through the selected path
    ///
    /// Each path advances only its own state; switching the selector
    /// mid-stream leaves the other path's state untouched.
    #[inline]
    pub fn process(&mut self, sample: f32, path: ModelPath) -> f32 {
        match path {
            ModelPath::Dynamic => self.dynamic.forward(sample),
            ModelPath::Static => self.static_model.forward(sample),
        }
    }

    /// Reset both paths, called at stream (re)start
    pub fn reset(&mut self) {
        self.dynamic.reset();
        self.static_model.reset();
    }

    pub fn dynamic(&self) -> &Model {
        &self.dynamic
    }

    pub fn static_model(&self) -> &StaticModel {
        &self.static_model
    }
}
