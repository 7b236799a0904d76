//! Neura - Real-Time Neural Network Inference for Audio DSP
//!
//! Neura evaluates a small feed-forward/recurrent network once per audio
//! sample, inside a hard-deadline audio callback, with two alternative
//! execution strategies:
//! 1. Dynamic path - layers chosen and wired at load time from a serialized
//!    model document, dispatched through trait objects
//! 2. Static path - layer types and widths fixed at build time, fully
//!    inlined, stack-allocated, no indirection
//!
//! # Architecture
//!
//! Load time: model document -> loader -> per-layer weight tensors -> model
//! instance (either path). Run time: one `f32` sample in, one `f32` sample
//! out; layer state (GRU hidden vector, Conv1D history ring) persists across
//! calls until an explicit `reset()`.
//!
//! Everything on the audio thread is allocation-free, lock-free and total:
//! a model that loaded successfully cannot fail during `forward` or `reset`.

pub mod activation;
pub mod engine;
pub mod error;
pub mod layers;
pub mod loader;
pub mod model;
pub mod static_model;
pub mod tensor;

pub use engine::{InferenceEngine, ModelPath};
pub use error::{ModelLoadError, Result};
pub use loader::{build_model, build_static_model, ModelDocument};
pub use model::Model;
pub use static_model::StaticModel;
