//! # Variable-Length Recurrent Encoders
//!
//! Whole-batch encoders over padded, variable-length sequences. **These are
//! the primary APIs most users should use.**
//!
//! ## Available Layers
//!
//! | Layer | Directions | Continuation | Pooled output |
//! |-------|------------|--------------|---------------|
//! | [`Gru`] | 1 | `initial_hidden` accepted | last layer's final state |
//! | [`BiGru`] | 2 | always zero state | last layer's `[forward ‖ backward]` final states |
//!
//! [`Gru::step`] is the single-timestep variant for incremental decoding.
//!
//! ## Quick Start
//!
//! ```ignore
//! use varlen_gru::prelude::*;
//! use burn::tensor::Tensor;
//!
//! let gru = GruConfig::new(16, 32).with_num_layers(2).init::<Backend>(&device)?;
//!
//! // [batch=3, max_len=10, features=16], true lengths 10, 4 and 7
//! let batch: Tensor<Backend, 3> = Tensor::zeros([3, 10, 16], &device);
//! let output = gru.encode(batch, &[10, 4, 7], None)?;
//!
//! // output.hidden_states: [3, 10, 32] - zero beyond each length
//! // output.pooled:        [3, 32]     - sentence embeddings
//! // output.final_hidden:  [2, 3, 32]  - one state per layer
//! ```
//!
//! ## Tensor Shapes
//!
//! | Tensor | Shape |
//! |--------|-------|
//! | `batch` | `[batch, max_len, d_input]` |
//! | `lengths` | `batch` values in `[1, max_len]` |
//! | `hidden_states` | `[batch, max_len, d_hidden]` |
//! | `pooled` | `[batch, d_hidden]` |
//! | `final_hidden` | `[num_layers * directions, batch, d_hidden / directions]` |
//!
//! All outputs come back in the caller's batch order even though the batch is
//! sorted by length internally.
//!
//! ### Stateful Processing (unidirectional only)
//!
//! ```ignore
//! let first = gru.encode(chunk1, &lengths, None)?;
//! let second = gru.encode(chunk2, &lengths, Some(first.final_hidden))?;
//! ```
//!
//! Bidirectional continuation is not offered: the backward direction of a
//! padded chunk has no well-defined state to resume from.

pub mod bigru;
pub mod gru;

pub use bigru::{BiGru, BiGruConfig};
pub use gru::{Gru, GruConfig};

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{EncoderError, Result};

/// Result of encoding a padded batch, in the caller's batch order
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// Top-layer output at every timestep, `[batch, max_len, d_hidden]`,
    /// exactly zero at and beyond each sequence's length
    pub hidden_states: Tensor<B, 3>,
    /// Sentence embedding, `[batch, d_hidden]`
    pub pooled: Tensor<B, 2>,
    /// State after each sequence's true length,
    /// `[num_layers * directions, batch, d_hidden / directions]`
    pub final_hidden: Tensor<B, 3>,
}

/// Slice layer `index` out of a `[layers, batch, hidden]` state
pub(crate) fn layer_state<B: Backend>(hidden: &Tensor<B, 3>, index: usize) -> Tensor<B, 2> {
    let [_, batch_size, hidden_size] = hidden.dims();
    hidden
        .clone()
        .narrow(0, index, 1)
        .reshape([batch_size, hidden_size])
}

pub(crate) fn check_stack(
    d_input: usize,
    d_hidden: usize,
    num_layers: usize,
    dropout: f64,
) -> Result<()> {
    if d_input == 0 || d_hidden == 0 {
        return Err(EncoderError::config(format!(
            "input and hidden sizes must be positive, got d_input={d_input}, d_hidden={d_hidden}"
        )));
    }
    if num_layers == 0 {
        return Err(EncoderError::config("at least one layer is required"));
    }
    if !(0.0..1.0).contains(&dropout) {
        return Err(EncoderError::config(format!(
            "dropout must lie in [0, 1), got {dropout}"
        )));
    }
    Ok(())
}

pub(crate) fn check_features(d_input: usize, expected: usize) -> Result<()> {
    if d_input != expected {
        return Err(EncoderError::shape(format!(
            "batch has {d_input} features per timestep but the encoder expects {expected}"
        )));
    }
    Ok(())
}
