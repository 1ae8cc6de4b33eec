//! # varlen-gru - Variable-Length GRU Encoders (Rust)
//!
//! Sentence encoders over padded, variable-length batches, and a question
//! classifier trained on top of them, built on the Burn framework.
//!
//! ## Features
//!
//! - **Packing**: batches are sorted by length and packed so recurrent steps skip padding
//! - **Order restoration**: every output comes back in the caller's batch order
//! - **Gru**: stacked unidirectional encoder with optional initial state and a single-step API
//! - **BiGru**: stacked bidirectional encoder with concatenated forward/backward states
//! - **Pluggable cells**: packed scans run any [`cells::RecurrentCell`]
//! - **Training**: embedding + encoder + MLP classifier, Adam, multi-step LR decay, checkpoints
//!
//! ## Quick Start
//!
//! ```rust
//! use varlen_gru::packing::SortOrder;
//!
//! // Lengths of a padded batch; the longest sequence goes first
//! let order = SortOrder::descending(&[3, 7, 5]);
//!
//! assert_eq!(order.sorted_lengths(), &[7, 5, 3]);
//! assert_eq!(order.unsorted_indices(), &[2, 0, 1]);
//! ```
//!
//! ## Encoder Usage
//!
//! ```ignore
//! use varlen_gru::prelude::*;
//!
//! let gru = GruConfig::new(300, 1024).with_num_layers(2).init::<Backend>(&device)?;
//! let output = gru.encode(batch, &lengths, None)?;
//! // output.pooled: [batch, 1024]
//! ```

pub mod cells;
pub mod error;
pub mod packing;
pub mod rnn;
pub mod training;

pub mod prelude {
    pub use crate::cells::{GruCell, RecurrentCell};
    pub use crate::error::{EncoderError, Result};
    pub use crate::packing::{PackedSequence, SortOrder};
    pub use crate::rnn::{BiGru, BiGruConfig, EncoderOutput, Gru, GruConfig};
}
