//! # Recurrent Cell Implementations
//!
//! This module provides single-timestep recurrent cells. Cells process one
//! timestep at a time and are driven across whole sequences by the packed
//! scans in [`crate::packing`] and the encoder layers in [`crate::rnn`].
//!
//! ## The `RecurrentCell` seam
//!
//! Sequence processing only relies on [`RecurrentCell`]: an opaque step
//! function from an input and a previous hidden state to an output and a new
//! hidden state. Anything implementing it can be packed, scanned forwards or
//! backwards, and stacked.
//!
//! ## Tensor Shapes
//!
//! | Tensor | Shape | Description |
//! |--------|-------|-------------|
//! | `input` | `[batch, input_size]` | Input features |
//! | `hidden` | `[batch, hidden_size]` | Previous hidden state |
//! | `output` | `[batch, output_size]` | Cell output |
//! | `new_hidden` | `[batch, hidden_size]` | Updated hidden state |
//!
//! ## Example: Using GruCell Directly
//!
//! ```ignore
//! use varlen_gru::cells::{GruCell, RecurrentCell};
//! use burn::tensor::Tensor;
//!
//! let device = Default::default();
//! let cell = GruCell::<Backend>::new(16, 32, &device);
//!
//! let input: Tensor<Backend, 2> = Tensor::zeros([batch, 16], &device);
//! let hidden: Tensor<Backend, 2> = Tensor::zeros([batch, 32], &device);
//!
//! let (output, new_hidden) = cell.step(input, hidden);
//! // output: [batch, 32] (same values as new_hidden)
//! ```

pub mod gru_cell;

pub use gru_cell::GruCell;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// A single-timestep recurrent primitive.
pub trait RecurrentCell<B: Backend> {
    /// Number of input features per timestep
    fn input_size(&self) -> usize;

    /// Number of hidden units
    fn hidden_size(&self) -> usize;

    /// Advance every row of the batch by one timestep.
    ///
    /// Returns `(output, new_hidden)`. Both keep the batch size of `input`.
    fn step(&self, input: Tensor<B, 2>, hidden: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>);
}
