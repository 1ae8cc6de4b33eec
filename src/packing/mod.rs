//! # Variable-Length Packing
//!
//! Padded batches waste recurrent computation on trailing filler. Packing
//! sorts the batch by descending length so that, at every timestep, the
//! sequences still running form a prefix of the batch. A cell scan then only
//! steps that prefix and finished sequences keep their final state.
//!
//! ```text
//! lengths      [2, 3, 1]          sorted   [3, 2, 1]   (rows 1, 0, 2)
//!
//!   t:   0  1  2                   t:   0  1  2
//! row0   a  b  .                 row1   d  e  f
//! row1   d  e  f     ── sort ──▶ row0   a  b
//! row2   g  .  .                 row2   g
//!
//! packed data   [d a g | e b | f]     batch_sizes [3, 2, 1]
//! ```
//!
//! [`SortOrder`] carries the permutation and its inverse so results can be
//! restored to the caller's order; [`PackedSequence`] holds the packed
//! values and runs cells over them.

pub mod order;
pub mod packed;

pub use order::SortOrder;
pub use packed::PackedSequence;

use crate::error::{EncoderError, Result};

/// Validate a length vector against a `[batch_size, max_len, ..]` batch
///
/// Fails with `ShapeMismatch` when the counts disagree or the batch is empty,
/// and with `InvalidLength` for the first length outside `[1, max_len]`.
pub fn check_lengths(lengths: &[usize], batch_size: usize, max_len: usize) -> Result<()> {
    if lengths.len() != batch_size {
        return Err(EncoderError::shape(format!(
            "{} lengths given for a batch of {} sequences",
            lengths.len(),
            batch_size
        )));
    }
    if batch_size == 0 {
        return Err(EncoderError::shape("batch holds no sequences"));
    }

    match lengths
        .iter()
        .enumerate()
        .find(|(_, &length)| length == 0 || length > max_len)
    {
        Some((index, &length)) => Err(EncoderError::InvalidLength {
            index,
            length,
            max_len,
        }),
        None => Ok(()),
    }
}
