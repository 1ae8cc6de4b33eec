//! Bidirectional GRU Encoder
//!
//! Every layer scans the packed batch forwards and backwards with separate
//! cells and concatenates both directions along the feature axis.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{check_features, check_stack, EncoderOutput};
use crate::cells::GruCell;
use crate::error::{self, EncoderError};
use crate::packing::{check_lengths, PackedSequence, SortOrder};

/// Configuration for [`BiGru`]
#[derive(Config, Debug)]
pub struct BiGruConfig {
    /// Features per timestep
    pub d_input: usize,
    /// Combined hidden size of both directions; must be even
    pub d_hidden: usize,
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl BiGruConfig {
    /// Build the encoder, failing with `InvalidConfig` when `d_hidden` is odd
    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<BiGru<B>> {
        check_stack(self.d_input, self.d_hidden, self.num_layers, self.dropout)?;
        if self.d_hidden % 2 != 0 {
            return Err(EncoderError::config(format!(
                "bidirectional hidden size must be even, got {}",
                self.d_hidden
            )));
        }

        let d_direction = self.d_hidden / 2;
        let build = || -> Vec<GruCell<B>> {
            (0..self.num_layers)
                .map(|index| {
                    let input_size = if index == 0 { self.d_input } else { self.d_hidden };
                    GruCell::new(input_size, d_direction, device)
                })
                .collect()
        };

        Ok(BiGru {
            forward_layers: build(),
            backward_layers: build(),
            dropout: DropoutConfig::new(self.dropout).init(),
            d_input: self.d_input,
            d_hidden: self.d_hidden,
        })
    }
}

/// Bidirectional multi-layer GRU encoder
///
/// Unlike [`Gru`](super::Gru) there is no initial state parameter: both
/// directions always start from zeros.
#[derive(Module, Debug)]
pub struct BiGru<B: Backend> {
    /// Left-to-right cell per layer
    forward_layers: Vec<GruCell<B>>,
    /// Right-to-left cell per layer
    backward_layers: Vec<GruCell<B>>,
    dropout: Dropout,
    d_input: usize,
    d_hidden: usize,
}

impl<B: Backend> BiGru<B> {
    pub fn d_input(&self) -> usize {
        self.d_input
    }

    /// Combined hidden size of both directions
    pub fn d_hidden(&self) -> usize {
        self.d_hidden
    }

    pub fn num_layers(&self) -> usize {
        self.forward_layers.len()
    }

    /// Encode a padded batch of variable-length sequences
    ///
    /// # Arguments
    /// * `batch` - Input tensor of shape `[batch, max_len, d_input]`
    /// * `lengths` - True length of every sequence, each in `[1, max_len]`
    ///
    /// # Returns
    /// [`EncoderOutput`] in the order of `batch`:
    /// - hidden_states: `[batch, max_len, d_hidden]`, forward half then backward half
    /// - pooled: `[batch, d_hidden]`, last layer's forward and backward final states
    /// - final_hidden: `[num_layers * 2, batch, d_hidden / 2]`, layer-major,
    ///   forward before backward
    pub fn encode(&self, batch: Tensor<B, 3>, lengths: &[usize]) -> error::Result<EncoderOutput<B>> {
        let [batch_size, max_len, d_input] = batch.dims();
        check_lengths(lengths, batch_size, max_len)?;
        check_features(d_input, self.d_input)?;

        let device = batch.device();
        let order = SortOrder::descending(lengths);
        let zeros = Tensor::<B, 2>::zeros([batch_size, self.d_hidden / 2], &device);

        let mut packed = PackedSequence::pack(batch, &order)?;
        let mut finals = Vec::with_capacity(2 * self.num_layers());

        let layers = self.forward_layers.iter().zip(self.backward_layers.iter());
        for (index, (forward_cell, backward_cell)) in layers.enumerate() {
            if index > 0 {
                packed = packed.map_data(|data| self.dropout.forward(data));
            }

            let (forward, forward_last) = packed.run_cell(forward_cell, zeros.clone());
            let (backward, backward_last) = packed.run_cell_reversed(backward_cell, zeros.clone());

            packed = PackedSequence::concat_features(forward, backward);
            finals.push(forward_last);
            finals.push(backward_last);
        }

        let hidden_states = packed.pad(max_len)?;
        let top = finals.len() - 2;
        let pooled = Tensor::cat(vec![finals[top].clone(), finals[top + 1].clone()], 1);
        let final_hidden: Tensor<B, 3> = Tensor::stack(finals, 0);

        Ok(EncoderOutput {
            hidden_states: order.restore(hidden_states, 0),
            pooled: order.restore(pooled, 0),
            final_hidden: order.restore(final_hidden, 1),
        })
    }
}
