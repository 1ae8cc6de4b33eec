//! Unidirectional GRU Encoder
//!
//! Stacked GRU layer that encodes padded variable-length batches through
//! sort, pack, scan, unpack and restore, plus a single-step entry point for
//! incremental decoding.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{check_features, check_stack, layer_state, EncoderOutput};
use crate::cells::{GruCell, RecurrentCell};
use crate::error::{self, EncoderError};
use crate::packing::{check_lengths, PackedSequence, SortOrder};

/// Configuration for [`Gru`]
#[derive(Config, Debug)]
pub struct GruConfig {
    /// Features per timestep
    pub d_input: usize,
    /// Hidden units per layer
    pub d_hidden: usize,
    /// Number of stacked layers
    #[config(default = 1)]
    pub num_layers: usize,
    /// Dropout on the outputs of every layer except the last
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl GruConfig {
    /// Build the encoder, failing with `InvalidConfig` on empty sizes,
    /// zero layers or a dropout outside `[0, 1)`
    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<Gru<B>> {
        check_stack(self.d_input, self.d_hidden, self.num_layers, self.dropout)?;

        let layers = (0..self.num_layers)
            .map(|index| {
                let input_size = if index == 0 { self.d_input } else { self.d_hidden };
                GruCell::new(input_size, self.d_hidden, device)
            })
            .collect();

        Ok(Gru {
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
            d_input: self.d_input,
            d_hidden: self.d_hidden,
        })
    }
}

/// Unidirectional multi-layer GRU encoder
///
/// # Type Parameters
/// * `B` - The backend type
#[derive(Module, Debug)]
pub struct Gru<B: Backend> {
    /// One cell per stacked layer
    layers: Vec<GruCell<B>>,
    /// Inter-layer dropout
    dropout: Dropout,
    d_input: usize,
    d_hidden: usize,
}

impl<B: Backend> Gru<B> {
    /// Get input size
    pub fn d_input(&self) -> usize {
        self.d_input
    }

    /// Get hidden size
    pub fn d_hidden(&self) -> usize {
        self.d_hidden
    }

    /// Get number of stacked layers
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Encode a padded batch of variable-length sequences
    ///
    /// # Arguments
    /// * `batch` - Input tensor of shape `[batch, max_len, d_input]`
    /// * `lengths` - True length of every sequence, each in `[1, max_len]`
    /// * `initial_hidden` - Optional state `[num_layers, batch, d_hidden]`; zeros if `None`
    ///
    /// # Returns
    /// [`EncoderOutput`] in the order of `batch`, with `final_hidden` of shape
    /// `[num_layers, batch, d_hidden]` and `pooled` equal to its last layer
    pub fn encode(
        &self,
        batch: Tensor<B, 3>,
        lengths: &[usize],
        initial_hidden: Option<Tensor<B, 3>>,
    ) -> error::Result<EncoderOutput<B>> {
        let [batch_size, max_len, d_input] = batch.dims();
        check_lengths(lengths, batch_size, max_len)?;
        check_features(d_input, self.d_input)?;
        if let Some(hidden) = &initial_hidden {
            self.check_hidden(hidden, batch_size, "initial hidden state")?;
        }

        let device = batch.device();
        let order = SortOrder::descending(lengths);
        let initial_hidden = initial_hidden.map(|hidden| order.sort(hidden, 1));

        let mut packed = PackedSequence::pack(batch, &order)?;
        let mut finals = Vec::with_capacity(self.layers.len());

        for (index, cell) in self.layers.iter().enumerate() {
            if index > 0 {
                packed = packed.map_data(|data| self.dropout.forward(data));
            }

            let initial = match &initial_hidden {
                Some(hidden) => layer_state(hidden, index),
                None => Tensor::zeros([batch_size, self.d_hidden], &device),
            };

            let (outputs, last) = packed.run_cell(cell, initial);
            packed = outputs;
            finals.push(last);
        }

        let hidden_states = packed.pad(max_len)?;
        let final_hidden: Tensor<B, 3> = Tensor::stack(finals, 0);
        let pooled = layer_state(&final_hidden, self.layers.len() - 1);

        Ok(EncoderOutput {
            hidden_states: order.restore(hidden_states, 0),
            pooled: order.restore(pooled, 0),
            final_hidden: order.restore(final_hidden, 1),
        })
    }

    /// Advance every sequence in the batch by one timestep
    ///
    /// No sorting or packing happens: every row is treated as active.
    ///
    /// # Arguments
    /// * `input` - Tensor of shape `[batch, 1, d_input]`
    /// * `previous_hidden` - State of shape `[num_layers, batch, d_hidden]`
    ///
    /// # Returns
    /// Tuple of (output `[batch, 1, d_hidden]`, new hidden state `[num_layers, batch, d_hidden]`)
    pub fn step(
        &self,
        input: Tensor<B, 3>,
        previous_hidden: Tensor<B, 3>,
    ) -> error::Result<(Tensor<B, 3>, Tensor<B, 3>)> {
        let [batch_size, timesteps, d_input] = input.dims();
        if timesteps != 1 {
            return Err(EncoderError::shape(format!(
                "step expects exactly one timestep, got {timesteps}"
            )));
        }
        check_features(d_input, self.d_input)?;
        self.check_hidden(&previous_hidden, batch_size, "previous hidden state")?;

        let mut x = input.reshape([batch_size, d_input]);
        let mut states = Vec::with_capacity(self.layers.len());

        for (index, cell) in self.layers.iter().enumerate() {
            if index > 0 {
                x = self.dropout.forward(x);
            }
            let (output, next) = cell.step(x, layer_state(&previous_hidden, index));
            states.push(next);
            x = output;
        }

        let output = x.reshape([batch_size, 1, self.d_hidden]);
        Ok((output, Tensor::stack(states, 0)))
    }

    fn check_hidden(
        &self,
        hidden: &Tensor<B, 3>,
        batch_size: usize,
        what: &str,
    ) -> error::Result<()> {
        let expected = [self.layers.len(), batch_size, self.d_hidden];
        if hidden.dims() != expected {
            return Err(EncoderError::shape(format!(
                "{what} has shape {:?}, expected {:?}",
                hidden.dims(),
                expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::backend::Backend as BurnBackend;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;
    type TestDevice = <TestBackend as BurnBackend>::Device;

    fn get_test_device() -> TestDevice {
        Default::default()
    }

    #[test]
    fn test_gru_creation() {
        let device = get_test_device();
        let gru = GruConfig::new(20, 50)
            .with_num_layers(3)
            .init::<TestBackend>(&device)
            .unwrap();

        assert_eq!(gru.d_input(), 20);
        assert_eq!(gru.d_hidden(), 50);
        assert_eq!(gru.num_layers(), 3);
    }

    #[test]
    fn test_gru_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gru.json");

        GruConfig::new(20, 50)
            .with_num_layers(3)
            .with_dropout(0.25)
            .save(&path)
            .unwrap();
        let loaded = GruConfig::load(&path).unwrap();

        assert_eq!(loaded.d_input, 20);
        assert_eq!(loaded.d_hidden, 50);
        assert_eq!(loaded.num_layers, 3);
        assert_eq!(loaded.dropout, 0.25);

        let gru = loaded.init::<TestBackend>(&get_test_device()).unwrap();
        assert_eq!(gru.num_layers(), 3);
    }

    #[test]
    fn test_gru_invalid_config() {
        let device = get_test_device();

        let zero_layers = GruConfig::new(20, 50).with_num_layers(0).init::<TestBackend>(&device);
        assert!(matches!(zero_layers, Err(EncoderError::InvalidConfig(_))));

        let bad_dropout = GruConfig::new(20, 50).with_dropout(1.0).init::<TestBackend>(&device);
        assert!(matches!(bad_dropout, Err(EncoderError::InvalidConfig(_))));
    }

    #[test]
    fn test_gru_encode_shapes() {
        let device = get_test_device();
        let gru = GruConfig::new(20, 50)
            .with_num_layers(2)
            .init::<TestBackend>(&device)
            .unwrap();

        let batch = Tensor::<TestBackend, 3>::random([4, 10, 20], Distribution::Uniform(-1.0, 1.0), &device);
        let output = gru.encode(batch, &[10, 3, 7, 1], None).unwrap();

        assert_eq!(output.hidden_states.dims(), [4, 10, 50]);
        assert_eq!(output.pooled.dims(), [4, 50]);
        assert_eq!(output.final_hidden.dims(), [2, 4, 50]);
    }

    #[test]
    fn test_gru_encode_with_initial_state() {
        let device = get_test_device();
        let gru = GruConfig::new(8, 16).init::<TestBackend>(&device).unwrap();

        let batch = Tensor::<TestBackend, 3>::random([2, 5, 8], Distribution::Uniform(-1.0, 1.0), &device);
        let zeros = Tensor::<TestBackend, 3>::zeros([1, 2, 16], &device);
        let ones = Tensor::<TestBackend, 3>::ones([1, 2, 16], &device);

        let from_zeros = gru.encode(batch.clone(), &[5, 2], Some(zeros)).unwrap();
        let from_default = gru.encode(batch.clone(), &[5, 2], None).unwrap();
        let from_ones = gru.encode(batch, &[5, 2], Some(ones)).unwrap();

        let same: f32 = (from_zeros.pooled.clone() - from_default.pooled).abs().max().into_scalar();
        assert!(same < 1e-6, "Explicit zero state should match the default");

        let moved: f32 = (from_zeros.pooled - from_ones.pooled).abs().max().into_scalar();
        assert!(moved > 0.0, "Initial state should influence the result");
    }

    #[test]
    fn test_gru_rejects_wrong_initial_state() {
        let device = get_test_device();
        let gru = GruConfig::new(8, 16).with_num_layers(2).init::<TestBackend>(&device).unwrap();

        let batch = Tensor::<TestBackend, 3>::zeros([3, 4, 8], &device);
        let hidden = Tensor::<TestBackend, 3>::zeros([1, 3, 16], &device);

        let result = gru.encode(batch, &[4, 4, 4], Some(hidden));
        assert!(matches!(result, Err(EncoderError::ShapeMismatch(_))));
    }

    #[test]
    fn test_gru_rejects_wrong_feature_size() {
        let device = get_test_device();
        let gru = GruConfig::new(8, 16).init::<TestBackend>(&device).unwrap();

        let batch = Tensor::<TestBackend, 3>::zeros([2, 4, 9], &device);
        let result = gru.encode(batch, &[4, 2], None);
        assert!(matches!(result, Err(EncoderError::ShapeMismatch(_))));
    }

    #[test]
    fn test_gru_step_shapes() {
        let device = get_test_device();
        let gru = GruConfig::new(8, 16).with_num_layers(2).init::<TestBackend>(&device).unwrap();

        let input = Tensor::<TestBackend, 3>::zeros([3, 1, 8], &device);
        let hidden = Tensor::<TestBackend, 3>::zeros([2, 3, 16], &device);

        let (output, new_hidden) = gru.step(input, hidden).unwrap();

        assert_eq!(output.dims(), [3, 1, 16]);
        assert_eq!(new_hidden.dims(), [2, 3, 16]);
    }

    #[test]
    fn test_gru_step_rejects_batch_mismatch() {
        let device = get_test_device();
        let gru = GruConfig::new(8, 16).init::<TestBackend>(&device).unwrap();

        let input = Tensor::<TestBackend, 3>::zeros([3, 1, 8], &device);
        let hidden = Tensor::<TestBackend, 3>::zeros([1, 2, 16], &device);

        assert!(matches!(gru.step(input, hidden), Err(EncoderError::ShapeMismatch(_))));
    }

    #[test]
    fn test_gru_step_rejects_multiple_timesteps() {
        let device = get_test_device();
        let gru = GruConfig::new(8, 16).init::<TestBackend>(&device).unwrap();

        let input = Tensor::<TestBackend, 3>::zeros([3, 2, 8], &device);
        let hidden = Tensor::<TestBackend, 3>::zeros([1, 3, 16], &device);

        assert!(matches!(gru.step(input, hidden), Err(EncoderError::ShapeMismatch(_))));
    }
}
