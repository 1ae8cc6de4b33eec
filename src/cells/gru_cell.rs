use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::RecurrentCell;

/// Gated recurrent unit cell
///
/// Implements the standard GRU equations with separate input and recurrent biases:
/// - r = sigmoid(W_ir @ x + b_ir + W_hr @ h + b_hr)
/// - z = sigmoid(W_iz @ x + b_iz + W_hz @ h + b_hz)
/// - n = tanh(W_in @ x + b_in + r * (W_hn @ h + b_hn))
/// - h' = (1 - z) * n + z * h
///
/// The cell output at each step is the new hidden state.
#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    input_size: usize,
    hidden_size: usize,
    input_map: Linear<B>,     // Maps input to 3 * hidden_size (r, z, n)
    recurrent_map: Linear<B>, // Maps hidden state to 3 * hidden_size (r, z, n)
}

impl<B: Backend> GruCell<B> {
    /// Create a new GRU cell
    ///
    /// # Arguments
    /// * `input_size` - Size of the input features
    /// * `hidden_size` - Size of the hidden state
    /// * `device` - Device to create the module on
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let input_map = LinearConfig::new(input_size, 3 * hidden_size)
            .with_bias(true)
            .init(device);

        let recurrent_map = LinearConfig::new(hidden_size, 3 * hidden_size)
            .with_bias(true)
            .init(device);

        Self {
            input_size,
            hidden_size,
            input_map,
            recurrent_map,
        }
    }

    /// Get the input size
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Get the hidden size
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Perform a forward pass through the GRU cell
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape `[batch_size, input_size]`
    /// * `hidden` - Previous hidden state of shape `[batch_size, hidden_size]`
    ///
    /// # Returns
    /// The new hidden state, shape `[batch_size, hidden_size]`
    pub fn forward(&self, input: Tensor<B, 2>, hidden: Tensor<B, 2>) -> Tensor<B, 2> {
        let input_gates = self.input_map.forward(input).chunk(3, 1);
        let recurrent_gates = self.recurrent_map.forward(hidden.clone()).chunk(3, 1);

        let reset = activation::sigmoid(input_gates[0].clone() + recurrent_gates[0].clone());
        let update = activation::sigmoid(input_gates[1].clone() + recurrent_gates[1].clone());
        let candidate = (input_gates[2].clone() + reset * recurrent_gates[2].clone()).tanh();

        // (1 - z) * n + z * h, rearranged to avoid a scalar-minus-tensor
        candidate.clone() + update * (hidden - candidate)
    }
}

impl<B: Backend> RecurrentCell<B> for GruCell<B> {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn step(&self, input: Tensor<B, 2>, hidden: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let new_hidden = self.forward(input, hidden);
        (new_hidden.clone(), new_hidden)
    }
}
