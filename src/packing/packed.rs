use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{check_lengths, SortOrder};
use crate::cells::RecurrentCell;
use crate::error::{EncoderError, Result};

/// A length-sorted batch with its padding stripped.
///
/// `data` stacks the active rows of every timestep, time-major: the first
/// `batch_sizes[0]` rows are timestep 0, the next `batch_sizes[1]` rows are
/// timestep 1, and so on. Because the batch is sorted by descending length,
/// the active rows of a timestep are always a prefix of the batch.
#[derive(Debug, Clone)]
pub struct PackedSequence<B: Backend> {
    /// Packed values of shape `[sum(batch_sizes), features]`
    data: Tensor<B, 2>,
    /// Number of active sequences at each timestep, non-increasing
    batch_sizes: Vec<usize>,
}

impl<B: Backend> PackedSequence<B> {
    /// Sort a batch-first padded batch by `order` and pack it
    ///
    /// # Arguments
    /// * `padded` - Tensor of shape `[batch, max_len, features]` in the caller's order
    /// * `order` - Sort order computed from the lengths of `padded`
    pub fn pack(padded: Tensor<B, 3>, order: &SortOrder) -> Result<Self> {
        let [batch_size, max_len, features] = padded.dims();
        if order.len() != batch_size {
            return Err(EncoderError::shape(format!(
                "sort order covers {} sequences but the batch holds {}",
                order.len(),
                batch_size
            )));
        }
        check_lengths(order.sorted_lengths(), batch_size, max_len)?;

        let sorted = order.sort(padded, 0);
        let lengths = order.sorted_lengths();
        let longest = lengths[0];

        let batch_sizes: Vec<usize> = (0..longest)
            .map(|t| lengths.iter().take_while(|&&length| length > t).count())
            .collect();

        let steps: Vec<Tensor<B, 2>> = batch_sizes
            .iter()
            .enumerate()
            .map(|(t, &active)| {
                sorted
                    .clone()
                    .narrow(1, t, 1)
                    .narrow(0, 0, active)
                    .reshape([active, features])
            })
            .collect();

        Ok(Self::from_steps(steps, batch_sizes))
    }

    /// Assemble a packed sequence from per-timestep tensors of shape `[batch_sizes[t], features]`
    pub fn from_steps(steps: Vec<Tensor<B, 2>>, batch_sizes: Vec<usize>) -> Self {
        debug_assert_eq!(steps.len(), batch_sizes.len());
        Self {
            data: Tensor::cat(steps, 0),
            batch_sizes,
        }
    }

    /// Packed values, shape `[sum(batch_sizes), features]`
    pub fn data(&self) -> Tensor<B, 2> {
        self.data.clone()
    }

    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }

    /// Number of sequences in the batch
    pub fn batch_size(&self) -> usize {
        self.batch_sizes[0]
    }

    /// Longest true length in the batch
    pub fn max_len(&self) -> usize {
        self.batch_sizes.len()
    }

    /// Feature width of the packed values
    pub fn features(&self) -> usize {
        self.data.dims()[1]
    }

    /// Active rows of timestep `t`, shape `[batch_sizes[t], features]`
    pub fn step(&self, t: usize) -> Tensor<B, 2> {
        let offset: usize = self.batch_sizes[..t].iter().sum();
        self.data.clone().narrow(0, offset, self.batch_sizes[t])
    }

    /// Apply `f` to the packed values, e.g. dropout between stacked layers
    pub fn map_data(self, f: impl FnOnce(Tensor<B, 2>) -> Tensor<B, 2>) -> Self {
        Self {
            data: f(self.data),
            batch_sizes: self.batch_sizes,
        }
    }

    /// Join two packings of the same batch along the feature axis
    pub fn concat_features(first: Self, second: Self) -> Self {
        debug_assert_eq!(first.batch_sizes, second.batch_sizes);
        Self {
            data: Tensor::cat(vec![first.data, second.data], 1),
            batch_sizes: first.batch_sizes,
        }
    }

    /// Unpack into a batch-first padded tensor in sorted order
    ///
    /// Positions beyond each sequence's length are zero. The time axis is
    /// extended with zeros up to `total_length`.
    ///
    /// # Returns
    /// Tensor of shape `[batch, total_length, features]`
    pub fn pad(&self, total_length: usize) -> Result<Tensor<B, 3>> {
        if total_length < self.max_len() {
            return Err(EncoderError::shape(format!(
                "total length {} is shorter than the longest packed sequence ({})",
                total_length,
                self.max_len()
            )));
        }

        let device = self.data.device();
        let batch_size = self.batch_size();
        let features = self.features();

        let mut steps: Vec<Tensor<B, 2>> = Vec::with_capacity(total_length);
        for (t, &active) in self.batch_sizes.iter().enumerate() {
            let step = self.step(t);
            if active < batch_size {
                let filler = Tensor::<B, 2>::zeros([batch_size - active, features], &device);
                steps.push(Tensor::cat(vec![step, filler], 0));
            } else {
                steps.push(step);
            }
        }
        for _ in self.max_len()..total_length {
            steps.push(Tensor::<B, 2>::zeros([batch_size, features], &device));
        }

        Ok(Tensor::stack(steps, 1))
    }

    /// Run `cell` over the packed timesteps from first to last
    ///
    /// At timestep `t` only the first `batch_sizes[t]` rows are stepped;
    /// finished rows carry their state unchanged, so the returned state of
    /// each row is the state after its own last valid timestep.
    ///
    /// # Arguments
    /// * `initial` - Hidden state of shape `[batch, hidden_size]` in sorted order
    ///
    /// # Returns
    /// Tuple of (packed outputs, final hidden state `[batch, hidden_size]`)
    pub fn run_cell<C>(&self, cell: &C, initial: Tensor<B, 2>) -> (Self, Tensor<B, 2>)
    where
        C: RecurrentCell<B> + ?Sized,
    {
        let timesteps = (0..self.max_len()).collect::<Vec<_>>();
        let (outputs, hidden) = self.scan(cell, initial, &timesteps);
        (Self::from_steps(outputs, self.batch_sizes.clone()), hidden)
    }

    /// Run `cell` over the packed timesteps from last to first
    ///
    /// Each row starts from its own last valid timestep. Rows only become
    /// active once the scan reaches their length, so they start from the
    /// untouched `initial` state.
    pub fn run_cell_reversed<C>(&self, cell: &C, initial: Tensor<B, 2>) -> (Self, Tensor<B, 2>)
    where
        C: RecurrentCell<B> + ?Sized,
    {
        let timesteps = (0..self.max_len()).rev().collect::<Vec<_>>();
        let (mut outputs, hidden) = self.scan(cell, initial, &timesteps);
        outputs.reverse();
        (Self::from_steps(outputs, self.batch_sizes.clone()), hidden)
    }

    fn scan<C>(
        &self,
        cell: &C,
        initial: Tensor<B, 2>,
        timesteps: &[usize],
    ) -> (Vec<Tensor<B, 2>>, Tensor<B, 2>)
    where
        C: RecurrentCell<B> + ?Sized,
    {
        let [batch_size, _] = initial.dims();
        let mut hidden = initial;
        let mut outputs = Vec::with_capacity(timesteps.len());

        for &t in timesteps {
            let active = self.batch_sizes[t];
            let previous = hidden.clone().narrow(0, 0, active);
            let (output, next) = cell.step(self.step(t), previous);

            hidden = if active < batch_size {
                let idle = hidden.narrow(0, active, batch_size - active);
                Tensor::cat(vec![next, idle], 0)
            } else {
                next
            };
            outputs.push(output);
        }

        (outputs, hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    /// h' = h + x, so states are running sums of the inputs
    struct RunningSum;

    impl RecurrentCell<TestBackend> for RunningSum {
        fn input_size(&self) -> usize {
            1
        }

        fn hidden_size(&self) -> usize {
            1
        }

        fn step(
            &self,
            input: Tensor<TestBackend, 2>,
            hidden: Tensor<TestBackend, 2>,
        ) -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 2>) {
            let next = hidden + input;
            (next.clone(), next)
        }
    }

    fn values<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
        tensor.into_data().to_vec::<f32>().unwrap()
    }

    /// Rows of lengths [2, 3, 1]; padding is 99 so any leak shows up
    fn fixture() -> (Tensor<TestBackend, 3>, SortOrder) {
        let device = Default::default();
        let batch = Tensor::<TestBackend, 3>::from_floats(
            [
                [[1.0], [2.0], [99.0]],
                [[11.0], [12.0], [13.0]],
                [[21.0], [99.0], [99.0]],
            ],
            &device,
        );
        (batch, SortOrder::descending(&[2, 3, 1]))
    }

    #[test]
    fn test_pack_layout() {
        let (batch, order) = fixture();
        let packed = PackedSequence::pack(batch, &order).unwrap();

        assert_eq!(packed.batch_sizes(), &[3, 2, 1]);
        assert_eq!(packed.batch_size(), 3);
        assert_eq!(packed.max_len(), 3);
        assert_eq!(values(packed.data()), vec![11.0, 1.0, 21.0, 12.0, 2.0, 13.0]);
        assert_eq!(values(packed.step(1)), vec![12.0, 2.0]);
    }

    #[test]
    fn test_pad_zero_fills_and_extends() {
        let (batch, order) = fixture();
        let packed = PackedSequence::pack(batch, &order).unwrap();

        let padded = packed.pad(4).unwrap();
        assert_eq!(padded.dims(), [3, 4, 1]);
        assert_eq!(
            values(padded),
            vec![
                11.0, 12.0, 13.0, 0.0, // original row 1
                1.0, 2.0, 0.0, 0.0, // original row 0
                21.0, 0.0, 0.0, 0.0, // original row 2
            ]
        );
    }

    #[test]
    fn test_pad_rejects_short_total_length() {
        let (batch, order) = fixture();
        let packed = PackedSequence::pack(batch, &order).unwrap();

        assert!(matches!(packed.pad(2), Err(EncoderError::ShapeMismatch(_))));
    }

    #[test]
    fn test_forward_scan_stops_at_each_length() {
        let device = Default::default();
        let (batch, order) = fixture();
        let packed = PackedSequence::pack(batch, &order).unwrap();

        let initial = Tensor::<TestBackend, 2>::zeros([3, 1], &device);
        let (outputs, last) = packed.run_cell(&RunningSum, initial);

        assert_eq!(outputs.batch_sizes(), &[3, 2, 1]);
        assert_eq!(values(outputs.data()), vec![11.0, 1.0, 21.0, 23.0, 3.0, 36.0]);
        assert_eq!(values(last), vec![36.0, 3.0, 21.0]);
    }

    #[test]
    fn test_reversed_scan_starts_at_each_length() {
        let device = Default::default();
        let (batch, order) = fixture();
        let packed = PackedSequence::pack(batch, &order).unwrap();

        let initial = Tensor::<TestBackend, 2>::zeros([3, 1], &device);
        let (outputs, last) = packed.run_cell_reversed(&RunningSum, initial);

        // Outputs are stored in forward time order
        assert_eq!(values(outputs.data()), vec![36.0, 3.0, 21.0, 25.0, 2.0, 13.0]);
        assert_eq!(values(last), vec![36.0, 3.0, 21.0]);
    }

    #[test]
    fn test_forward_scan_uses_initial_state() {
        let device = Default::default();
        let (batch, order) = fixture();
        let packed = PackedSequence::pack(batch, &order).unwrap();

        let initial = Tensor::<TestBackend, 2>::from_floats([[100.0], [200.0], [300.0]], &device);
        let (_, last) = packed.run_cell(&RunningSum, initial);

        assert_eq!(values(last), vec![136.0, 203.0, 321.0]);
    }

    #[test]
    fn test_concat_features() {
        let (batch, order) = fixture();
        let packed = PackedSequence::pack(batch, &order).unwrap();

        let doubled = packed.clone().map_data(|data| data * 2.0);
        let joined = PackedSequence::concat_features(packed, doubled);

        assert_eq!(joined.features(), 2);
        assert_eq!(values(joined.step(2)), vec![13.0, 26.0]);
    }

    #[test]
    fn test_pack_rejects_mismatched_order() {
        let (batch, _) = fixture();
        let order = SortOrder::descending(&[1, 1]);

        assert!(matches!(
            PackedSequence::pack(batch, &order),
            Err(EncoderError::ShapeMismatch(_))
        ));
    }
}
