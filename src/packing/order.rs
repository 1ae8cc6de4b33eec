use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

/// Descending-by-length reordering of a batch and its inverse.
///
/// The sort is stable, so sequences of equal length keep their relative
/// order and an already-sorted batch yields the identity permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    sorted_lengths: Vec<usize>,
    /// Position `k` of the sorted batch holds original row `sorted_indices[k]`
    sorted_indices: Vec<usize>,
    /// Original row `i` sits at position `unsorted_indices[i]` of the sorted batch
    unsorted_indices: Vec<usize>,
}

impl SortOrder {
    /// Compute the permutation that sorts `lengths` in non-increasing order
    pub fn descending(lengths: &[usize]) -> Self {
        let mut sorted_indices: Vec<usize> = (0..lengths.len()).collect();
        sorted_indices.sort_by(|&a, &b| lengths[b].cmp(&lengths[a]));

        let sorted_lengths = sorted_indices.iter().map(|&i| lengths[i]).collect();

        let mut unsorted_indices = vec![0; lengths.len()];
        for (position, &original) in sorted_indices.iter().enumerate() {
            unsorted_indices[original] = position;
        }

        Self {
            sorted_lengths,
            sorted_indices,
            unsorted_indices,
        }
    }

    /// Number of sequences covered by this order
    pub fn len(&self) -> usize {
        self.sorted_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_indices.is_empty()
    }

    /// Lengths in sorted (non-increasing) order
    pub fn sorted_lengths(&self) -> &[usize] {
        &self.sorted_lengths
    }

    pub fn sorted_indices(&self) -> &[usize] {
        &self.sorted_indices
    }

    pub fn unsorted_indices(&self) -> &[usize] {
        &self.unsorted_indices
    }

    /// True when sorting leaves the batch untouched
    pub fn is_identity(&self) -> bool {
        self.sorted_indices
            .iter()
            .enumerate()
            .all(|(position, &original)| position == original)
    }

    /// Reorder `tensor` along `dim` into sorted order
    pub fn sort<B: Backend, const D: usize>(&self, tensor: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
        self.gather(tensor, dim, &self.sorted_indices)
    }

    /// Reorder `tensor` along `dim` from sorted order back to the caller's order
    pub fn restore<B: Backend, const D: usize>(
        &self,
        tensor: Tensor<B, D>,
        dim: usize,
    ) -> Tensor<B, D> {
        self.gather(tensor, dim, &self.unsorted_indices)
    }

    fn gather<B: Backend, const D: usize>(
        &self,
        tensor: Tensor<B, D>,
        dim: usize,
        indices: &[usize],
    ) -> Tensor<B, D> {
        if self.is_identity() {
            return tensor;
        }

        let device = tensor.device();
        let indices: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
        let indices = Tensor::<B, 1, Int>::from_ints(indices.as_slice(), &device);
        tensor.select(dim, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_descending_order() {
        let order = SortOrder::descending(&[2, 5, 1, 4]);

        assert_eq!(order.sorted_lengths(), &[5, 4, 2, 1]);
        assert_eq!(order.sorted_indices(), &[1, 3, 0, 2]);
        assert_eq!(order.unsorted_indices(), &[2, 0, 3, 1]);
        assert!(!order.is_identity());
    }

    #[test]
    fn test_ties_are_stable() {
        let order = SortOrder::descending(&[3, 1, 3, 1, 3]);

        assert_eq!(order.sorted_indices(), &[0, 2, 4, 1, 3]);
    }

    #[test]
    fn test_equal_lengths_are_identity() {
        let order = SortOrder::descending(&[4, 4, 4]);

        assert!(order.is_identity());
        assert_eq!(order.unsorted_indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_inverse_composes_to_identity() {
        let order = SortOrder::descending(&[1, 7, 3, 3, 9, 2]);

        for (original, &position) in order.unsorted_indices().iter().enumerate() {
            assert_eq!(order.sorted_indices()[position], original);
        }
    }

    #[test]
    fn test_sort_then_restore() {
        let device = Default::default();
        let order = SortOrder::descending(&[1, 3, 2]);

        let tensor = Tensor::<TestBackend, 2>::from_floats([[1.0, 1.0], [3.0, 3.0], [2.0, 2.0]], &device);

        let sorted = order.sort(tensor.clone(), 0);
        let values = sorted.clone().into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![3.0, 3.0, 2.0, 2.0, 1.0, 1.0]);

        let restored = order.restore(sorted, 0);
        let diff: f32 = (restored - tensor).abs().max().into_scalar();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_sort_along_batch_axis_of_hidden_state() {
        let device = Default::default();
        let order = SortOrder::descending(&[1, 2]);

        // [layers=2, batch=2, hidden=1]
        let hidden =
            Tensor::<TestBackend, 3>::from_floats([[[10.0], [20.0]], [[30.0], [40.0]]], &device);

        let sorted = order.sort(hidden, 1);
        let values = sorted.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![20.0, 10.0, 40.0, 30.0]);
    }
}
