//! Epoch-based step decay of the learning rate

/// Multiplies the base learning rate by `gamma` once per milestone reached
///
/// After `epoch` calls to [`step`](Self::step) the rate is
/// `base_lr * gamma^k`, where `k` counts milestones `<= epoch`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiStepLr {
    base_lr: f64,
    milestones: Vec<usize>,
    gamma: f64,
    epoch: usize,
}

impl MultiStepLr {
    pub fn new(base_lr: f64, mut milestones: Vec<usize>, gamma: f64) -> Self {
        milestones.sort_unstable();
        Self {
            base_lr,
            milestones,
            gamma,
            epoch: 0,
        }
    }

    /// Learning rate for the current epoch
    pub fn lr(&self) -> f64 {
        let reached = self.milestones.iter().filter(|&&m| m <= self.epoch).count();
        self.base_lr * self.gamma.powi(reached as i32)
    }

    /// Advance one epoch and return the new rate
    pub fn step(&mut self) -> f64 {
        self.epoch += 1;
        self.lr()
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }
}
