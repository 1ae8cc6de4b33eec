//! Question/answer data pipeline
//!
//! Input directory layout:
//!
//! | File | Content |
//! |------|---------|
//! | `vocab.json` | `{"word_token_to_idx": {...}, "answer_token_to_idx": {...}}` |
//! | `train.jsonl` | one `{"question": [ids], "answer": id}` per line |
//! | `val.jsonl` | same format as `train.jsonl` |
//!
//! Word index [`PAD_INDEX`] is reserved for padding. Batches are padded to
//! their own longest question and carry the true lengths alongside.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Word index used for padding positions
pub const PAD_INDEX: usize = 0;

/// Token-to-index tables for questions and answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocab {
    pub word_token_to_idx: HashMap<String, usize>,
    pub answer_token_to_idx: HashMap<String, usize>,
}

impl Vocab {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read vocabulary '{}'", path.display()))?;
        let vocab: Vocab = serde_json::from_str(&json)
            .with_context(|| format!("Malformed vocabulary '{}'", path.display()))?;

        ensure!(
            vocab.num_words() > PAD_INDEX + 1,
            "Vocabulary '{}' has no words besides padding",
            path.display()
        );
        ensure!(
            vocab.num_answers() > 0,
            "Vocabulary '{}' has no answers",
            path.display()
        );
        Ok(vocab)
    }

    /// Embedding table size: one past the largest word index
    pub fn num_words(&self) -> usize {
        table_size(&self.word_token_to_idx)
    }

    /// Number of answer classes: one past the largest answer index
    pub fn num_answers(&self) -> usize {
        table_size(&self.answer_token_to_idx)
    }
}

fn table_size(table: &HashMap<String, usize>) -> usize {
    table.values().max().map_or(0, |&max| max + 1)
}

/// One encoded question and its answer class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSample {
    pub question: Vec<usize>,
    pub answer: usize,
}

impl QuestionSample {
    /// Reject empty questions and indices outside the vocabulary or answer set
    pub fn validate(&self, vocab: &Vocab) -> Result<()> {
        ensure!(!self.question.is_empty(), "question is empty");

        let num_words = vocab.num_words();
        if let Some(&token) = self.question.iter().find(|&&t| t >= num_words) {
            bail!("word index {token} is outside the vocabulary of {num_words}");
        }

        let num_answers = vocab.num_answers();
        ensure!(
            self.answer < num_answers,
            "answer index {} is outside the {num_answers} answer classes",
            self.answer
        );
        Ok(())
    }
}

/// In-memory dataset of validated question samples
#[derive(Debug, Clone, Default)]
pub struct QuestionDataset {
    samples: Vec<QuestionSample>,
}

impl QuestionDataset {
    pub fn new(samples: Vec<QuestionSample>) -> Self {
        Self { samples }
    }

    /// Read a JSON-lines file, validating every sample against `vocab`
    ///
    /// Blank lines are skipped. Errors name the offending line.
    pub fn load(path: &Path, vocab: &Vocab) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read samples '{}'", path.display()))?;

        let mut samples = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let location = || format!("{}:{}", path.display(), index + 1);

            let sample: QuestionSample =
                serde_json::from_str(line).with_context(|| format!("{}: malformed sample", location()))?;
            sample.validate(vocab).with_context(location)?;
            samples.push(sample);
        }

        tracing::debug!("Loaded {} samples from '{}'", samples.len(), path.display());
        Ok(Self { samples })
    }
}

impl Dataset<QuestionSample> for QuestionDataset {
    fn get(&self, index: usize) -> Option<QuestionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A padded batch of questions
#[derive(Debug, Clone)]
pub struct QuestionBatch<B: Backend> {
    /// Word indices `[batch, max_len]`, [`PAD_INDEX`] past each length
    pub tokens: Tensor<B, 2, Int>,
    /// True question lengths, one per row
    pub lengths: Vec<usize>,
    /// Answer classes `[batch]`
    pub answers: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct QuestionBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> QuestionBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<QuestionSample, QuestionBatch<B>> for QuestionBatcher<B> {
    fn batch(&self, items: Vec<QuestionSample>) -> QuestionBatch<B> {
        let batch_size = items.len();
        let lengths: Vec<usize> = items.iter().map(|s| s.question.len()).collect();
        let max_len = lengths.iter().copied().max().unwrap_or(0);

        let mut padded = Array2::from_elem((batch_size, max_len), PAD_INDEX as i32);
        for (row, sample) in items.iter().enumerate() {
            for (t, &token) in sample.question.iter().enumerate() {
                padded[[row, t]] = token as i32;
            }
        }

        // Array2::from_elem is row-major, so iteration order is [row][t]
        let flat: Vec<i32> = padded.iter().copied().collect();
        let answers: Vec<i32> = items.iter().map(|s| s.answer as i32).collect();

        let tokens = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, max_len]);
        let answers = Tensor::<B, 1, Int>::from_ints(answers.as_slice(), &self.device);

        QuestionBatch {
            tokens,
            lengths,
            answers,
        }
    }
}
