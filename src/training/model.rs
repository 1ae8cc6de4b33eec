//! Question classifier built on the variable-length encoders
//!
//! ```text
//! tokens [batch, max_len]
//!   → embedding [batch, max_len, dim_word] → word dropout
//!   → Gru / BiGru (pooled) [batch, dim_hidden]
//!   → Linear(dim_hidden, dim_classifier) → ReLU → Linear(dim_classifier, num_classes)
//! ```

use burn::config::Config;
use burn::module::Module;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::{activation, ElementConversion, Int, Tensor};

use super::data::QuestionBatch;
use crate::error::{self, EncoderError};
use crate::rnn::{BiGru, BiGruConfig, EncoderOutput, Gru, GruConfig};

/// Configuration for [`GruClassifier`]
#[derive(Config, Debug)]
pub struct GruClassifierConfig {
    /// Embedding table size
    pub num_words: usize,
    /// Number of answer classes
    pub num_classes: usize,
    pub dim_word: usize,
    /// Encoder output size; split across directions when bidirectional
    pub dim_hidden: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    /// Dropout between encoder layers
    #[config(default = 0.2)]
    pub dropout: f64,
    #[config(default = 0.3)]
    pub word_dropout: f64,
    /// Width of the hidden classifier layer
    #[config(default = 1024)]
    pub dim_classifier: usize,
    #[config(default = false)]
    pub bidirectional: bool,
}

impl GruClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<GruClassifier<B>> {
        if self.num_words == 0 || self.num_classes == 0 {
            return Err(EncoderError::config(format!(
                "classifier needs words and classes, got num_words={}, num_classes={}",
                self.num_words, self.num_classes
            )));
        }
        if !(0.0..1.0).contains(&self.word_dropout) {
            return Err(EncoderError::config(format!(
                "word dropout must lie in [0, 1), got {}",
                self.word_dropout
            )));
        }

        let (gru, bigru) = if self.bidirectional {
            let bigru = BiGruConfig::new(self.dim_word, self.dim_hidden)
                .with_num_layers(self.num_layers)
                .with_dropout(self.dropout)
                .init(device)?;
            (None, Some(bigru))
        } else {
            let gru = GruConfig::new(self.dim_word, self.dim_hidden)
                .with_num_layers(self.num_layers)
                .with_dropout(self.dropout)
                .init(device)?;
            (Some(gru), None)
        };

        Ok(GruClassifier {
            word_embeddings: EmbeddingConfig::new(self.num_words, self.dim_word).init(device),
            word_dropout: DropoutConfig::new(self.word_dropout).init(),
            gru,
            bigru,
            classifier_hidden: LinearConfig::new(self.dim_hidden, self.dim_classifier).init(device),
            classifier_output: LinearConfig::new(self.dim_classifier, self.num_classes).init(device),
        })
    }
}

/// Embedding, sentence encoder and two-layer MLP head
///
/// Exactly one of `gru` and `bigru` is present.
#[derive(Module, Debug)]
pub struct GruClassifier<B: Backend> {
    word_embeddings: Embedding<B>,
    word_dropout: Dropout,
    gru: Option<Gru<B>>,
    bigru: Option<BiGru<B>>,
    classifier_hidden: Linear<B>,
    classifier_output: Linear<B>,
}

/// Loss and predictions for one batch
#[derive(Debug, Clone)]
pub struct ClassificationOutput<B: Backend> {
    /// Mean cross-entropy, shape `[1]`
    pub loss: Tensor<B, 1>,
    /// `[batch, num_classes]`
    pub logits: Tensor<B, 2>,
    /// `[batch]`
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ClassificationOutput<B> {
    /// Rows whose argmax matches the target
    pub fn num_correct(&self) -> usize {
        count_correct(self.logits.clone(), self.targets.clone())
    }
}

impl<B: Backend> GruClassifier<B> {
    pub fn is_bidirectional(&self) -> bool {
        self.bigru.is_some()
    }

    /// Encode already-embedded questions with whichever encoder is present
    pub fn encode(&self, embedded: Tensor<B, 3>, lengths: &[usize]) -> error::Result<EncoderOutput<B>> {
        match (&self.gru, &self.bigru) {
            (Some(gru), _) => gru.encode(embedded, lengths, None),
            (None, Some(bigru)) => bigru.encode(embedded, lengths),
            (None, None) => Err(EncoderError::config("classifier has no encoder")),
        }
    }

    /// Class logits `[batch, num_classes]` for padded token ids
    pub fn forward(&self, tokens: Tensor<B, 2, Int>, lengths: &[usize]) -> error::Result<Tensor<B, 2>> {
        let embedded = self.word_dropout.forward(self.word_embeddings.forward(tokens));
        let encoded = self.encode(embedded, lengths)?;

        let hidden = activation::relu(self.classifier_hidden.forward(encoded.pooled));
        Ok(self.classifier_output.forward(hidden))
    }

    /// Forward pass plus cross-entropy against the batch answers
    pub fn forward_loss(&self, batch: QuestionBatch<B>) -> error::Result<ClassificationOutput<B>> {
        let logits = self.forward(batch.tokens, &batch.lengths)?;
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.answers.clone());

        Ok(ClassificationOutput {
            loss,
            logits,
            targets: batch.answers,
        })
    }
}

/// Count rows of `logits` whose argmax equals `targets`
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let [batch_size, _] = logits.dims();
    let predictions = logits.argmax(1).reshape([batch_size]);

    predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}
