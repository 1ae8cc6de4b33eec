#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataloader::batcher::Batcher;
    use burn::optim::{AdamConfig, GradientsParams, Optimizer};
    use burn::tensor::backend::Backend as BurnBackend;
    use varlen_gru::training::*;

    type Backend = NdArray<f32>;
    type TrainBackend = Autodiff<Backend>;

    /// Writes a tiny dataset: the answer is 1 when the question mentions word 3
    fn write_dataset(dir: &Path) {
        let vocab = r#"{
            "word_token_to_idx": {"<PAD>": 0, "is": 1, "it": 2, "red": 3, "blue": 4},
            "answer_token_to_idx": {"no": 0, "yes": 1}
        }"#;
        fs::write(dir.join("vocab.json"), vocab).unwrap();

        let questions: [&[usize]; 8] = [
            &[1, 2, 3],
            &[1, 2, 4],
            &[3],
            &[4, 4],
            &[2, 1, 4, 3],
            &[2, 4, 1, 2, 4],
            &[3, 3],
            &[1],
        ];
        let lines: Vec<String> = questions
            .iter()
            .map(|q| {
                let answer = usize::from(q.contains(&3));
                serde_json::to_string(&QuestionSample { question: q.to_vec(), answer }).unwrap()
            })
            .collect();

        fs::write(dir.join("train.jsonl"), lines.join("\n")).unwrap();
        fs::write(dir.join("val.jsonl"), lines[..4].join("\n")).unwrap();
    }

    fn small_config(input_dir: &Path, save_dir: &Path) -> TrainConfig {
        TrainConfig {
            input_dir: input_dir.to_path_buf(),
            save_dir: save_dir.to_path_buf(),
            num_epoch: 2,
            batch_size: 3,
            dim_word: 6,
            dim_hidden: 8,
            milestones: vec![1],
            ..TrainConfig::default()
        }
    }

    fn run(config: TrainConfig) -> TrainingContext {
        let device = Default::default();
        let checkpoints = CheckpointManager::create(&config.save_dir).unwrap();
        let mut ctx = TrainingContext::new(config, checkpoints).unwrap();
        train::<TrainBackend>(&mut ctx, &device).unwrap();
        ctx
    }

    #[test]
    fn test_training_run_writes_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let save_dir = root.path().join("run");
        write_dataset(root.path());

        let ctx = run(small_config(root.path(), &save_dir));

        assert!(save_dir.join("train_config.json").exists());
        assert!(save_dir.join("classifier.json").exists());
        assert_eq!(ctx.scheduler.epoch(), 2);

        let csv = fs::read_to_string(save_dir.join("metrics.csv")).unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("1,"));
        assert!(rows[1].ends_with(",0.00100000"));
        assert!(rows[2].ends_with(",0.00010000"));
    }

    #[test]
    fn test_evaluate_reloads_saved_run() {
        let root = tempfile::tempdir().unwrap();
        let save_dir = root.path().join("run");
        write_dataset(root.path());

        run(TrainConfig {
            bidirectional: true,
            num_epoch: 1,
            ..small_config(root.path(), &save_dir)
        });

        let device = Default::default();
        let accuracy = evaluate::<Backend>(root.path(), &save_dir, &device).unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn test_evaluate_without_run_fails() {
        let root = tempfile::tempdir().unwrap();
        write_dataset(root.path());

        let device = Default::default();
        assert!(evaluate::<Backend>(root.path(), &root.path().join("missing"), &device).is_err());
    }

    #[test]
    fn test_checkpoint_roundtrip_preserves_predictions() {
        let root = tempfile::tempdir().unwrap();
        let device: <Backend as BurnBackend>::Device = Default::default();
        let checkpoints = CheckpointManager::create(root.path().join("run")).unwrap();

        let config = GruClassifierConfig::new(5, 2, 6, 8).with_dim_classifier(16);
        let model = config.init::<Backend>(&device).unwrap();
        checkpoints.save_model(&model).unwrap();

        let restored = checkpoints
            .load_model(config.init::<Backend>(&device).unwrap(), &device)
            .unwrap();

        let batch = QuestionBatcher::<Backend>::new(device).batch(vec![
            QuestionSample { question: vec![1, 2, 3], answer: 1 },
            QuestionSample { question: vec![4], answer: 0 },
        ]);
        let expected = model.forward(batch.tokens.clone(), &batch.lengths).unwrap();
        let actual = restored.forward(batch.tokens, &batch.lengths).unwrap();

        // weights are stored at half precision
        let diff: f32 = (expected - actual).abs().max().into_scalar();
        assert!(diff < 1e-2, "restored logits differ by {diff}");
    }

    #[test]
    fn test_optimizer_steps_reduce_loss() {
        let device = Default::default();
        let model_config = GruClassifierConfig::new(5, 2, 6, 8)
            .with_dim_classifier(16)
            .with_dropout(0.0)
            .with_word_dropout(0.0);
        let mut model = model_config.init::<TrainBackend>(&device).unwrap();
        let mut optim = AdamConfig::new().init();

        let batcher = QuestionBatcher::<TrainBackend>::new(device);
        let samples = vec![
            QuestionSample { question: vec![1, 3], answer: 1 },
            QuestionSample { question: vec![2, 4, 4], answer: 0 },
            QuestionSample { question: vec![3], answer: 1 },
            QuestionSample { question: vec![4], answer: 0 },
        ];

        let initial: f32 = model.forward_loss(batcher.batch(samples.clone())).unwrap().loss.into_scalar();
        for _ in 0..20 {
            let output = model.forward_loss(batcher.batch(samples.clone())).unwrap();
            let grads = GradientsParams::from_grads(output.loss.backward(), &model);
            model = optim.step(1e-2, model, grads);
        }
        let trained: f32 = model.forward_loss(batcher.batch(samples)).unwrap().loss.into_scalar();

        assert!(trained < initial, "loss went from {initial} to {trained}");
    }
}
