//! Classification pipeline: embed, pair with capped vehicle-count labels, split, train, evaluate.

use anyhow::Context;
use crashcount_ai::{
    LabeledExample, LogisticRegressionTrainer, MulticlassMetrics, NearestCentroidTrainer, Trainer,
    build_examples, evaluate, train_test_split,
};

use crate::embed;
use crate::{ClassifierKind, ClassifyArgs};

pub fn run_classify(args: &ClassifyArgs) -> anyhow::Result<MulticlassMetrics> {
    let output = embed::run_embed_pipeline(&args.embed)?;

    let examples = build_examples(&output.records, &output.embeddings)
        .context("pairing records with embeddings")?;
    let (train, test) = train_test_split(examples, args.test_fraction, args.seed)
        .context("splitting examples")?;
    eprintln!("  Training on {} examples, testing on {}", train.len(), test.len());

    match args.classifier {
        ClassifierKind::Logistic => {
            let trainer = LogisticRegressionTrainer {
                alpha: args.l2_penalty,
            };
            train_and_evaluate(&trainer, &train, &test)
        }
        ClassifierKind::Centroid => {
            let trainer = NearestCentroidTrainer {
                temperature: args.softmax_temperature,
            };
            train_and_evaluate(&trainer, &train, &test)
        }
    }
}

fn train_and_evaluate<T: Trainer>(
    trainer: &T,
    train: &[LabeledExample],
    test: &[LabeledExample],
) -> anyhow::Result<MulticlassMetrics> {
    let model = trainer.fit(train).context("training classifier")?;
    evaluate(&model, test).context("evaluating classifier")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(label: &str, features: &[f32]) -> LabeledExample {
        LabeledExample {
            label: label.to_string(),
            features: features.to_vec(),
        }
    }

    #[test]
    fn both_trainers_score_separable_examples() {
        let train = [
            example("1", &[1.0, 0.0]),
            example("1", &[0.9, 0.1]),
            example("2", &[0.0, 1.0]),
            example("2", &[0.1, 0.9]),
        ];
        let test = [example("1", &[1.0, 0.1]), example("2", &[0.1, 1.0])];

        let logistic = train_and_evaluate(&LogisticRegressionTrainer::default(), &train, &test).unwrap();
        assert_eq!(logistic.micro_accuracy, 1.0);

        let centroid = train_and_evaluate(&NearestCentroidTrainer::default(), &train, &test).unwrap();
        assert_eq!(centroid.micro_accuracy, 1.0);
    }

    #[test]
    fn invalid_temperature_is_reported() {
        let train = [example("1", &[1.0, 0.0]), example("2", &[0.0, 1.0])];
        let err = train_and_evaluate(&NearestCentroidTrainer { temperature: 0.0 }, &train, &train)
            .unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("training classifier"), "{chain}");
        assert!(chain.contains("temperature"), "{chain}");
    }
}
