//! Multiclass classification over sentence embeddings.
//!
//! Builds labelled examples from records and their embeddings, splits them
//! into train and test sets, and scores a trained [`Predictor`] with
//! accuracy, log-loss, and a confusion matrix. The default trainer is
//! multinomial logistic regression from `smartcore`; a nearest-centroid model
//! over cosine similarity is kept as a lightweight alternative.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crashcount_core::Record;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use tracing::info;

use crate::ClassifyError;

/// Highest label bucket; counts above it share the bucket.
const MAX_LABEL: i64 = 3;
/// Probability floor for log-loss.
const LOG_LOSS_EPSILON: f64 = 1e-15;

/// One training or test example.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub label: String,
    pub features: Vec<f32>,
}

/// Bucket a vehicle count: `"0"`, `"1"`, `"2"`, or `"3"` for three or more.
pub fn label_for_count(count: i64) -> String {
    count.min(MAX_LABEL).to_string()
}

/// Pair records with embeddings by position.
///
/// Row `i` of `embeddings` must be the embedding of `records[i]`.
pub fn build_examples(
    records: &[Record],
    embeddings: &[Vec<f32>],
) -> Result<Vec<LabeledExample>, ClassifyError> {
    if records.len() != embeddings.len() {
        return Err(ClassifyError::LengthMismatch {
            records: records.len(),
            embeddings: embeddings.len(),
        });
    }
    Ok(records
        .iter()
        .zip(embeddings)
        .map(|(record, embedding)| LabeledExample {
            label: label_for_count(record.vehicle_count),
            features: embedding.clone(),
        })
        .collect())
}

/// Seeded shuffle, then split into `(train, test)`.
///
/// The test set gets `n - round(n * (1 - test_fraction))` examples.
pub fn train_test_split(
    mut examples: Vec<LabeledExample>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<LabeledExample>, Vec<LabeledExample>), ClassifyError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ClassifyError::InvalidFraction(test_fraction));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    examples.shuffle(&mut rng);

    let train_len = (examples.len() as f64 * (1.0 - test_fraction)).round() as usize;
    let test = examples.split_off(train_len);
    info!(train = examples.len(), test = test.len(), seed, "split examples");
    Ok((examples, test))
}

// ── Trainer capability ──

/// Scored output for one feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Class probabilities, aligned with [`Predictor::labels`].
    pub scores: Vec<f32>,
}

impl Prediction {
    pub fn score_for(&self, labels: &[String], label: &str) -> Option<f32> {
        labels
            .iter()
            .position(|l| l == label)
            .and_then(|i| <[f32]>::get(&self.scores, i).copied())
    }
}

pub trait Trainer {
    type Model: Predictor;

    fn fit(&self, train: &[LabeledExample]) -> Result<Self::Model, ClassifyError>;
}

pub trait Predictor {
    /// Labels seen during training, in score order.
    fn labels(&self) -> &[String];

    fn predict(&self, features: &[f32]) -> Result<Prediction, ClassifyError>;

    fn transform(&self, examples: &[LabeledExample]) -> Result<Vec<Prediction>, ClassifyError> {
        examples.iter().map(|e| self.predict(&e.features)).collect()
    }
}

// ── Logistic regression ──

/// Multinomial logistic regression with an L2 penalty of `alpha`.
///
/// Two classes fit a single sigmoid; more fit one weight row per class.
#[derive(Debug, Clone, Copy)]
pub struct LogisticRegressionTrainer {
    pub alpha: f64,
}

impl Default for LogisticRegressionTrainer {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

type Classifier = LogisticRegression<f64, usize, DenseMatrix<f64>, Vec<usize>>;

#[derive(Debug)]
pub struct LogisticRegressionModel {
    labels: Vec<String>,
    classifier: Classifier,
    /// One row per decision function, `width` weights each.
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    width: usize,
}

impl Trainer for LogisticRegressionTrainer {
    type Model = LogisticRegressionModel;

    fn fit(&self, train: &[LabeledExample]) -> Result<LogisticRegressionModel, ClassifyError> {
        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return Err(ClassifyError::InvalidPenalty(self.alpha));
        }
        let width = train
            .first()
            .map(|e| e.features.len())
            .ok_or(ClassifyError::EmptyTrainingSet)?;

        let labels: Vec<String> = train
            .iter()
            .map(|e| e.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if labels.len() < 2 {
            return Err(ClassifyError::TooFewClasses(labels.len()));
        }

        let x = feature_matrix(width, train.iter().map(|e| e.features.as_slice()))?;
        let y: Vec<usize> = train
            .iter()
            .map(|e| labels.iter().position(|l| *l == e.label).unwrap_or(0))
            .collect();

        info!(
            classes = labels.len(),
            examples = train.len(),
            width,
            alpha = self.alpha,
            "training logistic regression"
        );
        let parameters = LogisticRegressionParameters::default().with_alpha(self.alpha);
        let classifier = Classifier::fit(&x, &y, parameters)
            .map_err(|e| ClassifyError::Model(e.to_string()))?;

        let coefficients = classifier.coefficients();
        let intercept = classifier.intercept();
        let (rows, cols) = coefficients.shape();
        let weights = (0..rows)
            .map(|r| (0..cols).map(|c| *coefficients.get((r, c))).collect())
            .collect();
        let intercepts = (0..rows).map(|r| *intercept.get((r, 0))).collect();

        Ok(LogisticRegressionModel {
            labels,
            classifier,
            weights,
            intercepts,
            width,
        })
    }
}

impl LogisticRegressionModel {
    /// Class probabilities in label order.
    fn probabilities(&self, features: &[f32]) -> Vec<f32> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| {
                w.iter()
                    .zip(features)
                    .map(|(w, &x)| w * f64::from(x))
                    .sum::<f64>()
                    + b
            })
            .collect();

        if let [z] = logits.as_slice() {
            let p = 1.0 / (1.0 + (-z).exp());
            return vec![(1.0 - p) as f32, p as f32];
        }
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| (e / sum) as f32).collect()
    }

    fn label(&self, class: usize) -> Result<String, ClassifyError> {
        self.labels
            .get(class)
            .cloned()
            .ok_or_else(|| ClassifyError::Model(format!("predicted unknown class {class}")))
    }
}

impl Predictor for LogisticRegressionModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, features: &[f32]) -> Result<Prediction, ClassifyError> {
        let x = feature_matrix(self.width, std::iter::once(features))?;
        let classes = self
            .classifier
            .predict(&x)
            .map_err(|e| ClassifyError::Model(e.to_string()))?;
        let class = classes.first().copied().unwrap_or(0);
        Ok(Prediction {
            label: self.label(class)?,
            scores: self.probabilities(features),
        })
    }

    fn transform(&self, examples: &[LabeledExample]) -> Result<Vec<Prediction>, ClassifyError> {
        if examples.is_empty() {
            return Ok(Vec::new());
        }
        let x = feature_matrix(self.width, examples.iter().map(|e| e.features.as_slice()))?;
        let classes = self
            .classifier
            .predict(&x)
            .map_err(|e| ClassifyError::Model(e.to_string()))?;

        examples
            .iter()
            .zip(classes)
            .map(|(example, class)| {
                Ok(Prediction {
                    label: self.label(class)?,
                    scores: self.probabilities(&example.features),
                })
            })
            .collect()
    }
}

/// Row-major `f64` matrix for smartcore; every row must be `width` wide.
fn feature_matrix<'a>(
    width: usize,
    rows: impl Iterator<Item = &'a [f32]>,
) -> Result<DenseMatrix<f64>, ClassifyError> {
    let rows = rows
        .map(|features| {
            check_width(width, features)?;
            Ok(features.iter().map(|&v| f64::from(v)).collect())
        })
        .collect::<Result<Vec<Vec<f64>>, ClassifyError>>()?;
    Ok(DenseMatrix::from_2d_vec(&rows))
}

// ── Nearest centroid ──

/// One L2-normalized mean centroid per label, scored by cosine similarity.
///
/// Similarities are turned into probabilities with a softmax at `temperature`;
/// lower temperatures give sharper distributions.
#[derive(Debug, Clone, Copy)]
pub struct NearestCentroidTrainer {
    pub temperature: f32,
}

impl Default for NearestCentroidTrainer {
    fn default() -> Self {
        Self { temperature: 0.05 }
    }
}

#[derive(Debug, Clone)]
pub struct NearestCentroidModel {
    labels: Vec<String>,
    centroids: Vec<Vec<f32>>,
    temperature: f32,
    width: usize,
}

impl Trainer for NearestCentroidTrainer {
    type Model = NearestCentroidModel;

    fn fit(&self, train: &[LabeledExample]) -> Result<NearestCentroidModel, ClassifyError> {
        if !(self.temperature > 0.0 && self.temperature.is_finite()) {
            return Err(ClassifyError::InvalidTemperature(self.temperature));
        }
        let width = train
            .first()
            .map(|e| e.features.len())
            .ok_or(ClassifyError::EmptyTrainingSet)?;

        let mut accum: BTreeMap<&str, (Vec<f32>, usize)> = BTreeMap::new();
        for example in train {
            check_width(width, &example.features)?;
            let entry = accum
                .entry(example.label.as_str())
                .or_insert_with(|| (vec![0.0f32; width], 0));
            for (acc, &val) in entry.0.iter_mut().zip(&example.features) {
                *acc += val;
            }
            entry.1 += 1;
        }

        let mut labels = Vec::with_capacity(accum.len());
        let mut centroids = Vec::with_capacity(accum.len());
        for (label, (mut sum, count)) in accum {
            for v in &mut sum {
                *v /= count as f32;
            }
            l2_normalize(&mut sum);
            labels.push(label.to_string());
            centroids.push(sum);
        }

        info!(classes = labels.len(), examples = train.len(), width, "trained nearest-centroid model");
        Ok(NearestCentroidModel {
            labels,
            centroids,
            temperature: self.temperature,
            width,
        })
    }
}

impl NearestCentroidModel {
    pub fn centroid(&self, label: &str) -> Option<&[f32]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.centroids[i].as_slice())
    }
}

impl Predictor for NearestCentroidModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, features: &[f32]) -> Result<Prediction, ClassifyError> {
        check_width(self.width, features)?;
        let mut query = features.to_vec();
        l2_normalize(&mut query);

        let similarities: Vec<f32> = self
            .centroids
            .iter()
            .map(|c| cosine_sim(&query, c))
            .collect();
        let scores = softmax(&similarities, self.temperature);

        let best = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);

        Ok(Prediction {
            label: self.labels[best].clone(),
            scores,
        })
    }
}

fn check_width(expected: usize, features: &[f32]) -> Result<(), ClassifyError> {
    if features.len() != expected {
        return Err(ClassifyError::WidthMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// L2-normalize a vector in place.
fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn softmax(values: &[f32], temperature: f32) -> Vec<f32> {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values
        .iter()
        .map(|v| ((v - max) / temperature).exp())
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

// ── Evaluation ──

#[derive(Debug, Clone, PartialEq)]
pub struct MulticlassMetrics {
    /// Fraction of test examples predicted correctly.
    pub micro_accuracy: f64,
    /// Mean per-class recall over classes present in the test set.
    pub macro_accuracy: f64,
    pub log_loss: f64,
    /// Relative improvement of `log_loss` over always predicting the test-set class prior.
    pub log_loss_reduction: f64,
    pub confusion: ConfusionMatrix,
}

/// Rows are actual labels, columns are predicted labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    fn new(labels: Vec<String>) -> Self {
        let n = labels.len();
        Self {
            labels,
            counts: vec![vec![0; n]; n],
        }
    }

    fn index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    fn record(&mut self, actual: &str, predicted: &str) {
        if let (Some(a), Some(p)) = (self.index(actual), self.index(predicted)) {
            self.counts[a][p] += 1;
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn count(&self, actual: &str, predicted: &str) -> usize {
        match (self.index(actual), self.index(predicted)) {
            (Some(a), Some(p)) => self.counts[a][p],
            _ => 0,
        }
    }

    /// Examples whose actual label is `label`.
    pub fn support(&self, label: &str) -> usize {
        self.index(label)
            .map(|a| self.counts[a].iter().sum())
            .unwrap_or(0)
    }

    pub fn precision(&self, label: &str) -> f64 {
        let Some(p) = self.index(label) else {
            return 0.0;
        };
        let predicted: usize = self.counts.iter().map(|row| row[p]).sum();
        ratio(self.counts[p][p], predicted)
    }

    pub fn recall(&self, label: &str) -> f64 {
        let Some(a) = self.index(label) else {
            return 0.0;
        };
        ratio(self.counts[a][a], self.counts[a].iter().sum())
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10}||", "PREDICTED")?;
        for label in &self.labels {
            write!(f, " {label:>6} |")?;
        }
        writeln!(f, " Recall")?;
        writeln!(f, "{:<10}||{}", "TRUTH", "=".repeat(9 * self.labels.len() + 7))?;

        for (a, label) in self.labels.iter().enumerate() {
            write!(f, "{label:>9} ||")?;
            for count in &self.counts[a] {
                write!(f, " {count:>6} |")?;
            }
            writeln!(f, " {:.4}", self.recall(label))?;
        }

        writeln!(f, "{}||{}", "=".repeat(10), "=".repeat(9 * self.labels.len()))?;
        write!(f, "{:<10}||", "Precision")?;
        for label in &self.labels {
            write!(f, " {:>6.4} |", self.precision(label))?;
        }
        Ok(())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Score `predictor` on `test`.
pub fn evaluate<P: Predictor>(
    predictor: &P,
    test: &[LabeledExample],
) -> Result<MulticlassMetrics, ClassifyError> {
    if test.is_empty() {
        return Err(ClassifyError::EmptyTestSet);
    }
    let predictions = predictor.transform(test)?;
    let n = test.len() as f64;

    let mut labels: Vec<String> = predictor.labels().to_vec();
    for example in test {
        if !labels.contains(&example.label) {
            labels.push(example.label.clone());
        }
    }
    labels.sort();
    let mut confusion = ConfusionMatrix::new(labels);

    let mut correct = 0usize;
    let mut log_loss = 0.0f64;
    let mut class_counts: BTreeMap<&str, usize> = BTreeMap::new();

    for (example, prediction) in test.iter().zip(&predictions) {
        confusion.record(&example.label, &prediction.label);
        if example.label == prediction.label {
            correct += 1;
        }
        let p = prediction
            .score_for(predictor.labels(), &example.label)
            .map(f64::from)
            .unwrap_or(0.0)
            .clamp(LOG_LOSS_EPSILON, 1.0);
        log_loss -= p.ln();
        *class_counts.entry(example.label.as_str()).or_default() += 1;
    }
    log_loss /= n;

    let micro_accuracy = correct as f64 / n;
    let macro_accuracy = class_counts
        .keys()
        .map(|label| confusion.recall(label))
        .sum::<f64>()
        / class_counts.len() as f64;

    let prior_log_loss: f64 = class_counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum();
    let log_loss_reduction = if prior_log_loss > 0.0 {
        (prior_log_loss - log_loss) / prior_log_loss
    } else {
        0.0
    };

    Ok(MulticlassMetrics {
        micro_accuracy,
        macro_accuracy,
        log_loss,
        log_loss_reduction,
        confusion,
    })
}
