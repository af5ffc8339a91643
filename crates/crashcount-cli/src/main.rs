mod classify;
mod count;
mod display;
mod embed;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crashcount_ai::PoolingStrategy;
use crashcount_core::{MAX_SEQUENCE_LENGTH, TargetModel, nmvccs};

#[derive(Parser, Debug)]
#[command(name = "crashcount", version, about = "Vehicle counts from accident-report narratives")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed every report summary and write the embedding and case tables
    Embed(EmbedArgs),
    /// Embed, then train and evaluate a vehicle-count classifier
    Classify(ClassifyArgs),
    /// Ask a local LLM for each report's vehicle count and compare with ground truth
    Count(CountArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Accident-report Parquet file
    #[arg(
        long,
        env = "CRASHCOUNT_DATA",
        value_name = "PATH",
        default_value = "NHTSA_NMVCCS_extract.parquet.gzip"
    )]
    data: PathBuf,

    /// Column holding the narrative text
    #[arg(long, env = "CRASHCOUNT_SUMMARY_COLUMN", default_value = nmvccs::SUMMARY_EN)]
    summary_column: String,
}

#[derive(Args, Debug)]
struct EmbedArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Directory holding model.onnx and tokenizer.json
    #[arg(
        long,
        env = "CRASHCOUNT_MODEL_DIR",
        value_name = "DIR",
        default_value = "models/distilbert-base-multilingual-cased"
    )]
    model_dir: PathBuf,

    /// Embedding table; reused as-is when it already exists
    #[arg(long, env = "CRASHCOUNT_EMBEDDINGS", value_name = "PATH", default_value = "embeddings.csv")]
    embeddings: PathBuf,

    /// Numeric case table written next to the embeddings
    #[arg(long, env = "CRASHCOUNT_CASE_TABLE", value_name = "PATH", default_value = "cases.csv")]
    case_table: PathBuf,

    /// Tokens per sequence after truncation or padding
    #[arg(long, env = "CRASHCOUNT_MAX_LENGTH", default_value_t = MAX_SEQUENCE_LENGTH)]
    max_length: usize,

    /// Pooling over token states: mean or first
    #[arg(long, env = "CRASHCOUNT_POOLING", default_value = "mean")]
    pooling: PoolingStrategy,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    #[command(flatten)]
    embed: EmbedArgs,

    /// Share of examples held out for evaluation
    #[arg(long, env = "CRASHCOUNT_TEST_FRACTION", default_value_t = 0.2)]
    test_fraction: f64,

    /// Seed for the train/test shuffle
    #[arg(long, env = "CRASHCOUNT_SEED", default_value_t = 1337)]
    seed: u64,

    /// Classifier to train
    #[arg(long, env = "CRASHCOUNT_CLASSIFIER", value_enum, default_value_t = ClassifierKind::Logistic)]
    classifier: ClassifierKind,

    /// L2 penalty for logistic regression
    #[arg(long, env = "CRASHCOUNT_L2_PENALTY", default_value_t = 1.0)]
    l2_penalty: f64,

    /// Softmax temperature for nearest-centroid class probabilities
    #[arg(long, env = "CRASHCOUNT_SOFTMAX_TEMPERATURE", default_value_t = 0.05)]
    softmax_temperature: f32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ClassifierKind {
    /// Multinomial logistic regression
    Logistic,
    /// Cosine nearest-centroid
    Centroid,
}

#[derive(Args, Debug)]
struct CountArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Model id or cache suffix, e.g. gemma-3-12b or qwen/qwen3-8b
    #[arg(long, env = "CRASHCOUNT_MODEL", default_value = "gemma-3-12b")]
    model: TargetModel,

    /// Directory of per-model result caches
    #[arg(long, env = "CRASHCOUNT_CACHE_DIR", value_name = "DIR", default_value = ".")]
    cache_dir: PathBuf,

    /// Chat-completions URL
    #[arg(
        long,
        env = "CRASHCOUNT_ENDPOINT",
        default_value = "http://localhost:1234/v1/chat/completions"
    )]
    endpoint: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "CRASHCOUNT_TIMEOUT_SECS", default_value_t = 300)]
    timeout_secs: u64,

    #[arg(long, env = "CRASHCOUNT_LLM_TEMPERATURE", default_value_t = 0.2)]
    temperature: f64,

    /// Generation cap; -1 for none
    #[arg(long, env = "CRASHCOUNT_MAX_TOKENS", default_value_t = -1, allow_negative_numbers = true)]
    max_tokens: i64,

    /// Only count a seeded random sample of this many records
    #[arg(long, env = "CRASHCOUNT_SAMPLE", value_name = "N")]
    sample: Option<usize>,

    /// Seed for --sample
    #[arg(long, env = "CRASHCOUNT_SEED", default_value_t = 1337)]
    seed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("crashcount v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Embed(args) => {
            let output = embed::run_embed_pipeline(&args)?;
            eprintln!(
                "  {} records, {} embeddings ({:.1}s)",
                output.records.len(),
                output.embeddings.len(),
                output.elapsed_secs
            );
        }
        Command::Classify(args) => {
            let metrics = classify::run_classify(&args)?;
            print!("{}", display::MetricsReport(&metrics));
        }
        Command::Count(args) => {
            let results = count::run_count(&args).await?;
            let report = crashcount_llm::AgreementReport::from_results(&results);
            print!(
                "{}",
                display::AgreementSummary {
                    model: args.model,
                    report: &report,
                }
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_defaults() {
        let cli = Cli::try_parse_from(["crashcount", "embed"]).unwrap();
        let Command::Embed(args) = cli.command else {
            panic!("expected embed");
        };
        assert_eq!(args.input.summary_column, "SUMMARY_EN");
        assert_eq!(args.max_length, 512);
        assert_eq!(args.pooling, PoolingStrategy::Mean);
        assert_eq!(args.embeddings, PathBuf::from("embeddings.csv"));
    }

    #[test]
    fn classify_options() {
        let cli = Cli::try_parse_from([
            "crashcount",
            "classify",
            "--pooling",
            "first",
            "--summary-column",
            "SUMMARY_GE",
            "--test-fraction",
            "0.3",
        ])
        .unwrap();
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.embed.pooling, PoolingStrategy::First);
        assert_eq!(args.embed.input.summary_column, "SUMMARY_GE");
        assert_eq!(args.test_fraction, 0.3);
        assert_eq!(args.seed, 1337);
        assert_eq!(args.classifier, ClassifierKind::Logistic);
        assert_eq!(args.l2_penalty, 1.0);
    }

    #[test]
    fn classify_centroid_option() {
        let cli = Cli::try_parse_from([
            "crashcount",
            "classify",
            "--classifier",
            "centroid",
            "--softmax-temperature",
            "0.1",
        ])
        .unwrap();
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.classifier, ClassifierKind::Centroid);
        assert_eq!(args.softmax_temperature, 0.1);

        assert!(Cli::try_parse_from(["crashcount", "classify", "--classifier", "svm"]).is_err());
    }

    #[test]
    fn count_defaults_and_model_aliases() {
        let cli = Cli::try_parse_from(["crashcount", "count"]).unwrap();
        let Command::Count(args) = cli.command else {
            panic!("expected count");
        };
        assert_eq!(args.model, TargetModel::Gemma3_12b);
        assert_eq!(args.max_tokens, -1);
        assert_eq!(args.timeout_secs, 300);
        assert!(args.sample.is_none());

        let cli = Cli::try_parse_from([
            "crashcount",
            "count",
            "--model",
            "qwen/qwen3-8b",
            "--max-tokens",
            "-1",
            "--sample",
            "25",
        ])
        .unwrap();
        let Command::Count(args) = cli.command else {
            panic!("expected count");
        };
        assert_eq!(args.model, TargetModel::Qwen3_8b);
        assert_eq!(args.sample, Some(25));
    }

    #[test]
    fn unknown_model_and_pooling_are_rejected() {
        assert!(Cli::try_parse_from(["crashcount", "count", "--model", "gpt-4"]).is_err());
        assert!(Cli::try_parse_from(["crashcount", "embed", "--pooling", "max"]).is_err());
    }
}
