//! Embedding pipeline: reads the Parquet extract, embeds every summary, writes `;`-delimited tables.

use std::time::Instant;

use anyhow::Context;
use crashcount_ai::{Embedder, EmbedderConfig};
use crashcount_core::{EMBEDDING_DIM, Record};
use crashcount_store::SaveOutcome;

use crate::EmbedArgs;

pub struct EmbedOutput {
    pub records: Vec<Record>,
    /// Row `i` belongs to `records[i]`.
    pub embeddings: Vec<Vec<f32>>,
    pub elapsed_secs: f64,
}

/// Read cases, then load the embedding table if it exists or compute and save it.
///
/// An existing embedding table is trusted as-is, even if it was produced from
/// different input.
pub fn run_embed_pipeline(args: &EmbedArgs) -> anyhow::Result<EmbedOutput> {
    let start = Instant::now();

    // 1. Read source Parquet.
    let cases = crashcount_store::read_case_records(&args.input.data)
        .with_context(|| format!("reading {}", args.input.data.display()))?;
    let records = crashcount_store::to_records(&cases, &args.input.summary_column)
        .context("extracting report summaries")?;
    eprintln!("  Read {} rows from {}", records.len(), args.input.data.display());

    // 2. Embeddings: cached table or a fresh run.
    let embeddings = if args.embeddings.exists() {
        eprintln!("  Loading embeddings from {}", args.embeddings.display());
        crashcount_store::load_embeddings(&args.embeddings)
            .with_context(|| format!("reading {}", args.embeddings.display()))?
    } else {
        let embeddings = compute_embeddings(args, &records)?;
        crashcount_store::save_embeddings(&args.embeddings, &embeddings)
            .with_context(|| format!("writing {}", args.embeddings.display()))?;
        eprintln!("  Saved embeddings to {}", args.embeddings.display());
        embeddings
    };

    // 3. Case table alongside.
    let outcome = crashcount_store::save_case_table(&args.case_table, &cases)
        .with_context(|| format!("writing {}", args.case_table.display()))?;
    if let SaveOutcome::Written(rows) = outcome {
        eprintln!("  Saved {rows} cases to {}", args.case_table.display());
    }

    if embeddings.len() != records.len() {
        tracing::warn!(
            records = records.len(),
            embeddings = embeddings.len(),
            "embedding table does not match the input row count"
        );
    }

    Ok(EmbedOutput {
        records,
        embeddings,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

fn compute_embeddings(args: &EmbedArgs, records: &[Record]) -> anyhow::Result<Vec<Vec<f32>>> {
    let config = EmbedderConfig {
        max_length: args.max_length,
        hidden_width: EMBEDDING_DIM,
        strategy: args.pooling,
    };
    let mut embedder = Embedder::load(&args.model_dir, config)
        .with_context(|| format!("loading encoder from {}", args.model_dir.display()))?;

    let sentences: Vec<&str> = records.iter().map(|r| r.summary.as_str()).collect();
    let embeddings = embedder
        .extract_all(&sentences, |done, total| {
            eprint!(
                "\r  Embedded {done}/{total} ({:.1}%)",
                done as f64 / total as f64 * 100.0
            );
        })
        .context("generating embeddings")?;
    eprintln!();
    Ok(embeddings)
}
