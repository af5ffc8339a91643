//! LLM counting pipeline with a per-model result cache.

use std::time::Duration;

use anyhow::Context;
use crashcount_core::LanguageModelResult;
use crashcount_llm::{ClientConfig, CountClient};
use crashcount_store::ResultCache;

use crate::CountArgs;

/// Load the model's cached results, or query the LLM for every record and cache them.
pub async fn run_count(args: &CountArgs) -> anyhow::Result<Vec<LanguageModelResult>> {
    let cases = crashcount_store::read_case_records(&args.input.data)
        .with_context(|| format!("reading {}", args.input.data.display()))?;
    let mut records = crashcount_store::to_records(&cases, &args.input.summary_column)
        .context("extracting report summaries")?;
    if let Some(n) = args.sample {
        records = crashcount_llm::sample_records(&records, n, args.seed);
    }
    eprintln!("  {} records for {}", records.len(), args.model);

    let cache = ResultCache::new(&args.cache_dir);
    if cache.exists(args.model) {
        eprintln!("  Loading cached results from {}", cache.path(args.model).display());
        return cache
            .load(args.model)
            .with_context(|| format!("reading {}", cache.path(args.model).display()));
    }

    let client = CountClient::new(ClientConfig {
        endpoint: args.endpoint.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        temperature: args.temperature,
        max_tokens: args.max_tokens,
    })
    .context("building HTTP client")?;
    client.announce(args.model);

    let results = crashcount_llm::count_records(&client, args.model, &records, |done, total| {
        eprint!(
            "\r  Counted {done}/{total} ({:.1}%)",
            done as f64 / total as f64 * 100.0
        );
    })
    .await
    .context("querying LLM")?;
    eprintln!();

    cache
        .save(args.model, &results)
        .with_context(|| format!("writing {}", cache.path(args.model).display()))?;
    Ok(results)
}
