//! Embedding Store: one `;`-delimited row of `x_1..x_768` per record.
//!
//! Rows carry no key. Row `i` belongs to record `i` of the dataset the file
//! was built from, so callers must load records in the same order.

use std::path::Path;

use crashcount_core::{CaseRecord, EMBEDDING_DIM, nmvccs};
use tracing::info;

use crate::StoreError;
use crate::delimited::{SaveOutcome, already_written, open_reader, parse_field, write_table};

/// Header columns `x_1..x_{dim}`.
pub fn embedding_header(dim: usize) -> Vec<String> {
    (1..=dim).map(|i| format!("x_{i}")).collect()
}

/// Write embeddings to `path` unless the file already exists.
///
/// # Panics
///
/// Panics if any embedding is not exactly [`EMBEDDING_DIM`] wide.
pub fn save_embeddings(path: &Path, embeddings: &[Vec<f32>]) -> Result<SaveOutcome, StoreError> {
    if already_written(path) {
        return Ok(SaveOutcome::Skipped);
    }

    for (i, embedding) in embeddings.iter().enumerate() {
        assert_eq!(
            embedding.len(),
            EMBEDDING_DIM,
            "embedding {i} has {} components, expected {EMBEDDING_DIM}",
            embedding.len()
        );
    }

    let rows = write_table(
        path,
        embedding_header(EMBEDDING_DIM),
        embeddings
            .iter()
            .map(|embedding| Ok(embedding.iter().map(|v| v.to_string()))),
    )?;

    info!(rows, path = %path.display(), "saved embeddings");
    Ok(SaveOutcome::Written(rows))
}

/// Read every embedding row from `path`, discarding the header.
pub fn load_embeddings(path: &Path) -> Result<Vec<Vec<f32>>, StoreError> {
    let mut reader = open_reader(path)?;
    let mut embeddings = Vec::new();

    for result in reader.records() {
        let record = result?;
        let embedding = (0..record.len())
            .map(|i| parse_field::<f32>(&record, i, &format!("x_{}", i + 1)))
            .collect::<Result<Vec<f32>, _>>()?;
        embeddings.push(embedding);
    }

    info!(rows = embeddings.len(), path = %path.display(), "loaded embeddings");
    Ok(embeddings)
}

/// Write the numeric case fields that sit alongside the embedding file.
///
/// Same row order as the embeddings; null values become empty fields.
pub fn save_case_table(path: &Path, cases: &[CaseRecord]) -> Result<SaveOutcome, StoreError> {
    if already_written(path) {
        return Ok(SaveOutcome::Skipped);
    }

    let rows = write_table(
        path,
        nmvccs::table_columns(),
        cases.iter().map(|case| {
            Ok(case
                .table_values()
                .into_iter()
                .map(|v| v.map(|n| n.to_string()).unwrap_or_default()))
        }),
    )?;

    info!(rows, path = %path.display(), "saved case table");
    Ok(SaveOutcome::Written(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn embedding(seed: f32) -> Vec<f32> {
        (0..EMBEDDING_DIM)
            .map(|j| seed * 0.001 * j as f32 - 0.25)
            .collect()
    }

    #[test]
    fn header_names_columns_from_one() {
        let header = embedding_header(3);
        assert_eq!(header, vec!["x_1", "x_2", "x_3"]);
        assert_eq!(embedding_header(EMBEDDING_DIM).last().unwrap(), "x_768");
    }

    #[test]
    fn save_then_load_recovers_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.csv");
        let embeddings = vec![embedding(1.0), embedding(-3.7), vec![1.0e-7; EMBEDDING_DIM]];

        let outcome = save_embeddings(&path, &embeddings).unwrap();
        assert_eq!(outcome, SaveOutcome::Written(3));

        let loaded = load_embeddings(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        for (a, b) in embeddings.iter().zip(&loaded) {
            assert_eq!(b.len(), EMBEDDING_DIM);
            for (x, y) in a.iter().zip(b) {
                assert!((x - y).abs() <= f32::EPSILON * x.abs().max(1.0));
            }
        }
    }

    #[test]
    fn file_layout_is_semicolon_delimited() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.csv");
        let mut e = vec![0.0f32; EMBEDDING_DIM];
        e[0] = 0.5;
        e[1] = -1.25;
        save_embeddings(&path, &[e]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("x_1;x_2;x_3;"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("0.5;-1.25;0;"), "row was {row}");
        assert_eq!(row.split(';').count(), EMBEDDING_DIM);
        assert!(lines.next().is_none());
    }

    #[test]
    fn save_skips_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.csv");

        save_embeddings(&path, &[embedding(1.0)]).unwrap();
        let before = std::fs::read(&path).unwrap();

        let outcome = save_embeddings(&path, &[embedding(2.0), embedding(3.0)]).unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    #[should_panic(expected = "expected 768")]
    fn save_rejects_wrong_width() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.csv");
        let _ = save_embeddings(&path, &[vec![0.0; 4]]);
    }

    #[test]
    fn load_reports_bad_field() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.csv");
        std::fs::write(&path, "x_1;x_2\n0.5;0.25\n0.1;0,3\n").unwrap();

        let err = load_embeddings(&path).unwrap_err();
        match err {
            StoreError::Parse {
                line,
                column,
                value,
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, "x_2");
                assert_eq!(value, "0,3");
            }
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn load_empty_file_body() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.csv");
        std::fs::write(&path, "x_1;x_2\n").unwrap();
        assert!(load_embeddings(&path).unwrap().is_empty());
    }

    #[test]
    fn case_table_writes_nulls_as_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cases.csv");
        let case = CaseRecord {
            level_0: Some(0),
            index: Some(7),
            scase_id: Some(42),
            numtotv: Some(2),
            injsev_b: Some(3),
            ..Default::default()
        };

        assert_eq!(save_case_table(&path, &[case]).unwrap(), SaveOutcome::Written(1));
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "level_0;index;SCASEID;NUMTOTV;WEATHER1;WEATHER2;WEATHER3;WEATHER4;\
             WEATHER5;WEATHER6;WEATHER7;WEATHER8;INJSEVA;INJSEVB"
        );
        assert_eq!(lines[1], "0;7;42;2;;;;;;;;;;3");

        assert_eq!(save_case_table(&path, &[]).unwrap(), SaveOutcome::Skipped);
    }
}
