//! Filesystem loader for the curated example pool
//!
//! The pool file is JSONL: one `{"context": ..., "tweet": ...}` object per
//! line. Blank lines are skipped; a malformed line is an error with its
//! line number rather than a silent drop.

use serde::Deserialize;
use std::path::Path;
use tweetsmith_domain::usecases::StaticPool;

#[derive(Debug, thiserror::Error)]
pub enum ExamplesError {
    #[error("Failed to read examples file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid example on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct ExampleLine {
    context: String,
    tweet: String,
}

/// Load the curated example pool from a JSONL file, grouped by context
pub fn load_static_pool(path: impl AsRef<Path>) -> Result<StaticPool, ExamplesError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ExamplesError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut pool = StaticPool::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let example: ExampleLine =
            serde_json::from_str(line).map_err(|source| ExamplesError::Parse {
                line: idx + 1,
                source,
            })?;

        pool.entry(example.context)
            .or_insert_with(Vec::new)
            .push(example.tweet);
    }

    Ok(pool)
}
