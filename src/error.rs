// ⚠️ Error types - file-level ingestion, export and config failures
// Record-level problems are not errors: they become Rejections or quality issues

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn one input file into contact records.
///
/// These never abort a run; the pipeline records them per file and moves on.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {file} at line {line}: {source}")]
    Csv {
        file: String,
        line: usize,
        #[source]
        source: csv::Error,
    },

    #[error("{file} is empty")]
    EmptyFile { file: String },

    #[error("{file} has no recognized contact columns (headers: {headers})")]
    UnrecognizedLayout { file: String, headers: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workbook error")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
