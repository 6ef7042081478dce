// Contact Dedup - Core Library
// Ingest CSV contact exports, merge duplicates, classify, export to Excel

pub mod contact;
pub mod parser;
pub mod deduplication;
pub mod classification;
pub mod resolver;
pub mod data_quality;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod pipeline;

// Re-export commonly used types
pub use contact::{ContactRecord, Confidence, Field};
pub use parser::{
    detect_layout, parse_file, read_source, sniff_delimiter,
    ParsedFile, Rejection, SourceFile, SourceLayout,
};
pub use deduplication::{
    DeduplicationEngine, DuplicateGroup, DuplicateMatch, MatchStrategy,
};
pub use classification::{Classification, DomainClassifier, DomainLists};
pub use resolver::{
    ContactResolver, FieldConflict, MergeDecision, MergedContact, Resolution,
};
pub use data_quality::{
    BatchSummary, DataQualityEngine, IngestCounts, QualityIssue, QualityReport,
    RunStatistics, Severity,
};
pub use config::Config;
pub use error::{ConfigError, ExportError, IngestError};
pub use export::{write_workbook, ExportSummary};
pub use pipeline::{process, run, FileOutcome, ProcessingReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
