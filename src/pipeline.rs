// 🔄 Pipeline - discover → ingest → resolve → assess → export
// Per-file failures are recorded and skipped; only an empty result is fatal

use crate::config::Config;
use crate::contact::ContactRecord;
use crate::data_quality::{IngestCounts, QualityReport, RunStatistics};
use crate::export::{write_workbook, ExportSummary};
use crate::parser::{parse_file, Rejection, SourceLayout};
use crate::resolver::{ContactResolver, Resolution};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ============================================================================
// REPORT TYPES
// ============================================================================

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub file: String,
    pub layout: Option<SourceLayout>,
    pub encoding: Option<String>,
    pub rows_read: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn is_loaded(&self) -> bool {
        self.error.is_none()
    }
}

/// Records gathered from all files, in input order
#[derive(Debug, Clone, Default)]
pub struct Ingestion {
    pub records: Vec<ContactRecord>,
    pub files: Vec<FileOutcome>,
    pub rejections: Vec<Rejection>,
}

impl Ingestion {
    pub fn counts(&self) -> IngestCounts {
        IngestCounts {
            files_found: self.files.len(),
            files_loaded: self.files.iter().filter(|f| f.is_loaded()).count(),
            files_failed: self.files.iter().filter(|f| !f.is_loaded()).count(),
            records_read: self.files.iter().map(|f| f.rows_read).sum(),
            records_rejected: self.rejections.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_dir: PathBuf,
    pub files: Vec<FileOutcome>,
    pub rejections: Vec<Rejection>,
    pub resolution: Resolution,
    pub quality_reports: Vec<QualityReport>,
    pub stats: RunStatistics,
}

/// One row of the Processing_Log sheet
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub event: &'static str,
    pub subject: String,
    pub details: String,
}

impl ProcessingReport {
    pub fn log_entries(&self) -> Vec<LogEntry> {
        let started = self.started_at.to_rfc3339();
        let finished = self.finished_at.to_rfc3339();
        let entry = |timestamp: &str, event: &'static str, subject: String, details: String| LogEntry {
            timestamp: timestamp.to_string(),
            event,
            subject,
            details,
        };

        let mut entries = vec![entry(
            &started,
            "run_started",
            self.run_id.to_string(),
            format!("input directory {}", self.input_dir.display()),
        )];

        for file in &self.files {
            entries.push(match &file.error {
                None => entry(
                    &started,
                    "file_loaded",
                    file.file.clone(),
                    format!(
                        "{} layout, {}, {} rows, {} accepted, {} rejected",
                        file.layout.map(|l| l.name()).unwrap_or("unknown"),
                        file.encoding.as_deref().unwrap_or("unknown encoding"),
                        file.rows_read,
                        file.accepted,
                        file.rejected
                    ),
                ),
                Some(error) => entry(&started, "file_failed", file.file.clone(), error.clone()),
            });
        }

        for rejection in &self.rejections {
            entries.push(entry(
                &started,
                "row_rejected",
                format!("{}:{}", rejection.source_file, rejection.line_number),
                rejection.reason.clone(),
            ));
        }

        for decision in self.resolution.decisions.iter().filter(|d| d.is_merge()) {
            entries.push(entry(
                &finished,
                "contacts_merged",
                decision.contact_id.clone(),
                decision.summary(),
            ));
        }

        entries.push(entry(
            &finished,
            "run_finished",
            self.run_id.to_string(),
            self.stats.summary(),
        ));

        entries
    }
}

// ============================================================================
// STAGES
// ============================================================================

/// CSV files in `dir`, sorted by file name
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory: {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();

    paths.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(paths)
}

/// Parse every file; failures are recorded, never propagated
pub fn ingest(paths: &[PathBuf]) -> Ingestion {
    let mut ingestion = Ingestion::default();

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match parse_file(path, ingestion.records.len()) {
            Ok(parsed) => {
                tracing::info!(
                    file = %name,
                    layout = parsed.layout.name(),
                    encoding = %parsed.encoding,
                    rows = parsed.rows_read,
                    accepted = parsed.records.len(),
                    rejected = parsed.rejections.len(),
                    "loaded file"
                );
                ingestion.files.push(FileOutcome {
                    file: name,
                    layout: Some(parsed.layout),
                    encoding: Some(parsed.encoding),
                    rows_read: parsed.rows_read,
                    accepted: parsed.records.len(),
                    rejected: parsed.rejections.len(),
                    error: None,
                });
                ingestion.records.extend(parsed.records);
                ingestion.rejections.extend(parsed.rejections);
            }
            Err(e) => {
                tracing::error!(file = %name, error = %e, "skipping file");
                ingestion.files.push(FileOutcome {
                    file: name,
                    layout: None,
                    encoding: None,
                    rows_read: 0,
                    accepted: 0,
                    rejected: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    ingestion
}

/// Everything except writing the workbook
pub fn process(config: &Config) -> Result<ProcessingReport> {
    let started_at = Utc::now();
    let run_id = Uuid::new_v4();
    tracing::info!(%run_id, input = %config.input_dir.display(), "processing started");

    let paths = discover_inputs(&config.input_dir)?;
    if paths.is_empty() {
        bail!("No CSV files found in {}", config.input_dir.display());
    }

    let ingestion = ingest(&paths);
    if ingestion.records.is_empty() {
        bail!(
            "No valid contact records in {} ({} files, {} failed, {} rows rejected)",
            config.input_dir.display(),
            ingestion.files.len(),
            ingestion.counts().files_failed,
            ingestion.rejections.len()
        );
    }

    let resolver = ContactResolver::new(config.classifier()).with_dedup(config.dedup_engine());
    let resolution = resolver.resolve(&ingestion.records);
    tracing::info!(
        records = resolution.records_in,
        contacts = resolution.contacts.len(),
        "deduplication: {} → {} contacts",
        resolution.records_in,
        resolution.contacts.len()
    );

    let quality = config.quality_engine();
    let quality_reports = quality.validate_resolution(&resolution);
    let summary = quality.batch_summary(&quality_reports);
    tracing::info!("{}", summary.summary());

    let stats = RunStatistics::new(ingestion.counts(), &resolution, summary);

    Ok(ProcessingReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        input_dir: config.input_dir.clone(),
        files: ingestion.files,
        rejections: ingestion.rejections,
        resolution,
        quality_reports,
        stats,
    })
}

/// Full run: process, then write the workbook to `config.output_path`
pub fn run(config: &Config) -> Result<(ProcessingReport, ExportSummary)> {
    let report = process(config)?;
    let export = write_workbook(&config.output_path, &report).with_context(|| {
        format!("Failed to write workbook: {}", config.output_path.display())
    })?;
    tracing::info!("{}", report.stats.summary());
    Ok((report, export))
}

// ============================================================================
// TESTS
// ============================================================================
