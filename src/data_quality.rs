// ✅ Data Quality Engine - per-contact issues and run statistics
// Nothing the resolver discards goes unreported: conflicts surface here

use crate::contact::{Confidence, Field};
use crate::resolver::{MergeDecision, MergedContact, Resolution};
use crate::classification::Classification;
use serde::{Deserialize, Serialize};

// ============================================================================
// QUALITY ISSUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Contact cannot be reached or classified reliably
    Warning,  // Data is questionable or incomplete
    Info,     // Data is valid but something was set aside
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub contact_id: String,
    pub severity: Severity,
    pub field: String,
    pub issue: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub contact_id: String,
    pub completeness: f64,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "{}: completeness {:.1}%, {} issues ({} critical)",
            self.contact_id,
            self.completeness * 100.0,
            self.issues.len(),
            self.critical_count()
        )
    }

    pub fn has_critical_issues(&self) -> bool {
        self.critical_count() > 0
    }

    fn critical_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .count()
    }
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    /// Contacts below this completeness are flagged
    low_completeness_threshold: f64,
}

impl DataQualityEngine {
    pub fn new() -> Self {
        DataQualityEngine {
            low_completeness_threshold: 0.5,
        }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        DataQualityEngine {
            low_completeness_threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Validate one merged contact together with the decision that produced it
    pub fn validate(&self, contact: &MergedContact, decision: &MergeDecision) -> QualityReport {
        let mut issues = Vec::new();
        let mut push = |severity: Severity, field: &str, issue: String, recommendation: &str| {
            issues.push(QualityIssue {
                contact_id: contact.id.clone(),
                severity,
                field: field.to_string(),
                issue,
                recommendation: recommendation.to_string(),
            });
        };

        // Rule 1: Email present and well-formed
        match contact.confidence(Field::Email) {
            Confidence::Empty => push(
                Severity::Warning,
                "email",
                "No email address".to_string(),
                "Add an email address; contact is classified Other without one",
            ),
            Confidence::Malformed => push(
                Severity::Critical,
                "email",
                format!("Malformed email: {}", contact.email.as_deref().unwrap_or("")),
                "Correct the address in the source export",
            ),
            Confidence::WellFormed => {}
        }

        // Rule 2: Phone well-formed when present
        if contact.confidence(Field::Phone) == Confidence::Malformed {
            push(
                Severity::Warning,
                "phone",
                format!(
                    "Phone has an unexpected digit count: {}",
                    contact.phone.as_deref().unwrap_or("")
                ),
                "Phone numbers need 7 to 15 digits to be used for matching",
            );
        }

        // Rule 3: Name present
        if contact.confidence(Field::Name) == Confidence::Empty {
            push(
                Severity::Info,
                "name",
                "No name".to_string(),
                "Add first/last name for easier identification",
            );
        }

        // Rule 4: Every discarded value is reported
        for conflict in &decision.conflicts {
            let issue = if conflict.kept.is_empty() {
                format!("Unused value '{}' from {}", conflict.discarded, conflict.source)
            } else {
                format!(
                    "Kept '{}', discarded '{}' from {}",
                    conflict.kept, conflict.discarded, conflict.source
                )
            };
            push(Severity::Info, conflict.field.name(), issue, "Review which value is current");
        }

        // Rule 5: Completeness
        if contact.completeness < self.low_completeness_threshold {
            push(
                Severity::Warning,
                "completeness",
                format!("Completeness {:.0}%", contact.completeness * 100.0),
                "Enrich the contact with company, title or website",
            );
        }

        QualityReport {
            contact_id: contact.id.clone(),
            completeness: contact.completeness,
            issues,
        }
    }

    /// Validate every contact of a resolution
    pub fn validate_resolution(&self, resolution: &Resolution) -> Vec<QualityReport> {
        resolution
            .contacts
            .iter()
            .zip(&resolution.decisions)
            .map(|(contact, decision)| self.validate(contact, decision))
            .collect()
    }

    /// Generate summary statistics for batch validation
    pub fn batch_summary(&self, reports: &[QualityReport]) -> BatchSummary {
        let total = reports.len();
        let average_completeness = if total == 0 {
            0.0
        } else {
            reports.iter().map(|r| r.completeness).sum::<f64>() / total as f64
        };

        BatchSummary {
            total_contacts: total,
            contacts_with_issues: reports.iter().filter(|r| !r.issues.is_empty()).count(),
            critical_contacts: reports.iter().filter(|r| r.has_critical_issues()).count(),
            low_completeness_count: reports
                .iter()
                .filter(|r| r.completeness < self.low_completeness_threshold)
                .count(),
            total_issues: reports.iter().map(|r| r.issues.len()).sum(),
            average_completeness,
        }
    }
}

impl Default for DataQualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// BATCH SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_contacts: usize,
    pub contacts_with_issues: usize,
    pub critical_contacts: usize,
    pub low_completeness_count: usize,
    pub total_issues: usize,
    pub average_completeness: f64,
}

impl BatchSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} contacts: {:.1}% average completeness | {} with issues, {} critical, {} low completeness",
            self.total_contacts,
            self.average_completeness * 100.0,
            self.contacts_with_issues,
            self.critical_contacts,
            self.low_completeness_count
        )
    }
}

// ============================================================================
// RUN STATISTICS
// ============================================================================

/// Ingestion-side counts, filled in by the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestCounts {
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub records_read: usize,
    pub records_rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub ingest: IngestCounts,
    pub records_resolved: usize,
    pub merged_contacts: usize,
    pub duplicates_removed: usize,
    pub business_contacts: usize,
    pub personal_contacts: usize,
    pub other_contacts: usize,
    pub quality: BatchSummary,
}

impl RunStatistics {
    pub fn new(ingest: IngestCounts, resolution: &Resolution, quality: BatchSummary) -> Self {
        RunStatistics {
            ingest,
            records_resolved: resolution.records_in,
            merged_contacts: resolution.contacts.len(),
            duplicates_removed: resolution.duplicates_removed(),
            business_contacts: resolution.count(Classification::Business),
            personal_contacts: resolution.count(Classification::Personal),
            other_contacts: resolution.count(Classification::Other),
            quality,
        }
    }

    /// Share of resolved records folded into another contact
    pub fn deduplication_rate(&self) -> f64 {
        self.duplicates_removed as f64 / self.records_resolved.max(1) as f64
    }

    pub fn business_share(&self) -> f64 {
        self.business_contacts as f64 / self.merged_contacts.max(1) as f64
    }

    /// Metric/value rows for the quality report sheet
    pub fn metrics(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Input Files Found", self.ingest.files_found.to_string()),
            ("Input Files Loaded", self.ingest.files_loaded.to_string()),
            ("Input Files Failed", self.ingest.files_failed.to_string()),
            ("Rows Read", self.ingest.records_read.to_string()),
            ("Rows Rejected", self.ingest.records_rejected.to_string()),
            ("Total Contacts Processed", self.records_resolved.to_string()),
            ("Duplicates Removed", self.duplicates_removed.to_string()),
            ("Final Contact Count", self.merged_contacts.to_string()),
            ("Business Contacts", self.business_contacts.to_string()),
            ("Personal Contacts", self.personal_contacts.to_string()),
            ("Other Contacts", self.other_contacts.to_string()),
            (
                "Average Completeness",
                format!("{:.2}", self.quality.average_completeness),
            ),
            (
                "Contacts With Issues",
                self.quality.contacts_with_issues.to_string(),
            ),
            ("Critical Contacts", self.quality.critical_contacts.to_string()),
            (
                "Deduplication Rate",
                format!("{:.1}%", self.deduplication_rate() * 100.0),
            ),
            (
                "Business Percentage",
                format!("{:.1}%", self.business_share() * 100.0),
            ),
        ]
    }

    pub fn summary(&self) -> String {
        format!(
            "{} contacts ({} business, {} personal, {} other) from {} rows, {} duplicates removed",
            self.merged_contacts,
            self.business_contacts,
            self.personal_contacts,
            self.other_contacts,
            self.records_resolved,
            self.duplicates_removed
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
