// 📊 Excel Export - contact lists, quality report and audit log as one workbook

use crate::classification::Classification;
use crate::error::ExportError;
use crate::pipeline::ProcessingReport;
use crate::resolver::MergedContact;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

pub const SHEET_MASTER: &str = "Contacts_Master";
pub const SHEET_BUSINESS: &str = "Business_Contacts";
pub const SHEET_PERSONAL: &str = "Personal_Contacts";
pub const SHEET_QUALITY: &str = "Data_Quality_Report";
pub const SHEET_LOG: &str = "Processing_Log";

/// Excel rejects longer strings in a single cell
pub const MAX_CELL_CHARS: usize = 32_767;

/// Room kept free for the "… (+N more)" marker
const OVERFLOW_MARKER_CHARS: usize = 32;

const CONTACT_COLUMNS: &[(&str, f64)] = &[
    ("Contact ID", 16.0),
    ("Name", 28.0),
    ("Email", 32.0),
    ("Phone", 16.0),
    ("Company", 26.0),
    ("Title", 22.0),
    ("Website", 26.0),
    ("Classification", 14.0),
    ("Completeness", 13.0),
    ("Source Count", 12.0),
    ("Sources", 40.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub sheets: Vec<String>,
    pub contact_rows: usize,
    pub log_rows: usize,
}

struct Formats {
    header: Format,
    percent: Format,
    section: Format,
}

impl Formats {
    fn new() -> Self {
        Formats {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xD9E1F2))
                .set_border(FormatBorder::Thin),
            percent: Format::new().set_num_format("0.0%"),
            section: Format::new().set_bold(),
        }
    }
}

/// Write the five-sheet workbook, creating the output directory if needed.
pub fn write_workbook(path: &Path, report: &ProcessingReport) -> Result<ExportSummary, ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let contacts = &report.resolution.contacts;

    let all: Vec<&MergedContact> = contacts.iter().collect();
    let business = by_class(contacts, Classification::Business);
    let personal = by_class(contacts, Classification::Personal);

    write_contacts_sheet(&mut workbook, SHEET_MASTER, &all, &formats)?;
    write_contacts_sheet(&mut workbook, SHEET_BUSINESS, &business, &formats)?;
    write_contacts_sheet(&mut workbook, SHEET_PERSONAL, &personal, &formats)?;
    write_quality_sheet(&mut workbook, report, &formats)?;
    let log_rows = write_log_sheet(&mut workbook, report, &formats)?;

    workbook.save(path)?;

    tracing::info!(path = %path.display(), contacts = all.len(), "workbook written");

    Ok(ExportSummary {
        sheets: [SHEET_MASTER, SHEET_BUSINESS, SHEET_PERSONAL, SHEET_QUALITY, SHEET_LOG]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        contact_rows: all.len(),
        log_rows,
    })
}

fn by_class(contacts: &[MergedContact], class: Classification) -> Vec<&MergedContact> {
    contacts.iter().filter(|c| c.classification == class).collect()
}

/// Comma-joined sources, cut short with "… (+N more)" to fit one cell
fn source_list(sources: &[String]) -> String {
    let budget = MAX_CELL_CHARS - OVERFLOW_MARKER_CHARS;
    let mut text = String::new();
    let mut len = 0;

    for (i, source) in sources.iter().enumerate() {
        let sep = if i == 0 { 0 } else { 2 };
        let needed = sep + source.chars().count();
        if len + needed > budget {
            text.push_str(&format!(", … (+{} more)", sources.len() - i));
            break;
        }
        if i > 0 {
            text.push_str(", ");
        }
        text.push_str(source);
        len += needed;
    }
    text
}

/// Free text clipped to the cell limit
fn fit_cell(text: &str) -> Cow<'_, str> {
    if text.chars().count() <= MAX_CELL_CHARS {
        return Cow::Borrowed(text);
    }
    let kept: String = text.chars().take(MAX_CELL_CHARS - OVERFLOW_MARKER_CHARS).collect();
    Cow::Owned(format!("{}… (truncated)", kept))
}

fn write_header(
    worksheet: &mut Worksheet,
    row: u32,
    columns: &[(&str, f64)],
    formats: &Formats,
) -> Result<(), ExportError> {
    for (col, (title, width)) in columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(row, col, *title, &formats.header)?;
        worksheet.set_column_width(col, *width)?;
    }
    Ok(())
}

fn write_contacts_sheet(
    workbook: &mut Workbook,
    name: &str,
    contacts: &[&MergedContact],
    formats: &Formats,
) -> Result<(), ExportError> {
    let worksheet = workbook.add_worksheet().set_name(name)?;
    write_header(worksheet, 0, CONTACT_COLUMNS, formats)?;
    worksheet.set_freeze_panes(1, 0)?;

    for (i, contact) in contacts.iter().enumerate() {
        let row = i as u32 + 1;
        let text = [
            contact.id.as_str(),
            contact.name.as_deref().unwrap_or(""),
            contact.email.as_deref().unwrap_or(""),
            contact.phone.as_deref().unwrap_or(""),
            contact.company.as_deref().unwrap_or(""),
            contact.title.as_deref().unwrap_or(""),
            contact.website.as_deref().unwrap_or(""),
            contact.classification.name(),
        ];
        for (col, value) in text.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(row, col as u16, *value)?;
            }
        }
        worksheet.write_number_with_format(row, 8, contact.completeness, &formats.percent)?;
        worksheet.write_number(row, 9, contact.source_count() as f64)?;
        worksheet.write_string(row, 10, source_list(&contact.sources).as_str())?;
    }

    let last_col = CONTACT_COLUMNS.len() as u16 - 1;
    worksheet.autofilter(0, 0, contacts.len() as u32, last_col)?;
    Ok(())
}

fn write_quality_sheet(
    workbook: &mut Workbook,
    report: &ProcessingReport,
    formats: &Formats,
) -> Result<(), ExportError> {
    let worksheet = workbook.add_worksheet().set_name(SHEET_QUALITY)?;
    write_header(worksheet, 0, &[("Metric", 30.0), ("Value", 24.0)], formats)?;

    let mut row = 1u32;
    for (metric, value) in report.stats.metrics() {
        worksheet.write_string(row, 0, metric)?;
        worksheet.write_string(row, 1, value.as_str())?;
        row += 1;
    }
    worksheet.write_string(row, 0, "Processing Date")?;
    worksheet.write_string(
        row,
        1,
        report.finished_at.format("%Y-%m-%d %H:%M:%S").to_string().as_str(),
    )?;
    row += 2;

    worksheet.write_string_with_format(row, 0, "Issues", &formats.section)?;
    row += 1;
    let issue_columns = [
        ("Contact ID", 30.0),
        ("Severity", 24.0),
        ("Field", 14.0),
        ("Issue", 50.0),
        ("Recommendation", 50.0),
    ];
    write_header(worksheet, row, &issue_columns, formats)?;
    row += 1;

    for issue in report.quality_reports.iter().flat_map(|r| &r.issues) {
        worksheet.write_string(row, 0, issue.contact_id.as_str())?;
        worksheet.write_string(row, 1, issue.severity.name())?;
        worksheet.write_string(row, 2, issue.field.as_str())?;
        worksheet.write_string(row, 3, &*fit_cell(&issue.issue))?;
        worksheet.write_string(row, 4, issue.recommendation.as_str())?;
        row += 1;
    }

    Ok(())
}

fn write_log_sheet(
    workbook: &mut Workbook,
    report: &ProcessingReport,
    formats: &Formats,
) -> Result<usize, ExportError> {
    let worksheet = workbook.add_worksheet().set_name(SHEET_LOG)?;
    write_header(
        worksheet,
        0,
        &[("Timestamp", 22.0), ("Event", 18.0), ("Subject", 30.0), ("Details", 80.0)],
        formats,
    )?;
    worksheet.set_freeze_panes(1, 0)?;

    let rows = report.log_entries();
    for (i, entry) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet.write_string(row, 0, entry.timestamp.as_str())?;
        worksheet.write_string(row, 1, entry.event)?;
        worksheet.write_string(row, 2, &*fit_cell(&entry.subject))?;
        worksheet.write_string(row, 3, &*fit_cell(&entry.details))?;
    }

    Ok(rows.len())
}

// ============================================================================
// TESTS
// ============================================================================
