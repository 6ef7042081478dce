// 🏗️ Parser - CSV contact exports → ContactRecords
// Handles Google Contacts, Outlook and generic header layouts

use crate::contact::{
    clean_email, clean_phone, email_key, is_well_formed_email, is_well_formed_phone,
    ContactRecord, Field, MULTI_VALUE_SEPARATOR,
};
use crate::error::IngestError;
use csv::{ReaderBuilder, StringRecord};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceLayout - which export format the headers look like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLayout {
    GoogleContacts,
    Outlook,
    Generic,
}

impl SourceLayout {
    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            SourceLayout::GoogleContacts => "Google Contacts",
            SourceLayout::Outlook => "Outlook",
            SourceLayout::Generic => "Generic",
        }
    }

    fn spec(&self) -> &'static LayoutSpec {
        match self {
            SourceLayout::GoogleContacts => &GOOGLE_SPEC,
            SourceLayout::Outlook => &OUTLOOK_SPEC,
            SourceLayout::Generic => &GENERIC_SPEC,
        }
    }
}

/// A row that never reaches the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub source_file: String,
    pub line_number: usize,
    pub reason: String,
}

/// Decoded file content
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub encoding: &'static str,
    pub content: String,
}

/// Everything one file contributed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    pub source_file: String,
    pub layout: SourceLayout,
    pub encoding: String,
    pub rows_read: usize,
    pub records: Vec<ContactRecord>,
    pub rejections: Vec<Rejection>,
}

// ============================================================================
// LAYOUT SPECS
// ============================================================================

/// Candidate headers per slot, in priority order. Matching is case-insensitive.
struct LayoutSpec {
    full_name: &'static [&'static str],
    first_name: &'static [&'static str],
    middle_name: &'static [&'static str],
    last_name: &'static [&'static str],
    nickname: &'static [&'static str],
    emails: &'static [&'static str],
    phones: &'static [&'static str],
    company: &'static [&'static str],
    title: &'static [&'static str],
    website: &'static [&'static str],
}

static GOOGLE_SPEC: LayoutSpec = LayoutSpec {
    full_name: &["Name"],
    first_name: &["First Name", "Given Name"],
    middle_name: &["Middle Name", "Additional Name"],
    last_name: &["Last Name", "Family Name"],
    nickname: &["Nickname"],
    emails: &["E-mail 1 - Value", "E-mail 2 - Value", "E-mail 3 - Value"],
    phones: &["Phone 1 - Value", "Phone 2 - Value", "Phone 3 - Value"],
    company: &["Organization Name", "Organization 1 - Name"],
    title: &["Organization Title", "Organization 1 - Title"],
    website: &["Website 1 - Value"],
};

static OUTLOOK_SPEC: LayoutSpec = LayoutSpec {
    full_name: &[],
    first_name: &["First Name"],
    middle_name: &["Middle Name"],
    last_name: &["Last Name"],
    nickname: &["Nickname"],
    emails: &["E-mail Address", "E-mail 2 Address", "E-mail 3 Address"],
    phones: &["Mobile Phone", "Business Phone", "Primary Phone", "Home Phone"],
    company: &["Company"],
    title: &["Job Title"],
    website: &["Web Page"],
};

static GENERIC_SPEC: LayoutSpec = LayoutSpec {
    full_name: &["name", "full name", "display name", "contact"],
    first_name: &["first name", "firstname", "first_name", "given name"],
    middle_name: &["middle name", "middle_name"],
    last_name: &["last name", "lastname", "last_name", "surname", "family name"],
    nickname: &["nickname"],
    emails: &["email", "e-mail", "email address", "email_address", "mail"],
    phones: &["phone", "phone number", "phone_number", "mobile", "cell", "telephone", "tel"],
    company: &["company", "organization", "organisation", "org", "employer"],
    title: &["title", "job title", "job_title", "position", "role"],
    website: &["website", "web", "url", "homepage"],
};

/// Column positions resolved against one file's headers
struct ColumnMap {
    full_name: Option<usize>,
    first_name: Option<usize>,
    middle_name: Option<usize>,
    last_name: Option<usize>,
    nickname: Option<usize>,
    emails: Vec<usize>,
    phones: Vec<usize>,
    company: Option<usize>,
    title: Option<usize>,
    website: Option<usize>,
}

impl ColumnMap {
    fn resolve(spec: &LayoutSpec, headers: &StringRecord) -> Self {
        let normalized: Vec<String> = headers.iter().map(header_key).collect();
        let position = |name: &str| -> Option<usize> {
            let key = header_key(name);
            normalized.iter().position(|h| *h == key)
        };
        let first = |names: &[&str]| names.iter().find_map(|n| position(*n));
        let all = |names: &[&str]| names.iter().filter_map(|n| position(*n)).collect::<Vec<_>>();

        ColumnMap {
            full_name: first(spec.full_name),
            first_name: first(spec.first_name),
            middle_name: first(spec.middle_name),
            last_name: first(spec.last_name),
            nickname: first(spec.nickname),
            emails: all(spec.emails),
            phones: all(spec.phones),
            company: first(spec.company),
            title: first(spec.title),
            website: first(spec.website),
        }
    }

    fn has_identifying_column(&self) -> bool {
        self.full_name.is_some()
            || self.first_name.is_some()
            || self.last_name.is_some()
            || !self.emails.is_empty()
            || !self.phones.is_empty()
    }
}

fn header_key(header: &str) -> String {
    header.trim().trim_start_matches('\u{feff}').to_lowercase()
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Detect layout from the header row
pub fn detect_layout(headers: &StringRecord) -> SourceLayout {
    let has = |name: &str| headers.iter().any(|h| header_key(h) == header_key(name));

    if has("E-mail 1 - Value") || has("Phone 1 - Value") || has("Organization 1 - Name") {
        return SourceLayout::GoogleContacts;
    }

    if has("E-mail Address") || has("Business Phone") || has("Mobile Phone") {
        return SourceLayout::Outlook;
    }

    SourceLayout::Generic
}

/// Read a file and decode it to UTF-8.
///
/// A BOM decides the encoding when present; otherwise valid UTF-8 is taken
/// as-is and anything else is read as Windows-1252 (Excel's default export).
pub fn read_source(path: &Path) -> Result<SourceFile, IngestError> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (encoding, body): (&'static Encoding, &[u8]) = match Encoding::for_bom(&bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None if std::str::from_utf8(&bytes).is_ok() => (UTF_8, &bytes[..]),
        None => (WINDOWS_1252, &bytes[..]),
    };
    let (content, _) = encoding.decode_without_bom_handling(body);

    Ok(SourceFile {
        name: file_name(path),
        encoding: encoding.name(),
        content: content.into_owned(),
    })
}

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const SNIFF_ROWS: usize = 10;

/// Pick the delimiter that splits the header and keeps the sampled rows
/// at the header's width. Google and Outlook exports are always comma
/// separated, so a header they recognise settles it.
pub fn sniff_delimiter(content: &str) -> u8 {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let header = match lines.next() {
        Some(header) => header,
        None => return b',',
    };
    if detect_layout(&split_line(header, b',')) != SourceLayout::Generic {
        return b',';
    }
    let rows: Vec<&str> = lines.take(SNIFF_ROWS).collect();

    let mut best = (b',', 0usize);
    for delimiter in DELIMITERS {
        let width = split_line(header, delimiter).len();
        if width < 2 {
            continue;
        }
        let matching = rows
            .iter()
            .filter(|row| split_line(row, delimiter).len() == width)
            .count();
        let score = width * (matching + 1);
        if score > best.1 {
            best = (delimiter, score);
        }
    }
    best.0
}

fn split_line(line: &str, delimiter: u8) -> StringRecord {
    ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .unwrap_or_default()
}

/// Parse one CSV export. `first_index` is the global position of its first record.
pub fn parse_file(path: &Path, first_index: usize) -> Result<ParsedFile, IngestError> {
    let source = read_source(path)?;
    parse_source(&source, first_index)
}

pub fn parse_source(source: &SourceFile, first_index: usize) -> Result<ParsedFile, IngestError> {
    if source.content.trim().is_empty() {
        return Err(IngestError::EmptyFile {
            file: source.name.clone(),
        });
    }

    let delimiter = sniff_delimiter(&source.content);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(source.content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| IngestError::Csv {
            file: source.name.clone(),
            line: 1,
            source: e,
        })?
        .clone();

    let layout = detect_layout(&headers);
    let columns = ColumnMap::resolve(layout.spec(), &headers);
    if !columns.has_identifying_column() {
        return Err(IngestError::UnrecognizedLayout {
            file: source.name.clone(),
            headers: headers.iter().collect::<Vec<_>>().join(", "),
        });
    }

    let mut records = Vec::new();
    let mut rejections = Vec::new();
    let mut rows_read = 0;

    for (row_idx, result) in reader.records().enumerate() {
        // +2: 1-indexed plus header row
        let fallback_line = row_idx + 2;
        let row = result.map_err(|e| IngestError::Csv {
            file: source.name.clone(),
            line: e
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(fallback_line),
            source: e,
        })?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows_read += 1;

        let line_number = row
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);
        let record = build_record(
            &columns,
            &row,
            first_index + records.len(),
            &source.name,
            line_number,
        );

        if record.is_valid() {
            records.push(record);
        } else {
            let reason = match &record.name {
                Some(name) => format!("'{}' has no email, phone or company", name),
                None => "no name, email or phone".to_string(),
            };
            tracing::debug!(file = %source.name, line = line_number, %reason, "row rejected");
            rejections.push(Rejection {
                source_file: source.name.clone(),
                line_number,
                reason,
            });
        }
    }

    if rows_read == 0 {
        return Err(IngestError::EmptyFile {
            file: source.name.clone(),
        });
    }

    Ok(ParsedFile {
        source_file: source.name.clone(),
        layout,
        encoding: source.encoding.to_string(),
        rows_read,
        records,
        rejections,
    })
}

fn build_record(
    columns: &ColumnMap,
    row: &StringRecord,
    index: usize,
    source_file: &str,
    line_number: usize,
) -> ContactRecord {
    let cell = |col: Option<usize>| col.and_then(|c| row.get(c)).unwrap_or("");

    let full_name = cell(columns.full_name).trim();
    let name = if !full_name.is_empty() {
        full_name.to_string()
    } else {
        let parts: Vec<&str> = [columns.first_name, columns.middle_name, columns.last_name]
            .iter()
            .map(|&c| cell(c).trim())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            cell(columns.nickname).to_string()
        } else {
            parts.join(" ")
        }
    };

    let email = pick_cell(row, &columns.emails, |raw| {
        clean_email(raw).map_or(false, |e| is_well_formed_email(&e))
    });
    let phone = pick_cell(row, &columns.phones, |raw| {
        clean_phone(raw).map_or(false, |p| is_well_formed_phone(&p))
    });

    let record = ContactRecord::new(index, source_file, line_number)
        .with_name(&name)
        .with_email(email)
        .with_phone(phone)
        .with_company(cell(columns.company))
        .with_title(cell(columns.title))
        .with_website(cell(columns.website));
    let alternates = alternate_values(&record, row, columns);
    record.with_alternates(alternates)
}

/// Emails and phones on the row besides the primary ones, deduplicated
fn alternate_values(
    record: &ContactRecord,
    row: &StringRecord,
    columns: &ColumnMap,
) -> Vec<(Field, String)> {
    let mut seen: BTreeSet<(Field, String)> = BTreeSet::new();
    if let Some(email) = &record.email {
        seen.insert((Field::Email, email_key(email)));
    }
    if let Some(phone) = &record.phone {
        seen.insert((Field::Phone, phone.clone()));
    }

    let mut alternates = Vec::new();
    for (field, cols) in [(Field::Email, &columns.emails), (Field::Phone, &columns.phones)] {
        let values = cols
            .iter()
            .filter_map(|&c| row.get(c))
            .flat_map(|cell| cell.split(MULTI_VALUE_SEPARATOR));

        for value in values {
            let cleaned = match field {
                Field::Email => clean_email(value),
                _ => clean_phone(value),
            };
            let Some(cleaned) = cleaned else { continue };
            let key = match field {
                Field::Email => email_key(&cleaned),
                _ => cleaned.clone(),
            };
            if seen.insert((field, key)) {
                alternates.push((field, cleaned));
            }
        }
    }
    alternates
}

/// First cell that passes `good`, else the first non-empty one
fn pick_cell<'a>(row: &'a StringRecord, cols: &[usize], good: impl Fn(&str) -> bool) -> &'a str {
    let cells: Vec<&str> = cols
        .iter()
        .filter_map(|&c| row.get(c))
        .filter(|v| !v.trim().is_empty())
        .collect();
    cells
        .iter()
        .copied()
        .find(|v| good(*v))
        .or_else(|| cells.first().copied())
        .unwrap_or("")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string()
}

// ============================================================================
// TESTS
// ============================================================================
