// 👤 Contact Model - one ingested row, normalized
// Records are built once by the parser and never mutated afterwards

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Free-text values are capped at this many characters.
pub const MAX_TEXT_LEN: usize = 500;

/// Phone numbers shorter than this are kept but treated as malformed.
pub const MIN_PHONE_DIGITS: usize = 7;

/// E.164 allows at most 15 digits.
pub const MAX_PHONE_DIGITS: usize = 15;

/// Separator used by Google Contacts for multi-valued cells ("a@x.com ::: b@y.com").
pub const MULTI_VALUE_SEPARATOR: &str = ":::";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is a valid regex")
    })
}

// ============================================================================
// FIELDS & CONFIDENCE
// ============================================================================

/// Recognized contact fields. Completeness is measured against all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    Name,
    Email,
    Phone,
    Company,
    Title,
    Website,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Name,
        Field::Email,
        Field::Phone,
        Field::Company,
        Field::Title,
        Field::Website,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Company => "company",
            Field::Title => "title",
            Field::Website => "website",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How much a single field value can be trusted.
///
/// Ordering matters: the merge pass keeps the value with the highest confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Empty,
    Malformed,
    WellFormed,
}

impl Confidence {
    /// Contribution of one field to the completeness score.
    pub fn weight(&self) -> f64 {
        match self {
            Confidence::Empty => 0.0,
            Confidence::Malformed => 0.5,
            Confidence::WellFormed => 1.0,
        }
    }
}

// ============================================================================
// CONTACT RECORD
// ============================================================================

/// One contact mention from one row of one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Position in the global input order (file order, then row order)
    pub index: usize,

    pub name: Option<String>,
    pub email: Option<String>,
    /// Digits only
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub website: Option<String>,

    // Provenance
    pub source_file: String,
    pub line_number: usize,

    /// Further emails and phones on the row that lost to the primary value
    pub alternates: Vec<(Field, String)>,
}

impl ContactRecord {
    pub fn new(index: usize, source_file: impl Into<String>, line_number: usize) -> Self {
        ContactRecord {
            index,
            name: None,
            email: None,
            phone: None,
            company: None,
            title: None,
            website: None,
            source_file: source_file.into(),
            line_number,
            alternates: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = clean_text(name);
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = clean_email(email);
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = clean_phone(phone);
        self
    }

    pub fn with_company(mut self, company: &str) -> Self {
        self.company = clean_text(company);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = clean_text(title);
        self
    }

    pub fn with_website(mut self, website: &str) -> Self {
        self.website = clean_url(website);
        self
    }

    pub fn with_alternates(mut self, alternates: Vec<(Field, String)>) -> Self {
        self.alternates = alternates;
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => self.name.as_deref(),
            Field::Email => self.email.as_deref(),
            Field::Phone => self.phone.as_deref(),
            Field::Company => self.company.as_deref(),
            Field::Title => self.title.as_deref(),
            Field::Website => self.website.as_deref(),
        }
    }

    pub fn confidence(&self, field: Field) -> Confidence {
        field_confidence(field, self.get(field))
    }

    /// Valid records carry an email, a phone, or a name together with a company.
    /// A bare name can never be matched or contacted.
    pub fn is_valid(&self) -> bool {
        self.email.is_some()
            || self.phone.is_some()
            || (self.name.is_some() && self.company.is_some())
    }

    /// "file.csv:12" - stable reference used in the audit trail
    pub fn source_ref(&self) -> String {
        format!("{}:{}", self.source_file, self.line_number)
    }

    /// Case-insensitive email used for duplicate detection
    pub fn email_key(&self) -> Option<String> {
        self.email.as_deref().map(email_key)
    }

    /// Phone digits used for duplicate detection; only well-formed numbers qualify
    pub fn phone_key(&self) -> Option<String> {
        self.phone
            .as_deref()
            .filter(|p| is_well_formed_phone(p))
            .map(str::to_string)
    }

    /// Name + company pair used for duplicate detection; both must be present
    pub fn name_company_key(&self) -> Option<(String, String)> {
        match (&self.name, &self.company) {
            (Some(name), Some(company)) => Some((text_key(name), text_key(company))),
            _ => None,
        }
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Collapse whitespace, trim, cap length. Empty input yields None.
pub fn clean_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(MAX_TEXT_LEN).collect())
}

/// Pick the first well-formed address from a possibly multi-valued cell.
/// Without one, the first non-empty entry is kept as-is (malformed).
pub fn clean_email(raw: &str) -> Option<String> {
    let candidates: Vec<&str> = raw
        .split(MULTI_VALUE_SEPARATOR)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();

    candidates
        .iter()
        .find(|e| is_well_formed_email(e))
        .or_else(|| candidates.first())
        .map(|e| e.chars().take(MAX_TEXT_LEN).collect())
}

/// Digits of the first phone in the cell. No digits at all yields None.
pub fn clean_phone(raw: &str) -> Option<String> {
    let first = raw.split(MULTI_VALUE_SEPARATOR).next().unwrap_or("");
    let digits: String = first.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

pub fn clean_url(raw: &str) -> Option<String> {
    let first = raw.split(MULTI_VALUE_SEPARATOR).next().unwrap_or("");
    clean_text(first)
}

pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lowercased, whitespace-collapsed comparison key
pub fn text_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_well_formed_email(email: &str) -> bool {
    email_regex().is_match(email)
}

pub fn is_well_formed_phone(digits: &str) -> bool {
    let len = digits.chars().filter(|c| c.is_ascii_digit()).count();
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&len) && len == digits.len()
}

fn is_well_formed_website(url: &str) -> bool {
    url.contains('.') && !url.chars().any(char::is_whitespace)
}

/// Lowercased domain of a well-formed address
pub fn email_domain(email: &str) -> Option<String> {
    let email = email.trim();
    if !is_well_formed_email(email) {
        return None;
    }
    email.rsplit_once('@').map(|(_, domain)| domain.to_lowercase())
}

pub fn field_confidence(field: Field, value: Option<&str>) -> Confidence {
    let value = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Confidence::Empty,
    };

    let well_formed = match field {
        Field::Email => is_well_formed_email(value),
        Field::Phone => is_well_formed_phone(value),
        Field::Website => is_well_formed_website(value),
        Field::Name | Field::Company | Field::Title => true,
    };

    if well_formed {
        Confidence::WellFormed
    } else {
        Confidence::Malformed
    }
}

// ============================================================================
// TESTS
// ============================================================================
