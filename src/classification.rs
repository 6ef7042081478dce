// 🏷️ Classification - Business / Personal / Other from the email domain
// Domain lists are data: built-in defaults, overridable from the JSON config

use crate::contact::email_domain;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Consumer webmail providers
pub const DEFAULT_PERSONAL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "ymail.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "msn.com",
    "icloud.com",
    "me.com",
    "mac.com",
    "aol.com",
    "protonmail.com",
    "proton.me",
    "gmx.com",
    "gmx.net",
    "mail.com",
    "zoho.com",
    "yandex.com",
];

/// Disposable inboxes and bulk-mail senders. These never count as businesses.
pub const DEFAULT_FLAGGED_DOMAINS: &[&str] = &[
    "mailinator.com",
    "guerrillamail.com",
    "10minutemail.com",
    "tempmail.com",
    "temp-mail.org",
    "yopmail.com",
    "trashmail.com",
    "sharklasers.com",
    "mailchimp.com",
    "list-manage.com",
    "sendgrid.net",
    "mailgun.org",
    "constantcontact.com",
];

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    Business,
    Personal,
    Other,
}

impl Classification {
    pub fn name(&self) -> &'static str {
        match self {
            Classification::Business => "Business",
            Classification::Personal => "Personal",
            Classification::Other => "Other",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The domain lists as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainLists {
    #[serde(default = "default_personal_domains")]
    pub personal: Vec<String>,

    #[serde(default = "default_flagged_domains")]
    pub flagged: Vec<String>,
}

fn default_personal_domains() -> Vec<String> {
    DEFAULT_PERSONAL_DOMAINS.iter().map(|d| d.to_string()).collect()
}

fn default_flagged_domains() -> Vec<String> {
    DEFAULT_FLAGGED_DOMAINS.iter().map(|d| d.to_string()).collect()
}

impl Default for DomainLists {
    fn default() -> Self {
        DomainLists {
            personal: default_personal_domains(),
            flagged: default_flagged_domains(),
        }
    }
}

// ============================================================================
// DOMAIN CLASSIFIER
// ============================================================================

#[derive(Debug, Clone)]
pub struct DomainClassifier {
    personal: BTreeSet<String>,
    flagged: BTreeSet<String>,
}

impl DomainClassifier {
    /// Classifier with the built-in domain lists
    pub fn new() -> Self {
        DomainClassifier::from_lists(&DomainLists::default())
    }

    pub fn from_lists(lists: &DomainLists) -> Self {
        let normalize = |domains: &[String]| -> BTreeSet<String> {
            domains
                .iter()
                .map(|d| d.trim().trim_start_matches('@').to_lowercase())
                .filter(|d| !d.is_empty())
                .collect()
        };

        DomainClassifier {
            personal: normalize(&lists.personal),
            flagged: normalize(&lists.flagged),
        }
    }

    /// Classify by the domain of `email`. Missing or malformed addresses are Other.
    pub fn classify(&self, email: Option<&str>) -> Classification {
        match email.and_then(email_domain) {
            Some(domain) => self.classify_domain(&domain),
            None => Classification::Other,
        }
    }

    pub fn classify_domain(&self, domain: &str) -> Classification {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Classification::Other;
        }
        if listed(&self.personal, &domain) {
            Classification::Personal
        } else if listed(&self.flagged, &domain) {
            Classification::Other
        } else {
            Classification::Business
        }
    }

    pub fn personal_count(&self) -> usize {
        self.personal.len()
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged.len()
    }
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Exact match, or a subdomain of a listed domain
fn listed(set: &BTreeSet<String>, domain: &str) -> bool {
    if set.contains(domain) {
        return true;
    }
    let mut rest = domain;
    while let Some((_, parent)) = rest.split_once('.') {
        if set.contains(parent) {
            return true;
        }
        rest = parent;
    }
    false
}

// ============================================================================
// TESTS
// ============================================================================
