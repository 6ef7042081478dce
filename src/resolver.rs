// 🧩 Contact Resolver - group duplicates, reduce fields, classify
// Pure function over an ordered slice of records: no I/O, no global state

use crate::classification::{Classification, DomainClassifier};
use crate::contact::{field_confidence, Confidence, ContactRecord, Field};
use crate::deduplication::{DeduplicationEngine, DuplicateGroup, MatchStrategy};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

// ============================================================================
// MERGED CONTACT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedContact {
    /// Stable id derived from the member record references
    pub id: String,

    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub website: Option<String>,

    /// "file.csv:line" for every constituent record, in input order
    pub sources: Vec<String>,

    /// Weighted fraction of recognized fields populated, in [0, 1]
    pub completeness: f64,

    pub classification: Classification,
}

impl MergedContact {
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

    fn set(&mut self, field: Field, value: Option<String>) {
        match field {
            Field::Name => self.name = value,
            Field::Email => self.email = value,
            Field::Phone => self.phone = value,
            Field::Company => self.company = value,
            Field::Title => self.title = value,
            Field::Website => self.website = value,
        }
    }

    pub fn confidence(&self, field: Field) -> Confidence {
        field_confidence(field, self.get(field))
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

// ============================================================================
// MERGE LOG
// ============================================================================

/// Sources named in a merge summary before the rest are counted
const SUMMARY_SOURCES: usize = 10;

/// A value that lost the merge for its field, or a secondary email or phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    pub field: Field,
    pub kept: String,
    pub discarded: String,
    /// Record the discarded value came from
    pub source: String,
}

/// Why one merged contact looks the way it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeDecision {
    pub contact_id: String,
    pub sources: Vec<String>,
    pub strategies: BTreeSet<MatchStrategy>,
    pub conflicts: Vec<FieldConflict>,
}

impl MergeDecision {
    pub fn is_merge(&self) -> bool {
        self.sources.len() > 1
    }

    pub fn summary(&self) -> String {
        if !self.is_merge() {
            return format!("{}: single record {}", self.contact_id, self.sources.join(", "));
        }
        let strategies: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        let mut listed = self.sources[..self.sources.len().min(SUMMARY_SOURCES)].join(", ");
        if self.sources.len() > SUMMARY_SOURCES {
            listed.push_str(&format!(", … (+{} more)", self.sources.len() - SUMMARY_SOURCES));
        }
        format!(
            "{}: merged {} records [{}] by {} ({} conflicts)",
            self.contact_id,
            self.sources.len(),
            listed,
            strategies.join(", "),
            self.conflicts.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub contacts: Vec<MergedContact>,
    /// One entry per contact, same order as `contacts`
    pub decisions: Vec<MergeDecision>,
    pub records_in: usize,
}

impl Resolution {
    /// Input records absorbed into another contact
    pub fn duplicates_removed(&self) -> usize {
        self.records_in - self.contacts.len()
    }

    pub fn count(&self, classification: Classification) -> usize {
        self.contacts
            .iter()
            .filter(|c| c.classification == classification)
            .count()
    }
}

// ============================================================================
// CONTACT RESOLVER
// ============================================================================

pub struct ContactResolver {
    dedup: DeduplicationEngine,
    classifier: DomainClassifier,
}

impl ContactResolver {
    pub fn new(classifier: DomainClassifier) -> Self {
        ContactResolver {
            dedup: DeduplicationEngine::new(),
            classifier,
        }
    }

    pub fn with_dedup(mut self, dedup: DeduplicationEngine) -> Self {
        self.dedup = dedup;
        self
    }

    /// Group, merge and classify. Records must already be valid and in input order.
    pub fn resolve(&self, records: &[ContactRecord]) -> Resolution {
        let groups = self.dedup.group(records);
        let mut contacts = Vec::with_capacity(groups.len());
        let mut decisions = Vec::with_capacity(groups.len());

        for group in &groups {
            let (contact, decision) = self.merge_group(records, group);
            tracing::debug!(decision = %decision.summary(), "resolved contact");
            contacts.push(contact);
            decisions.push(decision);
        }

        Resolution {
            contacts,
            decisions,
            records_in: records.len(),
        }
    }

    fn merge_group(
        &self,
        records: &[ContactRecord],
        group: &DuplicateGroup,
    ) -> (MergedContact, MergeDecision) {
        let members: Vec<&ContactRecord> = group.members.iter().map(|&i| &records[i]).collect();
        let sources: Vec<String> = members.iter().map(|r| r.source_ref()).collect();
        let id = contact_id(&sources);

        let mut contact = MergedContact {
            id: id.clone(),
            name: None,
            email: None,
            phone: None,
            company: None,
            title: None,
            website: None,
            sources: sources.clone(),
            completeness: 0.0,
            classification: Classification::Other,
        };
        let mut conflicts = Vec::new();

        for field in Field::ALL {
            let winner = pick_winner(&members, field);
            let kept = winner.and_then(|w| w.get(field));

            if let Some(kept) = kept {
                let kept_key = comparison_key(field, kept);
                for member in &members {
                    if let Some(value) = member.get(field) {
                        if comparison_key(field, value) != kept_key {
                            conflicts.push(FieldConflict {
                                field,
                                kept: kept.to_string(),
                                discarded: value.to_string(),
                                source: member.source_ref(),
                            });
                        }
                    }
                }
            }

            contact.set(field, kept.map(str::to_string));
        }

        // Secondary emails and phones never become the contact's value
        for member in &members {
            for (field, value) in &member.alternates {
                let key = comparison_key(*field, value);
                let kept_key = contact.get(*field).map(|v| comparison_key(*field, v));
                let covered = kept_key.as_deref() == Some(key.as_str())
                    || conflicts
                        .iter()
                        .any(|c| c.field == *field && comparison_key(*field, &c.discarded) == key);
                if !covered {
                    conflicts.push(FieldConflict {
                        field: *field,
                        kept: contact.get(*field).unwrap_or("").to_string(),
                        discarded: value.clone(),
                        source: member.source_ref(),
                    });
                }
            }
        }

        contact.completeness = completeness(&contact);
        contact.classification = self.classifier.classify(contact.email.as_deref());

        let decision = MergeDecision {
            contact_id: id,
            sources,
            strategies: group.strategies.clone(),
            conflicts,
        };

        (contact, decision)
    }
}

impl Default for ContactResolver {
    fn default() -> Self {
        Self::new(DomainClassifier::new())
    }
}

/// Highest confidence wins; on a tie the earliest member keeps it.
fn pick_winner<'a>(members: &[&'a ContactRecord], field: Field) -> Option<&'a ContactRecord> {
    let mut best: Option<(&ContactRecord, Confidence)> = None;
    for &member in members {
        let confidence = member.confidence(field);
        if confidence == Confidence::Empty {
            continue;
        }
        match best {
            Some((_, c)) if c >= confidence => {}
            _ => best = Some((member, confidence)),
        }
    }
    best.map(|(record, _)| record)
}

/// Values that only differ in case or spacing are the same value
fn comparison_key(field: Field, value: &str) -> String {
    match field {
        Field::Phone => value.to_string(),
        _ => crate::contact::text_key(value),
    }
}

pub fn completeness(contact: &MergedContact) -> f64 {
    let total: f64 = Field::ALL
        .iter()
        .map(|&f| contact.confidence(f).weight())
        .sum();
    total / Field::ALL.len() as f64
}

fn contact_id(sources: &[String]) -> String {
    let mut hasher = Sha256::new();
    for source in sources {
        hasher.update(source.as_bytes());
        hasher.update(b"\n");
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("C-{}", &digest[..12])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(index: usize) -> ContactRecord {
        ContactRecord::new(index, "contacts.csv", index + 2)
    }

    fn resolve(records: &[ContactRecord]) -> Resolution {
        ContactResolver::default().resolve(records)
    }

    #[test]
    fn test_email_duplicates_merge_first_seen_casing() {
        let records = vec![
            create_test_record(0).with_email("a@acme.com").with_phone("555-1212"),
            create_test_record(1).with_email("A@ACME.com").with_name("A. Smith"),
        ];

        let resolution = resolve(&records);

        assert_eq!(resolution.contacts.len(), 1);
        let contact = &resolution.contacts[0];
        assert_eq!(contact.email.as_deref(), Some("a@acme.com"));
        assert_eq!(contact.phone.as_deref(), Some("5551212"));
        assert_eq!(contact.name.as_deref(), Some("A. Smith"));
        assert_eq!(contact.classification, Classification::Business);
        assert_eq!(contact.sources, vec!["contacts.csv:2", "contacts.csv:3"]);
        assert_eq!(resolution.duplicates_removed(), 1);
        // Same address in different case is not a conflict
        assert!(resolution.decisions[0].conflicts.is_empty());
    }

    #[test]
    fn test_well_formed_value_beats_earlier_malformed() {
        let records = vec![
            create_test_record(0).with_phone("5551212000").with_email("bob(at)acme"),
            create_test_record(1).with_phone("555 121 2000").with_email("bob@acme.com"),
        ];

        let resolution = resolve(&records);
        let contact = &resolution.contacts[0];

        assert_eq!(contact.email.as_deref(), Some("bob@acme.com"));
        let conflicts = &resolution.decisions[0].conflicts;
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].field, Field::Email);
        assert_eq!(conflicts[0].discarded, "bob(at)acme");
        assert_eq!(conflicts[0].source, "contacts.csv:2");
    }

    #[test]
    fn test_tie_goes_to_earliest_record() {
        let records = vec![
            create_test_record(0).with_email("x@acme.com").with_company("Acme"),
            create_test_record(1).with_email("x@acme.com").with_company("Acme Corp"),
        ];

        let resolution = resolve(&records);

        assert_eq!(resolution.contacts[0].company.as_deref(), Some("Acme"));
        assert_eq!(resolution.decisions[0].conflicts[0].discarded, "Acme Corp");
    }

    #[test]
    fn test_transitive_merge_produces_one_contact() {
        let records = vec![
            create_test_record(0).with_email("a@acme.com"),
            create_test_record(1).with_email("a@acme.com").with_phone("5551212000"),
            create_test_record(2).with_phone("(555) 121-2000").with_name("Al"),
        ];

        let resolution = resolve(&records);

        assert_eq!(resolution.contacts.len(), 1);
        assert_eq!(resolution.contacts[0].source_count(), 3);
        assert!(resolution.decisions[0].is_merge());
    }

    #[test]
    fn test_merged_values_come_from_members() {
        let records = vec![
            create_test_record(0)
                .with_email("k@globex.com")
                .with_title("CTO")
                .with_website("globex.com"),
            create_test_record(1).with_email("K@globex.com").with_name("Kim"),
            create_test_record(2).with_email("other@gmail.com").with_name("Pat"),
        ];

        let resolution = resolve(&records);

        for contact in &resolution.contacts {
            let members: Vec<&ContactRecord> = records
                .iter()
                .filter(|r| contact.sources.contains(&r.source_ref()))
                .collect();
            for field in Field::ALL {
                if let Some(value) = contact.get(field) {
                    assert!(members.iter().any(|m| m.get(field) == Some(value)));
                }
            }
        }
    }

    #[test]
    fn test_completeness_bounds_and_monotonic() {
        let first = create_test_record(0).with_email("a@acme.com");
        let second = create_test_record(1).with_email("a@acme.com").with_name("Ann");
        let third = create_test_record(2)
            .with_email("a@acme.com")
            .with_phone("12")
            .with_company("Acme")
            .with_title("VP")
            .with_website("acme.com");

        let one = resolve(&[first.clone()]).contacts[0].completeness;
        let two = resolve(&[first.clone(), second.clone()]).contacts[0].completeness;
        let three = resolve(&[first, second, third]).contacts[0].completeness;

        assert!((0.0..=1.0).contains(&one));
        assert!(one <= two && two <= three);
        assert!(three <= 1.0);
        // 5 well-formed + 1 malformed phone
        assert!((three - 5.5 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_classification_uses_winning_email() {
        let records = vec![
            create_test_record(0).with_email("pat@gmail.com"),
            create_test_record(1).with_email("solo@initech.io"),
            create_test_record(2).with_phone("5559998888"),
        ];

        let resolution = resolve(&records);

        assert_eq!(resolution.contacts[0].classification, Classification::Personal);
        assert_eq!(resolution.contacts[1].classification, Classification::Business);
        assert_eq!(resolution.contacts[2].classification, Classification::Other);
        assert_eq!(resolution.count(Classification::Business), 1);
    }

    #[test]
    fn test_contact_id_is_deterministic() {
        let records = vec![create_test_record(0).with_email("a@acme.com")];

        let a = resolve(&records);
        let b = resolve(&records);

        assert_eq!(a.contacts[0].id, b.contacts[0].id);
        assert!(a.contacts[0].id.starts_with("C-"));
        assert_eq!(a.decisions[0].contact_id, a.contacts[0].id);
    }

    #[test]
    fn test_secondary_values_are_logged_once() {
        let records = vec![
            create_test_record(0)
                .with_email("pat@gmail.com")
                .with_alternates(vec![
                    (Field::Email, "pat.kim@work.net".to_string()),
                    (Field::Phone, "5553334444".to_string()),
                ]),
            create_test_record(1)
                .with_email("PAT@gmail.com")
                .with_phone("555 121 2000")
                .with_alternates(vec![
                    (Field::Email, "Pat.Kim@work.net".to_string()),
                    (Field::Email, "pk@other.org".to_string()),
                ]),
        ];

        let resolution = resolve(&records);
        let conflicts = &resolution.decisions[0].conflicts;
        let discarded: Vec<&str> = conflicts.iter().map(|c| c.discarded.as_str()).collect();

        assert_eq!(discarded, vec!["pat.kim@work.net", "5553334444", "pk@other.org"]);
        assert_eq!(conflicts[0].kept, "pat@gmail.com");
        assert_eq!(conflicts[1].kept, "5551212000");
        assert_eq!(conflicts[2].source, "contacts.csv:3");
    }

    #[test]
    fn test_summary_lists_a_bounded_number_of_sources() {
        let records: Vec<ContactRecord> = (0..500)
            .map(|i| create_test_record(i).with_phone("5551212000"))
            .collect();

        let resolution = resolve(&records);
        let summary = resolution.decisions[0].summary();

        assert!(summary.contains("merged 500 records"));
        assert!(summary.contains("(+490 more)"));
        assert!(!summary.contains("contacts.csv:12,"));
    }

    #[test]
    fn test_empty_input() {
        let resolution = resolve(&[]);
        assert!(resolution.contacts.is_empty());
        assert_eq!(resolution.duplicates_removed(), 0);
    }
}
