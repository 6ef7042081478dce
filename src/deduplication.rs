// 🔍 Deduplication Engine - Detect duplicate contacts
// Three strategies: Email, Phone, Name + Company. Matches are transitive.

use crate::contact::ContactRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ============================================================================
// MATCH STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Same email, case-insensitive and trimmed
    Email,

    /// Same phone digits, formatting ignored
    Phone,

    /// Same name and same company, case-insensitive, whitespace-normalized
    NameCompany,
}

impl MatchStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            MatchStrategy::Email => "email",
            MatchStrategy::Phone => "phone",
            MatchStrategy::NameCompany => "name+company",
        }
    }
}

// ============================================================================
// DUPLICATE MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// Position of the earlier record in the input slice
    pub first: usize,

    /// Position of the later record in the input slice
    pub second: usize,

    pub strategy: MatchStrategy,

    /// Human-readable reason
    pub reason: String,
}

/// A set of records that describe the same real-world contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Positions in the input slice, ascending
    pub members: Vec<usize>,

    /// Every strategy that joined two members of this group
    pub strategies: BTreeSet<MatchStrategy>,
}

impl DuplicateGroup {
    pub fn is_duplicate(&self) -> bool {
        self.members.len() > 1
    }
}

// ============================================================================
// UNION-FIND
// ============================================================================

/// Disjoint sets over record positions. The root of a set is always its
/// smallest member so grouping is independent of union order.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        DisjointSet {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[high] = low;
        }
    }
}

// ============================================================================
// DEDUPLICATION ENGINE
// ============================================================================

pub struct DeduplicationEngine {
    pub match_on_email: bool,
    pub match_on_phone: bool,
    pub match_on_name_company: bool,
}

impl DeduplicationEngine {
    /// Create engine with every strategy enabled
    pub fn new() -> Self {
        DeduplicationEngine {
            match_on_email: true,
            match_on_phone: true,
            match_on_name_company: true,
        }
    }

    /// Find direct matches. Each record is linked to the first earlier record
    /// sharing a key; transitive closure is left to `group`.
    pub fn find_duplicates(&self, records: &[ContactRecord]) -> Vec<DuplicateMatch> {
        let mut by_email: HashMap<String, usize> = HashMap::new();
        let mut by_phone: HashMap<String, usize> = HashMap::new();
        let mut by_name_company: HashMap<(String, String), usize> = HashMap::new();
        let mut matches = Vec::new();

        for (i, record) in records.iter().enumerate() {
            if self.match_on_email {
                if let Some(key) = record.email_key() {
                    match by_email.get(&key) {
                        Some(&first) => matches.push(DuplicateMatch {
                            first,
                            second: i,
                            strategy: MatchStrategy::Email,
                            reason: format!("Same email: {}", key),
                        }),
                        None => {
                            by_email.insert(key, i);
                        }
                    }
                }
            }

            if self.match_on_phone {
                if let Some(key) = record.phone_key() {
                    match by_phone.get(&key) {
                        Some(&first) => matches.push(DuplicateMatch {
                            first,
                            second: i,
                            strategy: MatchStrategy::Phone,
                            reason: format!("Same phone: {}", key),
                        }),
                        None => {
                            by_phone.insert(key, i);
                        }
                    }
                }
            }

            if self.match_on_name_company {
                if let Some(key) = record.name_company_key() {
                    match by_name_company.get(&key) {
                        Some(&first) => matches.push(DuplicateMatch {
                            first,
                            second: i,
                            strategy: MatchStrategy::NameCompany,
                            reason: format!("Same name and company: {} @ {}", key.0, key.1),
                        }),
                        None => {
                            by_name_company.insert(key, i);
                        }
                    }
                }
            }
        }

        matches
    }

    /// Partition records into groups of duplicates (singletons included),
    /// ordered by each group's earliest member.
    pub fn group(&self, records: &[ContactRecord]) -> Vec<DuplicateGroup> {
        let matches = self.find_duplicates(records);
        group_matches(records.len(), &matches)
    }
}

impl Default for DeduplicationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Transitive closure of direct matches over `count` records.
pub fn group_matches(count: usize, matches: &[DuplicateMatch]) -> Vec<DuplicateGroup> {
    let mut sets = DisjointSet::new(count);
    for m in matches {
        sets.union(m.first, m.second);
    }

    let mut slot_by_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    // Ascending iteration: a group is created at its root, which is its smallest member
    for i in 0..count {
        let root = sets.find(i);
        let slot = *slot_by_root.entry(root).or_insert_with(|| {
            groups.push(DuplicateGroup {
                members: Vec::new(),
                strategies: BTreeSet::new(),
            });
            groups.len() - 1
        });
        groups[slot].members.push(i);
    }

    for m in matches {
        let root = sets.find(m.first);
        if let Some(&slot) = slot_by_root.get(&root) {
            groups[slot].strategies.insert(m.strategy);
        }
    }

    groups
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(index: usize) -> ContactRecord {
        ContactRecord::new(index, "test.csv", index + 2)
    }

    #[test]
    fn test_email_match_case_insensitive() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0).with_email("a@acme.com"),
            create_test_record(1).with_email(" A@ACME.com "),
        ];

        let matches = engine.find_duplicates(&records);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].strategy, MatchStrategy::Email);
        assert_eq!((matches[0].first, matches[0].second), (0, 1));
    }

    #[test]
    fn test_phone_match_ignores_formatting() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0).with_phone("(555) 121-2000"),
            create_test_record(1).with_phone("555.121.2000"),
        ];

        let matches = engine.find_duplicates(&records);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].strategy, MatchStrategy::Phone);
    }

    #[test]
    fn test_short_phone_never_matches() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0).with_phone("0"),
            create_test_record(1).with_phone("0"),
        ];

        assert!(engine.find_duplicates(&records).is_empty());
    }

    #[test]
    fn test_name_company_match() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0).with_name("Ann  Lee").with_company("Acme"),
            create_test_record(1).with_name("ann lee").with_company("ACME"),
            create_test_record(2).with_name("Ann Lee").with_company("Globex"),
        ];

        let matches = engine.find_duplicates(&records);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].strategy, MatchStrategy::NameCompany);
        assert_eq!(matches[0].second, 1);
    }

    #[test]
    fn test_name_alone_does_not_match() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0).with_name("Ann Lee").with_email("ann@a.com"),
            create_test_record(1).with_name("Ann Lee").with_email("ann@b.com"),
        ];

        assert!(engine.find_duplicates(&records).is_empty());
    }

    #[test]
    fn test_transitive_grouping() {
        let engine = DeduplicationEngine::new();
        // A~B by email, B~C by phone, A and C share nothing
        let records = vec![
            create_test_record(0).with_email("a@acme.com"),
            create_test_record(1).with_email("A@acme.com").with_phone("5551212000"),
            create_test_record(2).with_phone("555-121-2000"),
            create_test_record(3).with_email("other@globex.com"),
        ];

        let groups = engine.group(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec![0, 1, 2]);
        assert!(groups[0].strategies.contains(&MatchStrategy::Email));
        assert!(groups[0].strategies.contains(&MatchStrategy::Phone));
        assert_eq!(groups[1].members, vec![3]);
        assert!(!groups[1].is_duplicate());
    }

    #[test]
    fn test_groups_ordered_by_first_member() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0).with_email("x@one.com"),
            create_test_record(1).with_email("y@two.com"),
            create_test_record(2).with_email("X@one.com"),
        ];

        let groups = engine.group(&records);

        assert_eq!(groups[0].members, vec![0, 2]);
        assert_eq!(groups[1].members, vec![1]);
    }

    #[test]
    fn test_late_bridge_joins_earlier_groups() {
        let engine = DeduplicationEngine::new();
        // Record 2 bridges two groups formed earlier
        let records = vec![
            create_test_record(0).with_email("a@acme.com"),
            create_test_record(1).with_phone("5551212000"),
            create_test_record(2).with_email("a@acme.com").with_phone("5551212000"),
        ];

        let groups = engine.group(&records);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![0, 1, 2]);
    }

    #[test]
    fn test_disabled_strategy() {
        let mut engine = DeduplicationEngine::new();
        engine.match_on_phone = false;
        let records = vec![
            create_test_record(0).with_phone("5551212000"),
            create_test_record(1).with_phone("5551212000"),
        ];

        assert!(engine.find_duplicates(&records).is_empty());
    }
}
