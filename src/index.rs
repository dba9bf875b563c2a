//! In-memory search structures over the cumulative store.
//!
//! [`SearchIndex`] keeps every stored [`Record`] together with three lookup
//! tables:
//!
//! - the set of [`DedupKey`]s, to enforce uniqueness;
//! - normalized title → records, for exact lookups;
//! - token → postings (record, term frequency), for full-text lookups.
//!
//! Records are only ever appended; a record's position in `records` is its
//! insertion order and serves as the final tie-break in every ordering.

use crate::models::{DedupKey, Record};
use crate::utils::{normalize_title, squash_whitespace, tokenize};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

type DocId = usize;

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: DocId,
    tf: u32,
}

/// Sort direction on `collected_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

/// Filtered listing over the store.
///
/// `date_from` is inclusive, `date_to` exclusive. `q` is a case-insensitive
/// substring of the title; `None` or blank matches everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
    pub order: Order,
}

impl Default for SearchQuery {
    fn default() -> Self {
        SearchQuery {
            q: None,
            date_from: None,
            date_to: None,
            limit: 50,
            offset: 0,
            order: Order::Desc,
        }
    }
}

#[derive(Debug, Default)]
pub struct SearchIndex {
    records: Vec<Record>,
    keys: HashSet<DedupKey>,
    exact: HashMap<String, Vec<DocId>>,
    postings: HashMap<String, Vec<Posting>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.contains(key)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Index `record`. Returns `false` and leaves the index untouched if a
    /// record with the same key is already present.
    pub fn insert(&mut self, record: Record) -> bool {
        let key = record.key();
        if self.keys.contains(&key) {
            return false;
        }
        let doc = self.records.len();

        self.exact
            .entry(key.normalized_title().to_string())
            .or_default()
            .push(doc);
        for (token, tf) in tokenize(&record.title).into_iter().counts() {
            self.postings.entry(token).or_default().push(Posting {
                doc,
                tf: tf as u32,
            });
        }
        self.keys.insert(key);
        self.records.push(record);
        true
    }

    /// Newest first, insertion order among equal timestamps.
    fn by_recency(&self, mut docs: Vec<DocId>) -> Vec<Record> {
        docs.sort_by_key(|&d| (Reverse(self.records[d].collected_at), d));
        docs.into_iter().map(|d| self.records[d].clone()).collect()
    }

    /// Records whose title equals `text` after normalization.
    pub fn query_exact(&self, text: &str) -> Vec<Record> {
        let needle = normalize_title(text);
        if needle.is_empty() {
            return Vec::new();
        }
        match self.exact.get(&needle) {
            Some(docs) => self.by_recency(docs.clone()),
            None => Vec::new(),
        }
    }

    /// Records whose title contains `text`, case-insensitively.
    pub fn query_substring(&self, text: &str) -> Vec<Record> {
        let needle = normalize_title(text);
        if needle.is_empty() {
            return Vec::new();
        }
        let docs = (0..self.records.len())
            .filter(|&d| self.records[d].title.to_lowercase().contains(&needle))
            .collect();
        self.by_recency(docs)
    }

    /// Records containing every token of `text`, best match first.
    ///
    /// The score is the summed term frequency of the query tokens in the
    /// title. Ties go to the newest `collected_at`, then to insertion order.
    pub fn query_fulltext(&self, text: &str) -> Vec<Record> {
        let tokens: Vec<String> = tokenize(text).into_iter().unique().collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut hits: HashMap<DocId, (u32, usize)> = HashMap::new();
        for token in &tokens {
            let Some(postings) = self.postings.get(token) else {
                return Vec::new();
            };
            for p in postings {
                let entry = hits.entry(p.doc).or_insert((0, 0));
                entry.0 += p.tf;
                entry.1 += 1;
            }
        }

        hits.into_iter()
            .filter(|(_, (_, matched))| *matched == tokens.len())
            .map(|(doc, (score, _))| (doc, score))
            .sorted_by_key(|&(doc, score)| {
                (Reverse(score), Reverse(self.records[doc].collected_at), doc)
            })
            .map(|(doc, _)| self.records[doc].clone())
            .collect()
    }

    /// Filtered, ordered, paginated listing.
    pub fn search(&self, query: &SearchQuery) -> Vec<Record> {
        let needle = query
            .q
            .as_deref()
            .map(|q| squash_whitespace(q).to_lowercase())
            .filter(|q| !q.is_empty());

        let mut docs: Vec<DocId> = (0..self.records.len())
            .filter(|&d| {
                let r = &self.records[d];
                query.date_from.is_none_or(|from| r.collected_at >= from)
                    && query.date_to.is_none_or(|to| r.collected_at < to)
                    && needle
                        .as_ref()
                        .is_none_or(|n| r.title.to_lowercase().contains(n))
            })
            .collect();

        match query.order {
            Order::Asc => docs.sort_by_key(|&d| (self.records[d].collected_at, d)),
            Order::Desc => docs.sort_by_key(|&d| (Reverse(self.records[d].collected_at), d)),
        }

        docs.into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|d| self.records[d].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceUrl;
    use chrono::{Duration, TimeZone};

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, day, 12, 0, 0).unwrap()
    }

    fn rec(url: &str, title: &str, day: u32) -> Record {
        Record::new(SourceUrl::parse(url).unwrap(), title, ts(day))
    }

    fn titles(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_empty_index_queries() {
        let idx = SearchIndex::new();
        assert!(idx.query_exact("anything").is_empty());
        assert!(idx.query_fulltext("anything").is_empty());
        assert!(idx.query_substring("anything").is_empty());
        assert!(idx.search(&SearchQuery::default()).is_empty());
    }

    #[test]
    fn test_empty_query_strings() {
        let mut idx = SearchIndex::new();
        idx.insert(rec("https://ex.com/a", "Alpha", 1));
        assert!(idx.query_exact("").is_empty());
        assert!(idx.query_exact("   ").is_empty());
        assert!(idx.query_fulltext("").is_empty());
        assert!(idx.query_fulltext("!!! ---").is_empty());
        assert!(idx.query_substring(" ").is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let mut idx = SearchIndex::new();
        assert!(idx.insert(rec("https://ex.com/a", "Hello World", 1)));
        assert!(!idx.insert(rec("https://ex.com/a", " HELLO   world ", 2)));
        assert!(idx.insert(rec("https://ex.com/b", "Hello World", 2)));
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_normalization_equivalence_exact() {
        let mut idx = SearchIndex::new();
        idx.insert(rec("https://ex.com/a", "Hello World", 1));
        idx.insert(rec("https://ex.com/b", "hello   world", 2));
        idx.insert(rec("https://ex.com/c", " HELLO WORLD ", 3));
        idx.insert(rec("https://ex.com/d", "Hello Worlds", 3));

        for q in ["hello world", "Hello World", "  HELLO  WORLD "] {
            let got = idx.query_exact(q);
            assert_eq!(got.len(), 3, "{q}");
            let urls: Vec<&str> = got.iter().map(|r| r.source_url.as_str()).collect();
            assert_eq!(urls, vec!["https://ex.com/c", "https://ex.com/b", "https://ex.com/a"]);
        }
    }

    #[test]
    fn test_fulltext_ranking() {
        let mut idx = SearchIndex::new();
        idx.insert(rec("https://ex.com/a", "Local Election Results 2024", 1));
        idx.insert(rec("https://ex.com/b", "National Election Preview", 2));

        let both = idx.query_fulltext("election");
        assert_eq!(both.len(), 2);
        // equal scores: newest first
        assert_eq!(titles(&both), vec!["National Election Preview", "Local Election Results 2024"]);

        let ranked = idx.query_fulltext("election results");
        assert_eq!(titles(&ranked)[0], "Local Election Results 2024");
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_fulltext_term_frequency_score() {
        let mut idx = SearchIndex::new();
        idx.insert(rec("https://ex.com/a", "Rust news", 5));
        idx.insert(rec("https://ex.com/b", "Rust, rust and more Rust", 1));
        let got = idx.query_fulltext("RUST rust");
        assert_eq!(titles(&got), vec!["Rust, rust and more Rust", "Rust news"]);
    }

    #[test]
    fn test_fulltext_tie_breaks_on_insertion() {
        let mut idx = SearchIndex::new();
        idx.insert(rec("https://ex.com/a", "Weather today", 3));
        idx.insert(rec("https://ex.com/b", "Weather tomorrow", 3));
        let got = idx.query_fulltext("weather");
        assert_eq!(titles(&got), vec!["Weather today", "Weather tomorrow"]);
    }

    #[test]
    fn test_fulltext_requires_all_tokens() {
        let mut idx = SearchIndex::new();
        idx.insert(rec("https://ex.com/a", "Budget vote delayed", 1));
        assert!(idx.query_fulltext("budget sports").is_empty());
        assert_eq!(idx.query_fulltext("vote-budget").len(), 1);
    }

    #[test]
    fn test_substring_case_insensitive() {
        let mut idx = SearchIndex::new();
        idx.insert(rec("https://ex.com/a", "Alpha Note", 1));
        idx.insert(rec("https://ex.com/b", "Beta News", 2));
        idx.insert(rec("https://ex.com/c", "Newsletter Gamma", 3));
        let got = idx.query_substring("NEWS");
        assert_eq!(titles(&got), vec!["Newsletter Gamma", "Beta News"]);
    }

    #[test]
    fn test_search_filters_and_order() {
        let mut idx = SearchIndex::new();
        idx.insert(rec("https://ex.com/a", "Alpha Note", 26));
        idx.insert(rec("https://ex.com/b", "Beta News", 27));
        idx.insert(rec("https://ex.com/c", "Gamma Blog", 28));

        let kw = idx.search(&SearchQuery {
            q: Some("news".into()),
            limit: 10,
            ..Default::default()
        });
        assert_eq!(titles(&kw), vec!["Beta News"]);

        let ranged = idx.search(&SearchQuery {
            date_from: Some(ts(27)),
            date_to: Some(ts(28)),
            order: Order::Asc,
            ..Default::default()
        });
        assert_eq!(titles(&ranged), vec!["Beta News"]);

        let desc = idx.search(&SearchQuery {
            limit: 2,
            ..Default::default()
        });
        assert_eq!(titles(&desc), vec!["Gamma Blog", "Beta News"]);

        let page = idx.search(&SearchQuery {
            order: Order::Asc,
            offset: 1,
            limit: 5,
            ..Default::default()
        });
        assert_eq!(titles(&page), vec!["Beta News", "Gamma Blog"]);

        let later = idx.search(&SearchQuery {
            date_from: Some(ts(28) + Duration::seconds(1)),
            ..Default::default()
        });
        assert!(later.is_empty());
    }
}
