//! In-memory index state for one storage barrel.
//!
//! The four derived maps (inverted index, reference counts, incoming links,
//! url texts) live behind a single read-write lock so a query observes a
//! consistent snapshot of all of them. The raw record set has its own lock:
//! it is the only persisted structure, and every derived map is a pure replay
//! of it. Locks are never held across await points.

use crate::barrel::protocol::StateSnapshot;
use crate::site::{SiteRecord, normalize_token};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The derived maps, guarded as a unit.
#[derive(Debug, Default)]
pub struct Indexes {
    /// token -> urls containing it. Every key maps to a non-empty set.
    pub inverted_index: HashMap<String, HashSet<String>>,
    /// url -> incoming-link occurrences seen across stored pages.
    pub url_references: HashMap<String, u64>,
    /// target url -> unique referrer urls in first-seen order.
    pub incoming_links: HashMap<String, Vec<String>>,
    /// url -> page text. Local writes overwrite; merges fill gaps only.
    pub url_texts: HashMap<String, String>,
}

pub struct BarrelState {
    indexes: RwLock<Indexes>,
    records: Mutex<HashMap<String, SiteRecord>>,
}

impl BarrelState {
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(Indexes::default()),
            records: Mutex::new(HashMap::new()),
        }
    }

    // A poisoned lock means a panic mid-update; the maps stay usable and are
    // reproducible from the record set, so we keep serving.
    fn read_indexes(&self) -> RwLockReadGuard<'_, Indexes> {
        self.indexes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_indexes(&self) -> RwLockWriteGuard<'_, Indexes> {
        self.indexes.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_records(&self) -> MutexGuard<'_, HashMap<String, SiteRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Indexes one record into the derived maps and upserts it into the
    /// record set. Empty fields are skipped individually so partially-bad
    /// crawl data never blocks indexing of the rest. Returns false only when
    /// the record has no url.
    pub fn process_local(&self, record: &SiteRecord) -> bool {
        if record.url.trim().is_empty() {
            tracing::warn!("Refusing to process record with empty url");
            return false;
        }

        {
            let mut indexes = self.write_indexes();

            if !record.text.is_empty() {
                indexes.url_texts.insert(record.url.clone(), record.text.clone());
            }

            if !record.tokens.is_empty() {
                for raw in record.tokens.split_whitespace() {
                    if let Some(token) = normalize_token(raw) {
                        indexes
                            .inverted_index
                            .entry(token)
                            .or_default()
                            .insert(record.url.clone());
                    }
                }
            }

            if !record.links.is_empty() {
                for link in record.links.split_whitespace() {
                    // Occurrence count: duplicates on one page count twice
                    *indexes.url_references.entry(link.to_string()).or_insert(0) += 1;

                    let referrers = indexes.incoming_links.entry(link.to_string()).or_default();
                    if !referrers.contains(&record.url) {
                        referrers.push(record.url.clone());
                    }
                }
            }
        }

        self.lock_records().insert(record.url.clone(), record.clone());
        true
    }

    /// Shared ranking for both query types: descending global reference
    /// count, lexicographic url order on ties. Urls nobody links to yet rank
    /// at count zero.
    fn rank_by_references(indexes: &Indexes, urls: impl IntoIterator<Item = String>) -> Vec<String> {
        let mut ranked: Vec<(u64, String)> = urls
            .into_iter()
            .map(|url| (indexes.url_references.get(&url).copied().unwrap_or(0), url))
            .collect();

        ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        ranked.into_iter().map(|(_, url)| url).collect()
    }

    /// AND-semantics keyword search: returns urls matching every term,
    /// ranked by global reference count. Empty input yields an empty result.
    pub fn search_pages_by_words(&self, words: &[String]) -> Vec<String> {
        let terms: HashSet<String> = words
            .iter()
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();

        if terms.is_empty() {
            return Vec::new();
        }

        let indexes = self.read_indexes();

        let mut match_counts: HashMap<&String, usize> = HashMap::new();
        for term in &terms {
            if let Some(pages) = indexes.inverted_index.get(term) {
                for page in pages {
                    *match_counts.entry(page).or_insert(0) += 1;
                }
            }
        }

        let matching = match_counts
            .into_iter()
            .filter(|(_, count)| *count == terms.len())
            .map(|(url, _)| url.clone())
            .collect::<Vec<_>>();

        Self::rank_by_references(&indexes, matching)
    }

    /// Referrers of `url`, ranked through the same function as search.
    pub fn incoming_links_for_url(&self, url: &str) -> Vec<String> {
        if url.trim().is_empty() {
            return Vec::new();
        }

        let indexes = self.read_indexes();
        let Some(referrers) = indexes.incoming_links.get(url) else {
            return Vec::new();
        };

        Self::rank_by_references(&indexes, referrers.iter().cloned())
    }

    pub fn reference_count(&self, url: &str) -> u64 {
        self.read_indexes().url_references.get(url).copied().unwrap_or(0)
    }

    /// Copy of the record set, for persistence and join-time re-broadcast.
    pub fn records(&self) -> HashMap<String, SiteRecord> {
        self.lock_records().clone()
    }

    pub fn record_count(&self) -> usize {
        self.lock_records().len()
    }

    /// Full-state copy for peer sync. The index maps are cloned under one
    /// read guard; the record set is copied after, never nested inside it.
    pub fn snapshot(&self) -> StateSnapshot {
        let mut snapshot = {
            let indexes = self.read_indexes();
            StateSnapshot {
                records: HashMap::new(),
                inverted_index: indexes.inverted_index.clone(),
                url_references: indexes.url_references.clone(),
                incoming_links: indexes.incoming_links.clone(),
                url_texts: indexes.url_texts.clone(),
            }
        };
        snapshot.records = self.records();
        snapshot
    }

    /// Merges a remote barrel's full state into this one:
    /// records merge by url with the remote version winning, posting sets and
    /// referrer lists union, reference counts take the max, texts fill gaps
    /// only (local wins where present).
    pub fn merge_snapshot(&self, remote: StateSnapshot) {
        {
            let mut records = self.lock_records();
            for (url, record) in remote.records {
                records.insert(url, record);
            }
        }

        let mut indexes = self.write_indexes();

        for (token, remote_urls) in remote.inverted_index {
            if remote_urls.is_empty() {
                continue;
            }
            indexes.inverted_index.entry(token).or_default().extend(remote_urls);
        }

        for (url, remote_count) in remote.url_references {
            let local = indexes.url_references.entry(url).or_insert(0);
            *local = (*local).max(remote_count);
        }

        for (target, remote_referrers) in remote.incoming_links {
            let local = indexes.incoming_links.entry(target).or_default();
            for referrer in remote_referrers {
                if !local.contains(&referrer) {
                    local.push(referrer);
                }
            }
        }

        for (url, remote_text) in remote.url_texts {
            indexes.url_texts.entry(url).or_insert(remote_text);
        }
    }

    /// Drops every derived map and replays `loaded` through local
    /// processing. Invoked at startup with the persisted record set; derived
    /// state is always reproducible this way and never persisted itself.
    pub fn replace_records(&self, loaded: HashMap<String, SiteRecord>) {
        {
            let mut indexes = self.write_indexes();
            *indexes = Indexes::default();
        }
        self.lock_records().clear();

        for record in loaded.into_values() {
            self.process_local(&record);
        }
    }
}

impl Default for BarrelState {
    fn default() -> Self {
        Self::new()
    }
}
