//! Page record types shared between the crawler, the gateway and the storage
//! barrels.
//!
//! `SiteRecord` is the unit of crawl output: everything a barrel needs to
//! index one page. Replication metadata lives on `RecordEnvelope`, the wire
//! type, so the record itself carries no protocol state.

use serde::{Deserialize, Serialize};

/// One crawled page. The `url` is the identity: re-storing the same url
/// replaces the whole record. Records are never partially mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub url: String,
    pub title: String,
    pub text: String,
    /// Whitespace-delimited raw tokens as extracted by the crawler.
    pub tokens: String,
    /// Whitespace-delimited absolute urls found on the page.
    pub links: String,
}

impl SiteRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            text: String::new(),
            tokens: String::new(),
            links: String::new(),
        }
    }

    /// True when the record carries nothing beyond its url.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.text.is_empty() && self.tokens.is_empty() && self.links.is_empty()
    }
}

/// Wire envelope for store calls. A `propagated` envelope is a single-hop
/// copy: the receiving barrel indexes it locally and never fans it out again.
/// Registration builds a full mesh, so one hop reaches every peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEnvelope {
    pub record: SiteRecord,
    pub propagated: bool,
}

impl RecordEnvelope {
    /// Envelope for the first write of a record, eligible for fan-out.
    pub fn first_write(record: SiteRecord) -> Self {
        Self {
            record,
            propagated: false,
        }
    }

    /// Copy of `record` marked so receivers do not re-broadcast it.
    pub fn propagated_copy(record: &SiteRecord) -> Self {
        Self {
            record: record.clone(),
            propagated: true,
        }
    }
}

/// Normalizes one raw token: lowercase, strip non-alphanumeric characters,
/// drop anything shorter than two characters.
pub fn normalize_token(raw: &str) -> Option<String> {
    let token: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if token.len() < 2 { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_strips() {
        assert_eq!(normalize_token("Hello!"), Some("hello".to_string()));
        assert_eq!(normalize_token("C++"), None);
        assert_eq!(normalize_token("rust-lang"), Some("rustlang".to_string()));
        assert_eq!(normalize_token("2024"), Some("2024".to_string()));
    }

    #[test]
    fn test_normalize_drops_short_tokens() {
        assert_eq!(normalize_token("a"), None);
        assert_eq!(normalize_token("i!"), None);
        assert_eq!(normalize_token("ab"), Some("ab".to_string()));
    }

    #[test]
    fn test_propagated_copy_keeps_fields() {
        let mut record = SiteRecord::new("http://a.com/");
        record.title = "a page".to_string();
        record.tokens = "cat dog".to_string();

        let envelope = RecordEnvelope::propagated_copy(&record);
        assert!(envelope.propagated);
        assert_eq!(envelope.record, record);

        let first = RecordEnvelope::first_write(record);
        assert!(!first.propagated);
    }

    #[test]
    fn test_record_is_empty() {
        let record = SiteRecord::new("http://a.com/");
        assert!(record.is_empty());

        let mut record = SiteRecord::new("http://a.com/");
        record.links = "http://b.com/".to_string();
        assert!(!record.is_empty());
    }
}
