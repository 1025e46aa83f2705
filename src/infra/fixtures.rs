//! JSON content fixtures for the in-memory repository.
//!
//! ```json
//! {
//!   "terms": [{ "id": "1", "slug": "world", "name": "World" }],
//!   "records": [{
//!     "id": "100", "slug": "hello", "title": "Hello",
//!     "published_at": "2026-03-02T08:00:00Z",
//!     "terms": [{ "taxonomy": "category", "slug": "world" }],
//!     "flags": ["featured"]
//!   }]
//! }
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::domain::entities::{ContentRecord, Term, TermRef};
use crate::domain::fronts::DEFAULT_TAXONOMY;
use crate::domain::query::DEFAULT_CONTENT_KIND;

use super::error::InfraError;
use super::memory::InMemoryContentRepository;

#[derive(Debug, Default, Deserialize)]
pub struct ContentFixture {
    #[serde(default)]
    pub terms: Vec<TermFixture>,
    #[serde(default)]
    pub records: Vec<RecordFixture>,
}

#[derive(Debug, Deserialize)]
pub struct TermFixture {
    pub id: String,
    #[serde(default = "default_taxonomy")]
    pub taxonomy: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecordFixture {
    pub id: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub media_ref: Option<String>,
    /// RFC 3339 timestamp.
    pub published_at: String,
    #[serde(default)]
    pub terms: Vec<TermRef>,
    #[serde(default)]
    pub flags: BTreeSet<String>,
}

fn default_taxonomy() -> String {
    DEFAULT_TAXONOMY.to_string()
}

fn default_kind() -> String {
    DEFAULT_CONTENT_KIND.to_string()
}

impl ContentFixture {
    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, InfraError> {
        serde_json::from_str(raw).map_err(|err| InfraError::fixture(origin, err.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, InfraError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw, &path.display().to_string())
    }

    /// Convert into domain values, failing on the first bad timestamp.
    pub fn into_parts(self, origin: &str) -> Result<(Vec<Term>, Vec<ContentRecord>), InfraError> {
        let terms = self
            .terms
            .into_iter()
            .map(|term| Term {
                id: term.id,
                taxonomy: term.taxonomy,
                slug: term.slug,
                name: term.name,
                description: term.description,
                parent_id: term.parent_id,
                order: term.order,
                count: 0,
            })
            .collect();

        let records = self
            .records
            .into_iter()
            .map(|record| {
                let published_at =
                    OffsetDateTime::parse(&record.published_at, &Rfc3339).map_err(|err| {
                        InfraError::fixture(
                            origin,
                            format!(
                                "record `{}` has invalid published_at `{}`: {err}",
                                record.id, record.published_at
                            ),
                        )
                    })?;
                Ok(ContentRecord {
                    id: record.id,
                    kind: record.kind,
                    slug: record.slug,
                    title: record.title,
                    excerpt: record.excerpt,
                    body: record.body,
                    url: record.url,
                    author: record.author,
                    media_ref: record.media_ref,
                    published_at,
                    terms: record.terms,
                    flags: record.flags,
                })
            })
            .collect::<Result<Vec<_>, InfraError>>()?;

        Ok((terms, records))
    }
}

/// Build a repository from a JSON fixture file.
pub fn load_repository(path: &Path) -> Result<InMemoryContentRepository, InfraError> {
    let origin = path.display().to_string();
    let (terms, records) = ContentFixture::from_file(path)?.into_parts(&origin)?;
    info!(
        path = %origin,
        terms = terms.len(),
        records = records.len(),
        "Content fixture loaded"
    );
    Ok(InMemoryContentRepository::new()
        .with_terms(terms)
        .with_records(records))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use time::macros::datetime;

    use super::*;

    const FIXTURE: &str = r#"{
        "terms": [
            { "id": "1", "slug": "world", "name": "World" },
            { "id": "2", "slug": "europe", "name": "Europe", "parent_id": "1", "order": 3 }
        ],
        "records": [{
            "id": "100",
            "slug": "hello",
            "title": "Hello",
            "published_at": "2026-03-02T08:00:00Z",
            "terms": [{ "taxonomy": "category", "slug": "europe" }],
            "flags": ["featured"]
        }]
    }"#;

    #[test]
    fn fixture_fills_defaults_and_parses_timestamps() {
        let (terms, records) = ContentFixture::from_json_str(FIXTURE, "inline")
            .expect("parse fixture")
            .into_parts("inline")
            .expect("convert fixture");

        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].taxonomy, DEFAULT_TAXONOMY);
        assert_eq!(terms[1].parent_id.as_deref(), Some("1"));
        assert_eq!(records[0].kind, DEFAULT_CONTENT_KIND);
        assert_eq!(records[0].published_at, datetime!(2026-03-02 08:00 UTC));
        assert!(records[0].has_flag("featured"));
    }

    #[test]
    fn bad_timestamp_names_the_record() {
        let raw = r#"{"records": [{"id": "7", "slug": "x", "title": "X", "published_at": "yesterday"}]}"#;
        let err = ContentFixture::from_json_str(raw, "inline")
            .expect("parse fixture")
            .into_parts("inline")
            .expect_err("timestamp rejected");
        assert!(err.to_string().contains("record `7`"));
    }

    #[test]
    fn load_repository_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(FIXTURE.as_bytes()).expect("write fixture");

        let repo = load_repository(file.path()).expect("load repository");
        assert_eq!(repo.record_count(), 1);
        assert!(repo.record("100").is_some());
    }
}
