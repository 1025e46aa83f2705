//! Regions and the shared record → item projection.

use std::collections::{BTreeMap, HashSet};

use chrono_tz::Tz;
use frontpage_types::{Item, ItemFlags, RegionProjection};
use serde::{Deserialize, Serialize};
use time::{Date, format_description::FormatItem, macros::format_description};

use super::entities::{ContentRecord, FLAG_BREAKING, FLAG_EXCLUSIVE, FLAG_SPONSORED, Term};
use super::query::QuerySpec;
use crate::util::timezone;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
pub const EXCERPT_WORD_LIMIT: usize = 40;
const ELLIPSIS: &str = "…";

/// Regions of one front keyed by name. Ordered so that serialized snapshots
/// are byte-stable.
pub type RegionMap = BTreeMap<String, Region>;

/// A named content area, regenerated wholesale whenever its front rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub items: Vec<Item>,
    pub query: QuerySpec,
    pub found_count: u64,
}

impl Region {
    /// Region with no items, used when a query cannot be served.
    pub fn empty(name: impl Into<String>, query: QuerySpec) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            query,
            found_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&Region> for RegionProjection {
    fn from(region: &Region) -> Self {
        Self {
            name: region.name.clone(),
            items: region.items.clone(),
            found_count: region.found_count,
        }
    }
}

pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

pub fn item_flags(record: &ContentRecord) -> ItemFlags {
    ItemFlags {
        breaking: record.has_flag(FLAG_BREAKING),
        exclusive: record.has_flag(FLAG_EXCLUSIVE),
        sponsored: record.has_flag(FLAG_SPONSORED),
    }
}

/// Project a repository record into a display item.
pub fn project_record(record: &ContentRecord, tz: Tz) -> Item {
    let localized = timezone::localized_datetime(record.published_at, tz);
    let date = timezone::localized_date(record.published_at, tz);
    let flags = item_flags(record);

    let excerpt = if record.excerpt.trim().is_empty() {
        derive_excerpt(&record.body, EXCERPT_WORD_LIMIT)
    } else {
        sanitize_text(&record.excerpt)
    };

    Item {
        id: record.id.clone(),
        title: record.title.clone(),
        url: record
            .url
            .clone()
            .unwrap_or_else(|| format!("/{}/{}", record.kind, record.slug)),
        excerpt,
        published_at: Some(localized.to_rfc3339()),
        published_label: format_human_date(date),
        author: record.author.clone(),
        media_ref: record.media_ref.clone(),
        flags,
        flag_label: flags.label(),
    }
}

/// Project a taxonomy term into an item for subsection listings.
pub fn project_term(term: &Term) -> Item {
    Item {
        id: term.id.clone(),
        title: term.name.clone(),
        url: format!("/{}/{}", term.taxonomy, term.slug),
        excerpt: term
            .description
            .as_deref()
            .map(sanitize_text)
            .unwrap_or_default(),
        published_at: None,
        published_label: String::new(),
        author: None,
        media_ref: None,
        flags: ItemFlags::default(),
        flag_label: String::new(),
    }
}

/// Strip every tag and return plain text. The result is not markup:
/// templates escape it on output.
pub fn sanitize_text(input: &str) -> String {
    let cleaned = ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string();
    unescape_text(cleaned.trim())
}

/// Reverse the entity escaping ammonia applies to text nodes.
/// `&amp;` goes last so escaped entities stay literal.
fn unescape_text(escaped: &str) -> String {
    escaped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// Build an excerpt from body markup, capped at `word_limit` words.
pub fn derive_excerpt(body: &str, word_limit: usize) -> String {
    let text = sanitize_text(body);
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= word_limit {
        return words.join(" ");
    }
    format!("{}{ELLIPSIS}", words[..word_limit].join(" "))
}
