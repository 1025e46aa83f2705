//! Projection types shared between the frontpage engine and render surfaces.
//!
//! Everything here is a plain serializable snapshot: no handles back into the
//! content repository, no caches, no behaviour beyond formatting helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Separator placed between badge labels in [`ItemFlags::label`].
pub const FLAG_SEPARATOR: &str = " · ";

/// Editorial badges attached to a content item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemFlags {
    pub breaking: bool,
    pub exclusive: bool,
    pub sponsored: bool,
}

impl ItemFlags {
    /// Badge labels for every active flag, in display order.
    pub fn badges(&self) -> Vec<&'static str> {
        let mut badges = Vec::with_capacity(3);
        if self.breaking {
            badges.push("Breaking");
        }
        if self.exclusive {
            badges.push("Exclusive");
        }
        if self.sponsored {
            badges.push("Sponsored");
        }
        badges
    }

    /// Human-readable badge line, empty when no flag is set.
    pub fn label(&self) -> String {
        self.badges().join(FLAG_SEPARATOR)
    }

    pub fn is_empty(&self) -> bool {
        !(self.breaking || self.exclusive || self.sponsored)
    }
}

/// Display projection of a single content entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Tag-free plain text. Escape it when embedding in markup.
    pub excerpt: String,
    /// RFC 3339 timestamp in the site timezone.
    pub published_at: Option<String>,
    /// Human date label, e.g. `March 5, 2026`.
    pub published_label: String,
    pub author: Option<String>,
    pub media_ref: Option<String>,
    pub flags: ItemFlags,
    pub flag_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionProjection {
    pub name: String,
    pub items: Vec<Item>,
    pub found_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementProjection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub region: String,
    pub priority: i32,
    pub conditions: Vec<String>,
}

/// Serializable snapshot of a composed front, suitable for JSON encoding or
/// template consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontProjection {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub regions: BTreeMap<String, RegionProjection>,
    pub placements: Vec<PlacementProjection>,
}

impl FrontProjection {
    /// Placements attached to `region`, in the order they were projected.
    pub fn placements_for<'a>(
        &'a self,
        region: &'a str,
    ) -> impl Iterator<Item = &'a PlacementProjection> + 'a {
        self.placements
            .iter()
            .filter(move |placement| placement.region == region)
    }
}
