use async_trait::async_trait;

use crate::cache::ContentChange;
use crate::domain::entities::FLAG_FEATURED;
use crate::domain::fronts::FrontConfig;
use crate::domain::items::RegionMap;
use crate::domain::query::{QueryFilter, QuerySpec};

use super::{
    BuildContext, FrontStrategy, REGION_HERO, REGION_RAILS, REGION_SIDEBAR, merged_region_specs,
    query_regions,
};

pub const HOME_KIND: &str = "home";

const HERO_LIMIT: u32 = 1;
const RAILS_LIMIT: u32 = 6;
const SIDEBAR_LIMIT: u32 = 4;

/// Default home regions: featured hero, latest rails, latest sidebar.
pub fn home_region_defaults() -> Vec<(&'static str, QuerySpec)> {
    vec![
        (
            REGION_HERO,
            QuerySpec::latest(HERO_LIMIT).with_filter(QueryFilter::flag(FLAG_FEATURED)),
        ),
        (REGION_RAILS, QuerySpec::latest(RAILS_LIMIT)),
        (REGION_SIDEBAR, QuerySpec::latest(SIDEBAR_LIMIT)),
    ]
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HomeFront;

#[async_trait]
impl FrontStrategy for HomeFront {
    fn kind(&self) -> &str {
        HOME_KIND
    }

    async fn build_regions(&self, config: &FrontConfig, ctx: &BuildContext<'_>) -> RegionMap {
        query_regions(ctx, merged_region_specs(config, home_region_defaults())).await
    }

    /// Any record change may surface on the home front; term edits do not.
    fn is_affected_by(&self, _config: &FrontConfig, change: &ContentChange) -> bool {
        matches!(change, ContentChange::Records { .. })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::domain::entities::TermRef;

    #[test]
    fn defaults_match_home_layout() {
        let defaults = home_region_defaults();
        let names: Vec<&str> = defaults.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec![REGION_HERO, REGION_RAILS, REGION_SIDEBAR]);
        assert_eq!(defaults[0].1.limit, 1);
        assert_eq!(defaults[0].1.filters, vec![QueryFilter::flag(FLAG_FEATURED)]);
        assert_eq!(defaults[1].1.limit, 6);
        assert!(defaults[1].1.filters.is_empty());
        assert_eq!(defaults[2].1.limit, 4);
    }

    #[test]
    fn config_overrides_replace_defaults_and_add_regions() {
        let config = FrontConfig::new("home", HOME_KIND)
            .with_region_spec(REGION_RAILS, QuerySpec::latest(3))
            .with_region_spec("opinion", QuerySpec::latest(2));
        let specs = merged_region_specs(&config, home_region_defaults());
        let rails = specs
            .iter()
            .find(|(name, _)| name == REGION_RAILS)
            .expect("rails present");
        assert_eq!(rails.1.limit, 3);
        assert!(specs.iter().any(|(name, _)| name == "opinion"));
        assert_eq!(specs.len(), 4);
    }

    #[test]
    fn only_record_changes_affect_home() {
        let config = FrontConfig::new("home", HOME_KIND);
        let records = ContentChange::Records {
            terms: BTreeSet::from([TermRef::new("category", "world")]),
        };
        let term = ContentChange::Term(TermRef::new("category", "world"));
        assert!(HomeFront.is_affected_by(&config, &records));
        assert!(!HomeFront.is_affected_by(&config, &term));
    }
}
