use async_trait::async_trait;
use tracing::warn;

use crate::cache::ContentChange;
use crate::domain::entities::Term;
use crate::domain::fronts::FrontConfig;
use crate::domain::items::{Region, RegionMap, project_term};
use crate::domain::query::{QuerySpec, TermOrder};

use super::home::home_region_defaults;
use super::{BuildContext, FrontStrategy, REGION_SUBSECTIONS, merged_region_specs, query_regions};

pub const SECTION_KIND: &str = "section";

/// Content kind recorded on the subsections region query.
pub const TERM_QUERY_KIND: &str = "term";

/// Home layout scoped to one taxonomy term, plus its non-empty child terms.
#[derive(Debug, Default, Clone, Copy)]
pub struct SectionFront;

impl SectionFront {
    async fn resolve_term(&self, config: &FrontConfig, ctx: &BuildContext<'_>) -> Option<Term> {
        let Some(slug) = config.term.as_deref() else {
            warn!(front_id = ctx.front_id, "Section front has no term configured");
            return None;
        };

        match ctx.repository.resolve_term(&config.taxonomy, slug).await {
            Ok(Some(term)) => Some(term),
            Ok(None) => {
                warn!(
                    front_id = ctx.front_id,
                    taxonomy = %config.taxonomy,
                    term = slug,
                    "Section term did not resolve; serving no regions"
                );
                None
            }
            Err(err) => {
                warn!(
                    front_id = ctx.front_id,
                    taxonomy = %config.taxonomy,
                    term = slug,
                    error = %err,
                    "Section term lookup failed; serving no regions"
                );
                None
            }
        }
    }

    async fn subsections(&self, config: &FrontConfig, ctx: &BuildContext<'_>, term: &Term) -> Region {
        let spec = config
            .region_spec_or(
                REGION_SUBSECTIONS,
                QuerySpec {
                    kind: TERM_QUERY_KIND.to_string(),
                    ..QuerySpec::default()
                },
            )
            .scoped_to(&term.taxonomy, &term.slug);

        let children = match ctx.repository.child_terms(&term.id, TermOrder::Order).await {
            Ok(children) => children,
            Err(err) => {
                warn!(
                    front_id = ctx.front_id,
                    region = REGION_SUBSECTIONS,
                    error = %err,
                    "Child term lookup failed; serving empty region"
                );
                return Region::empty(REGION_SUBSECTIONS, spec);
            }
        };

        let populated: Vec<&Term> = children.iter().filter(|child| child.count > 0).collect();
        let found_count = populated.len() as u64;
        let limit = usize::try_from(spec.limit).unwrap_or(usize::MAX);
        Region {
            name: REGION_SUBSECTIONS.to_string(),
            items: populated.into_iter().take(limit).map(project_term).collect(),
            query: spec,
            found_count,
        }
    }
}

#[async_trait]
impl FrontStrategy for SectionFront {
    fn kind(&self) -> &str {
        SECTION_KIND
    }

    async fn build_regions(&self, config: &FrontConfig, ctx: &BuildContext<'_>) -> RegionMap {
        let Some(term) = self.resolve_term(config, ctx).await else {
            return RegionMap::new();
        };

        let specs = merged_region_specs(config, home_region_defaults())
            .into_iter()
            .filter(|(name, _)| name != REGION_SUBSECTIONS)
            .map(|(name, spec)| (name, spec.scoped_to(&term.taxonomy, &term.slug)))
            .collect();

        let (mut regions, subsections) = futures::join!(
            query_regions(ctx, specs),
            self.subsections(config, ctx, &term)
        );
        regions.insert(REGION_SUBSECTIONS.to_string(), subsections);
        regions
    }

    /// Term edits may rename or re-parent subsections, so they always apply.
    fn is_affected_by(&self, config: &FrontConfig, change: &ContentChange) -> bool {
        if change.is_unscoped() {
            return true;
        }
        match change {
            ContentChange::Term(_) => true,
            ContentChange::Records { .. } => config
                .term
                .as_deref()
                .is_some_and(|slug| change.touches_term(&config.taxonomy, slug)),
        }
    }
}
