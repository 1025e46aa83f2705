use askama::{Error as AskamaError, Template};
use frontpage_types::Item;
use thiserror::Error;

use crate::domain::items::Region;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) origin: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(origin: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            origin,
            public_message,
            error,
        }
    }

    pub fn origin(&self) -> &'static str {
        self.origin
    }
}

fn render_template<T: Template>(
    template: T,
    origin: &'static str,
) -> Result<String, TemplateRenderError> {
    template
        .render()
        .map_err(|err| TemplateRenderError::new(origin, "Template rendering failed", err))
}

#[derive(Template)]
#[template(path = "fronts/article_card.html")]
pub struct ArticleCardTemplate<'a> {
    pub item: &'a Item,
}

#[derive(Template)]
#[template(path = "fronts/placement.html")]
pub struct PlacementTemplate<'a> {
    pub slot_id: &'a str,
    pub region: &'a str,
    pub description: &'a str,
}

/// Region wrapper. `cards` and `placements` are already-rendered fragments.
#[derive(Template)]
#[template(path = "fronts/region.html")]
pub struct RegionTemplate<'a> {
    pub front_id: &'a str,
    pub name: &'a str,
    pub found_count: u64,
    pub cards: Vec<String>,
    pub placements: &'a [String],
}

pub fn render_article_card(item: &Item) -> Result<String, TemplateRenderError> {
    render_template(
        ArticleCardTemplate { item },
        "presentation::views::render_article_card",
    )
}

/// Default placement markup: the slot description as filler text.
pub fn render_placement_filler(
    slot_id: &str,
    region: &str,
    description: &str,
) -> Result<String, TemplateRenderError> {
    render_template(
        PlacementTemplate {
            slot_id,
            region,
            description,
        },
        "presentation::views::render_placement_filler",
    )
}

pub fn render_region(
    front_id: &str,
    region: &Region,
    placements: &[String],
) -> Result<String, TemplateRenderError> {
    let cards = region
        .items
        .iter()
        .map(render_article_card)
        .collect::<Result<Vec<_>, _>>()?;
    render_template(
        RegionTemplate {
            front_id,
            name: &region.name,
            found_count: region.found_count,
            cards,
            placements,
        },
        "presentation::views::render_region",
    )
}
