//! Placement slots: registration, ordering and condition-gated rendering.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use frontpage_types::PlacementProjection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::conditions::{ConditionEvaluator, RequestContext};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::error::DomainError;
use crate::domain::fronts::PlacementRef;
use crate::domain::slug::validate_identifier;
use crate::presentation::views;

const SOURCE: &str = "application::placements";

pub const SLOT_BREAKING_ALERT: &str = "breaking-alert";
pub const SLOT_HERO_TOP: &str = "hero-top";
pub const SLOT_HERO_BOTTOM: &str = "hero-bottom";
pub const SLOT_RAIL_INLINE: &str = "rail-inline";
pub const SLOT_SIDEBAR_TOP: &str = "sidebar-top";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub region: String,
    /// Lower values render first.
    pub priority: i32,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl SlotDefinition {
    pub fn new(id: impl Into<String>, region: impl Into<String>, priority: i32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            region: region.into(),
            priority,
            conditions: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }
}

impl From<&SlotDefinition> for PlacementProjection {
    fn from(slot: &SlotDefinition) -> Self {
        Self {
            id: slot.id.clone(),
            name: slot.name.clone(),
            description: slot.description.clone(),
            region: slot.region.clone(),
            priority: slot.priority,
            conditions: slot.conditions.clone(),
        }
    }
}

/// Per-slot markup override. Returning `None` defers to the default filler.
pub trait SlotRenderer: Send + Sync {
    fn render(&self, slot: &SlotDefinition, ctx: &RequestContext) -> Option<String>;
}

impl<F> SlotRenderer for F
where
    F: Fn(&SlotDefinition, &RequestContext) -> Option<String> + Send + Sync,
{
    fn render(&self, slot: &SlotDefinition, ctx: &RequestContext) -> Option<String> {
        self(slot, ctx)
    }
}

#[derive(Debug, Clone)]
struct RegisteredSlot {
    sequence: u64,
    definition: SlotDefinition,
}

pub struct PlacementRegistry {
    evaluator: Arc<ConditionEvaluator>,
    slots: RwLock<HashMap<String, RegisteredSlot>>,
    renderers: RwLock<HashMap<String, Arc<dyn SlotRenderer>>>,
    sequence: AtomicU64,
}

impl PlacementRegistry {
    pub fn new(evaluator: Arc<ConditionEvaluator>) -> Self {
        Self {
            evaluator,
            slots: RwLock::new(HashMap::new()),
            renderers: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Registry pre-populated with the built-in slots.
    pub fn with_builtin_slots(evaluator: Arc<ConditionEvaluator>) -> Self {
        let registry = Self::new(evaluator);
        for slot in builtin_slots() {
            if let Err(err) = registry.register(slot) {
                warn!(error = %err, "Skipping invalid built-in slot");
            }
        }
        registry
    }

    pub fn evaluator(&self) -> &Arc<ConditionEvaluator> {
        &self.evaluator
    }

    /// Register a slot. Re-registering an id replaces the previous definition
    /// and moves the slot to the end of the registration order; the replaced
    /// definition is returned.
    pub fn register(&self, slot: SlotDefinition) -> Result<Option<SlotDefinition>, DomainError> {
        validate_identifier("slot.id", &slot.id)?;
        validate_identifier("slot.region", &slot.region)?;

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let slot_id = slot.id.clone();
        let previous = rw_write(&self.slots, SOURCE, "register").insert(
            slot_id.clone(),
            RegisteredSlot {
                sequence,
                definition: slot,
            },
        );

        match &previous {
            Some(_) => warn!(slot_id = %slot_id, "Placement slot overwritten by later registration"),
            None => debug!(slot_id = %slot_id, "Placement slot registered"),
        }
        Ok(previous.map(|registered| registered.definition))
    }

    pub fn register_renderer(&self, slot_id: impl Into<String>, renderer: Arc<dyn SlotRenderer>) {
        rw_write(&self.renderers, SOURCE, "register_renderer").insert(slot_id.into(), renderer);
    }

    pub fn get(&self, slot_id: &str) -> Option<SlotDefinition> {
        rw_read(&self.slots, SOURCE, "get")
            .get(slot_id)
            .map(|registered| registered.definition.clone())
    }

    /// Every slot, ordered by priority then registration order.
    pub fn all(&self) -> Vec<SlotDefinition> {
        let mut registered: Vec<RegisteredSlot> = rw_read(&self.slots, SOURCE, "all")
            .values()
            .cloned()
            .collect();
        registered.sort_by_key(|slot| (slot.definition.priority, slot.sequence));
        registered.into_iter().map(|slot| slot.definition).collect()
    }

    pub fn for_region(&self, region: &str) -> Vec<SlotDefinition> {
        self.all()
            .into_iter()
            .filter(|slot| slot.region == region)
            .collect()
    }

    pub fn is_visible(&self, slot: &SlotDefinition, ctx: &RequestContext) -> bool {
        self.evaluator.evaluate_all(&slot.conditions, ctx)
    }

    /// Render a registered slot if it is visible for `ctx`.
    pub fn render_slot(&self, slot_id: &str, ctx: &RequestContext) -> Option<String> {
        let slot = self.get(slot_id)?;
        self.render_definition(&slot, ctx)
    }

    /// Render `slot` (possibly re-homed by a front) if it is visible for `ctx`.
    pub fn render_definition(&self, slot: &SlotDefinition, ctx: &RequestContext) -> Option<String> {
        if !self.is_visible(slot, ctx) {
            return None;
        }

        let renderer = rw_read(&self.renderers, SOURCE, "render_definition")
            .get(&slot.id)
            .cloned();
        if let Some(markup) = renderer.and_then(|renderer| renderer.render(slot, ctx)) {
            return Some(markup);
        }

        match views::render_placement_filler(&slot.id, &slot.region, &slot.description) {
            Ok(markup) => Some(markup),
            Err(err) => {
                warn!(
                    slot_id = %slot.id,
                    origin = err.origin(),
                    error = %err,
                    "Placement filler failed to render"
                );
                None
            }
        }
    }

    /// Resolve a front's placement references against the registry.
    ///
    /// Region and priority overrides from the reference replace the registered
    /// values; unknown slot ids are skipped. The result is ordered like
    /// [`PlacementRegistry::all`], using the overridden priorities.
    pub fn resolve(
        &self,
        front_id: &str,
        refs: &BTreeMap<String, PlacementRef>,
    ) -> Vec<SlotDefinition> {
        let slots = rw_read(&self.slots, SOURCE, "resolve");
        let mut resolved: Vec<(i32, u64, SlotDefinition)> = Vec::with_capacity(refs.len());
        for (slot_id, placement) in refs {
            let Some(registered) = slots.get(slot_id) else {
                warn!(front_id, slot_id = %slot_id, "Front references an unregistered placement slot");
                continue;
            };
            let mut definition = registered.definition.clone();
            if let Some(region) = &placement.region {
                definition.region = region.clone();
            }
            if let Some(priority) = placement.priority {
                definition.priority = priority;
            }
            resolved.push((definition.priority, registered.sequence, definition));
        }
        drop(slots);

        resolved.sort_by_key(|(priority, sequence, _)| (*priority, *sequence));
        resolved.into_iter().map(|(_, _, slot)| slot).collect()
    }
}

fn builtin_slots() -> Vec<SlotDefinition> {
    vec![
        SlotDefinition::new(SLOT_BREAKING_ALERT, "hero", 0)
            .with_name("Breaking alert")
            .with_description("Breaking news alert banner"),
        SlotDefinition::new(SLOT_HERO_TOP, "hero", 10)
            .with_name("Hero top")
            .with_description("Promotion above the lead story"),
        SlotDefinition::new(SLOT_HERO_BOTTOM, "hero", 90)
            .with_name("Hero bottom")
            .with_description("Promotion below the lead story"),
        SlotDefinition::new(SLOT_RAIL_INLINE, "rails", 50)
            .with_name("Rail inline")
            .with_description("Inline unit between rail stories"),
        SlotDefinition::new(SLOT_SIDEBAR_TOP, "sidebar", 10)
            .with_name("Sidebar top")
            .with_description("Unit at the top of the sidebar"),
    ]
}
