//! Request-context predicates gating placement visibility.
//!
//! Conditions are referenced by name from slot definitions. A name may carry a
//! single argument in parentheses, e.g. `user_role(editor)` or
//! `feature_active(dark-mode)`. Evaluation never fails: names that neither a
//! registered predicate nor a built-in recognises are treated as satisfied.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::cache::lock::{rw_read, rw_write};
use crate::util::timezone;

const SOURCE: &str = "application::conditions";

pub const DEVICE_MOBILE: &str = "device_mobile";
pub const DEVICE_DESKTOP: &str = "device_desktop";
pub const DEVICE_TABLET: &str = "device_tablet";
pub const TIME_MORNING: &str = "time_morning";
pub const TIME_AFTERNOON: &str = "time_afternoon";
pub const TIME_EVENING: &str = "time_evening";
pub const TIME_NIGHT: &str = "time_night";
pub const USER_LOGGED_IN: &str = "user_logged_in";
pub const USER_ROLE: &str = "user_role";
pub const USER_SEGMENT: &str = "user_segment";
pub const WEEKEND: &str = "weekend";
pub const WEEKDAY: &str = "weekday";
pub const FEATURE_ACTIVE: &str = "feature_active";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(DeviceClass::Desktop),
            "mobile" => Ok(DeviceClass::Mobile),
            "tablet" => Ok(DeviceClass::Tablet),
            other => Err(format!("unknown device class `{other}`")),
        }
    }
}

/// Hour buckets: morning 6-12, afternoon 12-18, evening 18-24, night 0-6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeBucket {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeBucket::Morning,
            12..=17 => TimeBucket::Afternoon,
            18..=23 => TimeBucket::Evening,
            _ => TimeBucket::Night,
        }
    }
}

/// Everything a condition may inspect about the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub device: DeviceClass,
    pub logged_in: bool,
    pub roles: BTreeSet<String>,
    pub segments: BTreeSet<String>,
    pub feature_flags: BTreeSet<String>,
    /// Instant the request is evaluated at; localized by the evaluator.
    pub now: OffsetDateTime,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(DeviceClass::default())
    }
}

impl RequestContext {
    pub fn new(device: DeviceClass) -> Self {
        Self {
            device,
            logged_in: false,
            roles: BTreeSet::new(),
            segments: BTreeSet::new(),
            feature_flags: BTreeSet::new(),
            now: OffsetDateTime::now_utc(),
        }
    }

    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn logged_in(mut self) -> Self {
        self.logged_in = true;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.logged_in = true;
        self.roles.insert(role.into());
        self
    }

    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.insert(segment.into());
        self
    }

    pub fn with_feature(mut self, flag: impl Into<String>) -> Self {
        self.feature_flags.insert(flag.into());
        self
    }
}

/// Custom predicate: receives the optional argument and the request context.
pub type ConditionPredicate = Arc<dyn Fn(Option<&str>, &RequestContext) -> bool + Send + Sync>;

/// Split `name(arg)` into its parts. Names without parentheses carry no argument.
pub fn parse_condition(raw: &str) -> (&str, Option<&str>) {
    let raw = raw.trim();
    match raw.split_once('(') {
        Some((name, rest)) if rest.ends_with(')') => {
            let arg = rest[..rest.len() - 1].trim();
            (name.trim(), (!arg.is_empty()).then_some(arg))
        }
        _ => (raw, None),
    }
}

pub struct ConditionEvaluator {
    timezone: Tz,
    predicates: RwLock<HashMap<String, ConditionPredicate>>,
}

impl ConditionEvaluator {
    /// Evaluator bucketing time in `timezone`.
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            predicates: RwLock::new(HashMap::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Register (or replace) a predicate. Registered predicates are consulted
    /// before built-ins, so a registration may shadow a built-in name.
    pub fn register<F>(&self, name: impl Into<String>, predicate: F)
    where
        F: Fn(Option<&str>, &RequestContext) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(condition = %name, "Registering placement condition");
        rw_write(&self.predicates, SOURCE, "register").insert(name, Arc::new(predicate));
    }

    pub fn evaluate(&self, condition: &str, ctx: &RequestContext) -> bool {
        let (name, arg) = parse_condition(condition);

        let registered = rw_read(&self.predicates, SOURCE, "evaluate")
            .get(name)
            .cloned();
        if let Some(predicate) = registered {
            return predicate(arg, ctx);
        }

        match self.evaluate_builtin(name, arg, ctx) {
            Some(result) => result,
            None => {
                warn!(
                    condition,
                    "Unknown placement condition; treating it as satisfied"
                );
                true
            }
        }
    }

    /// AND over every condition; an empty list is always satisfied.
    pub fn evaluate_all<S: AsRef<str>>(&self, conditions: &[S], ctx: &RequestContext) -> bool {
        conditions
            .iter()
            .all(|condition| self.evaluate(condition.as_ref(), ctx))
    }

    fn evaluate_builtin(&self, name: &str, arg: Option<&str>, ctx: &RequestContext) -> Option<bool> {
        let result = match name {
            DEVICE_MOBILE => ctx.device == DeviceClass::Mobile,
            DEVICE_DESKTOP => ctx.device == DeviceClass::Desktop,
            DEVICE_TABLET => ctx.device == DeviceClass::Tablet,
            TIME_MORNING => self.time_bucket(ctx) == TimeBucket::Morning,
            TIME_AFTERNOON => self.time_bucket(ctx) == TimeBucket::Afternoon,
            TIME_EVENING => self.time_bucket(ctx) == TimeBucket::Evening,
            TIME_NIGHT => self.time_bucket(ctx) == TimeBucket::Night,
            USER_LOGGED_IN => ctx.logged_in,
            USER_ROLE => arg.is_some_and(|role| ctx.logged_in && ctx.roles.contains(role)),
            USER_SEGMENT => arg.is_some_and(|segment| ctx.segments.contains(segment)),
            WEEKEND => timezone::is_weekend(ctx.now, self.timezone),
            WEEKDAY => !timezone::is_weekend(ctx.now, self.timezone),
            FEATURE_ACTIVE => arg.is_some_and(|flag| ctx.feature_flags.contains(flag)),
            _ => return None,
        };
        Some(result)
    }

    fn time_bucket(&self, ctx: &RequestContext) -> TimeBucket {
        TimeBucket::from_hour(timezone::local_hour(ctx.now, self.timezone))
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn at_hour(hour: u8) -> RequestContext {
        let base = datetime!(2026-03-02 00:00 UTC);
        RequestContext::default().at(base + time::Duration::hours(i64::from(hour)))
    }

    #[test]
    fn parse_condition_extracts_argument() {
        assert_eq!(parse_condition("user_role(editor)"), ("user_role", Some("editor")));
        assert_eq!(parse_condition(" weekend "), ("weekend", None));
        assert_eq!(parse_condition("feature_active()"), ("feature_active", None));
        assert_eq!(parse_condition("odd(name"), ("odd(name", None));
    }

    #[test]
    fn time_buckets_cover_the_day() {
        let evaluator = ConditionEvaluator::default();
        assert!(evaluator.evaluate(TIME_NIGHT, &at_hour(0)));
        assert!(evaluator.evaluate(TIME_NIGHT, &at_hour(5)));
        assert!(evaluator.evaluate(TIME_MORNING, &at_hour(6)));
        assert!(evaluator.evaluate(TIME_MORNING, &at_hour(11)));
        assert!(evaluator.evaluate(TIME_AFTERNOON, &at_hour(12)));
        assert!(evaluator.evaluate(TIME_EVENING, &at_hour(18)));
        assert!(evaluator.evaluate(TIME_EVENING, &at_hour(23)));
        assert!(!evaluator.evaluate(TIME_MORNING, &at_hour(20)));
    }

    #[test]
    fn time_buckets_use_configured_timezone() {
        let evaluator = ConditionEvaluator::new(chrono_tz::Asia::Tokyo);
        // 23:00 UTC is 08:00 in Tokyo.
        assert!(evaluator.evaluate(TIME_MORNING, &at_hour(23)));
    }

    #[test]
    fn device_and_user_conditions() {
        let evaluator = ConditionEvaluator::default();
        let ctx = RequestContext::new(DeviceClass::Mobile)
            .with_role("editor")
            .with_segment("subscribers")
            .with_feature("dark-mode");

        assert!(evaluator.evaluate(DEVICE_MOBILE, &ctx));
        assert!(!evaluator.evaluate(DEVICE_DESKTOP, &ctx));
        assert!(!evaluator.evaluate(DEVICE_TABLET, &ctx));
        assert!(evaluator.evaluate(USER_LOGGED_IN, &ctx));
        assert!(evaluator.evaluate("user_role(editor)", &ctx));
        assert!(!evaluator.evaluate("user_role(admin)", &ctx));
        assert!(!evaluator.evaluate("user_role", &ctx));
        assert!(evaluator.evaluate("user_segment(subscribers)", &ctx));
        assert!(evaluator.evaluate("feature_active(dark-mode)", &ctx));
        assert!(!evaluator.evaluate("feature_active(beta)", &ctx));
    }

    #[test]
    fn weekend_and_weekday_are_complementary() {
        let evaluator = ConditionEvaluator::default();
        let saturday = RequestContext::default().at(datetime!(2026-03-07 10:00 UTC));
        let monday = RequestContext::default().at(datetime!(2026-03-02 10:00 UTC));
        assert!(evaluator.evaluate(WEEKEND, &saturday));
        assert!(!evaluator.evaluate(WEEKDAY, &saturday));
        assert!(evaluator.evaluate(WEEKDAY, &monday));
    }

    #[test]
    fn unknown_condition_defaults_to_true() {
        let evaluator = ConditionEvaluator::default();
        assert!(evaluator.evaluate("moon_phase(full)", &RequestContext::default()));
    }

    #[test]
    fn registered_predicate_resolves_custom_name() {
        let evaluator = ConditionEvaluator::default();
        evaluator.register("geo", |arg, ctx| {
            arg == Some("eu") && ctx.segments.contains("eu-visitors")
        });
        let ctx = RequestContext::default().with_segment("eu-visitors");
        assert!(evaluator.evaluate("geo(eu)", &ctx));
        assert!(!evaluator.evaluate("geo(us)", &ctx));
    }

    #[test]
    fn evaluate_all_is_logical_and() {
        let evaluator = ConditionEvaluator::default();
        evaluator.register("a", |_, ctx| ctx.segments.contains("a"));
        evaluator.register("b", |_, ctx| ctx.segments.contains("b"));

        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let mut ctx = RequestContext::default();
            if a {
                ctx = ctx.with_segment("a");
            }
            if b {
                ctx = ctx.with_segment("b");
            }
            assert_eq!(evaluator.evaluate_all(&["a", "b"], &ctx), a && b);
        }

        let none: [&str; 0] = [];
        assert!(evaluator.evaluate_all(&none, &RequestContext::default()));
    }
}
