use std::{process, sync::Arc};

use frontpage::{
    application::{
        conditions::{ConditionEvaluator, DeviceClass, RequestContext},
        error::AppError,
        front::FrontServices,
        manager::FrontManager,
        placements::PlacementRegistry,
    },
    cache::{CacheConfig, FrontCache},
    config::{self, RenderArgs, RequestContextArgs, ShowArgs, SlotsArgs},
    infra::{
        fixtures, memory::InMemoryContentRepository, settings::InMemorySettingsStore, telemetry,
    },
};
use frontpage_types::PlacementProjection;
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %report.chain(), "{}", error.presentation_message());
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %report.chain(), "{}", error.presentation_message());
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let manager = build_manager(&settings)?;

    match cli_args.command {
        config::Command::List => run_list(&manager).await,
        config::Command::Show(args) => run_show(&manager, args).await,
        config::Command::Render(args) => run_render(&manager, args).await,
        config::Command::Slots(args) => run_slots(&manager, args),
    }
}

fn build_manager(settings: &config::Settings) -> Result<Arc<FrontManager>, AppError> {
    let store = Arc::new(InMemorySettingsStore::from_toml_file(
        &settings.sources.fronts_file,
    )?);

    let repository = match settings.sources.content_file.as_ref() {
        Some(path) => fixtures::load_repository(path)?,
        None => {
            warn!("No content file configured; fronts will render empty regions");
            InMemoryContentRepository::new()
        }
    };

    let evaluator = Arc::new(ConditionEvaluator::new(settings.conditions.timezone));
    let placements = Arc::new(PlacementRegistry::with_builtin_slots(evaluator));
    let cache = Arc::new(FrontCache::in_memory(CacheConfig::from(&settings.cache)));
    let services = Arc::new(FrontServices::new(Arc::new(repository), cache, placements));

    let manager = Arc::new(FrontManager::new(store, services));
    manager.watch_settings();
    info!(
        timezone = %settings.conditions.timezone,
        cache_enabled = settings.cache.enabled,
        "Front manager ready"
    );
    Ok(manager)
}

async fn run_list(manager: &FrontManager) -> Result<(), AppError> {
    for front in manager.get_all_fronts().await {
        println!("{}\t{}\t{}", front.id(), front.kind(), front.fingerprint());
    }
    Ok(())
}

async fn run_show(manager: &FrontManager, args: ShowArgs) -> Result<(), AppError> {
    let front = manager
        .get_front(&args.front_id)
        .await
        .ok_or_else(|| AppError::not_found(format!("front `{}`", args.front_id)))?;
    print_json(&front.to_projection().await)
}

async fn run_render(manager: &FrontManager, args: RenderArgs) -> Result<(), AppError> {
    let front = manager
        .get_front(&args.front_id)
        .await
        .ok_or_else(|| AppError::not_found(format!("front `{}`", args.front_id)))?;

    let regions = front.get_regions().await;
    if !regions.contains_key(&args.region) {
        return Err(AppError::not_found(format!(
            "region `{}` on front `{}`",
            args.region, args.front_id
        )));
    }

    let ctx = request_context(&args.context)?;
    println!("{}", front.render_region(&args.region, &ctx).await);
    Ok(())
}

fn run_slots(manager: &FrontManager, args: SlotsArgs) -> Result<(), AppError> {
    let registry = &manager.services().placements;
    let slots = match args.region.as_deref() {
        Some(region) => registry.for_region(region),
        None => registry.all(),
    };
    let projections: Vec<PlacementProjection> =
        slots.iter().map(PlacementProjection::from).collect();
    print_json(&projections)
}

fn request_context(args: &RequestContextArgs) -> Result<RequestContext, AppError> {
    let device: DeviceClass = args.device.parse().map_err(AppError::validation)?;
    let mut ctx = RequestContext::new(device);

    if let Some(at) = args.at.as_deref() {
        let now = OffsetDateTime::parse(at, &Rfc3339)
            .map_err(|err| AppError::validation(format!("invalid --at `{at}`: {err}")))?;
        ctx = ctx.at(now);
    }
    if args.logged_in {
        ctx = ctx.logged_in();
    }
    for role in &args.roles {
        ctx = ctx.with_role(role.clone());
    }
    for segment in &args.segments {
        ctx = ctx.with_segment(segment.clone());
    }
    for flag in &args.flags {
        ctx = ctx.with_feature(flag.clone());
    }
    Ok(ctx)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{json}");
    Ok(())
}
