use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the frontpage binary.
#[derive(Debug, Parser)]
#[command(
    name = "frontpage",
    version,
    about = "Compose and inspect editorial front pages"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FRONTPAGE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List configured fronts with their type and fingerprint.
    List,
    /// Print a front's projection as JSON.
    Show(ShowArgs),
    /// Render one region of a front as markup.
    Render(RenderArgs),
    /// List registered placement slots in render order.
    Slots(SlotsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Front identifier, e.g. `home`.
    #[arg(value_name = "FRONT_ID")]
    pub front_id: String,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[arg(value_name = "FRONT_ID")]
    pub front_id: String,

    /// Region name, e.g. `hero`.
    #[arg(value_name = "REGION")]
    pub region: String,

    #[command(flatten)]
    pub context: RequestContextArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SlotsArgs {
    /// Only list slots attached to this region.
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,
}

/// Request context used to evaluate placement conditions.
#[derive(Debug, Args, Default, Clone)]
pub struct RequestContextArgs {
    /// Device class (desktop|mobile|tablet).
    #[arg(long, value_name = "DEVICE", default_value = "desktop")]
    pub device: String,

    /// Treat the request as coming from a logged-in user.
    #[arg(long = "logged-in", action = clap::ArgAction::SetTrue)]
    pub logged_in: bool,

    /// Role held by the user; may be repeated.
    #[arg(long = "role", value_name = "ROLE")]
    pub roles: Vec<String>,

    /// User segment; may be repeated.
    #[arg(long = "segment", value_name = "SEGMENT")]
    pub segments: Vec<String>,

    /// Active feature flag; may be repeated.
    #[arg(long = "flag", value_name = "FLAG")]
    pub flags: Vec<String>,

    /// Evaluate at this RFC 3339 instant instead of now.
    #[arg(long, value_name = "TIMESTAMP")]
    pub at: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SettingsOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Toggle the front cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,

    /// Override the IANA timezone used by time-of-day conditions.
    #[arg(long = "timezone", value_name = "ZONE", global = true)]
    pub timezone: Option<String>,

    /// Override the fronts settings file.
    #[arg(long = "fronts-file", value_name = "PATH", value_hint = ValueHint::FilePath, global = true)]
    pub fronts_file: Option<PathBuf>,

    /// Override the content fixture file.
    #[arg(long = "content-file", value_name = "PATH", value_hint = ValueHint::FilePath, global = true)]
    pub content_file: Option<PathBuf>,
}
