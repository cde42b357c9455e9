//! Clap derive structures for the `amotion` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

use amotion_core::WorkRegime;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// amotion -- talk to Atrea aMotion ventilation units
#[derive(Debug, Parser)]
#[command(
    name = "amotion",
    version,
    about = "Monitor and control aMotion ventilation units from the command line",
    long_about = "Keeps an authenticated WebSocket session to an aMotion unit,\n\
        reads its state and sends control commands.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Unit profile to use
    #[arg(long, short = 'p', env = "AMOTION_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Unit host or address (overrides profile)
    #[arg(long, short = 'H', env = "AMOTION_HOST", global = true)]
    pub host: Option<String>,

    /// Login user name
    #[arg(long, short = 'u', env = "AMOTION_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "AMOTION_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "AMOTION_OUTPUT", default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Handshake and answer timeout in seconds
    #[arg(long, env = "AMOTION_TIMEOUT", default_value = "10", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect, read the current state and print it
    #[command(alias = "st")]
    Status,

    /// Print state changes as the unit pushes them, until Ctrl-C
    Watch(WatchArgs),

    /// Ask the unit for its identity
    Discover,

    /// Round-trip a ping and report the latency
    Ping,

    /// Change the work regime, setpoint or fan power
    Set(SetArgs),

    /// Log in over HTTP, read the unit identity and save a profile
    Onboard(OnboardArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Also ask for a full state every N seconds (0 = push only)
    #[arg(long, default_value = "0")]
    pub refresh: u64,
}

#[derive(Debug, Args)]
#[command(group(
    clap::ArgGroup::new("change")
        .required(true)
        .multiple(true)
        .args(["mode", "temperature", "fan", "fan_supply", "fan_extract"])
))]
pub struct SetArgs {
    /// Work regime
    #[arg(long, short = 'm', value_parser = parse_work_regime)]
    pub mode: Option<WorkRegime>,

    /// Setpoint in °C
    #[arg(long, short = 't')]
    pub temperature: Option<f64>,

    /// Fan power in percent, both directions
    #[arg(long)]
    pub fan: Option<u8>,

    /// Supply fan power in percent
    #[arg(long)]
    pub fan_supply: Option<u8>,

    /// Extract fan power in percent
    #[arg(long)]
    pub fan_extract: Option<u8>,
}

fn parse_work_regime(value: &str) -> Result<WorkRegime, String> {
    value.parse().map_err(|_| {
        format!("expected one of off, auto, ventilation, night_precooling, disbalance; got '{value}'")
    })
}

#[derive(Debug, Args)]
pub struct OnboardArgs {
    /// Host or address of the unit
    pub host: String,

    /// Name of the profile to create or replace
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Store the password in the config file instead of the system keyring
    #[arg(long)]
    pub plaintext: bool,

    /// Make this the default profile
    #[arg(long)]
    pub set_default: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current configuration (secrets masked)
    Show,

    /// List configured profiles
    Profiles,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
