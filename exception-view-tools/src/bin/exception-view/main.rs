mod cmd;
mod snapshot;
mod symbols;
mod util;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use exception_view::FrameLayout;
use figment::providers::{Data, Env, Format as _, Json, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::util::logging::{setup_logging, LevelFilter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// Stack frame layout used unless `--layout` is given.
    pub frame_layout: FrameLayout,
    /// Log level used unless `--log-level` is given.
    pub log_level: Option<LevelFilter>,
    /// List the captured registers in the info view.
    pub show_registers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_layout: FrameLayout::Auto,
            log_level: None,
            show_registers: true,
        }
    }
}

#[derive(clap::Parser)]
#[clap(
    name = "exception-view",
    about = "Decode the pending exception of a halted Cortex-M core",
    version
)]
struct Cli {
    /// Location for log file
    #[clap(long, global = true, help_heading = "LOG CONFIGURATION")]
    log_file: Option<PathBuf>,

    /// Log level on stderr. Without it, `RUST_LOG` is used.
    #[clap(long, global = true, value_enum, help_heading = "LOG CONFIGURATION")]
    log_level: Option<LevelFilter>,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

impl Subcommand {
    fn run(self, config: &Config) -> Result<()> {
        match self {
            Subcommand::Info(cmd) => cmd.run(config),
            Subcommand::Callstack(cmd) => cmd.run(config),
            Subcommand::Logs(cmd) => cmd.run(config),
        }
    }
}

#[derive(clap::Subcommand)]
enum Subcommand {
    Info(cmd::info::Cmd),
    Callstack(cmd::callstack::Cmd),
    Logs(cmd::logs::Cmd),
}

fn main() -> Result<()> {
    let config = load_config().context("Failed to load configuration.")?;

    // Parse the commandline options.
    let Cli {
        log_file,
        log_level,
        subcommand,
    } = Cli::parse();

    let _logger_guard = setup_logging(log_file.as_deref(), log_level.or(config.log_level))?;
    tracing::debug!("Using {config:?}");

    subcommand.run(&config)
}

/// Build the configuration from the defaults, the configuration files and the environment.
///
/// Files named `.exception-view.{toml,json,yaml,yml}` are searched in the working directory
/// and in the home directory. Later sources override earlier ones.
fn config_sources() -> Result<Figment> {
    // Paths to search for the configuration file.
    let mut paths = vec![PathBuf::from(".")];
    if let Some(home) = directories::UserDirs::new().map(|user| user.home_dir().to_path_buf()) {
        paths.push(home);
    }

    // Files to search for, without extension.
    let files = [".exception-view"];

    let default_config = serde_json::to_string_pretty(&Config::default())?;
    let mut figment = Figment::from(Data::<Json>::string(&default_config));
    for path in paths {
        for file in files {
            figment = figment
                .merge(Toml::file(path.join(format!("{file}.toml"))))
                .merge(Json::file(path.join(format!("{file}.json"))))
                .merge(Yaml::file(path.join(format!("{file}.yaml"))))
                .merge(Yaml::file(path.join(format!("{file}.yml"))));
        }
    }

    // Other `EXCEPTION_VIEW_*` variables are not configuration keys.
    Ok(figment.merge(Env::prefixed("EXCEPTION_VIEW_").only(&[
        "frame_layout",
        "log_level",
        "show_registers",
    ])))
}

fn load_config() -> Result<Config> {
    let config = config_sources()?.extract::<Config>()?;

    Ok(config)
}
