//! CLI entry point for the bz dependency resolver.
//!
//! Resolves the project's `.bz` descriptor into a local cache, assembles
//! the environment the dependencies export, and runs the given command
//! inside it. Main components: Cli parser, Commands enum, command spawn
//! with exit status propagation.

use bz::io::ExitCode;
use bz::resolver::DESCRIPTOR_FILE;
use bz::{ExtractedDependency, Resolver, Settings};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::{Path, PathBuf};
use std::process::Command;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(
    name = "bz",
    version = env!("CARGO_PKG_VERSION"),
    about = "Project-local dependency resolver and environment bootstrapper",
    long_about = "Resolve the .bz descriptor's dependencies into the local cache and run \
                  commands with their binaries and exports in the environment.",
    after_help = "Examples:\n  bz resolve            # fetch dependencies, print bin directories\n  bz mvn clean install  # run a command inside the resolved environment\n  bz run -- env         # same, for commands that collide with subcommands",
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Set up user settings and a starter descriptor
    #[command(about = "Write ~/.bz/settings.toml and a starter .bz descriptor")]
    Init {
        /// Force overwrite existing settings
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from ~/.bz/settings.toml")]
    Config,

    /// Resolve dependencies without running anything
    #[command(about = "Fetch and extract all dependencies, print their bin directories")]
    Resolve,

    /// Run a command inside the resolved environment
    #[command(about = "Resolve dependencies, then run the given command")]
    Run {
        /// Command and arguments to execute
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Any other invocation is treated as a command to run
    #[command(external_subcommand)]
    External(Vec<String>),
}

fn main() {
    let cli = Cli::parse();

    // Load configuration. A missing user settings file is normal; remote
    // access simply proceeds without tokens.
    let config = if let Some(config_path) = &cli.config {
        Settings::load_from(config_path).unwrap_or_else(|e| {
            eprintln!(
                "Configuration error loading from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(ExitCode::ConfigError.into());
        })
    } else {
        Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        })
    };

    let level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Init { force }) => {
            match Settings::init_config_file(force) {
                Ok(path) => println!("Created settings file at: {}", path.display()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(ExitCode::ConfigError.into());
                }
            }

            let descriptor = Path::new(DESCRIPTOR_FILE);
            if descriptor.exists() {
                println!("Found existing {DESCRIPTOR_FILE} descriptor");
            } else if let Err(e) = std::fs::write(
                descriptor,
                "# bz project descriptor\n# deps = [\"github.com/owner/repo-v1.2.3\"]\ndeps = []\n",
            ) {
                eprintln!("Warning: could not create {DESCRIPTOR_FILE}: {e}");
            } else {
                println!("Created starter {DESCRIPTOR_FILE} descriptor");
            }
        }

        Some(Commands::Config) => {
            match toml::to_string_pretty(&config) {
                Ok(toml_str) => println!("{toml_str}"),
                Err(e) => eprintln!("Error displaying config: {e}"),
            }
        }

        Some(Commands::Resolve) | None => {
            let deps = resolve_or_exit(&config);
            let environment = bz::env::assemble(&deps);
            for entry in &environment.path_entries {
                println!("{entry}");
            }
        }

        Some(Commands::Run { command }) | Some(Commands::External(command)) => {
            let deps = resolve_or_exit(&config);
            let environment = bz::env::assemble(&deps);
            std::process::exit(execute_command(&command, &environment));
        }
    }
}

/// Resolve the project descriptor or exit with the mapped code.
fn resolve_or_exit(config: &Settings) -> Vec<ExtractedDependency> {
    let resolver = Resolver::new(config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(ExitCode::from_error(&e).into());
    });

    match resolver.resolve_project(Path::new(DESCRIPTOR_FILE)) {
        Ok(deps) => deps,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(ExitCode::from_error(&e).into());
        }
    }
}

/// Run the command with the assembled exports and PATH prefix, inheriting
/// stdio, and return its exit code.
fn execute_command(command: &[String], environment: &bz::env::Environment) -> i32 {
    let status = Command::new(&command[0])
        .args(&command[1..])
        .envs(&environment.vars)
        .env("PATH", prepend_path(&environment.path_entries))
        .status();

    match status {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            eprintln!("Unable to run `{}`: {e}", command.join(" "));
            127
        }
    }
}

/// New PATH value: resolved bin directories first, existing entries after.
fn prepend_path(entries: &[String]) -> std::ffi::OsString {
    let mut paths: Vec<PathBuf> = entries.iter().map(PathBuf::from).collect();
    if let Some(existing) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&existing));
    }

    std::env::join_paths(paths).unwrap_or_else(|e| {
        eprintln!("Warning: could not prepend bin directories to PATH: {e}");
        std::env::var_os("PATH").unwrap_or_default()
    })
}
