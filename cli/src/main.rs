use deno_terminal::colors;
use mcjs_runtime::EnvironmentConfig;
use std::error::Error;
use std::path::Path;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error_fmt;
mod flag;

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("{}: {}", colors::red_bold("error"), e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MCJS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli_args = flag::parse_args(std::env::args().collect())?;

    let config = match &cli_args.config {
        Some(path) => load_config(path)?,
        None => default_config(),
    };

    // Exposed as require('process').argv
    mcjs_runtime::set_script_args(cli_args.script_args);

    match cli_args.command {
        flag::Command::Run { file_path } => commands::run::execute(&file_path, config)?,
        flag::Command::Eval { code } => commands::eval::execute(&code, config)?,
        flag::Command::Help { requested } => {
            println!("{}", flag::USAGE);
            if !requested {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<EnvironmentConfig, Box<dyn Error>> {
    tracing::debug!(path = %path.display(), "loading config");
    EnvironmentConfig::from_file(path)
        .map_err(|e| format!("Failed to load config '{}': {e}", path.display()).into())
}

/// Without a config file, `console` and `process` are available as globals
fn default_config() -> EnvironmentConfig {
    EnvironmentConfig {
        globals: vec!["console".to_string(), "process".to_string()],
        ..EnvironmentConfig::default()
    }
}
