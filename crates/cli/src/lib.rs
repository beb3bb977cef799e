pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use propquote_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "propquote",
    about = "PropQuote operator CLI",
    long_about = "Apply migrations, inspect configuration, check readiness and run offline labor estimates.",
    after_help = "Examples:\n  propquote doctor\n  propquote config\n  propquote estimate selections.json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Read configuration from this TOML file instead of propquote.toml")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity and migration state")]
    Doctor,
    #[command(about = "Estimate installation labor for a JSON file of device selections")]
    Estimate {
        #[arg(help = "JSON file: an array of selections or an estimate request object")]
        file: PathBuf,
        #[arg(long, help = "Leave material costs out of the estimate")]
        no_materials: bool,
        #[arg(long, help = "Use installation rules and labor rates stored in the database")]
        with_database: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            ..LoadOptions::default()
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Config => commands::config::run(options),
        Command::Doctor => commands::doctor::run(options),
        Command::Estimate { file, no_materials, with_database } => {
            commands::estimate::run(options, &file, !no_materials, with_database)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
