mod config;
mod shell;

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use registrar_author::Registrar;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Overrides};
use crate::shell::Shell;

#[derive(Parser)]
#[command(name = "registrar-cli", version, about = "Interactive course registrar")]
struct Cli {
    /// Snapshot file loaded at startup and saved on exit
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Directory for timestamped backups
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not seed demo records into an empty registrar
    #[arg(long)]
    no_seed: bool,

    /// Save to the data file when the shell exits
    #[arg(long, action = ArgAction::Set)]
    save_on_exit: Option<bool>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::resolve(
        cli.config.as_deref(),
        Overrides {
            data_file: cli.data_file,
            backup_dir: cli.backup_dir,
            no_seed: cli.no_seed,
            save_on_exit: cli.save_on_exit,
        },
    )?;
    tracing::debug!(?config, "configuration resolved");

    let mut registrar = Registrar::open(&config.data_file);
    if config.seed_demo && registrar.seed_demo()? {
        println!("Seeded demo data.");
    }

    let mut shell = Shell::new(registrar, config);
    let stdin = std::io::stdin();
    shell.run(stdin.lock(), &mut std::io::stdout())?;
    let store = shell.registrar().store();
    tracing::info!(
        students = store.students().len(),
        courses = store.courses().len(),
        enrollments = store.enrollments().len(),
        "session ended"
    );
    Ok(())
}
