mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands, VERSION_WITH_BUILD};
use odoobup::core::{
    BackupDispatcher, BackupReport, Profile, ProfileData, ProfileStore, TerminalProgress,
};
use odoobup::utils::{format_bytes, get_data_dir, AppConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "odoobup=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::load()?;

    match cli.command {
        Some(Commands::Version) => {
            println!("odoobup version {}", VERSION_WITH_BUILD);
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Config { command }) => {
            handle_config(command, config)?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let data_dir = get_data_dir(&config)?;
    // An unusable store is fatal: nothing below can run without it
    let store = ProfileStore::open(&data_dir)?;

    let code = match cli.command {
        None => handle_backup(&store, &config, &cli.ids, cli.strict).await?,
        Some(Commands::Add {
            url,
            db_name,
            password,
            backup_dir,
            server_version,
        }) => {
            let data = ProfileData::new(url, db_name, password, backup_dir, server_version);
            handle_add(&store, data)?
        }
        Some(Commands::Show) => handle_show(&store)?,
        Some(Commands::Del { id }) => {
            store.delete(id).with_context(|| format!("Failed to delete profile {}", id))?;
            println!("Profile {} deleted", id);
            ExitCode::SUCCESS
        }
        Some(Commands::Version) | Some(Commands::Config { .. }) => ExitCode::SUCCESS,
    };

    store.close();
    Ok(code)
}

async fn handle_backup(
    store: &ProfileStore,
    config: &AppConfig,
    ids: &[u64],
    strict: bool,
) -> Result<ExitCode> {
    if ids.is_empty() && store.list()?.is_empty() {
        eprintln!("no configuration setting found. See `odoobup help`");
        eprintln!("or try `odoobup add` to add new configuration setting");
        return Ok(ExitCode::FAILURE);
    }

    let show_progress = config.show_progress() && std::io::stderr().is_terminal();
    let dispatcher = BackupDispatcher::new(store, Box::new(TerminalProgress::new(show_progress)));

    let reports = dispatcher.run_backups(ids).await?;
    for report in &reports {
        print_report(report);
    }

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        eprintln!(
            "{}",
            format!("{} of {} backups failed", failed, reports.len()).yellow()
        );
    }

    // Per-profile failures only change the exit status with --strict
    if strict && failed > 0 {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(report: &BackupReport) {
    match &report.outcome {
        Ok(summary) => println!(
            "{} [{}] {}, database:{} -> {} ({})",
            "✓".green(),
            report.id,
            report.server_url,
            report.database,
            summary.path.display(),
            format_bytes(summary.bytes)
        ),
        Err(e) => eprintln!("{} [{}] Err: {}", "✗".red(), report.id, e),
    }
}

fn handle_add(store: &ProfileStore, data: ProfileData) -> Result<ExitCode> {
    let profile = store.create(data).context("Failed to add configuration")?;

    println!(
        "{} Added profile {} ({}, database: {}, protocol: {})",
        "✓".green(),
        profile.id,
        profile.server_url(),
        profile.database_name(),
        profile.protocol()
    );

    Ok(ExitCode::SUCCESS)
}

fn handle_show(store: &ProfileStore) -> Result<ExitCode> {
    let profiles = store.list()?;

    if profiles.is_empty() {
        println!("No profiles configured. Try `odoobup add`.");
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{:<5} {:<30} {:<20} {:<8} {}",
        "ID", "URL", "Database", "Version", "Backup Directory"
    );
    println!("{}", "-".repeat(90));

    for profile in &profiles {
        println!("{}", profile_row(profile));
    }

    Ok(ExitCode::SUCCESS)
}

/// One `show` line. The master secret is deliberately absent.
fn profile_row(profile: &Profile) -> String {
    format!(
        "{:<5} {:<30} {:<20} {:<8.1} {}",
        profile.id,
        profile.data.server_url,
        profile.data.database_name,
        profile.data.server_version,
        profile.data.backup_directory
    )
}

fn handle_config(command: ConfigCommands, mut config: AppConfig) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("Config file: {}", AppConfig::config_path()?.display());
            println!("Data directory: {}", get_data_dir(&config)?.display());
            println!("Show progress: {}", config.show_progress());
        }
        ConfigCommands::SetDataDir { path } => {
            config.set_data_dir(path.clone())?;
            println!("{} Profiles will be stored in {}", "✓".green(), path.display());
        }
    }

    Ok(())
}
