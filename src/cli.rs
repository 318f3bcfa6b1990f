/// CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Build timestamp injected at compile time
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "odoobup")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Back up only these profile ids, e.g. `-n 1` or `-n 1,2,3`
    #[arg(short = 'n', long = "ids", value_delimiter = ',')]
    pub ids: Vec<u64>,

    /// Exit with status 2 when any backup in the batch fails
    #[arg(long, global = true)]
    pub strict: bool,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add new configuration setting
    Add {
        /// Odoo server URL, e.g. http://localhost:8069
        #[arg(long)]
        url: String,

        /// Database name
        #[arg(long = "db-name", visible_alias = "db_name")]
        db_name: String,

        /// Odoo master password
        #[arg(long)]
        password: String,

        /// Directory backups are written to
        #[arg(long = "backup-dir", visible_alias = "backup_dir")]
        backup_dir: String,

        /// Odoo server version, e.g. 8.0 or 16.0
        #[arg(long = "server-version")]
        server_version: f64,
    },

    /// Show all configurations
    Show,

    /// Delete configuration setting by id number
    Del {
        /// Profile id to delete
        #[arg(short = 'n', long = "id")]
        id: u64,
    },

    /// Show program version number
    Version,

    /// User configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// View configuration
    Show,

    /// Store profiles in a different directory
    SetDataDir { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_id_list() {
        let cli = Cli::try_parse_from(["odoobup", "-n", "1,2,3"]).unwrap();
        assert_eq!(cli.ids, vec![1, 2, 3]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "odoobup",
            "add",
            "--url",
            "http://localhost:8069",
            "--db-name",
            "odoo",
            "--password",
            "admin",
            "--backup-dir",
            "/home/odoo/backups",
            "--server-version",
            "8.0",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Add { server_version, db_name, .. }) => {
                assert_eq!(server_version, 8.0);
                assert_eq!(db_name, "odoo");
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn test_rejects_non_numeric_ids() {
        assert!(Cli::try_parse_from(["odoobup", "-n", "1,x"]).is_err());
    }
}
