//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// precache - offline-first asset cache
///
/// Pre-caches an application's shell, loader script and binary module in
/// a versioned store and serves them cache-first.
#[derive(Parser, Debug)]
#[command(name = "precache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PRECACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store directory (overrides cache.store_dir)
    #[arg(long, global = true, env = "PRECACHE_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Origin URL (overrides origin.base_url)
    #[arg(long, global = true, env = "PRECACHE_ORIGIN")]
    pub origin: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision and activate the store for this build
    Install,

    /// Answer one request cache-first
    Fetch(FetchArgs),

    /// Load the binary module with a progress display
    Load(LoadArgs),

    /// List cache stores
    List(ListArgs),

    /// Print the cache identity of this build
    Identity,

    /// Delete every store in this application's namespace
    Clear(ClearArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Relative request path, e.g. ./index.html
    pub path: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Write the body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the load command
#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// Module path (defaults to loader.module)
    #[arg(short, long)]
    pub module: Option<String>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for the list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_install() {
        let cli = Cli::parse_from(["precache", "install"]);
        assert!(matches!(cli.command, Commands::Install));
    }

    #[test]
    fn cli_parses_fetch() {
        let cli = Cli::parse_from(["precache", "fetch", "./index.html", "-o", "out.html"]);
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.path, "./index.html");
                assert_eq!(args.method, "GET");
                assert_eq!(args.output, Some(PathBuf::from("out.html")));
            }
            _ => panic!("expected Fetch command"),
        }
    }

    #[test]
    fn cli_parses_list_format() {
        let cli = Cli::parse_from(["precache", "list", "--format", "json"]);
        match cli.command {
            Commands::List(args) => assert!(matches!(args.format, OutputFormat::Json)),
            _ => panic!("expected List command"),
        }
    }

    #[test]
    fn cli_parses_clear_yes() {
        let cli = Cli::parse_from(["precache", "clear", "--yes"]);
        match cli.command {
            Commands::Clear(args) => assert!(args.yes),
            _ => panic!("expected Clear command"),
        }
    }

    #[test]
    fn cli_global_overrides() {
        let cli = Cli::parse_from([
            "precache",
            "identity",
            "--store-dir",
            "/tmp/s",
            "--origin",
            "http://localhost:9000/",
        ]);
        assert_eq!(cli.store_dir, Some(PathBuf::from("/tmp/s")));
        assert_eq!(cli.origin.as_deref(), Some("http://localhost:9000/"));
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["precache", "identity"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["precache", "-vv", "identity"]);
        assert_eq!(cli.verbose, 2);
    }
}
