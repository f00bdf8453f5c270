//! Command-line interface for navydash
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading (file, then environment, then flags)
//! - Date/time input validation before any store access
//! - Dispatch of the export, browse and config commands

pub mod pager;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::error::{Result, ValidationError};
use crate::executor::{
    BrowseSession, ExportOptions, ExportStatus, StreamingExporter, write_artifact,
};
use crate::formatter::{Colorizer, Formatter, OutputFormat};
use crate::query::{Mode, QueryBuilder, RangeQuery, parse_date, parse_time, validate_range};
use crate::store::DocumentStore;

/// Genset telemetry browser and CSV exporter
#[derive(Parser, Debug)]
#[command(
    name = "navydash",
    version,
    about = "Browse and export genset telemetry stored in MongoDB",
    long_about = "Query a timestamp-indexed telemetry collection by date/time range,
optionally restricted to a status band, then page through the matches or
stream them into a CSV file."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// MongoDB connection URI (overrides config and MONGO_URL)
    #[arg(long, value_name = "URI")]
    pub uri: Option<String>,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Date/time window and mode shared by export and browse
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start_date: String,

    /// Start time (HH:MM[:SS])
    #[arg(long, value_name = "TIME", default_value = "00:00:00")]
    pub start_time: String,

    /// End date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end_date: String,

    /// End time (HH:MM[:SS])
    #[arg(long, value_name = "TIME", default_value = "23:59:59")]
    pub end_time: String,

    /// Only records whose status lies in the configured band
    #[arg(long)]
    pub check: bool,
}

/// Subcommands for navydash
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export matching records to a CSV file
    Export {
        #[command(flatten)]
        range: RangeArgs,

        /// Directory receiving the CSV file
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Count matches first to size the progress bar
        #[arg(long)]
        count_first: bool,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Print one page of matching records
    Browse {
        #[command(flatten)]
        range: RangeArgs,

        /// Page to show, starting at 1
        #[arg(long, value_name = "N", default_value_t = 1)]
        page: u64,

        /// Output format (table, json, json-pretty)
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,

        /// Keep an interactive pager open after the first page
        #[arg(short = 'i', long)]
        interactive: bool,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration
    config: Config,
}

impl CliInterface {
    /// Parse process arguments and load configuration
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build the interface from already-parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration: file, then environment, then flags
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Validated configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        config.apply_env()?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI arguments to configuration
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        use crate::config::LogLevel;

        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }

        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else {
            config.logging.level
        };

        if let Commands::Export {
            output_dir,
            no_progress,
            ..
        } = &args.command
        {
            if let Some(dir) = output_dir {
                config.export.output_dir = dir.clone();
            }
            if *no_progress {
                config.export.progress = false;
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    pub fn colorizer(&self) -> Colorizer {
        Colorizer::new(!self.args.no_color)
    }

    /// Run the selected command
    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Commands::Export {
                range, count_first, ..
            } => self.run_export(range, *count_first).await,
            Commands::Browse {
                range,
                page,
                format,
                interactive,
            } => {
                self.run_browse(range, *page, format.as_deref(), *interactive)
                    .await
            }
            Commands::Config { show, validate } => self.handle_config_command(*show, *validate),
        }
    }

    /// Turn the range arguments into a query
    ///
    /// Input errors are reported here, before any connection is made.
    pub fn build_query(&self, range: &RangeArgs) -> Result<RangeQuery> {
        let window = validate_range(
            parse_date("start-date", &range.start_date)?,
            parse_time("start-time", &range.start_time)?,
            parse_date("end-date", &range.end_date)?,
            parse_time("end-time", &range.end_time)?,
        )?;
        let mode = if range.check { Mode::Check } else { Mode::Fetch };

        let query = QueryBuilder::from_config(&self.config.query).build(window.start, window.end, mode);
        debug!("Built query: {}", query.to_filter());
        Ok(query)
    }

    async fn store(&self) -> Result<Arc<dyn DocumentStore>> {
        let manager = ConnectionManager::shared(&self.config.connection);
        let store = manager.store(&self.config.query).await?;
        Ok(Arc::new(store))
    }

    async fn run_export(&self, range: &RangeArgs, count_first: bool) -> Result<()> {
        let query = self.build_query(range)?;
        let store = self.store().await?;

        let options = ExportOptions {
            count_first,
            ..ExportOptions::from_config(&self.config)
        };

        let token = CancellationToken::new();
        let on_interrupt = token.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let exported = StreamingExporter::new(store, options)
            .with_cancellation(token)
            .export(&query)
            .await;
        watcher.abort();
        let outcome = exported?;

        let formatter = Formatter::new(OutputFormat::Table, !self.args.no_color);
        if outcome.is_empty() {
            println!("{}", formatter.format_export(&outcome));
            return Ok(());
        }

        let path = write_artifact(
            &self.config.export.output_dir,
            &outcome,
            Local::now().naive_local(),
        )
        .await?;

        println!("{}", formatter.format_export(&outcome));
        if outcome.status == ExportStatus::Complete {
            println!("Saved to {}", path.display());
        } else {
            println!("Partial output saved to {}", path.display());
        }
        Ok(())
    }

    async fn run_browse(
        &self,
        range: &RangeArgs,
        page: u64,
        format: Option<&str>,
        interactive: bool,
    ) -> Result<()> {
        let format = match format {
            Some(name) => name
                .parse::<OutputFormat>()
                .map_err(|_| ValidationError::InvalidInput {
                    field: "format".to_string(),
                    value: name.to_string(),
                })?,
            None => OutputFormat::Table,
        };
        let query = self.build_query(range)?;
        let store = self.store().await?;

        let mut session = BrowseSession::from_config(store, &self.config);
        let mut response = session.submit(query).await?;
        if page > 1 {
            response = session.go_to(page - 1).await?;
        }

        let formatter = Formatter::new(format, !self.args.no_color);
        println!("{}", formatter.format_page(&response));

        if interactive {
            info!("Entering interactive pager");
            pager::run_pager(&mut session, &formatter, &response).await?;
        }
        Ok(())
    }

    /// Handle config subcommand
    ///
    /// # Arguments
    /// * `show` - Whether to show configuration
    /// * `validate` - Whether to validate configuration
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        let colorizer = self.colorizer();
        if validate {
            // Loading already validated the effective configuration
            println!("{}", colorizer.success("Configuration is valid"));
        }

        if show || !validate {
            let path = self.get_config_path();
            println!("# Configuration file: {}", path.display());
            println!("{}", self.config.to_toml_string()?);
        }
        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    fn interface(args: &[&str]) -> CliInterface {
        let args = parse(args);
        let mut config = Config::default();
        CliInterface::apply_args_to_config(&mut config, &args);
        CliInterface { args, config }
    }

    fn range_of(cli: &CliInterface) -> RangeArgs {
        match &cli.args.command {
            Commands::Export { range, .. } | Commands::Browse { range, .. } => range.clone(),
            Commands::Config { .. } => panic!("no range"),
        }
    }

    #[test]
    fn test_parse_export() {
        let args = parse(&[
            "navydash",
            "--uri",
            "mongodb://db:27017",
            "export",
            "--start-date",
            "2025-08-28",
            "--end-date",
            "2025-08-29",
            "--check",
            "--no-progress",
            "--output-dir",
            "/tmp/out",
        ]);
        assert_eq!(args.uri.as_deref(), Some("mongodb://db:27017"));
        match args.command {
            Commands::Export {
                range,
                no_progress,
                output_dir,
                count_first,
            } => {
                assert!(range.check);
                assert_eq!(range.start_time, "00:00:00");
                assert!(no_progress);
                assert!(!count_first);
                assert_eq!(output_dir, Some(PathBuf::from("/tmp/out")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let cli = interface(&[
            "navydash",
            "--uri",
            "mongodb://db:27017",
            "-v",
            "export",
            "--start-date",
            "2025-08-28",
            "--end-date",
            "2025-08-29",
            "--no-progress",
            "--output-dir",
            "/tmp/out",
        ]);
        assert_eq!(cli.config().connection.uri, "mongodb://db:27017");
        assert_eq!(cli.config().logging.level, crate::config::LogLevel::Debug);
        assert!(!cli.config().export.progress);
        assert_eq!(cli.config().export.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_build_query_check_mode() {
        let cli = interface(&[
            "navydash",
            "browse",
            "--start-date",
            "2025-08-28",
            "--start-time",
            "08:00",
            "--end-date",
            "2025-08-28",
            "--end-time",
            "09:30:00",
            "--check",
        ]);
        let query = cli.build_query(&range_of(&cli)).unwrap();
        assert_eq!(query.start(), "2025-08-28T08:00:00");
        assert_eq!(query.end(), "2025-08-28T09:30:00");
        assert_eq!(query.mode(), Mode::Check);
        assert!(query.status().is_some());
    }

    #[test]
    fn test_build_query_rejects_reversed_range() {
        let cli = interface(&[
            "navydash",
            "browse",
            "--start-date",
            "2025-08-28",
            "--start-time",
            "10:00",
            "--end-date",
            "2025-08-28",
            "--end-time",
            "10:00",
        ]);
        let err = cli.build_query(&range_of(&cli)).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Validation(ValidationError::EndNotAfterStart)
        ));
    }

    #[test]
    fn test_build_query_rejects_bad_date() {
        let cli = interface(&[
            "navydash",
            "export",
            "--start-date",
            "28/08/2025",
            "--end-date",
            "2025-08-29",
        ]);
        let err = cli.build_query(&range_of(&cli)).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Validation(ValidationError::InvalidInput { .. })
        ));
    }
}
