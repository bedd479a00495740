//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Periodic maintenance runner
#[derive(Parser, Debug)]
#[command(name = "housekeeper")]
#[command(about = "Run periodic maintenance jobs under a process-wide lock")]
#[command(long_about = "
Housekeeper runs a fixed, ordered list of maintenance jobs (log rotation
cleanup, cache expiry, version pruning, temporary store sweeps). A PID-file
lock keeps overlapping invocations from running at the same time, so it is
safe to call from cron every few minutes.

EXAMPLES:
    # Run every registered job
    housekeeper

    # Run only two jobs
    housekeeper run --job cleanupcache,tmpstorecleanup

    # Run everything except version pruning
    housekeeper run --excluded-jobs versioncleanup

    # Ignore the lock (another run may be in progress)
    housekeeper run --force

    # Machine-readable report
    housekeeper --quiet run --report json

    # Show which jobs a selection would run
    housekeeper list --ej versioncleanup

EXIT CODES:
    0   run finished (individual jobs may still have failed)
    75  another run holds the lock
    1   configuration error, lock error or pre-run hook failure
")]
#[command(version = crate::build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute (`run` when omitted)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Options for the implicit `run` command
    #[command(flatten)]
    pub run: RunArgs,

    /// Configuration file path
    ///
    /// Load only this TOML file instead of the layered `config/` directory.
    /// `HOUSEKEEPER_*` environment variables still apply on top.
    #[arg(short, long, global = true, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects the `{environment}.toml` layer. Takes precedence over
    /// `HOUSEKEEPER_APP_ENV`.
    #[arg(short, long, global = true, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute the selected maintenance jobs (default)
    ///
    /// Examples:
    ///   housekeeper run                         # Every job, under the lock
    ///   housekeeper run -j cleanupcache         # A single job
    ///   housekeeper run --ej versioncleanup -f  # Skip one job, ignore the lock
    Run(RunArgs),

    /// List registered jobs in execution order
    ///
    /// Shows each job's description and whether the given selection would
    /// run it. Does not take the lock.
    List(SelectionArgs),
}

/// Job selection shared by `run` and `list`
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionArgs {
    /// Only run these jobs (comma-separated)
    ///
    /// Overrides `maintenance.jobs` from the configuration. Names that match
    /// no registered job are reported as warnings.
    #[arg(short, long, value_name = "JOBS", value_parser = super::validation::validate_job_list)]
    pub job: Option<String>,

    /// Never run these jobs (comma-separated)
    ///
    /// Overrides `maintenance.excluded_jobs`. Exclusion wins over `--job`.
    #[arg(long = "excluded-jobs", visible_alias = "ej", value_name = "JOBS", value_parser = super::validation::validate_job_list)]
    pub excluded_jobs: Option<String>,
}

impl SelectionArgs {
    pub fn is_empty(&self) -> bool {
        self.job.is_none() && self.excluded_jobs.is_none()
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Run without taking the maintenance lock
    ///
    /// Use only when you know no other run is active.
    #[arg(short, long)]
    pub force: bool,

    /// Format of the run report printed to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl Cli {
    /// Checks clap cannot express on its own
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_some() && self.run != RunArgs::default() {
            return Err(
                "Run options (--job, --excluded-jobs, --force, --report) must follow the subcommand"
                    .to_string(),
            );
        }
        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }
        Ok(())
    }

    /// Arguments of the run to execute, `None` for other commands
    pub fn run_args(&self) -> Option<&RunArgs> {
        match &self.command {
            Some(Commands::Run(args)) => Some(args),
            None => Some(&self.run),
            Some(Commands::List(_)) => None,
        }
    }

    /// Job selection of whichever command will execute
    pub fn selection(&self) -> &SelectionArgs {
        match &self.command {
            Some(Commands::List(selection)) => selection,
            Some(Commands::Run(args)) => &args.selection,
            None => &self.run.selection,
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}
