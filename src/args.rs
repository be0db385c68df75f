use std::path::PathBuf;
use std::thread::available_parallelism;

use structopt::clap::AppSettings;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
name = "osrd-schema-migrator",
version = env ! ("CARGO_PKG_VERSION"),
about = "Applies the osrd_infra schema migrations to a versioned schema state, checks stored rows against the current rules and writes validated rows.",
setting = AppSettings::ColoredHelp,
)]
pub struct Args {
    /// Activate verbose mode
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    /// Activate quiet mode
    #[structopt(short = "q", long = "quiet")]
    pub quiet: bool,

    /// Configuration file
    #[structopt(short = "c", long = "config", default_value = "config.toml", parse(from_os_str))]
    pub config: PathBuf,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Apply pending migrations
    Migrate {
        /// Stop after this migration (name or app.name)
        #[structopt(short = "t", long = "target")]
        target: Option<String>,
    },

    /// List migrations and whether they are applied
    Show,

    /// Check stored rows against the current column rules
    Verify {
        /// Set parallelism
        #[structopt(short = "p", long = "parallelism")]
        parallelism: Option<usize>,
    },

    /// Insert a row given as a JSON object
    Insert {
        /// Target table
        table: String,

        /// Row, e.g. '{"name": "BB 7200", "loading_gauge": "GB"}'
        row: String,
    },

    /// Change columns of a stored row
    Update {
        /// Target table
        table: String,

        /// Row index, as listed by `verify`
        index: usize,

        /// Changed columns as a JSON object
        changes: String,
    },
}

pub fn get_default_parallelism() -> usize {
    available_parallelism().map(|count| count.get()).unwrap_or(1)
}
