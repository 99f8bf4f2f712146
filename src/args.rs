use clap::{Parser, Subcommand};

/// This program hands out spreadsheet questionnaires to a roster of recipients,
/// follows their completion and collects the answers.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file with the survey settings. Relative paths inside it are
    /// resolved against its directory. Without it, the defaults apply relative to the current directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Creates one questionnaire per roster entry under the data directory.
    Distribute,
    /// Gathers the completed questionnaires into one report.
    Collect {
        /// (file path) Overrides the report location. A path ending in `.csv` writes CSV instead of xlsx.
        #[clap(short, long, value_parser)]
        out: Option<String>,
    },
    /// Marks each roster entry as done or not done and appends a line to the completeness log.
    Completeness,
    /// Sends the reminder email with its attachment to every roster entry.
    Mail {
        /// Builds every message without sending anything.
        #[clap(long, takes_value = false)]
        dry_run: bool,
    },
    /// Moves the questionnaires out of the data directory.
    Move {
        /// (directory) Overrides the configured destination.
        #[clap(short, long, value_parser)]
        target: Option<String>,
    },
}
