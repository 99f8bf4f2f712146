use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Reader, Xlsx};

use crate::args::Command;
use crate::survey::config_reader::*;

mod collect;
mod completeness;
pub mod config_reader;
mod distribute;
mod io_common;
mod io_excel;
mod io_report;
mod mailer;
mod mover;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SurveyError {
    #[snafu(display("Error opening spreadsheet {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The spreadsheet {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("Error writing spreadsheet {path}"))]
    WritingExcel {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Error editing spreadsheet {path}"))]
    EditingExcel {
        source: umya_spreadsheet::XlsxError,
        path: String,
    },
    #[snafu(display("Error reading the configuration {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the configuration {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid cell reference {reference:?} for {setting}"))]
    InvalidCellReference { reference: String, setting: String },
    #[snafu(display("Cannot find the directory {path}"))]
    MissingDirectory { path: String },
    #[snafu(display("Cannot find the file {path}"))]
    MissingFile { path: String },
    #[snafu(display("The roster {path} needs at least {required} columns, found {found}"))]
    RosterTooNarrow {
        path: String,
        required: usize,
        found: usize,
    },
    #[snafu(display("I/O error on {path}"))]
    FileIo {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Invalid email address {address:?}"))]
    InvalidAddress {
        source: lettre::address::AddressError,
        address: String,
    },
    #[snafu(display("Error building the message for {recipient}"))]
    BuildingMessage {
        source: lettre::error::Error,
        recipient: String,
    },
    #[snafu(display("Error setting up the SMTP relay {host}"))]
    SmtpSetup {
        source: lettre::transport::smtp::Error,
        host: String,
    },
    #[snafu(display("No SMTP password: set it in the configuration or in {variable}"))]
    MissingSmtpPassword { variable: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// Stops the run when a directory every command depends on is absent.
fn require_dir(p: &Path) -> SurveyResult<()> {
    ensure!(
        p.is_dir(),
        MissingDirectorySnafu {
            path: p.display().to_string()
        }
    );
    Ok(())
}

fn require_file(p: &Path) -> SurveyResult<()> {
    ensure!(
        p.is_file(),
        MissingFileSnafu {
            path: p.display().to_string()
        }
    );
    Ok(())
}

fn create_dir(p: &Path) -> SurveyResult<bool> {
    if p.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(p).context(FileIoSnafu {
        path: p.display().to_string(),
    })?;
    Ok(true)
}

pub fn run_command(config_path: Option<&str>, command: &Command) -> SurveyResult<()> {
    let settings = read_settings(config_path)?;
    debug!("run_command: settings: {:?}", settings);

    match command {
        Command::Distribute => {
            let created = distribute::distribute(&settings)?;
            println!("Done: {} questionnaires created", created);
        }
        Command::Collect { out } => {
            let out_path: PathBuf = match out {
                Some(p) => PathBuf::from(p),
                None => settings.report_file.clone(),
            };
            match collect::collect(&settings)? {
                Some(report) => {
                    io_report::write_report(&out_path, &report, &settings.na_marker)?;
                    info!("run_command: {} rows in the report", report.rows.len());
                    println!("Report written to {}", out_path.display());
                }
                None => {
                    println!("No completed questionnaire found: nothing written.");
                }
            }
        }
        Command::Completeness => match completeness::track(&settings)? {
            Some(summary) => {
                println!(
                    "Completed {}/{}, completion rate: {:.2}%",
                    summary.finished,
                    summary.total,
                    summary.rate()
                );
            }
            None => {
                println!("The roster has no usable identifier.");
            }
        },
        Command::Mail { dry_run } => {
            let outcome = if *dry_run {
                mailer::send_reminders::<lettre::SmtpTransport>(&settings, None)?
            } else {
                let transport = mailer::smtp_transport(&settings.mail)?;
                mailer::send_reminders(&settings, Some(&transport))?
            };
            outcome.print_summary();
        }
        Command::Move { target } => {
            let target_dir: PathBuf = match target {
                Some(t) => PathBuf::from(t),
                None => match settings.move_target_directory.clone() {
                    Some(t) => t,
                    None => {
                        whatever!("No destination: pass --target or set moveTargetDirectory")
                    }
                },
            };
            let summary = mover::move_questionnaires(&settings, &target_dir)?;
            if summary.errors > 0 {
                warn!("run_command: {} files could not be moved", summary.errors);
            }
            summary.print_summary();
        }
    }
    Ok(())
}
