use std::fs::OpenOptions;

use chrono::{DateTime, Local};
use questionnaire::{is_complete, CellValue};

use crate::survey::{
    io_common::questionnaire_path,
    io_excel::{open_sheet, read_roster, TIMESTAMP_FORMAT},
    *,
};

pub const STATUS_COLUMN: &str = "completion status";
pub const TIMESTAMP_COLUMN: &str = "update timestamp";
pub const LOG_HEADER: [&str; 4] = ["datetime", "finished", "total", "rate_percent"];

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct CompletenessSummary {
    pub finished: usize,
    pub total: usize,
}

impl CompletenessSummary {
    /// Percentage of finished questionnaires.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.finished as f64 / self.total as f64 * 100.0
        }
    }
}

/// What was found at the expected location of a questionnaire.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum FileState {
    Missing,
    Unreadable,
    Incomplete,
    /// The modification time is empty when the filesystem does not report one.
    Done { modified: String },
}

/// Status and timestamp of a roster line after this run.
///
/// The timestamp only moves when the status becomes done. It then holds the
/// modification time of the questionnaire and is kept as is afterwards.
pub fn transition(
    state: &FileState,
    old_status: &str,
    old_timestamp: &str,
    done_marker: &str,
    not_done_marker: &str,
) -> (String, String) {
    match state {
        FileState::Done { modified } if old_status != done_marker => {
            (done_marker.to_string(), modified.clone())
        }
        FileState::Done { .. } => (done_marker.to_string(), old_timestamp.to_string()),
        _ => (not_done_marker.to_string(), old_timestamp.to_string()),
    }
}

pub fn check_file(path: &Path, settings: &Settings) -> FileState {
    if !path.is_file() {
        warn!("check_file: questionnaire file not found: {}", path.display());
        return FileState::Missing;
    }
    let sheet = match open_sheet(path) {
        Ok(s) => s,
        Err(e) => {
            warn!("check_file: error reading {}: {}", path.display(), e);
            return FileState::Unreadable;
        }
    };
    if !is_complete(&sheet, &settings.layout) {
        return FileState::Incomplete;
    }
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Local>::from(t).format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default();
    FileState::Done { modified }
}

fn text_cell(s: String) -> CellValue {
    if s.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(s)
    }
}

/// Updates the status columns of the roster and appends a line to the log.
///
/// Returns `None`, leaving both files untouched, when the roster has no
/// usable identifier.
pub fn track(settings: &Settings) -> SurveyResult<Option<CompletenessSummary>> {
    require_dir(&settings.data_dir)?;
    let mut roster = read_roster(&settings.roster_file)?;
    roster.require_columns(1)?;

    let status_col = roster.column_index(STATUS_COLUMN);
    let time_col = roster.column_index(TIMESTAMP_COLUMN);

    let mut summary = CompletenessSummary {
        finished: 0,
        total: 0,
    };
    let mut statuses: Vec<CellValue> = Vec::new();
    let mut timestamps: Vec<CellValue> = Vec::new();
    for entry in roster.entries() {
        if !entry.is_usable() {
            statuses.push(CellValue::Empty);
            timestamps.push(CellValue::Empty);
            continue;
        }
        summary.total += 1;

        let old_status = status_col
            .map(|c| roster.text(entry.row, c))
            .unwrap_or_default();
        let old_timestamp = time_col
            .map(|c| roster.text(entry.row, c))
            .unwrap_or_default();

        let path = questionnaire_path(settings, &entry.id, &entry.name);
        let state = check_file(&path, settings);
        debug!("track: {}: {:?}", entry.id, state);
        if matches!(state, FileState::Done { .. }) {
            summary.finished += 1;
        }

        let (status, timestamp) = transition(
            &state,
            &old_status,
            &old_timestamp,
            &settings.done_marker,
            &settings.not_done_marker,
        );
        statuses.push(text_cell(status));
        timestamps.push(text_cell(timestamp));
    }

    if summary.total == 0 {
        return Ok(None);
    }

    roster.set_column(STATUS_COLUMN, statuses);
    roster.set_column(TIMESTAMP_COLUMN, timestamps);
    roster.save()?;
    info!(
        "track: status written back to {}",
        settings.roster_file.display()
    );

    let now = Local::now().format(TIMESTAMP_FORMAT).to_string();
    append_log(&settings.completeness_log, &now, &summary)?;
    Ok(Some(summary))
}

/// Appends one line to the audit log, writing the header first when the log is new.
pub fn append_log(path: &Path, at: &str, summary: &CompletenessSummary) -> SurveyResult<()> {
    let p = path.display().to_string();
    let is_new = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(FileIoSnafu { path: p.clone() })?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_new {
        wtr.write_record(LOG_HEADER)
            .context(CsvWriteSnafu { path: p.clone() })?;
    }
    wtr.write_record(&[
        at.to_string(),
        summary.finished.to_string(),
        summary.total.to_string(),
        format!("{:.2}", summary.rate()),
    ])
    .context(CsvWriteSnafu { path: p.clone() })?;
    wtr.flush().context(FileIoSnafu { path: p })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::io_excel::write_grid;
    use crate::survey::test_support::{questionnaire_grid, test_settings};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn done(modified: &str) -> FileState {
        FileState::Done {
            modified: modified.to_string(),
        }
    }

    #[test]
    fn timestamp_only_moves_when_becoming_done() {
        assert_eq!(
            transition(&done("t2"), "X", "t1", "V", "X"),
            ("V".to_string(), "t2".to_string())
        );
        assert_eq!(
            transition(&done("t2"), "", "", "V", "X"),
            ("V".to_string(), "t2".to_string())
        );
        assert_eq!(
            transition(&done("t3"), "V", "t2", "V", "X"),
            ("V".to_string(), "t2".to_string())
        );
        for state in [FileState::Missing, FileState::Unreadable, FileState::Incomplete] {
            assert_eq!(
                transition(&state, "V", "t2", "V", "X"),
                ("X".to_string(), "t2".to_string())
            );
        }
    }

    #[test]
    fn rate_has_no_division_by_zero() {
        let s = CompletenessSummary {
            finished: 1,
            total: 3,
        };
        assert_eq!(format!("{:.2}", s.rate()), "33.33");
        let empty = CompletenessSummary {
            finished: 0,
            total: 0,
        };
        assert_eq!(empty.rate(), 0.0);
    }

    fn setup(root: &Path) -> Settings {
        let settings = test_settings(root);
        fs::create_dir_all(&settings.data_dir).unwrap();
        write_grid(
            &settings.roster_file,
            &[
                vec![text("id"), text("name"), text(STATUS_COLUMN), text(TIMESTAMP_COLUMN)],
                vec![text("1001"), CellValue::Empty, text("X"), text("2025-01-01 00:00:00")],
                vec![text("1002"), text("Bob")],
                vec![CellValue::Empty, text("Nobody")],
            ],
        )
        .unwrap();
        let bob = settings.data_dir.join("1002").join("files");
        fs::create_dir_all(&bob).unwrap();
        write_grid(
            &bob.join("survey_Bob.xlsx"),
            &questionnaire_grid("ok", "Bob", &["Q1"], &[("S1", vec![Some(3)])]),
        )
        .unwrap();
        settings
    }

    #[test]
    fn missing_file_keeps_previous_timestamp() {
        let root = tempfile::tempdir().unwrap();
        let settings = setup(root.path());

        let summary = track(&settings).unwrap().unwrap();
        assert_eq!(
            summary,
            CompletenessSummary {
                finished: 1,
                total: 2
            }
        );

        let roster = read_roster(&settings.roster_file).unwrap();
        let status = roster.column_index(STATUS_COLUMN).unwrap();
        let time = roster.column_index(TIMESTAMP_COLUMN).unwrap();
        assert_eq!(roster.text(0, status), "X");
        assert_eq!(roster.text(0, time), "2025-01-01 00:00:00");
        assert_eq!(roster.text(1, status), "V");
        assert_eq!(roster.text(1, time).len(), "2025-01-01 00:00:00".len());
        assert_eq!(roster.text(2, status), "");
        assert_eq!(roster.text(2, 1), "Nobody");

        let log = fs::read_to_string(&settings.completeness_log).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "datetime,finished,total,rate_percent");
        assert!(lines[1].ends_with(",1,2,50.00"));
    }

    #[test]
    fn done_timestamp_is_frozen_and_log_grows() {
        let root = tempfile::tempdir().unwrap();
        let settings = setup(root.path());
        track(&settings).unwrap();

        // Pretend the questionnaire was marked done long ago.
        let mut roster = read_roster(&settings.roster_file).unwrap();
        let time = roster.column_index(TIMESTAMP_COLUMN).unwrap();
        let mut times: Vec<CellValue> = (0..roster.rows.len())
            .map(|r| text(&roster.text(r, time)))
            .collect();
        times[1] = text("2024-12-24 10:00:00");
        roster.set_column(TIMESTAMP_COLUMN, times);
        roster.save().unwrap();

        track(&settings).unwrap();
        let roster = read_roster(&settings.roster_file).unwrap();
        assert_eq!(roster.text(1, time), "2024-12-24 10:00:00");

        let log = fs::read_to_string(&settings.completeness_log).unwrap();
        assert_eq!(log.lines().count(), 3);
        assert_eq!(log.matches("datetime").count(), 1);
    }

    #[test]
    fn roster_without_identifiers_changes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let settings = test_settings(root.path());
        fs::create_dir_all(&settings.data_dir).unwrap();
        write_grid(
            &settings.roster_file,
            &[vec![text("id")], vec![text("none")]],
        )
        .unwrap();
        assert_eq!(track(&settings).unwrap(), None);
        assert!(!settings.completeness_log.exists());
    }

    #[test]
    fn missing_roster_stops_the_run() {
        let root = tempfile::tempdir().unwrap();
        let settings = test_settings(root.path());
        fs::create_dir_all(&settings.data_dir).unwrap();
        assert!(matches!(
            track(&settings),
            Err(SurveyError::MissingFile { .. })
        ));
    }
}
