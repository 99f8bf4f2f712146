// Writers for the consolidated report.

use questionnaire::{CellValue, Report, Score};

use crate::survey::{io_excel::write_grid, *};

/// The value written in the report for a score.
pub fn score_cell(score: &Score, na_marker: &str) -> CellValue {
    match score {
        Score::Answered(v) => v.clone(),
        Score::Baseline => CellValue::Int(0),
        Score::NotAnswered => CellValue::Text(na_marker.to_string()),
        Score::Absent => CellValue::Empty,
    }
}

pub fn report_rows(report: &Report, na_marker: &str) -> Vec<Vec<CellValue>> {
    let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(report.rows.len() + 1);
    rows.push(
        report
            .columns
            .iter()
            .map(|c| CellValue::Text(c.clone()))
            .collect(),
    );
    for r in report.rows.iter() {
        let mut row = vec![
            CellValue::Text(r.recipient_id.clone()),
            CellValue::Text(r.recipient_name.clone()),
            CellValue::Text(r.subject.clone()),
        ];
        row.extend(r.scores.iter().map(|s| score_cell(s, na_marker)));
        rows.push(row);
    }
    rows
}

/// Writes the report as xlsx, or as CSV when the path ends with `.csv`.
/// Any previous report at this location is replaced.
pub fn write_report(path: &Path, report: &Report, na_marker: &str) -> SurveyResult<()> {
    let rows = report_rows(report, na_marker);
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    info!(
        "write_report: {} rows to {} ({})",
        report.rows.len(),
        path.display(),
        if is_csv { "csv" } else { "xlsx" }
    );
    if is_csv {
        write_csv(path, &rows)
    } else {
        write_grid(path, &rows)
    }
}

fn write_csv(path: &Path, rows: &[Vec<CellValue>]) -> SurveyResult<()> {
    let p = path.display().to_string();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .context(CsvWriteSnafu { path: p.clone() })?;
    for row in rows {
        let record: Vec<String> = row.iter().map(|v| v.as_text()).collect();
        wtr.write_record(&record)
            .context(CsvWriteSnafu { path: p.clone() })?;
    }
    wtr.flush().context(FileIoSnafu { path: p })?;
    Ok(())
}
