// Primitives for reading and writing Excel files.

use calamine::DataType;
use chrono::{Duration, NaiveDate};
use questionnaire::{CellRef, CellSource, CellValue};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::survey::{io_common::normalize_field, *};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The first worksheet of a workbook, with computed values only.
pub struct ExcelSheet {
    range: calamine::Range<DataType>,
}

impl ExcelSheet {
    /// All the cells from `A1` to the bottom-right used cell, row by row.
    pub fn grid(&self) -> Vec<Vec<CellValue>> {
        let (last_row, last_col) = match self.range.end() {
            Some(end) => end,
            None => return Vec::new(),
        };
        (0..=last_row)
            .map(|r| {
                (0..=last_col)
                    .map(|c| self.cell(CellRef::new(r + 1, c + 1)))
                    .collect()
            })
            .collect()
    }
}

impl CellSource for ExcelSheet {
    fn cell(&self, at: CellRef) -> CellValue {
        if at.row == 0 || at.col == 0 {
            return CellValue::Empty;
        }
        self.range
            .get_value((at.row - 1, at.col - 1))
            .map(to_cell_value)
            .unwrap_or(CellValue::Empty)
    }

    fn last_column(&self) -> u32 {
        self.range.end().map(|(_, c)| c + 1).unwrap_or(0)
    }
}

pub fn open_sheet(path: &Path) -> SurveyResult<ExcelSheet> {
    let p = path.display().to_string();
    debug!("open_sheet: path: {:?}", p);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path: p.clone() })?;
    let range = workbook
        .worksheet_range_at(0)
        .context(EmptyExcelSnafu { path: p.clone() })?
        .context(OpeningExcelSnafu { path: p })?;
    Ok(ExcelSheet { range })
}

fn to_cell_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::Empty => CellValue::Empty,
        DataType::String(s) => CellValue::Text(s.clone()),
        DataType::Int(i) => CellValue::Int(*i),
        DataType::Float(f) => CellValue::Float(*f),
        DataType::Bool(b) => CellValue::Bool(*b),
        DataType::DateTime(f) => match excel_serial_to_timestamp(*f) {
            Some(s) => CellValue::Text(s),
            None => CellValue::Float(*f),
        },
        _ => {
            debug!("to_cell_value: unreadable cell {:?}", cell);
            CellValue::Empty
        }
    }
}

/// Excel stores dates as days since 1899-12-30.
fn excel_serial_to_timestamp(serial: f64) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let dt = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    Some(dt.format(TIMESTAMP_FORMAT).to_string())
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, v: &CellValue) -> Result<(), XlsxError> {
    match v {
        CellValue::Empty => Ok(()),
        CellValue::Text(s) => ws.write_string(row, col, s.as_str()).map(|_| ()),
        CellValue::Int(i) => ws.write_number(row, col, *i as f64).map(|_| ()),
        CellValue::Float(f) => ws.write_number(row, col, *f).map(|_| ()),
        CellValue::Bool(b) => ws.write_boolean(row, col, *b).map(|_| ()),
    }
}

/// Writes the rows into the first worksheet of a new workbook, replacing any existing file.
pub fn write_grid(path: &Path, rows: &[Vec<CellValue>]) -> SurveyResult<()> {
    let p = path.display().to_string();
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, v) in row.iter().enumerate() {
            write_cell(worksheet, r as u32, c as u16, v)
                .context(WritingExcelSnafu { path: p.clone() })?;
        }
    }
    workbook.save(path).context(WritingExcelSnafu { path: p })?;
    Ok(())
}

/// Sets one text cell of the active worksheet in place. Other worksheets,
/// formulas and formatting of the workbook are kept.
pub fn set_text_cell(path: &Path, at: CellRef, value: &str) -> SurveyResult<()> {
    let p = path.display().to_string();
    let mut book =
        umya_spreadsheet::reader::xlsx::read(path).context(EditingExcelSnafu { path: p.clone() })?;
    book.get_active_sheet_mut()
        .get_cell_mut(at.to_string().as_str())
        .set_value(value);
    umya_spreadsheet::writer::xlsx::write(&book, path).context(EditingExcelSnafu { path: p })?;
    Ok(())
}

/// One line of the roster.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RosterEntry {
    /// Position among the data rows (the header is not counted).
    pub row: usize,
    pub id: String,
    pub name: String,
    pub password: String,
    pub email: String,
}

impl RosterEntry {
    pub fn is_usable(&self) -> bool {
        !self.id.is_empty()
    }
}

/// The roster spreadsheet: a header row then one recipient per row.
/// Column 0 is the identifier, 1 the name, 2 the password and 3 the email.
#[derive(PartialEq, Debug, Clone)]
pub struct Roster {
    pub path: PathBuf,
    pub header: Vec<CellValue>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Roster {
    pub fn num_columns(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    pub fn require_columns(&self, required: usize) -> SurveyResult<()> {
        let found = self.num_columns();
        ensure!(
            found >= required,
            RosterTooNarrowSnafu {
                path: self.path.display().to_string(),
                required,
                found
            }
        );
        Ok(())
    }

    pub fn text(&self, row: usize, col: usize) -> String {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|v| normalize_field(&v.as_text()))
            .unwrap_or_default()
    }

    pub fn entries(&self) -> Vec<RosterEntry> {
        (0..self.rows.len())
            .map(|row| RosterEntry {
                row,
                id: self.text(row, 0),
                name: self.text(row, 1),
                password: self.text(row, 2),
                email: self.text(row, 3),
            })
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.as_text() == name)
    }

    /// Adds the column, or overwrites it when the header already has it.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) {
        let col = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                let idx = self.num_columns();
                self.header.resize(idx, CellValue::Empty);
                self.header.push(CellValue::Text(name.to_string()));
                idx
            }
        };
        for (row, v) in values.into_iter().enumerate() {
            if let Some(r) = self.rows.get_mut(row) {
                if r.len() <= col {
                    r.resize(col + 1, CellValue::Empty);
                }
                r[col] = v;
            }
        }
    }

    pub fn save(&self) -> SurveyResult<()> {
        let mut all: Vec<Vec<CellValue>> = vec![self.header.clone()];
        all.extend(self.rows.iter().cloned());
        write_grid(&self.path, &all)
    }
}

pub fn read_roster(path: &Path) -> SurveyResult<Roster> {
    require_file(path)?;
    let mut grid = open_sheet(path)?.grid().into_iter();
    let header = grid.next().unwrap_or_default();
    let rows: Vec<Vec<CellValue>> = grid.collect();
    info!(
        "read_roster: {} rows in {}",
        rows.len(),
        path.display()
    );
    Ok(Roster {
        path: path.to_path_buf(),
        header,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn grid_round_trips_through_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("grid.xlsx");
        let rows = vec![
            vec![text("id"), text("name")],
            vec![CellValue::Int(1001), text("Alice"), CellValue::Bool(true)],
            vec![CellValue::Empty, CellValue::Float(2.5)],
        ];
        write_grid(&p, &rows).unwrap();

        let sheet = open_sheet(&p).unwrap();
        assert_eq!(sheet.last_column(), 3);
        assert_eq!(sheet.cell(CellRef::new(2, 1)).as_text(), "1001");
        assert_eq!(sheet.cell(CellRef::new(2, 2)), text("Alice"));
        assert_eq!(sheet.cell(CellRef::new(3, 2)), CellValue::Float(2.5));
        assert_eq!(sheet.cell(CellRef::new(9, 9)), CellValue::Empty);
        assert_eq!(sheet.grid().len(), 3);
        assert_eq!(sheet.grid()[0].len(), 3);
    }

    #[test]
    fn missing_or_broken_workbooks_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("broken.xlsx");
        fs::write(&p, b"not a zip").unwrap();
        assert!(matches!(
            open_sheet(&p),
            Err(SurveyError::OpeningExcel { .. })
        ));
        assert!(matches!(
            read_roster(&dir.path().join("absent.xlsx")),
            Err(SurveyError::MissingFile { .. })
        ));
    }

    #[test]
    fn roster_entries_and_new_columns() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("list_all.xlsx");
        write_grid(
            &p,
            &[
                vec![text("id"), text("name")],
                vec![CellValue::Float(1001.0), text(" Alice ")],
                vec![text("nan"), text("Nobody")],
                vec![text("1003")],
            ],
        )
        .unwrap();

        let mut roster = read_roster(&p).unwrap();
        let entries = roster.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "1001");
        assert_eq!(entries[0].name, "Alice");
        assert!(!entries[1].is_usable());
        assert_eq!(entries[2].name, "");
        assert!(roster.require_columns(4).is_err());

        roster.set_column("status", vec![text("V"), text(""), text("X")]);
        roster.set_column("name", vec![text("A"), text("B"), text("C")]);
        roster.save().unwrap();

        let again = read_roster(&p).unwrap();
        assert_eq!(again.column_index("status"), Some(2));
        assert_eq!(again.text(0, 2), "V");
        assert_eq!(again.text(2, 1), "C");
        assert_eq!(again.text(2, 2), "X");
    }

    #[test]
    fn excel_dates_become_timestamps() {
        assert_eq!(
            excel_serial_to_timestamp(45000.5).as_deref(),
            Some("2023-03-15 12:00:00")
        );
    }
}
