// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The computed content of one spreadsheet cell.
///
/// Formulas are never seen at this level: readers are expected to hand over
/// the cached result of the computation.
#[derive(PartialEq, Debug, Clone)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// True for empty cells and for text that only contains whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// True when the cell cannot name a question or a subject: blank, zero
    /// or false.
    pub fn is_unset_label(&self) -> bool {
        match self {
            CellValue::Int(0) | CellValue::Bool(false) => true,
            CellValue::Float(f) => *f == 0.0,
            x => x.is_blank(),
        }
    }

    /// The content as trimmed text. Empty cells become the empty string.
    ///
    /// Whole floats are rendered without their fractional part, so that an
    /// identifier typed as `1001` does not come back as `1001.0`.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => "".to_string(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", *f as i64)
            }
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }

    /// Same value with surrounding whitespace removed from text.
    pub fn trimmed(&self) -> CellValue {
        match self {
            CellValue::Text(s) if s.trim().is_empty() => CellValue::Empty,
            CellValue::Text(s) => CellValue::Text(s.trim().to_string()),
            x => x.clone(),
        }
    }
}

/// A cell position, 1-based like the spreadsheet applications display it.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> CellRef {
        CellRef { row, col }
    }

    /// Parses a reference in A1 notation, for example `F1` or `AB12`.
    pub fn parse(a1: &str) -> Option<CellRef> {
        let s = a1.trim();
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        let col = column_index(letters)?;
        let row = digits.parse::<u32>().ok().filter(|r| *r >= 1)?;
        Some(CellRef { row, col })
    }
}

impl Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row)
    }
}

/// Converts column letters to a 1-based column index: `A` is 1, `AA` is 27.
pub fn column_index(letters: &str) -> Option<u32> {
    let letters = letters.trim();
    if letters.is_empty() {
        return None;
    }
    let mut idx: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let v = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        idx = idx.checked_mul(26)?.checked_add(v)?;
    }
    Some(idx)
}

/// Converts a 1-based column index back to its letters.
pub fn column_name(col: u32) -> String {
    let mut name = String::new();
    let mut n = col;
    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    name
}

// ********* Layout **********

/// Where things live inside a questionnaire workbook.
///
/// Every questionnaire handed out for a survey follows the same layout:
/// a marker cell the respondent sets to `ok` when finished, a cell with the
/// respondent name, a column of question labels and a row of subject names.
/// Scores sit at the intersection of question rows and subject columns.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct SheetLayout {
    pub marker_cell: CellRef,
    pub name_cell: CellRef,
    pub question_column: u32,
    pub first_question_row: u32,
    /// Inclusive.
    pub last_question_row: u32,
    pub subject_header_row: u32,
    pub first_subject_column: u32,
    /// How many trailing questions get the not-answered marker instead of a
    /// zero when left blank.
    pub not_applicable_tail: usize,
}

impl SheetLayout {
    pub const DEFAULT_LAYOUT: SheetLayout = SheetLayout {
        marker_cell: CellRef::new(1, 6),
        name_cell: CellRef::new(1, 5),
        question_column: 4,
        first_question_row: 4,
        last_question_row: 11,
        subject_header_row: 3,
        first_subject_column: 5,
        not_applicable_tail: 2,
    };

    /// Number of question slots the layout can hold.
    pub fn question_capacity(&self) -> usize {
        if self.last_question_row < self.first_question_row {
            0
        } else {
            (self.last_question_row - self.first_question_row + 1) as usize
        }
    }
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout::DEFAULT_LAYOUT
    }
}

/// The value the marker cell must hold, compared trimmed and without case.
pub const COMPLETION_TOKEN: &str = "ok";

// ******** Output data structures *********

/// One score in the consolidated report.
#[derive(PartialEq, Debug, Clone)]
pub enum Score {
    /// The value found in the cell.
    Answered(CellValue),
    /// Blank cell outside the trailing questions: counts as zero.
    Baseline,
    /// Blank cell in one of the trailing questions.
    NotAnswered,
    /// The questionnaire had fewer questions than the widest one seen.
    Absent,
}

/// The answers given by one recipient about one subject.
#[derive(PartialEq, Debug, Clone)]
pub struct SubjectRecord {
    pub recipient_id: String,
    pub recipient_name: String,
    pub subject: String,
    /// Indexed by question position (0-based).
    pub scores: Vec<Score>,
}

pub const RECIPIENT_ID_HEADER: &str = "identifier";
pub const RECIPIENT_NAME_HEADER: &str = "name";
pub const SUBJECT_HEADER: &str = "subject";

/// The consolidated table. Every row has exactly `columns.len() - 3` scores.
#[derive(PartialEq, Debug, Clone)]
pub struct Report {
    pub columns: Vec<String>,
    pub rows: Vec<SubjectRecord>,
}

impl Report {
    pub fn question_columns(&self) -> &[String] {
        &self.columns[3..]
    }
}

/// Reasons for which a completed questionnaire could not be read.
///
/// None of them should stop a run: the file is reported and skipped.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ExtractionError {
    NoQuestions {
        column: u32,
        first_row: u32,
        last_row: u32,
    },
    NoSubjects {
        row: u32,
        first_column: u32,
    },
}

impl Error for ExtractionError {}

impl Display for ExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionError::NoQuestions {
                column,
                first_row,
                last_row,
            } => write!(
                f,
                "no question label between {} and {}",
                CellRef::new(*first_row, *column),
                CellRef::new(*last_row, *column)
            ),
            ExtractionError::NoSubjects { row, first_column } => write!(
                f,
                "no subject name in row {} from column {} onwards",
                row,
                column_name(*first_column)
            ),
        }
    }
}
