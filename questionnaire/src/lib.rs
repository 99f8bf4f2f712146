/*!
Extraction and aggregation of fixed-layout spreadsheet questionnaires.

Each recipient of a survey fills one copy of the same workbook. This crate
reads such workbooks through the [`CellSource`] trait, keeps only the
completed ones and turns their score grids into [`SubjectRecord`]s. Records
from many workbooks are then rendered into one [`Report`] whose question
columns are only known once every workbook has been seen.

```
use questionnaire::builder::Collector;
use questionnaire::{CellRef, CellValue, MemorySheet, SheetLayout};

let mut sheet = MemorySheet::new();
sheet.set(CellRef::new(1, 6), CellValue::Text("OK".to_string()));
sheet.set(CellRef::new(1, 5), CellValue::Text("Alice".to_string()));
sheet.set(CellRef::new(4, 4), CellValue::Text("Communication".to_string()));
sheet.set(CellRef::new(3, 5), CellValue::Text("Bob".to_string()));
sheet.set(CellRef::new(4, 5), CellValue::Int(4));

let mut collector = Collector::new(&SheetLayout::DEFAULT_LAYOUT);
collector.add_sheet("1001", &sheet)?;
let report = collector.finish();
assert_eq!(report.columns, vec!["identifier", "name", "subject", "Communication"]);
assert_eq!(report.rows.len(), 1);
# Ok::<(), questionnaire::ExtractionError>(())
```
*/

pub mod builder;
mod config;
pub mod manual;

use log::{debug, info};
use std::collections::HashMap;

pub use crate::config::*;

/// Read access to the computed values of one worksheet.
pub trait CellSource {
    /// The value at the given position. Positions outside the used area are
    /// `CellValue::Empty`.
    fn cell(&self, at: CellRef) -> CellValue;

    /// The last populated column (1-based), 0 for an empty sheet.
    fn last_column(&self) -> u32;
}

/// A sheet held in memory, mostly useful to feed the extractor from
/// something other than a workbook file.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct MemorySheet {
    cells: HashMap<CellRef, CellValue>,
}

impl MemorySheet {
    pub fn new() -> MemorySheet {
        MemorySheet::default()
    }

    pub fn set(&mut self, at: CellRef, value: CellValue) {
        self.cells.insert(at, value);
    }
}

impl CellSource for MemorySheet {
    fn cell(&self, at: CellRef) -> CellValue {
        self.cells.get(&at).cloned().unwrap_or(CellValue::Empty)
    }

    fn last_column(&self) -> u32 {
        self.cells
            .iter()
            .filter(|(_, v)| **v != CellValue::Empty)
            .map(|(at, _)| at.col)
            .max()
            .unwrap_or(0)
    }
}

/// State shared by all the extractions of one run.
///
/// The first questionnaire that provides a label for a position fixes the
/// header of that position for the whole report. Later questionnaires only
/// fill positions that are still unset.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunContext {
    labels: Vec<Option<String>>,
    max_questions: usize,
}

impl RunContext {
    pub fn new(layout: &SheetLayout) -> RunContext {
        RunContext {
            labels: vec![None; layout.question_capacity()],
            max_questions: 0,
        }
    }

    /// The largest number of questions found in a single questionnaire.
    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    /// The canonical header for a 0-based question position.
    pub fn label(&self, idx: usize) -> String {
        match self.labels.get(idx) {
            Some(Some(s)) => s.clone(),
            _ => format!("Question {}", idx + 1),
        }
    }

    pub fn question_columns(&self) -> Vec<String> {
        (0..self.max_questions).map(|idx| self.label(idx)).collect()
    }

    fn offer_label(&mut self, idx: usize, label: &str) {
        if idx >= self.labels.len() {
            self.labels.resize(idx + 1, None);
        }
        if let Some(slot) = self.labels.get_mut(idx) {
            if slot.is_none() {
                debug!("offer_label: position {} is now {:?}", idx + 1, label);
                *slot = Some(label.to_string());
            }
        }
    }

    fn observe_question_count(&mut self, count: usize) {
        if count > self.max_questions {
            self.max_questions = count;
        }
    }
}

/// Checks the marker cell only.
pub fn is_complete<S: CellSource + ?Sized>(sheet: &S, layout: &SheetLayout) -> bool {
    match sheet.cell(layout.marker_cell) {
        CellValue::Text(s) => s.trim().eq_ignore_ascii_case(COMPLETION_TOKEN),
        _ => false,
    }
}

/// Extracts the records of one questionnaire.
///
/// An incomplete questionnaire yields no record and no error. Subjects
/// without a single score are dropped. The question labels and the question
/// count found here are recorded in `ctx` even when the questionnaire turns
/// out to have no subject.
pub fn extract_subjects<S: CellSource + ?Sized>(
    sheet: &S,
    recipient_id: &str,
    layout: &SheetLayout,
    ctx: &mut RunContext,
) -> Result<Vec<SubjectRecord>, ExtractionError> {
    if !is_complete(sheet, layout) {
        debug!("extract_subjects: {}: marker not set, skipping", recipient_id);
        return Ok(Vec::new());
    }

    let recipient_name = sheet.cell(layout.name_cell).as_text();

    // Question rows stop at the first blank, zero or false label.
    let mut question_rows: Vec<u32> = Vec::new();
    for row in layout.first_question_row..=layout.last_question_row {
        let label = sheet.cell(CellRef::new(row, layout.question_column));
        if label.is_unset_label() {
            break;
        }
        ctx.offer_label(question_rows.len(), &label.as_text());
        question_rows.push(row);
    }

    if question_rows.is_empty() {
        return Err(ExtractionError::NoQuestions {
            column: layout.question_column,
            first_row: layout.first_question_row,
            last_row: layout.last_question_row,
        });
    }
    ctx.observe_question_count(question_rows.len());

    let mut subject_cols: Vec<(u32, String)> = Vec::new();
    for col in layout.first_subject_column..=sheet.last_column() {
        let name = sheet.cell(CellRef::new(layout.subject_header_row, col));
        if !name.is_unset_label() {
            subject_cols.push((col, name.as_text()));
        }
    }

    if subject_cols.is_empty() {
        return Err(ExtractionError::NoSubjects {
            row: layout.subject_header_row,
            first_column: layout.first_subject_column,
        });
    }

    let num_questions = question_rows.len();
    let tail_start = num_questions.saturating_sub(layout.not_applicable_tail);

    let mut res: Vec<SubjectRecord> = Vec::new();
    for (col, subject) in subject_cols {
        let mut has_score = false;
        let mut scores: Vec<Score> = Vec::with_capacity(num_questions);
        for (q_idx, row) in question_rows.iter().enumerate() {
            let value = sheet.cell(CellRef::new(*row, col)).trimmed();
            let score = if !value.is_blank() {
                has_score = true;
                Score::Answered(value)
            } else if q_idx >= tail_start {
                Score::NotAnswered
            } else {
                Score::Baseline
            };
            scores.push(score);
        }

        if !has_score {
            debug!(
                "extract_subjects: {}: subject {:?} has no score, dropped",
                recipient_id, subject
            );
            continue;
        }

        res.push(SubjectRecord {
            recipient_id: recipient_id.to_string(),
            recipient_name: recipient_name.clone(),
            subject,
            scores,
        });
    }

    info!(
        "extract_subjects: {} ({}): {} questions, {} subjects kept",
        recipient_id,
        recipient_name,
        num_questions,
        res.len()
    );
    Ok(res)
}

/// Builds the final table once every questionnaire has been processed.
///
/// Records from questionnaires with fewer questions than the widest one are
/// padded with `Score::Absent`.
pub fn render_report(records: Vec<SubjectRecord>, ctx: &RunContext) -> Report {
    let num_q = ctx.max_questions();
    let mut columns: Vec<String> = vec![
        RECIPIENT_ID_HEADER.to_string(),
        RECIPIENT_NAME_HEADER.to_string(),
        SUBJECT_HEADER.to_string(),
    ];
    columns.extend(ctx.question_columns());

    let rows = records
        .into_iter()
        .map(|mut r| {
            r.scores.resize(num_q, Score::Absent);
            r
        })
        .collect();

    Report { columns, rows }
}
