use log::debug;

use crate::{extract_subjects, render_report, CellSource, RunContext};
pub use crate::config::*;

/// Accumulates the records of many questionnaires for one report.
///
/// The report columns depend on every questionnaire of the run, so the
/// table is only rendered by [`Collector::finish`].
///
/// ```
/// use questionnaire::builder::Collector;
/// use questionnaire::{MemorySheet, SheetLayout};
///
/// let mut collector = Collector::new(&SheetLayout::DEFAULT_LAYOUT);
/// // A sheet without the completion marker is skipped silently.
/// assert_eq!(collector.add_sheet("1001", &MemorySheet::new())?, 0);
/// assert!(collector.is_empty());
/// # Ok::<(), questionnaire::ExtractionError>(())
/// ```
pub struct Collector {
    layout: SheetLayout,
    context: RunContext,
    records: Vec<SubjectRecord>,
}

impl Collector {
    pub fn new(layout: &SheetLayout) -> Collector {
        Collector {
            layout: *layout,
            context: RunContext::new(layout),
            records: Vec::new(),
        }
    }

    /// Adds the records of one questionnaire and returns how many were kept.
    pub fn add_sheet<S: CellSource + ?Sized>(
        &mut self,
        recipient_id: &str,
        sheet: &S,
    ) -> Result<usize, ExtractionError> {
        let mut records = extract_subjects(sheet, recipient_id, &self.layout, &mut self.context)?;
        let n = records.len();
        debug!("add_sheet: {}: {} records", recipient_id, n);
        self.records.append(&mut records);
        Ok(n)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn finish(self) -> Report {
        render_report(self.records, &self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySheet;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn filled(name: &str, questions: &[&str], scores: &[Option<i64>]) -> MemorySheet {
        let mut sheet = MemorySheet::new();
        sheet.set(CellRef::new(1, 6), CellValue::Text("ok".to_string()));
        sheet.set(CellRef::new(1, 5), CellValue::Text(name.to_string()));
        sheet.set(CellRef::new(3, 5), CellValue::Text("Subject".to_string()));
        for (idx, q) in questions.iter().enumerate() {
            sheet.set(CellRef::new(4 + idx as u32, 4), CellValue::Text(q.to_string()));
        }
        for (idx, s) in scores.iter().enumerate() {
            if let Some(v) = s {
                sheet.set(CellRef::new(4 + idx as u32, 5), CellValue::Int(*v));
            }
        }
        sheet
    }

    #[test]
    fn late_questionnaire_can_still_name_a_new_position() {
        init();
        let mut collector = Collector::new(&SheetLayout::DEFAULT_LAYOUT);
        let n = collector
            .add_sheet("1", &filled("A", &["Q1"], &[Some(1)]))
            .unwrap();
        assert_eq!(n, 1);
        collector
            .add_sheet("2", &filled("B", &["Other", "Q2", "Q3"], &[Some(2), Some(3)]))
            .unwrap();
        assert_eq!(collector.len(), 2);
        assert_eq!(collector.context().max_questions(), 3);

        let report = collector.finish();
        assert_eq!(report.question_columns(), &["Q1", "Q2", "Q3"]);
        assert_eq!(report.rows[0].recipient_name, "A");
        assert_eq!(report.rows[0].scores[1], Score::Absent);
        assert_eq!(
            report.rows[1].scores,
            vec![
                Score::Answered(CellValue::Int(2)),
                Score::Answered(CellValue::Int(3)),
                Score::NotAnswered
            ]
        );
    }

    #[test]
    fn failed_sheet_leaves_records_untouched() {
        init();
        let mut collector = Collector::new(&SheetLayout::DEFAULT_LAYOUT);
        collector
            .add_sheet("1", &filled("A", &["Q1"], &[Some(1)]))
            .unwrap();
        let res = collector.add_sheet("2", &filled("B", &[], &[]));
        assert!(res.is_err());
        assert_eq!(collector.len(), 1);
    }
}
