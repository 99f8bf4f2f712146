use questionnaire::builder::Collector;
use questionnaire::Report;

use crate::survey::{
    io_common::{questionnaire_files, simplify_file_name, sorted_subdirs},
    io_excel::open_sheet,
    *,
};

/// Reads every questionnaire under the data directory.
///
/// Returns `None` when no completed questionnaire produced a record.
/// Files that cannot be opened or that lack questions or subjects are
/// reported and skipped.
pub fn collect(settings: &Settings) -> SurveyResult<Option<Report>> {
    require_dir(&settings.data_dir)?;

    let mut collector = Collector::new(&settings.layout);
    let mut seen: usize = 0;
    for recipient_dir in sorted_subdirs(&settings.data_dir)? {
        let recipient_id = simplify_file_name(&recipient_dir);
        let files_dir = recipient_dir.join(&settings.files_subdirectory);
        if fs::symlink_metadata(&files_dir).is_err() {
            debug!(
                "collect: {}: no {} directory",
                recipient_id, settings.files_subdirectory
            );
            continue;
        }
        let files = match questionnaire_files(&files_dir, &settings.file_prefix) {
            Ok(f) => f,
            Err(e) => {
                warn!("collect: skipping {}: {}", recipient_id, e);
                continue;
            }
        };

        for path in files {
            info!("collect: processing {}", path.display());
            seen += 1;
            let sheet = match open_sheet(&path) {
                Ok(s) => s,
                Err(e) => {
                    warn!("collect: skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            if let Err(e) = collector.add_sheet(&recipient_id, &sheet) {
                warn!("collect: skipping {}: {}", path.display(), e);
            }
        }
    }

    info!(
        "collect: {} files read, {} records, {} question columns",
        seen,
        collector.len(),
        collector.context().max_questions()
    );
    if collector.is_empty() {
        return Ok(None);
    }
    Ok(Some(collector.finish()))
}
