use crate::survey::{
    io_common::{questionnaire_file_name, recipient_files_dir},
    io_excel::{read_roster, set_text_cell},
    *,
};

/// Creates `<data>/<id>/files/<prefix>_<name>.xlsx` for every roster entry:
/// a copy of the template with the recipient name in the name cell.
///
/// Existing questionnaires are never overwritten. Returns the number of
/// questionnaires created.
pub fn distribute(settings: &Settings) -> SurveyResult<usize> {
    let roster = read_roster(&settings.roster_file)?;
    roster.require_columns(2)?;

    if create_dir(&settings.data_dir)? {
        info!("distribute: created {}", settings.data_dir.display());
    }

    require_file(&settings.template_file)?;

    let mut created: usize = 0;
    for entry in roster.entries() {
        if !entry.is_usable() {
            continue;
        }
        let files_dir = recipient_files_dir(settings, &entry.id);
        match create_dir(&files_dir) {
            Ok(true) => info!("distribute: created {}", files_dir.display()),
            Ok(false) => {}
            Err(e) => {
                warn!("distribute: {}: {}", entry.id, e);
                continue;
            }
        }

        let dest = files_dir.join(questionnaire_file_name(&settings.file_prefix, &entry.name));
        if dest.exists() {
            info!(
                "distribute: {} already exists, skipping (id: {}, name: {})",
                dest.display(),
                entry.id,
                entry.name
            );
            continue;
        }

        if let Err(e) = fs::copy(&settings.template_file, &dest) {
            warn!(
                "distribute: cannot copy the template to {}: {}",
                dest.display(),
                e
            );
            continue;
        }
        match set_text_cell(&dest, settings.layout.name_cell, &entry.name) {
            Ok(()) => {
                info!(
                    "distribute: wrote {} (id: {}, name: {})",
                    dest.display(),
                    entry.id,
                    entry.name
                );
                created += 1;
            }
            Err(e) => {
                warn!(
                    "distribute: cannot write the name into {} (id: {}, name: {}): {}",
                    dest.display(),
                    entry.id,
                    entry.name,
                    e
                );
            }
        }
    }
    Ok(created)
}
