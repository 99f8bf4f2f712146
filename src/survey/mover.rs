use crate::survey::{
    io_common::{questionnaire_files, simplify_file_name, sorted_subdirs},
    *,
};

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct MoveSummary {
    pub moved: usize,
    /// The destination already had a file with the same name.
    pub skipped: usize,
    pub errors: usize,
}

impl MoveSummary {
    pub fn print_summary(&self) {
        println!("Moved: {} files", self.moved);
        println!(
            "Skipped: {} files (already present in the destination)",
            self.skipped
        );
        println!("Errors: {} files", self.errors);
    }
}

/// A rename cannot cross filesystems: copy then remove in that case.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("move_file: rename failed ({}), copying instead", e);
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

/// Gathers every questionnaire from the recipient directories into `target`.
pub fn move_questionnaires(settings: &Settings, target: &Path) -> SurveyResult<MoveSummary> {
    require_dir(&settings.data_dir)?;
    if create_dir(target)? {
        info!("move_questionnaires: created {}", target.display());
    }

    let mut summary = MoveSummary::default();
    for recipient_dir in sorted_subdirs(&settings.data_dir)? {
        let recipient_id = simplify_file_name(&recipient_dir);
        let files_dir = recipient_dir.join(&settings.files_subdirectory);
        if fs::symlink_metadata(&files_dir).is_err() {
            info!(
                "move_questionnaires: skipping {}: no {} directory",
                recipient_id, settings.files_subdirectory
            );
            continue;
        }
        let files = match questionnaire_files(&files_dir, &settings.file_prefix) {
            Ok(f) => f,
            Err(e) => {
                warn!("move_questionnaires: skipping {}: {}", recipient_id, e);
                continue;
            }
        };

        for path in files {
            let file_name = simplify_file_name(&path);
            let dest = target.join(&file_name);
            if dest.exists() {
                info!(
                    "move_questionnaires: {} already exists, skipping",
                    dest.display()
                );
                summary.skipped += 1;
                continue;
            }
            match move_file(&path, &dest) {
                Ok(()) => {
                    info!(
                        "move_questionnaires: {} ({}) -> {}",
                        file_name,
                        recipient_id,
                        dest.display()
                    );
                    summary.moved += 1;
                }
                Err(e) => {
                    warn!(
                        "move_questionnaires: cannot move {} to {}: {}",
                        path.display(),
                        dest.display(),
                        e
                    );
                    summary.errors += 1;
                }
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::test_support::test_settings;

    fn place(settings: &Settings, id: &str, file: &str) -> PathBuf {
        let dir = settings.data_dir.join(id).join("files");
        fs::create_dir_all(&dir).unwrap();
        let p = dir.join(file);
        fs::write(&p, id.as_bytes()).unwrap();
        p
    }

    #[test]
    fn moves_questionnaires_and_keeps_existing_ones() {
        let root = tempfile::tempdir().unwrap();
        let settings = test_settings(root.path());
        let target = root.path().join("gathered");

        let alice = place(&settings, "1001", "survey_Alice.xlsx");
        place(&settings, "1002", "survey_Bob.xlsx");
        let notes = place(&settings, "1002", "notes.xlsx");
        let carol = place(&settings, "1003", "survey_Carol.xlsx");
        fs::create_dir_all(settings.data_dir.join("1004")).unwrap();

        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("survey_Carol.xlsx"), b"older").unwrap();

        let summary = move_questionnaires(&settings, &target).unwrap();
        assert_eq!(
            summary,
            MoveSummary {
                moved: 2,
                skipped: 1,
                errors: 0
            }
        );
        assert!(!alice.exists());
        assert_eq!(fs::read(target.join("survey_Alice.xlsx")).unwrap(), b"1001");
        assert!(target.join("survey_Bob.xlsx").is_file());
        assert!(notes.exists());
        assert!(carol.exists());
        assert_eq!(fs::read(target.join("survey_Carol.xlsx")).unwrap(), b"older");
    }

    #[test]
    fn unreadable_recipient_directory_does_not_stop_the_run() {
        let root = tempfile::tempdir().unwrap();
        let settings = test_settings(root.path());
        let target = root.path().join("gathered");
        // `files` is not a directory: listing it fails.
        fs::create_dir_all(settings.data_dir.join("1000")).unwrap();
        fs::write(settings.data_dir.join("1000").join("files"), b"").unwrap();
        place(&settings, "1001", "survey_Alice.xlsx");
        place(&settings, "1002", "survey_Bob.xlsx");

        let summary = move_questionnaires(&settings, &target).unwrap();
        assert_eq!(summary.moved, 2);
        assert!(target.join("survey_Alice.xlsx").is_file());
        assert!(target.join("survey_Bob.xlsx").is_file());
    }

    #[test]
    fn target_is_created() {
        let root = tempfile::tempdir().unwrap();
        let settings = test_settings(root.path());
        place(&settings, "1001", "survey_Alice.xlsx");
        let target = root.path().join("a").join("b");

        let summary = move_questionnaires(&settings, &target).unwrap();
        assert_eq!(summary.moved, 1);
        assert!(target.join("survey_Alice.xlsx").is_file());
    }

    #[test]
    fn missing_data_directory_stops_the_run() {
        let root = tempfile::tempdir().unwrap();
        let settings = test_settings(root.path());
        assert!(matches!(
            move_questionnaires(&settings, &root.path().join("out")),
            Err(SurveyError::MissingDirectory { .. })
        ));
    }
}
