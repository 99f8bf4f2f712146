// Naming and directory conventions shared by all the commands.

use std::path::{Path, PathBuf};

use crate::survey::*;

pub const QUESTIONNAIRE_EXTENSION: &str = ".xlsx";

/// Spreadsheet readers may hand back `nan` or `none` for cells that were never filled.
pub fn normalize_field(raw: &str) -> String {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none") {
        "".to_string()
    } else {
        s.to_string()
    }
}

/// `<prefix>_<name>.xlsx`, or `<prefix>.xlsx` for recipients without a name.
pub fn questionnaire_file_name(prefix: &str, name: &str) -> String {
    if name.is_empty() {
        format!("{}{}", prefix, QUESTIONNAIRE_EXTENSION)
    } else {
        format!("{}_{}{}", prefix, name, QUESTIONNAIRE_EXTENSION)
    }
}

pub fn is_questionnaire_file(prefix: &str, file_name: &str) -> bool {
    file_name.starts_with(prefix) && file_name.ends_with(QUESTIONNAIRE_EXTENSION)
}

/// `<data>/<identifier>/<files>`
pub fn recipient_files_dir(settings: &Settings, recipient_id: &str) -> PathBuf {
    settings
        .data_dir
        .join(recipient_id)
        .join(&settings.files_subdirectory)
}

pub fn questionnaire_path(settings: &Settings, recipient_id: &str, name: &str) -> PathBuf {
    recipient_files_dir(settings, recipient_id)
        .join(questionnaire_file_name(&settings.file_prefix, name))
}

/// The subdirectories of `p`, sorted by name. Entries that cannot be read
/// are reported and left out.
pub fn sorted_subdirs(p: &Path) -> SurveyResult<Vec<PathBuf>> {
    let mut res: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(p).context(FileIoSnafu {
        path: p.display().to_string(),
    })? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("sorted_subdirs: unreadable entry in {}: {}", p.display(), e);
                continue;
            }
        };
        let ep = entry.path();
        if ep.is_dir() {
            res.push(ep);
        }
    }
    res.sort();
    Ok(res)
}

/// The questionnaires found directly in `files_dir`, sorted by name.
pub fn questionnaire_files(files_dir: &Path, prefix: &str) -> SurveyResult<Vec<PathBuf>> {
    let mut res: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(files_dir).context(FileIoSnafu {
        path: files_dir.display().to_string(),
    })? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(
                    "questionnaire_files: unreadable entry in {}: {}",
                    files_dir.display(),
                    e
                );
                continue;
            }
        };
        let ep = entry.path();
        if ep.is_file() && is_questionnaire_file(prefix, &simplify_file_name(&ep)) {
            res.push(ep);
        }
    }
    res.sort();
    Ok(res)
}

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_embeds_the_recipient_name() {
        assert_eq!(questionnaire_file_name("survey", "Alice"), "survey_Alice.xlsx");
        assert_eq!(questionnaire_file_name("survey", ""), "survey.xlsx");
        assert!(is_questionnaire_file("survey", "survey_Alice.xlsx"));
        assert!(is_questionnaire_file("survey", "survey.xlsx"));
        assert!(!is_questionnaire_file("survey", "survey_Alice.xls"));
        assert!(!is_questionnaire_file("survey", "notes.xlsx"));
    }

    #[test]
    fn pandas_placeholders_are_blank() {
        assert_eq!(normalize_field(" nan "), "");
        assert_eq!(normalize_field("None"), "");
        assert_eq!(normalize_field(" Nancy "), "Nancy");
    }

    #[test]
    fn listings_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for d in ["b", "a", "c"] {
            fs::create_dir(dir.path().join(d)).unwrap();
        }
        fs::write(dir.path().join("survey_z.xlsx"), b"").unwrap();
        fs::write(dir.path().join("survey_a.xlsx"), b"").unwrap();
        fs::write(dir.path().join("other.xlsx"), b"").unwrap();

        let dirs: Vec<String> = sorted_subdirs(dir.path())
            .unwrap()
            .iter()
            .map(|p| simplify_file_name(p))
            .collect();
        assert_eq!(dirs, vec!["a", "b", "c"]);

        let files: Vec<String> = questionnaire_files(dir.path(), "survey")
            .unwrap()
            .iter()
            .map(|p| simplify_file_name(p))
            .collect();
        assert_eq!(files, vec!["survey_a.xlsx", "survey_z.xlsx"]);
    }
}
