use crate::survey::*;

use questionnaire::{column_index, CellRef, SheetLayout};
use serde::{Deserialize, Serialize};

pub const SMTP_PASSWORD_VARIABLE: &str = "SURVEY_SMTP_PASSWORD";

const DEFAULT_BODY: &str = "Dear {name},\n\n\
If you have not completed the questionnaire yet, please take a few minutes to fill it in.\n\
If you already did, you can ignore this message.\n\
Your account is {id} and your password is {password}.\n\
The attached guide explains how to open and submit the questionnaire.\n\n\
Thank you for your help!\n";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct LayoutSettings {
    #[serde(rename = "markerCell")]
    pub marker_cell: Option<String>,
    #[serde(rename = "nameCell")]
    pub name_cell: Option<String>,
    #[serde(rename = "questionColumn")]
    pub question_column: Option<String>,
    #[serde(rename = "firstQuestionRow")]
    pub first_question_row: Option<u32>,
    #[serde(rename = "lastQuestionRow")]
    pub last_question_row: Option<u32>,
    #[serde(rename = "subjectHeaderRow")]
    pub subject_header_row: Option<u32>,
    #[serde(rename = "firstSubjectColumn")]
    pub first_subject_column: Option<String>,
    #[serde(rename = "notApplicableTail")]
    pub not_applicable_tail: Option<usize>,
}

impl LayoutSettings {
    pub fn sheet_layout(&self) -> SurveyResult<SheetLayout> {
        let d = SheetLayout::DEFAULT_LAYOUT;
        let first_question_row = self.first_question_row.unwrap_or(d.first_question_row);
        let last_question_row = self.last_question_row.unwrap_or(d.last_question_row);
        if first_question_row == 0 || last_question_row < first_question_row {
            whatever!(
                "Invalid question rows: {}..{}",
                first_question_row,
                last_question_row
            )
        }
        Ok(SheetLayout {
            marker_cell: read_cell_ref(&self.marker_cell, "markerCell")?.unwrap_or(d.marker_cell),
            name_cell: read_cell_ref(&self.name_cell, "nameCell")?.unwrap_or(d.name_cell),
            question_column: read_column(&self.question_column, "questionColumn")?
                .unwrap_or(d.question_column),
            first_question_row,
            last_question_row,
            subject_header_row: self.subject_header_row.unwrap_or(d.subject_header_row),
            first_subject_column: read_column(&self.first_subject_column, "firstSubjectColumn")?
                .unwrap_or(d.first_subject_column),
            not_applicable_tail: self.not_applicable_tail.unwrap_or(d.not_applicable_tail),
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct MailSettings {
    #[serde(rename = "senderAddress")]
    pub sender_address: Option<String>,
    #[serde(rename = "smtpHost")]
    pub smtp_host: Option<String>,
    #[serde(rename = "smtpPort")]
    pub smtp_port: Option<u16>,
    #[serde(rename = "smtpUser")]
    pub smtp_user: Option<String>,
    #[serde(rename = "smtpPassword")]
    pub smtp_password: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "bodyTemplate")]
    pub body_template: Option<String>,
    pub attachment: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct SurveyConfig {
    #[serde(rename = "dataDirectory")]
    pub data_directory: Option<String>,
    #[serde(rename = "filesSubdirectory")]
    pub files_subdirectory: Option<String>,
    #[serde(rename = "rosterFile")]
    pub roster_file: Option<String>,
    #[serde(rename = "templateFile")]
    pub template_file: Option<String>,
    #[serde(rename = "filePrefix")]
    pub file_prefix: Option<String>,
    #[serde(rename = "reportFile")]
    pub report_file: Option<String>,
    #[serde(rename = "completenessLog")]
    pub completeness_log: Option<String>,
    #[serde(rename = "moveTargetDirectory")]
    pub move_target_directory: Option<String>,
    #[serde(rename = "naMarker")]
    pub na_marker: Option<String>,
    #[serde(rename = "doneMarker")]
    pub done_marker: Option<String>,
    #[serde(rename = "notDoneMarker")]
    pub not_done_marker: Option<String>,
    pub layout: Option<LayoutSettings>,
    pub mail: Option<MailSettings>,
}

/// Mail settings with every default applied.
#[derive(Eq, PartialEq, Clone)]
pub struct MailConfig {
    pub sender: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub subject: String,
    pub body_template: String,
    pub attachment: PathBuf,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("sender", &self.sender)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("subject", &self.subject)
            .field("attachment", &self.attachment)
            .finish()
    }
}

/// The settings of a run, with every path resolved.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub files_subdirectory: String,
    pub roster_file: PathBuf,
    pub template_file: PathBuf,
    pub file_prefix: String,
    pub report_file: PathBuf,
    pub completeness_log: PathBuf,
    pub move_target_directory: Option<PathBuf>,
    pub na_marker: String,
    pub done_marker: String,
    pub not_done_marker: String,
    pub layout: SheetLayout,
    pub mail: MailConfig,
}

impl Settings {
    /// Resolves a configuration against the directory its relative paths refer to.
    pub fn resolve(config: &SurveyConfig, root: &Path) -> SurveyResult<Settings> {
        let path = |x: &Option<String>, default: &str| -> PathBuf {
            let p = PathBuf::from(x.clone().unwrap_or_else(|| default.to_string()));
            if p.is_absolute() {
                p
            } else {
                root.join(p)
            }
        };
        let text = |x: &Option<String>, default: &str| -> String {
            x.clone().unwrap_or_else(|| default.to_string())
        };

        let layout = config.layout.clone().unwrap_or_default().sheet_layout()?;
        let m = config.mail.clone().unwrap_or_default();
        let sender = text(&m.sender_address, "noreply@example.com");
        let mail = MailConfig {
            user: m.smtp_user.clone().unwrap_or_else(|| sender.clone()),
            sender,
            host: text(&m.smtp_host, "localhost"),
            port: m.smtp_port.unwrap_or(465),
            password: m.smtp_password.clone(),
            subject: text(&m.subject, "Questionnaire reminder"),
            body_template: text(&m.body_template, DEFAULT_BODY),
            attachment: path(&m.attachment, "file/guide.pdf"),
        };

        Ok(Settings {
            data_dir: path(&config.data_directory, "data"),
            files_subdirectory: text(&config.files_subdirectory, "files"),
            roster_file: path(&config.roster_file, "list_all.xlsx"),
            template_file: path(&config.template_file, "questionnaire.xlsx"),
            file_prefix: text(&config.file_prefix, "survey"),
            report_file: path(&config.report_file, "survey_report.xlsx"),
            completeness_log: path(&config.completeness_log, "completeness_log.csv"),
            move_target_directory: config
                .move_target_directory
                .as_ref()
                .map(|_| path(&config.move_target_directory, "")),
            na_marker: text(&config.na_marker, "N/A"),
            done_marker: text(&config.done_marker, "V"),
            not_done_marker: text(&config.not_done_marker, "X"),
            layout,
            mail,
        })
    }
}

pub fn read_config(path: &str) -> SurveyResult<SurveyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SurveyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    info!("read_config: {:?}", config.data_directory);
    Ok(config)
}

/// Reads the configuration file if one is given, otherwise uses the defaults
/// relative to the current directory.
pub fn read_settings(config_path: Option<&str>) -> SurveyResult<Settings> {
    match config_path {
        Some(p) => {
            let config = read_config(p)?;
            let root = match Path::new(p).parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            Settings::resolve(&config, &root)
        }
        None => Settings::resolve(&SurveyConfig::default(), Path::new(".")),
    }
}

fn read_cell_ref(x: &Option<String>, setting: &str) -> SurveyResult<Option<CellRef>> {
    match x {
        None => Ok(None),
        Some(s) => CellRef::parse(s)
            .map(Some)
            .context(InvalidCellReferenceSnafu {
                reference: s,
                setting,
            }),
    }
}

fn read_column(x: &Option<String>, setting: &str) -> SurveyResult<Option<u32>> {
    match x {
        None => Ok(None),
        Some(s) => column_index(s)
            .map(Some)
            .context(InvalidCellReferenceSnafu {
                reference: s,
                setting,
            }),
    }
}
