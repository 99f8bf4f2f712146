use std::fmt::Display;

use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::survey::{
    io_common::simplify_file_name,
    io_excel::{read_roster, RosterEntry},
    *,
};

/// What happened to each roster entry during a mailing.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MailOutcome {
    pub sent: Vec<String>,
    /// Built but not sent (dry run).
    pub prepared: Vec<String>,
    pub missing_email: Vec<String>,
    pub missing_attachment: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl MailOutcome {
    pub fn print_summary(&self) {
        println!(
            "Sent: {}, prepared: {}, without email: {}, failed: {}",
            self.sent.len(),
            self.prepared.len(),
            self.missing_email.len(),
            self.failed.len()
        );
        if !self.missing_attachment.is_empty() {
            println!("Not sent because the attachment is missing, please add it and send again:");
            println!("{}", self.missing_attachment.join(", "));
        }
        for (id, reason) in self.failed.iter() {
            println!("Failed for {}: {}", id, reason);
        }
    }
}

pub fn build_body(template: &str, entry: &RosterEntry) -> String {
    template
        .replace("{name}", &entry.name)
        .replace("{id}", &entry.id)
        .replace("{password}", &entry.password)
}

fn content_type_for(file_name: &str) -> SurveyResult<ContentType> {
    let mime = if file_name.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    };
    match ContentType::parse(mime) {
        Ok(ct) => Ok(ct),
        Err(e) => whatever!("Invalid content type {}: {:?}", mime, e),
    }
}

pub fn build_message(
    mail: &MailConfig,
    entry: &RosterEntry,
    attachment_name: &str,
    attachment: Vec<u8>,
) -> SurveyResult<Message> {
    let from: Mailbox = mail.sender.parse().context(InvalidAddressSnafu {
        address: mail.sender.clone(),
    })?;
    let to: Mailbox = entry.email.parse().context(InvalidAddressSnafu {
        address: entry.email.clone(),
    })?;
    let content_type = content_type_for(attachment_name)?;
    let parts = MultiPart::mixed()
        .singlepart(SinglePart::plain(build_body(&mail.body_template, entry)))
        .singlepart(Attachment::new(attachment_name.to_string()).body(attachment, content_type));
    Message::builder()
        .from(from)
        .to(to)
        .subject(mail.subject.clone())
        .multipart(parts)
        .context(BuildingMessageSnafu {
            recipient: entry.id.clone(),
        })
}

/// The SMTP relay over implicit TLS, authenticated with the configured user.
pub fn smtp_transport(mail: &MailConfig) -> SurveyResult<SmtpTransport> {
    let password = match &mail.password {
        Some(p) => p.clone(),
        None => std::env::var(SMTP_PASSWORD_VARIABLE)
            .ok()
            .context(MissingSmtpPasswordSnafu {
                variable: SMTP_PASSWORD_VARIABLE,
            })?,
    };
    let creds = Credentials::new(mail.user.clone(), password);
    let transport = SmtpTransport::relay(&mail.host)
        .context(SmtpSetupSnafu {
            host: mail.host.clone(),
        })?
        .credentials(creds)
        .port(mail.port)
        .build();
    Ok(transport)
}

/// Sends one reminder per roster entry, one after the other.
///
/// Entries without an email, or for which the attachment is missing, are
/// skipped. A failed delivery is recorded and the mailing goes on. Without a
/// transport, messages are built but not sent.
pub fn send_reminders<T>(settings: &Settings, transport: Option<&T>) -> SurveyResult<MailOutcome>
where
    T: Transport,
    T::Error: Display,
{
    let roster = read_roster(&settings.roster_file)?;
    roster.require_columns(4)?;
    let mail = &settings.mail;
    let attachment_name = simplify_file_name(&mail.attachment);

    let mut outcome = MailOutcome::default();
    for entry in roster.entries() {
        if entry.email.is_empty() {
            warn!("send_reminders: skipping {}: no email", entry.id);
            outcome.missing_email.push(entry.id.clone());
            continue;
        }

        let attachment = match fs::read(&mail.attachment) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    "send_reminders: attachment {} not found ({}), skipping {}",
                    mail.attachment.display(),
                    e,
                    entry.id
                );
                outcome.missing_attachment.push(entry.id.clone());
                continue;
            }
        };

        let message = match build_message(mail, &entry, &attachment_name, attachment) {
            Ok(m) => m,
            Err(e) => {
                warn!("send_reminders: {}: {}", entry.id, e);
                outcome.failed.push((entry.id.clone(), e.to_string()));
                continue;
            }
        };

        match transport {
            Some(t) => match t.send(&message) {
                Ok(_) => {
                    info!("send_reminders: sent to {}", entry.email);
                    outcome.sent.push(entry.id.clone());
                }
                Err(e) => {
                    warn!("send_reminders: delivery to {} failed: {}", entry.email, e);
                    outcome.failed.push((entry.id.clone(), e.to_string()));
                }
            },
            None => {
                debug!("send_reminders: dry run, message for {} built", entry.email);
                outcome.prepared.push(entry.id.clone());
            }
        }
    }
    Ok(outcome)
}
