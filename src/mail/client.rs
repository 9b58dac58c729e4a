use log::{info, warn};
use mailparse::{MailHeader, MailHeaderMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, Credentials};
use crate::domain::email::{EmailDetail, EmailId, EmailSummary};
use crate::error::{MailError, Result};
use crate::mail::attachments::{attachment_bytes, find_attachment, list_attachments};
use crate::mail::body::extract_body;
use crate::mail::decoders::decode_header;
use crate::mail::pop3::{MailboxConnector, Pop3Session, TlsMailboxConnector};

/// List/search/read/download over POP3. Every call opens its own session and
/// closes it before returning.
pub struct MailboxClient<C: MailboxConnector = TlsMailboxConnector> {
    connector: C,
    credentials: Credentials,
}

impl MailboxClient<TlsMailboxConnector> {
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            TlsMailboxConnector::new(cfg.mailbox.clone()),
            cfg.credentials.clone(),
        )
    }
}

impl<C: MailboxConnector> MailboxClient<C> {
    pub fn new(connector: C, credentials: Credentials) -> Self {
        Self {
            connector,
            credentials,
        }
    }

    fn open_session(&self) -> Result<Pop3Session<C::Stream>> {
        let stream = self.connector.open()?;
        let mut session = Pop3Session::connect(stream)?;
        session.authenticate(&self.credentials)?;
        Ok(session)
    }

    /// The newest `count` messages, newest first. Messages whose headers
    /// cannot be fetched or parsed are skipped.
    pub fn list(&self, count: usize) -> Result<Vec<EmailSummary>> {
        let mut session = self.open_session()?;
        let ids = session.list_ids()?;
        let window = &ids[ids.len().saturating_sub(count)..];

        let mut out = Vec::with_capacity(window.len());
        for &id in window.iter().rev() {
            match session
                .fetch_header(id)
                .and_then(|raw| summary_from_header(id, &raw))
            {
                Ok(summary) => out.push(summary),
                Err(e) => warn!("skipping message {id}: {e}"),
            }
        }
        session.disconnect();

        info!("listed {} of {} messages", out.len(), ids.len());
        Ok(out)
    }

    /// Summaries among the newest `limit` messages whose subject or sender
    /// contains `keyword`, ignoring case. Older messages are not scanned.
    pub fn search(&self, keyword: &str, limit: usize) -> Result<Vec<EmailSummary>> {
        let needle = keyword.to_lowercase();
        let hits: Vec<EmailSummary> = self
            .list(limit)?
            .into_iter()
            .filter(|s| {
                s.subject.to_lowercase().contains(&needle)
                    || s.from.to_lowercase().contains(&needle)
            })
            .collect();
        info!("search '{keyword}' matched {} message(s)", hits.len());
        Ok(hits)
    }

    /// Full message with body and attachment names; `None` if the id does not exist.
    pub fn get_detail(&self, id: EmailId) -> Result<Option<EmailDetail>> {
        let raw = match self.fetch_full(id) {
            Ok(raw) => raw,
            Err(MailError::MessageNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(detail_from_raw(id, &raw)))
    }

    /// Writes the attachment whose decoded name equals `filename` to
    /// `dest_dir/filename`, creating the directory and overwriting any file.
    pub fn download_attachment(
        &self,
        id: EmailId,
        filename: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let not_found = || MailError::AttachmentNotFound {
            id,
            filename: filename.to_string(),
        };

        let raw = self.fetch_full(id)?;
        let parsed = mailparse::parse_mail(&raw).map_err(|e| {
            warn!("message {id} could not be parsed: {e}");
            not_found()
        })?;
        let part = find_attachment(&parsed, filename).ok_or_else(not_found)?;
        let bytes = attachment_bytes(part);

        let name = Path::new(filename).file_name().ok_or_else(not_found)?;
        fs::create_dir_all(dest_dir).map_err(|e| MailError::io(dest_dir, e))?;
        let path = dest_dir.join(name);
        fs::write(&path, &bytes).map_err(|e| MailError::io(&path, e))?;

        info!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// One session, one `RETR`, session closed on every path.
    fn fetch_full(&self, id: EmailId) -> Result<Vec<u8>> {
        let mut session = self.open_session()?;
        let raw = session.fetch_full(id)?;
        session.disconnect();
        Ok(raw)
    }
}

fn header_text(headers: &[MailHeader], name: &str) -> String {
    headers
        .get_first_header(name)
        .map(|h| decode_header(h.get_value_raw()).trim().to_string())
        .unwrap_or_default()
}

fn summary_from_header(id: EmailId, raw: &[u8]) -> Result<EmailSummary> {
    let (headers, _) = mailparse::parse_headers(raw)
        .map_err(|e| MailError::Protocol(format!("bad header block: {e}")))?;
    Ok(EmailSummary {
        id,
        date: header_text(&headers, "Date"),
        from: header_text(&headers, "From"),
        subject: header_text(&headers, "Subject"),
    })
}

/// Decodes a complete message. A message that cannot be parsed degrades to
/// its raw text with empty headers.
fn detail_from_raw(id: EmailId, raw: &[u8]) -> EmailDetail {
    match mailparse::parse_mail(raw) {
        Ok(parsed) => EmailDetail {
            summary: EmailSummary {
                id,
                date: header_text(&parsed.headers, "Date"),
                from: header_text(&parsed.headers, "From"),
                subject: header_text(&parsed.headers, "Subject"),
            },
            body: extract_body(&parsed),
            attachments: list_attachments(&parsed),
        },
        Err(e) => {
            warn!("message {id} could not be parsed, returning raw text: {e}");
            EmailDetail {
                summary: EmailSummary {
                    id,
                    date: String::new(),
                    from: String::new(),
                    subject: String::new(),
                },
                body: String::from_utf8_lossy(raw).trim().to_string(),
                attachments: Vec::new(),
            }
        }
    }
}
