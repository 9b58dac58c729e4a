use serde::Serialize;

/// Mailbox-assigned 1-based sequence number. Not stable across sessions.
pub type EmailId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailSummary {
    pub id: EmailId,
    pub date: String,
    pub from: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailDetail {
    #[serde(flatten)]
    pub summary: EmailSummary,
    pub body: String,
    /// Decoded filenames in part order; duplicates preserved.
    pub attachments: Vec<String>,
}
