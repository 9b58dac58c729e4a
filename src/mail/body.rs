use log::warn;
use mailparse::ParsedMail;

use crate::mail::mime::{decoded_text, is_attachment_disposition, walk};

const HTML_MARKER: &str = "<html>";
const HTML_WRAP_WIDTH: usize = 1000;

/// Produces one readable body string for a parsed message.
///
/// Single-part messages return their payload. Multipart messages concatenate
/// every non-attachment `text/plain` part in walk order. Either way, text that
/// carries an `<html>` marker is converted to plain text, and the result is
/// trimmed.
pub fn extract_body(mail: &ParsedMail) -> String {
    let body = if mail.subparts.is_empty() {
        decoded_text(mail)
    } else {
        walk(mail)
            .into_iter()
            .filter(|p| p.ctype.mimetype.eq_ignore_ascii_case("text/plain"))
            .filter(|p| !is_attachment_disposition(p))
            .map(decoded_text)
            .collect::<String>()
    };

    if body.to_ascii_lowercase().contains(HTML_MARKER) {
        return html_to_text(&body);
    }
    body.trim().to_string()
}

/// Line-oriented text from HTML. Keeps the input unchanged if conversion fails.
pub fn html_to_text(html: &str) -> String {
    convert_html(html, |bytes| html2text::from_read(bytes, HTML_WRAP_WIDTH))
}

fn convert_html<E, F>(html: &str, convert: F) -> String
where
    E: std::fmt::Display,
    F: FnOnce(&[u8]) -> Result<String, E>,
{
    match convert(html.as_bytes()) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("HTML conversion failed, keeping markup: {e}");
            html.trim().to_string()
        }
    }
}
