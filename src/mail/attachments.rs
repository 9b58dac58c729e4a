use mailparse::ParsedMail;

use crate::mail::mime::{part_filename, payload_bytes, walk};

/// Decoded filenames of every part that declares one, in walk order.
/// The disposition keyword is not consulted and duplicates are kept.
pub fn list_attachments(mail: &ParsedMail) -> Vec<String> {
    walk(mail).into_iter().filter_map(part_filename).collect()
}

/// First part whose decoded filename equals `filename`.
pub fn find_attachment<'m, 'a>(mail: &'m ParsedMail<'a>, filename: &str) -> Option<&'m ParsedMail<'a>> {
    walk(mail)
        .into_iter()
        .find(|p| part_filename(p).as_deref() == Some(filename))
}

/// Binary payload of an attachment part with its transfer encoding undone.
/// A corrupt encoding yields the encoded body rather than nothing.
pub fn attachment_bytes(part: &ParsedMail) -> Vec<u8> {
    payload_bytes(part)
}
