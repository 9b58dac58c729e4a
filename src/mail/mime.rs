use log::warn;
use mailparse::body::Body;
use mailparse::{DispositionType, ParsedMail};

use crate::mail::decoders::{decode_header_str, decode_or_raw};

/// Depth-first, pre-order walk over a part tree, the root included.
pub fn walk<'m, 'a>(part: &'m ParsedMail<'a>) -> Vec<&'m ParsedMail<'a>> {
    let mut out = Vec::new();
    collect(part, &mut out);
    out
}

fn collect<'m, 'a>(part: &'m ParsedMail<'a>, out: &mut Vec<&'m ParsedMail<'a>>) {
    out.push(part);
    for sp in &part.subparts {
        collect(sp, out);
    }
}

/// Body bytes with the transfer encoding undone. A body that fails to decode
/// is returned still encoded, never with the part's headers.
pub fn payload_bytes(part: &ParsedMail) -> Vec<u8> {
    part.get_body_raw().unwrap_or_else(|e| {
        warn!("transfer decoding failed, keeping encoded body: {e}");
        encoded_body(part)
    })
}

fn encoded_body(part: &ParsedMail) -> Vec<u8> {
    match part.get_body_encoded() {
        Body::Base64(b) | Body::QuotedPrintable(b) => b.get_raw().to_vec(),
        Body::SevenBit(b) | Body::EightBit(b) => b.get_raw().to_vec(),
        Body::Binary(b) => b.get_raw().to_vec(),
    }
}

/// Payload text with transfer encoding undone. Uses the declared charset when
/// there is one, otherwise UTF-8; invalid sequences are replaced.
pub fn decoded_text(part: &ParsedMail) -> String {
    let raw = payload_bytes(part);
    if part.ctype.params.contains_key("charset") {
        decode_or_raw(&raw, |_| part.get_body())
    } else {
        String::from_utf8_lossy(&raw).into_owned()
    }
}

pub fn is_attachment_disposition(part: &ParsedMail) -> bool {
    matches!(
        part.get_content_disposition().disposition,
        DispositionType::Attachment
    )
}

/// The decoded filename a part declares, if any: the disposition `filename`
/// parameter first, then the content-type `name` parameter.
pub fn part_filename(part: &ParsedMail) -> Option<String> {
    let disposition = part.get_content_disposition();
    disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
        .map(decode_header_str)
}
