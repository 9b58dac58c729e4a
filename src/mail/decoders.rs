use log::debug;

/// Two-stage decode: try the structured decoder, and on any failure fall back
/// to the raw bytes read as lossy UTF-8.
pub fn decode_or_raw<E, F>(raw: &[u8], decode: F) -> String
where
    E: std::fmt::Display,
    F: FnOnce(&[u8]) -> Result<String, E>,
{
    match decode(raw) {
        Ok(s) => s,
        Err(e) => {
            debug!("decode failed, keeping raw value: {e}");
            String::from_utf8_lossy(raw).into_owned()
        }
    }
}

/// Decodes a header value that may contain RFC 2047 encoded-words.
///
/// Segments are concatenated in order, each decoded with its declared charset
/// (invalid sequences replaced). Never fails: a value that cannot be parsed is
/// returned as-is.
pub fn decode_header(raw: &[u8]) -> String {
    decode_or_raw(raw, |raw| {
        // mailparse expects a full "Key: value" header line
        let mut line = b"X: ".to_vec();
        line.extend_from_slice(raw);
        line.extend_from_slice(b"\r\n");

        mailparse::parse_header(&line).map(|(h, _idx)| h.get_value())
    })
}

pub fn decode_header_str(raw: &str) -> String {
    decode_header(raw.as_bytes())
}
