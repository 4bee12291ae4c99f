use chardet::{charset2encoding, detect};
use encoding_rs::{Encoding, WINDOWS_1252};

/// Decodes raw document bytes to text. UTF-8 is taken as-is; anything else is run through
/// charset detection, with Windows-1252 as the fallback for unknown labels.
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.trim_start_matches('\u{feff}').to_string();
    }

    let (charset, confidence, _language) = detect(bytes);
    let label = charset2encoding(&charset);
    let encoding = Encoding::for_label(label.as_bytes()).unwrap_or(WINDOWS_1252);
    log::debug!(
        "Detected character encoding: {} ({}, confidence {:.2})",
        encoding.name(),
        charset,
        confidence
    );

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::warn!(
            "Replacement characters inserted while decoding {} bytes as {}",
            bytes.len(),
            encoding.name()
        );
    }
    text.into_owned()
}
