use crate::error::AssetError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Encode an image buffer as a self-describing `data:` URL.
pub fn encode_for_transport(buffer: &[u8], mime_type: &str) -> String {
    let payload = STANDARD.encode(buffer);
    let mut text = String::with_capacity(SCHEME.len() + mime_type.len() + BASE64_MARKER.len() + payload.len());
    text.push_str(SCHEME);
    text.push_str(mime_type);
    text.push_str(BASE64_MARKER);
    text.push_str(&payload);
    text
}

/// Decode a `data:` URL back into its bytes and MIME type.
pub fn decode_from_transport(text: &str) -> Result<(Vec<u8>, String), AssetError> {
    let (mime_type, payload) = split_transport(text)?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| AssetError::malformed(format!("invalid base64 payload: {}", e)))?;
    Ok((bytes, mime_type.to_string()))
}

/// Split a `data:` URL into its MIME header and base64 payload without
/// decoding the payload.
pub(crate) fn split_transport(text: &str) -> Result<(&str, &str), AssetError> {
    let rest = text
        .strip_prefix(SCHEME)
        .ok_or_else(|| AssetError::malformed("missing data: scheme"))?;

    let marker = rest
        .find(BASE64_MARKER)
        .ok_or_else(|| AssetError::malformed("missing ;base64, marker"))?;

    let mime_type = &rest[..marker];
    if !is_valid_mime(mime_type) {
        return Err(AssetError::malformed(format!(
            "unrecognized MIME type header '{}'",
            mime_type
        )));
    }

    Ok((mime_type, &rest[marker + BASE64_MARKER.len()..]))
}

fn is_valid_mime(header: &str) -> bool {
    // Parameters (";charset=...") may follow the essence
    let essence = header.split(';').next().unwrap_or_default();
    match essence.split_once('/') {
        Some((kind, subtype)) => {
            !kind.is_empty()
                && !subtype.is_empty()
                && !subtype.contains('/')
                && !essence.chars().any(|c| c.is_whitespace() || c == ',')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_embeds_mime_type() {
        let text = encode_for_transport(&[0xFF, 0xD8, 0xFF], "image/jpeg");
        assert_eq!(text, "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_round_trip_preserves_bytes_and_mime() {
        let samples = vec![
            (Vec::new(), "image/png"),
            (vec![0u8], "image/jpeg"),
            (vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46], "image/jpeg"),
            (b"not really an image".to_vec(), "application/octet-stream"),
        ];

        for (bytes, mime) in samples {
            let (decoded, decoded_mime) =
                decode_from_transport(&encode_for_transport(&bytes, mime)).unwrap();
            assert_eq!(decoded, bytes);
            assert_eq!(decoded_mime, mime);
        }
    }

    #[test]
    fn test_round_trip_all_byte_values() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(1021).collect();
        let (decoded, mime) =
            decode_from_transport(&encode_for_transport(&bytes, "image/webp")).unwrap();
        assert_eq!(decoded, bytes);
        assert_eq!(mime, "image/webp");
    }

    #[test]
    fn test_mime_parameters_are_kept() {
        let text = "data:image/jpeg;name=sample.jpg;base64,/9j/";
        let (_, mime) = decode_from_transport(text).unwrap();
        assert_eq!(mime, "image/jpeg;name=sample.jpg");
    }

    #[test]
    fn test_missing_scheme_is_malformed() {
        let result = decode_from_transport("image/jpeg;base64,/9j/");
        assert!(matches!(result, Err(AssetError::Malformed { .. })));
    }

    #[test]
    fn test_missing_mime_header_is_malformed() {
        assert!(decode_from_transport("data:;base64,/9j/").is_err());
        assert!(decode_from_transport("data:jpeg;base64,/9j/").is_err());
        assert!(decode_from_transport("data:image/;base64,/9j/").is_err());
    }

    #[test]
    fn test_non_base64_payload_is_malformed() {
        assert!(decode_from_transport("data:image/jpeg,/9j/").is_err());
        let err = decode_from_transport("data:image/jpeg;base64,@@not-base64@@").unwrap_err();
        assert!(err.to_string().contains("invalid base64 payload"));
    }
}
