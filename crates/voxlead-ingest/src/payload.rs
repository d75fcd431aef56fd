use crate::error::IngestError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Decodes an upload given as `data:<mime>;base64,<data>` or as bare base64.
pub fn decode_file_payload(input: &str) -> Result<Vec<u8>, IngestError> {
    let input = input.trim();
    let encoded = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| IngestError::Decode("data URI has no payload".to_string()))?;
            if !header.ends_with(";base64") {
                return Err(IngestError::Decode(
                    "data URI must be base64-encoded".to_string(),
                ));
            }
            data
        }
        None => input,
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(IngestError::Decode("file payload is empty".to_string()));
    }
    STANDARD
        .decode(compact)
        .map_err(|e| IngestError::Decode(e.to_string()))
}
