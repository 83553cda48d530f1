//! Newline-delimited JSON framing for requests and responses.
//!
//! Compact JSON never contains a raw `\n` (newlines inside strings are
//! escaped), so a single trailing newline unambiguously terminates a frame.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::CodecError;

/// Byte that terminates every frame.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Serialize `value` as compact JSON followed by [`FRAME_DELIMITER`].
pub fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut bytes = serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))?;
    bytes.push(FRAME_DELIMITER);
    Ok(bytes)
}

/// Decode a single frame. The trailing delimiter (and a preceding `\r`) is optional.
pub fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> Result<T, CodecError> {
    let mut body = frame;
    if let Some(stripped) = body.strip_suffix(&[FRAME_DELIMITER]) {
        body = stripped;
    }
    if let Some(stripped) = body.strip_suffix(b"\r") {
        body = stripped;
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(CodecError::Empty);
    }

    serde_json::from_slice(body).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Params, PeerId, Request, Response, U256};

    #[test]
    fn test_encode_appends_single_delimiter() {
        let req = Request {
            params: Params::new("bafy\nwith-newline"),
            reply_addrs: vec![],
        };
        let frame = encode_frame(&req).unwrap();

        assert_eq!(frame.last(), Some(&FRAME_DELIMITER));
        assert_eq!(frame.iter().filter(|b| **b == FRAME_DELIMITER).count(), 1);
    }

    #[test]
    fn test_response_preserves_large_price() {
        let resp = Response {
            params: Params::new("bafy-a").with_selector("*"),
            provider: PeerId::new("prov"),
            price_per_byte: U256::MAX,
            payment_interval: u64::MAX,
            payment_interval_increase: 3,
        };
        let decoded: Response = decode_frame(&encode_frame(&resp).unwrap()).unwrap();
        assert_eq!(decoded, resp);
    }

    #[test]
    fn test_decode_without_delimiter() {
        let decoded: Params =
            decode_frame(br#"{"payloadCid":"x","pieceCid":null,"selector":null}"#).unwrap();
        assert_eq!(decoded, Params::new("x"));
    }

    #[test]
    fn test_decode_crlf() {
        let decoded: Params =
            decode_frame(b"{\"payloadCid\":\"x\",\"pieceCid\":null,\"selector\":null}\r\n").unwrap();
        assert_eq!(decoded.payload_cid.as_str(), "x");
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_frame::<Request>(b"\n"), Err(CodecError::Empty)));
        assert!(matches!(decode_frame::<Request>(b"not json\n"), Err(CodecError::Decode(_))));
        assert!(matches!(decode_frame::<Request>(b"{\"params\":1}\n"), Err(CodecError::Decode(_))));
    }
}
