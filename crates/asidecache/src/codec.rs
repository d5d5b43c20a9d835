//! Textual encoding of documents held in the hot tier

use asidestore::Document;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Serialize)]
struct Encoded<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct Decoded {
    key: String,
    value: String,
}

/// Encode `doc` as a JSON object `{"key": .., "value": ..}`
pub fn encode(doc: &Document) -> Result<String> {
    Ok(serde_json::to_string(&Encoded {
        key: &doc.key,
        value: &doc.value,
    })?)
}

/// Decode a cached payload, `None` if it is not a well-formed entry
pub fn decode(payload: &str) -> Option<Document> {
    serde_json::from_str::<Decoded>(payload)
        .ok()
        .map(|d| Document::new(d.key, d.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_shape() {
        let encoded = encode(&Document::new("k1", "v1")).unwrap();
        assert_eq!(encoded, r#"{"key":"k1","value":"v1"}"#);
    }

    #[test]
    fn test_control_and_unicode_survive() {
        let value = "line\n\"quoted\"\t\\ \u{0} \u{1F980} ñ";
        let doc = Document::new("k\"1", value);

        let decoded = decode(&encode(&doc).unwrap()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_garbage_is_not_an_entry() {
        assert!(decode("not json").is_none());
        assert!(decode(r#"{"key":"k1"}"#).is_none());
    }
}
