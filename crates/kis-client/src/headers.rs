//! Request header helpers.
//!
//! Headers are plain `HeaderMap`s. The session keeps one as an immutable
//! template; every request works on its own clone so per-call headers
//! (`tr_id`, `custtype`, `hashkey`) never leak between requests.
//! Credential values are marked sensitive and print as `Sensitive`.

use crate::error::{ClientError, ClientResult};
use reqwest::header::{HeaderMap, HeaderValue};

pub const TR_ID: &str = "tr_id";
pub const CUSTTYPE: &str = "custtype";
pub const HASHKEY: &str = "hashkey";
pub const APPKEY: &str = "appkey";
pub const APPSECRET: &str = "appsecret";
pub const CHARSET: &str = "charset";

/// Insert or replace a header.
pub fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> ClientResult<()> {
    headers.insert(name, header_value(name, value)?);
    Ok(())
}

/// Insert or replace a credential header; its value never appears in `Debug`.
pub fn insert_sensitive(
    headers: &mut HeaderMap,
    name: &'static str,
    value: &str,
) -> ClientResult<()> {
    let mut value = header_value(name, value)?;
    value.set_sensitive(true);
    headers.insert(name, value);
    Ok(())
}

/// Header value as text. `None` when absent or not visible ASCII.
pub fn text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_value(name: &str, value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_sensitive_values() {
        let mut headers = HeaderMap::new();
        insert_sensitive(&mut headers, "authorization", "Bearer abc").unwrap();
        insert_sensitive(&mut headers, APPSECRET, "s3cr3t").unwrap();
        insert(&mut headers, TR_ID, "TTTC0012U").unwrap();

        let printed = format!("{headers:?}");
        assert!(!printed.contains("abc"));
        assert!(!printed.contains("s3cr3t"));
        assert!(printed.contains("TTTC0012U"));
        assert_eq!(text(&headers, APPSECRET), Some("s3cr3t"));
    }

    #[test]
    fn test_lookup_ignores_name_case() {
        let mut headers = HeaderMap::new();
        insert(&mut headers, "content-type", "application/json").unwrap();
        assert_eq!(text(&headers, "Content-Type"), Some("application/json"));
        assert!(text(&headers, TR_ID).is_none());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut template = HeaderMap::new();
        insert(&mut template, CUSTTYPE, "P").unwrap();
        let mut per_request = template.clone();
        insert(&mut per_request, HASHKEY, "h").unwrap();
        assert!(!template.contains_key(HASHKEY));
        assert_eq!(per_request.len(), 2);
    }

    #[test]
    fn test_control_characters_are_rejected() {
        let mut headers = HeaderMap::new();
        let err = insert(&mut headers, "user-agent", "bad\nagent").unwrap_err();
        assert!(matches!(err, ClientError::InvalidHeader(_)));
        assert!(headers.is_empty());
    }
}
