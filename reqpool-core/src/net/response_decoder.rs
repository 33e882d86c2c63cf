use serde::de::DeserializeOwned;

use crate::envelope::Body;
use crate::error::Error;
use crate::net::transport::RawResponse;

/// turns a raw response into a body and, if the attempt failed, the reason.
///
/// a non 2xx status is always a failure, but its body is still kept so the
/// caller can look at whatever error payload the server sent. a 2xx response
/// that is not valid JSON fails with the parse error and keeps the raw text
pub fn decode<T>(response: RawResponse) -> (Option<Body<T>>, Option<Error>)
where
    T: DeserializeOwned,
{
    let RawResponse { status, body } = response;
    let parsed = serde_json::from_str::<T>(&body);

    if !(200..300).contains(&status) {
        let body = match parsed {
            Ok(parsed) => Body::Parsed(parsed),
            Err(_) => Body::Raw(body),
        };
        return (Some(body), Some(Error::HttpStatus(status)));
    }

    match parsed {
        Ok(parsed) => (Some(Body::Parsed(parsed)), None),
        Err(e) => (Some(Body::Raw(body)), Some(Error::from(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[test]
    fn test_decodes_json() {
        let (body, error) = decode::<Value>(RawResponse::new(200, r#"{"ok":true}"#));
        assert!(error.is_none());
        assert_eq!(body, Some(Body::Parsed(json!({"ok": true}))));
    }

    #[test]
    fn test_falls_back_to_raw_text() {
        let (body, error) = decode::<Value>(RawResponse::new(200, "not-json"));
        assert!(matches!(error, Some(Error::Parse(_))));
        assert_eq!(body, Some(Body::Raw("not-json".into())));
    }

    #[test]
    fn test_status_failure_embeds_code() {
        let (body, error) = decode::<Value>(RawResponse::new(404, "Not Found"));
        let error = error.expect("404 must be an error");
        assert!(error.to_string().contains("404"));
        assert_eq!(body, Some(Body::Raw("Not Found".into())));
    }

    #[test]
    fn test_shape_mismatch_is_a_parse_error() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Todo {
            id: u64,
            completed: bool,
        }

        let (body, error) = decode::<Todo>(RawResponse::new(200, r#"{"id":"one"}"#));
        assert!(matches!(error, Some(Error::Parse(_))));
        assert_eq!(body, Some(Body::Raw(r#"{"id":"one"}"#.into())));

        let (body, error) = decode::<Todo>(RawResponse::new(200, r#"{"id":1,"completed":true}"#));
        assert!(error.is_none());
        assert_eq!(body, Some(Body::Parsed(Todo { id: 1, completed: true })));
    }
}
