use crate::spec::{parse_query_params, StubRequest};
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Convert a `tiny_http` request into the abstract representation used by the
/// matching engine.
///
/// Header names are lowercased; the query string is split off the path and
/// parsed; the content type is read from the actual `Content-Type` header;
/// the body, when present, is materialized into a mapping (JSON object for
/// JSON bodies, form fields otherwise).
///
/// # Errors
///
/// Fails if the method token is invalid or the body cannot be read from the
/// connection.
pub fn adapt_request(req: &mut tiny_http::Request) -> anyhow::Result<StubRequest> {
    let method = Method::from_bytes(req.method().to_string().as_bytes())?;
    let raw_path = req.url().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.field.as_str().as_str().to_ascii_lowercase(),
                h.value.as_str().to_string(),
            )
        })
        .collect();

    let query_params = parse_query_params(&raw_path);
    let content_type = headers.get("content-type").cloned();

    let mut body_str = String::new();
    req.as_reader().read_to_string(&mut body_str)?;
    let body = parse_body(&body_str, content_type.as_deref());

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        param_count = query_params.len(),
        body_bytes = body_str.len(),
        "Transport request adapted"
    );

    Ok(StubRequest {
        method,
        path,
        headers,
        query_params,
        body,
        content_type,
    })
}

/// Materialize a non-empty body into a mapping: JSON bodies are parsed as
/// JSON, everything else as form fields.
fn parse_body(raw: &str, content_type: Option<&str>) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    if content_type.is_some_and(|ct| ct.starts_with("application/json")) {
        return serde_json::from_str(raw).ok();
    }
    let fields: Map<String, Value> = url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    Some(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_form_fields() {
        let body = parse_body("name=doggo&kind=pug", None).expect("body");
        assert_eq!(body["name"], "doggo");
        assert_eq!(body["kind"], "pug");
    }

    #[test]
    fn test_parse_body_json() {
        let body = parse_body(r#"{"id": 7}"#, Some("application/json")).expect("body");
        assert_eq!(body["id"], 7);
    }

    #[test]
    fn test_parse_body_empty_is_absent() {
        assert_eq!(parse_body("", None), None);
    }
}
