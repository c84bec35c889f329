use crate::spec::StubResponse;
use std::io::Cursor;
use tiny_http::{Header, Response};

/// Reason phrase for a known status code, or the empty string for codes
/// without a registered name. Arbitrary numeric codes are still served.
///
/// This table feeds serve-path diagnostics. On the wire `tiny_http`
/// substitutes its own phrase, so an unlisted code reaches the client as
/// `Unknown` rather than an empty phrase; the status number is authoritative
/// either way.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

/// Build a transport-native response from response data.
///
/// The body is written as a fixed-length (non-chunked) entity. The declared
/// content type is applied first, then each declared header in declaration
/// order. Names are not deduplicated or validated beyond the transport's own
/// token rules, so a header given twice is written twice.
///
/// # Errors
///
/// Fails if a declared header name or value is not representable on the wire.
pub fn build_response(spec: &StubResponse) -> anyhow::Result<Response<Cursor<Vec<u8>>>> {
    let body = spec.body.clone().unwrap_or_default();
    let mut response = Response::from_data(body.into_bytes()).with_status_code(spec.status);
    if let Some(content_type) = &spec.content_type {
        response = response.with_header(header("Content-Type", content_type)?);
    }
    for (name, value) in &spec.headers {
        response = response.with_header(header(name, value)?);
    }
    Ok(response)
}

fn header(name: &str, value: &str) -> anyhow::Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow::anyhow!("header {name:?}: {value:?} is not representable"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::HeaderVec;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(599), "");
    }

    #[test]
    fn test_build_preserves_duplicate_headers() {
        let mut headers = HeaderVec::new();
        headers.push(("Set-Cookie".to_string(), "a=1".to_string()));
        headers.push(("Set-Cookie".to_string(), "b=2".to_string()));
        let response = build_response(&StubResponse {
            status: 200,
            headers,
            body: Some("ok".to_string()),
            content_type: Some("text/plain".to_string()),
        })
        .expect("build");
        let cookies: Vec<String> = response
            .headers()
            .iter()
            .filter(|h| h.field.equiv("Set-Cookie"))
            .map(|h| h.value.to_string())
            .collect();
        assert_eq!(cookies, vec!["a=1".to_string(), "b=2".to_string()]);
    }
}
