//! Response builders

use directory_api::ErrorReply;
use directory_core::DirectoryError;
use http_body_util::Full;
use hyper::{body::Bytes, header, Response, StatusCode};

pub type Body = Full<Bytes>;

fn build(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Body> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));
    response
}

pub fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Body> {
    build(status, "application/json", Bytes::from(body))
}

pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Body> {
    build(status, "text/plain; charset=utf-8", body.into())
}

/// Status code reported for a failed directory call
pub fn error_status(err: &DirectoryError) -> StatusCode {
    match err {
        DirectoryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        DirectoryError::Store(_)
        | DirectoryError::StoreUnavailable(_)
        | DirectoryError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        DirectoryError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: &DirectoryError) -> Response<Body> {
    let reply = ErrorReply {
        error: err.to_string(),
    };
    let body = serde_json::to_vec(&reply).unwrap_or_default();
    json_response(error_status(err), body)
}

pub fn not_found_response(path: &str) -> Response<Body> {
    text_response(StatusCode::NOT_FOUND, format!("Not Found: {}\n", path))
}

pub fn payload_too_large_response(limit: usize) -> Response<Body> {
    text_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        format!("Request body exceeds {} bytes\n", limit),
    )
}

pub fn method_not_allowed_response() -> Response<Body> {
    text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&DirectoryError::InvalidArgument("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&DirectoryError::StoreUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            error_status(&DirectoryError::Timeout(Duration::from_secs(5))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_response() {
        let response = error_response(&DirectoryError::InvalidArgument("bad".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_not_found_response() {
        let response = not_found_response("/nope");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
