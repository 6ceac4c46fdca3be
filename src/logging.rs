//! Middleware for logging requests and responses.

use axum::{extract::Request, http::header::CONTENT_TYPE, middleware::Next, response::Response};

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged in full at the `debug` level instead.
/// Password fields in JSON request bodies are redacted before logging.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (headers, body_text) = extract_header_and_body_text_from_request(request).await;

    if headers.method.eq(&axum::http::Method::POST)
        && headers.headers.get(CONTENT_TYPE) == Some(&"application/json".parse().unwrap())
    {
        let display_text = redact_password(&body_text, "password");
        log_request(&headers, &display_text);
    } else {
        log_request(&headers, &body_text);
    }

    let request = Request::from_parts(headers, body_text.into());
    let response = next.run(request).await;

    let (headers, body_text) = extract_header_and_body_text_from_response(response).await;
    log_response(&headers, &body_text);

    Response::from_parts(headers, body_text.into())
}

/// Replace the string value of `field_name` in a JSON `body_text` with
/// asterisks. Best effort: the first occurrence is redacted, nested escapes
/// are not parsed.
fn redact_password(body_text: &str, field_name: &str) -> String {
    let key = format!("\"{field_name}\"");

    let key_pos = match body_text.find(&key) {
        Some(pos) => pos,
        None => return body_text.to_string(),
    };

    let rest = &body_text[key_pos + key.len()..];
    let colon_pos = match rest.find(':') {
        Some(pos) => pos,
        None => return body_text.to_string(),
    };

    let open_quote = match rest[colon_pos..].find('"') {
        Some(pos) => pos,
        None => return body_text.to_string(),
    };
    let value_start = key_pos + key.len() + colon_pos + open_quote + 1;

    let bytes = body_text.as_bytes();
    let mut value_end = value_start;
    while value_end < body_text.len() {
        if bytes[value_end] == b'"' && bytes[value_end - 1] != b'\\' {
            break;
        }
        value_end += 1;
    }

    format!(
        "{}********{}",
        &body_text[..value_start],
        &body_text[value_end..]
    )
}

async fn extract_header_and_body_text_from_request(
    request: Request,
) -> (axum::http::request::Parts, String) {
    let (headers, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn extract_header_and_body_text_from_response(
    response: Response,
) -> (axum::http::response::Parts, String) {
    let (headers, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

const LOG_BODY_LENGTH_LIMIT: usize = 64;

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {headers:#?}\nbody: {:}...",
            &body[..LOG_BODY_LENGTH_LIMIT]
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {headers:#?}\nbody: {body:?}");
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {headers:#?}\nbody: {:}...",
            &body[..LOG_BODY_LENGTH_LIMIT]
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {headers:#?}\nbody: {body:?}");
    }
}
