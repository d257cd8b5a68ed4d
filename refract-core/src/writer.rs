// Terminal response assembly

use crate::HttpResponse;
use std::collections::HashMap;

/// Header set on 200 responses when the transform did not set it
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Build the terminal response for the engine.
///
/// A 200 carries the body and a `Content-Length` computed from the BYTE
/// length of the body (multi-byte text makes the character count wrong)
/// unless a header already set it explicitly. A 304 carries status and
/// headers only; the body is dropped.
pub fn write_out(status: u16, body: Vec<u8>, headers: HashMap<String, String>) -> HttpResponse {
    let mut response = HttpResponse::new(status);
    response.headers = headers;

    if status == 200 {
        if !response.headers.contains_key(CONTENT_LENGTH) {
            response
                .headers
                .insert(CONTENT_LENGTH.to_string(), body.len().to_string());
        }
        response.body = body;
    }

    response
}
