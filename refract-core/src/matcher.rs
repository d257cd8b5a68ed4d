// Request eligibility: method gate plus path pattern

use crate::HttpRequest;
use regex::Regex;

/// Decides whether a request is eligible for transformation.
///
/// Only GET and HEAD requests whose path (query string stripped) matches the
/// configured pattern are eligible; everything else belongs to the next
/// handler in the chain. Matching has no side effects.
#[derive(Debug, Clone)]
pub struct RequestMatcher {
    pattern: Regex,
}

impl RequestMatcher {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }

    /// The compiled match pattern, also used for template normalization
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Return the query-stripped path when the request is eligible.
    pub fn eligible<'r>(&self, req: &'r HttpRequest) -> Option<&'r str> {
        if req.method != "GET" && req.method != "HEAD" {
            return None;
        }
        let path = strip_query(&req.path);
        if self.pattern.is_match(path) {
            Some(path)
        } else {
            None
        }
    }
}

/// Drop everything from the first `?` on
pub fn strip_query(path: &str) -> &str {
    match path.split_once('?') {
        Some((before, _)) => before,
        None => path,
    }
}
