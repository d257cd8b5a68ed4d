// Test harness driving a middleware chain without a server

use refract_core::{Error, HandlerFn, HttpRequest, HttpResponse, Middleware, MiddlewareChain};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

fn not_found_handler() -> HandlerFn {
    Arc::new(|_req: HttpRequest| {
        Box::pin(async { Ok(HttpResponse::not_found()) })
            as Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
    })
}

/// Drives requests through a middleware chain in-process.
///
/// The terminal handler stands in for "the rest of the application": by
/// default it answers 404 plain text, which makes pass-through conditions
/// directly observable in tests.
pub struct TestHarness {
    chain: MiddlewareChain,
    handler: HandlerFn,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            chain: MiddlewareChain::new(),
            handler: not_found_handler(),
        }
    }

    /// Replace the terminal handler
    pub fn with_handler(mut self, handler: HandlerFn) -> Self {
        self.handler = handler;
        self
    }

    /// Mount a middleware at the end of the chain
    pub fn use_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.chain.use_middleware(middleware);
        self
    }

    /// Run a request through the chain
    pub async fn request(&self, req: HttpRequest) -> TestResponse {
        match self.chain.apply(req, self.handler.clone()).await {
            Ok(response) => TestResponse::Success(response),
            Err(error) => TestResponse::Error(error),
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(HttpRequest::get(path)).await
    }

    pub async fn head(&self, path: &str) -> TestResponse {
        self.request(HttpRequest::head(path)).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a harness request: a response, or the error the chain
/// surfaced (the FATAL path in the engine's taxonomy).
#[derive(Debug)]
pub enum TestResponse {
    Success(HttpResponse),
    Error(Error),
}

impl TestResponse {
    pub fn status(&self) -> Option<u16> {
        match self {
            TestResponse::Success(response) => Some(response.status),
            TestResponse::Error(_) => None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&String> {
        match self {
            TestResponse::Success(response) => response.header(name),
            TestResponse::Error(_) => None,
        }
    }

    pub fn body(&self) -> Option<&[u8]> {
        match self {
            TestResponse::Success(response) => Some(&response.body),
            TestResponse::Error(_) => None,
        }
    }

    pub fn body_string(&self) -> Option<String> {
        self.body()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.body().and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            TestResponse::Success(_) => None,
            TestResponse::Error(error) => Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TestResponse::Error(_))
    }

    /// Unwrap the response, panicking when the chain errored
    pub fn unwrap(self) -> HttpResponse {
        match self {
            TestResponse::Success(response) => response,
            TestResponse::Error(error) => panic!("chain returned error: {error}"),
        }
    }
}
