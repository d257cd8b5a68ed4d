// Refract - on-the-fly transformation middleware for static assets
//
// Intercepts GET/HEAD requests for pattern-matched paths, resolves the
// corresponding source file, runs it through a caller-supplied transform,
// and serves the output with process-lifetime memoization and
// conditional-request support.

// Re-export core functionality
pub use refract_core::*;

// Re-export the testing utilities when enabled
#[cfg(feature = "testing")]
pub use refract_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        transform_fn, Error, HttpRequest, HttpResponse, Middleware, MiddlewareChain,
        NormalizeRule, RequestLogMiddleware, SourceContent, SourceEncoding, StaticTransform,
        Transform, TransformConfig, TransformOutput,
    };
}
