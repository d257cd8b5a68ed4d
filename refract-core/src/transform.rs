// The transform seam: opaque content transformation behind a trait object

use crate::{Error, SourceContent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Output of a successful transform: the response body plus any headers the
/// transform wants on the response (typically Content-Type).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransformOutput {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl TransformOutput {
    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            body,
            headers: HashMap::new(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::bytes(body.into().into_bytes())
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_content_type(self, value: impl Into<String>) -> Self {
        self.with_header("Content-Type", value)
    }
}

/// A content transformation the engine treats as a black box.
///
/// `input` is `None` in path-only mode; otherwise it holds the file contents
/// in the configured encoding. Returning `Ok(None)` means "no content" and
/// the engine passes the request to the next handler. Returning `Err` means
/// the asset pipeline itself is broken and the error propagates; it is never
/// downgraded to a pass-through.
///
/// The future resolving is the completion callback: it completes exactly
/// once, and there is no timeout on it. A hung transform stalls only the
/// request that invoked it.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(
        &self,
        path: &Path,
        input: Option<SourceContent>,
    ) -> Result<Option<TransformOutput>, Error>;
}

/// Adapter lifting a plain async closure into [`Transform`].
///
/// ```
/// use refract_core::{transform_fn, TransformOutput};
///
/// let copy = transform_fn(|_path, input| async move {
///     Ok(input.map(|content| {
///         TransformOutput::bytes(content.as_bytes().to_vec()).with_content_type("text/css")
///     }))
/// });
/// # let _ = copy;
/// ```
pub struct TransformFn<F> {
    f: F,
}

pub fn transform_fn<F, Fut>(f: F) -> TransformFn<F>
where
    F: Fn(PathBuf, Option<SourceContent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<TransformOutput>, Error>> + Send + 'static,
{
    TransformFn { f }
}

#[async_trait]
impl<F, Fut> Transform for TransformFn<F>
where
    F: Fn(PathBuf, Option<SourceContent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<TransformOutput>, Error>> + Send + 'static,
{
    async fn apply(
        &self,
        path: &Path,
        input: Option<SourceContent>,
    ) -> Result<Option<TransformOutput>, Error> {
        (self.f)(path.to_path_buf(), input).await
    }
}
