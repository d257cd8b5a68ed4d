// The assembled pipeline: mount-time configuration plus the middleware that
// walks match -> normalize -> load -> transform -> cache -> write

use crate::{
    caching_headers, loader, normalize, writer, CacheEntry, Error, HttpRequest, HttpResponse,
    Middleware, Next, NormalizeRule, RequestMatcher, SourceEncoding, Transform, TransformCache,
    DEFAULT_MAX_AGE_SECS,
};
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};

/// Mount-time configuration for one transform mount point.
///
/// Root, match pattern, and transform are required; everything else has a
/// default. The record is immutable once the middleware is constructed.
#[derive(Clone)]
pub struct TransformConfig {
    /// Root directory source paths are resolved under
    pub root: PathBuf,
    /// Pattern a request path must match to be intercepted
    pub pattern: Regex,
    /// The content transformation to run on matched sources
    pub transform: Arc<dyn Transform>,
    /// How a matched request path maps to a source path
    pub normalize: NormalizeRule,
    /// Memoize transformed output for the process lifetime
    pub cache: bool,
    /// Client cache lifetime in seconds (Cache-Control / Expires)
    pub max_age: u64,
    /// Encoding the transform receives file contents in
    pub encoding: SourceEncoding,
    /// Hand the transform only the resolved path, skipping the read
    pub path_only: bool,
}

impl TransformConfig {
    pub fn new(
        root: impl Into<PathBuf>,
        pattern: Regex,
        transform: impl Transform + 'static,
    ) -> Self {
        Self {
            root: root.into(),
            pattern,
            transform: Arc::new(transform),
            normalize: NormalizeRule::Passthrough,
            cache: false,
            max_age: DEFAULT_MAX_AGE_SECS,
            encoding: SourceEncoding::Utf8,
            path_only: false,
        }
    }

    pub fn with_normalize(mut self, rule: NormalizeRule) -> Self {
        self.normalize = rule;
        self
    }

    pub fn with_cache(mut self, enable: bool) -> Self {
        self.cache = enable;
        self
    }

    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn with_encoding(mut self, encoding: SourceEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_path_only(mut self, enable: bool) -> Self {
        self.path_only = enable;
        self
    }
}

impl fmt::Debug for TransformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformConfig")
            .field("root", &self.root)
            .field("pattern", &self.pattern.as_str())
            .field("normalize", &self.normalize)
            .field("cache", &self.cache)
            .field("max_age", &self.max_age)
            .field("encoding", &self.encoding)
            .field("path_only", &self.path_only)
            .finish_non_exhaustive()
    }
}

/// Middleware serving transformed static assets.
///
/// Per request: ineligible method/path, an absent source file, and empty
/// transform output all pass through to the next handler untouched. A cache
/// hit answers directly, 304 when the request carries `If-Modified-Since`.
/// Read failures on an existing file and transform failures propagate as
/// errors; they are never downgraded to a pass-through.
#[derive(Debug)]
pub struct StaticTransform {
    config: TransformConfig,
    matcher: RequestMatcher,
    cache: TransformCache,
}

impl StaticTransform {
    pub fn new(config: TransformConfig) -> Result<Self, Error> {
        if config.root.as_os_str().is_empty() {
            return Err(Error::Config(
                "root directory must not be empty".to_string(),
            ));
        }
        let matcher = RequestMatcher::new(config.pattern.clone());
        Ok(Self {
            config,
            matcher,
            cache: TransformCache::new(),
        })
    }

    /// The memoization cache for this mount point
    pub fn cache(&self) -> &TransformCache {
        &self.cache
    }

    /// Normalize a matched path and join it under the root
    fn resolve_source(&self, path: &str) -> Result<PathBuf, Error> {
        let normalized = self.config.normalize.apply(self.matcher.pattern(), path);
        normalize::resolve(&self.config.root, &normalized)
    }
}

#[async_trait]
impl Middleware for StaticTransform {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let Some(matched) = self.matcher.eligible(&req) else {
            trace!(method = %req.method, path = %req.path, "ineligible, passing through");
            return next(req).await;
        };
        let matched = matched.to_string();

        let resolved = self.resolve_source(&matched)?;

        if self.config.cache {
            if let Some(entry) = self.cache.get(&resolved) {
                let status = if req.header("If-Modified-Since").is_some() {
                    304
                } else {
                    200
                };
                debug!(source = %resolved.display(), status, "serving from transform cache");
                return Ok(writer::write_out(status, entry.body, entry.headers));
            }
        }

        let source =
            loader::load(&resolved, self.config.encoding, self.config.path_only).await?;
        let Some(source) = source else {
            trace!(source = %resolved.display(), "source absent, passing through");
            return next(req).await;
        };

        let output = self
            .config
            .transform
            .apply(&source.path, source.content)
            .await?;

        let Some(mut output) = output else {
            trace!(source = %resolved.display(), "no transform output, passing through");
            return next(req).await;
        };
        if output.body.is_empty() {
            trace!(source = %resolved.display(), "empty transform output, passing through");
            return next(req).await;
        }

        if self.config.cache {
            caching_headers(&mut output.headers, self.config.max_age, source.modified);
            self.cache.store(
                resolved.clone(),
                CacheEntry {
                    body: output.body.clone(),
                    headers: output.headers.clone(),
                },
            );
        }

        debug!(
            source = %resolved.display(),
            bytes = output.body.len(),
            "serving transformed output"
        );
        Ok(writer::write_out(200, output.body, output.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform_fn;

    fn noop_transform() -> impl Transform {
        transform_fn(|_path, _input| async move { Ok(None) })
    }

    #[test]
    fn test_config_defaults() {
        let config = TransformConfig::new(
            "/site",
            Regex::new(r"(.+)\.css").unwrap(),
            noop_transform(),
        );

        assert!(!config.cache);
        assert_eq!(config.max_age, DEFAULT_MAX_AGE_SECS);
        assert_eq!(config.encoding, SourceEncoding::Utf8);
        assert!(!config.path_only);
        assert!(matches!(config.normalize, NormalizeRule::Passthrough));
    }

    #[test]
    fn test_config_builder() {
        let config = TransformConfig::new(
            "/site",
            Regex::new(r"(.+)\.css").unwrap(),
            noop_transform(),
        )
        .with_normalize(NormalizeRule::template("$1.styl"))
        .with_cache(true)
        .with_max_age(3600)
        .with_encoding(SourceEncoding::Raw)
        .with_path_only(true);

        assert!(config.cache);
        assert_eq!(config.max_age, 3600);
        assert_eq!(config.encoding, SourceEncoding::Raw);
        assert!(config.path_only);
    }

    #[test]
    fn test_empty_root_is_rejected() {
        let config =
            TransformConfig::new("", Regex::new(r"(.+)\.css").unwrap(), noop_transform());
        let err = StaticTransform::new(config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_resolve_source_applies_template() {
        let config = TransformConfig::new(
            "/site",
            Regex::new(r"(.+)\.css").unwrap(),
            noop_transform(),
        )
        .with_normalize(NormalizeRule::template("$1.styl"));
        let engine = StaticTransform::new(config).unwrap();

        let resolved = engine.resolve_source("/app.css").unwrap();
        assert_eq!(resolved, PathBuf::from("/site/app.styl"));
    }

    #[test]
    fn test_resolve_source_is_deterministic() {
        let config = TransformConfig::new(
            "/site",
            Regex::new(r"(.+)\.css").unwrap(),
            noop_transform(),
        )
        .with_normalize(NormalizeRule::function(|p| format!("{p}.src")));
        let engine = StaticTransform::new(config).unwrap();

        assert_eq!(
            engine.resolve_source("/a.css").unwrap(),
            engine.resolve_source("/a.css").unwrap()
        );
    }

    #[test]
    fn test_config_debug_omits_transform() {
        let config = TransformConfig::new(
            "/site",
            Regex::new(r"(.+)\.css").unwrap(),
            noop_transform(),
        );
        let rendered = format!("{config:?}");
        assert!(rendered.contains("root"));
        assert!(rendered.contains(".."));
    }
}
