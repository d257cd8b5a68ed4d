//! End-to-end pipeline tests for the transform middleware against real files.

use refract_core::*;
use regex::Regex;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn next_handler(called: Arc<AtomicBool>) -> Next {
    Box::new(move |_req| {
        called.store(true, Ordering::SeqCst);
        Box::pin(async { Ok(HttpResponse::not_found()) })
            as Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
    })
}

fn css_to_styl(root: &std::path::Path, transform: impl Transform + 'static) -> TransformConfig {
    TransformConfig::new(root, Regex::new(r"(.+)\.css").unwrap(), transform)
        .with_normalize(NormalizeRule::template("$1.styl"))
}

/// Copies file content through unchanged, counting invocations.
fn counting_copy(calls: Arc<AtomicUsize>) -> impl Transform {
    transform_fn(move |_path, input| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(input.map(|content| {
                TransformOutput::bytes(content.as_bytes().to_vec()).with_content_type("text/css")
            }))
        }
    })
}

fn write_source(dir: &tempfile::TempDir, name: &str, contents: &[u8]) {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn serves_transformed_source_for_matching_request() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"body{color:red}");

    let calls = Arc::new(AtomicUsize::new(0));
    let engine =
        StaticTransform::new(css_to_styl(dir.path(), counting_copy(calls.clone()))).unwrap();

    let next_called = Arc::new(AtomicBool::new(false));
    let response = engine
        .handle(HttpRequest::get("/app.css"), next_handler(next_called.clone()))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"body{color:red}".to_vec());
    assert_eq!(response.header("Content-Type"), Some(&"text/css".to_string()));
    assert_eq!(response.header("Content-Length"), Some(&"15".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!next_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn missing_source_passes_through() {
    let dir = tempfile::tempdir().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let engine =
        StaticTransform::new(css_to_styl(dir.path(), counting_copy(calls.clone()))).unwrap();

    let next_called = Arc::new(AtomicBool::new(false));
    let response = engine
        .handle(
            HttpRequest::get("/missing.css"),
            next_handler(next_called.clone()),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert!(next_called.load(Ordering::SeqCst));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_method_never_reaches_loader_or_transform() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"body{}");

    let calls = Arc::new(AtomicUsize::new(0));
    let engine =
        StaticTransform::new(css_to_styl(dir.path(), counting_copy(calls.clone()))).unwrap();

    for method in ["POST", "PUT", "DELETE", "OPTIONS", "PATCH"] {
        let next_called = Arc::new(AtomicBool::new(false));
        let req = HttpRequest::new(method.to_string(), "/app.css".to_string());
        engine
            .handle(req, next_handler(next_called.clone()))
            .await
            .unwrap();
        assert!(next_called.load(Ordering::SeqCst), "{method} must pass through");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_matching_path_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"body{}");

    let calls = Arc::new(AtomicUsize::new(0));
    let engine =
        StaticTransform::new(css_to_styl(dir.path(), counting_copy(calls.clone()))).unwrap();

    let next_called = Arc::new(AtomicBool::new(false));
    engine
        .handle(HttpRequest::get("/app.js"), next_handler(next_called.clone()))
        .await
        .unwrap();

    assert!(next_called.load(Ordering::SeqCst));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn head_requests_run_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"body{}");

    let calls = Arc::new(AtomicUsize::new(0));
    let engine =
        StaticTransform::new(css_to_styl(dir.path(), counting_copy(calls.clone()))).unwrap();

    let next_called = Arc::new(AtomicBool::new(false));
    let response = engine
        .handle(HttpRequest::head("/app.css"), next_handler(next_called))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cache_hit_skips_loader_and_transform() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"body{color:red}");

    let calls = Arc::new(AtomicUsize::new(0));
    let config = css_to_styl(dir.path(), counting_copy(calls.clone()))
        .with_cache(true)
        .with_max_age(3600);
    let engine = StaticTransform::new(config).unwrap();

    let first = engine
        .handle(
            HttpRequest::get("/app.css"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();
    assert_eq!(first.status, 200);
    assert_eq!(
        first.header("Cache-Control"),
        Some(&"public, max-age=3600".to_string())
    );
    assert!(first.header("Expires").is_some());
    assert!(first.header("Last-Modified").is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.cache().len(), 1);

    // Delete the source: a cache hit must not touch the loader at all.
    std::fs::remove_file(dir.path().join("app.styl")).unwrap();

    let second = engine
        .handle(
            HttpRequest::get("/app.css"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();
    assert_eq!(second.status, 200);
    assert_eq!(second.body, b"body{color:red}".to_vec());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cached_entry_with_conditional_header_yields_304() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"body{color:red}");

    let config = css_to_styl(dir.path(), counting_copy(Arc::new(AtomicUsize::new(0))))
        .with_cache(true)
        .with_max_age(3600);
    let engine = StaticTransform::new(config).unwrap();

    engine
        .handle(
            HttpRequest::get("/app.css"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();

    let response = engine
        .handle(
            HttpRequest::get("/app.css")
                .with_header("If-Modified-Since", "Sat, 01 Jan 2022 00:00:00 GMT"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 304);
    assert!(response.body.is_empty());
    assert!(response.header("Cache-Control").is_some());
}

#[tokio::test]
async fn conditional_header_without_cached_entry_is_a_full_response() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"body{}");

    let config = css_to_styl(dir.path(), counting_copy(Arc::new(AtomicUsize::new(0))))
        .with_cache(true);
    let engine = StaticTransform::new(config).unwrap();

    let response = engine
        .handle(
            HttpRequest::get("/app.css")
                .with_header("If-Modified-Since", "Sat, 01 Jan 2022 00:00:00 GMT"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();

    // First request has nothing cached yet, so the full body is served.
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"body{}".to_vec());
}

#[tokio::test]
async fn caching_disabled_recomputes_every_request() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"body{}");

    let calls = Arc::new(AtomicUsize::new(0));
    let engine =
        StaticTransform::new(css_to_styl(dir.path(), counting_copy(calls.clone()))).unwrap();

    for _ in 0..3 {
        let response = engine
            .handle(
                HttpRequest::get("/app.css"),
                next_handler(Arc::new(AtomicBool::new(false))),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert!(response.header("Cache-Control").is_none());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn empty_output_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"anything");

    let none = transform_fn(|_path, _input| async move { Ok(None) });
    let empty = transform_fn(|_path, _input| async move { Ok(Some(TransformOutput::text(""))) });

    for transform in [
        StaticTransform::new(css_to_styl(dir.path(), none).with_cache(true)).unwrap(),
        StaticTransform::new(css_to_styl(dir.path(), empty).with_cache(true)).unwrap(),
    ] {
        let next_called = Arc::new(AtomicBool::new(false));
        let response = transform
            .handle(HttpRequest::get("/app.css"), next_handler(next_called.clone()))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(next_called.load(Ordering::SeqCst));
        // No entry may exist for a path whose transform produced no output.
        assert!(transform.cache().is_empty());
    }
}

#[tokio::test]
async fn content_length_is_byte_length_for_multibyte_text() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", "día—ñ".as_bytes());

    let engine = StaticTransform::new(css_to_styl(
        dir.path(),
        counting_copy(Arc::new(AtomicUsize::new(0))),
    ))
    .unwrap();

    let response = engine
        .handle(
            HttpRequest::get("/app.css"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();

    let expected = "día—ñ".len(); // bytes, not chars
    assert_eq!(
        response.header("Content-Length"),
        Some(&expected.to_string())
    );
    assert_eq!(response.body.len(), expected);
}

#[tokio::test]
async fn raw_encoding_hands_bytes_to_the_transform() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "logo.bin", &[0x89, 0x50, 0x4e, 0x47]);

    let saw_bytes = Arc::new(AtomicBool::new(false));
    let saw = saw_bytes.clone();
    let transform = transform_fn(move |_path, input| {
        let saw = saw.clone();
        async move {
            if let Some(SourceContent::Bytes(bytes)) = &input {
                if bytes.as_slice() == &[0x89, 0x50, 0x4e, 0x47][..] {
                    saw.store(true, Ordering::SeqCst);
                }
            }
            Ok(input.map(|content| TransformOutput::bytes(content.as_bytes().to_vec())))
        }
    });

    let config = TransformConfig::new(dir.path(), Regex::new(r"(.+)\.png").unwrap(), transform)
        .with_normalize(NormalizeRule::template("$1.bin"))
        .with_encoding(SourceEncoding::Raw);
    let engine = StaticTransform::new(config).unwrap();

    let response = engine
        .handle(
            HttpRequest::get("/logo.png"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(saw_bytes.load(Ordering::SeqCst));
}

#[tokio::test]
async fn path_only_mode_skips_the_read() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"never handed to the transform");

    let expected_path: PathBuf = dir.path().join("app.styl");
    let transform = transform_fn(move |path, input| {
        let expected = expected_path.clone();
        async move {
            assert!(input.is_none());
            assert_eq!(path, expected);
            Ok(Some(TransformOutput::text("from path only")))
        }
    });

    let config = css_to_styl(dir.path(), transform).with_path_only(true);
    let engine = StaticTransform::new(config).unwrap();

    let response = engine
        .handle(
            HttpRequest::get("/app.css"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();

    assert_eq!(response.body, b"from path only".to_vec());
}

#[tokio::test]
async fn transform_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"body{}");

    let failing =
        transform_fn(|_path, _input| async move { Err(Error::Transform("bad stylus".to_string())) });
    let engine = StaticTransform::new(css_to_styl(dir.path(), failing)).unwrap();

    let next_called = Arc::new(AtomicBool::new(false));
    let err = engine
        .handle(HttpRequest::get("/app.css"), next_handler(next_called.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transform(_)));
    assert!(err.is_server_error());
    assert!(!next_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn traversal_through_normalize_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();

    let config = TransformConfig::new(
        dir.path(),
        Regex::new(r"(.+)\.css").unwrap(),
        counting_copy(Arc::new(AtomicUsize::new(0))),
    )
    .with_normalize(NormalizeRule::function(|_| "../../etc/passwd".to_string()));
    let engine = StaticTransform::new(config).unwrap();

    let err = engine
        .handle(
            HttpRequest::get("/app.css"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn stale_cache_survives_source_changes() {
    let dir = tempfile::tempdir().unwrap();
    write_source(&dir, "app.styl", b"v1");

    let config = css_to_styl(
        dir.path(),
        counting_copy(Arc::new(AtomicUsize::new(0))),
    )
    .with_cache(true);
    let engine = StaticTransform::new(config).unwrap();

    engine
        .handle(
            HttpRequest::get("/app.css"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();

    // The cache is pure memoization: a changed source is not noticed.
    write_source(&dir, "app.styl", b"v2");
    let response = engine
        .handle(
            HttpRequest::get("/app.css"),
            next_handler(Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();
    assert_eq!(response.body, b"v1".to_vec());
}
