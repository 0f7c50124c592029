//! Blog server: static files plus on-demand post pages

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{CachedPage, Freshness, PageCache};
use crate::config::FallbackMode;
use crate::error::Error;
use crate::generator::Generator;
use crate::source::ContentSource;
use crate::Blog;

/// Server state
pub struct ServerState {
    generator: Generator,
    source: Arc<dyn ContentSource>,
    cache: PageCache,
    fallback: FallbackMode,
}

impl ServerState {
    pub fn new(
        generator: Generator,
        source: Arc<dyn ContentSource>,
        revalidate: Duration,
        fallback: FallbackMode,
    ) -> Self {
        Self {
            generator,
            source,
            cache: PageCache::new(revalidate),
            fallback,
        }
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Render a post, write it to the public dir and cache it
    async fn regenerate(&self, uid: &str) -> Result<CachedPage> {
        let html = self.generator.render_post(self.source.as_ref(), uid).await?;
        self.generator.write_post(uid, &html)?;
        let page = CachedPage::new(html);
        self.cache.insert(uid, page.clone()).await;
        self.cache.take_missing(uid).await;
        tracing::info!("Regenerated post page {}", uid);
        Ok(page)
    }

    /// Cached page from memory, or from a previous build on disk
    async fn cached(&self, uid: &str) -> Option<(CachedPage, Freshness)> {
        if let Some(hit) = self.cache.get(uid).await {
            return Some(hit);
        }
        let page = self.generator.read_post(uid)?;
        self.cache.insert(uid, page).await;
        self.cache.get(uid).await
    }

    fn error_response(&self, err: &anyhow::Error) -> Response {
        let not_found = err
            .downcast_ref::<Error>()
            .is_some_and(|e| e.is_not_found());
        let status = if not_found {
            StatusCode::NOT_FOUND
        } else {
            tracing::error!("Failed to generate page: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        match self.generator.render_error(not_found) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                (status, "Server error").into_response()
            }
        }
    }
}

/// Regenerate a page in the background, at most once per uid at a time
fn spawn_regeneration(state: Arc<ServerState>, uid: String) {
    tokio::spawn(async move {
        if !state.cache.begin_regeneration(&uid).await {
            tracing::debug!("Regeneration of {} already running", uid);
            return;
        }

        if let Err(e) = state.regenerate(&uid).await {
            let not_found = e.downcast_ref::<Error>().is_some_and(|e| e.is_not_found());
            if not_found {
                state.cache.mark_missing(&uid).await;
            }
            tracing::warn!("Background regeneration of {} failed: {:#}", uid, e);
        }

        state.cache.end_regeneration(&uid).await;
    });
}

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/post/:uid", get(post_handler))
        .route("/post/:uid/", get(post_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = Arc::new(ServerState::new(
        Generator::new(blog)?,
        blog.source()?,
        blog.config.revalidate(),
        blog.config.fallback,
    ));
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Post pages: serve what is cached, generate what is not
async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<String>,
) -> Response {
    if let Some((page, freshness)) = state.cached(&uid).await {
        if freshness == Freshness::Stale {
            tracing::debug!("Serving stale page for {}", uid);
            spawn_regeneration(state.clone(), uid);
        }
        return Html(page.html.to_string()).into_response();
    }

    match state.fallback {
        FallbackMode::Blocking => match state.regenerate(&uid).await {
            Ok(page) => Html(page.html.to_string()).into_response(),
            Err(e) => state.error_response(&e),
        },
        FallbackMode::Placeholder => {
            if state.cache.take_missing(&uid).await {
                let err = anyhow::Error::from(Error::NotFound {
                    doc_type: String::new(),
                    uid,
                });
                return state.error_response(&err);
            }

            spawn_regeneration(state.clone(), uid);
            match state.generator.render_loading() {
                Ok(html) => Html(html).into_response(),
                Err(e) => state.error_response(&e),
            }
        }
    }
}

/// Everything else comes straight from the public dir
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let mut service =
        ServeDir::new(state.generator.public_dir()).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MAX_MISSING;
    use crate::source::testing::{post_document, MemorySource};
    use http_body_util::BodyExt;
    use std::sync::atomic::Ordering;
    use std::time::SystemTime;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const DAY: Duration = Duration::from_secs(86_400);

    struct Fixture {
        _dir: TempDir,
        source: Arc<MemorySource>,
        state: Arc<ServerState>,
    }

    fn fixture(fallback: FallbackMode) -> Fixture {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let source = Arc::new(MemorySource::new(
            vec![post_document("hooks", "Como utilizar Hooks", 10)],
            1,
        ));
        let state = Arc::new(ServerState::new(
            Generator::new(&blog).unwrap(),
            source.clone(),
            DAY,
            fallback,
        ));
        Fixture {
            _dir: dir,
            source,
            state,
        }
    }

    async fn get_page(state: &Arc<ServerState>, uri: &str) -> (StatusCode, String) {
        let response = router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    /// Poll until the cached page for `uid` satisfies `done`
    async fn wait_for_cache(state: &ServerState, uid: &str, done: impl Fn(&str) -> bool) {
        for _ in 0..200 {
            if let Some((page, _)) = state.cache.get(uid).await {
                if done(&page.html) {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("page {} was never regenerated", uid);
    }

    #[tokio::test]
    async fn test_ungenerated_post_is_built_on_request() {
        let f = fixture(FallbackMode::Blocking);
        let (status, body) = get_page(&f.state, "/post/hooks").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Como utilizar Hooks</h1>"));
        assert!(f.state.generator.read_post("hooks").is_some());
        assert_eq!(f.state.cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_trailing_slash_route() {
        let f = fixture(FallbackMode::Blocking);
        let (status, body) = get_page(&f.state, "/post/hooks/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Como utilizar Hooks"));
    }

    #[tokio::test]
    async fn test_missing_post_is_404() {
        let f = fixture(FallbackMode::Blocking);
        let (status, body) = get_page(&f.state, "/post/ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post não encontrado"));
    }

    #[tokio::test]
    async fn test_fresh_page_skips_the_source() {
        let f = fixture(FallbackMode::Blocking);
        f.state
            .cache
            .insert("hooks", CachedPage::new("<p>cached</p>"))
            .await;

        let (status, body) = get_page(&f.state, "/post/hooks").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>cached</p>");
        assert_eq!(f.source.get_by_uid_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_page_is_served_then_regenerated() {
        let f = fixture(FallbackMode::Blocking);
        f.state
            .cache
            .insert(
                "hooks",
                CachedPage::generated_at("<p>old</p>", SystemTime::now() - DAY * 2),
            )
            .await;

        let (status, body) = get_page(&f.state, "/post/hooks").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>old</p>");

        wait_for_cache(&f.state, "hooks", |html| html.contains("Como utilizar Hooks")).await;
        let (_, freshness) = f.state.cache.get("hooks").await.unwrap();
        assert_eq!(freshness, Freshness::Fresh);
    }

    #[tokio::test]
    async fn test_failed_regeneration_keeps_stale_page() {
        let f = fixture(FallbackMode::Blocking);
        f.source.set_documents(Vec::new());
        f.state
            .cache
            .insert(
                "hooks",
                CachedPage::generated_at("<p>old</p>", SystemTime::now() - DAY * 2),
            )
            .await;

        let (_, body) = get_page(&f.state, "/post/hooks").await;
        assert_eq!(body, "<p>old</p>");

        for _ in 0..200 {
            if f.source.get_by_uid_calls.load(Ordering::SeqCst) > 0
                && f.state.cache.begin_regeneration("hooks").await
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let (page, _) = f.state.cache.get("hooks").await.unwrap();
        assert_eq!(&*page.html, "<p>old</p>");
    }

    #[tokio::test]
    async fn test_placeholder_mode_serves_loading_page() {
        let f = fixture(FallbackMode::Placeholder);
        let (status, body) = get_page(&f.state, "/post/hooks").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));
        assert!(body.contains(r#"http-equiv="refresh""#));

        wait_for_cache(&f.state, "hooks", |html| html.contains("Como utilizar Hooks")).await;
        let (_, body) = get_page(&f.state, "/post/hooks").await;
        assert!(body.contains("<h1>Como utilizar Hooks</h1>"));
    }

    #[tokio::test]
    async fn test_placeholder_reports_missing_post_once_then_retries() {
        let f = fixture(FallbackMode::Placeholder);
        let (status, _) = get_page(&f.state, "/post/ghost").await;
        assert_eq!(status, StatusCode::OK);

        for _ in 0..200 {
            if f.state.cache.missing_len().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let (status, body) = get_page(&f.state, "/post/ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post não encontrado"));
        assert_eq!(f.state.cache.missing_len().await, 0);
    }

    #[tokio::test]
    async fn test_many_unknown_uids_keep_missing_record_bounded() {
        let f = fixture(FallbackMode::Placeholder);
        f.source.set_documents(Vec::new());
        let requests = MAX_MISSING + 100;

        for i in 0..requests {
            let (status, _) = get_page(&f.state, &format!("/post/ghost-{}", i)).await;
            assert_eq!(status, StatusCode::OK);
        }
        for _ in 0..500 {
            if f.source.get_by_uid_calls.load(Ordering::SeqCst) == requests
                && f.state.cache.missing_len().await == MAX_MISSING
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(f.source.get_by_uid_calls.load(Ordering::SeqCst), requests);
        assert_eq!(f.state.cache.missing_len().await, MAX_MISSING);
    }

    #[tokio::test]
    async fn test_static_files_are_served() {
        let f = fixture(FallbackMode::Blocking);
        f.state
            .generator
            .generate_listing(f.source.as_ref())
            .await
            .unwrap();

        let (status, body) = get_page(&f.state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"href="/post/hooks""#));

        let (status, _) = get_page(&f.state, "/nope.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
