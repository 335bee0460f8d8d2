use crate::{
    DeepLink, Dictionary, LoadError, LookupView, SearchOutcome, Status, TokenTable,
    decode_fragment, normalize, resolve,
};
use askama::Template;
use axum::{
    Json, Router,
    extract::{Query, State},
    response::{Html, IntoResponse},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;

pub struct AppState {
    pub dictionary: Result<Dictionary, LoadError>,
    pub tokens: TokenTable,
    pub base_url: String,
}

impl AppState {
    fn status(&self) -> Status {
        Status::of(&self.dictionary)
    }

    /// Stateless lookup; every request is the first of its session.
    fn lookup(&self, query: &str) -> LookupPayload {
        let Ok(dictionary) = &self.dictionary else {
            return LookupPayload::unavailable(query);
        };
        let outcome = resolve(dictionary, query, &normalize(query));
        let view =
            LookupView::from_outcome(&outcome, &self.tokens).unwrap_or_else(LookupView::neutral);
        LookupPayload::from_view(query, outcome_kind(&outcome), view)
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub base_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves the lookup page. A failed load still starts the server so the page
/// can report the error; search stays disabled.
pub async fn serve(
    config: WebConfig,
    dictionary: Result<Dictionary, LoadError>,
) -> Result<(), WebError> {
    if let Err(err) = &dictionary {
        warn!(%err, "Serving without a dictionary; search disabled");
    }
    let state = Arc::new(AppState {
        dictionary,
        tokens: TokenTable::default(),
        base_url: config.base_url.clone(),
    });
    let router = build_router(state);
    info!(%config.addr, base = %config.base_url, "Binding HTTP listener");
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/lookup", get(api_lookup))
        .route("/api/status", get(api_status))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[derive(Debug, Deserialize)]
struct LookupParams {
    q: Option<String>,
    /// Raw URL fragment; decoded here so a malformed one cannot break the page.
    fragment: Option<String>,
}

impl LookupParams {
    fn into_query(self) -> String {
        self.q
            .or_else(|| self.fragment.as_deref().and_then(decode_fragment))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OutcomeKind {
    Match,
    NoMatch,
    Invalid,
    Cleared,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LinkAction {
    Keep,
    Clear,
    Set,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LookupPayload {
    query: String,
    outcome: OutcomeKind,
    headword: Option<String>,
    ghost: String,
    gloss_html: Option<String>,
    error: bool,
    disabled: bool,
    link: LinkAction,
    fragment: Option<String>,
}

impl LookupPayload {
    fn from_view(query: &str, outcome: OutcomeKind, view: LookupView) -> Self {
        let (link, fragment) = match view.deep_link {
            DeepLink::Keep => (LinkAction::Keep, None),
            DeepLink::Clear => (LinkAction::Clear, None),
            DeepLink::Set(fragment) => (LinkAction::Set, Some(fragment)),
        };
        Self {
            query: query.to_string(),
            outcome,
            headword: view.headword,
            ghost: view.ghost,
            gloss_html: view.gloss_html,
            error: view.error,
            disabled: view.disabled,
            link,
            fragment,
        }
    }

    fn unavailable(query: &str) -> Self {
        Self {
            query: query.to_string(),
            outcome: OutcomeKind::Unavailable,
            headword: None,
            ghost: String::new(),
            gloss_html: None,
            error: true,
            disabled: true,
            link: LinkAction::Keep,
            fragment: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatusPayload {
    ready: bool,
    entries: Option<usize>,
    message: String,
}

fn outcome_kind(outcome: &SearchOutcome<'_>) -> OutcomeKind {
    match outcome {
        SearchOutcome::Match(_) => OutcomeKind::Match,
        SearchOutcome::NoMatch => OutcomeKind::NoMatch,
        SearchOutcome::Invalid(_) => OutcomeKind::Invalid,
        SearchOutcome::Cleared | SearchOutcome::Unchanged => OutcomeKind::Cleared,
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "protogloss-web" }))
}

async fn api_status(State(state): State<SharedState>) -> Json<StatusPayload> {
    let status = state.status();
    let entries = match status {
        Status::Ready { entries } => Some(entries),
        Status::Unavailable => None,
    };
    Json(StatusPayload {
        ready: entries.is_some(),
        entries,
        message: status.to_string(),
    })
}

async fn api_lookup(
    State(state): State<SharedState>,
    Query(params): Query<LookupParams>,
) -> Json<LookupPayload> {
    let query = params.into_query();
    Json(state.lookup(&query))
}

async fn home(
    State(state): State<SharedState>,
    Query(params): Query<LookupParams>,
) -> impl IntoResponse {
    let query = params.into_query();
    let payload = state.lookup(&query);
    let template = HomeTemplate {
        status: state.status(),
        disabled: state.dictionary.is_err(),
        base_url: &state.base_url,
        gloss_html: payload.gloss_html.as_deref().unwrap_or_default(),
        payload: &payload,
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| format!("<!DOCTYPE html><p>{err}</p>")),
    )
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="tr">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Proto-Turkic Lexicon</title>
    <link rel="canonical" href="{{ base_url }}/">
    <style>
      body { font-family: 'Poppins', sans-serif; max-width: 44rem; margin: 3rem auto; padding: 0 1rem; }
      .search-box { position: relative; }
      .search-box input { width: 100%; font: inherit; font-size: 1.4rem; padding: .6rem .8rem; box-sizing: border-box; }
      .search-box.error input { border-color: #c0392b; outline-color: #c0392b; }
      .ghost { position: absolute; top: 0; left: 0; padding: .6rem .8rem; font-size: 1.4rem; pointer-events: none; white-space: pre; color: transparent; }
      .ghost span { color: #aaa; }
      .highlight { font-weight: bold; }
      .pink { color: #d63384; }
      .yellow { color: #b8860b; }
      .gray { color: #777; }
      .hidden { display: none; }
      .error-message { color: #c0392b; }
    </style>
  </head>
  <body>
    <p id="wordCount">{% if disabled %}<span class="error-message">{{ status }}</span>{% else %}{{ status }}{% endif %}</p>
    <div class="search-box{% if payload.error %} error{% endif %}">
      <input id="searchBox" autocomplete="off" value="{{ payload.query }}"{% if disabled %} disabled{% endif %} />
      <div class="ghost" id="ghost"><span id="typed"></span><span id="ghostText">{{ payload.ghost }}</span></div>
    </div>
    <div id="result" class="{% if disabled %}hidden{% endif %}">
      {% if !gloss_html.is_empty() %}<p class="description">{{ gloss_html|safe }}</p>{% endif %}
    </div>
    <script>
      (() => {
        const box = document.getElementById('searchBox');
        const container = document.querySelector('.search-box');
        const typed = document.getElementById('typed');
        const ghost = document.getElementById('ghostText');
        const result = document.getElementById('result');
        let last = null;
        const apply = (data) => {
          container.classList.toggle('error', data.error);
          typed.textContent = box.value;
          ghost.textContent = data.ghost;
          result.innerHTML = data.gloss_html ? '<p class="description">' + data.gloss_html + '</p>' : '';
          const url = new URL(window.location.href);
          if (data.link === 'set') { url.hash = data.fragment; }
          if (data.link === 'clear') { url.hash = ''; }
          if (data.link !== 'keep') { window.history.replaceState({}, '', url); }
        };
        const search = async (query) => {
          if (query === last) { return; }
          last = query;
          const response = await fetch('/api/lookup?q=' + encodeURIComponent(query));
          if (response.ok && box.value === query) { apply(await response.json()); }
        };
        box.addEventListener('input', () => search(box.value));
        if (window.location.hash.length > 1 && !box.disabled) {
          fetch('/api/lookup?fragment=' + encodeURIComponent(window.location.hash))
            .then((response) => (response.ok ? response.json() : null))
            .then((data) => {
              if (data && box.value === '') { box.value = data.query; last = data.query; apply(data); }
            })
            .catch(() => {});
        }
      })();
    </script>
  </body>
</html>"#,
    ext = "html"
)]
struct HomeTemplate<'a> {
    status: Status,
    disabled: bool,
    base_url: &'a str,
    gloss_html: &'a str,
    payload: &'a LookupPayload,
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;

    const DATA: &str = r#"{
        "agız": {"description": "tur word meaning mouth"},
        "boguŕ": {"a": "ptr throat\n<script>alert(1)</script>"}
    }"#;

    fn test_router(dictionary: Result<Dictionary, LoadError>) -> Router {
        let state = Arc::new(AppState {
            dictionary,
            tokens: TokenTable::default(),
            base_url: "http://127.0.0.1:8080".to_string(),
        });
        build_router(state)
    }

    fn ready_router() -> Router {
        test_router(Dictionary::from_json_slice(DATA.as_bytes()))
    }

    async fn get_body(router: Router, uri: &str) -> String {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn lookup(router: Router, uri: &str) -> LookupPayload {
        serde_json::from_str(&get_body(router, uri).await).unwrap()
    }

    #[tokio::test]
    async fn api_lookup_matches_prefix() {
        let payload = lookup(ready_router(), "/api/lookup?q=ag%C4%B1").await;
        assert_eq!(payload.outcome, OutcomeKind::Match);
        assert_eq!(payload.headword.as_deref(), Some("agız"));
        assert_eq!(payload.ghost, "z");
        assert_eq!(payload.link, LinkAction::Set);
        assert_eq!(payload.fragment.as_deref(), Some("#ag%C4%B1z"));
        assert_eq!(
            payload.gloss_html.as_deref(),
            Some(r#"<b>Turkish</b> <span class="pink">word</span> meaning mouth"#)
        );
    }

    #[tokio::test]
    async fn api_lookup_sanitizes_gloss() {
        let payload = lookup(ready_router(), "/api/lookup?q=bog").await;
        assert_eq!(
            payload.gloss_html.as_deref(),
            Some(r#"<b>Proto-Turkic</b> <span class="pink">throat</span><br>"#)
        );
    }

    #[tokio::test]
    async fn api_lookup_reports_errors() {
        let missing = lookup(ready_router(), "/api/lookup?q=zzz").await;
        assert_eq!(missing.outcome, OutcomeKind::NoMatch);
        assert!(missing.error);
        assert_eq!(missing.link, LinkAction::Clear);

        let invalid = lookup(ready_router(), "/api/lookup?q=%20ag").await;
        assert_eq!(invalid.outcome, OutcomeKind::Invalid);
        assert!(invalid.error);
        assert_eq!(invalid.link, LinkAction::Keep);

        let empty = lookup(ready_router(), "/api/lookup").await;
        assert_eq!(empty.outcome, OutcomeKind::Cleared);
        assert!(!empty.error);
        assert_eq!(empty.link, LinkAction::Clear);
    }

    #[tokio::test]
    async fn unavailable_dictionary_disables_lookup() {
        let router = test_router(Dictionary::from_json_slice(b"[1, 2]"));
        let payload = lookup(router.clone(), "/api/lookup?q=ag").await;
        assert_eq!(payload.outcome, OutcomeKind::Unavailable);
        assert!(payload.disabled && payload.error);
        assert!(payload.headword.is_none());

        let status: StatusPayload =
            serde_json::from_str(&get_body(router.clone(), "/api/status").await).unwrap();
        assert!(!status.ready);
        assert_eq!(status.message, crate::UNAVAILABLE_MESSAGE);

        let html = get_body(router, "/").await;
        assert!(html.contains("error-message"));
        assert!(html.contains(" disabled"));
    }

    #[tokio::test]
    async fn api_status_counts_entries() {
        let status: StatusPayload =
            serde_json::from_str(&get_body(ready_router(), "/api/status").await).unwrap();
        assert!(status.ready);
        assert_eq!(status.entries, Some(2));
        assert_eq!(status.message, "Portrait of Proto-Turkic in 2 Entries.");
    }

    #[tokio::test]
    async fn home_prerenders_query() {
        let html = get_body(ready_router(), "/?q=ag").await;
        assert!(html.contains("Portrait of Proto-Turkic in 2 Entries."));
        assert!(html.contains(r#"<span class="pink">word</span>"#));
        assert!(html.contains(r#"<span id="ghostText">ız</span>"#));
    }

    #[tokio::test]
    async fn fragments_are_decoded_server_side() {
        let payload = lookup(ready_router(), "/api/lookup?fragment=%23ag%25C4%25B1").await;
        assert_eq!(payload.query, "agı");
        assert_eq!(payload.headword.as_deref(), Some("agız"));

        let malformed = lookup(ready_router(), "/api/lookup?fragment=%23ag%25E0%25A4").await;
        assert_eq!(malformed.outcome, OutcomeKind::NoMatch);

        let preferred = lookup(ready_router(), "/api/lookup?q=bog&fragment=%23ag").await;
        assert_eq!(preferred.headword.as_deref(), Some("boguŕ"));

        let html = get_body(ready_router(), "/").await;
        assert!(!html.contains("decodeURIComponent"));
        assert!(html.contains("/api/lookup?fragment="));
    }

    #[tokio::test]
    async fn health_is_ok() {
        let body = get_body(ready_router(), "/healthz").await;
        assert!(body.contains("\"ok\""));
    }
}
