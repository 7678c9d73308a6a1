pub mod health;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, Uri},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::i18n::{
    extract::{lang_cookie, remember_query_language},
    Lang, Language,
};
use crate::pages::landing;
use crate::registration::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/catalog", get(health::catalog_handler))
        // Marketing pages
        .route("/", get(landing::home))
        .route("/servicios", get(landing::services))
        .route("/como-funciona", get(landing::how_it_works))
        .route("/precios", get(landing::pricing))
        .route("/soporte", get(landing::support))
        .route("/language/:code", get(switch_language))
        // Registration wizard; its handlers cap uploads per role and catalog
        .route(
            "/register-importer",
            get(handlers::importer_form)
                .post(handlers::importer_submit)
                .layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/register-importer/step-1",
            post(handlers::importer_step_one).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/register-agent",
            get(handlers::agent_form)
                .post(handlers::agent_submit)
                .layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/register-agent/step-1",
            post(handlers::agent_step_one).layer(DefaultBodyLimit::disable()),
        )
        .fallback(fallback)
        .layer(middleware::from_fn(remember_query_language))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SwitchLanguageQuery {
    redirect: Option<String>,
}

/// GET /language/:code?redirect=/path
/// Persists the language in a cookie and sends the browser back.
async fn switch_language(
    Path(code): Path<String>,
    Query(query): Query<SwitchLanguageQuery>,
) -> Result<Response, AppError> {
    let language = Language::parse(&code)
        .ok_or_else(|| AppError::Validation(format!("Unsupported language '{code}'")))?;
    let target = query
        .redirect
        .filter(|path| is_local_path(path))
        .unwrap_or_else(|| "/".to_string());
    debug!("Language switched to {} -> {target}", language.as_str());
    Ok((
        [(header::SET_COOKIE, lang_cookie(language))],
        Redirect::to(&target),
    )
        .into_response())
}

/// Only same-site absolute paths are valid redirect targets.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

/// JSON 404 under `/api/`, the localized page everywhere else.
async fn fallback(state: State<AppState>, lang: Lang, uri: Uri) -> Response {
    if uri.path().starts_with("/api/") {
        return AppError::NotFound(format!("No route for {}", uri.path())).into_response();
    }
    landing::not_found(state, lang, uri).await.into_response()
}
