use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};

use super::Language;

pub const LANG_COOKIE: &str = "lang";
/// One year.
pub const LANG_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 365;

/// Request language: `?lang=` first, then the `lang` cookie, then English.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lang(pub Language);

#[async_trait]
impl<S> FromRequestParts<S> for Lang
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let language = parts
            .uri
            .query()
            .and_then(lang_from_query)
            .or_else(|| lang_from_cookies(&parts.headers))
            .unwrap_or_default();
        Ok(Lang(language))
    }
}

fn lang_from_query(query: &str) -> Option<Language> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "lang")
        .and_then(|(_, v)| Language::parse(v))
}

fn lang_from_cookies(headers: &HeaderMap) -> Option<Language> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == LANG_COOKIE)
        .and_then(|(_, v)| Language::parse(v))
}

/// `Set-Cookie` value persisting the chosen language.
pub fn lang_cookie(language: Language) -> String {
    format!(
        "{LANG_COOKIE}={}; Path=/; Max-Age={LANG_COOKIE_MAX_AGE}; SameSite=Lax",
        language.as_str()
    )
}

/// Persists a language picked with `?lang=` so links and form posts that
/// drop the query keep it.
pub async fn remember_query_language(request: Request, next: Next) -> Response {
    let chosen = request
        .uri()
        .query()
        .and_then(lang_from_query)
        .filter(|language| lang_from_cookies(request.headers()) != Some(*language));
    let mut response = next.run(request).await;
    if let Some(language) = chosen {
        if let Ok(value) = HeaderValue::from_str(&lang_cookie(language)) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}
