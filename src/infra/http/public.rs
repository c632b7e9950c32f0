use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use tracing::error;

use crate::{
    application::{
        blog::{self, BlogService},
        chrome::ChromeService,
        error::{ErrorReport, HttpError},
        repos::HealthRepo,
    },
    infra::media::{MediaError, MediaStorage},
    presentation::views::{
        ContactsTemplate, IndexTemplate, LayoutChrome, LayoutContext, PostTemplate, PostsListTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub blog: Arc<BlogService>,
    pub chrome: Arc<ChromeService>,
    pub media: Arc<MediaStorage>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/post/{slug}", get(post_detail))
        .route("/tag/{tag_title}", get(tag_filter))
        .route("/archive/{year}", get(year_archive))
        .route("/contacts", get(contacts))
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(public_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>) -> Response {
    let chrome = state.chrome.for_path("/");

    match state.blog.index().await {
        Ok(content) => {
            let view = LayoutContext::new(chrome, content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn post_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let chrome = state.chrome.for_path(&blog::post_href(&slug));

    match state.blog.post_detail(&slug).await {
        Ok(Some(content)) => {
            let chrome = chrome.with_page_title(&content.post.title);
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Ok(None) => not_found(chrome, "Unknown post"),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn tag_filter(State(state): State<HttpState>, Path(tag_title): Path<String>) -> Response {
    let chrome = state.chrome.for_path(&blog::tag_href(&tag_title));

    match state.blog.tag_filter(&tag_title).await {
        Ok(Some(content)) => {
            let chrome = chrome.with_page_title(&content.heading);
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostsListTemplate { view }, StatusCode::OK)
        }
        Ok(None) => not_found(chrome, "Unknown tag"),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn year_archive(State(state): State<HttpState>, Path(year): Path<String>) -> Response {
    match state.blog.year_archive(&year).await {
        Ok(content) => {
            let chrome = state
                .chrome
                .for_path(&format!("/archive/{year}"))
                .with_page_title(&content.heading);
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostsListTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn contacts(State(state): State<HttpState>) -> Response {
    let chrome = state.chrome.for_path("/contacts").with_page_title("Contacts");
    let view = LayoutContext::new(chrome, ());
    render_template_response(ContactsTemplate { view }, StatusCode::OK)
}

async fn fallback(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.chrome.load())
}

fn not_found(chrome: LayoutChrome, reason: &str) -> Response {
    let mut response = render_not_found_response(chrome);
    ErrorReport::from_message("infra::http::public::not_found", StatusCode::NOT_FOUND, reason)
        .attach(&mut response);
    response
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.media.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(err @ (MediaError::InvalidPath | MediaError::NotFound)) => HttpError::from_error(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            &err,
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read media file"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read media file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"));

    response
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}
