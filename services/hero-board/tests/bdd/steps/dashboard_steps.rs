//! BDD step definitions for dashboard feature

use axum::body::Body;
use axum::http::{header, Request};
use cucumber::{then, when};
use tower::ServiceExt;

use hero_board::dashboard::{build_router, HeroesResponse};

use crate::world::HeroBoardWorld;

async fn send(world: &mut HeroBoardWorld, request: Request<Body>, read_body: bool) {
    let app = build_router(world.page());
    let response = app.oneshot(request).await.unwrap();

    world.response_status = Some(response.status().as_u16());
    world.response_headers = Some(response.headers().clone());
    world.response_body = if read_body {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Some(String::from_utf8(body.to_vec()).unwrap())
    } else {
        None
    };
}

#[when("the dashboard index page is requested")]
async fn request_index(world: &mut HeroBoardWorld) {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    send(world, request, true).await;
}

#[when(expr = "the dashboard receives GET {string}")]
async fn request_get(world: &mut HeroBoardWorld, uri: String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(world, request, true).await;
}

#[when(expr = "the form is posted with number {string}")]
async fn post_form(world: &mut HeroBoardWorld, raw: String) {
    let request = Request::builder()
        .method("POST")
        .uri("/heroes")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("number_input={}", raw)))
        .unwrap();
    send(world, request, true).await;
}

#[when(expr = "the JSON API receives number {int}")]
async fn post_json(world: &mut HeroBoardWorld, number_input: i64) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/heroes")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "number_input": number_input }).to_string(),
        ))
        .unwrap();
    send(world, request, true).await;
}

#[when("the change stream is opened")]
async fn open_change_stream(world: &mut HeroBoardWorld) {
    let request = Request::builder()
        .uri("/api/events")
        .body(Body::empty())
        .unwrap();
    send(world, request, false).await;
}

#[then(expr = "the response status should be {int}")]
fn response_status(world: &mut HeroBoardWorld, expected: u16) {
    assert_eq!(world.response_status, Some(expected));
}

#[then(expr = "the response should contain {string}")]
fn response_contains(world: &mut HeroBoardWorld, expected: String) {
    let body = world.response_body.as_ref().expect("no response body");
    assert!(
        body.contains(&expected),
        "Expected response to contain '{}', but it didn't.\nResponse body:\n{}",
        expected,
        body
    );
}

const LOADING_SHOWN: &str = r#"<div id="loading" style="text-align: center; margin-top: 2rem; ">"#;
const LOADING_HIDDEN: &str =
    r#"<div id="loading" style="text-align: center; margin-top: 2rem; display: none;">"#;

#[then("the loading indicator should be shown")]
fn loading_shown(world: &mut HeroBoardWorld) {
    let body = world.response_body.as_ref().expect("no response body");
    assert!(body.contains(LOADING_SHOWN), "loading indicator hidden:\n{}", body);
}

#[then("the loading indicator should be hidden")]
fn loading_hidden(world: &mut HeroBoardWorld) {
    let body = world.response_body.as_ref().expect("no response body");
    assert!(body.contains(LOADING_HIDDEN), "loading indicator shown:\n{}", body);
}

#[then(expr = "the response should redirect to {string}")]
fn response_redirects(world: &mut HeroBoardWorld, location: String) {
    let headers = world.response_headers.as_ref().expect("no response");
    assert_eq!(
        headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some(location.as_str())
    );
}

#[then(expr = "the response content type should be {string}")]
fn response_content_type(world: &mut HeroBoardWorld, expected: String) {
    let headers = world.response_headers.as_ref().expect("no response");
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(
        content_type.starts_with(&expected),
        "Expected content type '{}', got '{}'",
        expected,
        content_type
    );
}

#[then(expr = "the API should report {int} row(s)")]
fn api_reports_rows(world: &mut HeroBoardWorld, count: usize) {
    let body = world.response_body.as_ref().expect("no response body");
    let response: HeroesResponse = serde_json::from_str(body).unwrap();
    assert_eq!(response.heroes.len(), count);
}

#[then("the API should report the page as loaded")]
fn api_reports_loaded(world: &mut HeroBoardWorld) {
    let body = world.response_body.as_ref().expect("no response body");
    let response: HeroesResponse = serde_json::from_str(body).unwrap();
    assert!(!response.loading);
}
