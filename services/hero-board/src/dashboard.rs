//! Web dashboard: the hero form and table, JSON API and change stream

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::hero::Hero;
use crate::page::{HeroPage, PageState};

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub page: Arc<HeroPage>,
}

/// Page state as returned by /api/heroes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroesResponse {
    pub loading: bool,
    pub number_input: i64,
    pub heroes: Vec<Hero>,
}

impl From<PageState> for HeroesResponse {
    fn from(state: PageState) -> Self {
        Self {
            loading: state.is_loading(),
            number_input: state.number_input,
            heroes: state.heroes,
        }
    }
}

/// Form body posted to /heroes
#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub number_input: String,
}

/// JSON body posted to /api/heroes
#[derive(Debug, Deserialize)]
pub struct InsertRequest {
    pub number_input: i64,
}

/// Build the dashboard axum router
pub fn build_router(page: Arc<HeroPage>) -> Router {
    let dashboard_state = DashboardState { page };

    Router::new()
        .route("/", get(index_handler))
        .route("/heroes", post(submit_handler))
        .route("/api/heroes", get(heroes_handler).post(insert_handler))
        .route("/api/events", get(events_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(dashboard_state)
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.page.snapshot().await;
    Html(render_index(&state))
}

/// Render the whole page for the given state
pub fn render_index(state: &PageState) -> String {
    let hero_rows: String = state
        .table_rows()
        .iter()
        .map(|[id, created_at, number]| {
            format!(
                r#"<tr>
                    <td style="border: 1px solid #dee2e6; padding: 0.5rem;">{}</td>
                    <td style="border: 1px solid #dee2e6; padding: 0.5rem;">{}</td>
                    <td style="border: 1px solid #dee2e6; padding: 0.5rem;">{}</td>
                </tr>"#,
                id, created_at, number
            )
        })
        .collect();

    let (loading_style, table_style) = if state.is_loading() {
        ("", "display: none;")
    } else {
        ("display: none;", "")
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Hero Board</title>
    <script>
        function renderHeroes(data) {{
            document.getElementById('loading').style.display = data.loading ? '' : 'none';
            document.getElementById('hero-table').style.display = data.loading ? 'none' : '';
            const tbody = document.getElementById('hero-body');
            tbody.innerHTML = data.heroes.map(h => {{
                const createdAt = new Date(h.created_at).toLocaleString();
                return `<tr>
                    <td style="border: 1px solid #dee2e6; padding: 0.5rem;">${{h.id}}</td>
                    <td style="border: 1px solid #dee2e6; padding: 0.5rem;">${{createdAt}}</td>
                    <td style="border: 1px solid #dee2e6; padding: 0.5rem;">${{h.number_input}}</td>
                </tr>`;
            }}).join('');
        }}
        function refreshHeroes() {{
            fetch('/api/heroes')
                .then(r => r.json())
                .then(renderHeroes)
                .catch(e => console.error('Error fetching heroes:', e));
        }}
        const events = new EventSource('/api/events');
        events.addEventListener('refresh', refreshHeroes);
    </script>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 2rem;">
    <form method="post" action="/heroes" style="display: flex; flex-direction: column; gap: 1rem; align-items: center;">
        <input type="number" name="number_input" value="{number_input}" placeholder="Enter a number" style="padding: 0.5rem; width: 12rem;">
        <button type="submit" style="padding: 0.5rem 1rem;">Submit</button>
    </form>
    <div id="loading" style="text-align: center; margin-top: 2rem; {loading_style}">Loading...</div>
    <table id="hero-table" style="width: 100%; border-collapse: collapse; margin-top: 2rem; {table_style}">
        <thead>
            <tr style="background-color: #f1f3f5;">
                <th style="border: 1px solid #dee2e6; padding: 0.5rem;">ID</th>
                <th style="border: 1px solid #dee2e6; padding: 0.5rem;">Created At</th>
                <th style="border: 1px solid #dee2e6; padding: 0.5rem;">Number</th>
            </tr>
        </thead>
        <tbody id="hero-body">{hero_rows}</tbody>
    </table>
</body>
</html>"#,
        number_input = state.number_input,
        loading_style = loading_style,
        table_style = table_style,
        hero_rows = hero_rows,
    )
}

async fn submit_handler(
    State(dashboard): State<DashboardState>,
    Form(form): Form<SubmitForm>,
) -> impl IntoResponse {
    // Insert the value this request posted, not whatever the shared input holds now
    let value = dashboard.page.set_number_input(&form.number_input).await;
    dashboard.page.insert_one(value).await;
    Redirect::to("/")
}

async fn heroes_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.page.snapshot().await;
    Json(HeroesResponse::from(state))
}

async fn insert_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<InsertRequest>,
) -> impl IntoResponse {
    dashboard.page.insert_one(request.number_input).await;
    StatusCode::ACCEPTED
}

async fn events_handler(
    State(dashboard): State<DashboardState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let revisions = dashboard.page.revisions();
    let stream = futures::stream::unfold(revisions, |mut revisions| async move {
        revisions.changed().await.ok()?;
        let revision = *revisions.borrow_and_update();
        let event = Event::default()
            .event("refresh")
            .data(revision.to_string());
        Some((Ok::<_, Infallible>(event), revisions))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
