//! BDD step definitions for hero board builder and lifecycle feature

use cucumber::gherkin::Step;
use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use hero_board::config::{BackendConfig, Config, DashboardConfig};
use hero_board::{load_config, HeroBoardBuilder};

use crate::world::HeroBoardWorld;

fn headless(backend: BackendConfig) -> Config {
    Config {
        backend,
        dashboard: DashboardConfig {
            enabled: false,
            ..DashboardConfig::default()
        },
        ..Config::default()
    }
}

fn build_hero_board_builder(world: &mut HeroBoardWorld) -> HeroBoardBuilder {
    let config = world
        .config
        .clone()
        .unwrap_or_else(|| headless(BackendConfig::Memory));

    let mut builder = HeroBoardBuilder::new(config);
    if let Some(cancel) = world.cancel.take() {
        builder = builder.with_cancellation_token(cancel);
    }
    builder
}

// --- Given steps ---

#[given("a hero board config with the memory backend")]
fn memory_config(world: &mut HeroBoardWorld) {
    world.config = Some(headless(BackendConfig::Memory));
}

#[given(expr = "a hero board config with a postgrest backend at {string} and no api key")]
fn postgrest_config_without_key(world: &mut HeroBoardWorld, url: String) {
    world.config = Some(headless(BackendConfig::Postgrest {
        url,
        api_key: None,
        api_key_env: "HERO_BOARD_API_KEY".to_string(),
    }));
}

#[given("a pre-cancelled cancellation token")]
fn pre_cancelled_token(world: &mut HeroBoardWorld) {
    let token = CancellationToken::new();
    token.cancel();
    world.cancel = Some(token);
}

#[given("a config file containing:")]
fn config_file(world: &mut HeroBoardWorld, step: &Step) {
    let content = step.docstring.as_deref().expect("config file content");
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), content).unwrap();
    world.config_dir = Some(dir);
}

// --- When steps ---

#[when("the hero board is built")]
async fn hero_board_is_built(world: &mut HeroBoardWorld) {
    let builder = build_hero_board_builder(world);
    world.build_succeeded = Some(builder.build().await.is_ok());
}

#[when("the hero board is built and started")]
async fn hero_board_is_built_and_started(world: &mut HeroBoardWorld) {
    let builder = build_hero_board_builder(world);
    match builder.build().await {
        Ok(board) => {
            world.build_succeeded = Some(true);
            world.board_page = Some(board.page());
            world.start_succeeded = Some(board.start().await.is_ok());
        }
        Err(_) => {
            world.build_succeeded = Some(false);
            world.start_succeeded = Some(false);
        }
    }
}

#[when("the config file is loaded")]
fn config_file_loaded(world: &mut HeroBoardWorld) {
    let dir = world.config_dir.as_ref().expect("no config file");
    world.config_result = Some(load_config(&dir.path().join("config.json")));
}

// --- Then steps ---

#[then("the build should succeed")]
fn build_should_succeed(world: &mut HeroBoardWorld) {
    assert_eq!(world.build_succeeded, Some(true), "Expected build to succeed");
}

#[then("the build should fail")]
fn build_should_fail(world: &mut HeroBoardWorld) {
    assert_eq!(world.build_succeeded, Some(false), "Expected build to fail");
}

#[then("the lifecycle should complete successfully")]
fn lifecycle_should_complete(world: &mut HeroBoardWorld) {
    assert_eq!(world.build_succeeded, Some(true), "Expected build to succeed");
    assert_eq!(world.start_succeeded, Some(true), "Expected start to succeed");
}

#[then("the board page should have been loaded and unmounted")]
async fn board_page_loaded_and_unmounted(world: &mut HeroBoardWorld) {
    let page = world.board_page.as_ref().expect("board was not started");
    assert!(!page.is_mounted().await);
    assert!(!page.snapshot().await.is_loading());
}

#[then(expr = "the loaded config should use table {string}")]
fn loaded_config_table(world: &mut HeroBoardWorld, table: String) {
    let config = world
        .config_result
        .as_ref()
        .expect("config not loaded")
        .as_ref()
        .expect("config failed to load");
    assert_eq!(config.table, table);
}

#[then(expr = "the loaded config should use the {string} backend")]
fn loaded_config_backend(world: &mut HeroBoardWorld, backend: String) {
    let config = world
        .config_result
        .as_ref()
        .expect("config not loaded")
        .as_ref()
        .expect("config failed to load");
    assert_eq!(config.backend.type_name(), backend);
}

#[then("loading the config should fail")]
fn loading_config_fails(world: &mut HeroBoardWorld) {
    let result = world.config_result.as_ref().expect("config not loaded");
    assert!(result.is_err());
}
