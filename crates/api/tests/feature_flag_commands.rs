//! Integration tests for the feature flag commands and `AppContext` wiring.

use std::path::Path;
use std::time::Duration;

use ivy_app::{commands, AppContext};
use ivy_core::keys;
use ivy_domain::{Config, FlagOrigin, FlagValue};
use ivy_infra::RefreshOutcome;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.features.local_store_path = Some(dir.join("features.db").display().to_string());
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn defaults_without_sources() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::new(config_in(temp_dir.path())).await.unwrap();

    assert!(!commands::is_feature_enabled(&ctx, keys::DARK_MODE_V2).await.unwrap());
    assert!(commands::is_feature_enabled(&ctx, keys::SHOW_DECIMAL_NUMBER).await.unwrap());
    assert!(!commands::is_feature_enabled(&ctx, "not_a_flag").await.unwrap());
    assert_eq!(
        commands::get_feature_variant(&ctx, keys::HOME_BALANCE_STYLE).await.unwrap().as_deref(),
        Some("classic")
    );

    let outcome = commands::refresh_feature_flags(&ctx).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Unchanged);

    ctx.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn set_and_clear_local_override() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::new(config_in(temp_dir.path())).await.unwrap();

    commands::set_feature_flag(&ctx, keys::DARK_MODE_V2, "on").await.unwrap();
    assert!(ctx.feature_flags.is_enabled(keys::DARK_MODE_V2));

    let flags = commands::list_feature_flags(&ctx).await.unwrap();
    let dark = flags.iter().find(|flag| flag.key == keys::DARK_MODE_V2).unwrap();
    assert_eq!(dark.value, FlagValue::Bool(true));
    assert_eq!(dark.origin, FlagOrigin::Local);

    commands::clear_feature_flag(&ctx, keys::DARK_MODE_V2).await.unwrap();
    assert!(!ctx.feature_flags.is_enabled(keys::DARK_MODE_V2));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_commands_report_errors() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::new(config_in(temp_dir.path())).await.unwrap();

    let unknown = commands::set_feature_flag(&ctx, "not_a_flag", "on").await.unwrap_err();
    assert!(unknown.contains("not_a_flag"), "got: {unknown}");

    let wrong_kind = commands::set_feature_flag(&ctx, keys::DARK_MODE_V2, "compact").await;
    assert!(wrong_kind.is_err());

    let bad_variant = commands::set_feature_flag(&ctx, keys::HOME_BALANCE_STYLE, "fancy").await;
    assert!(bad_variant.is_err());
    assert!(!ctx.feature_flags.is_enabled(keys::HOME_BALANCE_STYLE));
}

#[tokio::test(flavor = "multi_thread")]
async fn local_overrides_survive_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let ctx = AppContext::new(config_in(temp_dir.path())).await.unwrap();
        commands::set_feature_flag(&ctx, keys::HOME_BALANCE_STYLE, "compact").await.unwrap();
        ctx.shutdown().await.unwrap();
    }

    let ctx = AppContext::new(config_in(temp_dir.path())).await.unwrap();
    assert_eq!(ctx.feature_flags.variant(keys::HOME_BALANCE_STYLE).as_deref(), Some("compact"));
    assert!(ctx.feature_flags.is_enabled(keys::HOME_BALANCE_STYLE));
}

#[tokio::test(flavor = "multi_thread")]
async fn overrides_file_is_read_at_startup_and_on_refresh() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("overrides.toml");
    std::fs::write(&file, "[flags]\ndark_mode_v2 = true\n").unwrap();

    let mut config = config_in(temp_dir.path());
    config.features.overrides_file = Some(file.display().to_string());

    let ctx = AppContext::new(config).await.unwrap();
    assert!(ctx.feature_flags.is_enabled(keys::DARK_MODE_V2));

    std::fs::write(&file, "[flags]\ndark_mode_v2 = false\nhide_total_balance = true\n").unwrap();
    let outcome = commands::refresh_feature_flags(&ctx).await.unwrap();
    match outcome {
        RefreshOutcome::Applied { changed, .. } => {
            assert!(changed.contains(&keys::DARK_MODE_V2.to_string()));
            assert!(changed.contains(&keys::HIDE_TOTAL_BALANCE.to_string()));
        }
        other => panic!("expected applied refresh, got {other:?}"),
    }
    assert!(!ctx.feature_flags.is_enabled(keys::DARK_MODE_V2));
    assert!(ctx.feature_flags.is_enabled(keys::HIDE_TOTAL_BALANCE));
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_values_and_local_precedence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ivy.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "version": 3,
            "flags": { "dark_mode_v2": true, "home_balance_style": "hidden" }
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = config_in(temp_dir.path());
    config.features.remote_url = Some(format!("{}/ivy.json", server.uri()));

    let ctx = AppContext::new(config).await.unwrap();
    assert!(ctx.feature_flags.is_enabled(keys::DARK_MODE_V2));
    assert_eq!(ctx.feature_flags.variant(keys::HOME_BALANCE_STYLE).as_deref(), Some("hidden"));

    commands::set_feature_flag(&ctx, keys::DARK_MODE_V2, "off").await.unwrap();
    assert!(!ctx.feature_flags.is_enabled(keys::DARK_MODE_V2));

    // Remote outage keeps the last fetched values
    server.reset().await;
    let outcome = commands::refresh_feature_flags(&ctx).await.unwrap();
    assert!(outcome.is_failure());
    assert_eq!(ctx.feature_flags.variant(keys::HOME_BALANCE_STYLE).as_deref(), Some("hidden"));
    assert!(!ctx.feature_flags.is_enabled(keys::DARK_MODE_V2));
}

#[tokio::test(flavor = "multi_thread")]
async fn background_refresh_picks_up_remote_changes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "flags": {} })),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = config_in(temp_dir.path());
    config.features.remote_url = Some(server.uri());
    config.features.refresh_interval_seconds = 1;

    let ctx = AppContext::new(config).await.unwrap();
    let mut updates = ctx.features.subscribe();
    assert!(!ctx.feature_flags.is_enabled(keys::COMPACT_ACCOUNTS_MODE));

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "flags": { "compact_accounts_mode": true }
        })))
        .mount(&server)
        .await;

    ctx.start_background_refresh().await.unwrap();
    assert!(ctx.is_refreshing_in_background().await);
    assert!(ctx.start_background_refresh().await.is_err());

    tokio::time::timeout(Duration::from_secs(10), updates.changed()).await.unwrap().unwrap();
    assert!(ctx.feature_flags.is_enabled(keys::COMPACT_ACCOUNTS_MODE));

    ctx.shutdown().await.unwrap();
    assert!(!ctx.is_refreshing_in_background().await);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let mut config = Config::default();
    config.features.refresh_interval_seconds = 0;
    assert!(AppContext::new(config).await.is_err());
}
