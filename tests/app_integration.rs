use fxr::core::error::RateError;
use fxr::core::prefs::PreferenceUpdate;
use std::collections::HashMap;
use std::fs;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_yahoo_mock_server(symbol: &str, rate: f64) -> MockServer {
        let mock_server = MockServer::start().await;
        let url_path = format!("/v8/finance/chart/{symbol}");
        let body = format!(
            r#"{{"chart": {{"result": [{{"meta": {{"regularMarketPrice": {rate}}}}}]}}}}"#
        );

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_llm_mock_server(content: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_failing_server() -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        mock_server
    }
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    fs::write(&path, body).expect("Failed to write config file");
    path
}

#[test_log::test(tokio::test)]
async fn test_rate_flow_with_yahoo_mock() {
    let mock_server = test_utils::create_yahoo_mock_server("USDEUR=X", 0.9123).await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(
        &dir,
        &format!(
            r#"
base_currency: "USD"
providers:
  yahoo:
    base_url: {}
data_path: {}
"#,
            mock_server.uri(),
            dir.path().join("data").display()
        ),
    );

    let result = fxr::run_command(
        fxr::AppCommand::Rate {
            base: "USD".to_string(),
            target: "EUR".to_string(),
        },
        "default",
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Rate command failed: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_cached_rate_reused_across_runs() {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/v8/finance/chart/USDEUR=X"))
        .respond_with(
            wiremock::ResponseTemplate::new(200).set_body_string(
                r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 0.9}}]}}"#,
            ),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(
        &dir,
        &format!(
            r#"
base_currency: "USD"
providers:
  yahoo:
    base_url: {}
data_path: {}
"#,
            mock_server.uri(),
            dir.path().join("data").display()
        ),
    );
    let config_path = config_path.to_str().unwrap().to_string();

    for run in 0..2 {
        info!(run, "Resolving USD/EUR");
        let result = fxr::run_command(
            fxr::AppCommand::Rate {
                base: "USD".to_string(),
                target: "EUR".to_string(),
            },
            "default",
            Some(&config_path),
        )
        .await;
        assert!(result.is_ok(), "Run {run} failed: {:?}", result.err());
    }

    // MockServer::verify on drop asserts the single expected call; the
    // second run must be served from the persisted cache.
    mock_server.verify().await;
}

#[test_log::test(tokio::test)]
async fn test_convert_flow_with_llm_mock() {
    let mock_server = test_utils::create_llm_mock_server("0.85").await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(
        &dir,
        &format!(
            r#"
base_currency: "USD"
providers:
  llm:
    base_url: {}
    model: "test-model"
data_path: {}
"#,
            mock_server.uri(),
            dir.path().join("data").display()
        ),
    );

    let result = fxr::run_command(
        fxr::AppCommand::Convert {
            amount: 100.0,
            base: "USD".to_string(),
            target: "EUR".to_string(),
        },
        "default",
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Convert command failed: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_rate_unavailable_when_everything_fails() {
    let mock_server = test_utils::create_failing_server().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    // Default table deliberately has no entry or pivot path for GBP/CHF.
    let config_path = write_config(
        &dir,
        &format!(
            r#"
base_currency: "USD"
providers:
  yahoo:
    base_url: {}
default_rates:
  USD:
    EUR: 0.92
data_path: {}
"#,
            mock_server.uri(),
            dir.path().join("data").display()
        ),
    );

    let result = fxr::run_command(
        fxr::AppCommand::Rate {
            base: "GBP".to_string(),
            target: "CHF".to_string(),
        },
        "default",
        Some(config_path.to_str().unwrap()),
    )
    .await;

    let err = result.expect_err("Expected a terminal RateUnavailable");
    assert!(matches!(
        err.downcast_ref::<RateError>(),
        Some(RateError::RateUnavailable { .. })
    ));
}

#[test_log::test(tokio::test)]
async fn test_default_table_answers_when_sources_fail() {
    let mock_server = test_utils::create_failing_server().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(
        &dir,
        &format!(
            r#"
base_currency: "USD"
providers:
  yahoo:
    base_url: {}
default_rates:
  USD:
    EUR: 0.92
data_path: {}
"#,
            mock_server.uri(),
            dir.path().join("data").display()
        ),
    );

    let result = fxr::run_command(
        fxr::AppCommand::Rate {
            base: "USD".to_string(),
            target: "EUR".to_string(),
        },
        "default",
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Default fallback failed: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_prefs_set_then_override_wins() {
    let mock_server = test_utils::create_failing_server().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(
        &dir,
        &format!(
            r#"
base_currency: "USD"
providers:
  yahoo:
    base_url: {}
data_path: {}
"#,
            mock_server.uri(),
            dir.path().join("data").display()
        ),
    );
    let config_path = config_path.to_str().unwrap().to_string();

    let set = fxr::run_command(
        fxr::AppCommand::PrefsSet(PreferenceUpdate {
            set_rates: Some(HashMap::from([("EUR".to_string(), 0.5)])),
            ..Default::default()
        }),
        "alice",
        Some(&config_path),
    )
    .await;
    assert!(set.is_ok(), "Prefs set failed: {:?}", set.err());

    // The live source is down, but the user override answers USD/EUR.
    let rate = fxr::run_command(
        fxr::AppCommand::Rate {
            base: "USD".to_string(),
            target: "EUR".to_string(),
        },
        "alice",
        Some(&config_path),
    )
    .await;
    assert!(rate.is_ok(), "Override resolution failed: {:?}", rate.err());

    let show = fxr::run_command(fxr::AppCommand::PrefsShow, "alice", Some(&config_path)).await;
    assert!(show.is_ok());
}

#[test_log::test(tokio::test)]
async fn test_invalid_prefs_rejected_end_to_end() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(
        &dir,
        &format!(
            r#"
base_currency: "USD"
data_path: {}
"#,
            dir.path().join("data").display()
        ),
    );

    let result = fxr::run_command(
        fxr::AppCommand::PrefsSet(PreferenceUpdate {
            enabled_sources: Some([fxr::core::source::SourceKind::Llm].into()),
            ..Default::default()
        }),
        "alice",
        Some(config_path.to_str().unwrap()),
    )
    .await;

    let err = result.expect_err("Expected InvalidPreference");
    assert!(matches!(
        err.downcast_ref::<RateError>(),
        Some(RateError::InvalidPreference(_))
    ));
}
