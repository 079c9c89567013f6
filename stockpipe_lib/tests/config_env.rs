//! Environment-driven configuration.
//!
//! Everything lives in one test so no other test in this binary races on the
//! process environment.

use std::path::PathBuf;
use std::time::Duration;

use stockpipe_lib::config::{
    API_KEY_VAR, BACKOFF_UNIT_VAR, BASE_URL_VAR, CONNECT_ATTEMPTS_VAR, DB_HOST_VAR, DB_NAME_VAR,
    FETCH_ATTEMPTS_VAR, MISSING_FIELDS_VAR,
};
use stockpipe_lib::{
    fetch_and_store, AbortReason, ConfigError, DbConfig, MissingFieldPolicy, Phase,
    PipelineConfig, RunOutcome,
};

// Server-database credentials; a SQLite file has no use for them.
const CREDENTIAL_VARS: [&str; 2] = ["STOCK_DB_USER", "STOCK_DB_PASSWORD"];

const ALL_VARS: [&str; 10] = [
    API_KEY_VAR,
    BASE_URL_VAR,
    DB_NAME_VAR,
    CREDENTIAL_VARS[0],
    CREDENTIAL_VARS[1],
    DB_HOST_VAR,
    BACKOFF_UNIT_VAR,
    FETCH_ATTEMPTS_VAR,
    CONNECT_ATTEMPTS_VAR,
    MISSING_FIELDS_VAR,
];

fn clear_env() {
    for key in ALL_VARS {
        std::env::remove_var(key);
    }
}

#[tokio::test]
async fn configuration_read_from_environment() {
    clear_env();

    // No key: configuration fails, and the free function aborts before fetching.
    assert_eq!(
        PipelineConfig::from_env().unwrap_err(),
        ConfigError::MissingVar(API_KEY_VAR)
    );
    match fetch_and_store("IBM").await {
        RunOutcome::Aborted(AbortReason::Config { phase, message }) => {
            assert_eq!(phase, Phase::Start);
            assert!(message.contains(API_KEY_VAR));
        }
        other => panic!("expected config abort, got {:?}", other),
    }

    // Blank counts as unset.
    std::env::set_var(API_KEY_VAR, "   ");
    assert!(PipelineConfig::from_env().is_err());

    // Key only: everything else defaults.
    std::env::set_var(API_KEY_VAR, "demo");
    let cfg = PipelineConfig::from_env().unwrap();
    assert_eq!(cfg.api_key, "demo");
    assert_eq!(cfg.base_url, "https://www.alphavantage.co");
    assert_eq!(cfg.db.name, None);
    assert_eq!(cfg.db.host, "data");
    assert_eq!(cfg.fetch_retry.max_attempts, 3);
    assert_eq!(cfg.connect_retry.max_attempts, 5);
    assert_eq!(cfg.fetch_retry.base_delay, Duration::from_secs(1));
    assert_eq!(cfg.missing_fields, MissingFieldPolicy::ZeroFill);

    // Every knob set.
    std::env::set_var(BASE_URL_VAR, "http://localhost:9999");
    std::env::set_var(DB_NAME_VAR, "market");
    std::env::set_var(DB_HOST_VAR, "/srv/stocks");
    std::env::set_var(BACKOFF_UNIT_VAR, "10");
    std::env::set_var(FETCH_ATTEMPTS_VAR, "4");
    std::env::set_var(CONNECT_ATTEMPTS_VAR, "2");
    std::env::set_var(MISSING_FIELDS_VAR, "reject");
    let cfg = PipelineConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, "http://localhost:9999");
    assert_eq!(cfg.db.path().unwrap(), PathBuf::from("/srv/stocks/market.sqlite"));
    assert_eq!(cfg.fetch_retry.max_attempts, 4);
    assert_eq!(cfg.connect_retry.max_attempts, 2);
    assert_eq!(cfg.connect_retry.base_delay, Duration::from_millis(10));
    assert_eq!(cfg.missing_fields, MissingFieldPolicy::Reject);

    // The database is located by host and name alone; credentials change nothing.
    std::env::set_var(CREDENTIAL_VARS[0], "loader");
    std::env::set_var(CREDENTIAL_VARS[1], "hunter2");
    let with_credentials = PipelineConfig::from_env().unwrap();
    assert_eq!(with_credentials.db, DbConfig::new("/srv/stocks", "market"));
    assert!(!format!("{:?}", with_credentials).contains("hunter2"));
    assert!(!format!("{:?}", with_credentials).contains("demo"));

    // Unparseable numbers fall back to defaults.
    std::env::set_var(FETCH_ATTEMPTS_VAR, "lots");
    assert_eq!(PipelineConfig::from_env().unwrap().fetch_retry.max_attempts, 3);

    // An unknown policy is rejected rather than guessed.
    std::env::set_var(MISSING_FIELDS_VAR, "maybe");
    assert_eq!(
        PipelineConfig::from_env().unwrap_err(),
        ConfigError::InvalidVar {
            key: MISSING_FIELDS_VAR,
            value: "maybe".to_string()
        }
    );

    clear_env();
}
