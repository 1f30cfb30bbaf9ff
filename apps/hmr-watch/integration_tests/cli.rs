use hmr_watch::cli::Args;

use hmr_core::HmrConfig;

use std::path::PathBuf;

use clap::Parser;

// ----------------------------------------------------------------------------
// Args parsing and config overrides
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies every flag parses and overrides the matching config field.
///
/// **WHY THIS MATTERS**: Flags are how users point the watcher at a non-default server
/// without editing hmr.json.
///
/// **BUG THIS CATCHES**: Would catch a renamed flag, a non-repeatable `--accept`, or an
/// override writing to the wrong field.
#[test]
fn given_all_flags_when_parsed_and_applied_then_config_overridden() {
    // GIVEN: A full command line
    let args = Args::try_parse_from([
        "hmr-watch",
        "--host",
        "localhost:5173",
        "--config-dir",
        "/tmp/hmr-config",
        "--log-dir",
        "/tmp/hmr-logs",
        "--accept",
        "/src/main.js",
        "--accept",
        "/src/app.js",
        "--max-retries",
        "5",
        "--retry-interval-ms",
        "250",
        "-vv",
    ])
    .unwrap();

    // WHEN: Applying onto defaults
    let mut config = HmrConfig::default();
    args.apply_to(&mut config);

    // THEN: Every override landed
    assert_eq!(config.server.host, "localhost:5173");
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.interval_ms, 250);
    assert_eq!(args.accept, vec!["/src/main.js", "/src/app.js"]);
    assert_eq!(args.config_dir(), PathBuf::from("/tmp/hmr-config"));
    assert_eq!(args.log_dir(), PathBuf::from("/tmp/hmr-logs"));
    assert_eq!(args.verbose, 2);
}

/// **VALUE**: Verifies that no flags leave the loaded config untouched.
///
/// **WHY THIS MATTERS**: hmr.json values must win unless a flag says otherwise.
///
/// **BUG THIS CATCHES**: Would catch overrides applied from clap defaults.
#[test]
fn given_no_flags_when_applied_then_config_unchanged() {
    let args = Args::try_parse_from(["hmr-watch"]).unwrap();
    let mut config = HmrConfig::default();
    config.server.host = "10.0.0.2:8080".to_string();
    let expected = config.clone();

    args.apply_to(&mut config);

    assert_eq!(config, expected);
    assert!(args.accept.is_empty());
    assert!(args.config_dir().ends_with("hmr-watch"));
    assert!(args.log_dir().ends_with("hmr-watch"));
}

#[test]
fn given_non_numeric_retries_when_parsing_then_rejected() {
    let result = Args::try_parse_from(["hmr-watch", "--max-retries", "lots"]);

    assert!(result.is_err());
}
