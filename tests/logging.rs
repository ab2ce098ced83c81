// tests/logging.rs

use forge::cli::LogLevel;
use forge::logging::build_filter;
use tracing_subscriber::filter::LevelFilter;

#[test]
fn test_cli_level_wins_over_env() {
    let filter = build_filter(Some(LogLevel::Warn), Some("trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
}

#[test]
fn test_env_directives_are_honoured() {
    let filter = build_filter(None, Some("info,forge::gate=trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
}

#[test]
fn test_default_is_info() {
    assert_eq!(build_filter(None, None).max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(build_filter(None, Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
}
