use initdag::cli::LogLevel;
use initdag::logging::build_filter;
use tracing::level_filters::LevelFilter;

#[test]
fn defaults_to_info() {
    let filter = build_filter(None, None);
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
}

#[test]
fn cli_level_wins_over_env() {
    let filter = build_filter(Some(LogLevel::Trace), Some("error"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

    let filter = build_filter(Some(LogLevel::Warn), None);
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
}

#[test]
fn env_accepts_per_target_directives() {
    let filter = build_filter(None, Some("warn,initdag::dag=debug"));

    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    assert!(filter.to_string().contains("initdag::dag=debug"));
}

#[test]
fn invalid_or_empty_env_falls_back_to_info() {
    let filter = build_filter(None, Some("initdag=loud"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));

    let filter = build_filter(None, Some("  "));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
}
