pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# LOGFUNNEL CONFIGURATION
# =============================================================================
# Every setting is optional; omitted values fall back to the defaults shown.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/logfunnel/config.yml
#   3. /etc/logfunnel/config.yml
#
# $env{...} references are expanded before parsing and ~ is expanded in paths.

# =============================================================================
# WATCH
# =============================================================================
# Every regular file directly inside `directory` is tailed from its current
# end. Each file's format is decided once from its first line.

watch:
  directory: .

  # Regexes matched against file names. The running binary and the sink
  # database are always excluded.
  exclude:
    - '\.yml$'

  # Wait after a write notification before reading, so writers can finish
  debounce: 1s

  # native: OS notifications (inotify, FSEvents, ...)
  # poll:   stat the files every poll_interval
  mode: native
  poll_interval: 1s

# =============================================================================
# SINK
# =============================================================================
# Records land in <database>.<collection> inside a DuckDB file.

sink:
  path: logfunnel.duckdb
  database: newLogs
  collection: logs

  # How often connectivity is checked (and repaired) in the background
  health_check_interval: 1s
"#
    .to_string()
}
