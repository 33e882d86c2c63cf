pub static DEFAULT_CONFIG: &str = r##"
# base url every `dispatch` path is appended to
# base_target = "https://example.com"

# delay between retries of a failed poll, in milliseconds
poll_interval_ms = 3000

# total attempts a poll makes before giving up, 0 retries forever
max_attempts = 0

# per request timeout, in milliseconds
# timeout_ms = 30000

accept_invalid_certs = false

log_level = "info"

[headers]
"content-type" = "application/json"
"##;
