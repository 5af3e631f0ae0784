// Time Provider Port (for testability)

/// Time provider interface (allows fixed timestamps in tests)
pub trait TimeProvider: Send + Sync {
    /// Current time as an ISO 8601 / RFC 3339 string (Jupyter message headers)
    fn now_iso8601(&self) -> String;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_iso8601(&self) -> String {
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    }
}

/// Fixed time provider (tests), in milliseconds since epoch
pub struct FixedTimeProvider(pub i64);

impl TimeProvider for FixedTimeProvider {
    fn now_iso8601(&self) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.0)
            .unwrap_or_default()
            .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    }
}
