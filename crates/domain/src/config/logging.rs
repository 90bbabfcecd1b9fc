use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Log level
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Operator-facing log level as written in `[General] LogLevel`.
///
/// `tracing` has no levels above `ERROR`, so `Fatal` and `Panic` both
/// filter at `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
        LogLevel::Panic,
    ];

    /// Resolve a configured value. Absent or unrecognized values fall back
    /// to [`LogLevel::Info`]; a bad log level never blocks startup.
    pub fn resolve(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
            LogLevel::Panic => "Panic",
        }
    }

    /// The `tracing` filter this level activates.
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`LogLevel::from_str`] for names outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level {0:?}")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    /// Names are matched exactly (`"Debug"`, not `"debug"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownLogLevel(s.to_owned()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_names_map_to_filters() {
        let table = [
            ("Debug", LevelFilter::DEBUG),
            ("Info", LevelFilter::INFO),
            ("Warn", LevelFilter::WARN),
            ("Error", LevelFilter::ERROR),
            ("Fatal", LevelFilter::ERROR),
            ("Panic", LevelFilter::ERROR),
        ];
        for (name, filter) in table {
            let level = LogLevel::resolve(Some(name));
            assert_eq!(level.as_str(), name);
            assert_eq!(level.level_filter(), filter, "level {name}");
        }
    }

    #[test]
    fn absent_defaults_to_info() {
        assert_eq!(LogLevel::resolve(None), LogLevel::Info);
    }

    #[test]
    fn unrecognized_defaults_to_info() {
        for raw in ["", "debug", "TRACE", "Verbose", " Info"] {
            assert_eq!(LogLevel::resolve(Some(raw)), LogLevel::Info, "raw {raw:?}");
        }
    }

    #[test]
    fn from_str_rejects_unknown() {
        let err = "Loud".parse::<LogLevel>().unwrap_err();
        assert_eq!(err, UnknownLogLevel("Loud".into()));
    }
}
