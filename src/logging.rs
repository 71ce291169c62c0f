use tracing_subscriber::EnvFilter;

/// Verbosity selected through `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Debug,
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "debug" => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    pub fn is_debug(&self) -> bool {
        *self >= LogLevel::Debug
    }
}

/// Installs the global subscriber. `RUST_LOG` still wins when it is set.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // http stack is noisy at debug
        EnvFilter::new(format!(
            "{},hyper=warn,hyper_util=warn,reqwest=warn",
            level.as_filter()
        ))
    });

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ERROR", LogLevel::Error)]
    #[case("info", LogLevel::Info)]
    #[case(" Debug ", LogLevel::Debug)]
    #[case("verbose", LogLevel::Info)]
    #[case("", LogLevel::Info)]
    fn parses_level(#[case] input: &str, #[case] expected: LogLevel) {
        assert_eq!(LogLevel::from(input), expected);
    }

    #[test]
    fn only_debug_enables_inspection() {
        assert!(LogLevel::Debug.is_debug());
        assert!(!LogLevel::Info.is_debug());
        assert!(!LogLevel::Error.is_debug());
    }
}
