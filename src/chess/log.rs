use std::env;
use std::sync::LazyLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
enum Level {
    Error = 0,
    Warn = 1,
    Debug = 2,
}

impl Level {
    fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            _ => Self::Error,
        }
    }
}

static CHESS_CLOCK_LOG: LazyLock<Level> = LazyLock::new(|| {
    env::var("CHESS_CLOCK_LOG")
        .map(|s| Level::from_str(&s))
        .unwrap_or(Level::Error)
});

macro_rules! log {
    ($level:expr, $prefix:expr, $msg:expr) => {
        if *CHESS_CLOCK_LOG >= $level {
            eprintln!(concat!("chess_clock ", $prefix, ": {}"), $msg.as_ref());
        }
    };
}

pub fn error(msg: impl AsRef<str>) {
    log!(Level::Error, "ERROR", msg);
}

pub fn warn(msg: impl AsRef<str>) {
    log!(Level::Warn, "WARN", msg);
}

pub fn debug(msg: impl AsRef<str>) {
    log!(Level::Debug, "DEBUG", msg);
}

#[cfg(test)]
mod tests {
    use super::Level;

    #[test]
    fn test_level_from_str() {
        assert_eq!(Level::from_str("warn"), Level::Warn);
        assert_eq!(Level::from_str(" WARNING "), Level::Warn);
        assert_eq!(Level::from_str("debug"), Level::Debug);
        assert_eq!(Level::from_str("nonsense"), Level::Error);
        assert!(Level::Debug > Level::Warn);
    }
}
