use std::path::Path;
use std::str::FromStr;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::error::TriadError;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Build the log4rs config: stderr always, plus `file` when given.
/// Stdout is left to the command shell.
pub fn build_config(level: &str, file: Option<&Path>) -> Result<Config, TriadError> {
    let level = LevelFilter::from_str(level)
        .map_err(|_| TriadError::Logging(format!("unknown log level '{}'", level)))?;

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let mut config = Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(path)
            .map_err(|e| TriadError::Logging(format!("cannot open {}: {}", path.display(), e)))?;
        config = config.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    config
        .build(root.build(level))
        .map_err(|e| TriadError::Logging(e.to_string()))
}

pub fn init(level: &str, file: Option<&Path>) -> Result<log4rs::Handle, TriadError> {
    let config = build_config(level, file)?;
    log4rs::init_config(config).map_err(|e| TriadError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_levels() {
        for level in ["trace", "debug", "info", "warn", "error", "off", "INFO"] {
            assert!(build_config(level, None).is_ok(), "{level}");
        }
    }

    #[test]
    fn rejects_unknown_levels() {
        assert!(matches!(
            build_config("chatty", None),
            Err(TriadError::Logging(_))
        ));
    }

    #[test]
    fn adds_a_file_appender() {
        let path = std::env::temp_dir().join(format!("triad-log-{}.log", std::process::id()));
        let config = build_config("debug", Some(&path)).unwrap();
        assert_eq!(config.appenders().len(), 2);
        assert_eq!(config.root().appenders(), ["stderr", "file"]);
        let _ = std::fs::remove_file(path);
    }
}
