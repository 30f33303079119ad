//! Call logging.
//!
//! The [`Logger`] collaborator receives pre-formatted lines; the dispatch
//! runtime composes them according to the configured [`Level`]. The default
//! sink writes through `tracing`, so subscribers decide where lines go.

use crate::request::Request;

/// How much of each call is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Level {
    /// Nothing.
    #[default]
    None,
    /// Request line, response status, elapsed time, retries.
    Basic,
    /// Basic plus headers.
    Headers,
    /// Headers plus bodies.
    Full,
}

/// A sink for per-call log lines, correlated by `config_key`.
pub trait Logger: Send + Sync {
    /// Writes one line for the given method.
    fn log(&self, config_key: &str, message: &str);

    /// Logs an outgoing request according to `level`.
    fn log_request(&self, level: Level, config_key: &str, request: &Request) {
        if level < Level::Basic {
            return;
        }
        self.log(config_key, &format!("---> {} {}", request.method(), request.url()));
        if level >= Level::Headers {
            for (name, value) in request.headers() {
                self.log(config_key, &format!("{name}: {value}"));
            }
        }
        if level >= Level::Full {
            if let Some(body) = request.body() {
                self.log(config_key, &String::from_utf8_lossy(body));
            }
        }
        if level >= Level::Headers {
            let bytes = request.body().map(<[u8]>::len).unwrap_or(0);
            self.log(config_key, &format!("---> END HTTP ({bytes}-byte body)"));
        }
    }

    /// Logs a response status according to `level`.
    fn log_response(&self, level: Level, config_key: &str, status: u16, elapsed_ms: u128) {
        if level >= Level::Basic {
            self.log(config_key, &format!("<--- HTTP {status} ({elapsed_ms}ms)"));
        }
    }

    /// Logs a retry decision according to `level`.
    fn log_retry(&self, level: Level, config_key: &str) {
        if level >= Level::Basic {
            self.log(config_key, "---> RETRYING");
        }
    }
}

/// Logger that writes through `tracing` at debug level.
#[derive(Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, config_key: &str, message: &str) {
        tracing::debug!(target: "pretext", "[{config_key}] {message}");
    }
}

/// Logger that discards everything.
#[derive(Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _config_key: &str, _message: &str) {}
}
