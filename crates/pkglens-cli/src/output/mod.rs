//! Terminal output.
//!
//! Lookup results go to stdout as JSON so they can be piped; status lines and
//! errors go to stderr.

pub mod colors;

use std::error::Error as _;

use pkglens_cache::CacheStats;
use pkglens_core::Error;
use serde::Serialize;

use self::colors::ColorSupport;

/// Output handler for consistent terminal formatting
#[derive(Debug, Clone)]
pub struct OutputHandler {
    colors: ColorSupport,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    /// Print a value as pretty JSON on stdout
    pub fn json<T: Serialize>(&self, value: &T) -> Result<(), Error> {
        let text = serde_json::to_string_pretty(value).map_err(|e| Error::Codec {
            message: format!("Failed to render output: {e}"),
        })?;
        println!("{text}");
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print an error with its suggestion and source chain
    pub fn error(&self, error: &Error) {
        eprint!("{}", self.format_error(error));
    }

    /// Print cache counters for this run
    pub fn stats(&self, stats: &CacheStats) {
        eprintln!("{}", self.format_stats(stats));
    }

    pub fn format_stats(&self, stats: &CacheStats) -> String {
        format!(
            "{}: hits={} misses={} coalesced={} not_found={} origin_errors={} short_circuited={}",
            self.colors.dim("cache"),
            stats.hits,
            stats.misses,
            stats.coalesced,
            stats.not_found,
            stats.origin_errors,
            stats.short_circuited
        )
    }

    /// Format an error with context and suggestions
    pub fn format_error(&self, error: &Error) -> String {
        let mut output = format!("{}: {}\n", self.colors.red("error"), error);

        let mut source = error.source();
        while let Some(err) = source {
            output.push_str(&format!("{}: {}\n", self.colors.dim("caused by"), err));
            source = err.source();
        }

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&format!("{}: {}\n", self.colors.dim("help"), suggestion));
        }

        output
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
