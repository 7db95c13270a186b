//! Thread-safe capturing logger for generation runs
//!
//! The orchestrator, the generator and its blocking workers share one
//! logger through an `Arc`, so the capture buffer sits behind a `Mutex`.
//! Tests switch it to `OutputMode::Memory` and inspect `logs()`.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// How much to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Nothing
    Silent = 0,
    /// Final outcome only
    Minimal = 1,
    /// State transitions and accepted candidates (default)
    #[default]
    Normal = 2,
    /// Every candidate and search statistic
    Verbose = 3,
}

impl std::str::FromStr for VerbosityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "silent" => Ok(VerbosityLevel::Silent),
            "1" | "minimal" => Ok(VerbosityLevel::Minimal),
            "2" | "normal" => Ok(VerbosityLevel::Normal),
            "3" | "verbose" => Ok(VerbosityLevel::Verbose),
            other => Err(format!("unknown verbosity '{}'", other)),
        }
    }
}

/// How printed entries are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Indented plain text with a `[category]` prefix
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Where entries go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    #[default]
    Stdout,
    /// Buffer only; nothing is printed
    Memory,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub message: String,
    /// e.g. "orchestrator", "generator", "migration"
    pub category: Option<String>,
}

pub struct GenerationLogger {
    verbosity: VerbosityLevel,
    output_format: OutputFormat,
    output_mode: OutputMode,
    log_buffer: Mutex<Vec<LogEntry>>,
}

impl GenerationLogger {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        GenerationLogger {
            verbosity,
            output_format: OutputFormat::default(),
            output_mode: OutputMode::default(),
            log_buffer: Mutex::new(Vec::new()),
        }
    }

    /// A logger that only records into memory, for tests
    pub fn capturing(verbosity: VerbosityLevel) -> Self {
        let mut logger = Self::with_verbosity(verbosity);
        logger.enable_capture();
        logger
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.output_format = format;
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    /// Capture to memory and stop printing
    pub fn enable_capture(&mut self) {
        self.output_mode = OutputMode::Memory;
    }

    pub fn disable_capture(&mut self) {
        self.output_mode = OutputMode::Stdout;
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        // A panic while holding the lock leaves the Vec intact
        self.log_buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of captured entries
    pub fn logs(&self) -> Vec<LogEntry> {
        self.buffer().clone()
    }

    /// Captured entries in one category
    pub fn logs_in(&self, category: &str) -> Vec<LogEntry> {
        self.buffer()
            .iter()
            .filter(|e| e.category.as_deref() == Some(category))
            .cloned()
            .collect()
    }

    pub fn clear_logs(&self) {
        self.buffer().clear();
    }

    /// Print buffered entries that the verbosity allows, then clear the buffer
    pub fn flush_buffer(&self) {
        let entries = std::mem::take(&mut *self.buffer());
        for entry in entries.iter().filter(|e| e.level <= self.verbosity) {
            self.print(entry);
        }
    }

    fn print(&self, entry: &LogEntry) {
        match self.output_format {
            OutputFormat::Text => {
                let prefix = entry
                    .category
                    .as_deref()
                    .map(|c| format!("[{}] ", c))
                    .unwrap_or_default();
                if entry.level == VerbosityLevel::Minimal {
                    println!("{}{}", prefix, entry.message);
                } else {
                    println!("  {}{}", prefix, entry.message);
                }
            }
            OutputFormat::Json => match serde_json::to_string(entry) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("failed to encode log entry: {}", e),
            },
        }
    }

    /// Record a message at `level` under an optional category
    pub fn log(&self, level: VerbosityLevel, category: Option<&str>, message: &str) {
        if level == VerbosityLevel::Silent {
            return;
        }
        let should_capture = self.is_capturing();
        let should_output = matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both)
            && level <= self.verbosity;

        if !should_capture && !should_output {
            return;
        }

        let entry = LogEntry {
            level,
            message: message.to_string(),
            category: category.map(str::to_string),
        };
        if should_output {
            self.print(&entry);
        }
        if should_capture {
            self.buffer().push(entry);
        }
    }

    #[inline]
    pub fn minimal(&self, message: &str) {
        self.log(VerbosityLevel::Minimal, None, message);
    }

    #[inline]
    pub fn normal(&self, message: &str) {
        self.log(VerbosityLevel::Normal, None, message);
    }

    #[inline]
    pub fn verbose(&self, message: &str) {
        self.log(VerbosityLevel::Verbose, None, message);
    }

    /// Normal-level message tagged with a category
    pub fn event(&self, category: &str, message: &str) {
        self.log(VerbosityLevel::Normal, Some(category), message);
    }

    /// Verbose-level message tagged with a category
    pub fn detail(&self, category: &str, message: &str) {
        self.log(VerbosityLevel::Verbose, Some(category), message);
    }
}

impl Default for GenerationLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GenerationLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("log_count", &self.buffer().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_defaults_print_without_capturing() {
        let logger = GenerationLogger::default();
        assert_eq!(logger.verbosity(), VerbosityLevel::Normal);
        assert_eq!(logger.output_mode(), OutputMode::Stdout);
        assert!(!logger.is_capturing());
    }

    #[test]
    fn test_capture_keeps_order_and_categories() {
        let logger = GenerationLogger::capturing(VerbosityLevel::Normal);
        logger.normal("attempt 1 started");
        logger.minimal("generated in 1 attempt");
        logger.event("orchestrator", "Idle -> Attempting(1)");

        let entries = logger.logs();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "attempt 1 started");
        assert_eq!(entries[1].level, VerbosityLevel::Minimal);
        assert_eq!(entries[2].category.as_deref(), Some("orchestrator"));
        assert_eq!(logger.logs_in("orchestrator").len(), 1);

        logger.clear_logs();
        assert!(logger.logs().is_empty());
    }

    #[test]
    fn test_capture_ignores_verbosity() {
        // Captured entries are filtered at flush time, not at log time
        let logger = GenerationLogger::capturing(VerbosityLevel::Minimal);
        logger.verbose("detail");
        logger.log(VerbosityLevel::Silent, None, "never recorded");
        assert_eq!(logger.logs().len(), 1);
    }

    #[test]
    fn test_flush_buffer_clears() {
        let logger = GenerationLogger::capturing(VerbosityLevel::Silent);
        logger.normal("one");
        logger.normal("two");
        logger.flush_buffer();
        assert!(logger.logs().is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let logger = Arc::new(GenerationLogger::capturing(VerbosityLevel::Verbose));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || logger.detail("worker", &format!("worker {}", i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(logger.logs_in("worker").len(), 4);
    }

    #[test]
    fn test_verbosity_from_str() {
        assert_eq!("verbose".parse::<VerbosityLevel>(), Ok(VerbosityLevel::Verbose));
        assert_eq!("0".parse::<VerbosityLevel>(), Ok(VerbosityLevel::Silent));
        assert!("loud".parse::<VerbosityLevel>().is_err());
    }
}
