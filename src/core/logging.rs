use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, OnceLock};

use serde_json::Value;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::core::config::{AppPaths, LoggingSettings};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber: JSON lines to stdout, to a daily
/// `server.log` under the log dir, and into the returned in-memory ring.
pub fn init(paths: &AppPaths, settings: &LoggingSettings) -> RecentLogs {
    let recent = RecentLogs::new(settings.recent_capacity);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = if settings.file_enabled {
        let log_dir = &paths.log_dir;
        let _ = std::fs::create_dir_all(log_dir);
        let file_appender = tracing_appender::rolling::daily(log_dir, "server.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
    } else {
        None
    };

    let recent_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_writer(recent.clone());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .with(recent_layer)
        .init();

    recent
}

/// Bounded ring of the most recent formatted log lines.
#[derive(Clone)]
pub struct RecentLogs {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl RecentLogs {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push_line(&self, line: &str) {
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.to_string());
    }

    /// Oldest first. JSON lines are returned as objects, anything else as strings.
    pub fn snapshot(&self) -> Vec<Value> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines
            .iter()
            .map(|line| {
                serde_json::from_str::<Value>(line).unwrap_or_else(|_| Value::String(line.clone()))
            })
            .collect()
    }
}

pub struct RecentLogsWriter {
    logs: RecentLogs,
    buffer: Vec<u8>,
}

impl RecentLogsWriter {
    fn drain_complete_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.logs.push_line(&String::from_utf8_lossy(&line));
        }
    }
}

impl io::Write for RecentLogsWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.drain_complete_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_complete_lines();
        Ok(())
    }
}

impl Drop for RecentLogsWriter {
    fn drop(&mut self) {
        self.drain_complete_lines();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.logs.push_line(&String::from_utf8_lossy(&rest));
        }
    }
}

impl<'a> MakeWriter<'a> for RecentLogs {
    type Writer = RecentLogsWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RecentLogsWriter {
            logs: self.clone(),
            buffer: Vec::new(),
        }
    }
}
