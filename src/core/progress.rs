//! Progress tracking for uploads

use std::time::Duration;

/// Bytes handed to the connection so far
#[derive(Debug, Clone)]
pub struct Progress {
    /// Total size of the file in bytes
    pub total_size: u64,
    /// Number of bytes handed to the connection
    pub sent_size: u64,
    /// Fraction sent (0.0 to 1.0)
    pub fraction: f64,
}

impl Progress {
    /// Create a new progress tracker
    pub fn new(total_size: u64) -> Self {
        Self {
            total_size,
            sent_size: 0,
            fraction: 0.0,
        }
    }

    /// Update progress with the number of bytes sent so far
    pub fn update(&mut self, sent_size: u64) {
        self.sent_size = sent_size;
        self.fraction = if self.total_size > 0 {
            (sent_size as f64 / self.total_size as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Add `bytes` to the amount sent
    pub fn advance(&mut self, bytes: u64) {
        self.update(self.sent_size.saturating_add(bytes));
    }
}

/// Keeps relayed fractions inside [0, 1] and never lets them go backwards
#[derive(Debug, Clone, Default)]
pub struct MonotonicFraction {
    last: f64,
}

impl MonotonicFraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp `value` and raise it to the highest value seen so far
    pub fn next(&mut self, value: f64) -> f64 {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        if value > self.last {
            self.last = value;
        }
        self.last
    }

    pub fn last(&self) -> f64 {
        self.last
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exp = (bytes_f64.ln() / THRESHOLD.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f64 / THRESHOLD.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.1} {}", value, UNITS[exp])
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    } else {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}
