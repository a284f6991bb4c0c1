//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::progress::{format_bytes, format_duration};
use crate::core::state::UploaderState;
use crate::core::video_info::UploadedVideo;
use crate::error::RupError;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Output formatter for rup
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    progress_bar: Option<ProgressBar>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: None,
        }
    }

    /// Create a progress bar for an upload of `total_size` bytes
    pub fn create_progress_bar(&mut self, total_size: u64) -> Option<ProgressBar> {
        if self.verbosity == VerbosityLevel::Quiet {
            return None;
        }

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let progress_bar = ProgressBar::new(total_size);
        progress_bar.set_style(style);
        progress_bar.set_message("Uploading...");

        self.progress_bar = Some(progress_bar.clone());
        Some(progress_bar)
    }

    /// Move the progress bar to `fraction` of its length
    pub fn update_progress(&self, fraction: f64) {
        if let Some(progress_bar) = &self.progress_bar {
            let total = progress_bar.length().unwrap_or(0);
            progress_bar.set_position(position_for(fraction, total));
        }
    }

    /// Show the session state next to the bar
    pub fn update_state(&self, state: UploaderState) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_message(state.to_string());
        }
    }

    /// Finish progress bar
    pub fn finish_progress(&self, message: &str) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.finish_with_message(message.to_string());
        }
    }

    /// Drop the progress bar without leaving it on screen
    pub fn abandon_progress(&self) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.finish_and_clear();
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("ℹ️  {}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("✅ {}", message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("⚠️  {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }

    /// Print upload start message
    pub fn print_upload_start(&self, path: &Path, size: u64) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!("🚀 Starting upload...");
        println!("📁 File: {} ({})", path.display(), format_bytes(size));
        println!();
    }

    /// Print upload complete message; the watch link is printed even when quiet
    pub fn print_upload_complete(&self, video: &UploadedVideo, duration: Duration) {
        if self.verbosity == VerbosityLevel::Quiet {
            println!("{}", video.url);
            return;
        }

        println!();
        println!("✅ Upload completed!");
        println!("🆔 Video: {}", video.video_id);
        println!("🔗 URL: {}", video.url);
        println!("⏱️  Time: {}", format_duration(duration));
    }
}

/// Create a progress callback for an upload session
pub fn create_progress_callback(
    formatter: Arc<OutputFormatter>,
) -> impl Fn(f64) + Send + Sync + 'static {
    move |fraction: f64| {
        formatter.update_progress(fraction);
    }
}

/// Error line with the stable code, when the error has one
pub fn describe_error(error: &RupError) -> String {
    match error.code() {
        Some(code) => format!("{} (code {})", error, code),
        None => error.to_string(),
    }
}

fn position_for(fraction: f64, total: u64) -> u64 {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    (fraction * total as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_output_formatter_creation() {
        let formatter = OutputFormatter::new(VerbosityLevel::Normal);
        assert_eq!(formatter.verbosity, VerbosityLevel::Normal);
        assert!(formatter.progress_bar.is_none());
    }

    #[test]
    fn test_create_progress_bar_quiet_mode() {
        let mut formatter = OutputFormatter::new(VerbosityLevel::Quiet);
        assert!(formatter.create_progress_bar(1000).is_none());
    }

    #[test]
    fn test_update_progress_tracks_fraction() {
        let mut formatter = OutputFormatter::new(VerbosityLevel::Normal);
        let progress_bar = formatter.create_progress_bar(1000).unwrap();

        formatter.update_progress(0.25);
        assert_eq!(progress_bar.position(), 250);

        formatter.update_state(UploaderState::Uploading);
        assert_eq!(progress_bar.message(), "uploading");

        formatter.update_progress(1.0);
        assert_eq!(progress_bar.position(), 1000);
        formatter.finish_progress("Upload completed!");
    }

    #[test]
    fn test_create_progress_callback() {
        let mut formatter = OutputFormatter::new(VerbosityLevel::Normal);
        let progress_bar = formatter.create_progress_bar(200).unwrap();
        let callback = create_progress_callback(Arc::new(formatter));

        callback(0.5);
        assert_eq!(progress_bar.position(), 100);
    }

    #[test]
    fn test_position_for() {
        assert_eq!(position_for(0.0, 1000), 0);
        assert_eq!(position_for(0.333, 1000), 333);
        assert_eq!(position_for(2.0, 1000), 1000);
        assert_eq!(position_for(f64::NAN, 1000), 0);
        assert_eq!(position_for(0.5, 0), 0);
    }

    #[test]
    fn test_describe_error() {
        assert_eq!(
            describe_error(&RupError::NotAuthenticated),
            "Not logged in (code 50)"
        );
        assert_eq!(
            describe_error(&RupError::MissingDeveloperKey),
            "Developer key is missing"
        );
    }

    #[test]
    fn test_print_helpers_do_not_panic() {
        let video = UploadedVideo::new(
            "vid1",
            Url::parse("https://www.youtube.com/watch?v=vid1").unwrap(),
        );
        for verbosity in [VerbosityLevel::Quiet, VerbosityLevel::Normal] {
            let formatter = OutputFormatter::new(verbosity);
            formatter.print_upload_start(Path::new("/tmp/v.mp4"), 2048);
            formatter.print_upload_complete(&video, Duration::from_secs(90));
            formatter.info("test");
            formatter.warning("test");
            formatter.finish_progress("no bar");
            formatter.abandon_progress();
        }
    }
}
