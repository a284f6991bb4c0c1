//! Command line argument parsing

use crate::core::video_info::VideoMetadata;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Rust Video Uploader - Upload videos from the command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Developer key issued by the video service
    #[arg(
        long,
        env = "RUP_DEVELOPER_KEY",
        hide_env_values = true,
        value_name = "KEY",
        global = true
    )]
    pub developer_key: Option<String>,

    /// Saved credentials file [default: $HOME/.config/rup/credentials.json]
    #[arg(long, value_name = "PATH", global = true)]
    pub credentials_file: Option<PathBuf>,

    /// Do not save or reuse credentials
    #[arg(long, global = true)]
    pub no_save_credentials: bool,

    /// HTTP timeout for sign-in and token requests (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s", global = true)]
    pub timeout: humantime::Duration,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL", global = true)]
    pub proxy: Option<String>,

    /// Send sign-in and token requests to this base URL instead of the service
    #[arg(long, value_name = "URL", global = true, hide = true)]
    pub api_base: Option<String>,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT", global = true)]
    pub user_agent: Option<String>,

    /// Disable progress output
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and save the credentials for later uploads
    Login {
        /// Account e-mail
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(long, env = "RUP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Upload a video file
    Upload {
        /// Video file to upload
        file: PathBuf,

        /// Video title [default: derived from the file name]
        #[arg(long)]
        title: Option<String>,

        /// Video description
        #[arg(long)]
        description: Option<String>,

        /// Comma separated keywords
        #[arg(long)]
        keywords: Option<String>,

        /// Video category [default: People]
        #[arg(long)]
        category: Option<String>,

        /// Extra metadata as KEY=VALUE; unknown keys are ignored
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,

        /// Sign in with this account first instead of using saved credentials
        #[arg(long)]
        email: Option<String>,

        /// Account password for --email (read from stdin when omitted)
        #[arg(long, env = "RUP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Delete saved credentials
    Logout,
}

impl Command {
    /// Metadata for an upload; `None` for other commands.
    ///
    /// Dedicated flags win over `--meta` pairs.
    pub fn metadata(&self) -> Option<VideoMetadata> {
        let Command::Upload {
            title,
            description,
            keywords,
            category,
            meta,
            ..
        } = self
        else {
            return None;
        };

        let mut metadata = VideoMetadata::from_pairs(meta.iter().map(|(k, v)| (k, v.clone())));
        if let Some(title) = title {
            metadata = metadata.with_title(title.clone());
        }
        if let Some(description) = description {
            metadata = metadata.with_description(description.clone());
        }
        if let Some(keywords) = keywords {
            metadata = metadata.with_keywords(keywords.clone());
        }
        if let Some(category) = category {
            metadata = metadata.with_category(category.clone());
        }
        Some(metadata)
    }
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Check if credentials should be saved and reused
    pub fn save_credentials(&self) -> bool {
        !self.no_save_credentials
    }

    /// Resolve the credentials file, falling back to the per-user default
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials_file
            .clone()
            .or_else(|| default_credentials_path(std::env::var_os("HOME").map(PathBuf::from)))
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl VerbosityLevel {
    /// Log filter used when RUST_LOG is not set
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "off",
            VerbosityLevel::Normal => "error",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

/// `$HOME/.config/rup/credentials.json`
pub fn default_credentials_path(home: Option<PathBuf>) -> Option<PathBuf> {
    home.map(|home| home.join(".config").join("rup").join("credentials.json"))
}

/// Parse a `KEY=VALUE` pair
pub fn parse_key_value(pair: &str) -> Result<(String, String), String> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", pair))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", pair));
    }
    Ok((key.to_string(), value.to_string()))
}
