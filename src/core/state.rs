//! Uploader state

use std::fmt;

/// What a session is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UploaderState {
    /// Nothing in flight
    #[default]
    Idle,
    LoggingIn,
    /// Checking the file and obtaining an upload target
    PreparingFile,
    /// Sending video bytes
    Uploading,
}

impl UploaderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, UploaderState::Idle)
    }
}

impl fmt::Display for UploaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploaderState::Idle => "idle",
            UploaderState::LoggingIn => "logging in",
            UploaderState::PreparingFile => "preparing file",
            UploaderState::Uploading => "uploading",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(UploaderState::default(), UploaderState::Idle);
        assert!(UploaderState::default().is_idle());
        assert!(!UploaderState::Uploading.is_idle());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(UploaderState::PreparingFile.to_string(), "preparing file");
    }
}
