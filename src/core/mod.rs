//! Core functionality for rup

pub mod credentials;
pub mod progress;
pub mod session;
pub mod state;
pub mod video_info;

pub use credentials::*;
pub use progress::*;
pub use session::*;
pub use state::*;
pub use video_info::*;
