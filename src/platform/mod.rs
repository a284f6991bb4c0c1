//! Video platform API client and related functionality

pub mod client;
pub mod gdata;
pub mod transport;

pub use client::*;
pub use gdata::*;
pub use transport::*;
