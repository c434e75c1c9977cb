//! # Earmark Common Library
//!
//! Shared code for the Earmark song recognition service:
//! - Error types used across all components
//! - Streaming recognition protocol messages
//! - Analysis, matcher, and session parameter sets

pub mod error;
pub mod messages;
pub mod params;

pub use error::{Error, Result};
pub use messages::{ClientMessage, ServerMessage, SongInfo};
pub use params::{AnalysisParams, MatcherParams, SessionParams};
