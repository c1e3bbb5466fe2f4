//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the framework:
//! - Frame timing
//! - Logging utilities

pub mod logging;
pub mod time;
