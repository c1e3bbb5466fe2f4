//! # Core Module
//!
//! Shared configuration types used by the application and its windows.
//!
//! ## Organization
//!
//! - **Config**: application configuration (context hints, shader set, overlay keys)
//! - **Foundation**: re-exported low-level utilities (logging, timing)

pub mod config;

pub use crate::foundation;

pub use config::{
    AppConfig,
    ContextConfig,
    ShaderEntry,
    ShaderSetConfig,
    WindowDefaults,
    OVERLAY_FONT_KEY,
    OVERLAY_SHADER_KEY,
};
