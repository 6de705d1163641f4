//! Centralized constants used across the application.
//!
//! This module contains magic numbers and configuration values that are used
//! in multiple places or would benefit from being named constants.

/// Default window width in pixels
pub const DEFAULT_WINDOW_WIDTH: f32 = 1600.0;

/// Default window height in pixels
pub const DEFAULT_WINDOW_HEIGHT: f32 = 900.0;

/// Number of undo entries kept when the config does not say otherwise
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Edge length of the fallback box used for unknown or missing geometry
pub const DEFAULT_BOX_SIZE: f32 = 10.0;

/// Base color of materials rebuilt without a descriptor (gray)
pub const DEFAULT_MATERIAL_COLOR: u32 = 0x888888;

/// Seconds before a remote texture fetch gives up
pub const DEFAULT_TEXTURE_FETCH_TIMEOUT_SECS: u64 = 30;

/// How long a toast notification stays on screen
pub const NOTIFICATION_LIFETIME_SECS: f32 = 3.0;
