//! Terminal UI rendering using ratatui.
//!
//! ## Submodules
//!
//! - [`reading`]: The main panel with the latest reading, threshold and states
//! - [`dialog`]: Modal overlays for alerts, errors and threshold entry
//! - [`common`]: Shared components (header, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ Reading panel (reading::render)      │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top, most urgent last:
//!    - common::render_help
//!    - dialog::render_threshold_input
//!    - dialog::render_error
//!    - dialog::render_alert
//! ```

pub mod common;
pub mod dialog;
pub mod reading;
pub mod theme;

pub use theme::Theme;

use ratatui::layout::Rect;

/// A rectangle of at most `width` x `height` centered in `area`.
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
