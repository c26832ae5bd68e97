//! Rendering options

use std::path::PathBuf;

use crate::layout::SettingsProfile;

/// Options for turning a compiled diagram into SVG text.
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    /// Settings and margin overrides applied before the spec is parsed.
    pub profile: Option<SettingsProfile>,
    /// Directory relative image and font paths resolve against. Defaults to
    /// the current directory.
    pub base_path: Option<PathBuf>,
    /// Inline image files as base64 data uris instead of referencing them.
    pub embed_images: bool,
    /// Overlay a checkerboard over the default layer's grid tracks.
    pub debug_grid: bool,
}

impl RenderConfig {
    pub fn base_path(&self) -> PathBuf {
        self.base_path.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
