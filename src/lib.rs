//! grid-diagram - an ASCII-grid diagram language compiled to SVG
//!
//! A diagram file declares named elements in a spec section, then sketches
//! their arrangement as a character grid in a layout section. Column
//! positions become sized tracks, rows become layers of placed elements,
//! and the result renders as a standalone SVG document.
//!
//! # Example
//!
//! ```rust
//! use grid_diagram::render;
//!
//! let svg = render("rect:\n  box: 100 50\nlayout:\n\nbox\n").unwrap();
//! assert!(svg.contains("<svg"));
//! assert!(svg.contains("<rect"));
//! ```

pub mod error;
pub mod input;
pub mod layout;
pub mod parser;
pub mod renderer;

pub use error::{DiagramError, DiagramErrorKind, Result};
pub use layout::{Margin, Settings, SettingsProfile, ShapeLayout};
pub use parser::{Registry, SpecState};
pub use renderer::RenderConfig;

use crate::parser::spec;

/// A parsed and laid-out diagram, ready to render. The state keeps the
/// styles, fonts, and raw attribute tables the renderer consumes; the
/// layout holds the placed layers and the position ledger.
#[derive(Debug, Clone)]
pub struct Diagram {
    pub state: SpecState,
    pub layout: ShapeLayout,
}

impl Diagram {
    pub fn width(&self) -> f64 {
        self.layout.width
    }

    pub fn height(&self) -> f64 {
        self.layout.height
    }
}

/// Parse and lay out a diagram without rendering it.
pub fn compile(source: &str) -> Result<Diagram> {
    compile_with_config(source, &RenderConfig::default())
}

/// Like [`compile`], applying the settings profile of `config` before the
/// spec is parsed.
pub fn compile_with_config(source: &str, config: &RenderConfig) -> Result<Diagram> {
    let registry = Registry::with_builtins();
    compile_with_registry(source, &registry, config)
}

/// The full pipeline against a caller-supplied registry, for plugins that
/// register their own element types.
pub fn compile_with_registry(
    source: &str,
    registry: &Registry,
    config: &RenderConfig,
) -> Result<Diagram> {
    let mut settings = Settings::default();
    let mut margin = Margin::default();
    if let Some(profile) = &config.profile {
        profile.apply(&mut settings, &mut margin);
    }

    let sections = input::split_sections(source)?;
    let mut spec_lines = sections.spec;
    let mut state = spec::parse_spec(&mut spec_lines, registry, settings, margin)?;
    for block in sections.shapes {
        let def = spec::parse_shape(block, registry, &state.settings)?;
        state.shapes.insert(def.name.clone(), def);
    }

    let mut layout_lines = sections.layout;
    let layout = layout::layout_diagram(&state, registry, &mut layout_lines)?;

    Ok(Diagram { state, layout })
}

/// Render a diagram source to SVG with default configuration.
pub fn render(source: &str) -> Result<String> {
    render_with_config(source, &RenderConfig::default())
}

/// Render a diagram source to SVG.
pub fn render_with_config(source: &str, config: &RenderConfig) -> Result<String> {
    let registry = Registry::with_builtins();
    let diagram = compile_with_registry(source, &registry, config)?;
    renderer::render_document(&diagram.state, &registry, &diagram.layout, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_rect() {
        let svg = render("rect:\n  box: 100 50\nlayout:\n\nbox\n").unwrap();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
        // 30px margin on each side around the 100x50 element.
        assert!(svg.contains("viewBox=\"0 0 160 110\""));
        assert!(svg.contains("<rect x=\"30\" y=\"30\" width=\"100\" height=\"50\""));
    }

    #[test]
    fn test_render_with_style_class() {
        let source = "rect:\n  box: 40 40\nstyle:\n  box: fill: red\nlayout:\n\nbox\n";
        let svg = render(source).unwrap();
        assert!(svg.contains(".box { fill: red }"));
        assert!(svg.contains("class=\"box\""));
    }

    #[test]
    fn test_render_text_gets_default_alignment_styles() {
        let source = "text:\n  t: hello\nlayout:\n\nt\n";
        let svg = render(source).unwrap();
        assert!(svg.contains("text-anchor: middle"));
        assert!(svg.contains("<tspan"));
        assert!(svg.contains("hello"));
    }

    #[test]
    fn test_compile_reports_size() {
        let diagram = compile("rect:\n  box: 100 50\nlayout:\n\nbox\n").unwrap();
        assert_eq!(diagram.width(), 160.0);
        assert_eq!(diagram.height(), 110.0);
    }

    #[test]
    fn test_error_carries_line_number() {
        let err = render("rect:\n  box: 40 40\nlayout:\n\nboxx\n").unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::UnknownElement);
        assert_eq!(err.line, 5);
    }

    #[test]
    fn test_profile_margin_applies() {
        let config = RenderConfig {
            profile: Some(SettingsProfile::from_toml("[margin]\ntop = 0\nright = 0\nbottom = 0\nleft = 0\n").unwrap()),
            ..RenderConfig::default()
        };
        let diagram =
            compile_with_config("rect:\n  box: 100 50\nlayout:\n\nbox\n", &config).unwrap();
        assert_eq!(diagram.width(), 100.0);
        assert_eq!(diagram.height(), 50.0);
    }

    #[test]
    fn test_debug_grid_flag_adds_checkerboard() {
        let config = RenderConfig {
            debug_grid: true,
            ..RenderConfig::default()
        };
        let svg =
            render_with_config("rect:\n  a: 40 40\n  b: 40 40\nlayout:\n\na b\n", &config).unwrap();
        assert!(svg.contains("fill: lightblue"));
    }
}
