//! SVG document assembly
//!
//! A compiled layout renders into a single SVG string: prolog, viewport
//! sized to the layout plus its negative space, font and style blocks, then
//! one `<g>` per layer in z order. Nested shape layouts go through the same
//! layer rendering via their `shape` renderer.

use std::collections::BTreeMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{DiagramError, Result};
use crate::layout::geometry::round3;
use crate::layout::transform::svg_transform_attr;
use crate::layout::types::{GridCell, Layer, PositionLedger, ShapeLayout};
use crate::parser::spec::Font;
use crate::parser::{Registry, SpecState};
use crate::renderer::config::RenderConfig;

/// Everything the renderers need besides the position itself: the style and
/// raw attribute tables, url resolution, and the registry for recursing into
/// nested shapes.
pub struct RenderContext<'a> {
    registry: &'a Registry,
    state: &'a SpecState,
    config: &'a RenderConfig,
    debug_grid: bool,
}

/// Render a compiled layout as a complete SVG document.
pub fn render_document(
    state: &SpecState,
    registry: &Registry,
    layout: &ShapeLayout,
    config: &RenderConfig,
) -> Result<String> {
    let ctx = RenderContext {
        registry,
        state,
        config,
        debug_grid: config.debug_grid || state.debug_grid,
    };

    let x1 = -layout.neg_space_x;
    let y1 = -layout.neg_space_y;
    let width = layout.width + layout.neg_space_x;
    let height = layout.height + layout.neg_space_y;

    let mut buf = String::new();
    buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    buf.push_str("<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n");
    buf.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" viewBox=\"{} {} {} {}\" width=\"{}\" height=\"{}\" style=\"background-color: #fff\">",
        round3(x1),
        round3(y1),
        round3(width),
        round3(height),
        round3(width),
        round3(height),
    ));

    buf.push_str(&render_fonts(&state.fonts, &ctx));
    buf.push_str(&render_styles(state));
    buf.push_str(&ctx.render_layers(layout, true)?);
    buf.push_str("</svg>");

    Ok(buf)
}

fn render_styles(state: &SpecState) -> String {
    let mut buf = String::from("<style>");
    for (selector, declarations) in &state.default_styles {
        buf.push_str(&format!("{selector} {{ {declarations} }}"));
    }
    for style in state.styles.values() {
        if let Some(val) = &style.val {
            buf.push_str(&format!(".{} {{ {val} }}", style.name));
        }
    }
    buf.push_str("</style>");
    buf
}

fn render_fonts(fonts: &[Font], ctx: &RenderContext<'_>) -> String {
    if fonts.is_empty() {
        return String::new();
    }
    let mut buf = String::from("<defs>  <style type=\"text/css\">");
    for font in fonts {
        if font.name.eq_ignore_ascii_case("import") {
            for url in font.url.split_whitespace() {
                buf.push_str(&format!("@import url(\"{url}\");"));
            }
        } else {
            let url = ctx.resolve_url(&font.url);
            buf.push_str(&format!(
                "@font-face {{ font-family: '{}'; src: url('{url}');}}",
                font.name
            ));
        }
    }
    buf.push_str("  </style></defs>");
    buf
}

impl<'a> RenderContext<'a> {
    pub fn new(registry: &'a Registry, state: &'a SpecState, config: &'a RenderConfig) -> Self {
        Self {
            registry,
            state,
            config,
            debug_grid: config.debug_grid || state.debug_grid,
        }
    }

    /// Render a shape's layers in ascending z order. `diagram_shape` is true
    /// only for the outermost layout; the debug grid and margins exist only
    /// there.
    pub fn render_layers(&self, layout: &ShapeLayout, diagram_shape: bool) -> Result<String> {
        let mut buf = String::new();

        if diagram_shape && self.debug_grid {
            if let Some(layer) = layout.default_layer() {
                buf.push_str(&format!("<g>{}</g>", debug_grid(layer, diagram_shape)));
            }
        }

        let mut layers: Vec<&Layer> = layout.layers.iter().collect();
        layers.sort_by_key(|l| l.z_index);

        for layer in layers {
            let body = self.render_layer(layer, &layout.positions)?;
            let transforms = svg_transform_attr(&layer.transforms);
            let svg = match svg_with_variables_filled(layer) {
                Some(attrs) => format!(" {attrs}"),
                None => String::new(),
            };
            buf.push_str(&format!("<g{transforms}{svg}>{body}</g>"));
        }

        Ok(buf)
    }

    fn render_layer(&self, layer: &Layer, positions: &PositionLedger) -> Result<String> {
        // Occurrence order matches the ledger: row-major grid discovery.
        let mut indexes: BTreeMap<&str, usize> = BTreeMap::new();
        let mut buf = String::new();

        for row in &layer.grid {
            for cell in row {
                let GridCell::Object(obj) = cell else {
                    continue;
                };
                let key = obj.element.key.as_str();
                let index = indexes.entry(key).and_modify(|i| *i += 1).or_insert(0);
                let Some(pos) = positions.get(layer.z_index, key, *index) else {
                    continue;
                };
                let tag = obj.element.kind.tag();
                let renderer = self.registry.renderer(tag).ok_or_else(|| {
                    DiagramError::invalid_element(
                        format!("No renderer for element type: {tag}"),
                        obj.element.line,
                    )
                })?;
                let style_block = self.style_block(key);
                let svg_block = self.svg_block(key);
                buf.push_str(&renderer(self, &obj.element, pos, &style_block, &svg_block)?);
            }
        }

        Ok(buf)
    }

    fn style_block(&self, key: &str) -> String {
        let Some(style) = self.state.styles.get(key) else {
            return String::new();
        };
        let mut block = format!(" class=\"{}\"", style.name);
        if let Some(plus) = &style.plus {
            if !plus.is_empty() {
                block.push_str(&format!(" style=\"{plus}\""));
            }
        }
        block
    }

    fn svg_block(&self, key: &str) -> String {
        match self.state.svg_attrs.get(key) {
            Some(attrs) => format!(" {attrs}"),
            None => String::new(),
        }
    }

    /// Relative urls resolve against the configured base path; absolute
    /// paths and remote urls pass through untouched.
    pub fn resolve_url(&self, url: &str) -> String {
        if is_remote(url) || url.starts_with('/') {
            return url.to_string();
        }
        self.config
            .base_path()
            .join(url)
            .to_string_lossy()
            .into_owned()
    }

    /// The href for an image element: the resolved url, or the file inlined
    /// as a base64 data uri when embedding is on. Remote urls are never
    /// embedded.
    pub fn image_href(&self, url: &str, line: usize) -> Result<String> {
        let resolved = self.resolve_url(url);
        if !self.config.embed_images || is_remote(url) {
            return Ok(resolved);
        }
        let bytes = std::fs::read(&resolved).map_err(|e| {
            DiagramError::invalid_element(format!("Cannot read image {resolved}: {e}"), line)
        })?;
        Ok(format!(
            "data:{};base64,{}",
            image_mime(&resolved),
            STANDARD.encode(bytes)
        ))
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn image_mime(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn svg_with_variables_filled(layer: &Layer) -> Option<String> {
    let svg = layer.svg.as_ref()?;
    Some(
        svg.replace("$x", &round3(layer.col_start).to_string())
            .replace("$y", &round3(layer.row_start).to_string()),
    )
}

/// Checkerboard rects over the layer's tracks, for eyeballing column and row
/// sizing.
fn debug_grid(layer: &Layer, diagram_shape: bool) -> String {
    let colors = if diagram_shape {
        ["white", "lightblue"]
    } else {
        ["lightgray", "lightpink"]
    };

    let mut buf = String::new();
    let mut row_y = layer.row_start;
    for (y, row_height) in layer.row_heights.iter().enumerate() {
        let mut col_x = layer.col_start;
        for (x, col_width) in layer.col_widths.iter().enumerate() {
            let color = colors[(y + x) % 2];
            buf.push_str(&format!(
                "<rect style=\"fill: {color};\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"></rect>",
                round3(col_x),
                round3(row_y),
                round3(*col_width),
                round3(*row_height),
            ));
            col_x += col_width;
        }
        row_y += row_height;
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_variables_filled() {
        let layer = Layer {
            index: 0,
            z_index: 1,
            grid: Vec::new(),
            col_widths: Vec::new(),
            row_heights: Vec::new(),
            object_map: BTreeMap::new(),
            location: None,
            rotate_to: None,
            svg: Some("mask=\"url(#m)\" data-at=\"$x,$y\"".to_string()),
            transforms: Vec::new(),
            col_start: 30.0,
            row_start: 42.5,
            line: 1,
        };
        assert_eq!(
            svg_with_variables_filled(&layer).as_deref(),
            Some("mask=\"url(#m)\" data-at=\"30,42.5\"")
        );
    }

    #[test]
    fn test_image_mime_by_extension() {
        assert_eq!(image_mime("a/b.PNG"), "image/png");
        assert_eq!(image_mime("pic.jpeg"), "image/jpeg");
        assert_eq!(image_mime("noext"), "application/octet-stream");
    }

    #[test]
    fn test_remote_urls() {
        assert!(is_remote("https://example.com/x.png"));
        assert!(!is_remote("images/x.png"));
        assert!(!is_remote("/var/x.png"));
    }
}
