//! Built-in element renderers
//!
//! Each renderer turns one resolved position into an SVG fragment. Geometry
//! is derived from the center point and size; the only extra inputs are the
//! detail carried over from layout (line stroke, nested shape layouts) and
//! the pre-built style and raw attribute blocks.

use crate::error::{DiagramError, Result};
use crate::layout::geometry::round3;
use crate::layout::transform::svg_transform_attr;
use crate::layout::types::{PositionDetail, ResolvedPosition, VAlign};
use crate::parser::elements::{Element, ElementKind};
use crate::renderer::svg::RenderContext;

/// Renders one occurrence of an element. `style_block` and `svg_block` are
/// either empty or start with a space, so they append to a tag directly.
pub type RendererFn = fn(
    &RenderContext<'_>,
    &Element,
    &ResolvedPosition,
    &str,
    &str,
) -> Result<String>;

const LINE_HEIGHT_EM: f64 = 1.2;

pub fn render_ellipse(
    _ctx: &RenderContext<'_>,
    _element: &Element,
    pos: &ResolvedPosition,
    style_block: &str,
    svg_block: &str,
) -> Result<String> {
    let rx = pos.width.unwrap_or_default() / 2.0;
    let ry = pos.height.unwrap_or_default() / 2.0;
    Ok(format!(
        "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" stroke=\"black\"{style_block}{svg_block}></ellipse>",
        round3(pos.cx),
        round3(pos.cy),
        round3(rx),
        round3(ry),
    ))
}

pub fn render_line(
    _ctx: &RenderContext<'_>,
    _element: &Element,
    pos: &ResolvedPosition,
    style_block: &str,
    svg_block: &str,
) -> Result<String> {
    let width = pos.width.unwrap_or_default();
    let height = pos.height.unwrap_or_default();
    let (stroke_width, vertical) = match pos.detail {
        PositionDetail::Line {
            stroke_width,
            vertical,
        } => (stroke_width, vertical),
        _ => (1.0, height >= width),
    };
    let (x1, y1, x2, y2) = if vertical {
        (pos.cx, pos.cy - height / 2.0, pos.cx, pos.cy + height / 2.0)
    } else {
        (pos.cx - width / 2.0, pos.cy, pos.cx + width / 2.0, pos.cy)
    };
    Ok(format!(
        "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"black\" stroke-width=\"{}\"{style_block}{svg_block}></line>",
        round3(x1),
        round3(y1),
        round3(x2),
        round3(y2),
        round3(stroke_width),
    ))
}

pub fn render_rect(
    _ctx: &RenderContext<'_>,
    _element: &Element,
    pos: &ResolvedPosition,
    style_block: &str,
    svg_block: &str,
) -> Result<String> {
    let width = pos.width.unwrap_or_default();
    let height = pos.height.unwrap_or_default();
    Ok(format!(
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" stroke-width=\"1\" stroke=\"black\"{style_block}{svg_block}></rect>",
        round3(pos.cx - width / 2.0),
        round3(pos.cy - height / 2.0),
        round3(width),
        round3(height),
    ))
}

pub fn render_polygon(
    _ctx: &RenderContext<'_>,
    element: &Element,
    pos: &ResolvedPosition,
    style_block: &str,
    svg_block: &str,
) -> Result<String> {
    let ElementKind::Polygon { points } = &element.kind else {
        return Err(renderer_mismatch("polygon", element));
    };
    let x0 = pos.cx - pos.width.unwrap_or_default() / 2.0;
    let y0 = pos.cy - pos.height.unwrap_or_default() / 2.0;
    let rendered = points
        .iter()
        .map(|(x, y)| format!("{},{}", round3(x0 + x), round3(y0 + y)))
        .collect::<Vec<_>>()
        .join(" ");
    Ok(format!(
        "<polygon points=\"{rendered}\"{style_block}{svg_block}></polygon>"
    ))
}

/// Multi-line text renders as one tspan per line. The first tspan's `dy`
/// recenters the block for middle and bottom alignment, since the anchor
/// styles only place the first baseline.
pub fn render_text(
    _ctx: &RenderContext<'_>,
    element: &Element,
    pos: &ResolvedPosition,
    style_block: &str,
    _svg_block: &str,
) -> Result<String> {
    let ElementKind::Text { lines } = &element.kind else {
        return Err(renderer_mismatch("text", element));
    };
    let extra_lines = lines.len().saturating_sub(1) as f64;
    let mut dy = match pos.grid_align.vertical {
        VAlign::Middle => -LINE_HEIGHT_EM / 2.0 * extra_lines,
        VAlign::Bottom => -LINE_HEIGHT_EM * extra_lines,
        VAlign::Top => 0.0,
    };
    let x = round3(pos.cx);
    let mut buf = format!("<text x=\"{x}\" y=\"{}\"{style_block}>", round3(pos.cy));
    for line in lines {
        let safe = html_entities(line.trim());
        buf.push_str(&format!(
            "<tspan x=\"{x}\" dy=\"{}em\">{safe}</tspan>",
            round3(dy)
        ));
        dy = LINE_HEIGHT_EM;
    }
    buf.push_str("</text>");
    Ok(buf)
}

pub fn render_path(
    _ctx: &RenderContext<'_>,
    element: &Element,
    pos: &ResolvedPosition,
    style_block: &str,
    svg_block: &str,
) -> Result<String> {
    let ElementKind::Path { data } = &element.kind else {
        return Err(renderer_mismatch("path", element));
    };
    let x1 = round3(pos.cx - pos.width.unwrap_or_default() / 2.0);
    let y1 = round3(pos.cy - pos.height.unwrap_or_default() / 2.0);
    Ok(format!(
        "<path d=\"M {x1},{y1} {data}\"{style_block}{svg_block}></path>"
    ))
}

pub fn render_image(
    ctx: &RenderContext<'_>,
    element: &Element,
    pos: &ResolvedPosition,
    style_block: &str,
    svg_block: &str,
) -> Result<String> {
    let ElementKind::Image { url } = &element.kind else {
        return Err(renderer_mismatch("image", element));
    };
    let width = pos.width.unwrap_or_default();
    let height = pos.height.unwrap_or_default();
    let href = ctx.image_href(url, element.line)?;
    Ok(format!(
        "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" href=\"{href}\"{style_block}{svg_block}></image>",
        round3(pos.cx - width / 2.0),
        round3(pos.cy - height / 2.0),
        round3(width),
        round3(height),
    ))
}

/// A nested shape renders its own layers inside a group carrying the
/// placement and scale chain resolved during layout.
pub fn render_shape(
    ctx: &RenderContext<'_>,
    element: &Element,
    pos: &ResolvedPosition,
    _style_block: &str,
    _svg_block: &str,
) -> Result<String> {
    let PositionDetail::Shape { layout, .. } = &pos.detail else {
        return Err(renderer_mismatch("shape", element));
    };
    let transforms = svg_transform_attr(&pos.transforms);
    let inner = ctx.render_layers(layout, false)?;
    Ok(format!("<g{transforms}>{inner}</g>"))
}

fn renderer_mismatch(expected: &str, element: &Element) -> DiagramError {
    DiagramError::invalid_element(
        format!(
            "Renderer for '{expected}' cannot draw a '{}' element",
            element.kind.tag()
        ),
        element.line,
    )
}

pub fn html_entities(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
