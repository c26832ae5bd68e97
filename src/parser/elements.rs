//! Element definitions and the built-in element parsers

use std::collections::BTreeMap;

use crate::error::{DiagramError, Result};
use crate::input::{Lines, NumberedLine};
use crate::parser::spec::SpecState;
use crate::parser::{extract_params, parse_key_content};

/// Parameter-map key for the `fill(add, min)` adjustments on a width token.
pub const PARAM_FILL_WIDTH: &str = "fill-width";
/// Parameter-map key for the `fill(add, min)` adjustments on a height token.
pub const PARAM_FILL_HEIGHT: &str = "fill-height";
/// Parameter-map key for the arguments of a `shape` element.
pub const PARAM_SHAPE_ARGS: &str = "shape-args";

/// A declared width or height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    Abs(f64),
    /// Grow to the remaining space of the layer.
    Fill,
}

impl SizeSpec {
    pub fn is_fill(&self) -> bool {
        matches!(self, SizeSpec::Fill)
    }

    pub fn abs(&self) -> Option<f64> {
        match self {
            SizeSpec::Abs(v) => Some(*v),
            SizeSpec::Fill => None,
        }
    }
}

/// What an element renders as.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Ellipse,
    Line,
    Rect,
    Polygon { points: Vec<(f64, f64)> },
    Text { lines: Vec<String> },
    Path { data: String },
    Image { url: String },
    Shape { shape: String },
    /// Registered by a plugin; rendered by the renderer under the same tag.
    Custom { tag: String },
}

impl ElementKind {
    pub fn tag(&self) -> &str {
        match self {
            ElementKind::Ellipse => "ellipse",
            ElementKind::Line => "line",
            ElementKind::Rect => "rect",
            ElementKind::Polygon { .. } => "polygon",
            ElementKind::Text { .. } => "text",
            ElementKind::Path { .. } => "path",
            ElementKind::Image { .. } => "image",
            ElementKind::Shape { .. } => "shape",
            ElementKind::Custom { tag } => tag,
        }
    }
}

/// A named element declared in the spec section. Grid cells take copies, so
/// fill sizes resolved during layout never leak back into the template.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub key: String,
    pub kind: ElementKind,
    /// None only for `shape` elements, which can take their natural size.
    pub width: Option<SizeSpec>,
    pub height: Option<SizeSpec>,
    pub params: BTreeMap<String, Vec<String>>,
    /// Line of the definition, for error anchoring.
    pub line: usize,
}

/// Parses the lines under one element-type header into an [`Element`].
pub type ElementParserFn = fn(&NumberedLine, &mut Lines, &SpecState) -> Result<Element>;

/// Interpret a size token: `fill`, optionally with `fill(add, min)`
/// adjustments captured into `params`, or a plain number.
fn size_token(
    token: Option<&str>,
    params: &mut BTreeMap<String, Vec<String>>,
    param_key: &str,
    fill_supported: bool,
    line: usize,
) -> Result<SizeSpec> {
    match optional_size_token(token, params, param_key, fill_supported, line)? {
        Some(size) => Ok(size),
        None => Err(DiagramError::invalid_element(
            "Is not a number, or 'fill': <missing>",
            line,
        )),
    }
}

/// Like [`size_token`] but a missing token is allowed.
fn optional_size_token(
    token: Option<&str>,
    params: &mut BTreeMap<String, Vec<String>>,
    param_key: &str,
    fill_supported: bool,
    line: usize,
) -> Result<Option<SizeSpec>> {
    let Some(token) = token else {
        return Ok(None);
    };
    let bare = extract_params(token, params, param_key);
    if bare == "fill" {
        if !fill_supported {
            return Err(DiagramError::unsupported_fill(line));
        }
        if let Some(adjust) = params.get(param_key) {
            for p in adjust {
                if p.parse::<f64>().is_err() {
                    return Err(DiagramError::invalid_element(
                        format!("Fill adjustment is not a number: {p}"),
                        line,
                    ));
                }
            }
        }
        return Ok(Some(SizeSpec::Fill));
    }
    let v = bare.parse::<f64>().map_err(|_| {
        DiagramError::invalid_element(format!("Is not a number, or 'fill': {token}"), line)
    })?;
    Ok(Some(SizeSpec::Abs(v)))
}

pub fn parse_circle(line: &NumberedLine, lines: &mut Lines, state: &SpecState) -> Result<Element> {
    let kc = parse_key_content(line, lines, 1, &state.variables)?;
    let mut params = BTreeMap::new();
    // A circle has no fill form; its radius fixes both dimensions.
    let r = size_token(
        kc.tokens[0].as_deref(),
        &mut params,
        PARAM_FILL_WIDTH,
        false,
        line.number,
    )?;
    let d = match r {
        SizeSpec::Abs(v) => SizeSpec::Abs(v * 2.0),
        SizeSpec::Fill => SizeSpec::Fill,
    };
    Ok(Element {
        key: kc.key,
        kind: ElementKind::Ellipse,
        width: Some(d),
        height: Some(d),
        params,
        line: line.number,
    })
}

pub fn parse_ellipse(line: &NumberedLine, lines: &mut Lines, state: &SpecState) -> Result<Element> {
    let kc = parse_key_content(line, lines, 2, &state.variables)?;
    let mut params = BTreeMap::new();
    let rx = size_token(
        kc.tokens[0].as_deref(),
        &mut params,
        PARAM_FILL_WIDTH,
        true,
        line.number,
    )?;
    let ry = size_token(
        kc.tokens[1].as_deref(),
        &mut params,
        PARAM_FILL_HEIGHT,
        true,
        line.number,
    )?;
    // Radii are declared, diameters are stored.
    let double = |s: SizeSpec| match s {
        SizeSpec::Abs(v) => SizeSpec::Abs(v * 2.0),
        SizeSpec::Fill => SizeSpec::Fill,
    };
    Ok(Element {
        key: kc.key,
        kind: ElementKind::Ellipse,
        width: Some(double(rx)),
        height: Some(double(ry)),
        params,
        line: line.number,
    })
}

pub fn parse_line(line: &NumberedLine, lines: &mut Lines, state: &SpecState) -> Result<Element> {
    let (width, height, kc, params) = parse_two_sizes(line, lines, state)?;
    Ok(Element {
        key: kc.key,
        kind: ElementKind::Line,
        width: Some(width),
        height: Some(height),
        params,
        line: line.number,
    })
}

pub fn parse_rect(line: &NumberedLine, lines: &mut Lines, state: &SpecState) -> Result<Element> {
    let (width, height, kc, params) = parse_two_sizes(line, lines, state)?;
    Ok(Element {
        key: kc.key,
        kind: ElementKind::Rect,
        width: Some(width),
        height: Some(height),
        params,
        line: line.number,
    })
}

fn parse_two_sizes(
    line: &NumberedLine,
    lines: &mut Lines,
    state: &SpecState,
) -> Result<(SizeSpec, SizeSpec, crate::parser::KeyContent, BTreeMap<String, Vec<String>>)> {
    let kc = parse_key_content(line, lines, 2, &state.variables)?;
    let mut params = BTreeMap::new();
    let width = size_token(
        kc.tokens[0].as_deref(),
        &mut params,
        PARAM_FILL_WIDTH,
        true,
        line.number,
    )?;
    let height = size_token(
        kc.tokens[1].as_deref(),
        &mut params,
        PARAM_FILL_HEIGHT,
        true,
        line.number,
    )?;
    Ok((width, height, kc, params))
}

pub fn parse_text(line: &NumberedLine, lines: &mut Lines, state: &SpecState) -> Result<Element> {
    let kc = parse_key_content(line, lines, 3, &state.variables)?;
    let mut params = BTreeMap::new();
    let mut content_lines = kc.content_lines.clone();

    let mut width = SizeSpec::Abs(state.settings.text_width);
    let mut height = SizeSpec::Abs(state.settings.text_height);
    // Leading `w h` tokens are sizes only if both look like one; otherwise
    // the whole value is text.
    let is_size = |t: &Option<String>| {
        t.as_deref()
            .map(|t| t == "fill" || t.parse::<f64>().is_ok())
            .unwrap_or(false)
    };
    if is_size(&kc.tokens[0]) && is_size(&kc.tokens[1]) {
        width = size_token(
            kc.tokens[0].as_deref(),
            &mut params,
            PARAM_FILL_WIDTH,
            true,
            line.number,
        )?;
        height = size_token(
            kc.tokens[1].as_deref(),
            &mut params,
            PARAM_FILL_HEIGHT,
            true,
            line.number,
        )?;
        if let Some(first) = content_lines.first_mut() {
            *first = strip_leading_words(first, 2);
        }
    }

    Ok(Element {
        key: kc.key,
        kind: ElementKind::Text {
            lines: content_lines,
        },
        width: Some(width),
        height: Some(height),
        params,
        line: line.number,
    })
}

fn strip_leading_words(text: &str, count: usize) -> String {
    let mut rest = text;
    for _ in 0..count {
        rest = rest.trim_start();
        rest = match rest.find(char::is_whitespace) {
            Some(i) => &rest[i..],
            None => "",
        };
    }
    rest.trim_start().to_string()
}

pub fn parse_polygon(line: &NumberedLine, lines: &mut Lines, state: &SpecState) -> Result<Element> {
    let kc = parse_key_content(line, lines, 0, &state.variables)?;

    let mut points = Vec::new();
    let mut max_x = 0.0f64;
    let mut max_y = 0.0f64;
    for coord in kc.content.split_whitespace() {
        let mut parts = coord.splitn(2, ',');
        let x = parts.next().and_then(|p| p.parse::<f64>().ok());
        let y = parts.next().and_then(|p| p.parse::<f64>().ok());
        let (Some(x), Some(y)) = (x, y) else {
            return Err(DiagramError::invalid_coordinate(coord, line.number));
        };
        points.push((x, y));
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    if points.is_empty() {
        return Err(DiagramError::invalid_coordinate(&kc.content, line.number));
    }

    Ok(Element {
        key: kc.key,
        kind: ElementKind::Polygon { points },
        width: Some(SizeSpec::Abs(max_x)),
        height: Some(SizeSpec::Abs(max_y)),
        params: BTreeMap::new(),
        line: line.number,
    })
}

pub fn parse_path(line: &NumberedLine, lines: &mut Lines, state: &SpecState) -> Result<Element> {
    let kc = parse_key_content(line, lines, 2, &state.variables)?;
    let mut params = BTreeMap::new();
    let width = size_token(
        kc.tokens[0].as_deref(),
        &mut params,
        PARAM_FILL_WIDTH,
        true,
        line.number,
    )?;
    let height = size_token(
        kc.tokens[1].as_deref(),
        &mut params,
        PARAM_FILL_HEIGHT,
        true,
        line.number,
    )?;
    Ok(Element {
        key: kc.key,
        kind: ElementKind::Path { data: kc.content },
        width: Some(width),
        height: Some(height),
        params,
        line: line.number,
    })
}

pub fn parse_image(line: &NumberedLine, lines: &mut Lines, state: &SpecState) -> Result<Element> {
    let kc = parse_key_content(line, lines, 3, &state.variables)?;
    let mut params = BTreeMap::new();
    let width = size_token(
        kc.tokens[0].as_deref(),
        &mut params,
        PARAM_FILL_WIDTH,
        true,
        line.number,
    )?;
    let height = size_token(
        kc.tokens[1].as_deref(),
        &mut params,
        PARAM_FILL_HEIGHT,
        true,
        line.number,
    )?;
    let url = kc.tokens[2].clone().ok_or_else(|| {
        DiagramError::invalid_element("Image requires a url after its sizes", line.number)
    })?;
    Ok(Element {
        key: kc.key,
        kind: ElementKind::Image { url },
        width: Some(width),
        height: Some(height),
        params,
        line: line.number,
    })
}

pub fn parse_shape(line: &NumberedLine, lines: &mut Lines, state: &SpecState) -> Result<Element> {
    let kc = parse_key_content(line, lines, 3, &state.variables)?;
    let mut params = BTreeMap::new();
    let shape = extract_params(
        kc.tokens[0].as_deref().ok_or_else(|| {
            DiagramError::invalid_element("Shape reference requires a shape name", line.number)
        })?,
        &mut params,
        PARAM_SHAPE_ARGS,
    );
    // Width and height may be omitted; the shape then takes its natural size.
    let width = optional_size_token(
        kc.tokens[1].as_deref(),
        &mut params,
        PARAM_FILL_WIDTH,
        true,
        line.number,
    )?;
    let height = optional_size_token(
        kc.tokens[2].as_deref(),
        &mut params,
        PARAM_FILL_HEIGHT,
        true,
        line.number,
    )?;
    Ok(Element {
        key: kc.key,
        kind: ElementKind::Shape { shape },
        width,
        height,
        params,
        line: line.number,
    })
}
