//! The spec section: named elements, styles, settings, and shape definitions
//!
//! The spec is a sequence of sections. A non-indented `name:` line selects a
//! section parser (built-in sections plus one per registered element type),
//! which is then applied to every indented line until the next header:
//!
//! ```text
//! rect:
//!   box: 100 50
//! style:
//!   box: fill: #eee
//! layout:
//! ...
//! ```

use std::collections::BTreeMap;

use crate::error::{DiagramError, Result};
use crate::input::{sections, Lines, NumberedLine};
use crate::layout::config::{Margin, Settings};
use crate::layout::types::{GridAlign, HAlign, VAlign};
use crate::parser::elements::{Element, ElementKind, ElementParserFn};
use crate::parser::registry::Registry;
use crate::parser::{parse_key_content, split_outside_parens};

/// A style rule for one element key. `plus` holds declarations added by a
/// `':` continuation line, emitted as a second rule for the same class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    /// CSS class name; the element key when it is a valid class, a hashed
    /// name otherwise.
    pub name: String,
    pub val: Option<String>,
    pub plus: Option<String>,
}

/// A font made available to text elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub name: String,
    pub url: String,
}

/// A reusable shape defined in a `shape:` block. Shapes with their own spec
/// carry a nested state; layout-only shapes borrow the outer one.
#[derive(Debug, Clone)]
pub struct ShapeDef {
    pub name: String,
    pub param_names: Vec<String>,
    pub state: Option<Box<SpecState>>,
    pub layout: Lines,
    pub line: usize,
}

/// Everything the spec section declares.
#[derive(Debug, Clone, Default)]
pub struct SpecState {
    pub elements: BTreeMap<String, Element>,
    pub styles: BTreeMap<String, Style>,
    /// Per element type tag, applied before any class styles.
    pub default_styles: BTreeMap<String, String>,
    pub margin: Margin,
    pub settings: Settings,
    /// Per-element grid alignment overrides.
    pub grid_align: BTreeMap<String, GridAlign>,
    pub variables: BTreeMap<String, String>,
    pub fonts: Vec<Font>,
    /// Raw SVG attributes appended to an element's rendered tag.
    pub svg_attrs: BTreeMap<String, String>,
    pub shapes: BTreeMap<String, ShapeDef>,
    pub debug_grid: bool,
    last_style_key: Option<String>,
    last_grid_align: Option<GridAlign>,
}

/// The active section parser.
#[derive(Clone, Copy)]
pub enum SpecParser {
    Style,
    DefaultStyle,
    Margin,
    Settings,
    Variable,
    Font,
    Svg,
    Debug,
    GridAlign,
    Element(ElementParserFn),
}

fn select_parser(name: &str, registry: &Registry) -> Option<SpecParser> {
    match name {
        "style" => Some(SpecParser::Style),
        "default-style" => Some(SpecParser::DefaultStyle),
        "margin" => Some(SpecParser::Margin),
        "settings" => Some(SpecParser::Settings),
        "variable" => Some(SpecParser::Variable),
        "font" => Some(SpecParser::Font),
        "svg" => Some(SpecParser::Svg),
        "debug" => Some(SpecParser::Debug),
        "grid-align" => Some(SpecParser::GridAlign),
        other => registry.parser(other).map(SpecParser::Element),
    }
}

/// Parse a spec section into a [`SpecState`] and run the spec-parsed
/// listeners. `settings` and `margin` seed the state so profile overrides
/// and outer-shape settings flow through.
pub fn parse_spec(
    lines: &mut Lines,
    registry: &Registry,
    settings: Settings,
    margin: Margin,
) -> Result<SpecState> {
    let mut state = SpecState {
        settings,
        margin,
        ..SpecState::default()
    };

    let mut current: Option<SpecParser> = None;
    while let Some(line) = lines.pop() {
        if line.text.trim().is_empty() {
            continue;
        }
        if !line.text.starts_with(|c: char| c.is_whitespace()) {
            let name = header_name(&line)?;
            current = Some(
                select_parser(&name, registry)
                    .ok_or_else(|| DiagramError::unknown_directive(&name, line.number))?,
            );
            continue;
        }
        let Some(parser) = current else {
            return Err(DiagramError::invalid_spec(
                format!("Line belongs to no section: {}", line.text.trim()),
                line.number,
            ));
        };
        apply_parser(parser, &line, lines, &mut state)?;
    }

    validate_elements(&state, registry)?;
    registry.notify_spec_parsed(&mut state);
    Ok(state)
}

fn header_name(line: &NumberedLine) -> Result<String> {
    match line.text.find(':') {
        Some(i) if i > 0 => Ok(line.text[..i].to_string()),
        _ => Err(DiagramError::invalid_spec(
            format!("Expected a 'name:' section header: {}", line.text),
            line.number,
        )),
    }
}

fn apply_parser(
    parser: SpecParser,
    line: &NumberedLine,
    lines: &mut Lines,
    state: &mut SpecState,
) -> Result<()> {
    match parser {
        SpecParser::Style => parse_style_line(line, lines, state),
        SpecParser::DefaultStyle => {
            let kc = parse_key_content(line, lines, 0, &state.variables)?;
            state.default_styles.insert(kc.key, kc.content);
            Ok(())
        }
        SpecParser::Margin => {
            let kc = parse_key_content(line, lines, 1, &state.variables)?;
            let value = kc.tokens[0].clone().unwrap_or_default();
            state.margin.set(&kc.key, &value, line.number)
        }
        SpecParser::Settings => {
            let kc = parse_key_content(line, lines, 1, &state.variables)?;
            let value = kc.tokens[0].clone().unwrap_or_default();
            state.settings.set(&kc.key, &value, line.number)
        }
        SpecParser::Variable => {
            let kc = parse_key_content(line, lines, 0, &state.variables)?;
            state.variables.insert(kc.key, kc.content);
            Ok(())
        }
        SpecParser::Font => {
            let kc = parse_key_content(line, lines, 0, &state.variables)?;
            if kc.content.is_empty() {
                return Err(DiagramError::invalid_spec(
                    "Font requires a url",
                    line.number,
                ));
            }
            // `import` keeps the whole value; it may list several urls.
            state.fonts.push(Font {
                name: kc.key,
                url: kc.content,
            });
            Ok(())
        }
        SpecParser::Svg => {
            let kc = parse_key_content(line, lines, 0, &state.variables)?;
            state.svg_attrs.insert(kc.key, kc.content);
            Ok(())
        }
        SpecParser::Debug => {
            let kc = parse_key_content(line, lines, 1, &state.variables)?;
            match kc.key.as_str() {
                "grid" => {
                    state.debug_grid = kc.tokens[0].as_deref() != Some("false");
                    Ok(())
                }
                other => Err(DiagramError::invalid_spec(
                    format!("Unknown debug option: {other}"),
                    line.number,
                )),
            }
        }
        SpecParser::GridAlign => parse_grid_align_line(line, lines, state),
        SpecParser::Element(f) => {
            let element = f(line, lines, state)?;
            state.elements.insert(element.key.clone(), element);
            Ok(())
        }
    }
}

fn parse_style_line(line: &NumberedLine, lines: &mut Lines, state: &mut SpecState) -> Result<()> {
    let kc = parse_key_content(line, lines, 0, &state.variables)?;
    if kc.key == "'" {
        let last = state.last_style_key.clone().ok_or_else(|| {
            DiagramError::invalid_spec("' must follow a style line", line.number)
        })?;
        if let Some(style) = state.styles.get_mut(&last) {
            style.plus = Some(kc.content);
        }
        return Ok(());
    }
    state.styles.insert(
        kc.key.clone(),
        Style {
            name: css_class_name(&kc.key),
            val: Some(kc.content),
            plus: None,
        },
    );
    state.last_style_key = Some(kc.key);
    Ok(())
}

fn parse_grid_align_line(
    line: &NumberedLine,
    lines: &mut Lines,
    state: &mut SpecState,
) -> Result<()> {
    let kc = parse_key_content(line, lines, 2, &state.variables)?;
    let words: Vec<&str> = kc
        .tokens
        .iter()
        .filter_map(|t| t.as_deref())
        .collect();
    let align = if words == ["'"] {
        state.last_grid_align.ok_or_else(|| {
            DiagramError::invalid_spec("' must follow a grid-align line", line.number)
        })?
    } else {
        GridAlign {
            horizontal: HAlign::from_words(&words),
            vertical: VAlign::from_words(&words),
        }
    };
    state.grid_align.insert(kc.key, align);
    state.last_grid_align = Some(align);
    Ok(())
}

fn validate_elements(state: &SpecState, registry: &Registry) -> Result<()> {
    for element in state.elements.values() {
        let tag = element.kind.tag();
        if registry.renderer(tag).is_none() {
            return Err(DiagramError::unknown_directive(tag, element.line));
        }
        if !matches!(element.kind, ElementKind::Shape { .. })
            && (element.width.is_none() || element.height.is_none())
        {
            return Err(DiagramError::invalid_element(
                format!("Element '{}' must have a width and height", element.key),
                element.line,
            ));
        }
    }
    Ok(())
}

/// Parse one `shape:` block. The header names the shape and its parameters,
/// `arrow(len dir)`. A block containing `name:` lines carries its own spec
/// and must also contain a `layout:` marker.
pub fn parse_shape(
    mut block: Lines,
    registry: &Registry,
    outer_settings: &Settings,
) -> Result<ShapeDef> {
    let header = block.pop().ok_or_else(|| {
        DiagramError::invalid_spec("Empty shape block", 0)
    })?;
    let (name, param_names) = parse_shape_header(&header)?;

    let has_spec = block
        .remaining()
        .iter()
        .any(|l| is_section_header(&l.text));

    if has_spec {
        if block.peek().map(|l| l.text.trim().is_empty()) == Some(true) {
            block.pop();
        }
        let rest: Vec<NumberedLine> = block.remaining().to_vec();
        let (mut spec_lines, layout) = sections::split_spec_layout(rest, header.number)?;
        let state = parse_spec(
            &mut spec_lines,
            registry,
            outer_settings.clone(),
            Margin::default(),
        )?;
        Ok(ShapeDef {
            name,
            param_names,
            state: Some(Box::new(state)),
            layout,
            line: header.number,
        })
    } else {
        // Replays of the layout must restart after the header line.
        block.lock_reset();
        Ok(ShapeDef {
            name,
            param_names,
            state: None,
            layout: block,
            line: header.number,
        })
    }
}

fn is_section_header(text: &str) -> bool {
    if text.starts_with(|c: char| c.is_whitespace()) || text.is_empty() {
        return false;
    }
    match text.find(':') {
        Some(i) => text[..i].chars().all(|c| !c.is_whitespace()) && i > 0,
        None => false,
    }
}

fn parse_shape_header(header: &NumberedLine) -> Result<(String, Vec<String>)> {
    let text = header.text.trim();
    if text.is_empty() {
        return Err(DiagramError::invalid_spec(
            "Shape requires a name",
            header.number,
        ));
    }
    let Some(open) = text.find('(') else {
        return Ok((text.to_string(), Vec::new()));
    };
    let close = text.rfind(')').ok_or_else(|| {
        DiagramError::invalid_spec(format!("Unclosed parameter list: {text}"), header.number)
    })?;
    let name = text[..open].trim().to_string();
    let params = text[open + 1..close]
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect();
    Ok((name, params))
}

/// Build the variable map for one shape instantiation, mapping parameter
/// names to the supplied arguments.
pub fn shape_arg_variables(def: &ShapeDef, args: &[String]) -> BTreeMap<String, String> {
    def.param_names
        .iter()
        .zip(args.iter())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Spec-parsed listener: seed text styles with `text-anchor` and
/// `dominant-baseline` matching the grid alignment, globally and per
/// element.
pub fn apply_text_alignment_styles(state: &mut SpecState) {
    let default_h = state.settings.grid_align;
    let default_v = state.settings.grid_valign;

    let prev = state.default_styles.remove("text").unwrap_or_default();
    let with_anchor = format!("text-anchor: {}; {prev}", text_anchor(default_h));
    let with_baseline = format!(
        "dominant-baseline: {}; {with_anchor}",
        baseline(default_v)
    );
    state
        .default_styles
        .insert("text".to_string(), with_baseline.trim().to_string());

    let aligned: Vec<(String, GridAlign)> = state
        .grid_align
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    for (key, align) in aligned {
        let is_text = matches!(
            state.elements.get(&key).map(|e| &e.kind),
            Some(ElementKind::Text { .. })
        );
        if is_text {
            set_text_style(state, &key, align, default_h, default_v);
        }
    }
}

fn text_anchor(h: HAlign) -> &'static str {
    match h {
        HAlign::Left => "start",
        HAlign::Right => "end",
        HAlign::Center => "middle",
    }
}

fn baseline(v: VAlign) -> &'static str {
    match v {
        VAlign::Top => "hanging",
        VAlign::Bottom => "alphabetic",
        VAlign::Middle => "middle",
    }
}

fn set_text_style(
    state: &mut SpecState,
    key: &str,
    align: GridAlign,
    default_h: HAlign,
    default_v: VAlign,
) {
    let existing = state.styles.get(key).cloned();

    let mut style_data = match &existing {
        Some(style) => match (&style.val, &style.plus) {
            (Some(val), _) => format!(" {val}"),
            (None, Some(plus)) => format!(" {plus}"),
            (None, None) => String::new(),
        },
        None => String::new(),
    };

    if align.vertical != default_v {
        style_data = format!("dominant-baseline: {};{style_data}", baseline(align.vertical));
    }
    if align.horizontal != default_h {
        style_data = format!("text-anchor: {}; {style_data}", text_anchor(align.horizontal));
    }
    let style_data = style_data.trim().to_string();

    match existing {
        None => {
            state.styles.insert(
                key.to_string(),
                Style {
                    name: css_class_name(key),
                    val: Some(style_data),
                    plus: None,
                },
            );
        }
        Some(style) => {
            let updated = if style.val.is_none() {
                Style {
                    plus: Some(style_data),
                    ..style
                }
            } else {
                Style {
                    val: Some(style_data),
                    ..style
                }
            };
            state.styles.insert(key.to_string(), updated);
        }
    }
}

/// Element keys double as CSS class names when they are valid ones;
/// anything else gets a stable generated name.
pub fn css_class_name(key: &str) -> String {
    if is_valid_css_class(key) {
        key.to_string()
    } else {
        format!("-grid-diagram-{}", hash_code(key))
    }
}

fn is_valid_css_class(key: &str) -> bool {
    let rest = key.strip_prefix('-').unwrap_or(key);
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '-' || c.is_ascii_alphanumeric())
}

fn hash_code(text: &str) -> i32 {
    let mut h: i32 = 0;
    for c in text.chars() {
        h = h.wrapping_mul(31).wrapping_add(c as i32);
    }
    h
}

/// Parse the arguments of a `shape` element reference, splitting the
/// captured parameter list and substituting outer variables.
pub fn resolve_shape_args(raw: &[String], variables: &BTreeMap<String, String>) -> Vec<String> {
    raw.iter()
        .flat_map(|arg| {
            split_outside_parens(arg)
                .into_iter()
                .map(|a| crate::parser::var_rep(&a, variables))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagramErrorKind;
    use crate::parser::elements::SizeSpec;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Result<SpecState> {
        let mut lines = Lines::from_text(src, 1);
        parse_spec(
            &mut lines,
            &Registry::with_builtins(),
            Settings::default(),
            Margin::default(),
        )
    }

    #[test]
    fn test_elements_and_settings() {
        let state = parse(
            "settings:\n  horizontal-spacer: 10\nrect:\n  b: 100 50\ncircle:\n  c: 20\n",
        )
        .unwrap();
        assert_eq!(state.settings.horizontal_spacer, 10.0);
        assert_eq!(state.elements.len(), 2);
        assert_eq!(
            state.elements.get("b").unwrap().width,
            Some(SizeSpec::Abs(100.0))
        );
    }

    #[test]
    fn test_unknown_section() {
        let err = parse("wiggle:\n  b: 1 1\n").unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::UnknownDirective);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_variables_substitute_into_elements() {
        let state = parse("variable:\n  size: 80\nrect:\n  b: $size $size\n").unwrap();
        assert_eq!(
            state.elements.get("b").unwrap().width,
            Some(SizeSpec::Abs(80.0))
        );
    }

    #[test]
    fn test_style_continuation() {
        let state =
            parse("rect:\n  b: 10 10\nstyle:\n  b: fill: red\n  ': stroke: blue\n").unwrap();
        let style = state.styles.get("b").unwrap();
        assert_eq!(style.val.as_deref(), Some("fill: red"));
        assert_eq!(style.plus.as_deref(), Some("stroke: blue"));
    }

    #[test]
    fn test_invalid_css_class_is_hashed() {
        let state = parse("rect:\n  1up: 10 10\nstyle:\n  1up: fill: red\n").unwrap();
        let style = state.styles.get("1up").unwrap();
        assert!(style.name.starts_with("-grid-diagram-"));
    }

    #[test]
    fn test_text_defaults_get_alignment_styles() {
        let state = parse("text:\n  t: hello\n").unwrap();
        let text_style = state.default_styles.get("text").unwrap();
        assert!(text_style.contains("text-anchor: middle"));
        assert!(text_style.contains("dominant-baseline: middle"));
    }

    #[test]
    fn test_grid_align_sets_text_style() {
        let state = parse("text:\n  t: hello\ngrid-align:\n  t: left top\n").unwrap();
        let align = state.grid_align.get("t").unwrap();
        assert_eq!(align.horizontal, HAlign::Left);
        assert_eq!(align.vertical, VAlign::Top);
        let style = state.styles.get("t").unwrap();
        assert!(style.val.as_deref().unwrap().contains("text-anchor: start"));
        assert!(style
            .val
            .as_deref()
            .unwrap()
            .contains("dominant-baseline: hanging"));
    }

    #[test]
    fn test_empty_text_gets_default_sizes() {
        let state = parse("text:\n  t:\n").unwrap();
        let t = state.elements.get("t").unwrap();
        assert_eq!(t.width, Some(SizeSpec::Abs(5.0)));
        assert_eq!(t.height, Some(SizeSpec::Abs(30.0)));
    }

    #[test]
    fn test_margin_section() {
        let state = parse("margin:\n  left: 10\n  top: 5\n").unwrap();
        assert_eq!(state.margin.left, 10.0);
        assert_eq!(state.margin.top, 5.0);
    }

    #[test]
    fn test_debug_grid() {
        let state = parse("debug:\n  grid: true\n").unwrap();
        assert!(state.debug_grid);
    }

    #[test]
    fn test_shape_header_params() {
        let header = NumberedLine::new(3, "arrow(len, dir)");
        let (name, params) = parse_shape_header(&header).unwrap();
        assert_eq!(name, "arrow");
        assert_eq!(params, vec!["len", "dir"]);
    }

    #[test]
    fn test_parse_shape_layout_only() {
        let block = Lines::from_text("arrow(len)\n\n a---\n", 5);
        let def = parse_shape(block, &Registry::with_builtins(), &Settings::default()).unwrap();
        assert_eq!(def.name, "arrow");
        assert!(def.state.is_none());
        assert_eq!(def.layout.remaining().len(), 2);
    }

    #[test]
    fn test_parse_shape_with_own_spec() {
        let block = Lines::from_text("box2\nrect:\n  b: 10 10\nlayout:\n\n b\n", 5);
        let def = parse_shape(block, &Registry::with_builtins(), &Settings::default()).unwrap();
        let state = def.state.unwrap();
        assert!(state.elements.contains_key("b"));
        assert_eq!(def.layout.remaining().len(), 2);
    }

    #[test]
    fn test_shape_arg_variables() {
        let def = ShapeDef {
            name: "arrow".to_string(),
            param_names: vec!["len".to_string(), "dir".to_string()],
            state: None,
            layout: Lines::from_lines(Vec::new()),
            line: 1,
        };
        let vars = shape_arg_variables(&def, &["12".to_string(), "down".to_string()]);
        assert_eq!(vars.get("len").map(String::as_str), Some("12"));
        assert_eq!(vars.get("dir").map(String::as_str), Some("down"));
    }

    #[test]
    fn test_hash_code_stable() {
        assert_eq!(hash_code("abc"), hash_code("abc"));
        assert_ne!(hash_code("abc"), hash_code("abd"));
    }
}
