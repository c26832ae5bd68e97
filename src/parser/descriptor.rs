//! Parser for `*` layer descriptor lines
//!
//! A descriptor positions a layer against already-placed layers:
//!
//! ```text
//! *:2 at top-right of box with my left-middle plus 10,0
//! * from bottom of a to top of b on center point rotateTo:0 svg: opacity="0.5"
//! ```
//!
//! Inline directives (`svg:`, `rotateTo:`, `fillWidth:`, `fillHeight:`,
//! `mode:`) are peeled off first; the rest is lexed and parsed as an `at` or
//! `from ... to ...` location.

use std::collections::BTreeMap;

use logos::Logos;

use crate::error::{DiagramError, Result};
use crate::layout::types::{
    AnchorRef, AnchorUse, FillSource, FillTo, HAlign, LayerInfo, LayerLocation, PathMode,
    PathPoint, VAlign,
};
use crate::parser::var_rep;

/// Split a layout line's `*` or `*:<z>` prefix, returning the explicit
/// z-index (if any) and the rest of the line. None when the line is not a
/// descriptor.
pub fn split_layer_prefix(text: &str) -> Option<(Option<u32>, &str)> {
    let trimmed = text.trim_start();
    let rest = trimmed.strip_prefix('*')?;
    if let Some(after_colon) = rest.strip_prefix(':') {
        let digits: usize = after_colon
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if digits > 0 {
            if let Ok(z) = after_colon[..digits].parse::<u32>() {
                return Some((Some(z), &after_colon[digits..]));
            }
        }
    }
    Some((None, rest))
}

/// Parse everything after the `*` prefix of a layer descriptor.
pub fn parse_layer_info(
    text: &str,
    line: usize,
    variables: &BTreeMap<String, String>,
) -> Result<LayerInfo> {
    let mut text = text.to_string();

    // `svg:` swallows the rest of the line, so it must come off before the
    // other directives are searched for.
    let svg = take_svg(&mut text);

    let rotate_to = match take_directive(&mut text, "rotateTo") {
        Some(raw) => Some(parse_scalar(&raw, "rotateTo", variables, line)?),
        None => None,
    };

    let fill_width = match take_directive(&mut text, "fillWidth") {
        Some(raw) => Some(parse_fill_source(&raw, Axis::Width, variables, line)?),
        None => None,
    };
    let fill_height = match take_directive(&mut text, "fillHeight") {
        Some(raw) => Some(parse_fill_source(&raw, Axis::Height, variables, line)?),
        None => None,
    };

    let mode = match take_directive(&mut text, "mode") {
        Some(raw) => match raw.as_str() {
            "path" => PathMode::Path,
            "box" => PathMode::Box,
            other => {
                return Err(DiagramError::invalid_fill_directive(
                    format!("Invalid mode: {other}"),
                    line,
                ))
            }
        },
        None => PathMode::Path,
    };

    // A box keeps the layer axis-aligned; only then does the path have a
    // meaningful vertical extent to fill to.
    if fill_height == Some(FillSource::Path) && mode != PathMode::Box {
        return Err(DiagramError::invalid_fill_directive(
            "fillHeight:$path requires mode:box",
            line,
        ));
    }

    let location_text = var_rep(text.trim(), variables);
    let location = if location_text.is_empty() {
        None
    } else {
        Some(parse_location(&location_text, mode, line)?)
    };

    Ok(LayerInfo {
        location,
        fill: FillTo {
            width: fill_width,
            height: fill_height,
        },
        rotate_to,
        svg,
        line,
    })
}

fn take_svg(text: &mut String) -> Option<String> {
    let i = find_directive(text, "svg")?;
    let value = text[i + "svg:".len()..].trim().to_string();
    text.truncate(i);
    Some(value)
}

/// Remove `name:<value>` from the text and return the value. The directive
/// must sit at the start of the text or after a space.
fn take_directive(text: &mut String, name: &str) -> Option<String> {
    let i = find_directive(text, name)?;
    let after = i + name.len() + 1;
    let skipped = text[after..].len() - text[after..].trim_start().len();
    let vstart = after + skipped;
    let vend = text[vstart..]
        .find(char::is_whitespace)
        .map(|off| vstart + off)
        .unwrap_or(text.len());
    let value = text[vstart..vend].to_string();
    text.replace_range(i..vend, "");
    Some(value)
}

fn find_directive(text: &str, name: &str) -> Option<usize> {
    let pat = format!("{name}:");
    let mut from = 0;
    while let Some(off) = text[from..].find(&pat) {
        let i = from + off;
        if i == 0 || text.as_bytes()[i - 1] == b' ' {
            return Some(i);
        }
        from = i + pat.len();
    }
    None
}

fn parse_scalar(
    raw: &str,
    what: &str,
    variables: &BTreeMap<String, String>,
    line: usize,
) -> Result<f64> {
    let resolved = var_rep(raw, variables);
    resolved.parse::<f64>().map_err(|_| {
        DiagramError::invalid_spec(format!("{what} is not a number: {raw}"), line)
    })
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    Width,
    Height,
}

fn parse_fill_source(
    raw: &str,
    axis: Axis,
    variables: &BTreeMap<String, String>,
    line: usize,
) -> Result<FillSource> {
    if let Ok(v) = raw.parse::<f64>() {
        return Ok(FillSource::Abs(v));
    }
    match (raw, axis) {
        ("$width", Axis::Width) | ("$height", Axis::Height) => return Ok(FillSource::DefaultLayer),
        ("$colspan", Axis::Width) | ("$rowspan", Axis::Height) => return Ok(FillSource::Span),
        ("$path", _) => return Ok(FillSource::Path),
        _ => {}
    }
    if let Some(rest) = raw.strip_prefix("$l:") {
        let suffix = match axis {
            Axis::Width => ":width",
            Axis::Height => ":height",
        };
        if let Some(z_text) = rest.strip_suffix(suffix) {
            if let Ok(z) = z_text.parse::<u32>() {
                return Ok(FillSource::Layer(z));
            }
        }
    }
    if let Some(name) = raw.strip_prefix('$') {
        if let Some(value) = variables.get(name) {
            if let Ok(v) = value.parse::<f64>() {
                return Ok(FillSource::Abs(v));
            }
        }
    }
    let what = match axis {
        Axis::Width => "fillWidth",
        Axis::Height => "fillHeight",
    };
    Err(DiagramError::invalid_fill_directive(
        format!("Invalid {what} directive: {raw}"),
        line,
    ))
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t]+")]
enum Tok<'a> {
    #[token("at")]
    At,
    #[token("from")]
    From,
    #[token("to")]
    To,
    #[token("on")]
    On,
    #[token("point")]
    Point,
    #[token("plus")]
    Plus,
    #[token("with")]
    With,
    #[token("my")]
    My,
    #[token("of")]
    Of,
    #[regex(r"[^ \t]+", priority = 1)]
    Word(&'a str),
}

fn parse_location(text: &str, mode: PathMode, line: usize) -> Result<LayerLocation> {
    let mut toks = Vec::new();
    for tok in Tok::lexer(text) {
        match tok {
            Ok(t) => toks.push(t),
            Err(()) => return Err(DiagramError::invalid_layer_definition(line)),
        }
    }
    let mut p = Parser {
        toks,
        pos: 0,
        line,
    };
    let location = match p.peek() {
        Some(Tok::At) => p.parse_at()?,
        Some(Tok::From) => p.parse_from_to(mode)?,
        _ => return Err(DiagramError::invalid_layer_definition(line)),
    };
    if p.peek().is_some() {
        return Err(DiagramError::invalid_layer_definition(line));
    }
    Ok(location)
}

struct Parser<'a> {
    toks: Vec<Tok<'a>>,
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Tok<'a>> {
        self.toks.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<Tok<'a>> {
        self.toks.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<Tok<'a>> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, tok: Tok<'a>) -> Result<()> {
        if self.bump() == Some(tok) {
            Ok(())
        } else {
            Err(DiagramError::invalid_layer_definition(self.line))
        }
    }

    fn expect_word(&mut self) -> Result<&'a str> {
        match self.bump() {
            Some(Tok::Word(w)) => Ok(w),
            _ => Err(DiagramError::invalid_layer_definition(self.line)),
        }
    }

    /// `[<aligns> of]` before an anchor name.
    fn parse_anchor_aligns(&mut self) -> Result<(HAlign, VAlign)> {
        if let (Some(Tok::Word(w)), Some(Tok::Of)) = (self.peek(), self.peek2()) {
            self.bump();
            self.bump();
            Ok(parse_aligns(w))
        } else {
            Ok((HAlign::Center, VAlign::Middle))
        }
    }

    /// `with my <aligns>`.
    fn parse_my_aligns(&mut self) -> Result<Option<(HAlign, VAlign)>> {
        if self.peek() == Some(Tok::With) {
            self.bump();
            self.expect(Tok::My)?;
            let w = self.expect_word()?;
            Ok(Some(parse_aligns(w)))
        } else {
            Ok(None)
        }
    }

    /// `plus <x>,<y>`.
    fn parse_plus(&mut self) -> Result<(f64, f64)> {
        if self.peek() == Some(Tok::Plus) {
            self.bump();
            let w = self.expect_word()?;
            parse_coord_pair(w, self.line)
        } else {
            Ok((0.0, 0.0))
        }
    }

    fn parse_anchor_use(&mut self) -> Result<AnchorUse> {
        let (h_align, v_align) = self.parse_anchor_aligns()?;
        let word = self.expect_word()?;
        let anchor = parse_anchor_ref(word, self.line)?;
        Ok(AnchorUse {
            anchor,
            h_align,
            v_align,
            offset: (0.0, 0.0),
        })
    }

    fn parse_at(&mut self) -> Result<LayerLocation> {
        self.expect(Tok::At)?;
        let at = self.parse_anchor_use()?;
        let my = self.parse_my_aligns()?;
        let offset = self.parse_plus()?;
        let (h_align, v_align) = my.unwrap_or((HAlign::Center, VAlign::Middle));
        Ok(LayerLocation::At {
            at,
            h_align,
            v_align,
            offset,
        })
    }

    fn parse_from_to(&mut self, mode: PathMode) -> Result<LayerLocation> {
        self.expect(Tok::From)?;
        let mut from = self.parse_anchor_use()?;
        from.offset = self.parse_plus()?;

        self.expect(Tok::To)?;
        let mut to = self.parse_anchor_use()?;
        to.offset = self.parse_plus()?;

        let mut path_point = PathPoint::Start;
        let mut point_offset = (0.0, 0.0);
        if self.peek() == Some(Tok::On) {
            self.bump();
            path_point = match self.expect_word()? {
                "start" => PathPoint::Start,
                "center" => PathPoint::Center,
                "end" => PathPoint::End,
                _ => return Err(DiagramError::invalid_layer_definition(self.line)),
            };
            self.expect(Tok::Point)?;
            point_offset = self.parse_plus()?;
        }

        let my = self.parse_my_aligns()?;
        let offset = self.parse_plus()?;
        let (h_align, v_align) = my.unwrap_or((HAlign::Center, VAlign::Middle));

        Ok(LayerLocation::Path {
            mode,
            from,
            to,
            path_point,
            point_offset,
            h_align,
            v_align,
            offset,
        })
    }
}

/// Dash-joined alignment words; unknown words fall back to center/middle.
fn parse_aligns(word: &str) -> (HAlign, VAlign) {
    let words: Vec<&str> = word.split('-').collect();
    (HAlign::from_words(&words), VAlign::from_words(&words))
}

fn parse_coord_pair(raw: &str, line: usize) -> Result<(f64, f64)> {
    let mut parts = raw.splitn(2, ',');
    let x = parts.next().and_then(|p| p.parse::<f64>().ok());
    let y = parts.next().and_then(|p| p.parse::<f64>().ok());
    match (x, y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(DiagramError::invalid_coordinate(raw, line)),
    }
}

/// Parse `[l:<z>:]key[[index]][:next...]`. The file index is 1-based; the
/// stored index is 0-based.
pub fn parse_anchor_ref(word: &str, line: usize) -> Result<AnchorRef> {
    let (layer_z, rest) = match word.strip_prefix("l:") {
        Some(rest) => {
            let colon = rest
                .find(':')
                .ok_or_else(|| DiagramError::invalid_layer_definition(line))?;
            let z = rest[..colon]
                .parse::<u32>()
                .map_err(|_| DiagramError::invalid_layer_definition(line))?;
            (Some(z), &rest[colon + 1..])
        }
        None => (None, word),
    };

    let (head, next) = match rest.find(':') {
        Some(colon) => {
            let mut inner = parse_anchor_ref(&rest[colon + 1..], line)?;
            inner.layer_z = None;
            (&rest[..colon], Some(Box::new(inner)))
        }
        None => (rest, None),
    };

    let (key, index) = match (head.find('['), head.ends_with(']')) {
        (Some(open), true) => {
            let n = head[open + 1..head.len() - 1]
                .parse::<usize>()
                .map_err(|_| DiagramError::invalid_layer_definition(line))?;
            if n == 0 {
                return Err(DiagramError::invalid_layer_definition(line));
            }
            (head[..open].to_string(), n - 1)
        }
        (None, false) => (head.to_string(), 0),
        _ => return Err(DiagramError::invalid_layer_definition(line)),
    };
    if key.is_empty() {
        return Err(DiagramError::invalid_layer_definition(line));
    }

    Ok(AnchorRef {
        layer_z,
        key,
        index,
        next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagramErrorKind;
    use pretty_assertions::assert_eq;

    fn no_vars() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn parse(text: &str) -> Result<LayerInfo> {
        parse_layer_info(text, 10, &no_vars())
    }

    #[test]
    fn test_split_layer_prefix() {
        assert_eq!(split_layer_prefix(" * at b"), Some((None, " at b")));
        assert_eq!(split_layer_prefix("*:3 at b"), Some((Some(3), " at b")));
        assert_eq!(split_layer_prefix(" c"), None);
    }

    #[test]
    fn test_at_minimal() {
        let info = parse(" at b").unwrap();
        match info.location.unwrap() {
            LayerLocation::At {
                at,
                h_align,
                v_align,
                offset,
            } => {
                assert_eq!(at.anchor, AnchorRef::new("b"));
                assert_eq!(at.h_align, HAlign::Center);
                assert_eq!(at.v_align, VAlign::Middle);
                assert_eq!(h_align, HAlign::Center);
                assert_eq!(v_align, VAlign::Middle);
                assert_eq!(offset, (0.0, 0.0));
            }
            other => panic!("expected at location, got {other:?}"),
        }
    }

    #[test]
    fn test_at_full() {
        let info = parse(" at top-right of b[2] with my left-bottom plus 10,-5").unwrap();
        match info.location.unwrap() {
            LayerLocation::At {
                at,
                h_align,
                v_align,
                offset,
            } => {
                assert_eq!(at.anchor.key, "b");
                assert_eq!(at.anchor.index, 1);
                assert_eq!(at.h_align, HAlign::Right);
                assert_eq!(at.v_align, VAlign::Top);
                assert_eq!(h_align, HAlign::Left);
                assert_eq!(v_align, VAlign::Bottom);
                assert_eq!(offset, (10.0, -5.0));
            }
            other => panic!("expected at location, got {other:?}"),
        }
    }

    #[test]
    fn test_from_to_with_point() {
        let info = parse(" from bottom of a to top of b on center point plus 0,2").unwrap();
        match info.location.unwrap() {
            LayerLocation::Path {
                mode,
                from,
                to,
                path_point,
                point_offset,
                ..
            } => {
                assert_eq!(mode, PathMode::Path);
                assert_eq!(from.anchor.key, "a");
                assert_eq!(from.v_align, VAlign::Bottom);
                assert_eq!(to.anchor.key, "b");
                assert_eq!(to.v_align, VAlign::Top);
                assert_eq!(path_point, PathPoint::Center);
                assert_eq!(point_offset, (0.0, 2.0));
            }
            other => panic!("expected path location, got {other:?}"),
        }
    }

    #[test]
    fn test_directives_stripped_from_location() {
        let info =
            parse(" from a to b mode:box fillWidth:$path fillHeight:40 rotateTo:90").unwrap();
        assert_eq!(info.fill.width, Some(FillSource::Path));
        assert_eq!(info.fill.height, Some(FillSource::Abs(40.0)));
        assert_eq!(info.rotate_to, Some(90.0));
        match info.location.unwrap() {
            LayerLocation::Path { mode, .. } => assert_eq!(mode, PathMode::Box),
            other => panic!("expected path location, got {other:?}"),
        }
    }

    #[test]
    fn test_svg_takes_rest_of_line() {
        let info = parse(" at b svg: opacity=\"0.5\" fillWidth:ignored").unwrap();
        assert_eq!(info.svg.as_deref(), Some("opacity=\"0.5\" fillWidth:ignored"));
        assert_eq!(info.fill.width, None);
    }

    #[test]
    fn test_fill_height_path_requires_box_mode() {
        let err = parse(" from a to b fillHeight:$path").unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::InvalidFillDirective);
    }

    #[test]
    fn test_invalid_fill_directive() {
        let err = parse(" at b fillWidth:$rowspan").unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::InvalidFillDirective);
    }

    #[test]
    fn test_fill_layer_reference() {
        let info = parse(" at b fillWidth:$l:2:width fillHeight:$height").unwrap();
        assert_eq!(info.fill.width, Some(FillSource::Layer(2)));
        assert_eq!(info.fill.height, Some(FillSource::DefaultLayer));
    }

    #[test]
    fn test_empty_descriptor_has_no_location() {
        let info = parse("   ").unwrap();
        assert!(info.location.is_none());
    }

    #[test]
    fn test_garbage_location_is_invalid() {
        let err = parse(" near b").unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::InvalidLayerDefinition);
    }

    #[test]
    fn test_invalid_offset_component() {
        let err = parse(" at b plus x,2").unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::InvalidCoordinate);
    }

    #[test]
    fn test_anchor_ref_chain() {
        let a = parse_anchor_ref("l:2:outer[3]:inner", 1).unwrap();
        assert_eq!(a.layer_z, Some(2));
        assert_eq!(a.key, "outer");
        assert_eq!(a.index, 2);
        let next = a.next.unwrap();
        assert_eq!(next.key, "inner");
        assert_eq!(next.index, 0);
    }

    #[test]
    fn test_variable_offset() {
        let mut vars = BTreeMap::new();
        vars.insert("gap".to_string(), "15".to_string());
        let info = parse_layer_info(" at b plus $gap,0", 1, &vars).unwrap();
        match info.location.unwrap() {
            LayerLocation::At { offset, .. } => assert_eq!(offset, (15.0, 0.0)),
            other => panic!("expected at location, got {other:?}"),
        }
    }
}
