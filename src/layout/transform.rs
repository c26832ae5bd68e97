//! Transform chains attached to layers and shape cells
//!
//! Transforms are stored in SVG order: serialization is left to right, but
//! SVG applies them right to left, so the last transform in a chain runs
//! first. The sizing pass walks chains in reverse for the same reason.

use crate::layout::geometry::round3;

/// One SVG transform operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Rotate {
        degrees: f64,
        x: f64,
        y: f64,
    },
    Translate {
        dx: f64,
        dy: f64,
        /// Paired translates around a rotation cancel out for sizing and are
        /// skipped by the projection walk.
        ignore_for_sizing: bool,
        /// Marks the shape-cell placement translate, which grid alignment is
        /// allowed to nudge after the producer runs.
        grid_alignable: bool,
    },
    Scale {
        sx: f64,
        sy: f64,
    },
}

impl Transform {
    pub fn rotate(degrees: f64, x: f64, y: f64) -> Self {
        Transform::Rotate { degrees, x, y }
    }

    pub fn translate(dx: f64, dy: f64) -> Self {
        Transform::Translate {
            dx,
            dy,
            ignore_for_sizing: false,
            grid_alignable: false,
        }
    }

    pub fn translate_unsized(dx: f64, dy: f64) -> Self {
        Transform::Translate {
            dx,
            dy,
            ignore_for_sizing: true,
            grid_alignable: false,
        }
    }

    pub fn translate_alignable(dx: f64, dy: f64) -> Self {
        Transform::Translate {
            dx,
            dy,
            ignore_for_sizing: false,
            grid_alignable: true,
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Transform::Scale { sx, sy }
    }

    fn to_svg(&self) -> String {
        match self {
            Transform::Rotate { degrees, x, y } => {
                format!("rotate({} {} {})", round3(*degrees), round3(*x), round3(*y))
            }
            Transform::Translate { dx, dy, .. } => {
                format!("translate({} {})", round3(*dx), round3(*dy))
            }
            Transform::Scale { sx, sy } => {
                format!("scale({} {})", round3(*sx), round3(*sy))
            }
        }
    }
}

/// Serialize a chain as an SVG `transform` attribute, including the leading
/// space so it can be appended to a tag directly. Empty chains produce
/// nothing.
pub fn svg_transform_attr(transforms: &[Transform]) -> String {
    if transforms.is_empty() {
        return String::new();
    }
    let body = transforms
        .iter()
        .map(Transform::to_svg)
        .collect::<Vec<_>>()
        .join(" ");
    format!(" transform=\"{body}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_chain_serializes_to_nothing() {
        assert_eq!(svg_transform_attr(&[]), "");
    }

    #[test]
    fn test_rotate_serialization() {
        let attr = svg_transform_attr(&[Transform::rotate(45.12345, 10.0, 20.0)]);
        assert_eq!(attr, " transform=\"rotate(45.123 10 20)\"");
    }

    #[test]
    fn test_chain_order_preserved() {
        let attr = svg_transform_attr(&[
            Transform::translate(5.0, 6.0),
            Transform::scale(2.0, 2.0),
            Transform::translate(-5.0, -6.0),
        ]);
        assert_eq!(
            attr,
            " transform=\"translate(5 6) scale(2 2) translate(-5 -6)\""
        );
    }

    #[test]
    fn test_sizing_flags_do_not_affect_serialization() {
        let a = svg_transform_attr(&[Transform::translate_unsized(1.0, 2.0)]);
        let b = svg_transform_attr(&[Transform::translate(1.0, 2.0)]);
        assert_eq!(a, b);
    }
}
