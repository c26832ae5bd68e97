//! Small geometry helpers: angles, distances, rotation projection

/// Angle of the line from (x1, y1) to (x2, y2), in degrees in (-180, 180].
/// Screen coordinates, so positive angles turn clockwise.
pub fn angle_deg(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (y2 - y1).atan2(x2 - x1).to_degrees()
}

/// Euclidean distance between two points.
pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x1 - x2).hypot(y1 - y2)
}

/// Round to three decimals for SVG output. Adding zero collapses negative
/// zero, which would otherwise print as "-0".
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0 + 0.0
}

/// An axis-aligned extent: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x1: f64,
    pub y1: f64,
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned bounding box of the rectangle (x, y, w, h) after rotating it
/// by `degrees` around the pivot (rx, ry).
pub fn project_rotated(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    rx: f64,
    ry: f64,
    degrees: f64,
) -> Extent {
    let angle = degrees.to_radians();
    let (sin, cos) = angle.sin_cos();

    let mut min_x = 0.0f64;
    let mut min_y = 0.0f64;
    let mut max_x = 0.0f64;
    let mut max_y = 0.0f64;

    let corners = [
        (x, y),
        (x + width, y),
        (x + width, y + height),
        (x, y + height),
    ];
    for (cx, cy) in corners {
        // Rotate around the pivot by shifting it to the origin first.
        let px = cx - rx;
        let py = cy - ry;
        let qx = px * cos - py * sin;
        let qy = px * sin + py * cos;
        min_x = min_x.min(qx);
        min_y = min_y.min(qy);
        max_x = max_x.max(qx);
        max_y = max_y.max(qy);
    }

    Extent {
        x1: min_x + rx,
        y1: min_y + ry,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}
