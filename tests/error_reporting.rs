//! The error taxonomy end to end: every failure carries a kind and the
//! 1-based source line it points at.

use grid_diagram::{render, DiagramError, DiagramErrorKind};

fn fail(source: &str) -> DiagramError {
    render(source).expect_err("source should not compile")
}

#[test]
fn test_unknown_element_in_layout() {
    let err = fail("rect:\n  box: 40 40\nlayout:\n\nboxx\n");
    assert_eq!(err.kind, DiagramErrorKind::UnknownElement);
    assert_eq!(err.line, 5);
}

#[test]
fn test_unknown_spec_directive() {
    let err = fail("blah:\n  x: 1\nrect:\n  a: 30 30\nlayout:\n\na\n");
    assert_eq!(err.kind, DiagramErrorKind::UnknownDirective);
    assert_eq!(err.line, 1);
}

#[test]
fn test_unknown_setting_key() {
    let err = fail("settings:\n  mystery: 1\nrect:\n  a: 30 30\nlayout:\n\na\n");
    assert_eq!(err.kind, DiagramErrorKind::InvalidSpec);
    assert_eq!(err.line, 2);
}

#[test]
fn test_reference_to_missing_anchor() {
    let err = fail("rect:\n  a: 30 30\n  b: 30 30\nlayout:\n\na\n* at missing\nb\n");
    assert_eq!(err.kind, DiagramErrorKind::ReferenceNotFound);
    assert_eq!(err.line, 7);
}

#[test]
fn test_duplicate_z_index() {
    let err = fail("rect:\n  a: 30 30\nlayout:\n\na\n*:2 at a\na\n*:2 at a\na\n");
    assert_eq!(err.kind, DiagramErrorKind::DuplicateZIndex);
    assert_eq!(err.line, 8);
}

#[test]
fn test_detached_dash() {
    let err = fail("rect:\n  a: 30 30\n  b: 30 30\nlayout:\n\na - b\n");
    assert_eq!(err.kind, DiagramErrorKind::ContinuationWithoutElement);
    assert_eq!(err.line, 5);
}

#[test]
fn test_two_objects_in_one_column() {
    // The wide name merges the character positions of both `a` tokens into
    // one column.
    let err = fail("rect:\n  long: 30 30\n  a: 10 10\nlayout:\n\nlong\na  a\n");
    assert_eq!(err.kind, DiagramErrorKind::MultipleObjectsInColumn);
    assert_eq!(err.line, 7);
}

#[test]
fn test_unparseable_descriptor() {
    let err = fail("rect:\n  a: 30 30\nlayout:\n\na\n* near a\na\n");
    assert_eq!(err.kind, DiagramErrorKind::InvalidLayerDefinition);
    assert_eq!(err.line, 6);
}

#[test]
fn test_fill_height_to_path_needs_box_mode() {
    let err = fail("rect:\n  a: 30 30\n  b: 30 30\nlayout:\n\na b\n* from a to b fillHeight:$path\nb\n");
    assert_eq!(err.kind, DiagramErrorKind::InvalidFillDirective);
    assert_eq!(err.line, 7);
}

#[test]
fn test_circle_rejects_fill() {
    let err = fail("circle:\n  c: fill\nlayout:\n\nc\n");
    assert_eq!(err.kind, DiagramErrorKind::UnsupportedFill);
    assert_eq!(err.line, 2);
}

#[test]
fn test_zero_size_default_layer() {
    let err = fail("rect:\n  a: 0 0\nlayout:\n\na\n");
    assert_eq!(err.kind, DiagramErrorKind::ZeroDimensionLayer);
    assert_eq!(err.line, 5);
}

#[test]
fn test_polygon_coordinate_must_be_numeric() {
    let err = fail("polygon:\n  p: 0,0 10,x 5,9\nlayout:\n\np\n");
    assert_eq!(err.kind, DiagramErrorKind::InvalidCoordinate);
    assert_eq!(err.line, 2);
}

#[test]
fn test_fill_referencing_unknown_layer() {
    let err = fail("rect:\n  a: 30 30\n  b: 30 30\nlayout:\n\na\n* at a fillWidth:$l:7:width\nb\n");
    assert_eq!(err.kind, DiagramErrorKind::UnknownLayerZIndex);
    assert_eq!(err.line, 6);
}

#[test]
fn test_report_names_the_offending_line() {
    let source = "rect:\n  box: 40 40\nlayout:\n\nboxx\n";
    let err = fail(source);
    let report = err.format(source, "diagram.txt");
    assert!(report.contains("Unknown element: boxx"));
    assert!(report.contains("diagram.txt"));
}
