//! End-to-end scenarios for the transform engine, validator and overrides.

use smartformat_core::formats::lookup;
use smartformat_core::{
    validate, Anchor, Bounds, Element, ElementKind, FormatEngine, IssueKind, LayoutContext,
    Percentages, ProjectLayout, ResponsiveMode, Role, TransformOptions,
};

fn square() -> LayoutContext {
    LayoutContext::new(1080.0, 1080.0, "instagram", "post").expect("square")
}

fn story() -> LayoutContext {
    LayoutContext::new(1080.0, 1920.0, "instagram", "story").expect("story")
}

fn heading(mode: ResponsiveMode) -> Element {
    Element::text("Summer sale", 24.0, Bounds::new(100.0, 100.0, 200.0, 50.0))
        .with_id("heading")
        .with_role(Role::Heading)
        .with_mode(mode)
}

/// Options that isolate the per-element math from preset flow.
fn plain() -> TransformOptions {
    TransformOptions {
        use_presets: false,
        ..TransformOptions::default()
    }
}

// ===========================================================================
// Transform scenarios
// ===========================================================================

#[test]
fn test_fluid_heading_square_to_story() {
    let engine = FormatEngine::builtin();
    let out = engine.transform(&[heading(ResponsiveMode::Fluid)], &square(), &story(), &plain());
    assert_eq!(out[0].bounds, Bounds::new(100.0, 178.0, 200.0, 89.0));
    assert_eq!(out[0].font_size, Some(24.0));
}

#[test]
fn test_fixed_heading_shrinks_by_half() {
    let engine = FormatEngine::builtin();
    let small = LayoutContext::new(540.0, 540.0, "custom", "small").expect("small");
    let out = engine.transform(&[heading(ResponsiveMode::Fixed)], &square(), &small, &plain());
    assert_eq!(out[0].bounds, Bounds::new(50.0, 50.0, 100.0, 25.0));
    assert_eq!(out[0].font_size, Some(12.0));
}

#[test]
fn test_fixed_does_not_grow_on_larger_canvas() {
    let engine = FormatEngine::builtin();
    let big = LayoutContext::new(2000.0, 3000.0, "custom", "big").expect("big");
    let out = engine.transform(&[heading(ResponsiveMode::Fixed)], &square(), &big, &plain());
    assert!((out[0].bounds.width - 200.0).abs() < f32::EPSILON);
    assert!((out[0].bounds.height - 50.0).abs() < f32::EPSILON);
}

#[test]
fn test_relative_center_is_centered_on_every_format() {
    let engine = FormatEngine::builtin();
    let mut element = Element::new(ElementKind::Shape, Bounds::new(0.0, 0.0, 200.0, 200.0))
        .with_mode(ResponsiveMode::Relative)
        .with_anchor(Anchor::Center);
    element.responsive.percentages = Some(Percentages {
        x_percent: 50.0,
        y_percent: 50.0,
        width_percent: 10.0,
        height_percent: 10.0,
    });

    for format in smartformat_core::FORMATS {
        let to = format.context();
        let out = engine.transform(std::slice::from_ref(&element), &square(), &to, &plain());
        let b = out[0].bounds;
        let cx = b.x + b.width / 2.0;
        let cy = b.y + b.height / 2.0;
        assert!((cx - to.container_width / 2.0).abs() <= 1.0, "{}: cx {cx}", to.format_key());
        assert!((cy - to.container_height / 2.0).abs() <= 1.0, "{}: cy {cy}", to.format_key());
    }
}

#[test]
fn test_round_trip_through_several_formats() {
    let engine = FormatEngine::builtin();
    let original = vec![
        heading(ResponsiveMode::Fluid),
        Element::new(ElementKind::Image, Bounds::new(300.0, 400.0, 500.0, 300.0))
            .with_id("photo")
            .with_mode(ResponsiveMode::Relative),
    ];

    let mut current = original.clone();
    let mut from = square();
    for key in [("facebook", "post"), ("instagram", "story"), ("youtube", "thumbnail")] {
        let to = lookup(key.0, key.1).expect("format");
        current = engine.transform(&current, &from, &to, &plain());
        from = to;
    }
    let back = engine.transform(&current, &from, &square(), &plain());

    for (before, after) in original.iter().zip(&back) {
        assert!((before.bounds.x - after.bounds.x).abs() <= 1.0, "{}", before.id);
        assert!((before.bounds.y - after.bounds.y).abs() <= 1.0, "{}", before.id);
        assert!((before.bounds.width - after.bounds.width).abs() <= 1.0, "{}", before.id);
        assert!((before.bounds.height - after.bounds.height).abs() <= 1.0, "{}", before.id);
    }
}

#[test]
fn test_story_preset_stacks_without_overlap() {
    let engine = FormatEngine::builtin();
    let elements = vec![
        Element::new(ElementKind::Image, Bounds::new(0.0, 0.0, 1080.0, 1080.0))
            .with_id("bg")
            .with_role(Role::Background),
        heading(ResponsiveMode::Adaptive),
        Element::text("Shop now", 32.0, Bounds::new(400.0, 900.0, 280.0, 80.0))
            .with_id("cta")
            .with_role(Role::Cta)
            .with_mode(ResponsiveMode::Adaptive),
        Element::new(ElementKind::Image, Bounds::new(20.0, 20.0, 60.0, 60.0))
            .with_id("logo")
            .with_role(Role::Logo)
            .with_mode(ResponsiveMode::Adaptive),
    ];

    let outcome =
        engine.transform_detailed(&elements, &square(), &story(), &TransformOptions::default());
    assert_eq!(outcome.preset_id.as_deref(), Some("story"));
    let out = outcome.elements;

    // background keeps filling the canvas
    assert_eq!(out[0].bounds, Bounds::new(0.0, 0.0, 1080.0, 1920.0));
    // logo, heading, cta in role order
    assert!(out[3].bounds.bottom() <= out[1].bounds.y);
    assert!(out[1].bounds.bottom() <= out[2].bounds.y);
    let report = validate(&out, &story());
    assert_eq!(report.issues_of(IssueKind::CriticalOverlap).count(), 0);
    assert_eq!(report.issues_of(IssueKind::OutOfBounds).count(), 0);
}

#[test]
fn test_transform_never_panics_on_bad_input() {
    let engine = FormatEngine::builtin();
    let mut broken = heading(ResponsiveMode::Fluid);
    broken.bounds.height = -10.0;
    let out = engine.transform(&[broken], &square(), &story(), &TransformOptions::default());
    assert_eq!(out.len(), 1);
}

// ===========================================================================
// Validator scenarios
// ===========================================================================

#[test]
fn test_validator_flags_out_of_bounds() {
    let element = Element::new(ElementKind::Shape, Bounds::new(-5.0, 0.0, 50.0, 50.0));
    let report = validate(&[element], &square());
    assert!(!report.is_valid);
    assert_eq!(report.issues_of(IssueKind::OutOfBounds).count(), 1);
}

#[test]
fn test_validator_flags_small_text() {
    let element = Element::text("terms apply", 8.0, Bounds::new(10.0, 10.0, 200.0, 20.0));
    let report = validate(&[element], &square());
    assert!(!report.is_valid);
    assert_eq!(report.issues_of(IssueKind::UnreadableText).count(), 1);
}

#[test]
fn test_validator_flags_overlapping_ctas() {
    let cta = |id: &str, y: f32| {
        Element::new(ElementKind::Shape, Bounds::new(300.0, y, 300.0, 100.0))
            .with_id(id)
            .with_role(Role::Cta)
    };
    let report = validate(&[cta("buy", 500.0), cta("learn", 550.0)], &square());
    assert!(!report.is_valid);
    assert_eq!(report.issues_of(IssueKind::CriticalOverlap).count(), 1);
    assert_eq!(report.is_valid, report.issues.is_empty());
}

// ===========================================================================
// Override scenarios
// ===========================================================================

#[test]
fn test_override_of_identical_layout_is_empty() {
    let mut project = ProjectLayout::new("Sale", vec![heading(ResponsiveMode::Fluid)]);
    let current = project.master_layout.clone();
    let set = project.set_override(&story().format_key(), &current);
    assert!(set.elements.is_empty());
    assert_eq!(project.resolve(&story().format_key()).elements, project.master_layout);
}

#[test]
fn test_override_survives_transform_and_resolve() {
    let engine = FormatEngine::builtin();
    let key = story().format_key();
    let mut project = ProjectLayout::new("Sale", vec![heading(ResponsiveMode::Fluid)]);

    // user nudges the heading in the story format
    let mut current = engine.transform(&project.master_layout, &square(), &story(), &plain());
    current[0].apply_user_edit(Bounds::new(40.0, 600.0, 200.0, 89.0), None, &story());
    project.set_override(&key, &current);

    let resolved = project.resolve(&key);
    assert!((resolved.elements[0].bounds.y - 600.0).abs() < f32::EPSILON);
    assert!(resolved.elements[0].has_overrides);

    // overridden elements pass through an automatic transform untouched
    let options = TransformOptions::default();
    let again = engine.transform(&resolved.elements, &square(), &story(), &options);
    assert_eq!(again[0].bounds, resolved.elements[0].bounds);
}
