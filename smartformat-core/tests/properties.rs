//! Property tests for containment and round-trip stability.

use proptest::prelude::*;
use smartformat_core::{
    Anchor, Bounds, Element, ElementKind, FormatEngine, LayoutContext, LayoutPreset,
    ResponsiveMode, Role, TransformOptions, STORY_PRESET,
};

fn arb_mode() -> impl Strategy<Value = ResponsiveMode> {
    prop_oneof![
        Just(ResponsiveMode::Fixed),
        Just(ResponsiveMode::Fluid),
        Just(ResponsiveMode::Relative),
        Just(ResponsiveMode::Adaptive),
    ]
}

fn arb_anchor() -> impl Strategy<Value = Anchor> {
    prop_oneof![
        Just(Anchor::TopLeft),
        Just(Anchor::TopCenter),
        Just(Anchor::Center),
        Just(Anchor::BottomRight),
        Just(Anchor::CenterLeft),
    ]
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Logo),
        Just(Role::Heading),
        Just(Role::Image),
        Just(Role::Body),
        Just(Role::Cta),
    ]
}

fn arb_context() -> impl Strategy<Value = LayoutContext> {
    (200u16..3000, 200u16..3000).prop_map(|(w, h)| {
        LayoutContext::new(f32::from(w), f32::from(h), "prop", "format")
            .expect("positive dimensions")
    })
}

/// An element fully inside a 1080x1080 canvas.
fn arb_element() -> impl Strategy<Value = Element> {
    (
        0u16..1000,
        0u16..1000,
        1u16..500,
        1u16..500,
        arb_mode(),
        arb_anchor(),
        proptest::option::of(8u16..96),
    )
        .prop_map(|(x, y, w, h, mode, anchor, font)| {
            let w = w.min(1080 - x);
            let h = h.min(1080 - y);
            let bounds = Bounds::new(f32::from(x), f32::from(y), f32::from(w), f32::from(h));
            let element = match font {
                Some(size) => Element::text("copy", f32::from(size), bounds),
                None => Element::new(ElementKind::Shape, bounds),
            };
            element.with_mode(mode).with_anchor(anchor)
        })
}

fn square() -> LayoutContext {
    LayoutContext::new(1080.0, 1080.0, "instagram", "post").expect("square")
}

proptest! {
    #[test]
    fn prop_every_mode_stays_contained(
        elements in prop::collection::vec(arb_element(), 1..8),
        to in arb_context(),
        use_presets in any::<bool>(),
    ) {
        let engine = FormatEngine::builtin();
        let options = TransformOptions {
            use_presets,
            ..TransformOptions::default()
        };
        let outcome = engine.transform_detailed(&elements, &square(), &to, &options);
        prop_assert!(!outcome.fallback);
        for e in &outcome.elements {
            prop_assert!(
                e.bounds.is_within(to.container_width, to.container_height),
                "{:?} escapes {}x{}", e.bounds, to.container_width, to.container_height
            );
        }
    }

    #[test]
    fn prop_round_trip_is_stable(
        elements in prop::collection::vec(arb_element(), 1..6),
        via in arb_context(),
    ) {
        let engine = FormatEngine::builtin();
        let options = TransformOptions {
            use_presets: false,
            ..TransformOptions::default()
        };
        let roundable: Vec<Element> = elements
            .into_iter()
            .map(|e| {
                let mode = if e.responsive.mode == ResponsiveMode::Relative {
                    ResponsiveMode::Relative
                } else {
                    ResponsiveMode::Fluid
                };
                e.with_mode(mode)
            })
            .collect();

        let there = engine.transform(&roundable, &square(), &via, &options);
        // no collision displacement on the way back
        let back: Vec<Element> = there
            .iter()
            .map(|e| {
                let single = std::slice::from_ref(e);
                engine.transform(single, &via, &square(), &options).remove(0)
            })
            .collect();

        for (before, after) in roundable.iter().zip(&back) {
            prop_assert!((before.bounds.x - after.bounds.x).abs() <= 1.0);
            prop_assert!((before.bounds.y - after.bounds.y).abs() <= 1.0);
            prop_assert!((before.bounds.width - after.bounds.width).abs() <= 1.0);
            prop_assert!((before.bounds.height - after.bounds.height).abs() <= 1.0);
        }
    }

    #[test]
    fn prop_pinned_elements_stay_contained(
        elements in prop::collection::vec((arb_element(), any::<bool>()), 1..8),
        to in arb_context(),
        use_presets in any::<bool>(),
    ) {
        let key = to.format_key();
        let elements: Vec<Element> = elements
            .into_iter()
            .map(|(mut e, pinned)| {
                if pinned {
                    e.override_formats = vec![key.clone()];
                    e.has_overrides = true;
                }
                e
            })
            .collect();

        let engine = FormatEngine::builtin();
        let options = TransformOptions {
            use_presets,
            ..TransformOptions::default()
        };
        let outcome = engine.transform_detailed(&elements, &square(), &to, &options);
        prop_assert!(!outcome.fallback);
        for e in &outcome.elements {
            prop_assert!(
                e.bounds.is_within(to.container_width, to.container_height),
                "{:?} escapes {}x{}", e.bounds, to.container_width, to.container_height
            );
        }
    }

    #[test]
    fn prop_adaptive_round_trip_is_stable(
        elements in prop::collection::vec((arb_element(), arb_role()), 1..6),
        via in arb_context(),
    ) {
        let engine = FormatEngine::builtin();
        let there_options = TransformOptions {
            preset_id: Some(STORY_PRESET.to_string()),
            ..TransformOptions::default()
        };
        let back_options = TransformOptions {
            use_presets: false,
            ..TransformOptions::default()
        };
        let adaptive: Vec<Element> = elements
            .into_iter()
            .map(|(e, role)| e.with_role(role).with_mode(ResponsiveMode::Adaptive))
            .collect();

        let there = engine.transform(&adaptive, &square(), &via, &there_options);
        for (before, after) in adaptive.iter().zip(&there) {
            prop_assert_eq!(before.responsive, after.responsive);
        }

        for (before, e) in adaptive.iter().zip(&there) {
            let single = std::slice::from_ref(e);
            let back = engine.transform(single, &via, &square(), &back_options).remove(0);
            prop_assert_eq!(before.responsive, back.responsive);
            prop_assert!((before.bounds.x - back.bounds.x).abs() <= 1.0);
            prop_assert!((before.bounds.y - back.bounds.y).abs() <= 1.0);
            prop_assert!((before.bounds.width - back.bounds.width).abs() <= 1.0);
            prop_assert!((before.bounds.height - back.bounds.height).abs() <= 1.0);
        }
    }

    #[test]
    fn prop_pristine_never_changes(
        elements in prop::collection::vec(arb_element(), 1..8),
        to in arb_context(),
    ) {
        let engine = FormatEngine::new(
            smartformat_core::PresetRegistry::empty()
                .register(LayoutPreset::story())
                .register(LayoutPreset::landscape()),
        );
        let out = engine.transform(&elements, &square(), &to, &TransformOptions::default());
        for (before, after) in elements.iter().zip(&out) {
            prop_assert_eq!(before.pristine.bounds(), after.pristine.bounds());
            prop_assert_eq!(before.pristine.font_size, after.pristine.font_size);
        }
    }
}
