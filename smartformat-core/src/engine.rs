//! Transform engine: per-element modes, then flow or collision resolution.
//!
//! [`FormatEngine::transform`] never fails. Any internal error is logged and
//! replaced by a uniform proportional scale of the input.

use serde::{Deserialize, Serialize};

use crate::collision::{resolve_collisions, CollisionConfig};
use crate::flow::compose;
use crate::modes::{fallback_scale, keep_inside, transform_element};
use crate::{Element, FormatError, FormatResult, LayoutContext, LayoutPreset, PresetRegistry};

const fn default_true() -> bool {
    true
}

/// Per-call transform options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
    /// Select a preset and run the flow composer.
    #[serde(default = "default_true")]
    pub use_presets: bool,
    /// Pass through elements already customised for the destination format.
    #[serde(default = "default_true")]
    pub preserve_overrides: bool,
    /// Run on the background worker when one is available.
    #[serde(default)]
    pub use_offload: bool,
    /// Explicit preset, bypassing selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            use_presets: true,
            preserve_overrides: true,
            use_offload: false,
            preset_id: None,
        }
    }
}

/// Transform result with diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    /// Transformed elements, in input order.
    pub elements: Vec<Element>,
    /// Preset that was applied, if any.
    pub preset_id: Option<String>,
    /// True when the uniform-scale fallback produced the result.
    pub fallback: bool,
}

/// Deterministic layout transformer.
///
/// Owns its preset registry; there is no global preset state.
#[derive(Debug, Clone, Default)]
pub struct FormatEngine {
    registry: PresetRegistry,
    collision: CollisionConfig,
}

impl FormatEngine {
    /// Create an engine around a preset registry.
    #[must_use]
    pub fn new(registry: PresetRegistry) -> Self {
        Self {
            registry,
            collision: CollisionConfig::default(),
        }
    }

    /// Engine with the built-in presets.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(PresetRegistry::builtin())
    }

    /// Replace the collision resolver settings.
    #[must_use]
    pub fn with_collision_config(mut self, config: CollisionConfig) -> Self {
        self.collision = config;
        self
    }

    /// The preset registry.
    #[must_use]
    pub fn registry(&self) -> &PresetRegistry {
        &self.registry
    }

    /// Collision resolver settings.
    #[must_use]
    pub fn collision_config(&self) -> &CollisionConfig {
        &self.collision
    }

    /// Transform `elements` from one context to another.
    #[must_use]
    pub fn transform(
        &self,
        elements: &[Element],
        from: &LayoutContext,
        to: &LayoutContext,
        options: &TransformOptions,
    ) -> Vec<Element> {
        self.transform_detailed(elements, from, to, options).elements
    }

    /// Transform and report which preset ran and whether the fallback kicked in.
    #[must_use]
    pub fn transform_detailed(
        &self,
        elements: &[Element],
        from: &LayoutContext,
        to: &LayoutContext,
        options: &TransformOptions,
    ) -> TransformOutcome {
        match self.try_transform(elements, from, to, options) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    "Transform {} -> {} failed, using proportional fallback: {}",
                    from.format_key(),
                    to.format_key(),
                    e
                );
                TransformOutcome {
                    elements: fallback_scale(elements, from, to),
                    preset_id: None,
                    fallback: true,
                }
            }
        }
    }

    /// Transform, surfacing internal errors instead of falling back.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid context, unusable element geometry,
    /// or an unknown explicit preset id.
    pub fn try_transform(
        &self,
        elements: &[Element],
        from: &LayoutContext,
        to: &LayoutContext,
        options: &TransformOptions,
    ) -> FormatResult<TransformOutcome> {
        from.check()?;
        to.check()?;

        let preset = if options.use_presets {
            self.select_preset(to, options.preset_id.as_deref())?
        } else {
            None
        };

        let key = to.format_key();
        let pinned: Vec<bool> = elements
            .iter()
            .map(|e| options.preserve_overrides && e.override_formats.contains(&key))
            .collect();

        let mut out = elements
            .iter()
            .zip(&pinned)
            .map(|(element, &keep)| {
                if keep {
                    element.check_geometry()?;
                    Ok(keep_inside(element, to))
                } else {
                    transform_element(element, from, to, preset)
                }
            })
            .collect::<FormatResult<Vec<_>>>()?;

        if let Some(preset) = preset {
            compose(&mut out, preset, to, &pinned);
        } else {
            resolve_collisions(&mut out, to, &self.collision, &pinned);
        }

        tracing::debug!(
            "Transformed {} elements {} -> {} (preset: {})",
            out.len(),
            from.format_key(),
            key,
            preset.map_or("none", |p| p.id.as_str())
        );

        Ok(TransformOutcome {
            elements: out,
            preset_id: preset.map(|p| p.id.clone()),
            fallback: false,
        })
    }

    /// Resolve the preset for a destination: the explicit id if given,
    /// otherwise registry selection.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::PresetNotFound`] for an unknown explicit id.
    pub fn select_preset(
        &self,
        to: &LayoutContext,
        preset_id: Option<&str>,
    ) -> FormatResult<Option<&LayoutPreset>> {
        match preset_id {
            Some(id) => self
                .registry
                .get(id)
                .map(Some)
                .ok_or_else(|| FormatError::PresetNotFound(id.to_string())),
            None => Ok(self.registry.select(to)),
        }
    }
}
