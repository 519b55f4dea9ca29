//! Master layout plus sparse per-format overrides.
//!
//! The master element array is the single source of truth. Each format key
//! maps to an [`FormatOverrideSet`] holding only the fields that differ from
//! the master, and [`ProjectLayout::resolve`] merges the two at read time.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{Element, ElementId, FormatError, FormatResult, ResponsiveProps};

/// Position and size differences below this are float noise.
pub const GEOMETRY_TOLERANCE: f32 = 0.01;

fn differs(a: f32, b: f32) -> bool {
    (a - b).abs() > GEOMETRY_TOLERANCE
}

/// Responsive block without the transform-time cache.
fn authored(responsive: &ResponsiveProps) -> ResponsiveProps {
    ResponsiveProps {
        percentages: None,
        ..*responsive
    }
}

/// Keeps a present `null` apart from a missing field: `Some(None)` clears
/// the master value, `None` inherits it.
#[allow(clippy::option_option)]
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Sparse set of field values overriding one master element.
///
/// Optional element fields use a nested option so an override can also
/// clear a value the master sets.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementOverride {
    /// Overridden X.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// Overridden Y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Overridden width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    /// Overridden height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// Overridden font size.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub font_size: Option<Option<f32>>,
    /// Overridden visibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Overridden responsive block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsive: Option<ResponsiveProps>,
    /// Overridden style payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Map<String, Value>>,
    /// Overridden content.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<Option<String>>,
    /// Overridden z-index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    /// Overridden flow order.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub layout_order: Option<Option<u32>>,
}

impl ElementOverride {
    /// Field-by-field difference of `current` against `master`.
    #[must_use]
    pub fn diff(master: &Element, current: &Element) -> Self {
        let (m, c) = (&master.bounds, &current.bounds);
        let pick = |a: f32, b: f32| differs(a, b).then_some(b);

        let font_size = match (master.font_size, current.font_size) {
            (Some(a), Some(b)) => pick(a, b).map(Some),
            (None, None) => None,
            (_, current) => Some(current),
        };

        Self {
            x: pick(m.x, c.x),
            y: pick(m.y, c.y),
            width: pick(m.width, c.width),
            height: pick(m.height, c.height),
            font_size,
            visible: (master.visible != current.visible).then_some(current.visible),
            responsive: (authored(&master.responsive) != authored(&current.responsive))
                .then(|| authored(&current.responsive)),
            style: (master.style != current.style).then(|| current.style.clone()),
            content: (master.content != current.content).then(|| current.content.clone()),
            z_index: (master.z_index != current.z_index).then_some(current.z_index),
            layout_order: (master.layout_order != current.layout_order)
                .then_some(current.layout_order),
        }
    }

    /// Whether no field is overridden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer the overridden fields onto an element.
    pub fn apply(&self, element: &mut Element) {
        let b = &mut element.bounds;
        b.x = self.x.unwrap_or(b.x);
        b.y = self.y.unwrap_or(b.y);
        b.width = self.width.unwrap_or(b.width);
        b.height = self.height.unwrap_or(b.height);
        if let Some(font_size) = self.font_size {
            element.font_size = font_size;
        }
        if let Some(visible) = self.visible {
            element.visible = visible;
        }
        if let Some(responsive) = self.responsive {
            element.responsive = responsive;
        }
        if let Some(style) = &self.style {
            element.style.clone_from(style);
        }
        if let Some(content) = &self.content {
            element.content.clone_from(content);
        }
        if let Some(z) = self.z_index {
            element.z_index = z;
        }
        if let Some(order) = self.layout_order {
            element.layout_order = order;
        }
    }
}

/// Everything one format customises.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOverrideSet {
    /// Per-element diffs.
    #[serde(default)]
    pub elements: BTreeMap<ElementId, ElementOverride>,
    /// Background for this format only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_background: Option<Value>,
    /// Preset pinned for this format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
}

impl FormatOverrideSet {
    /// Whether the set customises nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.canvas_background.is_none() && self.preset_id.is_none()
    }
}

/// A format's view of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLayout {
    /// Master elements with the format's overrides applied.
    pub elements: Vec<Element>,
    /// Effective background.
    pub canvas_background: Value,
    /// Preset pinned for the format, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
}

/// One design: a master layout and its per-format overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLayout {
    /// Project identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Format key the master was authored in, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_format: Option<String>,
    /// Canonical element array.
    pub master_layout: Vec<Element>,
    /// Opaque background payload.
    #[serde(default)]
    pub canvas_background: Value,
    /// Overrides by format key.
    #[serde(default)]
    pub overrides: BTreeMap<String, FormatOverrideSet>,
    /// Creation time, ms since the Unix epoch.
    #[serde(default)]
    pub created_at: u64,
    /// Last modification time, ms since the Unix epoch.
    #[serde(default)]
    pub updated_at: u64,
}

impl ProjectLayout {
    /// Create a project with a fresh id and no overrides.
    #[must_use]
    pub fn new(name: impl Into<String>, master_layout: Vec<Element>) -> Self {
        let now = current_timestamp_ms();
        let mut project = Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            master_format: None,
            master_layout,
            canvas_background: Value::Null,
            overrides: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };
        project.refresh_flags();
        project
    }

    /// Record the format the master was authored in.
    #[must_use]
    pub fn with_master_format(mut self, format_key: impl Into<String>) -> Self {
        self.master_format = Some(format_key.into());
        self
    }

    /// Parse and check an imported project record.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::ImportRejected`] with a reason when the record
    /// is not a JSON object, lacks a required field, fails to deserialize,
    /// repeats an element id, or carries unusable element geometry.
    pub fn from_json(json: &str) -> FormatResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| FormatError::ImportRejected(format!("not valid JSON: {e}")))?;
        let Some(object) = value.as_object() else {
            return Err(FormatError::ImportRejected("expected a JSON object".into()));
        };
        for field in ["id", "name", "masterLayout"] {
            if !object.contains_key(field) {
                return Err(FormatError::ImportRejected(format!(
                    "missing required field `{field}`"
                )));
            }
        }

        let mut project: Self = serde_json::from_value(value)
            .map_err(|e| FormatError::ImportRejected(e.to_string()))?;

        let mut seen = HashSet::new();
        for element in &project.master_layout {
            if !seen.insert(&element.id) {
                return Err(FormatError::ImportRejected(format!(
                    "duplicate element id {}",
                    element.id
                )));
            }
            element
                .check_geometry()
                .map_err(|e| FormatError::ImportRejected(e.to_string()))?;
        }

        project.refresh_flags();
        Ok(project)
    }

    /// Override set for a format, if customised.
    #[must_use]
    pub fn override_for(&self, format_key: &str) -> Option<&FormatOverrideSet> {
        self.overrides.get(format_key)
    }

    /// Customised format keys, sorted.
    pub fn format_keys(&self) -> impl Iterator<Item = &str> {
        self.overrides.keys().map(String::as_str)
    }

    /// Merge the master with a format's overrides.
    ///
    /// Without an override the master is returned unchanged.
    #[must_use]
    pub fn resolve(&self, format_key: &str) -> ResolvedLayout {
        let Some(set) = self.overrides.get(format_key) else {
            return ResolvedLayout {
                elements: self.master_layout.clone(),
                canvas_background: self.canvas_background.clone(),
                preset_id: None,
            };
        };

        let elements = self
            .master_layout
            .iter()
            .map(|master| {
                let mut element = master.clone();
                if let Some(diff) = set.elements.get(&master.id) {
                    diff.apply(&mut element);
                }
                element
            })
            .collect();

        ResolvedLayout {
            elements,
            canvas_background: set
                .canvas_background
                .clone()
                .unwrap_or_else(|| self.canvas_background.clone()),
            preset_id: set.preset_id.clone(),
        }
    }

    /// Store the differences of `current` against the master for a format.
    ///
    /// Elements without a master counterpart are ignored; master elements
    /// absent from `current` keep inheriting. Returns the resulting set,
    /// which is dropped from storage when it customises nothing.
    pub fn set_override(&mut self, format_key: &str, current: &[Element]) -> FormatOverrideSet {
        let masters: HashMap<&ElementId, &Element> =
            self.master_layout.iter().map(|e| (&e.id, e)).collect();

        let mut elements = BTreeMap::new();
        for element in current {
            let Some(master) = masters.get(&element.id) else {
                tracing::debug!("Ignoring element {} with no master counterpart", element.id);
                continue;
            };
            let diff = ElementOverride::diff(master, element);
            if !diff.is_empty() {
                elements.insert(element.id.clone(), diff);
            }
        }

        let previous = self.overrides.remove(format_key).unwrap_or_default();
        let set = FormatOverrideSet {
            elements,
            ..previous
        };
        tracing::debug!(
            "Override for {format_key}: {} element diffs",
            set.elements.len()
        );
        self.store_override(format_key, set.clone());
        set
    }

    /// Set or clear the background for one format.
    pub fn set_override_background(&mut self, format_key: &str, background: Option<Value>) {
        let mut set = self.overrides.remove(format_key).unwrap_or_default();
        set.canvas_background = background;
        self.store_override(format_key, set);
    }

    /// Pin or unpin a preset for one format.
    pub fn set_override_preset(&mut self, format_key: &str, preset_id: Option<String>) {
        let mut set = self.overrides.remove(format_key).unwrap_or_default();
        set.preset_id = preset_id;
        self.store_override(format_key, set);
    }

    /// Drop a format's override so it inherits the master again.
    ///
    /// Returns whether an override existed.
    pub fn reset_override(&mut self, format_key: &str) -> bool {
        let existed = self.overrides.remove(format_key).is_some();
        if existed {
            self.touch();
        }
        existed
    }

    /// Replace the master layout.
    ///
    /// Override entries for elements that no longer exist are pruned.
    pub fn update_master(&mut self, elements: Vec<Element>) {
        self.master_layout = elements;
        let ids: HashSet<ElementId> = self.master_layout.iter().map(|e| e.id.clone()).collect();
        for set in self.overrides.values_mut() {
            set.elements.retain(|id, _| ids.contains(id));
        }
        self.overrides.retain(|_, set| !set.is_empty());
        self.touch();
    }

    fn store_override(&mut self, format_key: &str, set: FormatOverrideSet) {
        if !set.is_empty() {
            self.overrides.insert(format_key.to_string(), set);
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.refresh_flags();
        self.updated_at = current_timestamp_ms().max(self.updated_at);
    }

    /// Recompute `hasOverrides`/`overrideFormats` on master elements.
    pub fn refresh_flags(&mut self) {
        for element in &mut self.master_layout {
            element.override_formats = self
                .overrides
                .iter()
                .filter(|(_, set)| set.elements.contains_key(&element.id))
                .map(|(key, _)| key.clone())
                .collect();
            element.has_overrides = !element.override_formats.is_empty();
        }
    }
}

/// Current Unix timestamp in milliseconds.
pub(crate) fn current_timestamp_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}
