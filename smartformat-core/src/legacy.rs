//! Upgrade of the flat `platform -> format -> elements` record shape.
//!
//! Older saves stored a complete element array per format with no master
//! and no responsive metadata. Upgrading picks the first format (in key
//! order) as the master and turns every other format into an override.
//! Elements only some formats carry join the master hidden, and each format
//! shows or hides them through its override.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    formats, Bounds, Element, ElementId, ElementKind, FormatError, FormatResult, LayoutContext,
    Pristine, ProjectLayout, ResponsiveProps, Role,
};

/// Legacy record: platform, then format name, then elements.
pub type LegacyRecord = BTreeMap<String, BTreeMap<String, Vec<LegacyElement>>>;

/// An element as older saves stored it. Everything but geometry is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct LegacyElement {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<ElementKind>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub responsive: Option<ResponsiveProps>,
    #[serde(default)]
    pub original_x: Option<f32>,
    #[serde(default)]
    pub original_y: Option<f32>,
    #[serde(default)]
    pub original_width: Option<f32>,
    #[serde(default)]
    pub original_height: Option<f32>,
    #[serde(default)]
    pub original_font_size: Option<f32>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub style: Map<String, Value>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub z_index: Option<i32>,
    #[serde(default)]
    pub layout_order: Option<u32>,
    #[serde(default)]
    pub group_id: Option<String>,
}

impl LegacyElement {
    /// Fill in defaults. `index` names elements saved without an id so the
    /// same position lines up across formats.
    #[must_use]
    pub fn upgrade(self, index: usize, canvas: Option<&LayoutContext>) -> Element {
        let bounds = Bounds::new(self.x, self.y, self.width, self.height);
        let kind = self.kind.unwrap_or(if self.font_size.is_some() {
            ElementKind::Text
        } else {
            ElementKind::Shape
        });

        let mut element = Element::new(kind, bounds)
            .with_id(self.id.unwrap_or_else(|| format!("element-{index}")));
        element.font_size = self.font_size;
        element.role = self
            .role
            .unwrap_or_else(|| Role::infer(kind, &bounds, self.font_size, canvas));
        element.responsive = self.responsive.unwrap_or_default();
        element.pristine = Pristine {
            x: self.original_x.unwrap_or(self.x),
            y: self.original_y.unwrap_or(self.y),
            width: self.original_width.unwrap_or(self.width),
            height: self.original_height.unwrap_or(self.height),
            font_size: self.original_font_size.or(self.font_size),
            canvas_width: canvas.map(|c| c.container_width),
            canvas_height: canvas.map(|c| c.container_height),
        };
        element.visible = self.visible.unwrap_or(true);
        element.style = self.style;
        element.content = self.content;
        element.z_index = self.z_index.unwrap_or_default();
        element.layout_order = self.layout_order;
        element.group_id = self.group_id;
        element
    }
}

/// Parse a legacy record.
///
/// # Errors
///
/// Returns [`FormatError::Serialization`] if the JSON does not have the
/// legacy shape.
pub fn parse_legacy(json: &str) -> FormatResult<LegacyRecord> {
    Ok(serde_json::from_str(json)?)
}

/// Turn a legacy record into a project.
///
/// # Errors
///
/// Returns [`FormatError::ImportRejected`] if the record holds no format
/// or an upgraded element has unusable geometry.
pub fn upgrade(record: LegacyRecord, id: &str, name: &str) -> FormatResult<ProjectLayout> {
    let mut formats = record.into_iter().flat_map(|(platform, by_format)| {
        by_format
            .into_iter()
            .map(move |(format, elements)| (format!("{platform}:{format}"), elements))
    });

    let Some((master_key, master)) = formats.next() else {
        return Err(FormatError::ImportRejected(
            "legacy record has no formats".into(),
        ));
    };

    let master = upgrade_elements(&master_key, master)?;
    let mut project = ProjectLayout::new(name, master).with_master_format(master_key.clone());
    project.id = id.to_string();

    for (key, elements) in formats {
        let mut current = upgrade_elements(&key, elements)?;

        let known: HashSet<ElementId> =
            project.master_layout.iter().map(|e| e.id.clone()).collect();
        for element in current.iter().filter(|e| !known.contains(&e.id)) {
            tracing::debug!("Adding {key}-only element {} to the master hidden", element.id);
            project.master_layout.push(hidden(element));
        }

        let present: HashSet<ElementId> = current.iter().map(|e| e.id.clone()).collect();
        let absent: Vec<Element> = project
            .master_layout
            .iter()
            .filter(|m| !present.contains(&m.id))
            .map(hidden)
            .collect();
        current.extend(absent);

        project.set_override(&key, &current);
    }

    tracing::info!(
        "Upgraded legacy record {id}: master {master_key}, {} overrides",
        project.overrides.len()
    );
    Ok(project)
}

fn hidden(element: &Element) -> Element {
    let mut element = element.clone();
    element.visible = false;
    element
}

fn upgrade_elements(key: &str, elements: Vec<LegacyElement>) -> FormatResult<Vec<Element>> {
    let canvas = formats::lookup_key(key);
    elements
        .into_iter()
        .enumerate()
        .map(|(i, legacy)| {
            let element = legacy.upgrade(i, canvas.as_ref());
            element
                .check_geometry()
                .map_err(|e| FormatError::ImportRejected(format!("{key}: {e}")))?;
            Ok(element)
        })
        .collect()
}
