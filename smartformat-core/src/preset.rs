//! Layout presets - role-based placement rules matched to target formats.
//!
//! A preset pairs a map of [`Role`] to [`RoleRule`] with a [`FlowDescriptor`].
//! The [`PresetRegistry`] picks one for a destination [`LayoutContext`]:
//!
//! ```text
//! 1. first preset listing the format name or platform AND an aspect ratio within 0.1
//! 2. otherwise by orientation: portrait -> story, landscape -> landscape, square -> none
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Anchor, LayoutContext, Orientation, ResponsiveMode, Role, SizeConstraints};

/// Aspect ratio tolerance for preset matching.
const ASPECT_TOLERANCE: f32 = 0.1;

/// Id of the built-in portrait preset.
pub const STORY_PRESET: &str = "story";

/// Id of the built-in landscape preset.
pub const LANDSCAPE_PRESET: &str = "landscape";

/// A preset length: pixels or a percentage of the destination axis.
///
/// Serialized as a number (`120`) or a `%`-suffixed string (`"50%"`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    /// Absolute pixels.
    Pixels(f32),
    /// Percentage of the axis length.
    Percent(f32),
}

impl Dimension {
    /// Resolve against an axis length.
    #[must_use]
    pub fn resolve(self, axis: f32) -> f32 {
        match self {
            Self::Pixels(px) => px,
            Self::Percent(pct) => axis * pct / 100.0,
        }
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pixels(px) => serializer.serialize_f32(*px),
            Self::Percent(pct) => serializer.serialize_str(&format!("{pct}%")),
        }
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(px) => Ok(Self::Pixels(px)),
            Raw::Text(text) => text
                .trim()
                .strip_suffix('%')
                .and_then(|n| n.trim().parse::<f32>().ok())
                .map(Self::Percent)
                .ok_or_else(|| {
                    serde::de::Error::custom(format!("expected number or percentage, got {text:?}"))
                }),
        }
    }
}

/// Preferred position of a role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetPosition {
    /// Horizontal anchor position.
    pub x: Dimension,
    /// Vertical anchor position.
    pub y: Dimension,
}

/// Preferred size of a role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetSize {
    /// Width.
    pub width: Dimension,
    /// Height.
    pub height: Dimension,
}

/// Placement rule for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRule {
    /// Where the anchor point goes.
    pub position: PresetPosition,
    /// Element size.
    pub size: PresetSize,
    /// Anchor interpreting `position`.
    #[serde(default)]
    pub anchor: Anchor,
    /// Responsive mode for the role.
    #[serde(default = "RoleRule::default_mode")]
    pub mode: ResponsiveMode,
    /// Size limits replacing the element's own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<SizeConstraints>,
}

impl RoleRule {
    const fn default_mode() -> ResponsiveMode {
        ResponsiveMode::Adaptive
    }

    fn pct(x: f32, y: f32, width: f32, height: f32, anchor: Anchor) -> Self {
        Self {
            position: PresetPosition {
                x: Dimension::Percent(x),
                y: Dimension::Percent(y),
            },
            size: PresetSize {
                width: Dimension::Percent(width),
                height: Dimension::Percent(height),
            },
            anchor,
            mode: ResponsiveMode::Adaptive,
            constraints: None,
        }
    }

    fn with_constraints(mut self, constraints: SizeConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }
}

/// Axis the flow composer stacks along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    /// Top to bottom.
    #[default]
    Vertical,
    /// Left to right.
    Horizontal,
    /// Row-major grid.
    Grid,
}

/// Cross-axis alignment of flowed elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowAlignment {
    /// Leading edge.
    Start,
    /// Centered.
    #[default]
    Center,
    /// Trailing edge.
    End,
}

/// How a preset arranges elements after sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDescriptor {
    /// Stacking axis.
    pub direction: FlowDirection,
    /// Gap between elements and from the container edge.
    pub spacing: f32,
    /// Cross-axis alignment.
    #[serde(default)]
    pub alignment: FlowAlignment,
    /// Grid column count; defaults to `ceil(sqrt(n))`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,
}

/// A named, format-matched set of role rules plus a flow strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPreset {
    /// Preset identifier.
    pub id: String,
    /// Format names or platforms this preset targets.
    pub target_formats: Vec<String>,
    /// Compatible aspect ratios.
    pub aspect_ratios: Vec<f32>,
    /// Placement rules by role.
    #[serde(default)]
    pub rules: HashMap<Role, RoleRule>,
    /// Arrangement after sizing.
    pub flow: FlowDescriptor,
}

impl LayoutPreset {
    /// Rule for a role, if any.
    #[must_use]
    pub fn rule(&self, role: Role) -> Option<&RoleRule> {
        self.rules.get(&role)
    }

    /// Whether the preset targets the context and a compatible aspect ratio.
    #[must_use]
    pub fn matches(&self, context: &LayoutContext) -> bool {
        let targets = self.target_formats.iter().any(|target| {
            target.eq_ignore_ascii_case(&context.format_name)
                || target.eq_ignore_ascii_case(&context.platform)
        });
        let ratio = context.aspect_ratio();
        targets
            && self
                .aspect_ratios
                .iter()
                .any(|r| (r - ratio).abs() <= ASPECT_TOLERANCE)
    }

    /// Vertical preset for 9:16 and 4:5 canvases.
    #[must_use]
    pub fn story() -> Self {
        let rules = HashMap::from([
            (Role::Background, RoleRule::pct(0.0, 0.0, 100.0, 100.0, Anchor::TopLeft)),
            (Role::Logo, RoleRule::pct(50.0, 5.0, 20.0, 6.0, Anchor::TopCenter).with_constraints(
                SizeConstraints {
                    max_width: Some(240.0),
                    max_height: Some(120.0),
                    ..SizeConstraints::default()
                },
            )),
            (Role::Heading, RoleRule::pct(50.0, 20.0, 88.0, 12.0, Anchor::TopCenter)),
            (Role::Subheading, RoleRule::pct(50.0, 34.0, 80.0, 8.0, Anchor::TopCenter)),
            (Role::Image, RoleRule::pct(50.0, 45.0, 90.0, 30.0, Anchor::TopCenter)),
            (Role::Body, RoleRule::pct(50.0, 78.0, 84.0, 8.0, Anchor::TopCenter)),
            (Role::Cta, RoleRule::pct(50.0, 88.0, 60.0, 6.0, Anchor::TopCenter)),
            (Role::Caption, RoleRule::pct(50.0, 95.0, 80.0, 3.0, Anchor::TopCenter)),
        ]);
        Self {
            id: STORY_PRESET.to_string(),
            target_formats: [
                "story",
                "portrait",
                "pin",
                "video",
                "instagram",
                "tiktok",
                "pinterest",
            ]
            .map(String::from)
                .to_vec(),
            aspect_ratios: vec![9.0 / 16.0, 4.0 / 5.0],
            rules,
            flow: FlowDescriptor {
                direction: FlowDirection::Vertical,
                spacing: 24.0,
                alignment: FlowAlignment::Center,
                columns: None,
            },
        }
    }

    /// Horizontal preset for 16:9 and 1.91:1 canvases.
    #[must_use]
    pub fn landscape() -> Self {
        let rules = HashMap::from([
            (Role::Background, RoleRule::pct(0.0, 0.0, 100.0, 100.0, Anchor::TopLeft)),
            (Role::Logo, RoleRule::pct(4.0, 6.0, 12.0, 12.0, Anchor::TopLeft).with_constraints(
                SizeConstraints {
                    max_width: Some(200.0),
                    max_height: Some(120.0),
                    ..SizeConstraints::default()
                },
            )),
            (Role::Image, RoleRule::pct(96.0, 50.0, 42.0, 80.0, Anchor::CenterRight)),
            (Role::Heading, RoleRule::pct(4.0, 30.0, 48.0, 18.0, Anchor::CenterLeft)),
            (Role::Subheading, RoleRule::pct(4.0, 48.0, 48.0, 10.0, Anchor::CenterLeft)),
            (Role::Body, RoleRule::pct(4.0, 62.0, 48.0, 12.0, Anchor::CenterLeft)),
            (Role::Cta, RoleRule::pct(4.0, 80.0, 28.0, 10.0, Anchor::CenterLeft)),
        ]);
        Self {
            id: LANDSCAPE_PRESET.to_string(),
            target_formats: ["post", "thumbnail", "facebook", "twitter", "linkedin", "youtube"]
                .map(String::from)
                .to_vec(),
            aspect_ratios: vec![16.0 / 9.0, 1.91],
            rules,
            flow: FlowDescriptor {
                direction: FlowDirection::Horizontal,
                spacing: 32.0,
                alignment: FlowAlignment::Center,
                columns: None,
            },
        }
    }
}

/// Immutable-after-construction catalogue of presets.
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: Vec<LayoutPreset>,
}

impl PresetRegistry {
    /// Registry with no presets.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in story and landscape presets.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            presets: vec![LayoutPreset::story(), LayoutPreset::landscape()],
        }
    }

    /// Add a preset. Later registrations lose ties in [`Self::select`].
    #[must_use]
    pub fn register(mut self, preset: LayoutPreset) -> Self {
        self.presets.push(preset);
        self
    }

    /// Look up a preset by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&LayoutPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// All registered presets in registration order.
    pub fn presets(&self) -> impl Iterator<Item = &LayoutPreset> {
        self.presets.iter()
    }

    /// Pick the preset for a destination context.
    #[must_use]
    pub fn select(&self, context: &LayoutContext) -> Option<&LayoutPreset> {
        self.presets
            .iter()
            .find(|p| p.matches(context))
            .or_else(|| self.fallback_for(context.orientation()))
    }

    /// Default preset for an orientation.
    #[must_use]
    pub fn fallback_for(&self, orientation: Orientation) -> Option<&LayoutPreset> {
        match orientation {
            Orientation::Portrait => self.get(STORY_PRESET),
            Orientation::Landscape => self.get(LANDSCAPE_PRESET),
            Orientation::Square => None,
        }
    }
}
