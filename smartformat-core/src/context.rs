//! Canvas format descriptions.

use serde::{Deserialize, Serialize};

use crate::{FormatError, FormatResult};

/// Aspect ratios this close to 1.0 count as square.
const SQUARE_TOLERANCE: f32 = 0.01;

/// Canvas orientation derived from the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Wider than tall.
    Landscape,
    /// Taller than wide.
    Portrait,
    /// Equal sides.
    Square,
}

/// Immutable description of one canvas format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutContext {
    /// Canvas width in pixels.
    pub container_width: f32,
    /// Canvas height in pixels.
    pub container_height: f32,
    /// Platform identifier, e.g. `instagram`.
    pub platform: String,
    /// Format name within the platform, e.g. `story`.
    pub format_name: String,
}

impl LayoutContext {
    /// Create a context.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidContext`] if either dimension is not a
    /// positive finite number.
    pub fn new(
        width: f32,
        height: f32,
        platform: impl Into<String>,
        format_name: impl Into<String>,
    ) -> FormatResult<Self> {
        let context = Self {
            container_width: width,
            container_height: height,
            platform: platform.into(),
            format_name: format_name.into(),
        };
        context.check()?;
        Ok(context)
    }

    /// Re-check dimensions, for contexts that arrived through deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidContext`] for unusable dimensions.
    pub fn check(&self) -> FormatResult<()> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.container_width) && ok(self.container_height) {
            Ok(())
        } else {
            Err(FormatError::InvalidContext(format!(
                "{}x{} for {}",
                self.container_width,
                self.container_height,
                self.format_key()
            )))
        }
    }

    /// Width divided by height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.container_width / self.container_height
    }

    /// Orientation derived from the aspect ratio.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        let ratio = self.aspect_ratio();
        if (ratio - 1.0).abs() < SQUARE_TOLERANCE {
            Orientation::Square
        } else if ratio > 1.0 {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Key under which per-format overrides are stored.
    #[must_use]
    pub fn format_key(&self) -> String {
        format!("{}:{}", self.platform, self.format_name)
    }
}
