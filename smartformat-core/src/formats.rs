//! Built-in catalogue of platform formats.

use crate::LayoutContext;

/// A named platform format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformFormat {
    /// Platform identifier.
    pub platform: &'static str,
    /// Format name.
    pub name: &'static str,
    /// Canvas width.
    pub width: f32,
    /// Canvas height.
    pub height: f32,
}

impl PlatformFormat {
    /// The format as a layout context.
    #[must_use]
    pub fn context(&self) -> LayoutContext {
        LayoutContext {
            container_width: self.width,
            container_height: self.height,
            platform: self.platform.to_string(),
            format_name: self.name.to_string(),
        }
    }
}

const fn entry(
    platform: &'static str,
    name: &'static str,
    width: f32,
    height: f32,
) -> PlatformFormat {
    PlatformFormat {
        platform,
        name,
        width,
        height,
    }
}

/// Known platform formats.
pub const FORMATS: &[PlatformFormat] = &[
    entry("instagram", "post", 1080.0, 1080.0),
    entry("instagram", "portrait", 1080.0, 1350.0),
    entry("instagram", "story", 1080.0, 1920.0),
    entry("facebook", "post", 1200.0, 630.0),
    entry("facebook", "story", 1080.0, 1920.0),
    entry("twitter", "post", 1600.0, 900.0),
    entry("linkedin", "post", 1200.0, 627.0),
    entry("youtube", "thumbnail", 1280.0, 720.0),
    entry("pinterest", "pin", 1000.0, 1500.0),
    entry("tiktok", "video", 1080.0, 1920.0),
];

/// Look up a format by platform and name (case-insensitive).
#[must_use]
pub fn lookup(platform: &str, name: &str) -> Option<LayoutContext> {
    FORMATS
        .iter()
        .find(|f| f.platform.eq_ignore_ascii_case(platform) && f.name.eq_ignore_ascii_case(name))
        .map(PlatformFormat::context)
}

/// Look up a format by its `platform:name` key.
#[must_use]
pub fn lookup_key(key: &str) -> Option<LayoutContext> {
    let (platform, name) = key.split_once(':')?;
    lookup(platform, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Orientation;

    #[test]
    fn test_lookup() {
        let story = lookup("Instagram", "STORY").expect("story exists");
        assert!((story.container_height - 1920.0).abs() < f32::EPSILON);
        assert_eq!(story.orientation(), Orientation::Portrait);
        assert!(lookup("myspace", "post").is_none());
    }

    #[test]
    fn test_lookup_key_round_trips() {
        for format in FORMATS {
            let ctx = format.context();
            assert_eq!(lookup_key(&ctx.format_key()), Some(ctx));
        }
        assert!(lookup_key("no-colon").is_none());
    }

    #[test]
    fn test_all_formats_are_valid_contexts() {
        for format in FORMATS {
            assert!(format.context().check().is_ok(), "{} {}", format.platform, format.name);
        }
    }
}
