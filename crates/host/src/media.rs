//! `matchMedia` capability.
//!
//! Queries are typed rather than raw CSS strings so that hosts and test
//! doubles dispatch on structure; [`MediaQuery::to_css`] produces the exact
//! query text a browser binding would feed to `window.matchMedia`.

/// Discrete media features probed by the screen collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFeature {
    Orientation,
    DisplayMode,
    Pointer,
    Hover,
    AnyPointer,
    AnyHover,
    OverflowBlock,
    OverflowInline,
    Update,
    Scripting,
}

impl MediaFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFeature::Orientation => "orientation",
            MediaFeature::DisplayMode => "display-mode",
            MediaFeature::Pointer => "pointer",
            MediaFeature::Hover => "hover",
            MediaFeature::AnyPointer => "any-pointer",
            MediaFeature::AnyHover => "any-hover",
            MediaFeature::OverflowBlock => "overflow-block",
            MediaFeature::OverflowInline => "overflow-inline",
            MediaFeature::Update => "update",
            MediaFeature::Scripting => "scripting",
        }
    }
}

/// One media query, as the screen collector phrases them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaQuery {
    MinWidth(u32),
    MaxWidth(u32),
    MinHeight(u32),
    MaxHeight(u32),
    /// `min-resolution` in density-independent pixels per px (`dppx`).
    MinResolution(f64),
    /// `min-color` in bits per color channel.
    MinColor(u32),
    /// A discrete feature probe, e.g. `(pointer: coarse)`.
    Feature(MediaFeature, &'static str),
}

impl MediaQuery {
    /// The CSS text a browser binding passes to `matchMedia`.
    pub fn to_css(&self) -> String {
        match self {
            MediaQuery::MinWidth(px) => format!("(min-width: {px}px)"),
            MediaQuery::MaxWidth(px) => format!("(max-width: {px}px)"),
            MediaQuery::MinHeight(px) => format!("(min-height: {px}px)"),
            MediaQuery::MaxHeight(px) => format!("(max-height: {px}px)"),
            MediaQuery::MinResolution(dppx) => format!("(min-resolution: {dppx}dppx)"),
            MediaQuery::MinColor(bits) => format!("(min-color: {bits})"),
            MediaQuery::Feature(feature, value) => format!("({}: {value})", feature.as_str()),
        }
    }
}

/// The `matchMedia` surface. This is the only screen-related host API the
/// collectors consult; `window.screen` is never trusted.
pub trait MediaMatcher {
    fn matches(&self, query: &MediaQuery) -> bool;

    /// The host's reported device pixel ratio, used only as a fallback when
    /// no `min-resolution` table entry matches.
    fn device_pixel_ratio(&self) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_query_text() {
        assert_eq!(MediaQuery::MinWidth(1280).to_css(), "(min-width: 1280px)");
        assert_eq!(MediaQuery::MaxHeight(8192).to_css(), "(max-height: 8192px)");
        assert_eq!(MediaQuery::MinResolution(1.5).to_css(), "(min-resolution: 1.5dppx)");
        assert_eq!(MediaQuery::MinColor(8).to_css(), "(min-color: 8)");
        assert_eq!(
            MediaQuery::Feature(MediaFeature::AnyPointer, "fine").to_css(),
            "(any-pointer: fine)"
        );
    }
}
