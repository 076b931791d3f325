//! Screen entropy source, reconstructed entirely from `matchMedia`.
//!
//! Hosts routinely lie about `window.screen`, but `matchMedia` has to
//! answer dimension queries truthfully or break responsive layouts. Each
//! dimension is therefore bisected: the largest matching `min-*` bound and
//! the smallest matching `max-*` bound bracket the true value to within
//! ten pixels. Discrete features are probed against their closed value
//! sets in a fixed order, first match wins.

use log::debug;
use serde::{Deserialize, Serialize};
use tracelight_host::{MediaFeature, MediaMatcher, MediaQuery};

use crate::stabilize::bracket_search;

/// Upper end of the probed dimension range. A power of two keeps both
/// bisections on the same dyadic grid, which is what bounds the combined
/// bracket width.
const DIMENSION_LIMIT: u32 = 8192;
const BRACKET_TOLERANCE: u32 = 10;

const PIXEL_RATIO_TABLE: [f64; 13] = [
    0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0, 2.25, 2.5, 2.75, 3.0, 3.5, 4.0,
];

const COLOR_DEPTH_TABLE: [u32; 8] = [1, 4, 8, 12, 16, 24, 30, 48];

/// Integer bracket around a true dimension: `low ≤ actual ≤ high`,
/// `high − low ≤ 10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionBracket {
    pub low: u32,
    pub high: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    Fullscreen,
    Standalone,
    MinimalUi,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerAccuracy {
    None,
    Coarse,
    Fine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoverCapability {
    None,
    Hover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowBlock {
    None,
    Scroll,
    OptionalPaged,
    Paged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowInline {
    None,
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateFrequency {
    None,
    Slow,
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scripting {
    None,
    InitialOnly,
    Enabled,
}

/// Everything the screen source can learn through `matchMedia`. `None`
/// feature fields mean the host answered no probe for that feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenMediaQueries {
    pub width: DimensionBracket,
    pub height: DimensionBracket,
    pub orientation: Option<Orientation>,
    pub display_mode: Option<DisplayMode>,
    pub pointer: Option<PointerAccuracy>,
    pub hover: Option<HoverCapability>,
    pub any_pointer: Option<PointerAccuracy>,
    pub any_hover: Option<HoverCapability>,
    pub overflow_block: Option<OverflowBlock>,
    pub overflow_inline: Option<OverflowInline>,
    pub update: Option<UpdateFrequency>,
    pub scripting: Option<Scripting>,
    pub pixel_ratio: f64,
    /// Highest matching `min-color` bit depth, 0 when nothing matched.
    pub color_depth: u32,
}

/// Probes the host's `matchMedia` surface. Fully synchronous and never
/// fails; a host that refuses every probe yields sentinels and degenerate
/// brackets.
pub fn get_screen_media_queries(matcher: &impl MediaMatcher) -> ScreenMediaQueries {
    let width = probe_dimension(matcher, MediaQuery::MinWidth, MediaQuery::MaxWidth);
    let height = probe_dimension(matcher, MediaQuery::MinHeight, MediaQuery::MaxHeight);
    debug!("dimension brackets: width {width:?}, height {height:?}");
    ScreenMediaQueries {
        width,
        height,
        orientation: probe_feature(
            matcher,
            MediaFeature::Orientation,
            &[
                (Orientation::Portrait, "portrait"),
                (Orientation::Landscape, "landscape"),
            ],
        ),
        display_mode: probe_feature(
            matcher,
            MediaFeature::DisplayMode,
            &[
                (DisplayMode::Fullscreen, "fullscreen"),
                (DisplayMode::Standalone, "standalone"),
                (DisplayMode::MinimalUi, "minimal-ui"),
                (DisplayMode::Browser, "browser"),
            ],
        ),
        pointer: probe_feature(
            matcher,
            MediaFeature::Pointer,
            &[
                (PointerAccuracy::None, "none"),
                (PointerAccuracy::Coarse, "coarse"),
                (PointerAccuracy::Fine, "fine"),
            ],
        ),
        hover: probe_feature(
            matcher,
            MediaFeature::Hover,
            &[
                (HoverCapability::None, "none"),
                (HoverCapability::Hover, "hover"),
            ],
        ),
        // any-pointer can match several values at once; prefer fine
        any_pointer: probe_feature(
            matcher,
            MediaFeature::AnyPointer,
            &[
                (PointerAccuracy::Fine, "fine"),
                (PointerAccuracy::Coarse, "coarse"),
                (PointerAccuracy::None, "none"),
            ],
        ),
        any_hover: probe_feature(
            matcher,
            MediaFeature::AnyHover,
            &[
                (HoverCapability::Hover, "hover"),
                (HoverCapability::None, "none"),
            ],
        ),
        overflow_block: probe_feature(
            matcher,
            MediaFeature::OverflowBlock,
            &[
                (OverflowBlock::None, "none"),
                (OverflowBlock::Scroll, "scroll"),
                (OverflowBlock::OptionalPaged, "optional-paged"),
                (OverflowBlock::Paged, "paged"),
            ],
        ),
        overflow_inline: probe_feature(
            matcher,
            MediaFeature::OverflowInline,
            &[
                (OverflowInline::None, "none"),
                (OverflowInline::Scroll, "scroll"),
            ],
        ),
        update: probe_feature(
            matcher,
            MediaFeature::Update,
            &[
                (UpdateFrequency::None, "none"),
                (UpdateFrequency::Slow, "slow"),
                (UpdateFrequency::Fast, "fast"),
            ],
        ),
        scripting: probe_feature(
            matcher,
            MediaFeature::Scripting,
            &[
                (Scripting::None, "none"),
                (Scripting::InitialOnly, "initial-only"),
                (Scripting::Enabled, "enabled"),
            ],
        ),
        pixel_ratio: probe_pixel_ratio(matcher),
        color_depth: probe_color_depth(matcher),
    }
}

/// Two independent bisections per dimension: the largest matching `min-*`
/// bound from below, the smallest matching `max-*` bound from above.
fn probe_dimension(
    matcher: &impl MediaMatcher,
    min_query: fn(u32) -> MediaQuery,
    max_query: fn(u32) -> MediaQuery,
) -> DimensionBracket {
    let (low, _) = bracket_search(DIMENSION_LIMIT, BRACKET_TOLERANCE, |m| {
        matcher.matches(&min_query(m))
    });
    let (_, high) = bracket_search(DIMENSION_LIMIT, BRACKET_TOLERANCE, |m| {
        !matcher.matches(&max_query(m))
    });
    DimensionBracket { low, high }
}

fn probe_feature<T: Copy>(
    matcher: &impl MediaMatcher,
    feature: MediaFeature,
    candidates: &[(T, &'static str)],
) -> Option<T> {
    candidates
        .iter()
        .find(|entry| matcher.matches(&MediaQuery::Feature(feature, entry.1)))
        .map(|entry| entry.0)
}

fn probe_pixel_ratio(matcher: &impl MediaMatcher) -> f64 {
    for ratio in PIXEL_RATIO_TABLE.iter().rev() {
        if matcher.matches(&MediaQuery::MinResolution(*ratio)) {
            return *ratio;
        }
    }
    matcher.device_pixel_ratio().unwrap_or(1.0)
}

fn probe_color_depth(matcher: &impl MediaMatcher) -> u32 {
    COLOR_DEPTH_TABLE
        .iter()
        .rev()
        .find(|bits| matcher.matches(&MediaQuery::MinColor(**bits)))
        .copied()
        .unwrap_or(0)
}
