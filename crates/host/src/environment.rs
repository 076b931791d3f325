//! Browser-environment classification.
//!
//! Collectors branch on a small set of engine facts (WebKit lineage, Safari
//! vs. embedded WebKit, mobile class, major version) because the noise
//! countermeasures differ per engine generation. The oracle is deliberately
//! an external seam: a real deployment answers from the user agent plus
//! live feature probes, while [`UserAgentOracle`] gives a best-effort
//! answer from the UA string alone.

use serde::{Deserialize, Serialize};

/// Pure predicates over the host's user agent and feature probes.
///
/// Every method must be a pure function of the environment: same host, same
/// answers, no side effects.
pub trait EnvironmentOracle {
    /// True for any WebKit-derived engine (Safari, iOS browsers, GNOME Web…).
    fn is_webkit(&self) -> bool;

    /// True for Safari the product, as opposed to other WebKit embedders.
    fn is_safari(&self) -> bool;

    /// True when the engine is genuine Safari WebKit (the builds that ship
    /// Apple's anti-fingerprinting noise), not a look-alike UA.
    fn is_safari_webkit(&self) -> bool;

    /// True when the WebKit build is 616 or newer (Safari 17 era), the
    /// generation that clamps canvas readback noise per 8-neighbourhood.
    fn is_webkit616_or_newer(&self) -> bool;

    /// True for Samsung Internet.
    fn is_samsung_internet(&self) -> bool;

    /// True for phone/tablet class hosts.
    fn is_mobile(&self) -> bool;

    /// Major version of the browser product, when recoverable.
    fn browser_major_version(&self) -> Option<u32>;
}

/// Immutable snapshot of the environment, computed once per top-level call
/// and passed into the collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentClass {
    pub is_webkit: bool,
    pub is_safari_webkit: bool,
    pub is_mobile: bool,
    pub is_samsung_internet: bool,
    pub major_version: Option<u32>,
    pub is_webkit616_or_newer: bool,
}

impl EnvironmentClass {
    /// Snapshot the oracle. Collectors never consult the oracle again after
    /// this point, so a mid-call environment change cannot tear a result.
    pub fn detect(oracle: &impl EnvironmentOracle) -> Self {
        Self {
            is_webkit: oracle.is_webkit(),
            is_safari_webkit: oracle.is_safari_webkit(),
            is_mobile: oracle.is_mobile(),
            is_samsung_internet: oracle.is_samsung_internet(),
            major_version: oracle.browser_major_version(),
            is_webkit616_or_newer: oracle.is_webkit616_or_newer(),
        }
    }
}

/// Oracle backed by a user-agent string alone.
///
/// Feature-probe questions are approximated: the UA freezes
/// `AppleWebKit/605.1.15`, so the 616-or-newer answer is derived from the
/// Safari product version instead of the (unrecoverable) engine build.
#[derive(Debug, Clone)]
pub struct UserAgentOracle {
    ua: String,
}

impl UserAgentOracle {
    pub fn new(user_agent: &str) -> Self {
        Self {
            ua: user_agent.to_lowercase(),
        }
    }

    fn version_after(&self, prefix: &str) -> Option<u32> {
        let start = self.ua.find(prefix)? + prefix.len();
        let digits: String = self.ua[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

impl EnvironmentOracle for UserAgentOracle {
    fn is_webkit(&self) -> bool {
        self.ua.contains("applewebkit")
    }

    fn is_safari(&self) -> bool {
        self.ua.contains("safari")
            && !self.ua.contains("chrome")
            && !self.ua.contains("chromium")
            && !self.ua.contains("crios")
            && !self.ua.contains("android")
    }

    fn is_safari_webkit(&self) -> bool {
        self.is_safari() && self.is_webkit() && !self.is_samsung_internet()
    }

    fn is_webkit616_or_newer(&self) -> bool {
        self.is_safari_webkit() && self.browser_major_version().map_or(false, |v| v >= 17)
    }

    fn is_samsung_internet(&self) -> bool {
        self.ua.contains("samsungbrowser")
    }

    fn is_mobile(&self) -> bool {
        self.ua.contains("mobile")
            || self.ua.contains("iphone")
            || self.ua.contains("ipad")
            || self.ua.contains("android")
    }

    fn browser_major_version(&self) -> Option<u32> {
        self.version_after("version/")
            .or_else(|| self.version_after("samsungbrowser/"))
            .or_else(|| self.version_after("firefox/"))
            .or_else(|| self.version_after("chrome/"))
    }
}
