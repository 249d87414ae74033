//! Site detection from a story's source URL.

use serde::Serialize;
use std::fmt;

const AO3_MARKER: &str = "archiveofourown.org";
const FFN_MARKER: &str = "fanfiction.net";

/// Which upstream site a story came from. Picks the reshaping rules and the record variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    /// Archive of Our Own.
    Ao3,
    /// FanFiction.net.
    Ffn,
    /// Any other site FicHub supports (SpaceBattles, Sufficient Velocity, ...).
    Other,
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SiteKind::Ao3 => "ao3",
            SiteKind::Ffn => "ffn",
            SiteKind::Other => "other",
        })
    }
}

/// Classify a source URL by substring. No URL parsing is done, so a string that merely
/// mentions a marker anywhere is classified by it. AO3 is checked first.
pub fn classify(source_url: &str) -> SiteKind {
    if source_url.contains(AO3_MARKER) {
        SiteKind::Ao3
    } else if source_url.contains(FFN_MARKER) {
        SiteKind::Ffn
    } else {
        SiteKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_ao3() {
        assert_eq!(
            classify("https://archiveofourown.org/works/45753478/"),
            SiteKind::Ao3
        );
        assert_eq!(
            classify("https://www.archiveofourown.org/works/51331387"),
            SiteKind::Ao3
        );
    }

    #[test]
    fn classify_ffn() {
        assert_eq!(
            classify("https://www.fanfiction.net/s/13274956/1/Harry-Potter-Squatter/"),
            SiteKind::Ffn
        );
    }

    #[test]
    fn classify_other() {
        assert_eq!(
            classify("https://forums.spacebattles.com/threads/nemesis-worm-au.747148"),
            SiteKind::Other
        );
        assert_eq!(classify(""), SiteKind::Other);
    }

    #[test]
    fn classify_both_markers_prefers_ao3() {
        let url = "https://www.fanfiction.net/s/1/?ref=archiveofourown.org";
        assert_eq!(classify(url), SiteKind::Ao3);
        assert_eq!(classify(url), classify(url));
    }

    #[test]
    fn classify_matches_substring_anywhere() {
        // Not a real AO3 host, still classified as AO3.
        assert_eq!(
            classify("https://example.com/archiveofourown.org-mirror"),
            SiteKind::Ao3
        );
    }

    #[test]
    fn site_kind_display() {
        assert_eq!(SiteKind::Ao3.to_string(), "ao3");
        assert_eq!(SiteKind::Ffn.to_string(), "ffn");
        assert_eq!(SiteKind::Other.to_string(), "other");
    }
}
