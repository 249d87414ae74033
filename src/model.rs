//! Typed records produced from FicHub responses.
//!
//! A [Story] is built once by the shaping pipeline and never changed afterwards; its
//! fields are only reachable through accessors. Every record is `Eq + Hash` so stories
//! can be deduplicated in sets or used as map keys.

use crate::shape::SiteKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::hash::{Hash, Hasher};

/// The basic metadata of an author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Author {
    /// FicHub's own author id.
    pub id: i64,
    /// The author's id on the source site.
    pub local_id: String,
    pub name: String,
    /// Absolute URL of the author's profile on the source site.
    pub profile_url: String,
}

/// AO3 story metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Ao3Stats {
    pub bookmarks: u64,
    pub comments: u64,
    pub hits: u64,
    pub kudos: u64,
}

/// FFN story metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FfnStats {
    pub favorites: u64,
    pub follows: u64,
    pub reviews: u64,
}

/// Site-dependent metrics. Sites other than AO3 and FFN report none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum StoryStats {
    Ao3(Ao3Stats),
    Ffn(FfnStats),
    Empty,
}

/// Extended-metadata keys FicHub sent that have no dedicated field, kept as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraMeta(Map<String, Value>);

impl ExtraMeta {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for ExtraMeta {
    fn from(map: Map<String, Value>) -> Self {
        ExtraMeta(map)
    }
}

// Keys iterate in sorted order and equal values print identically, so this agrees with Eq.
impl Hash for ExtraMeta {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for (key, value) in &self.0 {
            key.hash(state);
            value.to_string().hash(state);
        }
    }
}

/// AO3 additional tags. Keys beyond the four named lists (`category_hrefs`, `series`, ...)
/// land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Tags {
    pub category: Vec<String>,
    pub freeform: Vec<String>,
    pub relationship: Vec<String>,
    pub warning: Vec<String>,
    #[serde(flatten)]
    pub extra: ExtraMeta,
}

/// The site-specific part of a [Story].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "site", rename_all = "lowercase")]
pub enum SiteDetails {
    Ao3 {
        is_crossover: bool,
        tags: Tags,
        stats: Ao3Stats,
    },
    Ffn {
        is_crossover: bool,
        genres: String,
        stats: FfnStats,
    },
    Other,
}

impl SiteDetails {
    pub fn kind(&self) -> SiteKind {
        match self {
            SiteDetails::Ao3 { .. } => SiteKind::Ao3,
            SiteDetails::Ffn { .. } => SiteKind::Ffn,
            SiteDetails::Other => SiteKind::Other,
        }
    }
}

/// The metadata of a work retrieved from FicHub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Story {
    author: Author,
    title: String,
    description: String,
    url: String,
    chapters: u64,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    status: String,
    words: u64,
    language: String,
    rating: String,
    fandoms: Vec<String>,
    characters: Vec<String>,
    #[serde(skip_serializing_if = "ExtraMeta::is_empty")]
    more_meta: ExtraMeta,
    #[serde(flatten)]
    details: SiteDetails,
}

/// Field values for [Story::new]; only the shaping pipeline assembles these.
pub(crate) struct StoryParts {
    pub author: Author,
    pub title: String,
    pub description: String,
    pub url: String,
    pub chapters: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub status: String,
    pub words: u64,
    pub language: String,
    pub rating: String,
    pub fandoms: Vec<String>,
    pub characters: Vec<String>,
    pub more_meta: ExtraMeta,
    pub details: SiteDetails,
}

impl Story {
    pub(crate) fn new(parts: StoryParts) -> Self {
        Story {
            author: parts.author,
            title: parts.title,
            description: parts.description,
            url: parts.url,
            chapters: parts.chapters,
            created: parts.created,
            updated: parts.updated,
            status: parts.status,
            words: parts.words,
            language: parts.language,
            rating: parts.rating,
            fandoms: parts.fandoms,
            characters: parts.characters,
            more_meta: parts.more_meta,
            details: parts.details,
        }
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Summary text. HTML as sent by FicHub, or Markdown when cleaned by the client.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The source URL of the story.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn chapters(&self) -> u64 {
        self.chapters
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// Completion status, e.g. "ongoing" or "complete".
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn words(&self) -> u64 {
        self.words
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn rating(&self) -> &str {
        &self.rating
    }

    pub fn fandoms(&self) -> &[String] {
        &self.fandoms
    }

    pub fn characters(&self) -> &[String] {
        &self.characters
    }

    /// Unmapped FFN or other-site extended metadata. AO3 leftovers are in [Story::tags].
    pub fn more_meta(&self) -> &ExtraMeta {
        &self.more_meta
    }

    pub fn details(&self) -> &SiteDetails {
        &self.details
    }

    pub fn site(&self) -> SiteKind {
        self.details.kind()
    }

    /// Whether the story spans more than one fandom. Always false for other sites.
    pub fn is_crossover(&self) -> bool {
        match &self.details {
            SiteDetails::Ao3 { is_crossover, .. } | SiteDetails::Ffn { is_crossover, .. } => {
                *is_crossover
            }
            SiteDetails::Other => false,
        }
    }

    pub fn stats(&self) -> StoryStats {
        match &self.details {
            SiteDetails::Ao3 { stats, .. } => StoryStats::Ao3(*stats),
            SiteDetails::Ffn { stats, .. } => StoryStats::Ffn(*stats),
            SiteDetails::Other => StoryStats::Empty,
        }
    }

    /// AO3 tags, if this is an AO3 story.
    pub fn tags(&self) -> Option<&Tags> {
        match &self.details {
            SiteDetails::Ao3 { tags, .. } => Some(tags),
            _ => None,
        }
    }

    /// FFN genres, if this is an FFN story.
    pub fn genres(&self) -> Option<&str> {
        match &self.details {
            SiteDetails::Ffn { genres, .. } => Some(genres),
            _ => None,
        }
    }
}

/// Download links for a story. FicHub generates these in its cache, so they expire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DownloadLinks {
    pub epub: String,
    pub html: String,
    pub mobi: String,
    pub pdf: String,
}

/// Result of a download lookup. `metadata` is `None` when the embedded metadata could not
/// be shaped; the links are still usable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StoryDownloadBundle {
    pub links: DownloadLinks,
    pub metadata: Option<Story>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::error::Error;

    fn sample_story(details: SiteDetails) -> Story {
        let ts = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap();
        Story::new(StoryParts {
            author: Author {
                id: 7,
                local_id: "someone".to_string(),
                name: "Someone".to_string(),
                profile_url: "https://www.archiveofourown.org/users/someone".to_string(),
            },
            title: "A Title".to_string(),
            description: "A summary.".to_string(),
            url: "https://archiveofourown.org/works/1".to_string(),
            chapters: 3,
            created: ts,
            updated: ts,
            status: "ongoing".to_string(),
            words: 12000,
            language: "English".to_string(),
            rating: "Teen And Up Audiences".to_string(),
            fandoms: vec!["Harry Potter - J. K. Rowling".to_string()],
            characters: vec!["Harry Potter".to_string()],
            more_meta: ExtraMeta::default(),
            details,
        })
    }

    #[test]
    fn stories_are_hashable_and_deduplicate() {
        let a = sample_story(SiteDetails::Other);
        let b = a.clone();
        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn accessors_follow_site_details() {
        let story = sample_story(SiteDetails::Ffn {
            is_crossover: true,
            genres: "Adventure/Humor".to_string(),
            stats: FfnStats {
                favorites: 10,
                follows: 20,
                reviews: 30,
            },
        });
        assert_eq!(story.site(), SiteKind::Ffn);
        assert!(story.is_crossover());
        assert_eq!(story.genres(), Some("Adventure/Humor"));
        assert!(story.tags().is_none());
        assert_eq!(
            story.stats(),
            StoryStats::Ffn(FfnStats {
                favorites: 10,
                follows: 20,
                reviews: 30
            })
        );

        let other = sample_story(SiteDetails::Other);
        assert!(!other.is_crossover());
        assert_eq!(other.stats(), StoryStats::Empty);
    }

    #[test]
    fn story_serializes_with_site_tag() -> Result<(), Box<dyn Error>> {
        let story = sample_story(SiteDetails::Ao3 {
            is_crossover: false,
            tags: Tags {
                freeform: vec!["Fluff".to_string()],
                ..Tags::default()
            },
            stats: Ao3Stats {
                kudos: 5,
                ..Ao3Stats::default()
            },
        });
        let value = serde_json::to_value(&story)?;
        assert_eq!(value["site"], "ao3");
        assert_eq!(value["title"], "A Title");
        assert_eq!(value["stats"]["kudos"], 5);
        assert_eq!(value["tags"]["freeform"][0], "Fluff");
        assert_eq!(value["author"]["profile_url"], story.author().profile_url);
        assert!(value.get("more_meta").is_none());
        Ok(())
    }

    fn extra(value: serde_json::Value) -> ExtraMeta {
        match value {
            serde_json::Value::Object(map) => ExtraMeta::from(map),
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn extra_metadata_is_serialized_and_hashed() -> Result<(), Box<dyn Error>> {
        let tags = Tags {
            extra: extra(serde_json::json!({"category_hrefs": ["/tags/Gen/works"]})),
            ..Tags::default()
        };
        let ao3 = sample_story(SiteDetails::Ao3 {
            is_crossover: false,
            tags,
            stats: Ao3Stats::default(),
        });
        let value = serde_json::to_value(&ao3)?;
        assert_eq!(value["tags"]["category_hrefs"][0], "/tags/Gen/works");

        let mut first = sample_story(SiteDetails::Other);
        first.more_meta = extra(serde_json::json!({"published": "2020-01-01", "id": 5}));
        let mut reordered = first.clone();
        reordered.more_meta = extra(serde_json::json!({"id": 5, "published": "2020-01-01"}));
        let mut changed = first.clone();
        changed.more_meta = extra(serde_json::json!({"id": 6, "published": "2020-01-01"}));
        assert_eq!(serde_json::to_value(&first)?["more_meta"]["id"], 5);

        let set: HashSet<Story> = [first, reordered, changed].into_iter().collect();
        assert_eq!(set.len(), 2);
        Ok(())
    }
}
