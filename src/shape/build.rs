//! Typed construction: normalized mapping -> immutable [Story].

use crate::model::{Ao3Stats, Author, ExtraMeta, FfnStats, SiteDetails, Story, StoryParts, Tags};
use crate::shape::error::ShapeError;
use crate::shape::reshape::NormalizedStory;
use crate::shape::site::SiteKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

fn default_language() -> String {
    "English".to_string()
}

fn default_rating() -> String {
    "No Rating".to_string()
}

#[derive(Debug, Deserialize)]
struct AuthorFields {
    id: i64,
    local_id: String,
    name: String,
    url: String,
}

/// Fields every variant requires. Timestamps stay strings until [parse_timestamp].
#[derive(Debug, Deserialize)]
struct CommonFields {
    author: AuthorFields,
    title: String,
    description: String,
    url: String,
    chapters: u64,
    created: String,
    updated: String,
    status: String,
    words: u64,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default = "default_rating")]
    rating: String,
    #[serde(default)]
    fandoms: Vec<String>,
    #[serde(default)]
    characters: Vec<String>,
    #[serde(default)]
    more_meta: ExtraMeta,
}

#[derive(Debug, Deserialize)]
struct Ao3Fields {
    #[serde(default)]
    is_crossover: bool,
    #[serde(default)]
    tags: Tags,
    #[serde(default)]
    stats: Ao3Stats,
}

#[derive(Debug, Deserialize)]
struct FfnFields {
    #[serde(default)]
    is_crossover: bool,
    #[serde(default)]
    genres: String,
    #[serde(default)]
    stats: FfnStats,
}

fn validation(err: serde_json::Error) -> ShapeError {
    ShapeError::Validation {
        reason: err.to_string(),
    }
}

/// Build the story variant selected by `normalized.site`. Unknown keys are ignored.
pub fn build(normalized: NormalizedStory) -> Result<Story, ShapeError> {
    let NormalizedStory { site, fields } = normalized;
    let value = Value::Object(fields);

    let common = CommonFields::deserialize(&value).map_err(validation)?;
    let details = match site {
        SiteKind::Ao3 => {
            let ext = Ao3Fields::deserialize(&value).map_err(validation)?;
            SiteDetails::Ao3 {
                is_crossover: ext.is_crossover,
                tags: ext.tags,
                stats: ext.stats,
            }
        }
        SiteKind::Ffn => {
            let ext = FfnFields::deserialize(&value).map_err(validation)?;
            SiteDetails::Ffn {
                is_crossover: ext.is_crossover,
                genres: ext.genres,
                stats: ext.stats,
            }
        }
        SiteKind::Other => SiteDetails::Other,
    };

    Ok(Story::new(StoryParts {
        author: Author {
            id: common.author.id,
            local_id: common.author.local_id,
            name: common.author.name,
            profile_url: common.author.url,
        },
        created: parse_timestamp("created", &common.created)?,
        updated: parse_timestamp("updated", &common.updated)?,
        title: common.title,
        description: common.description,
        url: common.url,
        chapters: common.chapters,
        status: common.status,
        words: common.words,
        language: common.language,
        rating: common.rating,
        fandoms: common.fandoms,
        characters: common.characters,
        more_meta: common.more_meta,
        details,
    }))
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC; a bare date is
/// midnight UTC.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, ShapeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ShapeError::MalformedTimestamp {
            field,
            value: value.to_string(),
        })
}
