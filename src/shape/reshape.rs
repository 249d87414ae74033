//! Payload reshaping: one raw FicHub story object in, one normalized mapping out.
//!
//! The input is only read. Each output group (author, stats, fandoms, ...) is computed by
//! its own extraction function and then merged over a copy of the input, so the result does
//! not depend on the order in which groups are produced.

use crate::shape::error::ShapeError;
use crate::shape::lexicon::{camel_to_snake, parse_thousands, split_bracket_list};
use crate::shape::links::join_url;
use crate::shape::site::{classify, SiteKind};
use crate::shape::DescriptionFormat;
use serde_json::{json, Map, Value};

const AO3_BASE: &str = "https://www.archiveofourown.org";
const DEFAULT_LANGUAGE: &str = "English";
const DEFAULT_RATING: &str = "No Rating";
const EXTENDED_META_KEY: &str = "rawExtendedMeta";

/// AO3 extended-metadata keys that are consumed into dedicated fields rather than tags.
const AO3_CONSUMED_KEYS: [&str; 5] = ["stats", "rating", "fandom", "character", "language"];

/// FFN extended-metadata keys consumed into dedicated fields rather than `more_meta`.
const FFN_CONSUMED_KEYS: [&str; 9] = [
    "favorites",
    "follows",
    "reviews",
    "rated",
    "raw_fandom",
    "characters",
    "crossover",
    "genres",
    "language",
];

/// A raw payload after reshaping: the site tag plus a mapping whose keys match the
/// typed record's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStory {
    pub site: SiteKind,
    pub fields: Map<String, Value>,
}

impl NormalizedStory {
    /// The story's source URL (renamed from `source` to `url` during reshaping).
    pub fn source_url(&self) -> &str {
        self.fields.get("url").and_then(Value::as_str).unwrap_or_default()
    }
}

/// Reshape a raw story object, leaving the description as sent.
pub fn reshape(raw: &Map<String, Value>) -> Result<NormalizedStory, ShapeError> {
    reshape_with(raw, DescriptionFormat::Raw)
}

/// Reshape a raw story object, converting the description as requested.
pub fn reshape_with(
    raw: &Map<String, Value>,
    description: DescriptionFormat,
) -> Result<NormalizedStory, ShapeError> {
    let source_url = raw
        .get("source")
        .and_then(Value::as_str)
        .ok_or_else(|| ShapeError::shaping("source", "<unknown source>"))?;
    let site = classify(source_url);
    tracing::debug!(%site, source = source_url, "reshaping story payload");

    let mut collected = Map::new();
    collected.insert(
        "author".to_string(),
        Value::Object(collect_author(raw, site, source_url)?),
    );

    match extended_meta(raw, source_url)? {
        Some(meta) => {
            let group = match site {
                SiteKind::Ffn => ffn_group(meta, source_url)?,
                SiteKind::Ao3 => ao3_group(meta, source_url)?,
                SiteKind::Other => other_group(meta),
            };
            collected.extend(group);
            collected.insert(
                "language".to_string(),
                Value::String(optional_str(meta, "language", DEFAULT_LANGUAGE, source_url)?),
            );
        }
        None => tracing::debug!(source = source_url, "no extended metadata, using defaults"),
    }

    if let (DescriptionFormat::Markdown, Some(Value::String(html))) =
        (description, raw.get("description"))
    {
        collected.insert(
            "description".to_string(),
            Value::String(html2md::parse_html(html).trim().to_string()),
        );
    }
    collected.insert("url".to_string(), Value::String(source_url.to_string()));

    let mut fields = raw.clone();
    fields.remove("source");
    fields.extend(collected);
    Ok(NormalizedStory { site, fields })
}

/// Group every `author*` key under `author`, keyed by the snake_cased suffix
/// (`authorLocalId` -> `local_id`; bare `author` -> `name`).
fn collect_author(
    raw: &Map<String, Value>,
    site: SiteKind,
    source_url: &str,
) -> Result<Map<String, Value>, ShapeError> {
    let mut author = Map::new();
    for (key, value) in raw {
        let Some(suffix) = key.split("author").nth(1) else {
            continue;
        };
        let field = if suffix.is_empty() {
            "name".to_string()
        } else {
            camel_to_snake(suffix)
        };
        author.insert(field, value.clone());
    }

    // AO3 author links come back as bare paths.
    if site == SiteKind::Ao3 {
        let resolved = author
            .get("url")
            .and_then(Value::as_str)
            .and_then(|path| join_url(AO3_BASE, path))
            .ok_or_else(|| ShapeError::shaping("authorUrl", source_url))?;
        author.insert("url".to_string(), Value::String(resolved));
    }
    Ok(author)
}

/// `rawExtendedMeta`, if present and non-empty. Empty values of any type (`""`, `[]`,
/// `false`, `0`) count as absent; a non-empty value that is not an object is an error.
fn extended_meta<'a>(
    raw: &'a Map<String, Value>,
    source_url: &str,
) -> Result<Option<&'a Map<String, Value>>, ShapeError> {
    match raw.get(EXTENDED_META_KEY) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Object(meta)) if meta.is_empty() => Ok(None),
        Some(Value::Object(meta)) => Ok(Some(meta)),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::Array(items)) if items.is_empty() => Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(_) => Err(ShapeError::shaping(EXTENDED_META_KEY, source_url)),
    }
}

/// Every key of `meta` not listed in `consumed`.
fn leftovers(meta: &Map<String, Value>, consumed: &[&str]) -> Map<String, Value> {
    meta.iter()
        .filter(|(key, _)| !consumed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn ffn_group(meta: &Map<String, Value>, source_url: &str) -> Result<Map<String, Value>, ShapeError> {
    let stats = json!({
        "favorites": count(meta, "favorites", source_url)?,
        "follows": count(meta, "follows", source_url)?,
        "reviews": count(meta, "reviews", source_url)?,
    });
    let rating = required_str(meta, "rated", source_url)?;
    let fandoms = split_ffn_fandoms(required_str(meta, "raw_fandom", source_url)?);
    let characters = split_bracket_list(required_str(meta, "characters", source_url)?);
    let is_crossover = match meta.get("crossover") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(ShapeError::shaping("crossover", source_url)),
    };
    let genres = optional_str(meta, "genres", "", source_url)?;

    let mut group = Map::new();
    group.insert("stats".to_string(), stats);
    group.insert("rating".to_string(), Value::String(rating.to_string()));
    group.insert("fandoms".to_string(), json!(fandoms));
    group.insert("characters".to_string(), json!(characters));
    group.insert("is_crossover".to_string(), Value::Bool(is_crossover));
    group.insert("genres".to_string(), Value::String(genres));
    group.insert(
        "more_meta".to_string(),
        Value::Object(leftovers(meta, &FFN_CONSUMED_KEYS)),
    );
    Ok(group)
}

/// `"Harry Potter + Naruto Crossover"` -> `["Harry Potter", "Naruto"]`.
fn split_ffn_fandoms(raw_fandom: &str) -> Vec<String> {
    match raw_fandom.split_once(" + ") {
        Some((first, second)) => vec![
            first.to_string(),
            second.strip_suffix(" Crossover").unwrap_or(second).to_string(),
        ],
        None => vec![raw_fandom.to_string()],
    }
}

fn ao3_group(meta: &Map<String, Value>, source_url: &str) -> Result<Map<String, Value>, ShapeError> {
    let raw_stats = meta
        .get("stats")
        .and_then(Value::as_object)
        .ok_or_else(|| ShapeError::shaping("stats", source_url))?;
    let stats = json!({
        "bookmarks": count(raw_stats, "bookmarks", source_url)?,
        "comments": count(raw_stats, "comments", source_url)?,
        "hits": count(raw_stats, "hits", source_url)?,
        "kudos": count(raw_stats, "kudos", source_url)?,
    });
    // Only the first rating tag is kept.
    let rating = meta
        .get("rating")
        .and_then(Value::as_array)
        .and_then(|ratings| ratings.first())
        .and_then(Value::as_str)
        .ok_or_else(|| ShapeError::shaping("rating", source_url))?;
    let fandoms = string_list(meta, "fandom", source_url)?;
    let characters = string_list(meta, "character", source_url)?;
    let tags = leftovers(meta, &AO3_CONSUMED_KEYS);

    let mut group = Map::new();
    group.insert("stats".to_string(), stats);
    group.insert("rating".to_string(), Value::String(rating.to_string()));
    group.insert("is_crossover".to_string(), Value::Bool(fandoms.len() > 1));
    group.insert("fandoms".to_string(), Value::Array(fandoms));
    group.insert("characters".to_string(), Value::Array(characters));
    group.insert("tags".to_string(), Value::Object(tags));
    Ok(group)
}

fn other_group(meta: &Map<String, Value>) -> Map<String, Value> {
    let mut group = Map::new();
    group.insert("stats".to_string(), json!({}));
    group.insert("rating".to_string(), Value::String(DEFAULT_RATING.to_string()));
    group.insert("fandoms".to_string(), json!([]));
    group.insert("characters".to_string(), json!([]));
    group.insert("is_crossover".to_string(), Value::Bool(false));
    group.insert(
        "more_meta".to_string(),
        Value::Object(leftovers(meta, &["language"])),
    );
    group
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    source_url: &str,
) -> Result<&'a str, ShapeError> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ShapeError::shaping(key, source_url))
}

fn optional_str(
    obj: &Map<String, Value>,
    key: &str,
    default: &str,
    source_url: &str,
) -> Result<String, ShapeError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ShapeError::shaping(key, source_url)),
    }
}

fn string_list(
    obj: &Map<String, Value>,
    key: &str,
    source_url: &str,
) -> Result<Vec<Value>, ShapeError> {
    match obj.get(key) {
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(items.clone()),
        _ => Err(ShapeError::shaping(key, source_url)),
    }
}

/// A metric that may be `"1,234"`, a plain number, or absent (zero).
fn count(obj: &Map<String, Value>, key: &str, source_url: &str) -> Result<u64, ShapeError> {
    let parsed = match obj.get(key) {
        None | Some(Value::Null) => parse_thousands(None, "0").ok(),
        Some(Value::String(s)) => parse_thousands(Some(s), "0").ok(),
        Some(Value::Number(n)) => n.as_u64(),
        Some(_) => None,
    };
    parsed.ok_or_else(|| ShapeError::shaping(key, source_url))
}
