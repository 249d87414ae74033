//! Turning FicHub JSON into typed records: site detection, reshaping, and construction.
//!
//! Everything in here is synchronous and pure; the only input is the response body.

mod build;
mod error;
mod links;
mod reshape;

pub mod lexicon;
pub mod site;

pub use build::{build, parse_timestamp};
pub use error::ShapeError;
pub use links::{resolve_links, FICHUB_SITE_BASE};
pub use reshape::{reshape, reshape_with, NormalizedStory};
pub use site::{classify, SiteKind};

use crate::model::{Story, StoryDownloadBundle};
use serde::Deserialize;
use serde_json::{Map, Value};

/// How to treat the HTML description FicHub returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionFormat {
    /// Keep the description exactly as sent.
    #[default]
    Raw,
    /// Convert the HTML description to Markdown text.
    Markdown,
}

fn decode_object(raw: &[u8]) -> Result<Map<String, Value>, ShapeError> {
    match serde_json::from_slice(raw).map_err(|source| ShapeError::Decode { source })? {
        Value::Object(map) => Ok(map),
        _ => Err(ShapeError::NotAnObject),
    }
}

/// Parse a `/meta` response body into a [Story].
pub fn parse_story_metadata(raw: &[u8]) -> Result<Story, ShapeError> {
    parse_story_metadata_with(raw, DescriptionFormat::Raw)
}

pub fn parse_story_metadata_with(
    raw: &[u8],
    description: DescriptionFormat,
) -> Result<Story, ShapeError> {
    let payload = decode_object(raw)?;
    build(reshape_with(&payload, description)?)
}

/// Parse an `/epub` response body. Missing links fail the call; metadata that cannot be
/// shaped only leaves [StoryDownloadBundle::metadata] empty.
pub fn parse_story_download(raw: &[u8]) -> Result<StoryDownloadBundle, ShapeError> {
    parse_story_download_with(raw, DescriptionFormat::Raw)
}

pub fn parse_story_download_with(
    raw: &[u8],
    description: DescriptionFormat,
) -> Result<StoryDownloadBundle, ShapeError> {
    let payload = decode_object(raw)?;
    let meta = payload.get("meta").and_then(Value::as_object);
    let source_url = meta
        .and_then(|m| m.get("source"))
        .and_then(Value::as_str)
        .or_else(|| payload.get("q").and_then(Value::as_str))
        .unwrap_or("<unknown source>");

    let urls = payload
        .get("urls")
        .and_then(Value::as_object)
        .ok_or_else(|| ShapeError::shaping("urls", source_url))?;
    let links = resolve_links(urls, source_url)?;

    let metadata = match meta {
        Some(meta) => match reshape_with(meta, description).and_then(build) {
            Ok(story) => Some(story),
            Err(err) => {
                tracing::warn!(source = source_url, error = %err, "download metadata unusable, returning links only");
                None
            }
        },
        None => {
            tracing::warn!(source = source_url, "download response has no metadata object");
            None
        }
    };

    Ok(StoryDownloadBundle { links, metadata })
}
