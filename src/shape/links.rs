//! Download-link resolution. FicHub may answer with site-relative paths.

use crate::model::DownloadLinks;
use crate::shape::error::ShapeError;
use reqwest::Url;
use serde_json::{Map, Value};

pub const FICHUB_SITE_BASE: &str = "https://fichub.net/";

/// Join `reference` onto `base` with standard URL-join rules: absolute references pass
/// through, relative ones are resolved.
pub(crate) fn join_url(base: &str, reference: &str) -> Option<String> {
    Url::parse(base)
        .and_then(|base| base.join(reference))
        .ok()
        .map(|url| url.to_string())
}

/// Resolve the `urls` object of a download response into absolute links.
pub fn resolve_links(raw: &Map<String, Value>, source_url: &str) -> Result<DownloadLinks, ShapeError> {
    let link = |key: &str| -> Result<String, ShapeError> {
        let reference = raw
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| ShapeError::shaping(key, source_url))?;
        join_url(FICHUB_SITE_BASE, reference).ok_or_else(|| ShapeError::shaping(key, source_url))
    };
    Ok(DownloadLinks {
        epub: link("epub")?,
        html: link("html")?,
        mobi: link("mobi")?,
        pdf: link("pdf")?,
    })
}
