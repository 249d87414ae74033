//! fichub: client for the FicHub fan-fiction metadata API.
//!
//! FicHub answers with site-specific JSON; [shape] normalizes it into typed [Story]
//! records for AO3, FFN, and every other site.

pub mod cli;
pub mod client;
pub mod config;
pub mod model;
pub mod shape;

// Re-exports for CLI and consumers.
pub use client::{
    ClientError, FicHubClient, FicHubClientBuilder, HttpTransport, Transport, TransportError,
};
pub use model::{
    Ao3Stats, Author, DownloadLinks, ExtraMeta, FfnStats, SiteDetails, Story,
    StoryDownloadBundle, StoryStats, Tags,
};
pub use shape::{
    classify, parse_story_download, parse_story_metadata, DescriptionFormat, ShapeError,
    SiteKind,
};
