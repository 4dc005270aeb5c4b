//! GitHub repository contents API as a [`cardscan_store::BlobStore`].

mod config;
mod contents;

pub use config::{GitHubConfig, DEFAULT_API_URL};
pub use contents::GitHubContentsClient;
