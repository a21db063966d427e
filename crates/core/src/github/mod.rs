//! Repository metadata source.

mod client;
mod fetcher;
mod types;

pub use client::{GithubClient, GithubError};
pub use fetcher::RepositoryFetcher;
pub use types::*;
