//! ISE Search - Web search and page text collaborators
//!
//! - [`GoogleSearchClient`]: Google Custom Search JSON API
//! - [`HttpTextFetcher`]: downloads result pages and flattens HTML to text

pub mod fetch;
pub mod google;

pub use fetch::{html_to_text, HttpTextFetcher};
pub use google::GoogleSearchClient;
