use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data extracted from one successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub h1: String,
    pub first_paragraph: String,
    pub outgoing_links: Vec<String>,
    pub image_urls: Vec<String>,
}

impl PageRecord {
    pub fn new(url: String) -> Self {
        Self {
            url,
            h1: String::new(),
            first_paragraph: String::new(),
            outgoing_links: Vec::new(),
            image_urls: Vec::new(),
        }
    }
}

/// Frozen aggregate returned once every branch of a crawl has finished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub seed: String,
    /// Extracted pages keyed by normalized address.
    pub pages: BTreeMap<String, PageRecord>,
    /// Normalized keys that were admitted but produced no record.
    pub failed: Vec<String>,
    pub admitted: usize,
    pub limit_reached: bool,
}

impl CrawlOutcome {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages.values()
    }
}
