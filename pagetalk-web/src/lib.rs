//! Web content acquisition for the Pagetalk backend.
//!
//! - URL discovery and HTML-to-sections extraction (`extract`)
//! - Two-tier scrape orchestration with an explicit state machine (`scrape`)
//! - Rendered-fetch trait and Fantoccini-backed implementation (`browser`)
//! - TTL'd, size-bounded content cache over a key-value seam (`cache`)

pub mod browser;
pub mod cache;
pub mod extract;
pub mod scrape;
pub mod types;

pub use browser::{PageRenderer, WebDriverRenderer};
pub use cache::{ContentCache, KvStore, MemoryStore};
pub use extract::{extract_urls, parse_sections};
pub use scrape::{HttpFetcher, PageFetcher, ScrapeOrchestrator};
pub use types::{ScrapedContent, Section, SectionKind};
