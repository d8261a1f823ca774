use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of one extracted content unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Heading,
    Paragraph,
    List,
}

impl SectionKind {
    /// Uppercase label used when rendering sections into the model context.
    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::Heading => "HEADING",
            SectionKind::Paragraph => "PARAGRAPH",
            SectionKind::List => "LIST",
        }
    }
}

/// One extracted content unit. `content` is trimmed plain text and may be
/// empty if the source element carried no text, but is never absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub content: String,
}

/// Result of processing one URL.
///
/// `sections` is empty only when both scrape tiers failed or matched no
/// elements; `title` is empty in that case too. `cached_at` is stamped only
/// when the value was written into the content cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedContent {
    pub url: String,
    pub title: String,
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

impl ScrapedContent {
    /// The degraded result every failure path collapses to.
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            sections: Vec::new(),
            cached_at: None,
        }
    }
}
