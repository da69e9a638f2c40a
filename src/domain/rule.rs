use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::{FetchError, Result};

/// One entry of a rule's feed table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedEntry {
    pub remote: Option<String>,
    /// Explicit cache file name inside the provider directory.
    pub cache: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_ssl: Option<bool>,
}

/// Values shared by every feed of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDefaults {
    pub remote: Option<String>,
    pub provider: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A feed rule file: defaults plus a table of named feeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// Per-invocation remote override; never read from the rule file.
    #[serde(skip)]
    pub remote: Option<String>,
    pub provider: Option<String>,
    pub defaults: RuleDefaults,
    pub feeds: BTreeMap<String, FeedEntry>,
}

impl Rule {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FetchError::RuleParse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| FetchError::RuleParse(format!("{}: {}", path.display(), e)))
    }

    /// A rule holding a single feed pointing at `remote`.
    pub fn single(feed: &str, remote: &str) -> Self {
        let mut feeds = BTreeMap::new();
        feeds.insert(
            feed.to_string(),
            FeedEntry {
                remote: Some(remote.to_string()),
                ..Default::default()
            },
        );
        Self {
            feeds,
            ..Default::default()
        }
    }

    pub fn feed(&self, name: &str) -> Option<&FeedEntry> {
        self.feeds.get(name)
    }

    pub fn feed_names(&self) -> impl Iterator<Item = &str> {
        self.feeds.keys().map(String::as_str)
    }
}
