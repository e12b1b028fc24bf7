//! Region classification by keyword.

use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::settings::RegionConfig;

/// Label returned when neither table matches.
pub const UNKNOWN_REGION: &str = "unknown";

#[derive(Debug, Clone)]
struct KeywordEntry {
    keyword: String,
    region: String,
}

#[derive(Debug, Default)]
struct KeywordTables {
    /// Sorted longest first; equal lengths keep insertion order.
    name_keywords: Vec<KeywordEntry>,
    server_keywords: Vec<KeywordEntry>,
}

impl KeywordTables {
    fn build<N, S, K, V>(name_keywords: N, server_keywords: S) -> Self
    where
        N: IntoIterator<Item = (K, V)>,
        S: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut names = collect_entries(name_keywords);
        // Stable sort, so ties stay in insertion order.
        names.sort_by_key(|entry| std::cmp::Reverse(entry.keyword.chars().count()));
        Self {
            name_keywords: names,
            server_keywords: collect_entries(server_keywords),
        }
    }
}

fn collect_entries<I, K, V>(entries: I) -> Vec<KeywordEntry>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    entries
        .into_iter()
        .filter(|(k, _)| !k.as_ref().trim().is_empty())
        .map(|(k, v)| KeywordEntry {
            keyword: k.as_ref().to_lowercase(),
            region: v.into(),
        })
        .collect()
}

/// Maps a node's display name and server address to a region label.
///
/// Name keywords are tried first, longest keyword first, so a name carrying
/// `HKG-PREMIUM` is not claimed by a shorter `HK` entry. Server keywords are
/// tried next in insertion order. Both comparisons ignore case.
///
/// Tables can be swapped at runtime with [`RegionMatcher::reload`]; readers
/// always see either the old or the new pair, never a mix.
#[derive(Debug, Default)]
pub struct RegionMatcher {
    tables: RwLock<Arc<KeywordTables>>,
}

impl RegionMatcher {
    pub fn new<N, S, K, V>(name_keywords: N, server_keywords: S) -> Self
    where
        N: IntoIterator<Item = (K, V)>,
        S: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            tables: RwLock::new(Arc::new(KeywordTables::build(
                name_keywords,
                server_keywords,
            ))),
        }
    }

    pub fn from_config(config: &RegionConfig) -> Self {
        Self::new(
            config.region_map.iter().map(|(k, v)| (k.as_str(), v.clone())),
            config.server_map.iter().map(|(k, v)| (k.as_str(), v.clone())),
        )
    }

    fn snapshot(&self) -> Arc<KeywordTables> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn match_region(&self, name: &str, server: &str) -> String {
        let tables = self.snapshot();

        let name = name.to_lowercase();
        if let Some(entry) = tables
            .name_keywords
            .iter()
            .find(|entry| name.contains(&entry.keyword))
        {
            return entry.region.clone();
        }

        let server = server.to_lowercase();
        tables
            .server_keywords
            .iter()
            .find(|entry| server.contains(&entry.keyword))
            .map(|entry| entry.region.clone())
            .unwrap_or_else(|| UNKNOWN_REGION.to_string())
    }

    /// Replaces both tables at once.
    pub fn reload<N, S, K, V>(&self, name_keywords: N, server_keywords: S)
    where
        N: IntoIterator<Item = (K, V)>,
        S: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let tables = Arc::new(KeywordTables::build(name_keywords, server_keywords));
        debug!(
            "Reloading region matcher: {} name keywords, {} server keywords",
            tables.name_keywords.len(),
            tables.server_keywords.len()
        );
        *self.tables.write().unwrap_or_else(PoisonError::into_inner) = tables;
    }

    pub fn reload_config(&self, config: &RegionConfig) {
        self.reload(
            config.region_map.iter().map(|(k, v)| (k.as_str(), v.clone())),
            config.server_map.iter().map(|(k, v)| (k.as_str(), v.clone())),
        );
    }

    pub fn is_empty(&self) -> bool {
        let tables = self.snapshot();
        tables.name_keywords.is_empty() && tables.server_keywords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_keyword_wins() {
        let matcher = RegionMatcher::new(
            [("HK", "HongKong"), ("HKG-PREMIUM", "HongKongPremium")],
            Vec::<(&str, &str)>::new(),
        );
        assert_eq!(
            matcher.match_region("HKG-PREMIUM 01", "1.2.3.4"),
            "HongKongPremium"
        );
        assert_eq!(matcher.match_region("hk 02", "1.2.3.4"), "HongKong");
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let matcher = RegionMatcher::new(
            [("US", "UnitedStates"), ("SG", "Singapore")],
            Vec::<(&str, &str)>::new(),
        );
        assert_eq!(matcher.match_region("US-SG relay", ""), "UnitedStates");
    }

    #[test]
    fn test_server_fallback_and_unknown() {
        let matcher = RegionMatcher::new([("JP", "Japan")], [(".tw.", "Taiwan")]);
        assert_eq!(matcher.match_region("node", "a.TW.example.com"), "Taiwan");
        assert_eq!(matcher.match_region("node", "example.com"), UNKNOWN_REGION);
    }

    #[test]
    fn test_reload_replaces_tables() {
        let matcher = RegionMatcher::new([("JP", "Japan")], Vec::<(&str, &str)>::new());
        matcher.reload([("JP", "日本")], Vec::<(&str, &str)>::new());
        assert_eq!(matcher.match_region("JP 01", ""), "日本");
        assert!(!matcher.is_empty());
        assert!(RegionMatcher::default().is_empty());
    }
}
