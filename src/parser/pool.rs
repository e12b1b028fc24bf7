use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use log::{debug, warn};

use crate::models::ProxyNode;
use crate::parser::{parse_link, ParseCache, ParseError};

pub const DEFAULT_WORKERS: usize = 10;

/// Characters of a rejected link echoed into its error text.
const LINK_ECHO_LIMIT: usize = 50;

/// Result of parsing one candidate link. Exactly one of `node` and `error`
/// is set.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub link: String,
    pub node: Option<ProxyNode>,
    pub error: Option<ParseError>,
}

impl ParseOutcome {
    fn from_result(link: String, result: Result<ProxyNode, ParseError>) -> Self {
        match result {
            Ok(node) => Self {
                link,
                node: Some(node),
                error: None,
            },
            Err(e) => Self {
                link,
                node: None,
                error: Some(e),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.node.is_some()
    }

    /// Error text with the offending link cut down to a short prefix.
    pub fn describe_error(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|e| format!("{} ({})", e, truncate_link(&self.link)))
    }
}

pub(crate) fn truncate_link(link: &str) -> String {
    if link.chars().count() <= LINK_ECHO_LIMIT {
        link.to_string()
    } else {
        let prefix: String = link.chars().take(LINK_ECHO_LIMIT).collect();
        format!("{}...", prefix)
    }
}

/// Fixed-size pool of parser threads sharing one [`ParseCache`].
///
/// Every call spawns its workers inside a thread scope and joins them before
/// returning, so no parsing outlives `parse_many`.
#[derive(Debug, Clone)]
pub struct ParserPool {
    workers: usize,
    cache: Arc<ParseCache>,
}

impl Default for ParserPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, Arc::new(ParseCache::default()))
    }
}

impl ParserPool {
    pub fn new(workers: usize, cache: Arc<ParseCache>) -> Self {
        Self {
            workers: workers.max(1),
            cache,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn cache(&self) -> &Arc<ParseCache> {
        &self.cache
    }

    /// Parse every link, returning one outcome per input.
    ///
    /// Outcomes arrive in completion order; use [`order_by_links`] when the
    /// input order matters.
    pub fn parse_many(&self, links: &[String]) -> Vec<ParseOutcome> {
        if links.is_empty() {
            return Vec::new();
        }

        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<ParseOutcome>();
        let workers = self.workers.min(links.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                let cache = &self.cache;
                scope.spawn(move || loop {
                    let idx = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(link) = links.get(idx) else {
                        break;
                    };
                    let outcome = self.parse_one(cache, link);
                    if tx.send(outcome).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let outcomes: Vec<ParseOutcome> = rx.into_iter().collect();
        if outcomes.len() != links.len() {
            warn!(
                "Parser pool produced {} outcomes for {} links",
                outcomes.len(),
                links.len()
            );
        }
        debug!(
            "Parsed {} links with {} workers, {} ok",
            links.len(),
            workers,
            outcomes.iter().filter(|o| o.is_ok()).count()
        );
        outcomes
    }

    fn parse_one(&self, cache: &ParseCache, link: &str) -> ParseOutcome {
        if let Some(node) = cache.get(link) {
            return ParseOutcome::from_result(link.to_string(), Ok(node));
        }
        let result = parse_link(link);
        if let Ok(node) = &result {
            cache.set(link, node.clone());
        }
        ParseOutcome::from_result(link.to_string(), result)
    }
}

/// Re-sorts outcomes into the order their links appear in `links`.
///
/// Duplicate links keep their relative order.
pub fn order_by_links(links: &[String], outcomes: Vec<ParseOutcome>) -> Vec<ParseOutcome> {
    let mut buckets: HashMap<String, Vec<ParseOutcome>> = HashMap::new();
    for outcome in outcomes {
        buckets.entry(outcome.link.clone()).or_default().push(outcome);
    }
    for bucket in buckets.values_mut() {
        bucket.reverse();
    }
    links
        .iter()
        .filter_map(|link| buckets.get_mut(link).and_then(Vec::pop))
        .collect()
}
