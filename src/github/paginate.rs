//! Cursor pagination shared by REST and GraphQL collections

use log::{debug, info, warn};
use std::fmt;
use std::future::Future;

use crate::github::error::GitHubError;

/// Why a page fetch gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReason(pub String);

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StopReason {
    fn from(reason: &str) -> Self {
        Self(reason.to_string())
    }
}

impl From<String> for StopReason {
    fn from(reason: String) -> Self {
        Self(reason)
    }
}

impl From<GitHubError> for StopReason {
    fn from(err: GitHubError) -> Self {
        Self(err.to_string())
    }
}

/// One slice of a paginated collection.
///
/// `next` is the continuation token; `None` means this was the last page.
/// A page with `stopped` set is always empty and tells the caller to move on
/// to its next unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub stopped: Option<StopReason>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self {
            items,
            next,
            stopped: None,
        }
    }

    /// Empty page carrying a stop signal
    pub fn stop(reason: impl Into<StopReason>) -> Self {
        Self {
            items: Vec::new(),
            next: None,
            stopped: Some(reason.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Anything that can hand out pages by cursor.
pub trait PageSource {
    type Item;

    /// Fetch the page starting at `cursor` (`None` for the first page).
    /// Failures are reported as [`Page::stop`], never as errors.
    fn fetch(&mut self, cursor: Option<String>) -> impl Future<Output = Page<Self::Item>>;
}

/// How a [`collect_pages`] loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    EmptyPage,
    LastPage,
    CapReached,
    Failed(StopReason),
}

/// Result of draining a [`PageSource`]
#[derive(Debug, Clone)]
pub struct Collected<R> {
    pub items: Vec<R>,
    pub pages: u32,
    /// Raw items seen, accepted or not
    pub examined: usize,
    pub termination: Termination,
}

impl<R> Collected<R> {
    /// True when the very first page already failed
    pub fn failed_on_first_page(&self) -> bool {
        self.pages <= 1
            && self.items.is_empty()
            && matches!(self.termination, Termination::Failed(_))
    }
}

/// Pull pages from `source` until an empty page, a stop signal, the last
/// page, or `cap` accepted items, whichever comes first.
///
/// `accept` filters and maps raw items; only accepted items count towards
/// the cap, and the result never holds more than `cap` of them.
pub async fn collect_pages<S, R, F>(source: &mut S, cap: usize, mut accept: F) -> Collected<R>
where
    S: PageSource,
    F: FnMut(S::Item) -> Option<R>,
{
    let mut items = Vec::new();
    let mut pages = 0u32;
    let mut examined = 0usize;
    let mut cursor = None;

    if cap == 0 {
        return Collected {
            items,
            pages,
            examined,
            termination: Termination::CapReached,
        };
    }

    let termination = loop {
        pages += 1;
        let page = source.fetch(cursor.take()).await;

        if let Some(reason) = page.stopped {
            warn!("Page {pages} failed: {reason}");
            break Termination::Failed(reason);
        }
        if page.items.is_empty() {
            debug!("Page {pages} was empty");
            break Termination::EmptyPage;
        }

        let received = page.items.len();
        let before = items.len();
        for item in page.items {
            examined += 1;
            if let Some(accepted) = accept(item) {
                items.push(accepted);
            }
        }
        info!(
            "Page {pages}: {} of {received} accepted, {} total",
            items.len() - before,
            items.len()
        );

        if items.len() >= cap {
            items.truncate(cap);
            break Termination::CapReached;
        }
        match page.next {
            Some(next) => cursor = Some(next),
            None => break Termination::LastPage,
        }
    };

    Collected {
        items,
        pages,
        examined,
        termination,
    }
}
