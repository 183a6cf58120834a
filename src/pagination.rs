//! Pagination cursors for the two feed modes
//!
//! Cursor state lives only for the duration of one sync run and is never
//! persisted. Home-feed cursors are opaque next-page URLs handed back by the
//! previous listing; creator cursors are the precomputed list of page URLs,
//! consumed front to back.

use crate::config::RemoteConfig;
use crate::types::PostStub;
use std::collections::VecDeque;

/// Which listing the driver walks
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedMode {
    /// Home feed of every supported creator
    Home,
    /// One creator's posts
    Creator(String),
}

impl FeedMode {
    /// A configured creator id selects creator mode
    pub fn from_config(config: &RemoteConfig) -> Self {
        match &config.creator_id {
            Some(creator) => FeedMode::Creator(creator.clone()),
            None => FeedMode::Home,
        }
    }
}

/// Position in a feed walk
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cursor {
    /// First page of the home feed
    HomeStart,
    /// Next-page URL returned by the previous home listing
    HomeNext(String),
    /// Remaining creator page URLs; the front one is fetched next
    CreatorPages(VecDeque<String>),
}

impl Cursor {
    /// Split a creator cursor into the URL to fetch now and the cursor after it
    ///
    /// Returns `None` when no page URL remains.
    pub(crate) fn pop_creator_page(mut pages: VecDeque<String>) -> Option<(String, Option<Cursor>)> {
        let url = pages.pop_front()?;
        let next = if pages.is_empty() {
            None
        } else {
            Some(Cursor::CreatorPages(pages))
        };
        Some((url, next))
    }
}

/// One fetched listing page
#[derive(Clone, Debug)]
pub struct Page {
    /// Post stubs on this page, newest first
    pub posts: Vec<PostStub>,
    /// Where to continue; `None` ends the walk
    pub next: Option<Cursor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_pages_are_consumed_front_to_back() {
        let pages: VecDeque<String> = ["p1", "p2", "p3"].into_iter().map(String::from).collect();

        let Some((url, next)) = Cursor::pop_creator_page(pages) else {
            panic!("expected a page");
        };
        assert_eq!(url, "p1");
        let Some(Cursor::CreatorPages(rest)) = next else {
            panic!("expected remaining pages");
        };
        assert_eq!(rest, ["p2", "p3"]);
    }

    #[test]
    fn last_creator_page_has_no_next_cursor() {
        let pages: VecDeque<String> = VecDeque::from(vec!["only".to_string()]);
        let popped = Cursor::pop_creator_page(pages);
        assert_eq!(popped, Some(("only".to_string(), None)));
        assert_eq!(Cursor::pop_creator_page(VecDeque::new()), None);
    }

    #[test]
    fn creator_id_selects_creator_mode() {
        let mut config = RemoteConfig::default();
        assert_eq!(FeedMode::from_config(&config), FeedMode::Home);

        config.creator_id = Some("artist".into());
        assert_eq!(
            FeedMode::from_config(&config),
            FeedMode::Creator("artist".into())
        );
    }
}
