use std::future::Future;

use futures::{stream, Stream, TryStreamExt};

use crate::catalog::{CatalogError, CatalogResult};

/// Largest page the catalog service hands out in one listing call.
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub max_results: usize,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    // An empty token is treated the same as an absent one
    fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|token| !token.is_empty())
    }
}

enum Cursor {
    Start,
    Continue(String),
    Exhausted,
}

/// A paginated listing call.
///
/// Every call to [`Paginated::pages`] starts a fresh pass from the first page, so the
/// same listing can be re-run without keeping continuation tokens around. A pass
/// ends as soon as a page comes back without a continuation token.
pub struct Paginated<F> {
    fetch: F,
    page_size: usize,
}

impl<T, F, Fut> Paginated<F>
where
    F: Fn(PageRequest) -> Fut,
    Fut: Future<Output = CatalogResult<Page<T>>>,
{
    pub fn new(page_size: usize, fetch: F) -> Self {
        Self {
            fetch,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn pages(&self) -> impl Stream<Item = CatalogResult<Vec<T>>> + '_ {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let next_token = match cursor {
                Cursor::Start => None,
                Cursor::Continue(token) => Some(token),
                Cursor::Exhausted => return Ok(None),
            };

            let page = (self.fetch)(PageRequest {
                max_results: self.page_size,
                next_token,
            })
            .await?;

            let cursor = match page.continuation() {
                Some(token) => Cursor::Continue(token.to_string()),
                None => Cursor::Exhausted,
            };

            Ok::<_, CatalogError>(Some((page.items, cursor)))
        })
    }

    /// Drain all pages into a single list.
    pub async fn collect_all(&self) -> CatalogResult<Vec<T>> {
        self.pages().try_concat().await
    }
}
