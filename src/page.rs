//! Cursor-based pagination.
//!
//! List-returning operations yield a [`Page`]: the hydrated items plus the
//! opaque continuation tokens the response carried, bound to a refetch
//! closure so callers can continue without restating the original query.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::Result;

pub(crate) type FetchFn<T> =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<Page<T>>> + Send + Sync>;

/// One page of results with its continuation state.
#[derive(Clone)]
pub struct Page<T> {
    items: Vec<T>,
    next_cursor: Option<String>,
    previous_cursor: Option<String>,
    fetch: Option<FetchFn<T>>,
}

impl<T> Page<T> {
    pub(crate) fn new(
        items: Vec<T>,
        next_cursor: Option<String>,
        previous_cursor: Option<String>,
        fetch: FetchFn<T>,
    ) -> Self {
        Self {
            items,
            next_cursor: normalize(next_cursor),
            previous_cursor: normalize(previous_cursor),
            fetch: Some(fetch),
        }
    }

    /// A page with no continuation, for operations that never paginate.
    pub(crate) fn terminal(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
            previous_cursor: None,
            fetch: None,
        }
    }

    /// Items in this page, in response order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page, keeping only its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Opaque token for the following page, if the response carried one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Opaque token for the preceding page, if the response carried one.
    pub fn previous_cursor(&self) -> Option<&str> {
        self.previous_cursor.as_deref()
    }

    /// Fetch the following page. `Ok(None)` means the results are exhausted.
    pub async fn next(&self) -> Result<Option<Page<T>>> {
        self.continue_with(self.next_cursor.clone()).await
    }

    /// Fetch the preceding page. `Ok(None)` means there is nothing earlier.
    pub async fn previous(&self) -> Result<Option<Page<T>>> {
        self.continue_with(self.previous_cursor.clone()).await
    }

    async fn continue_with(&self, cursor: Option<String>) -> Result<Option<Page<T>>> {
        match (cursor, &self.fetch) {
            (Some(cursor), Some(fetch)) => fetch(cursor).await.map(Some),
            _ => Ok(None),
        }
    }
}

/// Upstream occasionally emits an empty-string token at the boundary of the
/// result set; treat it the same as no token.
fn normalize(cursor: Option<String>) -> Option<String> {
    cursor.filter(|c| !c.is_empty())
}

impl<T> Deref for Page<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Page<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("items", &self.items)
            .field("next_cursor", &self.next_cursor)
            .field("previous_cursor", &self.previous_cursor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    fn counted_fetch() -> FetchFn<u32> {
        Arc::new(|cursor: String| {
            async move {
                let n: u32 = cursor.parse().unwrap();
                Ok(Page {
                    items: vec![n],
                    next_cursor: (n < 3).then(|| (n + 1).to_string()),
                    previous_cursor: Some(n.saturating_sub(1).to_string()),
                    fetch: Some(counted_fetch()),
                })
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn next_follows_the_stored_cursor() {
        let first = Page::new(vec![0u32], Some("1".into()), None, counted_fetch());
        let second = first.next().await.unwrap().unwrap();
        assert_eq!(second.items(), &[1]);
        assert_eq!(second.next_cursor(), Some("2"));

        let third = second.next().await.unwrap().unwrap();
        let last = third.next().await.unwrap().unwrap();
        assert_eq!(last.items(), &[3]);
        assert!(last.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_cursor_means_exhausted() {
        let page = Page::new(vec![1u32], Some(String::new()), None, counted_fetch());
        assert_eq!(page.next_cursor(), None);
        assert!(page.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn terminal_pages_never_continue() {
        let page = Page::terminal(vec![1u32, 2]);
        assert_eq!(page.len(), 2);
        assert!(page.next().await.unwrap().is_none());
        assert!(page.previous().await.unwrap().is_none());
    }

    #[test]
    fn page_iterates_and_indexes_like_a_slice() {
        let page = Page::terminal(vec![10u32, 20, 30]);
        assert_eq!(page[1], 20);
        let doubled: Vec<_> = (&page).into_iter().map(|n| n * 2).collect();
        assert_eq!(doubled, vec![20, 40, 60]);
    }
}
