//! Shared pagination and search contract for list endpoints.
//!
//! Every searchable family sends `limit`/`offset` plus its own filters and
//! gets back a [`Page`] envelope `{ items, total }`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::dispatcher::{ApiClient, QueryParams};
use crate::error::ConsoleError;

/// One page of a search result. `total` counts every matching record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty(total: u64) -> Self {
        Self {
            items: Vec::new(),
            total,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }

    /// Check `items.len() <= limit` and `total >= items.len()`.
    pub fn check(&self, request: &PageRequest) -> crate::Result<()> {
        let count = self.items.len();
        if let Some(limit) = request.limit {
            if count > limit as usize {
                return Err(ConsoleError::ResponseShape(format!(
                    "page holds {} items but limit was {}",
                    count, limit
                )));
            }
        }
        if (count as u64) > self.total {
            return Err(ConsoleError::ResponseShape(format!(
                "page holds {} items but total is {}",
                count, self.total
            )));
        }
        Ok(())
    }
}

/// List reply that is either a [`Page`] envelope or a bare array already
/// windowed by `limit`/`offset`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Paged(Page<T>),
    Bare(Vec<T>),
}

impl<T> From<Listing<T>> for Page<T> {
    /// A bare array counts only itself: its `total` is the number of items
    /// returned.
    fn from(listing: Listing<T>) -> Self {
        match listing {
            Listing::Paged(page) => page,
            Listing::Bare(items) => Page {
                total: items.len() as u64,
                items,
            },
        }
    }
}

/// Pagination window. `None` leaves the backend default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageRequest {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    pub fn first(limit: u32) -> Self {
        Self::new(limit, 0)
    }

    pub fn append_to(&self, query: &mut QueryParams) {
        query
            .push_opt("limit", self.limit)
            .push_opt("offset", self.offset);
    }
}

/// A filter object accepted by a search/list endpoint.
pub trait SearchFilter: Clone {
    fn page(&self) -> PageRequest;

    /// Copy of this filter with a different window.
    fn with_page(&self, page: PageRequest) -> Self;

    /// Append resource-specific filters (not `limit`/`offset`).
    fn append_filters(&self, query: &mut QueryParams);

    fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        self.page().append_to(&mut query);
        self.append_filters(&mut query);
        query
    }
}

impl SearchFilter for PageRequest {
    fn page(&self) -> PageRequest {
        *self
    }

    fn with_page(&self, page: PageRequest) -> Self {
        page
    }

    fn append_filters(&self, _query: &mut QueryParams) {}
}

impl ApiClient {
    /// Fetch one page and verify the envelope invariants.
    pub async fn search<T, F>(&self, segments: &[&str], filter: &F) -> crate::Result<Page<T>>
    where
        T: DeserializeOwned,
        F: SearchFilter,
    {
        let page: Page<T> = self.get(segments, &filter.to_query()).await?;
        page.check(&filter.page())?;
        Ok(page)
    }

    /// Like [`ApiClient::search`] for endpoints that may answer with a bare
    /// array instead of the envelope.
    pub async fn search_listing<T, F>(&self, segments: &[&str], filter: &F) -> crate::Result<Page<T>>
    where
        T: DeserializeOwned,
        F: SearchFilter,
    {
        let listing: Listing<T> = self.get(segments, &filter.to_query()).await?;
        let page = Page::from(listing);
        page.check(&filter.page())?;
        Ok(page)
    }

    /// Walk pages of `page_size` from the filter's offset until an empty page
    /// or `offset >= total`.
    pub async fn fetch_all<T, F>(
        &self,
        segments: &[&str],
        filter: &F,
        page_size: u32,
    ) -> crate::Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: SearchFilter,
    {
        if page_size == 0 {
            return Err(ConsoleError::InvalidInput(
                "page_size must be > 0".to_string(),
            ));
        }

        let mut offset = filter.page().offset.unwrap_or(0);
        let mut collected = Vec::new();
        loop {
            let window = filter.with_page(PageRequest::new(page_size, offset));
            let page: Page<T> = self.search(segments, &window).await?;
            let fetched = page.items.len() as u32;
            let total = page.total;
            collected.extend(page.items);
            offset = offset.saturating_add(fetched);
            if fetched == 0 || u64::from(offset) >= total {
                break;
            }
        }
        tracing::debug!(path = ?segments, count = collected.len(), "fetched all pages");
        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Detached;
    use crate::test_support::{MockBackend, MockReply, paginate};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_page_request_query() {
        let mut query = QueryParams::new();
        PageRequest::new(20, 40).append_to(&mut query);
        assert_eq!(query.get_all("limit"), vec!["20"]);
        assert_eq!(query.get_all("offset"), vec!["40"]);

        let mut query = QueryParams::new();
        PageRequest::default().append_to(&mut query);
        assert!(query.is_empty());
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let paged: Listing<u32> = serde_json::from_value(json!({"items": [1], "total": 9})).unwrap();
        assert_eq!(Page::from(paged).total, 9);

        let bare: Listing<u32> = serde_json::from_value(json!([1, 2, 3])).unwrap();
        let page = Page::from(bare);
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.total, 3);

        assert!(serde_json::from_value::<Listing<u32>>(json!({"rows": []})).is_err());
    }

    #[test]
    fn test_check_accepts_valid_page() {
        let page = Page {
            items: vec![1, 2],
            total: 2,
        };
        assert!(page.check(&PageRequest::first(2)).is_ok());
        assert!(page.check(&PageRequest::default()).is_ok());
    }

    #[test]
    fn test_check_rejects_overfull_page() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 10,
        };
        assert!(matches!(
            page.check(&PageRequest::first(2)),
            Err(ConsoleError::ResponseShape(_))
        ));
    }

    #[test]
    fn test_check_rejects_total_below_count() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 1,
        };
        assert!(matches!(
            page.check(&PageRequest::default()),
            Err(ConsoleError::ResponseShape(_))
        ));
    }

    #[test]
    fn test_map_keeps_total() {
        let page = Page {
            items: vec![1, 2],
            total: 7,
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total, 7);
    }

    fn numbered(n: usize) -> Vec<serde_json::Value> {
        (0..n).map(|i| json!(i)).collect()
    }

    #[tokio::test]
    async fn test_offset_beyond_total_returns_empty_page() {
        let backend = MockBackend::start(|req| MockReply::ok(paginate(&numbered(2), req))).await;
        let client = backend.client(Arc::new(Detached));

        let first: Page<u32> = client
            .search(&["api-keys"], &PageRequest::first(10))
            .await
            .unwrap();
        assert_eq!(first.items, vec![0, 1]);
        assert_eq!(first.total, 2);
        assert!(first.items.len() as u64 <= first.total);

        let beyond: Page<u32> = client
            .search(&["api-keys"], &PageRequest::new(10, 5))
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 2);
    }

    #[tokio::test]
    async fn test_search_rejects_invariant_violation() {
        let backend =
            MockBackend::start(|_| MockReply::ok(json!({"items": [1, 2, 3], "total": 3}))).await;
        let client = backend.client(Arc::new(Detached));
        let result: crate::Result<Page<u32>> =
            client.search(&["api-keys"], &PageRequest::first(2)).await;
        assert!(matches!(result, Err(ConsoleError::ResponseShape(_))));
    }

    #[tokio::test]
    async fn test_fetch_all_walks_pages() {
        let backend = MockBackend::start(|req| MockReply::ok(paginate(&numbered(7), req))).await;
        let client = backend.client(Arc::new(Detached));

        let all: Vec<u32> = client
            .fetch_all(&["api-keys"], &PageRequest::default(), 3)
            .await
            .unwrap();
        assert_eq!(all, vec![0, 1, 2, 3, 4, 5, 6]);

        let offsets: Vec<String> = backend
            .requests()
            .iter()
            .flat_map(|r| r.query_values("offset"))
            .collect();
        assert_eq!(offsets, vec!["0", "3", "6"]);
    }

    #[tokio::test]
    async fn test_fetch_all_stops_on_empty_page() {
        // Backend claims more records than it ever returns
        let backend = MockBackend::start(|_| MockReply::ok(json!({"items": [], "total": 50}))).await;
        let client = backend.client(Arc::new(Detached));
        let all: Vec<u32> = client
            .fetch_all(&["api-keys"], &PageRequest::default(), 10)
            .await
            .unwrap();
        assert!(all.is_empty());
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_zero_page_size() {
        let backend = MockBackend::start(|_| MockReply::ok(json!({}))).await;
        let client = backend.client(Arc::new(Detached));
        let result: crate::Result<Vec<u32>> =
            client.fetch_all(&["api-keys"], &PageRequest::default(), 0).await;
        assert!(matches!(result, Err(ConsoleError::InvalidInput(_))));
        assert!(backend.requests().is_empty());
    }
}
