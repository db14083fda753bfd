//! Catalog browsing: infinite-scroll paging and product detail.

use std::sync::Arc;
use std::time::Duration;

use apparel_core::{Product, ProductId};
use moka::future::Cache;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::backend::{BackendClient, BackendError};

/// Distance from the bottom of the page, in pixels, at which the next page
/// is requested.
pub const SCROLL_THRESHOLD: f64 = 200.0;

const DETAIL_CACHE_CAPACITY: u64 = 500;
const DETAIL_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl CatalogError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(e) => e.user_message(),
        }
    }
}

/// Scroll position reported by the front end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub inner_height: f64,
    pub scroll_y: f64,
    pub document_height: f64,
}

impl Viewport {
    #[must_use]
    pub fn near_bottom(&self) -> bool {
        self.inner_height + self.scroll_y >= self.document_height - SCROLL_THRESHOLD
    }
}

/// Paging state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageState {
    /// Ready to load the next page.
    #[default]
    Idle,
    Loading,
    /// No more pages.
    Exhausted,
    /// The last page request failed; [`CatalogPager::retry`] re-issues it.
    Failed(String),
}

#[derive(Debug)]
struct PagerState {
    category: String,
    products: Vec<Product>,
    next_page: u32,
    has_next_page: bool,
    state: PageState,
    /// Bumped on every category change; responses for an older generation
    /// are dropped.
    generation: u64,
}

impl PagerState {
    fn reset(&mut self, category: String) {
        self.category = category;
        self.products.clear();
        self.next_page = 1;
        self.has_next_page = true;
        self.state = PageState::Idle;
        self.generation += 1;
    }
}

/// Infinite-scroll list of one category.
#[derive(Clone)]
pub struct CatalogPager {
    client: BackendClient,
    page_size: u32,
    state: Arc<RwLock<PagerState>>,
}

impl CatalogPager {
    #[must_use]
    pub fn new(client: BackendClient, category: impl Into<String>, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            state: Arc::new(RwLock::new(PagerState {
                category: category.into(),
                products: Vec::new(),
                next_page: 1,
                has_next_page: true,
                state: PageState::Idle,
                generation: 0,
            })),
        }
    }

    pub async fn products(&self) -> Vec<Product> {
        self.state.read().await.products.clone()
    }

    pub async fn category(&self) -> String {
        self.state.read().await.category.clone()
    }

    pub async fn page_state(&self) -> PageState {
        self.state.read().await.state.clone()
    }

    pub async fn has_next_page(&self) -> bool {
        self.state.read().await.has_next_page
    }

    /// Switch category: clear the list and cursor, then fetch page 1.
    ///
    /// Any response still in flight for the previous category is discarded
    /// when it arrives.
    ///
    /// # Errors
    ///
    /// Returns the backend error for the first page.
    #[instrument(skip(self, category), fields(category = %category.as_ref()))]
    pub async fn set_category(&self, category: impl AsRef<str>) -> Result<usize, CatalogError> {
        self.state
            .write()
            .await
            .reset(category.as_ref().to_string());
        self.load_next().await
    }

    /// Fetch the next page. Page 1 replaces the list; later pages append.
    ///
    /// Does nothing while a page is loading or after the last page. Returns
    /// the number of products received.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the pager enters [`PageState::Failed`].
    pub async fn load_next(&self) -> Result<usize, CatalogError> {
        let (category, page, generation) = {
            let mut state = self.state.write().await;
            if state.state == PageState::Loading || !state.has_next_page {
                return Ok(0);
            }
            state.state = PageState::Loading;
            (state.category.clone(), state.next_page, state.generation)
        };

        let result = self
            .client
            .product_page(&category, page, self.page_size)
            .await;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(category = %category, page, "dropping response for superseded category");
            return Ok(0);
        }

        match result {
            Ok(fetched) => {
                let received = fetched.products.len();
                if page == 1 {
                    state.products = fetched.products;
                } else {
                    state.products.extend(fetched.products);
                }
                state.next_page = page + 1;
                state.has_next_page = fetched.has_next_page;
                state.state = if fetched.has_next_page {
                    PageState::Idle
                } else {
                    PageState::Exhausted
                };
                debug!(category = %category, page, received, "catalog page loaded");
                Ok(received)
            }
            Err(BackendError::Rejected(message)) => {
                debug!(category = %category, page, reason = %message, "backend reported no more products");
                state.has_next_page = false;
                state.state = PageState::Exhausted;
                Ok(0)
            }
            Err(e) => {
                state.state = PageState::Failed(e.user_message());
                Err(e.into())
            }
        }
    }

    /// Load the next page when the viewport is near the bottom.
    ///
    /// A failed pager does not retry on scroll; use [`CatalogPager::retry`].
    ///
    /// # Errors
    ///
    /// Same as [`CatalogPager::load_next`].
    pub async fn on_scroll(&self, viewport: Viewport) -> Result<usize, CatalogError> {
        if !viewport.near_bottom() || self.page_state().await != PageState::Idle {
            return Ok(0);
        }
        self.load_next().await
    }

    /// Re-issue the page that failed.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogPager::load_next`].
    pub async fn retry(&self) -> Result<usize, CatalogError> {
        if !matches!(self.page_state().await, PageState::Failed(_)) {
            return Ok(0);
        }
        self.load_next().await
    }
}

/// Single-product lookups with a five-minute cache.
#[derive(Clone)]
pub struct ProductDetails {
    client: BackendClient,
    cache: Cache<ProductId, Product>,
}

impl ProductDetails {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(DETAIL_CACHE_CAPACITY)
            .time_to_live(DETAIL_CACHE_TTL)
            .build();
        Self { client, cache }
    }

    /// Fetch a product, serving repeat lookups from the cache.
    ///
    /// # Errors
    ///
    /// Returns the backend error; failures are not cached.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: &ProductId) -> Result<Product, CatalogError> {
        if let Some(product) = self.cache.get(id).await {
            debug!("product cache hit");
            return Ok(product);
        }
        let product = self.client.product(id).await?;
        self.cache.insert(id.clone(), product.clone()).await;
        Ok(product)
    }

    /// Drop a cached product, e.g. after an admin edit.
    pub async fn invalidate(&self, id: &ProductId) {
        self.cache.invalidate(id).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::endpoints;
    use crate::testing::FakeBackend;

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    fn catalog() -> FakeBackend {
        let fake = FakeBackend::new();
        for (id, name, category) in [
            ("a", "A", "men"),
            ("b", "B", "men"),
            ("c", "C", "women"),
            ("d", "D", "women"),
            ("e", "E", "men"),
        ] {
            fake.add_product_json(serde_json::json!({
                "_id": id, "name": name, "price": 499, "category": category
            }));
        }
        fake
    }

    #[test]
    fn test_near_bottom_threshold() {
        let at = |scroll_y| Viewport {
            inner_height: 800.0,
            scroll_y,
            document_height: 2000.0,
        };
        assert!(!at(999.0).near_bottom());
        assert!(at(1000.0).near_bottom());
    }

    #[tokio::test]
    async fn test_pages_append_until_exhausted() {
        let fake = catalog();
        let pager = CatalogPager::new(fake.client(), "men", 2);

        assert_eq!(pager.load_next().await.unwrap(), 2);
        assert_eq!(pager.page_state().await, PageState::Idle);
        assert_eq!(pager.load_next().await.unwrap(), 1);
        assert_eq!(names(&pager.products().await), ["A", "B", "E"]);
        assert_eq!(pager.page_state().await, PageState::Exhausted);

        assert_eq!(pager.load_next().await.unwrap(), 0);
        assert_eq!(fake.count(endpoints::PRODUCT_PAGE), 2);
    }

    #[tokio::test]
    async fn test_category_switch_replaces_list() {
        let fake = catalog();
        let pager = CatalogPager::new(fake.client(), "men", 2);
        pager.load_next().await.unwrap();
        assert_eq!(names(&pager.products().await), ["A", "B"]);

        pager.set_category("women").await.unwrap();
        assert_eq!(names(&pager.products().await), ["C", "D"]);
        assert_eq!(pager.category().await, "women");
    }

    #[tokio::test]
    async fn test_failure_then_retry_same_page() {
        let fake = catalog();
        let pager = CatalogPager::new(fake.client(), "men", 2);
        pager.load_next().await.unwrap();

        fake.fail_network_once(endpoints::PRODUCT_PAGE);
        assert!(pager.load_next().await.is_err());
        assert_eq!(
            pager.page_state().await,
            PageState::Failed("Network Error".into())
        );

        let scrolled = Viewport {
            inner_height: 800.0,
            scroll_y: 5000.0,
            document_height: 1000.0,
        };
        assert_eq!(pager.on_scroll(scrolled).await.unwrap(), 0);

        assert_eq!(pager.retry().await.unwrap(), 1);
        assert_eq!(names(&pager.products().await), ["A", "B", "E"]);
        let pages: Vec<_> = fake
            .requests_to(endpoints::PRODUCT_PAGE)
            .iter()
            .map(|r| r.query_value("page").map(str::to_owned))
            .collect();
        assert_eq!(
            pages,
            [Some("1".into()), Some("2".into()), Some("2".into())]
        );
    }

    #[tokio::test]
    async fn test_success_false_ends_paging() {
        let fake = catalog();
        fake.reject_once_with_success_false(endpoints::PRODUCT_PAGE, "No products found");
        let pager = CatalogPager::new(fake.client(), "kids", 6);

        assert_eq!(pager.load_next().await.unwrap(), 0);
        assert_eq!(pager.page_state().await, PageState::Exhausted);
        assert!(!pager.has_next_page().await);
    }

    #[tokio::test]
    async fn test_product_details_are_cached() {
        let fake = catalog();
        let details = ProductDetails::new(fake.client());
        let id = ProductId::new("c");

        assert_eq!(details.get(&id).await.unwrap().name, "C");
        assert_eq!(details.get(&id).await.unwrap().name, "C");
        assert_eq!(fake.count(endpoints::SINGLE_PRODUCT), 1);

        details.invalidate(&id).await;
        details.get(&id).await.unwrap();
        assert_eq!(fake.count(endpoints::SINGLE_PRODUCT), 2);
    }
}
