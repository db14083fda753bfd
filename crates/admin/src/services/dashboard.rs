//! Dashboard stats with background refresh.

use std::sync::Arc;
use std::time::Duration;

use apparel_storefront::poller::Poller;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::client::{AdminClient, DashboardStats};
use crate::error::AdminError;

/// Latest dashboard stats, refreshed on demand or by a poller.
#[derive(Clone)]
pub struct DashboardMonitor {
    client: AdminClient,
    latest: Arc<RwLock<Option<DashboardStats>>>,
}

impl DashboardMonitor {
    #[must_use]
    pub fn new(client: AdminClient) -> Self {
        Self {
            client,
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Last stats fetched, `None` before the first successful load.
    pub async fn latest(&self) -> Option<DashboardStats> {
        *self.latest.read().await
    }

    /// Fetch stats and keep them. A failed fetch leaves the previous
    /// snapshot in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<DashboardStats, AdminError> {
        let stats = self.client.stats().await?;
        *self.latest.write().await = Some(stats);
        Ok(stats)
    }

    /// Refresh every `interval` until the returned poller is dropped.
    #[must_use]
    pub fn start_polling(&self, interval: Duration) -> Poller {
        let monitor = self.clone();
        Poller::spawn("admin-dashboard", interval, move || {
            let monitor = monitor.clone();
            async move { monitor.refresh().await.map(drop) }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use apparel_core::Role;
    use apparel_storefront::backend::endpoints;
    use apparel_storefront::services::auth::AuthStore;
    use apparel_storefront::testing::FakeBackend;
    use serde_json::json;

    async fn monitor() -> (FakeBackend, DashboardMonitor) {
        let fake = FakeBackend::new();
        let auth = AuthStore::new(fake.client());
        fake.sign_in_as(&auth, Role::Admin).await;
        let client = AdminClient::new(auth.client().clone());
        (fake, DashboardMonitor::new(client))
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let (fake, monitor) = monitor().await;
        fake.add_order_json(json!({"_id": "o1", "orderStatus": "pending", "items": []}));

        let stats = monitor.refresh().await.unwrap();
        assert_eq!(stats.new_orders, 1);

        fake.fail_network_once(endpoints::ADMIN_STATS);
        assert!(monitor.refresh().await.is_err());
        assert_eq!(monitor.latest().await, Some(stats));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_picks_up_new_orders() {
        let (fake, monitor) = monitor().await;
        monitor.refresh().await.unwrap();
        let poller = monitor.start_polling(Duration::from_secs(15));

        fake.add_order_json(json!({"_id": "o1", "orderStatus": "pending", "items": []}));
        tokio::time::sleep(Duration::from_secs(16)).await;

        assert_eq!(monitor.latest().await.map(|s| s.new_orders), Some(1));
        poller.stop();
    }
}
