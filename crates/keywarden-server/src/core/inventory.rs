//! Read-side views over the inventory
//!
//! Display status is computed here on every read; nothing derived is stored.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use keywarden_core::{
    assemble_feed, ActivityItem, InventorySummary, KeyQuery, KeyView, PendingFilter,
    VerificationFilter,
};

use super::WorkflowError;
use crate::config::InventoryConfig;
use crate::storage::InventoryStore;

/// Read-side service producing key views, the activity feed and the summary
#[derive(Debug, Clone)]
pub struct InventoryReader {
    store: Arc<dyn InventoryStore>,
    config: InventoryConfig,
}

impl InventoryReader {
    pub fn new(store: Arc<dyn InventoryStore>, config: InventoryConfig) -> Self {
        Self { store, config }
    }

    /// Freshness window for reads scoped to `device_id`.
    ///
    /// Uses the device's `verificationFrequency` when the device has settings,
    /// the configured default otherwise. Does not create settings.
    pub async fn status_threshold(&self, device_id: Option<&str>) -> Result<Duration, WorkflowError> {
        if let Some(device_id) = device_id {
            if let Some(setting) = self.store.get_settings(device_id).await? {
                return Ok(setting.status_threshold());
            }
        }
        Ok(self.config.status_threshold())
    }

    /// All keys matching `query`, with their derived status
    pub async fn key_views(&self, query: &KeyQuery) -> Result<Vec<KeyView>, WorkflowError> {
        let threshold = self.status_threshold(query.device_id.as_deref()).await?;
        let keys = self.store.list_keys().await?;
        let open = self.store.list_pending(&PendingFilter::open()).await?;

        let views: Vec<KeyView> = KeyView::build_all(keys, &open, Utc::now(), threshold)
            .into_iter()
            .filter(|v| query.matches(v))
            .collect();
        debug!(count = views.len(), threshold_hours = threshold.num_hours(), "Listed keys");
        Ok(views)
    }

    /// One key by id, with its derived status
    pub async fn key_view(&self, id: i64, device_id: Option<&str>) -> Result<KeyView, WorkflowError> {
        let key = self
            .store
            .get_key(id)
            .await?
            .ok_or(WorkflowError::KeyNotFound(id))?;
        self.view_of(key, device_id).await
    }

    /// One key by its number, with its derived status
    pub async fn key_view_by_number(
        &self,
        key_number: &str,
        device_id: Option<&str>,
    ) -> Result<KeyView, WorkflowError> {
        let key = self
            .store
            .get_key_by_number(key_number)
            .await?
            .ok_or_else(|| WorkflowError::KeyNumberNotFound(key_number.to_string()))?;
        self.view_of(key, device_id).await
    }

    async fn view_of(
        &self,
        key: keywarden_core::Key,
        device_id: Option<&str>,
    ) -> Result<KeyView, WorkflowError> {
        let threshold = self.status_threshold(device_id).await?;
        let open = self
            .store
            .list_pending(&PendingFilter {
                key_id: Some(key.id),
                completed: Some(false),
            })
            .await?;
        Ok(KeyView::new(key, Utc::now(), threshold, !open.is_empty()))
    }

    /// Recent verifications and open requests, newest first.
    ///
    /// `limit` defaults to the configured feed length.
    pub async fn activity_feed(&self, limit: Option<usize>) -> Result<Vec<ActivityItem>, WorkflowError> {
        let limit = limit.unwrap_or(self.config.activity_limit);
        let keys = self.store.list_keys().await?;
        let verifications = self
            .store
            .list_verifications(&VerificationFilter::default())
            .await?;
        let open = self.store.list_pending(&PendingFilter::open()).await?;

        Ok(assemble_feed(&keys, &verifications, &open, limit))
    }

    /// Dashboard counts
    pub async fn summary(&self, device_id: Option<&str>) -> Result<InventorySummary, WorkflowError> {
        let query = KeyQuery {
            device_id: device_id.map(str::to_string),
            ..Default::default()
        };
        let views = self.key_views(&query).await?;
        let open = self.store.list_pending(&PendingFilter::open()).await?;
        Ok(InventorySummary::from_views(&views, open.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use keywarden_core::{
        ActivitySource, KeyStatus, NewKey, NewVerification, SettingsPatch, SettingsTemplate,
    };

    async fn reader_with_keys(count: usize) -> (Arc<dyn InventoryStore>, InventoryReader) {
        let store: Arc<dyn InventoryStore> = Arc::new(MemoryStore::new());
        for i in 1..=count {
            store
                .create_key(NewKey::new(format!("K-{}", i), "Store room", "A1"))
                .await
                .unwrap();
        }
        let reader = InventoryReader::new(store.clone(), InventoryConfig::default());
        (store, reader)
    }

    #[tokio::test]
    async fn test_threshold_from_device_settings() {
        let (store, reader) = reader_with_keys(0).await;
        assert_eq!(reader.status_threshold(None).await.unwrap(), Duration::hours(24));
        assert_eq!(
            reader.status_threshold(Some("unknown")).await.unwrap(),
            Duration::hours(24)
        );
        // Lookups do not create settings
        assert!(store.get_settings("unknown").await.unwrap().is_none());

        let lookup = store
            .get_or_create_settings("device-a", SettingsTemplate::default())
            .await
            .unwrap();
        assert_eq!(
            reader.status_threshold(Some("device-a")).await.unwrap(),
            Duration::hours(6)
        );

        let patch = SettingsPatch {
            verification_frequency: Some(48),
            ..Default::default()
        };
        store.update_settings(lookup.setting.id, patch).await.unwrap();
        assert_eq!(
            reader.status_threshold(Some("device-a")).await.unwrap(),
            Duration::hours(48)
        );
    }

    #[tokio::test]
    async fn test_views_reflect_verifications_and_requests() {
        let (store, reader) = reader_with_keys(3).await;
        store
            .record_verification(NewVerification::new(1, KeyStatus::Verified), Utc::now())
            .await
            .unwrap();
        store
            .record_verification(
                NewVerification::new(2, KeyStatus::Verified),
                Utc::now() - Duration::hours(30),
            )
            .await
            .unwrap();
        store.create_pending(3, Utc::now()).await.unwrap();

        let views = reader.key_views(&KeyQuery::default()).await.unwrap();
        let flags: Vec<_> = views
            .iter()
            .map(|v| (v.key.id, v.is_verified, v.is_pending))
            .collect();
        assert_eq!(flags, vec![(1, true, false), (2, false, false), (3, false, true)]);

        let single = reader.key_view_by_number("K-3", None).await.unwrap();
        assert!(single.is_pending);
        assert!(matches!(
            reader.key_view(9, None).await.unwrap_err(),
            WorkflowError::KeyNotFound(9)
        ));

        let summary = reader.summary(None).await.unwrap();
        assert_eq!(summary.total_keys, 3);
        assert_eq!(summary.verified_keys, 1);
        assert_eq!(summary.pending_requests, 1);
    }

    #[tokio::test]
    async fn test_activity_feed_order() {
        let (store, reader) = reader_with_keys(2).await;
        let t1 = Utc::now() - Duration::hours(2);
        let t2 = t1 + Duration::hours(1);
        let t3 = t2 + Duration::minutes(30);

        store
            .record_verification(NewVerification::new(1, KeyStatus::Verified), t1)
            .await
            .unwrap();
        store
            .record_verification(NewVerification::new(2, KeyStatus::Missing), t2)
            .await
            .unwrap();
        store.create_pending(1, t3).await.unwrap();

        let feed = reader.activity_feed(None).await.unwrap();
        let order: Vec<_> = feed.iter().map(|a| (a.source, a.timestamp)).collect();
        assert_eq!(
            order,
            vec![
                (ActivitySource::Pending, t3),
                (ActivitySource::Verification, t2),
                (ActivitySource::Verification, t1),
            ]
        );

        assert_eq!(reader.activity_feed(Some(1)).await.unwrap().len(), 1);
    }
}
