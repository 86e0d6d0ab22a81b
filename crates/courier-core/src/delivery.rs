// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Live delivery feed
//
// The delivery collection lives in the backend. `DeliveryFeed` listens to its
// snapshot stream and keeps the latest list for the dashboard; writes go
// straight to the store and come back through the stream.

use crate::toast::ToastController;
use crate::types::AppError;
use async_channel::Receiver;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Progress of a delivery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl DeliveryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "in-progress" | "progress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(AppError::InvalidInput(format!(
                "Unknown delivery status: {}",
                other
            ))),
        }
    }
}

/// A delivery as stored in the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub delivery_address: String,
    pub delivery_complement: String,
    pub delivery_city: String,
    pub delivery_zip_code: String,
    pub package_description: String,
    pub delivery_instructions: String,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    /// Route length in km
    #[serde(default)]
    pub total_distance: Option<f64>,
}

/// Form data for a new delivery
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDelivery {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub delivery_address: String,
    pub delivery_complement: String,
    pub delivery_city: String,
    pub delivery_zip_code: String,
    pub package_description: String,
    pub delivery_instructions: String,
    #[serde(default)]
    pub total_distance: Option<f64>,
}

/// New delivery with the fields the client stamps on creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeliveryRecord {
    #[serde(flatten)]
    pub delivery: NewDelivery,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

/// Partial update of an existing delivery
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPatch {
    pub status: Option<DeliveryStatus>,
    pub delivery_address: Option<String>,
    pub delivery_complement: Option<String>,
    pub delivery_instructions: Option<String>,
    pub total_distance: Option<f64>,
}

impl DeliveryPatch {
    pub fn status(status: DeliveryStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, delivery: &mut Delivery) {
        if let Some(status) = self.status {
            delivery.status = status;
        }
        if let Some(address) = &self.delivery_address {
            delivery.delivery_address = address.clone();
        }
        if let Some(complement) = &self.delivery_complement {
            delivery.delivery_complement = complement.clone();
        }
        if let Some(instructions) = &self.delivery_instructions {
            delivery.delivery_instructions = instructions.clone();
        }
        if self.total_distance.is_some() {
            delivery.total_distance = self.total_distance;
        }
    }
}

/// One item of the live snapshot stream
pub type DeliverySnapshot = Result<Vec<Delivery>, AppError>;

/// Real-time delivery collection
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Insert a delivery, returning the id the store assigned
    async fn insert(&self, record: NewDeliveryRecord) -> Result<String, AppError>;
    async fn update(&self, id: &str, patch: DeliveryPatch) -> Result<(), AppError>;
    /// Stream of full snapshots; the current contents arrive first
    fn subscribe(&self) -> Receiver<DeliverySnapshot>;
}

/// Dashboard totals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeliverySummary {
    pub total_deliveries: usize,
    /// Sum of known route lengths in km
    pub total_distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub deliveries: Vec<Delivery>,
    pub loading: bool,
}

/// Session-scoped view of the delivery collection
pub struct DeliveryFeed {
    store: Arc<dyn DeliveryStore>,
    toast: ToastController,
    state_tx: Arc<watch::Sender<FeedState>>,
    listener: JoinHandle<()>,
}

impl DeliveryFeed {
    /// Start listening to the store on `runtime`
    pub fn new(store: Arc<dyn DeliveryStore>, toast: ToastController, runtime: &Handle) -> Self {
        let (state_tx, _) = watch::channel(FeedState {
            deliveries: Vec::new(),
            loading: true,
        });
        let state_tx = Arc::new(state_tx);

        let snapshots = store.subscribe();
        let listener = runtime.spawn(Self::listen(snapshots, state_tx.clone()));

        Self {
            store,
            toast,
            state_tx,
            listener,
        }
    }

    async fn listen(snapshots: Receiver<DeliverySnapshot>, state_tx: Arc<watch::Sender<FeedState>>) {
        tracing::info!("Listening for delivery updates");

        while let Ok(snapshot) = snapshots.recv().await {
            match snapshot {
                Ok(mut deliveries) => {
                    deliveries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                    tracing::debug!("Received {} deliveries", deliveries.len());
                    state_tx.send_replace(FeedState {
                        deliveries,
                        loading: false,
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to fetch deliveries: {}", e);
                    state_tx.send_modify(|state| state.loading = false);
                }
            }
        }

        tracing::info!("Delivery stream closed");
    }

    /// Deliveries, newest first
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.state_tx.borrow().deliveries.clone()
    }

    /// True until the first snapshot (or snapshot error) arrives
    pub fn is_loading(&self) -> bool {
        self.state_tx.borrow().loading
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_tx.subscribe()
    }

    pub fn summary(&self) -> DeliverySummary {
        let state = self.state_tx.borrow();
        DeliverySummary {
            total_deliveries: state.deliveries.len(),
            total_distance: state
                .deliveries
                .iter()
                .map(|d| d.total_distance.unwrap_or(0.0))
                .sum(),
        }
    }

    /// Register a new pending delivery
    pub async fn add_delivery(&self, delivery: NewDelivery) -> Result<String, AppError> {
        if delivery.recipient_name.trim().is_empty() || delivery.delivery_address.trim().is_empty()
        {
            return self.report(
                Err(AppError::InvalidInput(
                    "Recipient and address are required".to_string(),
                )),
                "Rejected delivery",
            );
        }

        let record = NewDeliveryRecord {
            delivery,
            status: DeliveryStatus::Pending,
            created_at: Utc::now(),
        };

        let id = self
            .report(self.store.insert(record).await, "Failed to add delivery")?;
        tracing::info!("Added delivery {}", id);
        self.toast.success("Delivery added");
        Ok(id)
    }

    pub async fn update_delivery(&self, id: &str, patch: DeliveryPatch) -> Result<(), AppError> {
        self.report(
            self.store.update(id, patch).await,
            "Failed to update delivery",
        )?;
        tracing::info!("Updated delivery {}", id);
        self.toast.success("Delivery updated");
        Ok(())
    }

    fn report<T>(&self, result: Result<T, AppError>, context: &str) -> Result<T, AppError> {
        result.map_err(|e| {
            tracing::error!("{}: {}", context, e);
            self.toast.error(e.user_message());
            e
        })
    }
}

impl Drop for DeliveryFeed {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::toast::Severity;
    use chrono::Duration as ChronoDuration;

    fn delivery(id: &str, minutes_ago: i64, distance: Option<f64>) -> Delivery {
        Delivery {
            id: id.to_string(),
            recipient_name: "Carla".to_string(),
            recipient_phone: "555-0100".to_string(),
            delivery_address: "Rua A, 10".to_string(),
            delivery_complement: String::new(),
            delivery_city: "Recife".to_string(),
            delivery_zip_code: "50000-000".to_string(),
            package_description: "Box".to_string(),
            delivery_instructions: String::new(),
            status: DeliveryStatus::Pending,
            created_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
            total_distance: distance,
        }
    }

    fn form(name: &str) -> NewDelivery {
        NewDelivery {
            recipient_name: name.to_string(),
            delivery_address: "Av. Boa Viagem, 100".to_string(),
            delivery_city: "Recife".to_string(),
            total_distance: Some(4.5),
            ..Default::default()
        }
    }

    async fn wait_for(feed: &DeliveryFeed, count: usize) {
        let mut rx = feed.subscribe();
        rx.wait_for(|state| !state.loading && state.deliveries.len() == count)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn feed_orders_newest_first() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_deliveries(vec![
            delivery("old", 60, Some(2.0)),
            delivery("new", 1, None),
            delivery("mid", 30, Some(3.5)),
        ]);

        let toast = ToastController::new(Handle::current());
        let feed = DeliveryFeed::new(backend, toast, &Handle::current());
        wait_for(&feed, 3).await;

        let ids: Vec<String> = feed.deliveries().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let summary = feed.summary();
        assert_eq!(summary.total_deliveries, 3);
        assert!((summary.total_distance - 5.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn added_delivery_arrives_through_stream() {
        let backend = Arc::new(MemoryBackend::new());
        let toast = ToastController::new(Handle::current());
        let feed = DeliveryFeed::new(backend, toast.clone(), &Handle::current());
        wait_for(&feed, 0).await;

        let id = feed.add_delivery(form("Diego")).await.unwrap();
        wait_for(&feed, 1).await;

        let stored = &feed.deliveries()[0];
        assert_eq!(stored.id, id);
        assert_eq!(stored.status, DeliveryStatus::Pending);
        assert_eq!(toast.current_state().message, "Delivery added");
    }

    #[tokio::test]
    async fn update_changes_status() {
        let backend = Arc::new(MemoryBackend::new());
        let toast = ToastController::new(Handle::current());
        let feed = DeliveryFeed::new(backend, toast, &Handle::current());
        let id = feed.add_delivery(form("Diego")).await.unwrap();

        feed.update_delivery(&id, DeliveryPatch::status(DeliveryStatus::Completed))
            .await
            .unwrap();

        let mut rx = feed.subscribe();
        rx.wait_for(|state| {
            state
                .deliveries
                .iter()
                .any(|d| d.id == id && d.status == DeliveryStatus::Completed)
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn updating_unknown_delivery_shows_error() {
        let backend = Arc::new(MemoryBackend::new());
        let toast = ToastController::new(Handle::current());
        let feed = DeliveryFeed::new(backend, toast.clone(), &Handle::current());

        let err = feed
            .update_delivery("missing", DeliveryPatch::status(DeliveryStatus::InProgress))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(toast.current_state().severity, Some(Severity::Error));
    }

    #[tokio::test]
    async fn incomplete_form_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let toast = ToastController::new(Handle::current());
        let feed = DeliveryFeed::new(backend, toast.clone(), &Handle::current());

        let err = feed.add_delivery(NewDelivery::default()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(
            toast.current_state().message,
            "Recipient and address are required"
        );
    }

    #[tokio::test]
    async fn snapshot_error_keeps_previous_list() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_deliveries(vec![delivery("a", 5, None)]);
        let toast = ToastController::new(Handle::current());
        let feed = DeliveryFeed::new(backend.clone(), toast, &Handle::current());
        wait_for(&feed, 1).await;

        let mut rx = feed.subscribe();
        rx.borrow_and_update();
        backend.fail_snapshot(AppError::Backend("permission denied".into()));
        rx.changed().await.unwrap();

        assert_eq!(feed.deliveries().len(), 1);
        assert!(!feed.is_loading());
    }

    #[test]
    fn status_parses_from_text() {
        assert_eq!(
            "in-progress".parse::<DeliveryStatus>().unwrap(),
            DeliveryStatus::InProgress
        );
        assert!("lost".parse::<DeliveryStatus>().is_err());
    }
}
