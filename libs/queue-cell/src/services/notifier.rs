use async_trait::async_trait;
use tracing::info;

use crate::models::QueueEntry;

/// Outbound patient notification seam. SMS delivery belongs to an
/// external collaborator; the lifecycle only fires the event and never
/// fails a transition on notification problems.
#[async_trait]
pub trait PatientNotifier: Send + Sync {
    async fn patient_called(&self, entry: &QueueEntry);
}

/// Stand-in notifier that records the event in the log stream.
pub struct LogNotifier;

#[async_trait]
impl PatientNotifier for LogNotifier {
    async fn patient_called(&self, entry: &QueueEntry) {
        info!(
            "Patient {} called for entry {} in {} (room: {})",
            entry.patient_id,
            entry.id,
            entry.department,
            entry.room_id.as_deref().unwrap_or("unassigned"),
        );
    }
}
