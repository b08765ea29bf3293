use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::QueueError;
use crate::models::{
    CallNextRequest, CheckInRequest, MoveDirection, QueueEntry, QueueMetrics, UpdateStatusRequest,
    VisitStatus,
};
use crate::services::clock::Clock;
use crate::services::metrics::MetricsProjector;
use crate::services::notifier::PatientNotifier;
use crate::services::store::QueueStore;

/// Bounded rescans for call-next when a compare-and-swap loses its race.
const MAX_CALL_ATTEMPTS: usize = 3;

/// Owns the visit state machine, the ordering policy, and the wait-time
/// accounting. Every mutation is a read-modify-write guarded by the
/// store's per-entry version, so two staff members acting on the same
/// entry produce exactly one winner; the loser sees a typed failure.
pub struct QueueLifecycleService {
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn PatientNotifier>,
    metrics: MetricsProjector,
    average_service_minutes: i64,
}

impl QueueLifecycleService {
    pub fn new(
        store: Arc<dyn QueueStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn PatientNotifier>,
        config: &AppConfig,
    ) -> Self {
        let clinic_offset = FixedOffset::east_opt(config.clinic_utc_offset_minutes * 60)
            .unwrap_or_else(|| {
                warn!(
                    "CLINIC_UTC_OFFSET_MINUTES={} is out of range, falling back to UTC",
                    config.clinic_utc_offset_minutes
                );
                Utc.fix()
            });
        Self {
            store,
            clock,
            notifier,
            metrics: MetricsProjector::new(clinic_offset),
            average_service_minutes: config.average_service_minutes,
        }
    }

    /// Check a patient in: a fresh `waiting` entry at the back of its
    /// priority tier. Returns the entry together with the estimated wait
    /// in minutes (a display heuristic, never stored).
    pub async fn enqueue(
        &self,
        request: CheckInRequest,
    ) -> Result<(QueueEntry, i64), QueueError> {
        if request.appointment_type.trim().is_empty() {
            return Err(QueueError::Validation(
                "appointment_type must not be empty".to_string(),
            ));
        }
        if request.department.trim().is_empty() {
            return Err(QueueError::Validation(
                "department must not be empty".to_string(),
            ));
        }

        let position = self.store.next_position().await?;
        let entry = QueueEntry::new(&request, position, self.clock.now());

        let peers = self.store.list().await?;
        let estimate = self.estimate(&peers, entry.sort_key(), &entry.department);

        self.store.insert(entry.clone()).await?;
        info!(
            "Checked in patient {} as entry {} ({} priority, position {})",
            entry.patient_id, entry.id, entry.priority, entry.position
        );
        Ok((entry, estimate))
    }

    /// Advance the highest-priority, earliest-checked-in waiting entry to
    /// `called`, optionally scoped to a department. A lost race rescans a
    /// bounded number of times; two concurrent calls against the last
    /// waiting entry produce one winner and one `EmptyQueue`/`Conflict`.
    pub async fn call_next(
        &self,
        department: Option<&str>,
        assignment: CallNextRequest,
    ) -> Result<QueueEntry, QueueError> {
        let mut contended = None;

        for _ in 0..MAX_CALL_ATTEMPTS {
            let entries = self.store.list().await?;
            let candidate = entries
                .iter()
                .filter(|e| e.status == VisitStatus::Waiting)
                .filter(|e| department.map_or(true, |d| e.department == d))
                .min_by_key(|e| e.sort_key());

            let Some(candidate) = candidate else {
                return Err(QueueError::EmptyQueue);
            };

            let mut updated = candidate.clone();
            updated.status = VisitStatus::Called;
            self.stamp_times(&mut updated);
            if assignment.provider_id.is_some() {
                updated.provider_id = assignment.provider_id;
            }
            if assignment.room_id.is_some() {
                updated.room_id = assignment.room_id.clone();
            }
            updated.version += 1;

            if self.store.update(candidate.version, updated.clone()).await? {
                info!(
                    "Called entry {} for patient {} (waited {} min)",
                    updated.id,
                    updated.patient_id,
                    updated.actual_wait_time_minutes.unwrap_or(0)
                );
                self.notifier.patient_called(&updated).await;
                return Ok(updated);
            }

            debug!("Lost call race for entry {}, rescanning", candidate.id);
            contended = Some(candidate.id);
        }

        match contended {
            Some(id) => Err(QueueError::Conflict(id)),
            None => Err(QueueError::EmptyQueue),
        }
    }

    /// `called` → `in_progress`: the provider begins seeing the patient.
    pub async fn begin(&self, entry_id: Uuid) -> Result<QueueEntry, QueueError> {
        self.transition(entry_id, VisitStatus::InProgress).await
    }

    /// `in_progress` → `completed`: stamps the completion time.
    pub async fn complete(&self, entry_id: Uuid) -> Result<QueueEntry, QueueError> {
        self.transition(entry_id, VisitStatus::Completed).await
    }

    /// `waiting`/`called` → `no_show`.
    pub async fn mark_no_show(&self, entry_id: Uuid) -> Result<QueueEntry, QueueError> {
        self.transition(entry_id, VisitStatus::NoShow).await
    }

    /// Apply a status change requested by staff. Edges in the transition
    /// table are the sanctioned path; anything else is accepted as an
    /// explicit override, matching the free reassignment the queue UI
    /// exposes. Timestamps are first-write-wins either way, so historical
    /// wait metrics survive overrides.
    pub async fn set_status(
        &self,
        entry_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<QueueEntry, QueueError> {
        let current = self
            .store
            .get(entry_id)
            .await?
            .ok_or(QueueError::NotFound(entry_id))?;

        let sanctioned =
            current.status == request.status || current.status.can_transition_to(&request.status);
        if !sanctioned {
            warn!(
                "Status override for entry {}: {} -> {}",
                entry_id, current.status, request.status
            );
        }

        let mut updated = current.clone();
        updated.status = request.status;
        self.stamp_times(&mut updated);
        if request.provider_id.is_some() {
            updated.provider_id = request.provider_id;
        }
        if request.room_id.is_some() {
            updated.room_id = request.room_id.clone();
        }
        if let Some(extra) = request.notes.as_deref() {
            updated.append_notes(extra);
        }
        updated.version += 1;

        if !self.store.update(current.version, updated.clone()).await? {
            return Err(self.lost_update_error(entry_id).await);
        }

        info!("Entry {} status set to {}", entry_id, updated.status);
        if updated.status == VisitStatus::Called && current.status != VisitStatus::Called {
            self.notifier.patient_called(&updated).await;
        }
        Ok(updated)
    }

    /// Swap the entry's position with its neighbor in the active ordering:
    /// waiting entries of the same department and priority tier. A swap
    /// across tiers would not change the displayed order (priority
    /// dominates the sort), so tier edges are rejected rather than
    /// silently ignored.
    pub async fn move_entry(
        &self,
        entry_id: Uuid,
        direction: MoveDirection,
    ) -> Result<QueueEntry, QueueError> {
        let entry = self
            .store
            .get(entry_id)
            .await?
            .ok_or(QueueError::NotFound(entry_id))?;

        if entry.status != VisitStatus::Waiting {
            return Err(QueueError::InvalidOperation(format!(
                "only waiting entries can be moved, entry is {}",
                entry.status
            )));
        }

        let entries = self.store.list().await?;
        let mut tier: Vec<QueueEntry> = entries
            .into_iter()
            .filter(|e| {
                e.status == VisitStatus::Waiting
                    && e.department == entry.department
                    && e.priority == entry.priority
            })
            .collect();
        tier.sort_by_key(|e| e.position);

        let idx = tier
            .iter()
            .position(|e| e.id == entry_id)
            .ok_or(QueueError::Conflict(entry_id))?;
        let neighbor_idx = match direction {
            MoveDirection::Up if idx > 0 => idx - 1,
            MoveDirection::Down if idx + 1 < tier.len() => idx + 1,
            MoveDirection::Up => {
                return Err(QueueError::InvalidOperation(
                    "entry is already at the front of its priority tier".to_string(),
                ))
            }
            MoveDirection::Down => {
                return Err(QueueError::InvalidOperation(
                    "entry is already at the back of its priority tier".to_string(),
                ))
            }
        };

        let current = tier[idx].clone();
        let neighbor = tier[neighbor_idx].clone();

        let mut moved = current.clone();
        let mut displaced = neighbor.clone();
        moved.position = neighbor.position;
        displaced.position = current.position;
        moved.version += 1;
        displaced.version += 1;

        if !self
            .store
            .update_pair(current.version, moved.clone(), neighbor.version, displaced)
            .await?
        {
            return Err(self.lost_update_error(entry_id).await);
        }

        debug!(
            "Moved entry {} {} within {} tier of {}",
            entry_id, direction_label(direction), current.priority, current.department
        );
        Ok(moved)
    }

    /// Unconditional hard delete, valid from any status. Not a state
    /// transition; the entry is discarded.
    pub async fn remove(&self, entry_id: Uuid) -> Result<(), QueueError> {
        if self.store.remove(entry_id).await? {
            info!("Removed entry {} from queue", entry_id);
            Ok(())
        } else {
            Err(QueueError::NotFound(entry_id))
        }
    }

    pub async fn get(&self, entry_id: Uuid) -> Result<QueueEntry, QueueError> {
        self.store
            .get(entry_id)
            .await?
            .ok_or(QueueError::NotFound(entry_id))
    }

    /// Snapshot in display order: waiting first by (priority, position),
    /// then called/in-progress, then terminal entries. Safe to call at
    /// arbitrary polling frequency.
    pub async fn list(&self, department: Option<&str>) -> Result<Vec<QueueEntry>, QueueError> {
        let mut entries: Vec<QueueEntry> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|e| department.map_or(true, |d| e.department == d))
            .collect();
        entries.sort_by_key(|e| (display_group(e.status), e.sort_key()));
        Ok(entries)
    }

    /// Estimated wait for an already-queued entry, recomputed on demand.
    pub async fn estimated_wait_for(&self, entry: &QueueEntry) -> Result<i64, QueueError> {
        let entries = self.store.list().await?;
        Ok(self.estimate(&entries, entry.sort_key(), &entry.department))
    }

    pub async fn metrics(&self, department: Option<&str>) -> Result<QueueMetrics, QueueError> {
        let entries = self.store.list().await?;
        Ok(self.metrics.project(&entries, department, self.clock.now()))
    }

    // Waiting entries ahead of `reference` in the same department, times
    // the configured average service time. A display heuristic only.
    fn estimate(&self, entries: &[QueueEntry], reference: (u8, i64), department: &str) -> i64 {
        let ahead = entries
            .iter()
            .filter(|e| {
                e.status == VisitStatus::Waiting
                    && e.department == department
                    && e.sort_key() < reference
            })
            .count() as i64;
        ahead * self.average_service_minutes
    }

    // Strict path for the named operations: the edge must be in the
    // transition table.
    async fn transition(
        &self,
        entry_id: Uuid,
        target: VisitStatus,
    ) -> Result<QueueEntry, QueueError> {
        let current = self
            .store
            .get(entry_id)
            .await?
            .ok_or(QueueError::NotFound(entry_id))?;

        if !current.status.can_transition_to(&target) {
            return Err(QueueError::InvalidOperation(format!(
                "cannot transition entry from {} to {}",
                current.status, target
            )));
        }

        let mut updated = current.clone();
        updated.status = target;
        self.stamp_times(&mut updated);
        updated.version += 1;

        if !self.store.update(current.version, updated.clone()).await? {
            return Err(self.lost_update_error(entry_id).await);
        }

        debug!(
            "Entry {} transitioned {} -> {}",
            entry_id, current.status, updated.status
        );
        Ok(updated)
    }

    // First-write-wins timestamping on entering `called` / `completed`.
    // Re-entering via an override never re-stamps, so wait-time history
    // cannot be corrupted after the fact.
    fn stamp_times(&self, entry: &mut QueueEntry) {
        let now = self.clock.now();
        if entry.status == VisitStatus::Called && entry.called_time.is_none() {
            entry.called_time = Some(now);
            entry.actual_wait_time_minutes =
                Some((now - entry.check_in_time).num_minutes().max(0));
        }
        if entry.status == VisitStatus::Completed && entry.completed_time.is_none() {
            entry.completed_time = Some(now);
        }
    }

    // A failed compare-and-swap means either the entry vanished or someone
    // else won the race; re-read to report the right failure.
    async fn lost_update_error(&self, entry_id: Uuid) -> QueueError {
        match self.store.get(entry_id).await {
            Ok(Some(_)) => QueueError::Conflict(entry_id),
            Ok(None) => QueueError::NotFound(entry_id),
            Err(e) => e,
        }
    }
}

fn display_group(status: VisitStatus) -> u8 {
    match status {
        VisitStatus::Waiting => 0,
        VisitStatus::Called => 1,
        VisitStatus::InProgress => 2,
        VisitStatus::Completed => 3,
        VisitStatus::NoShow => 4,
    }
}

fn direction_label(direction: MoveDirection) -> &'static str {
    match direction {
        MoveDirection::Up => "up",
        MoveDirection::Down => "down",
    }
}
