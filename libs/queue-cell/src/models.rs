use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    Normal,
    Low,
}

impl Priority {
    /// Lower rank sorts first; urgent entries are never ordered behind
    /// normal/low entries that checked in later.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Urgent => write!(f, "urgent"),
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Waiting,
    Called,
    InProgress,
    Completed,
    NoShow,
}

impl VisitStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VisitStatus::Completed | VisitStatus::NoShow)
    }

    /// The intended lifecycle path. `set_status` may still apply edges
    /// outside this table as a staff override.
    pub fn can_transition_to(&self, target: &VisitStatus) -> bool {
        use VisitStatus::*;
        match (self, target) {
            (Waiting, Called) => true,
            (Called, InProgress) => true,
            (InProgress, Completed) => true,
            (Waiting, NoShow) | (Called, NoShow) => true,
            _ => false,
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitStatus::Waiting => write!(f, "waiting"),
            VisitStatus::Called => write!(f, "called"),
            VisitStatus::InProgress => write!(f, "in_progress"),
            VisitStatus::Completed => write!(f, "completed"),
            VisitStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// One patient's pass through check-in, service, and completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub appointment_type: String,
    pub department: String,
    pub priority: Priority,
    pub status: VisitStatus,
    pub provider_id: Option<Uuid>,
    pub room_id: Option<String>,
    /// Set once at creation, never changes.
    pub check_in_time: DateTime<Utc>,
    /// First-write-wins: stamped the first time the entry enters `called`.
    pub called_time: Option<DateTime<Utc>>,
    /// First-write-wins: stamped the first time the entry enters `completed`.
    pub completed_time: Option<DateTime<Utc>>,
    /// Whole minutes between check-in and call, truncated. Immutable once set.
    pub actual_wait_time_minutes: Option<i64>,
    pub notes: Option<String>,
    pub is_walk_in: bool,
    /// Monotonic sequence assigned at check-in; the denormalized ordering
    /// column that move up/down swaps between adjacent waiting entries.
    pub position: i64,
    /// Revision counter used for compare-and-swap updates.
    pub version: u64,
}

impl QueueEntry {
    pub fn new(request: &CheckInRequest, position: i64, check_in_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            appointment_type: request.appointment_type.clone(),
            department: request.department.clone(),
            priority: request.priority,
            status: VisitStatus::Waiting,
            provider_id: None,
            room_id: None,
            check_in_time,
            called_time: None,
            completed_time: None,
            actual_wait_time_minutes: None,
            notes: request.notes.clone(),
            is_walk_in: request.is_walk_in,
            position,
            version: 0,
        }
    }

    /// Ordering key for the queue: priority tier first, then the
    /// denormalized position within the tier.
    pub fn sort_key(&self) -> (u8, i64) {
        (self.priority.rank(), self.position)
    }

    /// Notes are append-only from the caller's perspective.
    pub fn append_notes(&mut self, extra: &str) {
        self.notes = match self.notes.take() {
            Some(existing) if !existing.is_empty() => Some(format!("{}\n{}", existing, extra)),
            _ => Some(extra.to_string()),
        };
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub patient_id: Uuid,
    pub appointment_type: String,
    pub department: String,
    pub priority: Priority,
    #[serde(default)]
    pub is_walk_in: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: VisitStatus,
    pub provider_id: Option<Uuid>,
    pub room_id: Option<String>,
    pub notes: Option<String>,
}

/// Optional provider/room assignment applied when a patient is called.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallNextRequest {
    pub provider_id: Option<Uuid>,
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    pub direction: MoveDirection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentQuery {
    pub department: Option<String>,
}

/// Read-only projection recomputed from the full entry set on demand.
/// Rates are fractions in [0, 1]; percentage formatting with one decimal
/// place happens at the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMetrics {
    pub department: Option<String>,
    pub total_waiting: u64,
    pub called_today: u64,
    pub completed_today: u64,
    pub no_show_today: u64,
    pub average_wait_time_minutes: f64,
    pub no_show_rate: f64,
    pub completion_rate: f64,
    pub throughput_per_hour: f64,
}
