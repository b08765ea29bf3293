use chrono::{DateTime, FixedOffset, Timelike, Utc};

use crate::models::{QueueEntry, QueueMetrics, VisitStatus};

/// Derives queue metrics from the full entry set on demand. Nothing is
/// incrementally maintained, so two calls with no intervening mutation
/// always agree.
///
/// "Today" is the clinic-local day derived from the configured UTC
/// offset, not UTC midnight; a late-evening clinic ahead of or behind
/// UTC would otherwise misclassify visits near the boundary.
pub struct MetricsProjector {
    clinic_offset: FixedOffset,
}

impl MetricsProjector {
    pub fn new(clinic_offset: FixedOffset) -> Self {
        Self { clinic_offset }
    }

    pub fn project(
        &self,
        entries: &[QueueEntry],
        department: Option<&str>,
        now: DateTime<Utc>,
    ) -> QueueMetrics {
        let scoped: Vec<&QueueEntry> = entries
            .iter()
            .filter(|e| department.map_or(true, |d| e.department == d))
            .collect();

        let local_now = now.with_timezone(&self.clinic_offset);
        let local_today = local_now.date_naive();
        let is_today = |ts: DateTime<Utc>| {
            ts.with_timezone(&self.clinic_offset).date_naive() == local_today
        };

        let total_waiting = scoped
            .iter()
            .filter(|e| e.status == VisitStatus::Waiting)
            .count() as u64;

        let waits: Vec<i64> = scoped
            .iter()
            .filter(|e| e.called_time.map_or(false, is_today))
            .filter_map(|e| e.actual_wait_time_minutes)
            .collect();
        let called_today = waits.len() as u64;
        let average_wait_time_minutes = if waits.is_empty() {
            0.0
        } else {
            waits.iter().sum::<i64>() as f64 / waits.len() as f64
        };

        let completed_today = scoped
            .iter()
            .filter(|e| {
                e.status == VisitStatus::Completed && e.completed_time.map_or(false, is_today)
            })
            .count() as u64;

        // No-show entries carry no terminal timestamp; they are attributed
        // to the day the patient checked in.
        let no_show_today = scoped
            .iter()
            .filter(|e| e.status == VisitStatus::NoShow && is_today(e.check_in_time))
            .count() as u64;

        let terminal_today = completed_today + no_show_today;
        let (no_show_rate, completion_rate) = if terminal_today == 0 {
            (0.0, 0.0)
        } else {
            (
                no_show_today as f64 / terminal_today as f64,
                completed_today as f64 / terminal_today as f64,
            )
        };

        let hours_into_day = local_now.time().num_seconds_from_midnight() as f64 / 3600.0;
        let throughput_per_hour = if hours_into_day > 0.0 {
            completed_today as f64 / hours_into_day
        } else {
            0.0
        };

        QueueMetrics {
            department: department.map(str::to_string),
            total_waiting,
            called_today,
            completed_today,
            no_show_today,
            average_wait_time_minutes,
            no_show_rate,
            completion_rate,
            throughput_per_hour,
        }
    }
}
