use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use queue_cell::models::{CheckInRequest, Priority};
use queue_cell::services::clock::ManualClock;
use queue_cell::services::lifecycle::QueueLifecycleService;
use queue_cell::services::notifier::LogNotifier;
use queue_cell::services::store::MemoryQueueStore;
use shared_utils::test_utils::TestConfig;

pub struct TestQueue {
    pub lifecycle: Arc<QueueLifecycleService>,
    pub clock: Arc<ManualClock>,
}

/// Monday 09:00 UTC, an arbitrary but fixed clinic morning.
pub fn clinic_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

pub fn test_queue() -> TestQueue {
    test_queue_with_offset(0)
}

pub fn test_queue_with_offset(clinic_utc_offset_minutes: i32) -> TestQueue {
    let clock = Arc::new(ManualClock::new(clinic_morning()));
    let store = Arc::new(MemoryQueueStore::new());
    let config = TestConfig {
        clinic_utc_offset_minutes,
        ..TestConfig::default()
    }
    .to_app_config();
    let lifecycle = Arc::new(QueueLifecycleService::new(
        store,
        clock.clone(),
        Arc::new(LogNotifier),
        &config,
    ));
    TestQueue { lifecycle, clock }
}

pub fn check_in(priority: Priority, department: &str) -> CheckInRequest {
    CheckInRequest {
        patient_id: Uuid::new_v4(),
        appointment_type: "general_consultation".to_string(),
        department: department.to_string(),
        priority,
        is_walk_in: false,
        notes: None,
    }
}
