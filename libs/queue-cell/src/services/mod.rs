pub mod clock;
pub mod lifecycle;
pub mod metrics;
pub mod notifier;
pub mod redis_store;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lifecycle::QueueLifecycleService;
pub use metrics::MetricsProjector;
pub use notifier::{LogNotifier, PatientNotifier};
pub use redis_store::RedisQueueStore;
pub use store::{MemoryQueueStore, QueueStore};
