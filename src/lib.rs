//! Month-at-a-time activity aggregation for assistant calendar views.
//!
//! An [`AgendaEngine`] is built per signed-in user over an [`ActivityStore`]
//! port. Selecting a month plans one fetch per activity kind (indexed range
//! query, falling back to a filtered full scan when the store's range index
//! is unavailable), caches the results, and serves day buckets, filtered
//! pages, and due-soon notification batches from that cache until the next
//! selection.

pub mod cache;
pub mod config;
pub mod day_index;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod local_date;
pub mod pagination;
pub mod planner;
pub mod scanner;
pub mod stats;
pub mod store;
pub mod types;

pub use cache::{CacheSnapshot, MonthCache};
pub use config::EngineConfig;
pub use engine::{AgendaEngine, KindLoadReport, MonthLoadReport};
pub use error::{EngineError, StoreError};
pub use pagination::{paginate, Page};
pub use planner::{FetchStrategy, MonthFetch, QueryPlanner};
pub use scanner::NotificationScanner;
pub use stats::KindFetchStats;
pub use store::{ActivityStore, InMemoryStore};
pub use types::{
    Activity, ActivityKind, ActivityOrigin, ActivityStatus, CalendarMonth, DayActivities,
    DayCounts, KindFilter, NotificationBatch, NotificationCandidate, TaskPriority,
};
