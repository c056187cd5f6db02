//! Activity logging module with async queue mechanism

mod logger;
mod subscriber;
pub mod types;

pub use logger::{
    ActivityLogger, ActivitySink, ActivityWorkers, LoggerConfig, PgActivitySink, TracingActivitySink,
};
pub use subscriber::init_tracing;
pub use types::{ActivityLog, ActivityStatus, ActivityType};
