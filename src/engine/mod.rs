//! Engine: the pure conversion core (state, record store, progress, schedulers, router).

pub mod progress;
pub mod router;
pub mod scheduler;
pub mod state;
pub mod store;

// Re-export commonly used items
pub use progress::{Counter, RunProgress, ScanProgress};
pub use router::{Event, Retry, Task, dispatch, startup_tasks};
pub use scheduler::{conversion_pass, insert_pass};
pub use state::{Connection, Pipeline, ProcessingRun, SchedulerLimits};
pub use store::{FileArtifacts, RecordStore};
