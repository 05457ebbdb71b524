pub mod engine;
pub mod view;
pub mod workload;

pub use engine::block::{Block, BlockStatus, PendingRequest, ProcessId};
pub use engine::placement::{Algorithm, PARTITION_SIZE};
pub use engine::region::{AllocationOutcome, MemoryRegion, RetryPolicy};
pub use view::MemoryView;
pub use workload::{Workload, WorkloadEvent};
