use crate::engine::block::{Block, PendingRequest};
use crate::engine::region::MemoryRegion;

use serde::{Deserialize, Serialize};

/// Read-only picture of a region and its derived statistics,
/// with the field names the display side consumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryView {
    pub total_memory: u32,
    pub used_memory: u32,
    pub free_memory: u32,
    /// Percentage of the capacity sitting in fragmented
    /// blocks.
    pub fragmentation: f64,
    pub blocks: Vec<Block>,
    pub process_queue: Vec<PendingRequest>,
}

impl MemoryView {
    /// Copies the current state of the region out into an
    /// owned view, detached from later mutations.
    pub fn capture(region: &MemoryRegion) -> Self {
        Self {
            total_memory: region.total(),
            used_memory: region.used(),
            free_memory: region.free(),
            fragmentation: region.fragmentation(),
            blocks: region.blocks().to_vec(),
            process_queue: region.waiting().iter().copied().collect(),
        }
    }
}
