use serde::{Deserialize, Serialize};

/// Identifier of a simulated process owning a block. Ids are
/// handed out by the region from a counter that only moves
/// forward, so an id is never shared by two live requests.
pub type ProcessId = u32;

/// Occupancy state of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    /// The block is available for placement.
    Free,
    /// The block is owned by a process.
    Allocated,
    /// The block has been tagged by a collaborator as too
    /// small to be useful. The engine never sets this status
    /// on its own; see `MemoryRegion::tag_fragments`.
    Fragmented,
}

/// A contiguous sub-range of the memory region. Blocks are
/// created by splitting an existing block and destroyed only
/// when adjacent free blocks are merged back together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Owning process, present exactly when the block is
    /// allocated.
    #[serde(rename = "id")]
    pub owner: Option<ProcessId>,
    /// Offset of the block within the region, in KB.
    pub start: u32,
    /// Extent of the block, in KB. Always positive.
    pub size: u32,
    pub status: BlockStatus,
}

impl Block {
    /// A free block covering `[start, start + size)`.
    pub fn free(start: u32, size: u32) -> Self {
        Self {
            owner: None,
            start,
            size,
            status: BlockStatus::Free,
        }
    }

    /// One past the last KB covered by the block.
    pub fn end(&self) -> u32 {
        self.start + self.size
    }

    pub fn is_free(&self) -> bool {
        self.status == BlockStatus::Free
    }
}

/// A request that could not be placed when it was submitted
/// and sits in the FIFO waiting queue until a free suffices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Id reserved for the request; it keeps this id when it
    /// is eventually placed.
    pub id: ProcessId,
    /// Requested extent in KB.
    pub size: u32,
}
