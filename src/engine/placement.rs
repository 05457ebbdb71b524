use super::block::Block;

use std::fmt;
use log::warn;

/// Extent of one partition under fixed partitioning, in KB.
pub const PARTITION_SIZE: u32 = 256;

/// Strategy for choosing which free block satisfies a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    /// First free block that is large enough, in address
    /// order.
    FirstFit,
    /// Free block leaving the smallest leftover; ties keep
    /// the earliest block found.
    BestFit,
    /// Free block leaving the largest leftover; ties keep the
    /// earliest block found.
    WorstFit,
    /// Free partition of exactly `PARTITION_SIZE`, claimed
    /// whole without splitting.
    FixedPartitioning,
    /// Power-of-two sized block, split in halves down to the
    /// rounded request size.
    BuddySystem,
}

impl Algorithm {
    /// Maps a request token to an algorithm. Dynamic
    /// partitioning is another name for first fit, and tokens
    /// that are not recognized at all fall back to first fit
    /// as well, with a warning.
    pub fn parse(token: &str) -> Self {
        match token {
            "first-fit" | "dynamic-partitioning" => Self::FirstFit,
            "best-fit" => Self::BestFit,
            "worst-fit" => Self::WorstFit,
            "fixed-partitioning" => Self::FixedPartitioning,
            "buddy-system" => Self::BuddySystem,
            _ => {
                warn!("Unknown algorithm '{}', defaulting to first-fit.", token);
                Self::FirstFit
            }
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::FirstFit => "first-fit",
            Self::BestFit => "best-fit",
            Self::WorstFit => "worst-fit",
            Self::FixedPartitioning => "fixed-partitioning",
            Self::BuddySystem => "buddy-system",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// First free block large enough for the request, scanning in
/// ascending start order.
pub(crate) fn first_fit(blocks: &[Block], size: u32) -> Option<usize> {
    blocks
        .iter()
        .position(|block| block.is_free() && block.size >= size)
}

/// Free block that minimizes the leftover space. The strict
/// comparison keeps the first minimum found, so ties resolve
/// to the earliest block in the scan.
pub(crate) fn best_fit(blocks: &[Block], size: u32) -> Option<usize> {
    let mut selected = None;
    let mut smallest = u32::MAX;

    for (index, block) in blocks.iter().enumerate() {
        if block.is_free() && block.size >= size {
            let leftover = block.size - size;
            if leftover < smallest {
                smallest = leftover;
                selected = Some(index);
            }
        }
    }

    selected
}

/// Free block that maximizes the leftover space, the mirror
/// of `best_fit` with the same tie handling.
pub(crate) fn worst_fit(blocks: &[Block], size: u32) -> Option<usize> {
    let mut selected = None;
    let mut largest = 0;

    for (index, block) in blocks.iter().enumerate() {
        if block.is_free() && block.size >= size {
            let leftover = block.size - size;
            if selected.is_none() || leftover > largest {
                largest = leftover;
                selected = Some(index);
            }
        }
    }

    selected
}

/// First free block whose size is exactly one partition. Under
/// fixed partitioning a partition is claimed whole, so only an
/// exact match qualifies.
pub(crate) fn exact_partition(blocks: &[Block]) -> Option<usize> {
    blocks
        .iter()
        .position(|block| block.is_free() && block.size == PARTITION_SIZE)
}

/// First free block suitable for the buddy system: its size
/// must itself be a power of two no smaller than the rounded
/// request, so it can be halved repeatedly down to an exact
/// fit.
pub(crate) fn buddy_fit(blocks: &[Block], target: u32) -> Option<usize> {
    blocks.iter().position(|block| {
        block.is_free() && block.size.is_power_of_two() && block.size >= target
    })
}
