use super::block::{Block, BlockStatus, PendingRequest, ProcessId};
use super::placement::{self, Algorithm, PARTITION_SIZE};
use crate::view::MemoryView;

use std::collections::{HashSet, VecDeque};
use log::{debug, info, warn};

/// Result of an allocation request. Requests never fail: a
/// request that cannot be placed right away joins the waiting
/// queue instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationOutcome {
    /// The request was placed in a block starting at `start`.
    Placed { id: ProcessId, start: u32 },
    /// No free block could satisfy the request; it waits in
    /// the queue under the reserved id.
    Queued { id: ProcessId },
}

impl AllocationOutcome {
    /// Id reserved for the request, placed or not.
    pub fn id(&self) -> ProcessId {
        match *self {
            Self::Placed { id, .. } => id,
            Self::Queued { id } => id,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }
}

/// How the waiting queue is retried after a deallocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Only the head of the queue is attempted. If it does
    /// not fit, nothing else is tried, so a large request at
    /// the head blocks smaller ones behind it.
    HeadOnly,
    /// Every waiting request is attempted in FIFO order;
    /// entries that still do not fit keep their relative
    /// order.
    FullQueue,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::HeadOnly
    }
}

/// A fixed-size memory region subdivided into contiguous
/// blocks. The blocks always cover the whole region in
/// ascending start order, with no gaps and no overlaps;
/// every mutating operation maintains that coverage.
pub struct MemoryRegion {
    /// Capacity of the region in KB, fixed at creation.
    total: u32,
    /// Ordered list of blocks partitioning `[0, total)`.
    blocks: Vec<Block>,
    /// Requests that could not be placed when submitted.
    waiting: VecDeque<PendingRequest>,
    /// Next id to hand out. The counter only moves forward,
    /// so queued and placed requests never collide.
    next_id: ProcessId,
    /// Strategy applied to the waiting queue after a free.
    retry: RetryPolicy,
}

impl MemoryRegion {
    /// A region of `total` KB holding a single free block.
    pub fn new(total: u32) -> Self {
        assert!(total > 0, "region capacity must be positive");

        info!("Created memory region of {} KB.", total);
        Self {
            total,
            blocks: vec![Block::free(0, total)],
            waiting: VecDeque::new(),
            next_id: 1,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the waiting-queue retry strategy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn waiting(&self) -> &VecDeque<PendingRequest> {
        &self.waiting
    }

    /// KB currently held by allocated blocks.
    pub fn used(&self) -> u32 {
        self.blocks
            .iter()
            .filter(|block| block.status == BlockStatus::Allocated)
            .map(|block| block.size)
            .sum()
    }

    /// KB not held by allocated blocks. Fragmented blocks are
    /// not allocated, so they still count as free here even
    /// though placement will not use them.
    pub fn free(&self) -> u32 {
        self.total - self.used()
    }

    /// Share of the capacity sitting in fragmented blocks, as
    /// a percentage. Zero unless a collaborator tagged some
    /// blocks through `tag_fragments`.
    pub fn fragmentation(&self) -> f64 {
        let fragmented: u32 = self
            .blocks
            .iter()
            .filter(|block| block.status == BlockStatus::Fragmented)
            .map(|block| block.size)
            .sum();

        f64::from(fragmented) * 100.0 / f64::from(self.total)
    }

    /// Read-only snapshot of the region with its derived
    /// statistics, in the shape the external collaborators
    /// consume.
    pub fn snapshot(&self) -> MemoryView {
        MemoryView::capture(self)
    }

    /// Places a request of `size` KB using the given placement
    /// algorithm, or queues it when no free block can satisfy
    /// it. The caller is expected to have validated that the
    /// size is positive.
    pub fn allocate(&mut self, size: u32, algorithm: Algorithm) -> AllocationOutcome {
        debug_assert!(size > 0, "allocation size must be positive");

        // Every request consumes a fresh id, whether it ends
        // up placed or waiting, so two queued requests can
        // never share an id.
        let id = self.next_id;
        self.next_id += 1;

        let placed = match algorithm {
            Algorithm::FirstFit => placement::first_fit(&self.blocks, size)
                .map(|index| self.place_at(index, id, size)),
            Algorithm::BestFit => placement::best_fit(&self.blocks, size)
                .map(|index| self.place_at(index, id, size)),
            Algorithm::WorstFit => placement::worst_fit(&self.blocks, size)
                .map(|index| self.place_at(index, id, size)),
            Algorithm::FixedPartitioning => self.allocate_fixed(id, size),
            Algorithm::BuddySystem => self.allocate_buddy(id, size),
        };

        let outcome = match placed {
            Some(start) => {
                debug!("Placed process {} at offset {} with {}.", id, start, algorithm);
                AllocationOutcome::Placed { id, start }
            }
            None => {
                debug!("Queued process {} waiting for {} KB.", id, size);
                self.waiting.push_back(PendingRequest { id, size });
                AllocationOutcome::Queued { id }
            }
        };

        self.check_coverage();
        outcome
    }

    /// Frees the block owned by `owner`. An id that owns no
    /// block is silently ignored. After the block is released,
    /// adjacent free blocks are merged and the waiting queue
    /// is retried according to the retry policy.
    pub fn deallocate(&mut self, owner: ProcessId) {
        let found = self.blocks.iter_mut().find(|block| {
            block.status == BlockStatus::Allocated && block.owner == Some(owner)
        });

        let Some(block) = found else {
            warn!("Deallocate ignored: no block owned by process {}.", owner);
            return;
        };

        block.status = BlockStatus::Free;
        block.owner = None;
        debug!("Freed the block of process {}.", owner);

        self.coalesce();
        self.retry_waiting();
        self.check_coverage();
    }

    /// Reinitializes the region to a single free block and an
    /// empty queue, restarting the id counter.
    pub fn reset(&mut self) {
        self.blocks = vec![Block::free(0, self.total)];
        self.waiting.clear();
        self.next_id = 1;

        info!("Region reset to one free block of {} KB.", self.total);
        self.check_coverage();
    }

    /// Carves a pristine region into fixed partitions of
    /// `PARTITION_SIZE` KB, leaving any leftover capacity as a
    /// trailing free block. Returns false without touching
    /// anything when the region has already been mutated or is
    /// smaller than one partition.
    pub fn carve_partitions(&mut self) -> bool {
        let pristine = self.blocks.len() == 1
            && self.blocks[0].is_free()
            && self.blocks[0].size == self.total;

        let count = self.total / PARTITION_SIZE;
        if !pristine || count == 0 {
            warn!("Partition carving refused: the region is not a single free block of at least {} KB.", PARTITION_SIZE);
            return false;
        }

        self.blocks = (0..count)
            .map(|i| Block::free(i * PARTITION_SIZE, PARTITION_SIZE))
            .collect();

        // Capacity that does not divide evenly stays usable as
        // an undersized trailing block.
        let tail = self.total % PARTITION_SIZE;
        if tail > 0 {
            self.blocks.push(Block::free(count * PARTITION_SIZE, tail));
        }

        info!("Carved {} fixed partitions of {} KB.", count, PARTITION_SIZE);
        self.check_coverage();
        true
    }

    /// Tags every free block smaller than `threshold` as
    /// fragmented, taking it out of consideration for
    /// placement until `clear_fragments` is called. Returns
    /// the number of blocks tagged. The engine never does this
    /// on its own; it is a door for the collaborator driving
    /// the simulation.
    pub fn tag_fragments(&mut self, threshold: u32) -> usize {
        let mut tagged = 0;
        for block in &mut self.blocks {
            if block.is_free() && block.size < threshold {
                block.status = BlockStatus::Fragmented;
                tagged += 1;
            }
        }

        if tagged > 0 {
            debug!("Tagged {} blocks under {} KB as fragmented.", tagged, threshold);
        }
        self.check_coverage();
        tagged
    }

    /// Turns fragmented blocks back into free ones and merges
    /// any neighbours that reunite. Returns the number of
    /// blocks cleared.
    pub fn clear_fragments(&mut self) -> usize {
        let mut cleared = 0;
        for block in &mut self.blocks {
            if block.status == BlockStatus::Fragmented {
                block.status = BlockStatus::Free;
                cleared += 1;
            }
        }

        if cleared > 0 {
            self.coalesce();
            debug!("Cleared {} fragmented blocks.", cleared);
        }
        self.check_coverage();
        cleared
    }

    /// Fixed partitioning: a request larger than one partition
    /// can never be placed, and otherwise only a free block of
    /// exactly the partition size qualifies. The partition is
    /// claimed whole, so a small request still consumes the
    /// full partition.
    fn allocate_fixed(&mut self, id: ProcessId, size: u32) -> Option<u32> {
        if size > PARTITION_SIZE {
            return None;
        }

        placement::exact_partition(&self.blocks)
            .map(|index| self.claim_block(index, id))
    }

    /// Buddy system: the request is rounded up to the next
    /// power of two, and a free power-of-two block is halved
    /// repeatedly until it matches. When no such block exists,
    /// one pass of buddy merging may rebuild a larger block,
    /// so the search is retried once after merging.
    fn allocate_buddy(&mut self, id: ProcessId, size: u32) -> Option<u32> {
        let target = size.checked_next_power_of_two()?;

        let index = match placement::buddy_fit(&self.blocks, target) {
            Some(index) => index,
            None => {
                self.merge_buddies();
                placement::buddy_fit(&self.blocks, target)?
            }
        };

        // Split in halves, keeping the lower half and pushing
        // the upper half back as a free block, until the block
        // is exactly the rounded size.
        while self.blocks[index].size > target {
            let half = self.blocks[index].size / 2;
            self.blocks[index].size = half;

            let upper = Block::free(self.blocks[index].start + half, half);
            self.blocks.insert(index + 1, upper);
        }

        Some(self.claim_block(index, id))
    }

    /// Shrinks the free block at `index` to `size` KB, marks
    /// it allocated, and inserts the remainder right after it
    /// as a new free block, so the region stays fully covered.
    /// Returns the start offset of the placed block.
    fn place_at(&mut self, index: usize, id: ProcessId, size: u32) -> u32 {
        let start = self.blocks[index].start;
        let remainder = self.blocks[index].size - size;

        let block = &mut self.blocks[index];
        block.size = size;
        block.status = BlockStatus::Allocated;
        block.owner = Some(id);

        if remainder > 0 {
            self.blocks
                .insert(index + 1, Block::free(start + size, remainder));
        }

        start
    }

    /// Marks the block at `index` allocated without resizing
    /// it. Returns its start offset.
    fn claim_block(&mut self, index: usize, id: ProcessId) -> u32 {
        let block = &mut self.blocks[index];
        block.status = BlockStatus::Allocated;
        block.owner = Some(id);
        block.start
    }

    /// Merges runs of adjacent free blocks into single blocks.
    /// After a merge the scan stays on the merged block, since
    /// it may now touch another free neighbour, so cascades
    /// collapse in one pass.
    fn coalesce(&mut self) {
        let mut i = 0;
        while i + 1 < self.blocks.len() {
            if self.blocks[i].is_free() && self.blocks[i + 1].is_free() {
                self.blocks[i].size += self.blocks[i + 1].size;
                self.blocks.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    /// Merges adjacent free buddy pairs: blocks of the same
    /// power-of-two size whose left half is aligned to the
    /// doubled size. Repeats until no pair remains, so halves
    /// rebuilt by a merge can merge again at the next size up.
    fn merge_buddies(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;

            for i in 0..self.blocks.len().saturating_sub(1) {
                let left = &self.blocks[i];
                let right = &self.blocks[i + 1];

                if left.is_free()
                    && right.is_free()
                    && left.size == right.size
                    && left.size.is_power_of_two()
                    && left.start % (left.size * 2) == 0
                {
                    self.blocks[i].size *= 2;
                    self.blocks.remove(i + 1);
                    merged = true;
                    break;
                }
            }
        }
    }

    /// Retries the waiting queue after a free. Placement uses
    /// the first-fit scan with the waiting request's reserved
    /// id and submitted size.
    fn retry_waiting(&mut self) {
        match self.retry {
            RetryPolicy::HeadOnly => {
                let Some(head) = self.waiting.front().copied() else {
                    return;
                };

                // Only the head is attempted; if it does not
                // fit, requests behind it stay queued even if
                // they would fit.
                if let Some(index) = placement::first_fit(&self.blocks, head.size) {
                    let start = self.place_at(index, head.id, head.size);
                    self.waiting.pop_front();
                    debug!("Placed waiting process {} at offset {}.", head.id, start);
                }
            }
            RetryPolicy::FullQueue => {
                let mut still_waiting = VecDeque::with_capacity(self.waiting.len());

                while let Some(request) = self.waiting.pop_front() {
                    match placement::first_fit(&self.blocks, request.size) {
                        Some(index) => {
                            let start = self.place_at(index, request.id, request.size);
                            debug!("Placed waiting process {} at offset {}.", request.id, start);
                        }
                        None => still_waiting.push_back(request),
                    }
                }

                self.waiting = still_waiting;
            }
        }
    }

    /// Debug-build check of the structural rules: the blocks
    /// must partition `[0, total)` exactly with positive
    /// sizes, and an owner id must appear on exactly one
    /// allocated block.
    fn check_coverage(&self) {
        if !cfg!(debug_assertions) {
            return;
        }

        let mut cursor = 0;
        let mut owners = HashSet::new();

        for block in &self.blocks {
            assert_eq!(block.start, cursor, "blocks must be contiguous");
            assert!(block.size > 0, "blocks must not be empty");
            assert_eq!(
                block.owner.is_some(),
                block.status == BlockStatus::Allocated,
                "owner must be present exactly on allocated blocks"
            );

            if let Some(owner) = block.owner {
                assert!(owners.insert(owner), "owner ids must be unique");
            }

            cursor = block.end();
        }

        assert_eq!(cursor, self.total, "blocks must cover the whole region");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_coverage(region: &MemoryRegion) {
        let mut cursor = 0;
        for block in region.blocks() {
            assert_eq!(block.start, cursor);
            assert!(block.size > 0);
            cursor = block.end();
        }
        assert_eq!(cursor, region.total());
    }

    /// [free 100 | alloc 50 | free 50 | alloc 50 | free 200],
    /// built through the public operations only.
    fn carved() -> MemoryRegion {
        let mut region = MemoryRegion::new(450);
        for size in [100, 50, 50, 50, 200] {
            region.allocate(size, Algorithm::FirstFit);
        }
        region.deallocate(1);
        region.deallocate(3);
        region.deallocate(5);

        assert_coverage(&region);
        region
    }

    #[test]
    fn starts_as_one_free_block() {
        let region = MemoryRegion::new(1024);

        assert_eq!(region.blocks(), &[Block::free(0, 1024)]);
        assert_eq!(region.used(), 0);
        assert_eq!(region.free(), 1024);
        assert_eq!(region.fragmentation(), 0.0);
        assert!(region.waiting().is_empty());
    }

    #[test]
    fn first_fit_splits_off_the_remainder() {
        let mut region = MemoryRegion::new(1024);

        let outcome = region.allocate(300, Algorithm::FirstFit);
        assert_eq!(outcome, AllocationOutcome::Placed { id: 1, start: 0 });

        assert_eq!(
            region.blocks(),
            &[
                Block {
                    owner: Some(1),
                    start: 0,
                    size: 300,
                    status: BlockStatus::Allocated,
                },
                Block::free(300, 724),
            ]
        );
        assert_eq!(region.used(), 300);
        assert_eq!(region.free(), 724);
    }

    #[test]
    fn unsatisfiable_requests_join_the_queue_and_retry_after_free() {
        let mut region = MemoryRegion::new(1024);

        region.allocate(300, Algorithm::FirstFit);
        let outcome = region.allocate(1000, Algorithm::FirstFit);
        assert_eq!(outcome, AllocationOutcome::Queued { id: 2 });
        assert_eq!(
            region.waiting().front(),
            Some(&PendingRequest { id: 2, size: 1000 })
        );

        // Freeing process 1 merges everything back into one
        // 1024 KB block, which fits the waiting request; the
        // retry places it and leaves a 24 KB remainder.
        region.deallocate(1);

        assert!(region.waiting().is_empty());
        assert_eq!(
            region.blocks(),
            &[
                Block {
                    owner: Some(2),
                    start: 0,
                    size: 1000,
                    status: BlockStatus::Allocated,
                },
                Block::free(1000, 24),
            ]
        );
    }

    #[test]
    fn first_fit_takes_the_earliest_hole() {
        let mut region = carved();

        let outcome = region.allocate(80, Algorithm::FirstFit);
        assert_eq!(outcome, AllocationOutcome::Placed { id: 6, start: 0 });
        assert_eq!(region.blocks()[1], Block::free(80, 20));
        assert_coverage(&region);
    }

    #[test]
    fn best_fit_takes_the_tightest_hole() {
        let mut region = carved();

        // Holes are 100, 50 and 200 KB; 50 is too small, and
        // 100 leaves less slack than 200.
        let outcome = region.allocate(80, Algorithm::BestFit);
        assert_eq!(outcome, AllocationOutcome::Placed { id: 6, start: 0 });
        assert_eq!(region.blocks()[1], Block::free(80, 20));
        assert_coverage(&region);
    }

    #[test]
    fn worst_fit_takes_the_loosest_hole() {
        let mut region = carved();

        let outcome = region.allocate(80, Algorithm::WorstFit);
        assert_eq!(outcome, AllocationOutcome::Placed { id: 6, start: 250 });
        assert_eq!(region.blocks().last(), Some(&Block::free(330, 120)));
        assert_coverage(&region);
    }

    #[test]
    fn fixed_partitioning_queues_without_an_exact_partition() {
        let mut region = MemoryRegion::new(1024);

        // Oversized requests can never fit a partition, and a
        // pristine region holds no 256 KB block, so both
        // requests wait even though 1024 KB sit free.
        let over = region.allocate(300, Algorithm::FixedPartitioning);
        let under = region.allocate(100, Algorithm::FixedPartitioning);

        assert_eq!(over, AllocationOutcome::Queued { id: 1 });
        assert_eq!(under, AllocationOutcome::Queued { id: 2 });
        assert_eq!(region.blocks(), &[Block::free(0, 1024)]);
        assert_eq!(region.waiting().len(), 2);
    }

    #[test]
    fn carving_enables_fixed_partitioning() {
        let mut region = MemoryRegion::new(1024);

        assert!(region.carve_partitions());
        assert_eq!(region.blocks().len(), 4);
        assert_coverage(&region);

        // The partition is claimed whole: the block keeps its
        // 256 KB even though only 100 were requested.
        let outcome = region.allocate(100, Algorithm::FixedPartitioning);
        assert_eq!(outcome, AllocationOutcome::Placed { id: 1, start: 0 });
        assert_eq!(region.blocks()[0].size, 256);
        assert_eq!(region.used(), 256);
    }

    #[test]
    fn carving_keeps_leftover_capacity_as_a_tail_block() {
        let mut region = MemoryRegion::new(1000);

        assert!(region.carve_partitions());
        assert_eq!(region.blocks().len(), 4);
        assert_eq!(region.blocks().last(), Some(&Block::free(768, 232)));
        assert_coverage(&region);
    }

    #[test]
    fn carving_refuses_mutated_or_undersized_regions() {
        let mut region = MemoryRegion::new(1024);
        region.allocate(10, Algorithm::FirstFit);
        assert!(!region.carve_partitions());

        let mut small = MemoryRegion::new(200);
        assert!(!small.carve_partitions());
        assert_eq!(small.blocks(), &[Block::free(0, 200)]);
    }

    #[test]
    fn deallocating_an_unknown_id_changes_nothing() {
        let mut region = MemoryRegion::new(1024);
        region.allocate(100, Algorithm::FirstFit);

        let before = region.blocks().to_vec();
        region.deallocate(42);
        assert_eq!(region.blocks(), &before[..]);
    }

    #[test]
    fn coalescing_cascades_and_is_idempotent() {
        let mut region = MemoryRegion::new(400);
        for _ in 0..4 {
            region.allocate(100, Algorithm::FirstFit);
        }
        region.deallocate(1);
        region.deallocate(3);

        // Freeing the middle block joins three free blocks in
        // a single cascade.
        region.deallocate(2);
        assert_eq!(
            region.blocks(),
            &[
                Block::free(0, 300),
                Block {
                    owner: Some(4),
                    start: 300,
                    size: 100,
                    status: BlockStatus::Allocated,
                },
            ]
        );

        let before = region.blocks().to_vec();
        region.coalesce();
        assert_eq!(region.blocks(), &before[..]);
    }

    #[test]
    fn head_of_line_blocks_smaller_waiters() {
        let mut region = MemoryRegion::new(300);
        for _ in 0..3 {
            region.allocate(100, Algorithm::FirstFit);
        }
        region.allocate(192, Algorithm::FirstFit);
        region.allocate(100, Algorithm::FirstFit);
        assert_eq!(region.waiting().len(), 2);

        // The freed 100 KB cannot hold the 192 KB head, so
        // nothing is placed, not even the 100 KB entry behind
        // it that would fit exactly.
        region.deallocate(2);

        assert_eq!(region.waiting().len(), 2);
        assert_eq!(region.blocks()[1], Block::free(100, 100));
    }

    #[test]
    fn full_queue_policy_places_entries_behind_a_blocked_head() {
        let mut region = MemoryRegion::new(300).with_retry_policy(RetryPolicy::FullQueue);
        for _ in 0..3 {
            region.allocate(100, Algorithm::FirstFit);
        }
        region.allocate(192, Algorithm::FirstFit);
        region.allocate(100, Algorithm::FirstFit);

        region.deallocate(2);

        assert_eq!(
            region.waiting().front(),
            Some(&PendingRequest { id: 4, size: 192 })
        );
        assert_eq!(region.waiting().len(), 1);
        assert_eq!(region.blocks()[1].owner, Some(5));
        assert_coverage(&region);
    }

    #[test]
    fn ids_stay_unique_across_queued_requests() {
        let mut region = MemoryRegion::new(100);

        let first = region.allocate(60, Algorithm::FirstFit);
        let second = region.allocate(60, Algorithm::FirstFit);
        let third = region.allocate(60, Algorithm::FirstFit);
        let fourth = region.allocate(30, Algorithm::FirstFit);

        assert_eq!(first, AllocationOutcome::Placed { id: 1, start: 0 });
        assert_eq!(second, AllocationOutcome::Queued { id: 2 });
        assert_eq!(third, AllocationOutcome::Queued { id: 3 });
        assert_eq!(fourth, AllocationOutcome::Placed { id: 4, start: 60 });
    }

    #[test]
    fn buddy_splits_down_to_the_rounded_size() {
        let mut region = MemoryRegion::new(1024);

        // 100 KB rounds to 128: the 1024 block splits into
        // 512, 256 and two 128 halves, and the lowest half is
        // claimed.
        let outcome = region.allocate(100, Algorithm::BuddySystem);
        assert_eq!(outcome, AllocationOutcome::Placed { id: 1, start: 0 });
        assert_eq!(
            region.blocks(),
            &[
                Block {
                    owner: Some(1),
                    start: 0,
                    size: 128,
                    status: BlockStatus::Allocated,
                },
                Block::free(128, 128),
                Block::free(256, 256),
                Block::free(512, 512),
            ]
        );
        assert_eq!(region.used(), 128);
    }

    #[test]
    fn buddy_claims_a_whole_block_on_an_exact_round() {
        let mut region = MemoryRegion::new(1024);

        let outcome = region.allocate(600, Algorithm::BuddySystem);
        assert_eq!(outcome, AllocationOutcome::Placed { id: 1, start: 0 });
        assert_eq!(region.blocks().len(), 1);
        assert_eq!(region.used(), 1024);
    }

    #[test]
    fn buddy_merges_partitions_back_together() {
        let mut region = MemoryRegion::new(1024);
        assert!(region.carve_partitions());

        // No single 512 KB block exists after carving, but
        // merging the 256 KB buddy pairs rebuilds one.
        let outcome = region.allocate(500, Algorithm::BuddySystem);
        assert_eq!(outcome, AllocationOutcome::Placed { id: 1, start: 0 });
        assert_eq!(region.blocks()[0].size, 512);
        assert_eq!(region.blocks().last(), Some(&Block::free(512, 512)));
        assert_coverage(&region);
    }

    #[test]
    fn buddy_queues_requests_beyond_any_power_of_two() {
        let mut region = MemoryRegion::new(1024);

        let outcome = region.allocate(2000, Algorithm::BuddySystem);
        assert_eq!(outcome, AllocationOutcome::Queued { id: 1 });
        assert_eq!(region.blocks(), &[Block::free(0, 1024)]);
    }

    #[test]
    fn tagged_fragments_count_toward_the_statistic_only() {
        let mut region = MemoryRegion::new(300);
        for _ in 0..3 {
            region.allocate(100, Algorithm::FirstFit);
        }
        region.deallocate(2);

        assert_eq!(region.tag_fragments(150), 1);
        assert!((region.fragmentation() - 100.0 / 3.0).abs() < 1e-9);

        // The tagged hole no longer takes placements, but it
        // still counts as free capacity in the totals.
        assert_eq!(region.free(), 100);
        let outcome = region.allocate(50, Algorithm::FirstFit);
        assert!(!outcome.is_placed());

        assert_eq!(region.clear_fragments(), 1);
        assert_eq!(region.fragmentation(), 0.0);
        assert_eq!(region.blocks()[1].status, BlockStatus::Free);
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let mut region = MemoryRegion::new(512);
        region.allocate(400, Algorithm::FirstFit);
        region.allocate(400, Algorithm::FirstFit);
        assert!(!region.waiting().is_empty());

        region.reset();

        assert_eq!(region.blocks(), &[Block::free(0, 512)]);
        assert!(region.waiting().is_empty());

        // The id counter restarts along with the layout.
        let outcome = region.allocate(10, Algorithm::FirstFit);
        assert_eq!(outcome.id(), 1);
    }

    #[test]
    fn every_operation_preserves_coverage_and_ownership() {
        let mut region = MemoryRegion::new(1024);
        let script: [(u32, Algorithm); 6] = [
            (200, Algorithm::FirstFit),
            (300, Algorithm::BestFit),
            (100, Algorithm::WorstFit),
            (150, Algorithm::BuddySystem),
            (600, Algorithm::FirstFit),
            (50, Algorithm::BestFit),
        ];

        let mut owners = Vec::new();
        for (size, algorithm) in script {
            let outcome = region.allocate(size, algorithm);
            assert_coverage(&region);
            if outcome.is_placed() {
                owners.push(outcome.id());
            }
        }

        for owner in owners {
            region.deallocate(owner);
            assert_coverage(&region);

            let mut seen = std::collections::HashSet::new();
            for block in region.blocks() {
                if let Some(id) = block.owner {
                    assert!(seen.insert(id));
                }
            }
        }
    }
}
