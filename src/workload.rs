use crate::engine::block::ProcessId;
use crate::engine::placement::Algorithm;
use crate::engine::region::{AllocationOutcome, MemoryRegion};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Odds that a step tries to submit a request rather than
/// release one.
const ALLOCATE_ODDS: f64 = 0.5;
/// Free capacity (KB) that must remain before a step submits
/// a new request.
const FREE_FLOOR: u32 = 50;
/// Smallest request a step may submit, in KB.
const MIN_REQUEST: u32 = 20;
/// Largest request a step may submit, in KB.
const MAX_REQUEST: u32 = 120;

/// What a single workload step did to the region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkloadEvent {
    /// A request of `size` KB was submitted with `algorithm`.
    Requested {
        outcome: AllocationOutcome,
        size: u32,
        algorithm: Algorithm,
    },
    /// The block owned by `owner` was released.
    Released { owner: ProcessId },
    /// Nothing could be done this step.
    Idle,
}

/// Random driver that exercises a region the way an operating
/// system under churn would: a coin flip between submitting a
/// modest request with a random dynamic algorithm and
/// releasing a random live process.
pub struct Workload {
    rng: StdRng,
}

impl Workload {
    /// A workload seeded from ambient randomness.
    pub fn new() -> Self {
        Self::seeded(rand::rng().random())
    }

    /// A workload with a fixed seed, so a run can be replayed
    /// step for step.
    pub fn seeded(seed: u64) -> Self {
        debug!("Workload seeded with {}.", seed);
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Runs `steps` steps against the region and reports what
    /// each one did.
    pub fn run(&mut self, region: &mut MemoryRegion, steps: u32) -> Vec<WorkloadEvent> {
        (0..steps).map(|_| self.step(region)).collect()
    }

    /// Advances the workload by one step: a coin flip picks
    /// between a request (if enough capacity remains free) and
    /// releasing a random live process. With no process to
    /// release the step idles.
    pub fn step(&mut self, region: &mut MemoryRegion) -> WorkloadEvent {
        let owners: Vec<ProcessId> = region
            .blocks()
            .iter()
            .filter_map(|block| block.owner)
            .collect();

        if self.rng.random_bool(ALLOCATE_ODDS) && region.free() > FREE_FLOOR {
            let size = self.rng.random_range(MIN_REQUEST..=MAX_REQUEST);
            let algorithm = self.pick_algorithm();
            let outcome = region.allocate(size, algorithm);
            return WorkloadEvent::Requested {
                outcome,
                size,
                algorithm,
            };
        }

        if owners.is_empty() {
            return WorkloadEvent::Idle;
        }

        let owner = owners[self.rng.random_range(0..owners.len())];
        region.deallocate(owner);
        WorkloadEvent::Released { owner }
    }

    /// One of the three dynamic placement algorithms, drawn
    /// uniformly. Fixed partitioning and the buddy system are
    /// left out, since they reshape the block list in ways the
    /// churn pattern is not meant to model.
    fn pick_algorithm(&mut self) -> Algorithm {
        match self.rng.random_range(0..3) {
            0 => Algorithm::FirstFit,
            1 => Algorithm::BestFit,
            _ => Algorithm::WorstFit,
        }
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self::new()
    }
}
