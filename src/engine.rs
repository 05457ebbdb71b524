pub mod block;
pub mod placement;
pub mod region;
