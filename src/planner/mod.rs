pub mod grid;
pub mod snapshot_planner;

pub use grid::{grid, grid_now, INTERVAL, MIN_TIMESTAMP};
pub use snapshot_planner::{initialize_snapshots, update_snapshots};
