//! dcplan placement: lays selected module instances out on the site grid.
//!
//! This crate does not choose how many modules to build (that's
//! `dcplan-optimizer`). It takes the chosen counts, expands them into
//! instances and packs them greedily, keeping resource-coupled instances close.
//! Instances with fixed positions are reserved first and never moved.
//!
//! # Components
//!
//! - **`locker`**: Locked regions and the lock mask
//! - **`grid`**: Occupancy grid owned by the placer
//! - **`convert`**: Count → instance expansion and placed/unplaced records
//! - **`connectivity`**: Internal-resource coupling and flow mapping
//! - **`placer`**: Greedy placement engine
//! - **`scorer`**: Compactness/connectivity scoring
//! - **`report`**: Text rendering of a placement

pub mod connectivity;
pub mod convert;
pub mod error;
pub mod grid;
pub mod locker;
pub mod placer;
pub mod report;
pub mod scorer;

pub use connectivity::{ConnectivityMatrix, ResourceConnection, connectivity_matrix, resource_connections};
pub use convert::{
    FixedPosition, ModuleInstance, PlacedModuleInstance, RejectedFixed, UnplacedInstance,
    expand_instances,
};
pub use error::{PlacementError, PlacementResult};
pub use grid::{Cell, OccupancyGrid};
pub use locker::{LockMask, LockedRegion, RegionLocker};
pub use placer::{PlacementOutcome, PlacementStatus, place};
pub use report::format_placement_report;
pub use scorer::{PlacementScore, score_placement};
