//! dcplan optimizer: chooses how many instances of each catalog module to
//! build for a specification.
//!
//! The problem is an integer linear program: one non-negative integer count
//! per module, a weighted objective over net resource flows (and optionally
//! total area), hard Below/Above limits, an area budget and a non-negative
//! balance for every internal resource.
//!
//! # Components
//!
//! - **`model`**: Linear model formulation from catalog, spec and weights
//! - **`milp`**: Branch-and-bound over `good_lp` relaxations with time/node limits
//! - **`optimizer`**: `solve` entry point, result extraction and verification
//! - **`result`**: `OptimizationResult` and `SolveStatus`
//! - **`report`**: Text rendering of a result

pub mod milp;
pub mod model;
pub mod optimizer;
pub mod report;
pub mod result;

pub use model::{Formulation, LinearConstraint, LinearModel, Sense, formulate};
pub use optimizer::{
    SolveSettings, VERIFY_TOLERANCE, initial_resources_from_modules, solve, solve_all,
};
pub use report::format_result;
pub use result::{OptimizationResult, ResourceTotals, SolveStatus};
