//! dcplan core: the vocabulary shared by the optimizer, the placer and the CLI.
//!
//! # Components
//!
//! - **`resource`**: resource-unit taxonomy (`ResourceKind`) and unit name normalization
//! - **`catalog`**: module catalog rows and the loader that groups them into `ModuleDefinition`s
//! - **`spec`**: specification rows, rules and the area-mode switch
//! - **`config`**: `dcplan.toml` planner configuration

pub mod catalog;
pub mod config;
pub mod error;
mod rows;
pub mod resource;
pub mod spec;

pub use catalog::{
    CatalogRow, LoadReport, ModuleCatalog, ModuleDefinition, ModuleId, build_catalog,
    load_catalog_json,
};
pub use config::{ObjectiveWeights, PlacementConfig, PlannerConfig, SolverConfig};
pub use error::{CoreError, CoreResult};
pub use resource::{ResourceKind, standardize_unit_name};
pub use spec::{AreaMode, SpecRow, SpecRule, Specification, group_spec_rows, load_specs_json};
