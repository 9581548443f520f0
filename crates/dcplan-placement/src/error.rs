use dcplan_core::ModuleId;
use thiserror::Error;

/// Precondition violations. Layouts that merely do not fit are reported
/// through `PlacementStatus`, never as errors.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },

    #[error("lock mask is {mask_width}x{mask_height} but the grid is {width}x{height}")]
    MaskSize {
        mask_width: u32,
        mask_height: u32,
        width: u32,
        height: u32,
    },

    #[error("module {0} is not in the catalog")]
    UnknownModule(ModuleId),
}

pub type PlacementResult<T> = Result<T, PlacementError>;
