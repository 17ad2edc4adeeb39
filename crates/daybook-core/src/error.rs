use thiserror::Error;

/// Conditions raised by the pure task and calendar operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid month {month}: expected a value in 1..=12")]
    InvalidMonth { month: u32 },

    #[error("year {year} is outside the supported calendar range")]
    InvalidYear { year: i32 },

    #[error("task title cannot be blank")]
    BlankTitle,

    #[error("task not found: {id}")]
    TaskNotFound { id: u64 },

    #[error("no task id left after {max}")]
    IdSpaceExhausted { max: u64 },
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
