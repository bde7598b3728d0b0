//! Conversions between domain counters and Postgres integer columns.

use crate::application::ports::RepositoryError;

pub(crate) fn to_i32(value: u32, column: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value).map_err(|_| {
        RepositoryError::ConstraintViolation(format!("{column} out of range: {value}"))
    })
}

pub(crate) fn to_i64(value: u64, column: &str) -> Result<i64, RepositoryError> {
    i64::try_from(value).map_err(|_| {
        RepositoryError::ConstraintViolation(format!("{column} out of range: {value}"))
    })
}

pub(crate) fn to_u32(value: i64, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::CorruptRow(format!("{column} out of range: {value}")))
}

pub(crate) fn to_u64(value: i64, column: &str) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::CorruptRow(format!("{column} out of range: {value}")))
}
