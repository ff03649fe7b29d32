//! Error type shared by the persistence ports.

use crate::domain::Error;

use super::define_port_error;

define_port_error! {
    /// Failures raised by store adapters.
    pub enum StoreError {
        /// Store connection could not be established.
        Connection { message: String } => "store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "store query failed: {message}",
        /// A uniqueness constraint rejected the write.
        Conflict { message: String } => "store constraint violated: {message}",
    }
}

impl From<StoreError> for Error {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Connection { message } => {
                Error::service_unavailable(format!("store unavailable: {message}"))
            }
            StoreError::Query { message } => Error::internal(format!("store error: {message}")),
            StoreError::Conflict { message } => Error::conflict(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(StoreError::connection("refused"), ErrorCode::ServiceUnavailable)]
    #[case(StoreError::query("syntax"), ErrorCode::InternalError)]
    #[case(StoreError::conflict("name taken"), ErrorCode::Conflict)]
    fn store_errors_map_to_domain_codes(#[case] error: StoreError, #[case] code: ErrorCode) {
        assert_eq!(Error::from(error).code(), code);
    }
}
