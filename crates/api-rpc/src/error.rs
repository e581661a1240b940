//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes (SPEC_FULL §7).

use jobq_core::AppError;
use jsonrpsee::types::ErrorObjectOwned;

pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const DUPLICATE_ID: i32 = 4001;
    pub const THROTTLED: i32 = 4002;
    pub const NOT_FOUND: i32 = 4004;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORE_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match &err {
        AppError::InvalidInput(_) | AppError::Serialization(_) | AppError::Domain(_) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, err.to_string(), None::<()>)
        }
        AppError::DuplicateId(_) => {
            ErrorObjectOwned::owned(code::DUPLICATE_ID, err.to_string(), None::<()>)
        }
        AppError::NotFound(_) => {
            ErrorObjectOwned::owned(code::NOT_FOUND, err.to_string(), None::<()>)
        }
        AppError::SpawnFailed(_)
        | AppError::Execution(_)
        | AppError::JobTimeout(_)
        | AppError::JobNonZeroExit(_)
        | AppError::Io(_) => {
            ErrorObjectOwned::owned(code::SYSTEM_ERROR, err.to_string(), None::<()>)
        }
        AppError::Store(_) => {
            ErrorObjectOwned::owned(code::STORE_ERROR, err.to_string(), None::<()>)
        }
        AppError::Internal(_) => {
            ErrorObjectOwned::owned(code::INTERNAL_ERROR, err.to_string(), None::<()>)
        }
    }
}

pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code::THROTTLED, "rate limit exceeded", None::<()>)
}
