use ucsb_client::ApiError;
use ucsb_schema::SchemaError;

use crate::session::AccessDenied;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceError {
    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error(transparent)]
    Denied(#[from] AccessDenied),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A singleton read returned something other than a JSON object.
    #[error("{0} did not return a record")]
    NotARecord(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
