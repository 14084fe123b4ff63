pub mod args;
pub mod domain;
pub mod error;
pub mod id;
pub mod value;

// Re-export commonly used types
pub use args::{ArgError, Args};
pub use domain::Domain;
pub use error::CoreError;
pub use id::{OperationId, ParamType};
pub use value::Value;
