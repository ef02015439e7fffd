pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{parse_vector, StoreConfig};
pub use error::TwinTreeError;
pub type Result<T> = std::result::Result<T, TwinTreeError>;
