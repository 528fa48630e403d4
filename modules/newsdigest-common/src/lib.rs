pub mod config;
pub mod error;
pub mod file_config;
pub mod types;

pub use config::Config;
pub use error::DigestError;
pub use file_config::{FallbackCacheSetting, FileConfig, DEFAULT_TOPICS};
pub use types::Article;
