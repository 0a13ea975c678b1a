pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod filters;
pub mod normalizer;
pub mod registry;
pub mod service;
pub mod sources;
pub mod types;

pub use aggregator::{ContentAggregator, ContentStats};
pub use cache::{CacheService, CacheStats};
pub use config::{load_config, DeploymentConfig, FilterConfig, Sensitivity};
pub use error::{CuratorError, Result};
pub use filters::{build_filter_engine, FilterEngine, FilteredContent};
pub use registry::ProviderRegistry;
pub use service::{ContentService, ServiceStats};
pub use sources::{ProviderAdapter, VimeoAdapter, YouTubeAdapter};
pub use types::*;
