//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HostConfig (validated)
//!     → compile.rs (patterns, processors, filters)
//!     → Configuration (immutable, one per service version)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → a new Configuration is deployed as a new service version
//! ```
//!
//! # Design Decisions
//! - Configuration is immutable once built; changes deploy a new version
//! - All host fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod compile;
pub mod configuration;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use compile::build_configuration;
pub use configuration::{Configuration, ConfigurationBuilder, DEFAULT_SCOPE};
pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, FilterConfig, HostConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ProcessorConfig, RouteConfig, ServiceConfig, SessionConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
