//! modgen core - shared configuration and well-known paths
//!
//! Everything the generator needs to know about a project that is not the
//! template tree itself: where templates live, which settings file receives
//! include lines, and the namespace new packages are nested under.

pub mod config;
pub mod paths;

pub use config::Config;
pub use paths::Paths;
