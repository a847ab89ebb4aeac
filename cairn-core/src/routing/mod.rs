//! Two-tier request routing.
//!
//! Tier one ([`resolver`]) picks the application from host and path, tier
//! two ([`locator`]) picks the handler inside it. Both tables are built
//! once at deploy time and only read afterwards.

pub mod glob;
pub mod locator;
pub mod resolver;

pub use glob::GlobPattern;
pub use locator::{Located, ServletLocator};
pub use resolver::{Application, ApplicationResolver, VirtualHost};
