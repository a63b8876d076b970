//! Instance-resolution registry.
//!
//! Calling code asks a [`Registry`] for an instance instead of constructing it
//! directly; tests configure overrides (one-shot queue, persistent stub, custom
//! factory) that intercept those calls.
//!
//! ```
//! use std::sync::Arc;
//! use instancer::{args, implements, Constructible, Constructor, Registry};
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct SystemClock { offset: u64 }
//!
//! impl Clock for SystemClock {
//!     fn now(&self) -> u64 { 1_000 + self.offset }
//! }
//!
//! impl Constructible for SystemClock {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![
//!             Constructor::new(|(): ()| SystemClock { offset: 0 }),
//!             Constructor::new(|(offset,): (u64,)| SystemClock { offset }),
//!         ]
//!     }
//! }
//!
//! implements!(SystemClock => dyn Clock);
//!
//! struct FixedClock(u64);
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { self.0 }
//! }
//!
//! let registry = Registry::new();
//! let clock = registry.create_as::<dyn Clock, SystemClock>(args![5u64]).unwrap();
//! assert_eq!(clock.now(), 1_005);
//!
//! registry.set_one::<dyn Clock>(Arc::new(FixedClock(7)));
//! let clock = registry.create_as::<dyn Clock, SystemClock>(args![]).unwrap();
//! assert_eq!(clock.now(), 7);
//! ```

pub mod config;
pub mod errors;
pub mod logging;
pub mod registry;

// Re-export commonly used items for convenience
pub use config::{Config, ConstructorSelection, RegistryConfig};
pub use errors::{BoxError, ConfigError, RegistryError};
pub use registry::args::{Args, Argument};
pub use registry::construct::{Constructible, Constructor, FromArg, Params, Upcast};
pub use registry::global::global;
pub use registry::{Registry, RegistryStats, Tier};
