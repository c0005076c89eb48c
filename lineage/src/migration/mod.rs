//! Planning and executing migrations of a store across schema versions.
//!
//! # Migration process
//!
//! A call to [`MigrationEngine::migrate`]:
//! 1. checkpoints the store so its main file holds every write,
//! 2. resolves the store's current [`SchemaVersion`](crate::version::SchemaVersion)
//!    through the registered descriptors,
//! 3. plans one [`MigrationStep`] per version between current and target,
//! 4. feeds each step to the [`SchemaTransformer`], always producing a fresh
//!    store in the scratch directory,
//! 5. verifies the final store and swaps it over the original in one rename.
//!
//! # Atomicity
//!
//! The original store is read but never written before step 5. A failing step,
//! a crash or a verification error leaves it exactly as it was; intermediate
//! stores are removed on the way out or by [`MigrationEngine::purge_scratch`].
//!
//! ```rust,ignore
//! let engine = MigrationEngine::builder()
//!     .registry(registry)
//!     .transformer(
//!         StepTransformers::new()
//!             .register("v1", "v2", |input, output| { /* ... */ Ok(()) })
//!             .register("v2", "v3", |input, output| { /* ... */ Ok(()) }),
//!     )
//!     .build()?;
//!
//! let report = engine.migrate_to_latest(Path::new("/data/app.store"))?;
//! ```

mod builder;
mod config;
mod engine;
mod planner;
mod report;
mod state;
mod step;
mod transformer;

pub use builder::MigrationEngineBuilder;
pub use config::MigrationConfig;
pub use engine::{MigrationEngine, MigrationEngineInner};
pub use planner::MigrationPlanner;
pub use report::MigrationReport;
pub use state::{MigrationEvent, MigrationEventCallback, MigrationEventListener, MigrationState};
pub use step::{MigrationPlan, MigrationStep};
pub use transformer::{SchemaTransformer, StepTransformers};
