//! Process-lifecycle orchestration for plugin-style applications.
//!
//! Independently written components are discovered by name, registered
//! lazily, and brought online in two ordered phases before the rest of the
//! application is told it may proceed:
//!
//! 1. every admitted component's `awake` hook runs concurrently, and the
//!    boot waits until all of them have finished;
//! 2. every `start` hook is then dispatched without waiting.
//!
//! When both phases are done the start signal fires and queued subscribers
//! receive the payload given to [`Lifecycle::start`].
//!
//! Components refer to each other through the [`ComponentRegistry`]. Looking
//! up a name that is not registered yet returns a *phantom* handle that the
//! later registration upgrades in place, so the order modules load in does
//! not matter. Libraries and coordinators are both reachable through the
//! read-only [`Namespace`], which evaluates module definitions on demand.
//!
//! # Example
//!
//! ```
//! use kindle::{ComponentData, Container, Lifecycle, LifecycleSettings, ModuleContext};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), kindle::LifecycleError> {
//! let lifecycle = Lifecycle::new(LifecycleSettings::default());
//! lifecycle.add_coordinators(
//!     &Container::folder("Coordinators").with_child(Container::module(
//!         "Clock",
//!         |context: &ModuleContext| {
//!             context.component(
//!                 "Clock",
//!                 ComponentData::new().on_awake(|clock| async move {
//!                     clock.set_field("ticks", 0);
//!                     Ok(())
//!                 }),
//!             )
//!         },
//!     )),
//! )?;
//!
//! let report = lifecycle.start(json!({ "mode": "demo" }))?.wait().await?;
//! assert!(report.is_admitted("Clock"));
//! assert_eq!(lifecycle.await_start().await?, json!({ "mode": "demo" }));
//! # Ok(())
//! # }
//! ```

mod component;
mod error;
mod lifecycle;
mod namespace;
mod orchestrator;
mod registry;
mod reporter;
mod settings;
mod signal;
pub mod telemetry;

pub use component::{
    ComponentData, ComponentHandle, HookError, HookFuture, HookResult, LifecycleHook,
};
pub use error::{ComponentKind, LifecycleError};
pub use lifecycle::{BootHandle, Lifecycle, StartPayload};
pub use namespace::{ComponentIndex, ComponentValue, Container, Module, ModuleContext, Namespace};
pub use orchestrator::{
    AwakeResult, BootPhase, BootReport, ExcludedModule, ExclusionReason, HookOutcome, Orchestrator,
};
pub use registry::ComponentRegistry;
pub use reporter::{BootReporter, StructuredBootReporter};
pub use settings::LifecycleSettings;
pub use signal::{SignalState, StartSignal};

#[cfg(test)]
mod tests;
