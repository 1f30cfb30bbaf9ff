//! Protocol Dispatcher: decodes frames, owns the callback registry, and
//! decides between hot-swapping a module and a full reload.

pub mod dispatcher;
pub mod loader;
pub mod registry;
pub mod reload;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use loader::{HttpModuleLoader, LoadedModule, ModuleLoader};
pub use registry::{CallbackRegistry, UpdateCallback};
pub use reload::{ReloadReason, Reloader};
