//! Session controller: owns the presentation state and routes keys to operations.

#[allow(clippy::module_inception)]
mod app;
mod event;
mod state;

pub use app::App;
pub use event::{ActivityGuard, Update};
pub use state::{Activity, Focus};
