//! Collaborator interfaces consumed by the sidecar.

mod intent;
mod store;
mod task;

pub use intent::IntentClassifier;
pub use store::ResourceStore;
pub use task::TaskStore;
