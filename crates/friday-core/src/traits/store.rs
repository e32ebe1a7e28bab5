//! Resource persistence interface.

use crate::error::SidecarResult;
use crate::types::Resource;

/// Persistence store keyed by resource id.
pub trait ResourceStore: Send + Sync {
    /// Insert a new record. Fails if the id already exists.
    fn create(&self, resource: &Resource) -> SidecarResult<()>;

    /// Replace an existing record. Returns `false` if the id is unknown.
    fn update(&self, resource: &Resource) -> SidecarResult<bool>;

    /// Fetch a record by id.
    fn get(&self, id: &str) -> SidecarResult<Option<Resource>>;
}
