//! Base repository trait for database operations.

use std::collections::HashMap;

use crate::db::errors::Result;

/// CRUD surface shared by the entity-shaped repositories.
///
/// Request, response, id and filter types are separate associated types so a repository can
/// accept narrower inputs than the rows it returns (an API key is created from a hash, but its
/// response carries usage counters).
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// The filter type for list operations
    type Filter: Send + Sync;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// Fetch several entities at once, keyed by id. Unknown ids are skipped.
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>>;

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Returns whether a row was deleted
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Apply the set fields of `request`; [`DbError::NotFound`](crate::db::errors::DbError::NotFound)
    /// if the id does not exist
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
