//! Persistence seam used by the assembler.
//!
//! Implementations receive an already validated and typed plan. They are
//! read-only, hold no per-request state and may be shared across tasks.

use async_trait::async_trait;
use sea_orm::DbErr;

use crate::models::{Projection, Window};
use crate::query::{Predicate, SortKey};

pub mod memory;
pub mod sea;

pub use memory::InMemoryStore;
pub use sea::SeaOrmStore;

#[async_trait]
pub trait Persistence: Send + Sync {
    type Row: Send;

    /// Number of rows matching `predicate`, ignoring any window
    async fn count(&self, predicate: &Predicate) -> Result<u64, DbErr>;

    /// Matching rows in `sort` order, restricted to `window`
    async fn fetch(
        &self,
        predicate: &Predicate,
        sort: &[SortKey],
        window: Window,
        projection: &Projection,
    ) -> Result<Vec<Self::Row>, DbErr>;
}
