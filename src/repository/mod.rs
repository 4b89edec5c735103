//! Remote data access.
//!
//! [`DataRepository`] is the contract with the REST backend. The query client
//! only ever talks to the backend through it, so tests and demos can swap the
//! HTTP implementation for [`InMemoryRepository`].

mod http;
mod memory;

pub use http::{HttpRepository, StaticToken, TokenProvider, UnauthorizedHandler};
pub use memory::{InMemoryRepository, RepoOp};

use crate::entity::CacheEntity;
use crate::error::Result;
use crate::key::ListParams;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Offset-paginated list response: `{ items, page, limit, total }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}

/// Cursor-paginated response used by the media library: `{ items, nextCursor }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// REST operations per entity kind.
///
/// Implementations map non-2xx responses through [`crate::Error::from_status`]
/// and never retry; retry policy for reads lives in the query client.
pub trait DataRepository: Send + Sync + 'static {
    /// `GET /{kind}?{params}`
    fn fetch_list<T: CacheEntity>(
        &self,
        params: &ListParams,
    ) -> impl Future<Output = Result<Page<T>>> + Send;

    /// `GET /{kind}/{idOrSlug}`
    fn fetch_one<T: CacheEntity>(&self, id_or_slug: &str)
        -> impl Future<Output = Result<T>> + Send;

    /// `GET /{kind}?{params}&cursor={cursor}`
    fn fetch_cursor_page<T: CacheEntity>(
        &self,
        params: &ListParams,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<CursorPage<T>>> + Send;

    /// `POST /{kind}`
    fn create<T, P>(&self, payload: &P) -> impl Future<Output = Result<T>> + Send
    where
        T: CacheEntity,
        P: Serialize + Sync;

    /// `PATCH /{kind}/{id}`
    fn update<T, P>(&self, id: &str, payload: &P) -> impl Future<Output = Result<T>> + Send
    where
        T: CacheEntity,
        P: Serialize + Sync;

    /// `DELETE /{kind}/{id}`
    fn delete<T: CacheEntity>(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}
