//! # garden-query
//!
//! Typed REST client and query cache for the gardening knowledge-base admin
//! panel (vegetables, soils, fertilizers, pests, diseases, articles, warning
//! rules and media).
//!
//! ## Features
//!
//! - **Hierarchical keys:** `[kind]`, `[kind, params]`, `[kind, "detail", id]`,
//!   with segment-wise prefix invalidation
//! - **Gated reads:** detail and slug reads never hit the API without an identifier
//! - **Coalescing:** concurrent reads of one key share a single request
//! - **Per-entity invalidation:** broad, targeted or optimistic overwrite
//! - **Typed payloads:** create/update payloads are validated before any request
//!
//! ## Quick Start
//!
//! ```ignore
//! use garden_query::{
//!     backend::InMemoryBackend,
//!     models::{Vegetable, VegetableInput},
//!     repository::HttpRepository,
//!     ClientConfig, ListParams, QueryClient,
//! };
//!
//! let config = ClientConfig::from_env()?;
//! let repository = HttpRepository::new(&config)?;
//! let client = QueryClient::new(InMemoryBackend::new(), repository).with_config(config);
//!
//! let vegetables = client.resource::<Vegetable>();
//! let page = vegetables.list(ListParams::new().page(1).limit(20)).await;
//! let tomato = vegetables.detail(Some("veg_42")).await;
//! let created = vegetables.create(&VegetableInput::new("tomato", "Tomato", "fruit")).await?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod builder;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod fetcher;
pub mod infinite;
pub mod key;
pub mod models;
pub mod mutation;
pub mod observability;
pub mod repository;
pub mod resource;
pub mod serialization;
pub mod slug;
pub mod strategy;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use builder::QueryBuilder;
pub use client::{QueryClient, QueryState, QueryStatus};
pub use config::ClientConfig;
pub use entity::{CacheEntity, Cacheable, EntityKind};
pub use error::{Error, FieldError, Result};
pub use infinite::{InfinitePages, InfiniteQuery};
pub use key::{CacheKey, ListParams, ParamValue};
pub use mutation::MutationBuilder;
pub use repository::{CursorPage, DataRepository, Page};
pub use resource::ResourceHandle;
pub use slug::SlugResolver;
pub use strategy::InvalidationStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
