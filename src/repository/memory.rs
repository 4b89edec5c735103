//! In-memory implementation of [`DataRepository`].
//!
//! Behaves like the REST backend for the parts the cache layer depends on:
//! 404 for unknown ids, 409 for duplicate slugs, `page`/`limit`/`q` and exact
//! field filters on lists, and offset cursors for cursor pages.

use super::{CursorPage, DataRepository, Page};
use crate::entity::{CacheEntity, EntityKind};
use crate::error::{Error, Result};
use crate::key::{ListParams, ParamValue};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const DEFAULT_LIMIT: usize = 20;

/// Repository operation, for call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    List,
    Get,
    CursorPage,
    Create,
    Update,
    Delete,
}

#[derive(Default)]
struct State {
    records: BTreeMap<EntityKind, Vec<Value>>,
    failures: BTreeMap<EntityKind, VecDeque<Error>>,
}

/// Shared, cloneable fake of the REST backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
    calls: Arc<DashMap<(EntityKind, RepoOp), usize>>,
    latency: Option<Duration>,
    response_delay: Option<Duration>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delay read responses after the records have been read, so a write
    /// can land while an older answer is still on its way.
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = Some(delay);
        self
    }

    /// Store a record as-is, replacing one with the same id.
    pub fn insert<T: CacheEntity>(&self, entity: &T) -> Result<()> {
        let value = to_value(entity)?;
        let mut state = self.lock()?;
        let records = state.records.entry(T::KIND).or_default();
        records.retain(|r| field_str(r, "id") != Some(entity.entity_id()));
        records.push(value);
        Ok(())
    }

    /// Make the next call for `kind` fail with `error`. Queued failures are
    /// consumed in order, one per call.
    pub fn fail_next(&self, kind: EntityKind, error: Error) -> Result<()> {
        self.lock()?
            .failures
            .entry(kind)
            .or_default()
            .push_back(error);
        Ok(())
    }

    /// Number of calls of `op` made for `kind`.
    pub fn calls(&self, kind: EntityKind, op: RepoOp) -> usize {
        self.calls.get(&(kind, op)).map(|c| *c).unwrap_or(0)
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.lock()
            .map(|state| state.records.get(&kind).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::BackendError("in-memory repository lock poisoned".to_string()))
    }

    /// Count the call, apply latency and any queued failure.
    async fn enter(&self, kind: EntityKind, op: RepoOp) -> Result<()> {
        *self.calls.entry((kind, op)).or_insert(0) += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let failure = self
            .lock()?
            .failures
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(error) => {
                debug!("InMemoryRepository injected failure for {}: {}", kind, error);
                Err(error)
            }
            None => Ok(()),
        }
    }

    async fn respond(&self) {
        if let Some(delay) = self.response_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn filtered(&self, kind: EntityKind, params: &ListParams) -> Result<Vec<Value>> {
        let state = self.lock()?;
        let records = state.records.get(&kind).cloned().unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|record| matches_params(record, params))
            .collect())
    }
}

fn to_value<S: Serialize + ?Sized>(value: &S) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::SerializationError(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::DeserializationError(e.to_string()))
}

fn field_str<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

fn value_matches(actual: &Value, expected: &ParamValue) -> bool {
    match (actual, expected) {
        (Value::String(a), ParamValue::Text(e)) => a == e,
        (Value::Bool(a), ParamValue::Bool(e)) => a == e,
        (Value::Number(a), ParamValue::Int(e)) => a.as_i64() == Some(*e),
        (Value::Array(items), expected) => items.iter().any(|item| value_matches(item, expected)),
        (actual, expected) => actual.to_string().trim_matches('"') == expected.to_string(),
    }
}

fn matches_params(record: &Value, params: &ListParams) -> bool {
    params.iter().all(|(field, expected)| match field {
        "page" | "limit" => true,
        "q" => {
            let needle = expected.to_string().to_lowercase();
            ["name", "title", "slug"].iter().any(|f| {
                field_str(record, f).is_some_and(|v| v.to_lowercase().contains(&needle))
            })
        }
        _ => record
            .get(field)
            .is_some_and(|actual| value_matches(actual, expected)),
    })
}

fn limit_of(params: &ListParams) -> usize {
    params
        .get_int("limit")
        .and_then(|l| usize::try_from(l).ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_LIMIT)
}

fn slug_taken(records: &[Value], slug: Option<&str>, except_id: Option<&str>) -> bool {
    let Some(slug) = slug else {
        return false;
    };
    records
        .iter()
        .any(|r| field_str(r, "slug") == Some(slug) && field_str(r, "id") != except_id)
}

impl DataRepository for InMemoryRepository {
    async fn fetch_list<T: CacheEntity>(&self, params: &ListParams) -> Result<Page<T>> {
        self.enter(T::KIND, RepoOp::List).await?;

        let matching = self.filtered(T::KIND, params)?;
        let limit = limit_of(params);
        let page = params
            .get_int("page")
            .and_then(|p| usize::try_from(p).ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let total = matching.len();

        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .map(from_value)
            .collect::<Result<Vec<T>>>()?;
        self.respond().await;

        Ok(Page {
            items,
            page: u32::try_from(page).unwrap_or(u32::MAX),
            limit: u32::try_from(limit).unwrap_or(u32::MAX),
            total: total as u64,
        })
    }

    async fn fetch_one<T: CacheEntity>(&self, id_or_slug: &str) -> Result<T> {
        self.enter(T::KIND, RepoOp::Get).await?;

        // An exact id wins over a slug match.
        let found = {
            let state = self.lock()?;
            state.records.get(&T::KIND).and_then(|records| {
                records
                    .iter()
                    .find(|r| field_str(r, "id") == Some(id_or_slug))
                    .or_else(|| {
                        records
                            .iter()
                            .find(|r| field_str(r, "slug") == Some(id_or_slug))
                    })
                    .cloned()
            })
        };
        self.respond().await;

        match found {
            Some(record) => from_value(record),
            None => Err(Error::NotFound(format!("{} {}", T::KIND, id_or_slug))),
        }
    }

    async fn fetch_cursor_page<T: CacheEntity>(
        &self,
        params: &ListParams,
        cursor: Option<&str>,
    ) -> Result<CursorPage<T>> {
        self.enter(T::KIND, RepoOp::CursorPage).await?;

        let offset = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| Error::Validation(Some(format!("invalid cursor: {c}"))))?,
            None => 0,
        };
        let matching = self.filtered(T::KIND, params)?;
        let limit = limit_of(params);
        let end = offset.saturating_add(limit);
        let next_cursor = (end < matching.len()).then(|| end.to_string());

        let items = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(from_value)
            .collect::<Result<Vec<T>>>()?;
        self.respond().await;

        Ok(CursorPage { items, next_cursor })
    }

    async fn create<T, P>(&self, payload: &P) -> Result<T>
    where
        T: CacheEntity,
        P: Serialize + Sync,
    {
        self.enter(T::KIND, RepoOp::Create).await?;

        let mut record = match to_value(payload)? {
            Value::Object(map) => map,
            _ => return Err(Error::Validation(Some("payload must be an object".into()))),
        };
        record
            .entry("id")
            .or_insert_with(|| Value::String(uuid::Uuid::now_v7().to_string()));
        let record = Value::Object(record);

        let mut state = self.lock()?;
        let records = state.records.entry(T::KIND).or_default();
        if slug_taken(records, field_str(&record, "slug"), None) {
            return Err(Error::Conflict(format!(
                "{} slug already in use",
                T::KIND
            )));
        }
        let entity: T = from_value(record.clone())?;
        records.push(record);
        Ok(entity)
    }

    async fn update<T, P>(&self, id: &str, payload: &P) -> Result<T>
    where
        T: CacheEntity,
        P: Serialize + Sync,
    {
        self.enter(T::KIND, RepoOp::Update).await?;

        let patch: Map<String, Value> = match to_value(payload)? {
            Value::Object(map) => map,
            _ => return Err(Error::Validation(Some("payload must be an object".into()))),
        };

        let mut state = self.lock()?;
        let records = state.records.entry(T::KIND).or_default();
        let Some(index) = records.iter().position(|r| field_str(r, "id") == Some(id)) else {
            return Err(Error::NotFound(format!("{} {}", T::KIND, id)));
        };

        let mut merged = records[index].clone();
        if let Value::Object(fields) = &mut merged {
            for (k, v) in patch {
                if k != "id" {
                    fields.insert(k, v);
                }
            }
        }
        if slug_taken(records, field_str(&merged, "slug"), Some(id)) {
            return Err(Error::Conflict(format!(
                "{} slug already in use",
                T::KIND
            )));
        }

        let entity: T = from_value(merged.clone())?;
        records[index] = merged;
        Ok(entity)
    }

    async fn delete<T: CacheEntity>(&self, id: &str) -> Result<()> {
        self.enter(T::KIND, RepoOp::Delete).await?;

        let mut state = self.lock()?;
        let records = state.records.entry(T::KIND).or_default();
        let before = records.len();
        records.retain(|r| field_str(r, "id") != Some(id));
        if records.len() == before {
            return Err(Error::NotFound(format!("{} {}", T::KIND, id)));
        }
        Ok(())
    }
}
