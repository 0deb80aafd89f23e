//! In-process store. Sessions read through a private working copy and replay their
//! journal onto the shared tables on commit. Updates are journaled as field assignments
//! and land on the row as it is at commit time; a row deleted meanwhile stays deleted.
//! Ids come from a per-table sequence that, like a database sequence, is not rolled back.

use crate::config::{ResourceSchema, ID_FIELD};
use crate::error::AppError;
use crate::query::{compare_values, Direction, FilterCombinator, ListQuery};
use crate::store::{typed_predicates, Row, Session, Store};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

type Rows = BTreeMap<i64, Row>;

#[derive(Default)]
struct Table {
    rows: Rows,
    last_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Table>>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Unexpected("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Session>, AppError> {
        Ok(Box::new(MemorySession {
            store: self.clone(),
            working: HashMap::new(),
            journal: Vec::new(),
        }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }
}

enum Change {
    /// A newly inserted row.
    Put { table: String, row: Row },
    /// Field values written by an update.
    Assign { table: String, id: i64, values: Row },
    Remove { table: String, id: i64 },
}

pub struct MemorySession {
    store: MemoryStore,
    /// Tables this session has read or written, copied on first touch.
    working: HashMap<String, Rows>,
    journal: Vec<Change>,
}

impl MemorySession {
    fn table(&mut self, name: &str) -> Result<&mut Rows, AppError> {
        if !self.working.contains_key(name) {
            let rows = self
                .store
                .lock()?
                .get(name)
                .map(|t| t.rows.clone())
                .unwrap_or_default();
            self.working.insert(name.to_string(), rows);
        }
        self.working
            .get_mut(name)
            .ok_or_else(|| AppError::Unexpected(format!("table {} not loaded", name)))
    }

    fn next_id(&self, name: &str) -> Result<i64, AppError> {
        let mut tables = self.store.lock()?;
        let table = tables.entry(name.to_string()).or_default();
        table.last_id += 1;
        Ok(table.last_id)
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn fetch_all(&mut self, resource: &ResourceSchema, query: &ListQuery) -> Result<Vec<Row>, AppError> {
        let predicates = typed_predicates(resource, query)?;
        let rows = self.table(&resource.table)?;
        let mut out: Vec<Row> = rows
            .values()
            .filter(|row| {
                if predicates.is_empty() {
                    return true;
                }
                let mut hits = predicates.iter().map(|tp| {
                    let stored = row.get(&tp.field.name).unwrap_or(&Value::Null);
                    tp.predicate.matches(stored, &tp.value)
                });
                match query.combinator {
                    FilterCombinator::Any => hits.any(|h| h),
                    FilterCombinator::All => hits.all(|h| h),
                }
            })
            .cloned()
            .collect();
        if let Some(order) = &query.ordering {
            // Stable sort over id order keeps `id ASC` as the tie-breaker.
            out.sort_by(|a, b| {
                let ord = compare_nulls_last(
                    a.get(&order.field).unwrap_or(&Value::Null),
                    b.get(&order.field).unwrap_or(&Value::Null),
                );
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        Ok(out)
    }

    async fn fetch_by_id(&mut self, resource: &ResourceSchema, id: i64) -> Result<Option<Row>, AppError> {
        Ok(self.table(&resource.table)?.get(&id).cloned())
    }

    async fn insert(&mut self, resource: &ResourceSchema, values: &Row) -> Result<Row, AppError> {
        let id = self.next_id(&resource.table)?;
        let mut row = Row::with_capacity(resource.fields.len());
        for f in &resource.fields {
            let v = if f.is_identity() {
                Value::from(id)
            } else {
                values.get(&f.name).cloned().unwrap_or(Value::Null)
            };
            row.insert(f.name.clone(), v);
        }
        self.table(&resource.table)?.insert(id, row.clone());
        self.journal.push(Change::Put {
            table: resource.table.clone(),
            row: row.clone(),
        });
        Ok(row)
    }

    async fn update(&mut self, resource: &ResourceSchema, id: i64, values: &Row) -> Result<Option<Row>, AppError> {
        let rows = self.table(&resource.table)?;
        let Some(row) = rows.get_mut(&id) else {
            return Ok(None);
        };
        let mut assigned = Row::new();
        for f in resource.data_fields() {
            if let Some(v) = values.get(&f.name) {
                row.insert(f.name.clone(), v.clone());
                assigned.insert(f.name.clone(), v.clone());
            }
        }
        let row = row.clone();
        self.journal.push(Change::Assign {
            table: resource.table.clone(),
            id,
            values: assigned,
        });
        Ok(Some(row))
    }

    async fn delete(&mut self, resource: &ResourceSchema, id: i64) -> Result<u64, AppError> {
        let removed = self.table(&resource.table)?.remove(&id).is_some();
        if !removed {
            return Ok(0);
        }
        self.journal.push(Change::Remove {
            table: resource.table.clone(),
            id,
        });
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemorySession { store, journal, .. } = *self;
        let mut tables = store.lock()?;
        for change in journal {
            match change {
                Change::Put { table, row } => {
                    let Some(id) = row.get(ID_FIELD).and_then(Value::as_i64) else {
                        return Err(AppError::Unexpected("row without id".into()));
                    };
                    tables.entry(table).or_default().rows.insert(id, row);
                }
                Change::Assign { table, id, values } => {
                    let Some(row) = tables.get_mut(&table).and_then(|t| t.rows.get_mut(&id)) else {
                        continue;
                    };
                    row.extend(values);
                }
                Change::Remove { table, id } => {
                    if let Some(t) = tables.get_mut(&table) {
                        t.rows.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Ascending order with nulls after every value, as PostgreSQL sorts them.
fn compare_nulls_last(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}
