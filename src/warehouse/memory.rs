//! In-process warehouse.
//!
//! Holds datasets, tables and rows in memory and understands just enough SQL
//! to serve the wrapper: `SELECT` of columns or `*` from one table, and
//! `INFORMATION_SCHEMA.TABLES` lookups filtered by the `table_name` parameter.
//! Remote-style error messages (`Already Exists: ...`, `Not found: ...`) match
//! what BigQuery returns so that error classification behaves the same.

use crate::error::{BqError, BqResult};
use crate::models::{QueryJob, Row, TableSpec};
use crate::warehouse::{RowError, Warehouse};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlparser::ast::{Expr, SelectItem, SetExpr, Statement, TableFactor, Value};
use sqlparser::dialect::BigQueryDialect;
use sqlparser::parser::Parser;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Calls and queries kept for inspection. Older entries are dropped.
pub const HISTORY_LIMIT: usize = 1024;

/// Remote primitive, used for failure injection and call recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarehouseOp {
    Query,
    ListDatasets,
    ListTables,
    CreateDataset,
    CreateTable,
    InsertRows,
}

#[derive(Debug)]
struct StoredTable {
    spec: TableSpec,
    rows: Vec<JsonValue>,
}

#[derive(Debug)]
struct StoredDataset {
    location: String,
    tables: BTreeMap<String, StoredTable>,
}

#[derive(Debug, Default)]
struct State {
    datasets: BTreeMap<String, StoredDataset>,
    failures: HashMap<WarehouseOp, String>,
    rejected_tables: HashSet<String>,
    stubs: Vec<(String, Vec<Row>)>,
    calls: VecDeque<WarehouseOp>,
    queries: VecDeque<QueryJob>,
}

fn record<T>(history: &mut VecDeque<T>, item: T) {
    if history.len() == HISTORY_LIMIT {
        history.pop_front();
    }
    history.push_back(item);
}

/// Warehouse kept entirely in memory.
#[derive(Debug)]
pub struct MemoryWarehouse {
    project_id: String,
    state: RwLock<State>,
}

impl MemoryWarehouse {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            state: RwLock::new(State::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following call of `op` fail with a remote error carrying `message`.
    pub fn fail_on(&self, op: WarehouseOp, message: impl Into<String>) {
        self.write().failures.insert(op, message.into());
    }

    /// Remove an injected failure.
    pub fn clear_failure(&self, op: WarehouseOp) {
        self.write().failures.remove(&op);
    }

    /// Reject every row streamed into tables named `table_id`.
    pub fn reject_rows(&self, table_id: impl Into<String>) {
        self.write().rejected_tables.insert(table_id.into());
    }

    /// Answer queries whose SQL contains `fragment` with `rows`.
    pub fn stub_query(&self, fragment: impl Into<String>, rows: Vec<Row>) {
        self.write().stubs.push((fragment.into(), rows));
    }

    /// The most recent primitive calls, oldest first, at most [`HISTORY_LIMIT`].
    pub fn calls(&self) -> Vec<WarehouseOp> {
        self.read().calls.iter().copied().collect()
    }

    /// The most recent query jobs, oldest first, at most [`HISTORY_LIMIT`].
    pub fn executed_queries(&self) -> Vec<QueryJob> {
        self.read().queries.iter().cloned().collect()
    }

    pub fn has_dataset(&self, dataset_id: &str) -> bool {
        self.read().datasets.contains_key(dataset_id)
    }

    pub fn has_table(&self, dataset_id: &str, table_id: &str) -> bool {
        self.read()
            .datasets
            .get(dataset_id)
            .is_some_and(|d| d.tables.contains_key(table_id))
    }

    pub fn dataset_location(&self, dataset_id: &str) -> Option<String> {
        self.read()
            .datasets
            .get(dataset_id)
            .map(|d| d.location.clone())
    }

    /// Rows stored in a table, or None if the table does not exist.
    pub fn rows(&self, dataset_id: &str, table_id: &str) -> Option<Vec<JsonValue>> {
        self.read()
            .datasets
            .get(dataset_id)?
            .tables
            .get(table_id)
            .map(|t| t.rows.clone())
    }

    /// Record the call and return the injected failure for `op`, if any.
    fn enter(&self, op: WarehouseOp) -> BqResult<()> {
        let mut state = self.write();
        record(&mut state.calls, op);
        match state.failures.get(&op) {
            Some(message) => Err(crate::error::classify_message(message.clone())),
            None => Ok(()),
        }
    }

    fn dataset_not_found(&self, dataset_id: &str) -> BqError {
        BqError::not_found(format!("Not found: Dataset {}:{}", self.project_id, dataset_id))
    }

    fn table_not_found(&self, dataset_id: &str, table_id: &str) -> BqError {
        BqError::not_found(format!(
            "Not found: Table {}:{}.{}",
            self.project_id, dataset_id, table_id
        ))
    }

    fn run_select(&self, state: &State, job: &QueryJob) -> BqResult<Vec<Row>> {
        let statements = Parser::parse_sql(&BigQueryDialect {}, &job.sql)
            .map_err(|e| BqError::remote(format!("Syntax error: {}", e)))?;
        let [Statement::Query(query)] = statements.as_slice() else {
            return Err(unsupported(&job.sql));
        };
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(unsupported(&job.sql));
        };

        let Some(from) = select.from.first() else {
            return constant_row(&select.projection).map(|row| vec![row]);
        };
        if select.from.len() > 1 || !from.joins.is_empty() {
            return Err(unsupported(&job.sql));
        }
        let TableFactor::Table { name, .. } = &from.relation else {
            return Err(unsupported(&job.sql));
        };

        let path = name.to_string().replace('`', "");
        let segments: Vec<&str> = path.split('.').collect();

        let rows = match segments.as_slice() {
            [.., dataset, schema, view]
                if schema.eq_ignore_ascii_case("INFORMATION_SCHEMA")
                    && view.eq_ignore_ascii_case("TABLES") =>
            {
                self.information_schema_tables(state, dataset, job)?
            }
            [.., dataset, table] if segments.len() <= 3 => {
                if select.selection.is_some() {
                    return Err(unsupported(&job.sql));
                }
                self.table_rows(state, dataset, table)?
            }
            _ => return Err(unsupported(&job.sql)),
        };

        project(&select.projection, rows, &job.sql)
    }

    fn information_schema_tables(
        &self,
        state: &State,
        dataset_id: &str,
        job: &QueryJob,
    ) -> BqResult<Vec<Row>> {
        let dataset = state
            .datasets
            .get(dataset_id)
            .ok_or_else(|| self.dataset_not_found(dataset_id))?;
        let wanted = job.param("table_name").map(|p| p.value.as_str());

        Ok(dataset
            .tables
            .values()
            .filter(|t| wanted.is_none_or(|w| w == t.spec.table_id))
            .map(|t| {
                let mut row = Row::new();
                row.insert("table_catalog".into(), self.project_id.clone().into());
                row.insert("table_schema".into(), dataset_id.into());
                row.insert("table_name".into(), t.spec.table_id.clone().into());
                row.insert("table_type".into(), "BASE TABLE".into());
                row.insert(
                    "ddl".into(),
                    t.spec.ddl(&self.project_id, dataset_id).into(),
                );
                row
            })
            .collect())
    }

    fn table_rows(&self, state: &State, dataset_id: &str, table_id: &str) -> BqResult<Vec<Row>> {
        let dataset = state
            .datasets
            .get(dataset_id)
            .ok_or_else(|| self.dataset_not_found(dataset_id))?;
        let table = dataset
            .tables
            .get(table_id)
            .ok_or_else(|| self.table_not_found(dataset_id, table_id))?;

        Ok(table
            .rows
            .iter()
            .map(|row| match row {
                JsonValue::Object(map) => map.clone(),
                other => {
                    let mut map = Row::new();
                    map.insert("value".into(), other.clone());
                    map
                }
            })
            .collect())
    }
}

fn unsupported(sql: &str) -> BqError {
    BqError::remote(format!("Unsupported query for the memory warehouse: {}", sql))
}

fn literal(expr: &Expr) -> Option<JsonValue> {
    let Expr::Value(v) = expr else {
        return None;
    };
    match &v.value {
        Value::Number(n, _) => n
            .parse::<i64>()
            .map(JsonValue::from)
            .ok()
            .or_else(|| n.parse::<f64>().ok().map(JsonValue::from)),
        Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => Some(s.clone().into()),
        Value::Boolean(b) => Some((*b).into()),
        Value::Null => Some(JsonValue::Null),
        _ => None,
    }
}

/// `SELECT 1 AS x, 'a'` without a FROM clause.
fn constant_row(projection: &[SelectItem]) -> BqResult<Row> {
    let mut row = Row::new();
    for (i, item) in projection.iter().enumerate() {
        let (expr, name) = match item {
            SelectItem::UnnamedExpr(expr) => (expr, format!("f{}_", i)),
            SelectItem::ExprWithAlias { expr, alias } => (expr, alias.value.clone()),
            _ => return Err(BqError::remote("SELECT * must have a FROM clause")),
        };
        let value = literal(expr).ok_or_else(|| unsupported(&expr.to_string()))?;
        row.insert(name, value);
    }
    Ok(row)
}

fn project(projection: &[SelectItem], rows: Vec<Row>, sql: &str) -> BqResult<Vec<Row>> {
    if matches!(projection, [SelectItem::Wildcard(_)]) {
        return Ok(rows);
    }

    let mut columns = Vec::with_capacity(projection.len());
    for item in projection {
        let column = match item {
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => {
                (ident.value.clone(), ident.value.clone())
            }
            SelectItem::ExprWithAlias {
                expr: Expr::Identifier(ident),
                alias,
            } => (ident.value.clone(), alias.value.clone()),
            _ => return Err(unsupported(sql)),
        };
        columns.push(column);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            columns
                .iter()
                .map(|(source, name)| {
                    (name.clone(), row.get(source).cloned().unwrap_or(JsonValue::Null))
                })
                .collect()
        })
        .collect())
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn query(&self, job: &QueryJob) -> BqResult<Vec<Row>> {
        self.enter(WarehouseOp::Query)?;
        let mut state = self.write();
        record(&mut state.queries, job.clone());
        debug!(sql = %job.sql, "Memory query");

        if let Some((_, rows)) = state
            .stubs
            .iter()
            .find(|(fragment, _)| job.sql.contains(fragment.as_str()))
        {
            return Ok(rows.clone());
        }
        self.run_select(&state, job)
    }

    async fn list_datasets(&self) -> BqResult<Vec<String>> {
        self.enter(WarehouseOp::ListDatasets)?;
        Ok(self.read().datasets.keys().cloned().collect())
    }

    async fn list_tables(&self, dataset_id: &str) -> BqResult<Vec<String>> {
        self.enter(WarehouseOp::ListTables)?;
        let state = self.read();
        let dataset = state
            .datasets
            .get(dataset_id)
            .ok_or_else(|| self.dataset_not_found(dataset_id))?;
        Ok(dataset.tables.keys().cloned().collect())
    }

    async fn create_dataset(&self, dataset_id: &str, location: &str) -> BqResult<()> {
        self.enter(WarehouseOp::CreateDataset)?;
        let mut state = self.write();
        if state.datasets.contains_key(dataset_id) {
            return Err(BqError::conflict(format!(
                "Already Exists: Dataset {}:{}",
                self.project_id, dataset_id
            )));
        }
        state.datasets.insert(
            dataset_id.to_string(),
            StoredDataset {
                location: location.to_string(),
                tables: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn create_table(&self, dataset_id: &str, table: &TableSpec) -> BqResult<()> {
        self.enter(WarehouseOp::CreateTable)?;
        let mut state = self.write();
        let dataset = state
            .datasets
            .get_mut(dataset_id)
            .ok_or_else(|| self.dataset_not_found(dataset_id))?;
        if dataset.tables.contains_key(&table.table_id) {
            return Err(BqError::conflict(format!(
                "Already Exists: Table {}:{}.{}",
                self.project_id, dataset_id, table.table_id
            )));
        }
        dataset.tables.insert(
            table.table_id.clone(),
            StoredTable {
                spec: table.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn insert_rows(
        &self,
        dataset_id: &str,
        table_id: &str,
        rows: Vec<JsonValue>,
    ) -> BqResult<Vec<RowError>> {
        self.enter(WarehouseOp::InsertRows)?;
        let mut state = self.write();
        if state.rejected_tables.contains(table_id) {
            return Ok((0..rows.len())
                .map(|index| RowError {
                    index,
                    message: "invalid: row rejected".to_string(),
                })
                .collect());
        }

        let dataset = state
            .datasets
            .get_mut(dataset_id)
            .ok_or_else(|| self.dataset_not_found(dataset_id))?;
        let table = dataset
            .tables
            .get_mut(table_id)
            .ok_or_else(|| self.table_not_found(dataset_id, table_id))?;

        let mut errors = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let missing = table.spec.fields.iter().find(|f| {
                f.mode == crate::models::FieldMode::Required
                    && row.get(&f.name).is_none_or(JsonValue::is_null)
            });
            if let Some(field) = missing {
                errors.push(RowError {
                    index,
                    message: format!("invalid: Missing required field: {}", field.name),
                });
            }
        }
        // insertAll is all-or-nothing per request when any row is invalid.
        if errors.is_empty() {
            table.rows.extend(rows);
        }
        Ok(errors)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
