//! Database handle and scoped write batches

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use biblion_core::{Row, TableSchema, Value};
use duckdb::{Connection, params_from_iter};

use crate::error::StoreError;
use crate::value::{Param, from_duck, quote_ident, sql_type};

/// Embedded DuckDB database.
///
/// The connection sits behind a mutex: concurrent population jobs
/// serialise their batches on it.
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

/// `CREATE TABLE` statement for a virtual table's columns.
pub fn create_table_sql(schema: &TableSchema) -> String {
    table_ddl(schema, "CREATE TABLE")
}

fn table_ddl(schema: &TableSchema, verb: &str) -> String {
    let cols: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(c.ty)))
        .collect();
    format!("{verb} {} ({})", quote_ident(&schema.name), cols.join(", "))
}

fn insert_sql(table: &str, width: usize) -> String {
    let marks = vec!["?"; width].join(", ");
    format!("INSERT INTO {} VALUES ({marks})", quote_ident(table))
}

impl Store {
    /// Open (or create) a file-backed database.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        log::debug!("Opened store {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cap the engine's memory use, e.g. `"4GB"`.
    pub fn set_memory_limit(&self, limit: &str) -> Result<(), StoreError> {
        let limit = limit.replace('\'', "''");
        self.lock().execute_batch(&format!("SET memory_limit = '{limit}'"))?;
        Ok(())
    }

    pub fn create_table(&self, schema: &TableSchema) -> Result<(), StoreError> {
        self.lock().execute_batch(&create_table_sql(schema))?;
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let n: i64 = self.lock().query_row(
            "SELECT count(*) FROM information_schema.tables WHERE table_schema = 'main' AND table_name = ?",
            [table],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    /// Stored `(name, type)` columns of `table`, in order; `None` when absent.
    pub fn table_columns(&self, table: &str) -> Result<Option<Vec<(String, String)>>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = 'main' AND table_name = ? ORDER BY ordinal_position",
        )?;
        let cols = stmt
            .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok((!cols.is_empty()).then_some(cols))
    }

    /// Start a transaction. Holds the store until committed or dropped.
    pub fn begin_batch(&self) -> Result<Batch<'_>, StoreError> {
        let conn = self.lock();
        conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(Batch { conn, open: true })
    }

    pub fn create_index(&self, table: &str, column: &str) -> Result<(), StoreError> {
        let name = quote_ident(&format!("{table}_{column}_idx"));
        self.lock().execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {name} ON {} ({})",
            quote_ident(table),
            quote_ident(column)
        ))?;
        Ok(())
    }

    pub fn row_count(&self, table: &str) -> Result<u64, StoreError> {
        if !self.table_exists(table)? {
            return Err(StoreError::MissingTable(table.to_string()));
        }
        let n: i64 = self.lock().query_row(
            &format!("SELECT count(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Run a query and collect every result row.
    pub fn query(&self, sql: &str) -> Result<Vec<Row>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let width = row.as_ref().column_count();
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_duck(row.get::<_, duckdb::types::Value>(i)?));
            }
            out.push(values);
        }
        Ok(out)
    }
}

/// One write transaction.
///
/// Dropping a batch without [`commit`](Batch::commit) rolls it back.
pub struct Batch<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl Batch<'_> {
    pub fn insert_row(&mut self, table: &str, row: &[Value]) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare_cached(&insert_sql(table, row.len()))?;
        stmt.execute(params_from_iter(row.iter().map(Param)))?;
        Ok(())
    }

    pub fn drop_table(&mut self, table: &str) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
        Ok(())
    }

    pub fn create_table(&mut self, schema: &TableSchema) -> Result<(), StoreError> {
        self.conn.execute_batch(&create_table_sql(schema))?;
        Ok(())
    }

    /// Create `schema` unless a table of that name already exists.
    pub fn ensure_table(&mut self, schema: &TableSchema) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&table_ddl(schema, "CREATE TABLE IF NOT EXISTS"))?;
        Ok(())
    }

    /// Run raw SQL inside the transaction.
    pub fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Commit the transaction. On failure the batch is still open and
    /// dropping it rolls back.
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::error!("Rollback failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblion_core::ColumnDef;

    fn schema() -> TableSchema {
        TableSchema::new(
            "t",
            vec![ColumnDef::text("k"), ColumnDef::integer("n"), ColumnDef::real("x")],
        )
    }

    fn row(k: &str, n: i64) -> Row {
        vec![Value::text(k), Value::Integer(n), Value::Null]
    }

    #[test]
    fn committed_batch_is_visible() {
        let store = Store::open_in_memory().unwrap();
        store.create_table(&schema()).unwrap();
        let mut batch = store.begin_batch().unwrap();
        batch.insert_row("t", &row("a", 1)).unwrap();
        batch.insert_row("t", &row("b", 2)).unwrap();
        batch.commit().unwrap();
        assert_eq!(store.row_count("t").unwrap(), 2);

        let rows = store.query("SELECT k, n, x FROM t ORDER BY k").unwrap();
        assert_eq!(rows[1], vec![Value::text("b"), Value::Integer(2), Value::Null]);
    }

    #[test]
    fn dropped_batch_rolls_back() {
        let store = Store::open_in_memory().unwrap();
        store.create_table(&schema()).unwrap();
        {
            let mut batch = store.begin_batch().unwrap();
            batch.insert_row("t", &row("a", 1)).unwrap();
        }
        assert_eq!(store.row_count("t").unwrap(), 0);
    }

    #[test]
    fn replace_inside_batch() {
        let store = Store::open_in_memory().unwrap();
        store.create_table(&schema()).unwrap();
        let mut batch = store.begin_batch().unwrap();
        batch.insert_row("t", &row("a", 1)).unwrap();
        batch.commit().unwrap();

        {
            let mut batch = store.begin_batch().unwrap();
            batch.drop_table("t").unwrap();
            batch.create_table(&schema()).unwrap();
        }
        assert_eq!(store.row_count("t").unwrap(), 1);
    }

    #[test]
    fn columns_and_missing_tables() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.table_columns("t").unwrap(), None);
        assert!(matches!(store.row_count("t"), Err(StoreError::MissingTable(_))));

        store.create_table(&schema()).unwrap();
        let cols = store.table_columns("t").unwrap().unwrap();
        assert_eq!(cols[0], ("k".to_string(), "VARCHAR".to_string()));
        assert_eq!(cols[2].1, "DOUBLE");
        store.create_index("t", "k").unwrap();
    }

    #[test]
    fn file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biblion.duckdb");
        {
            let store = Store::open(&path).unwrap();
            store.create_table(&schema()).unwrap();
            let mut batch = store.begin_batch().unwrap();
            batch.insert_row("t", &row("a", 1)).unwrap();
            batch.commit().unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.row_count("t").unwrap(), 1);
    }
}
