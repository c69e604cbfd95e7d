//! SQLite storage implementation

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::schema;
use crate::item::Item;
use crate::proforma::Proforma;
use crate::{Error, Result};

/// SQLite-backed storage for proformas and their items.
///
/// Exposes the narrow operation set the reconciliation engine and the
/// projection builder depend on: point lookup by id, bulk scan, conditional
/// upsert keyed by id, and bulk delete by owning-proforma predicate.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Proforma Operations ==========

    /// Insert or overwrite a proforma keyed by its client-assigned id.
    /// Atomic at single-record granularity.
    pub fn upsert_proforma(&self, proforma: &Proforma) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO proformas (
                id, proforma_number, customer_name, customer_phone,
                vehicle_make, vehicle_model, plate_number, chassis_number,
                vehicle_type, subtotal, tax, total,
                date_created, last_modified, prepared_by, valid_until, user_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                proforma.id,
                proforma.proforma_number,
                proforma.customer_name,
                proforma.customer_phone,
                proforma.vehicle_make,
                proforma.vehicle_model,
                proforma.plate_number,
                proforma.chassis_number,
                proforma.vehicle_type,
                proforma.subtotal,
                proforma.tax,
                proforma.total,
                proforma.date_created,
                proforma.last_modified,
                proforma.prepared_by,
                proforma.valid_until,
                proforma.user_id,
            ],
        )?;
        Ok(())
    }

    /// Get a proforma by id
    pub fn get_proforma(&self, id: i64) -> Result<Option<Proforma>> {
        self.conn
            .query_row(
                &format!("SELECT {PROFORMA_COLUMNS} FROM proformas WHERE id = ?1"),
                [id],
                |row| Self::row_to_proforma(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// All proformas in storage order
    pub fn all_proformas(&self) -> Result<Vec<Proforma>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PROFORMA_COLUMNS} FROM proformas ORDER BY rowid"))?;

        let proformas = stmt
            .query_map([], |row| Self::row_to_proforma(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(proformas)
    }

    /// Count all proformas
    pub fn count_proformas(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM proformas", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_proforma(row: &rusqlite::Row) -> rusqlite::Result<Proforma> {
        Ok(Proforma {
            id: row.get(0)?,
            proforma_number: row.get(1)?,
            customer_name: row.get(2)?,
            customer_phone: row.get(3)?,
            vehicle_make: row.get(4)?,
            vehicle_model: row.get(5)?,
            plate_number: row.get(6)?,
            chassis_number: row.get(7)?,
            vehicle_type: row.get(8)?,
            subtotal: row.get(9)?,
            tax: row.get(10)?,
            total: row.get(11)?,
            date_created: row.get(12)?,
            last_modified: row.get(13)?,
            prepared_by: row.get(14)?,
            valid_until: row.get(15)?,
            user_id: row.get(16)?,
        })
    }

    // ========== Item Operations ==========

    /// Insert or overwrite an item keyed by its client-assigned id
    pub fn upsert_item(&self, item: &Item) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO items (
                id, proforma_id, name, unit, quantity, unit_price, total_price, last_modified
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                item.id,
                item.proforma_id,
                item.name,
                item.unit,
                item.quantity,
                item.unit_price,
                item.total_price,
                item.last_modified,
            ],
        )?;
        Ok(())
    }

    /// Get an item by id
    pub fn get_item(&self, id: i64) -> Result<Option<Item>> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                [id],
                |row| Self::row_to_item(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// All items in storage order
    pub fn all_items(&self) -> Result<Vec<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY rowid"))?;

        let items = stmt
            .query_map([], |row| Self::row_to_item(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    /// Items belonging to any of the given proformas, in storage order
    pub fn items_for_proformas(&self, proforma_ids: &[i64]) -> Result<Vec<Item>> {
        if proforma_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE proforma_id IN ({}) ORDER BY rowid",
            placeholders(proforma_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let items = stmt
            .query_map(params_from_iter(proforma_ids.iter()), |row| {
                Self::row_to_item(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    /// Delete every item whose owning proforma is in the given set.
    /// Returns the number of deleted rows.
    pub fn delete_items_for_proformas(&self, proforma_ids: &[i64]) -> Result<usize> {
        if proforma_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "DELETE FROM items WHERE proforma_id IN ({})",
            placeholders(proforma_ids.len())
        );
        let deleted = self
            .conn
            .execute(&sql, params_from_iter(proforma_ids.iter()))?;

        Ok(deleted)
    }

    /// Count all items
    pub fn count_items(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            proforma_id: row.get(1)?,
            name: row.get(2)?,
            unit: row.get(3)?,
            quantity: row.get(4)?,
            unit_price: row.get(5)?,
            total_price: row.get(6)?,
            last_modified: row.get(7)?,
        })
    }

    // ========== Diagnostics ==========

    /// Record counts for the stats command and the debug endpoint
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            proformas: self.count_proformas()?,
            items: self.count_items()?,
        })
    }
}

const PROFORMA_COLUMNS: &str = "id, proforma_number, customer_name, customer_phone, \
     vehicle_make, vehicle_model, plate_number, chassis_number, vehicle_type, \
     subtotal, tax, total, date_created, last_modified, prepared_by, valid_until, user_id";

const ITEM_COLUMNS: &str =
    "id, proforma_id, name, unit, quantity, unit_price, total_price, last_modified";

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Returns true when a storage error indicates the connection itself is
/// unusable, as opposed to a per-statement failure. The manager uses this to
/// decide whether to drop into reconnect mode.
pub(crate) fn is_connection_error(err: &Error) -> bool {
    use rusqlite::ErrorCode;

    match err {
        Error::Storage(rusqlite::Error::SqliteFailure(e, _)) => matches!(
            e.code,
            ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DiskFull
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
        ),
        _ => false,
    }
}

/// Database record counts
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub proformas: usize,
    pub items: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Proformas: {}", self.proformas)?;
        writeln!(f, "  Items: {}", self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proforma(id: i64, created: &str) -> Proforma {
        Proforma {
            id,
            proforma_number: format!("PF-{id:03}"),
            customer_name: "Asha Garage".into(),
            customer_phone: Some("+255700000000".into()),
            vehicle_make: Some("Toyota".into()),
            vehicle_model: Some("Hilux".into()),
            plate_number: Some("T123ABC".into()),
            chassis_number: None,
            vehicle_type: Some("pickup".into()),
            subtotal: 100.0,
            tax: 18.0,
            total: 118.0,
            date_created: created.into(),
            last_modified: created.into(),
            prepared_by: Some("fundi".into()),
            valid_until: None,
            user_id: Some("u1".into()),
        }
    }

    fn sample_item(id: i64, proforma_id: i64) -> Item {
        Item {
            id,
            proforma_id,
            name: "Brake pads".into(),
            unit: Some("set".into()),
            quantity: 2.0,
            unit_price: 45.0,
            total_price: 90.0,
            last_modified: "2024-01-02T09:30:00".into(),
        }
    }

    #[test]
    fn proforma_upsert_and_lookup() {
        let store = SqliteStore::open_in_memory().unwrap();

        store
            .upsert_proforma(&sample_proforma(1, "2024-01-01"))
            .unwrap();

        let found = store.get_proforma(1).unwrap().unwrap();
        assert_eq!(found.proforma_number, "PF-001");
        assert!(store.get_proforma(99).unwrap().is_none());
    }

    #[test]
    fn upsert_overwrites_same_id() {
        let store = SqliteStore::open_in_memory().unwrap();

        store
            .upsert_proforma(&sample_proforma(1, "2024-01-01"))
            .unwrap();
        let mut updated = sample_proforma(1, "2024-01-01");
        updated.customer_name = "New Owner".into();
        store.upsert_proforma(&updated).unwrap();

        assert_eq!(store.count_proformas().unwrap(), 1);
        let found = store.get_proforma(1).unwrap().unwrap();
        assert_eq!(found.customer_name, "New Owner");
    }

    #[test]
    fn items_filtered_by_owner() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.upsert_item(&sample_item(1, 10)).unwrap();
        store.upsert_item(&sample_item(2, 10)).unwrap();
        store.upsert_item(&sample_item(3, 20)).unwrap();

        let items = store.items_for_proformas(&[10]).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.proforma_id == 10));

        assert!(store.items_for_proformas(&[]).unwrap().is_empty());
    }

    #[test]
    fn bulk_delete_by_owner() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.upsert_item(&sample_item(1, 10)).unwrap();
        store.upsert_item(&sample_item(2, 20)).unwrap();
        store.upsert_item(&sample_item(3, 30)).unwrap();

        let deleted = store.delete_items_for_proformas(&[10, 20]).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count_items().unwrap(), 1);
        assert!(store.get_item(3).unwrap().is_some());

        assert_eq!(store.delete_items_for_proformas(&[]).unwrap(), 0);
    }

    #[test]
    fn stats_counts_both_kinds() {
        let store = SqliteStore::open_in_memory().unwrap();

        store
            .upsert_proforma(&sample_proforma(1, "2024-01-01"))
            .unwrap();
        store.upsert_item(&sample_item(1, 1)).unwrap();
        store.upsert_item(&sample_item(2, 1)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.proformas, 1);
        assert_eq!(stats.items, 2);
    }
}
