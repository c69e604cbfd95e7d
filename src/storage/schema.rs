//! Database schema definitions

/// SQL to create the proformas table.
///
/// `id` is client-assigned; INTEGER PRIMARY KEY enforces the global
/// uniqueness invariant without any auto-numbering.
pub const CREATE_PROFORMAS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS proformas (
    id INTEGER PRIMARY KEY,
    proforma_number TEXT NOT NULL,
    customer_name TEXT NOT NULL,
    customer_phone TEXT,
    vehicle_make TEXT,
    vehicle_model TEXT,
    plate_number TEXT,
    chassis_number TEXT,
    vehicle_type TEXT,
    subtotal REAL NOT NULL,
    tax REAL NOT NULL,
    total REAL NOT NULL,
    date_created TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    prepared_by TEXT,
    valid_until TEXT,
    user_id TEXT
)
"#;

/// SQL to create the items table
pub const CREATE_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY,
    proforma_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    unit TEXT,
    quantity REAL NOT NULL,
    unit_price REAL NOT NULL,
    total_price REAL NOT NULL,
    last_modified TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_items_proforma ON items(proforma_id)",
    "CREATE INDEX IF NOT EXISTS idx_proformas_created ON proformas(date_created)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_PROFORMAS_TABLE, CREATE_ITEMS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
