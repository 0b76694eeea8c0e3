//! The fixed schema object and the statements issued against it.

/// Name of the table provisioned on first run.
pub const TABLE_NAME: &str = "test";

/// Column read back by the final select.
pub const NAME_COLUMN: &str = "name";

/// Value of the seed row.
pub const SEED_NAME: &str = "Hello Optimy!";

pub const CREATE_TABLE: &str = r#"
    CREATE TABLE test (
        id INT AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(50)
    )
"#;

pub const INSERT_SEED: &str = "INSERT INTO test (name) VALUES ('Hello Optimy!')";

pub const SELECT_NAMES: &str = "SELECT name FROM test";

/// Catalog lookup for a table in the connection's current database.
///
/// `SHOW` statements take no placeholders, so the name is inlined as a quoted
/// literal. Callers only pass crate constants. A missing table yields zero
/// rows, not an error.
pub fn show_tables_like(table: &str) -> String {
    format!("SHOW TABLES LIKE '{}'", table.replace('\'', "''"))
}

/// Advisory lock name scoping provisioning of `table` in `database`.
///
/// MySQL caps lock names at 64 characters.
pub fn provision_lock_name(database: &str, table: &str) -> String {
    let mut name = format!("{database}.{table}.bootstrap");
    if name.len() > 64 {
        let mut cut = 64;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }
    name
}
