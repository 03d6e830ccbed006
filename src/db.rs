use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

pub const DB_FILE: &str = "school.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    // Two sidecars may share a workspace; wait briefly instead of failing on a held lock.
    conn.busy_timeout(Duration::from_secs(2))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS collections(
            key TEXT PRIMARY KEY,
            payload TEXT NOT NULL
        )",
        [],
    )?;

    // Workspaces written before revision tracking only have key/payload.
    ensure_collections_revision(&conn)?;
    ensure_collections_updated_at(&conn)?;

    Ok(conn)
}

fn ensure_collections_revision(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "collections", "revision")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE collections ADD COLUMN revision INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

fn ensure_collections_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "collections", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE collections ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
