use rusqlite::{Connection, Result};

/// Initialise audit tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_generations_table(conn)?;
    create_append_only_triggers(conn)?;
    Ok(())
}

fn create_generations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS generations (
            id              TEXT PRIMARY KEY,
            channel         TEXT NOT NULL,
            model           TEXT NOT NULL,
            persona         TEXT NOT NULL,
            temperature     REAL NOT NULL,
            top_p           REAL NOT NULL,
            top_k           INTEGER NOT NULL,
            seed            INTEGER NOT NULL,
            max_new_tokens  INTEGER NOT NULL,
            response        TEXT NOT NULL,
            rating          INTEGER NOT NULL DEFAULT 5,
            created_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_generations_channel
            ON generations(channel, created_at DESC);",
    )
}

/// Rows may be inserted and re-rated, nothing else.
fn create_append_only_triggers(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TRIGGER IF NOT EXISTS generations_no_delete
            BEFORE DELETE ON generations
         BEGIN
            SELECT RAISE(ABORT, 'generations is append-only');
         END;
         CREATE TRIGGER IF NOT EXISTS generations_rating_only
            BEFORE UPDATE OF id, channel, model, persona, temperature, top_p,
                             top_k, seed, max_new_tokens, response, created_at
            ON generations
         BEGIN
            SELECT RAISE(ABORT, 'only rating may change on a generation');
         END;",
    )
}
