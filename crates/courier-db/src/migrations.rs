use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY,
            username     TEXT NOT NULL UNIQUE,
            password     TEXT NOT NULL,
            role         TEXT NOT NULL DEFAULT 'user',
            daily_limit  INTEGER NOT NULL,
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id, created_at);

        CREATE TABLE IF NOT EXISTS message_deliveries (
            id                 TEXT PRIMARY KEY,
            message_id         TEXT NOT NULL REFERENCES messages(id),
            position           INTEGER NOT NULL,
            platform           TEXT NOT NULL,
            destination        TEXT NOT NULL,
            status             TEXT NOT NULL,
            provider_response  TEXT,
            error_message      TEXT,
            sent_at            TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_deliveries_message
            ON message_deliveries(message_id, position);

        -- Exactly one counter row per (user, day), no matter how many
        -- concurrent first-sends race to create it.
        CREATE TABLE IF NOT EXISTS daily_message_counts (
            user_id  TEXT NOT NULL REFERENCES users(id),
            date     TEXT NOT NULL,
            count    INTEGER NOT NULL DEFAULT 0,
            UNIQUE(user_id, date)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
