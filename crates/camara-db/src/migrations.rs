use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS chambers (
            id          INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id              TEXT PRIMARY KEY,
            role            TEXT NOT NULL,
            chamber_id      INTEGER REFERENCES chambers(id),
            display_name    TEXT NOT NULL,
            min_token_iat   INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS legislators (
            id                  INTEGER PRIMARY KEY,
            profile_id          TEXT NOT NULL UNIQUE REFERENCES profiles(id),
            chamber_id          INTEGER NOT NULL REFERENCES chambers(id),
            parliamentary_name  TEXT NOT NULL,
            is_president        INTEGER NOT NULL DEFAULT 0,
            is_vice_president   INTEGER NOT NULL DEFAULT 0,
            party_id            INTEGER
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id          INTEGER PRIMARY KEY,
            chamber_id  INTEGER NOT NULL REFERENCES chambers(id),
            name        TEXT NOT NULL,
            kind        TEXT NOT NULL,
            starts_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pautas (
            id          INTEGER PRIMARY KEY,
            session_id  INTEGER NOT NULL REFERENCES sessions(id),
            name        TEXT NOT NULL,
            description TEXT,
            status      TEXT NOT NULL DEFAULT 'Pendente',
            result      TEXT
        );

        CREATE TABLE IF NOT EXISTS votes (
            id                  INTEGER PRIMARY KEY,
            pauta_id            INTEGER NOT NULL REFERENCES pautas(id),
            legislator_id       INTEGER NOT NULL REFERENCES legislators(id),
            ballot              TEXT NOT NULL CHECK (ballot IN ('SIM', 'NÃO', 'ABSTENÇÃO')),
            was_president       INTEGER NOT NULL DEFAULT 0,
            was_vice_president  INTEGER NOT NULL DEFAULT 0,
            party_id            INTEGER,
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(pauta_id, legislator_id)
        );

        CREATE INDEX IF NOT EXISTS idx_votes_pauta
            ON votes(pauta_id);

        CREATE TABLE IF NOT EXISTS speakers (
            id                  INTEGER PRIMARY KEY,
            session_id          INTEGER NOT NULL REFERENCES sessions(id),
            legislator_id       INTEGER NOT NULL REFERENCES legislators(id),
            position            INTEGER NOT NULL DEFAULT 0,
            speaking_minutes    INTEGER NOT NULL DEFAULT 5
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
