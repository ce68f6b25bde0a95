//! SQL schema for the Snowflake SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,   -- trimmed, lowercased
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 of a bearer token is ever stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    role       TEXT NOT NULL,             -- 'admin' | 'moderator' | 'user'
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, role)
);

-- Every resource row, append-only. `seq` breaks ordering ties.
CREATE TABLE IF NOT EXISTS records (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    table_name TEXT NOT NULL,
    record_id  TEXT NOT NULL UNIQUE,
    actor_id   TEXT NOT NULL,             -- value of the table's actor column
    created_at TEXT NOT NULL,
    data_json  TEXT NOT NULL
);

-- `user_roles` seen through the same shape as `records`.
CREATE VIEW IF NOT EXISTS role_rows AS
    SELECT rowid       AS seq,
           'user_roles' AS table_name,
           user_id     AS actor_id,
           json_object('user_id', user_id, 'role', role, 'created_at', created_at)
                       AS data_json
    FROM user_roles;

CREATE INDEX IF NOT EXISTS records_table_actor_idx ON records(table_name, actor_id);
CREATE INDEX IF NOT EXISTS sessions_user_idx       ON sessions(user_id);

PRAGMA user_version = 1;
";
