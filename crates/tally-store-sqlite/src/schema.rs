//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    user_id      TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    avatar_url   TEXT,
    total_points INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);

-- Events are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS points_events (
    event_id        TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES profiles(user_id),
    chore_id        TEXT,
    kind            TEXT NOT NULL,     -- 'add' | 'subtract'
    points          INTEGER NOT NULL CHECK (points > 0),
    created_at      TEXT NOT NULL,     -- fixed-width RFC 3339 UTC; server-assigned
    idempotency_key TEXT
);

-- Replaying the same chore-status transition hits this index and surfaces
-- as a conflict instead of silently double-awarding.
CREATE UNIQUE INDEX IF NOT EXISTS points_events_idem_idx
    ON points_events(idempotency_key) WHERE idempotency_key IS NOT NULL;

-- Keyset pagination scans in (user_id, created_at, event_id) order.
CREATE INDEX IF NOT EXISTS points_events_user_idx
    ON points_events(user_id, created_at, event_id);

PRAGMA user_version = 1;
";
