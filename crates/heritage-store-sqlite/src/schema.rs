//! SQL schema for the heritage SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Canonical records. The site document is stored whole; `site_id` is the
-- only key the workflow ever looks up by.
CREATE TABLE IF NOT EXISTS sites (
    site_id     TEXT PRIMARY KEY,
    doc_json    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Staged proposals. Administrative fields are columns; the proposed site
-- snapshot is a document.
CREATE TABLE IF NOT EXISTS temp_sites (
    temp_site_id        TEXT PRIMARY KEY,
    site_id             TEXT NOT NULL,
    doc_json            TEXT NOT NULL,
    status              TEXT NOT NULL DEFAULT 'pending',
    action              TEXT NOT NULL,   -- 'add' | 'modify'
    kind                TEXT NOT NULL,   -- 'site' | 'inscription'
    research_expert_id  TEXT NOT NULL,   -- weak reference; no FK
    admin_feedback      TEXT,
    expires_at          TEXT,            -- set only for approved/rejected
    uploads             TEXT NOT NULL DEFAULT '[]',
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL,
    role        TEXT NOT NULL,   -- 'user' | 'research_expert' | 'admin'
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS temp_sites_expires_idx   ON temp_sites(expires_at);
CREATE INDEX IF NOT EXISTS temp_sites_submitter_idx ON temp_sites(research_expert_id);
CREATE INDEX IF NOT EXISTS users_role_idx           ON users(role);

PRAGMA user_version = 1;
";
