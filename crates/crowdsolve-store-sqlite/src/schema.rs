//! SQL schema for the CrowdSolve SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,   -- trimmed + lowercased
    avatar        TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS problems (
    problem_id      TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    description     TEXT NOT NULL,
    location        TEXT NOT NULL,
    image           TEXT NOT NULL DEFAULT '',
    owner_id        TEXT NOT NULL REFERENCES users(user_id),
    status          TEXT NOT NULL DEFAULT 'open'
                    CHECK (status IN ('open', 'in-progress', 'solved')),
    solutions_count INTEGER NOT NULL DEFAULT 0 CHECK (solutions_count >= 0),
    created_at      TEXT NOT NULL,   -- fixed-width RFC 3339, sortable
    updated_at      TEXT NOT NULL
);

-- One row per solution document. Upvotes and comments are embedded as JSON
-- and always rewritten together with upvote_count.
-- No ON DELETE CASCADE: deleting a problem removes its solutions explicitly
-- inside the same transaction.
CREATE TABLE IF NOT EXISTS solutions (
    solution_id  TEXT PRIMARY KEY,
    problem_id   TEXT NOT NULL REFERENCES problems(problem_id),
    author_id    TEXT NOT NULL REFERENCES users(user_id),
    description  TEXT NOT NULL,
    upvotes      TEXT NOT NULL DEFAULT '[]',   -- JSON array of user ids
    upvote_count INTEGER NOT NULL DEFAULT 0,
    comments     TEXT NOT NULL DEFAULT '[]',   -- JSON array of comments
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS problems_created_idx ON problems(created_at);
CREATE INDEX IF NOT EXISTS problems_status_idx  ON problems(status);
CREATE INDEX IF NOT EXISTS solutions_problem_idx
    ON solutions(problem_id, upvote_count);

PRAGMA user_version = 1;
";
