pub const SCHEMA: &str = r#"
-- Accounts; auth_token is reset on every login and cleared on logout
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    auth_token TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Text metadata; content lives on disk under the md5sum-sharded storage tree.
-- Several rows may share one md5sum (re-uploads of identical content).
CREATE TABLE IF NOT EXISTS texts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    md5sum TEXT NOT NULL,
    tokenization_in_progress INTEGER NOT NULL DEFAULT 0,
    tokenization_error INTEGER NOT NULL DEFAULT 0,
    uploaded_by INTEGER NOT NULL REFERENCES users(id),
    is_public INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Permission levels: 0 none, 1 read, 2 write, 3 owner
CREATE TABLE IF NOT EXISTS text_permissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text_id INTEGER NOT NULL REFERENCES texts(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    permission INTEGER NOT NULL DEFAULT 0 CHECK (permission BETWEEN 0 AND 3),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE(text_id, user_id)
);

-- Annotations; parent_annotation_id NULL marks the blank slate of a text
CREATE TABLE IF NOT EXISTS annotations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text_id INTEGER NOT NULL REFERENCES texts(id),
    created_by INTEGER NOT NULL REFERENCES users(id),
    parent_annotation_id INTEGER REFERENCES annotations(id),
    annotation TEXT NOT NULL DEFAULT '{}',
    method TEXT NOT NULL,
    method_metadata TEXT,
    label TEXT,
    is_public INTEGER NOT NULL DEFAULT 0,
    automated_method_in_progress INTEGER NOT NULL DEFAULT 0,
    automated_method_error INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS annotation_permissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    annotation_id INTEGER NOT NULL REFERENCES annotations(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    permission INTEGER NOT NULL DEFAULT 0 CHECK (permission BETWEEN 0 AND 3),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE(annotation_id, user_id)
);

-- Studies
CREATE TABLE IF NOT EXISTS studies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    begin_at TEXT,
    end_at TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS study_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    study_id INTEGER NOT NULL REFERENCES studies(id) ON DELETE CASCADE,
    label TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS study_steps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    study_id INTEGER REFERENCES studies(id) ON DELETE CASCADE,
    label TEXT NOT NULL,
    url TEXT,
    base_annotation_id INTEGER REFERENCES annotations(id),
    created_at TEXT DEFAULT (datetime('now'))
);

-- Order in which a group sees the steps (1 = first)
CREATE TABLE IF NOT EXISTS study_step_orderings (
    group_id INTEGER NOT NULL REFERENCES study_groups(id) ON DELETE CASCADE,
    step_id INTEGER NOT NULL REFERENCES study_steps(id) ON DELETE CASCADE,
    ordering INTEGER NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (group_id, step_id)
);

CREATE TABLE IF NOT EXISTS study_participants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    study_id INTEGER NOT NULL REFERENCES studies(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    group_id INTEGER REFERENCES study_groups(id),
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS study_participant_steps (
    study_participant_id INTEGER NOT NULL REFERENCES study_participants(id) ON DELETE CASCADE,
    step_id INTEGER NOT NULL REFERENCES study_steps(id) ON DELETE CASCADE,
    annotation_id INTEGER REFERENCES annotations(id),
    started_at TEXT,
    completed_at TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (study_participant_id, step_id)
);

-- Raw event logs recorded while a participant works on a step
CREATE TABLE IF NOT EXISTS study_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    study_participant_id INTEGER NOT NULL REFERENCES study_participants(id) ON DELETE CASCADE,
    step_id INTEGER NOT NULL REFERENCES study_steps(id) ON DELETE CASCADE,
    data TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_users_auth_token ON users(auth_token);
CREATE INDEX IF NOT EXISTS idx_texts_md5sum ON texts(md5sum);
CREATE INDEX IF NOT EXISTS idx_text_permissions_user ON text_permissions(user_id);
CREATE INDEX IF NOT EXISTS idx_annotations_text ON annotations(text_id);
CREATE INDEX IF NOT EXISTS idx_annotations_created_by ON annotations(created_by);
CREATE INDEX IF NOT EXISTS idx_annotation_permissions_user ON annotation_permissions(user_id);
CREATE INDEX IF NOT EXISTS idx_study_participants_user ON study_participants(user_id);
CREATE INDEX IF NOT EXISTS idx_study_step_orderings_group ON study_step_orderings(group_id);
"#;
