pub const CHECKPOINTS_TABLE: &str = "checkpoints";
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_CHECKPOINTS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS checkpoints (\
    thread_id TEXT NOT NULL,\
    seq INTEGER NOT NULL,\
    created_at TEXT NOT NULL,\
    node TEXT NOT NULL,\
    step INTEGER NOT NULL,\
    state_json TEXT NOT NULL,\
    interrupt_json TEXT,\
    PRIMARY KEY (thread_id, seq)\
)";

pub const CREATE_THREAD_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_checkpoints_thread ON checkpoints (thread_id, seq)";

pub const MIGRATION_STATEMENTS_SQL: [&str; 2] =
    [CREATE_CHECKPOINTS_TABLE_SQL, CREATE_THREAD_INDEX_SQL];

pub const INSERT_CHECKPOINT_SQL: &str = "INSERT INTO checkpoints \
    (thread_id, seq, created_at, node, step, state_json, interrupt_json) \
    VALUES (?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM checkpoints WHERE thread_id = ?), ?, ?, ?, ?, ?)";

pub const SELECT_LATEST_CHECKPOINT_SQL: &str = "SELECT created_at, node, step, state_json, interrupt_json \
    FROM checkpoints WHERE thread_id = ? ORDER BY seq DESC LIMIT 1";

pub const SELECT_CHECKPOINT_HISTORY_SQL: &str =
    "SELECT seq, created_at FROM checkpoints WHERE thread_id = ? ORDER BY seq ASC";
