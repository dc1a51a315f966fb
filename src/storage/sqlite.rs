use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use std::cmp::Ordering;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    Branch, BranchProperties, GraphSlice, LinkOutcome, NewThought, ParentContext, RankCandidate,
    RootPage, SimilarThought, Storage, Thought,
};
use crate::config::DatabaseConfig;
use crate::embeddings::cosine_similarity;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// How long a writer waits for the database lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const THOUGHT_COLUMNS: &str = "id, text, is_root, created_at";
const BRANCH_COLUMNS: &str =
    "id, parent_id, child_id, perspective, strength_score, strength_analysis, created_at";

/// SQLite-backed graph store
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create an in-memory database (single connection, lives as long as the pool)
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_thought(&self, thought: &NewThought) -> StorageResult<Thought> {
        let created = Thought {
            id: Uuid::new_v4().to_string(),
            text: thought.text.clone(),
            is_root: thought.is_root,
            created_at: now(),
        };

        sqlx::query(
            r#"
            INSERT INTO thoughts (id, text, embedding, is_root, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&created.id)
        .bind(&created.text)
        .bind(encode_embedding(&thought.embedding)?)
        .bind(created.is_root)
        .bind(timestamp(&created.created_at))
        .execute(&self.pool)
        .await?;

        debug!(thought_id = %created.id, is_root = created.is_root, "Thought stored");
        Ok(created)
    }

    async fn create_branch(
        &self,
        parent_id: &str,
        child: &NewThought,
        properties: &BranchProperties,
    ) -> StorageResult<Option<(Thought, Branch)>> {
        // Take the write lock up front. A deferred transaction that reads
        // first cannot upgrade once another writer has committed under WAL.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let parent: Option<(String,)> = sqlx::query_as("SELECT id FROM thoughts WHERE id = ?")
            .bind(parent_id)
            .fetch_optional(&mut *tx)
            .await?;
        if parent.is_none() {
            // Dropping the transaction rolls it back.
            return Ok(None);
        }

        let created_at = now();
        let thought = Thought {
            id: Uuid::new_v4().to_string(),
            text: child.text.clone(),
            is_root: child.is_root,
            created_at,
        };

        sqlx::query(
            r#"
            INSERT INTO thoughts (id, text, embedding, is_root, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&thought.id)
        .bind(&thought.text)
        .bind(encode_embedding(&child.embedding)?)
        .bind(thought.is_root)
        .bind(timestamp(&created_at))
        .execute(&mut *tx)
        .await?;

        let branch = new_branch(parent_id, &thought.id, properties, created_at);
        insert_branch(&mut tx, &branch).await?;

        tx.commit().await?;

        debug!(
            thought_id = %thought.id,
            branch_id = %branch.id,
            parent_id = %parent_id,
            "Thought and branch stored"
        );
        Ok(Some((thought, branch)))
    }

    async fn link_thoughts(
        &self,
        parent_id: &str,
        child_id: &str,
        properties: &BranchProperties,
    ) -> StorageResult<LinkOutcome> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        // Re-checked under the write lock; a concurrent link may have landed
        // since any earlier check.
        if let Some(conflict) = link_conflict(&mut tx, parent_id, child_id).await? {
            return Ok(conflict);
        }

        let branch = new_branch(parent_id, child_id, properties, now());
        match insert_branch(&mut tx, &branch).await {
            Ok(()) => {}
            Err(StorageError::Sqlx(e)) if is_unique_violation(&e) => {
                return Ok(LinkOutcome::ChildHasParent);
            }
            Err(e) => return Err(e),
        }

        tx.commit().await?;

        debug!(branch_id = %branch.id, parent_id = %parent_id, child_id = %child_id, "Thoughts linked");
        Ok(LinkOutcome::Created(branch))
    }

    async fn check_link(&self, parent_id: &str, child_id: &str) -> StorageResult<Option<LinkOutcome>> {
        let mut conn = self.pool.acquire().await?;
        link_conflict(&mut conn, parent_id, child_id).await
    }

    async fn delete_thought(&self, id: &str) -> StorageResult<u64> {
        // Foreign keys cascade the removal to every touching branch.
        let result = sqlx::query("DELETE FROM thoughts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_branch(&self, id: &str) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM branches WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn get_thought(&self, id: &str) -> StorageResult<Option<Thought>> {
        let row: Option<ThoughtRow> = sqlx::query_as(&format!(
            "SELECT {} FROM thoughts WHERE id = ?",
            THOUGHT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Thought::try_from).transpose()
    }

    async fn get_outgoing_branches(&self, id: &str) -> StorageResult<Vec<Branch>> {
        let rows: Vec<BranchRow> = sqlx::query_as(&format!(
            "SELECT {} FROM branches WHERE parent_id = ? ORDER BY created_at ASC",
            BRANCH_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        convert_rows(rows)
    }

    async fn find_similar_roots(&self, embedding: &[f32]) -> StorageResult<Vec<SimilarThought>> {
        let rows: Vec<EmbeddedThoughtRow> = sqlx::query_as(
            r#"
            SELECT id, text, is_root, created_at, embedding
            FROM thoughts
            WHERE is_root = 1 AND embedding IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in rows {
            let (thought, stored) = row.into_parts()?;
            if let Some(stored) = stored {
                matches.push(SimilarThought {
                    similarity: cosine_similarity(embedding, &stored),
                    thought,
                });
            }
        }
        sort_by_similarity(&mut matches);

        Ok(matches)
    }

    async fn find_similar_among(
        &self,
        parent_id: &str,
        embedding: &[f32],
    ) -> StorageResult<Option<ParentContext>> {
        let rows: Vec<ContextRow> = sqlx::query_as(
            r#"
            SELECT 'parent' AS role, id, text, is_root, created_at, embedding
            FROM thoughts
            WHERE id = ?
            UNION ALL
            SELECT 'child' AS role, t.id, t.text, t.is_root, t.created_at, t.embedding
            FROM branches b
            JOIN thoughts t ON t.id = b.child_id
            WHERE b.parent_id = ?
            "#,
        )
        .bind(parent_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        let mut parent = None;
        let mut siblings = Vec::new();
        for row in rows {
            let is_parent = row.role == "parent";
            let (thought, stored) = row.thought.into_parts()?;
            let similarity = stored
                .map(|v| cosine_similarity(embedding, &v))
                .unwrap_or(0.0);

            if is_parent {
                parent = Some((thought, similarity));
            } else {
                siblings.push(SimilarThought {
                    thought,
                    similarity,
                });
            }
        }

        let Some((parent, similarity)) = parent else {
            return Ok(None);
        };
        sort_by_similarity(&mut siblings);

        Ok(Some(ParentContext {
            parent,
            similarity,
            siblings,
        }))
    }

    async fn neighborhood(&self, ids: &[String]) -> StorageResult<GraphSlice> {
        if ids.is_empty() {
            return Ok(GraphSlice::default());
        }

        let seeds = serde_json::to_string(ids).map_err(|e| StorageError::Query {
            message: format!("Failed to encode seed ids: {}", e),
        })?;

        let mut tx = self.pool.begin().await?;

        let nodes: Vec<ThoughtRow> = sqlx::query_as(&format!(
            r#"
            WITH seeds(id) AS (SELECT value FROM json_each(?))
            SELECT {}
            FROM thoughts
            WHERE id IN (SELECT id FROM seeds)
               OR id IN (SELECT child_id FROM branches WHERE parent_id IN (SELECT id FROM seeds))
               OR id IN (SELECT parent_id FROM branches WHERE child_id IN (SELECT id FROM seeds))
            ORDER BY created_at ASC
            "#,
            THOUGHT_COLUMNS
        ))
        .bind(&seeds)
        .fetch_all(&mut *tx)
        .await?;

        let edges: Vec<BranchRow> = sqlx::query_as(&format!(
            r#"
            WITH seeds(id) AS (SELECT value FROM json_each(?))
            SELECT {}
            FROM branches
            WHERE parent_id IN (SELECT id FROM seeds)
               OR child_id IN (SELECT id FROM seeds)
            ORDER BY created_at ASC
            "#,
            BRANCH_COLUMNS
        ))
        .bind(&seeds)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(GraphSlice {
            nodes: convert_rows(nodes)?,
            edges: convert_rows(edges)?,
        })
    }

    async fn subgraph(&self, root_id: &str) -> StorageResult<Option<GraphSlice>> {
        // UNION (not UNION ALL) discards rows already in `reach`, which is
        // what terminates the recursion if the graph ever contains a cycle.
        const REACH: &str = r#"
            WITH RECURSIVE reach(id) AS (
                SELECT id FROM thoughts WHERE id = ?
                UNION
                SELECT b.child_id FROM branches b JOIN reach r ON b.parent_id = r.id
            )
        "#;

        let mut tx = self.pool.begin().await?;

        let nodes: Vec<ThoughtRow> = sqlx::query_as(&format!(
            "{} SELECT {} FROM thoughts WHERE id IN (SELECT id FROM reach) ORDER BY created_at ASC",
            REACH, THOUGHT_COLUMNS
        ))
        .bind(root_id)
        .fetch_all(&mut *tx)
        .await?;

        if nodes.is_empty() {
            return Ok(None);
        }

        let edges: Vec<BranchRow> = sqlx::query_as(&format!(
            r#"{} SELECT {} FROM branches
            WHERE parent_id IN (SELECT id FROM reach) AND child_id IN (SELECT id FROM reach)
            ORDER BY created_at ASC"#,
            REACH, BRANCH_COLUMNS
        ))
        .bind(root_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(GraphSlice {
            nodes: convert_rows(nodes)?,
            edges: convert_rows(edges)?,
        }))
    }

    async fn list_roots(&self, skip: u32, limit: u32) -> StorageResult<RootPage> {
        let mut tx = self.pool.begin().await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM thoughts WHERE is_root = 1")
            .fetch_one(&mut *tx)
            .await?;

        let rows: Vec<ThoughtRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM thoughts
            WHERE is_root = 1
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            THOUGHT_COLUMNS
        ))
        .bind(i64::from(limit))
        .bind(i64::from(skip))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RootPage {
            nodes: convert_rows(rows)?,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn rank_candidates(&self) -> StorageResult<Vec<RankCandidate>> {
        let rows: Vec<EmbeddedThoughtRow> = sqlx::query_as(
            r#"
            SELECT id, text, is_root, created_at, embedding
            FROM thoughts
            WHERE is_root = 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let (thought, embedding) = row.into_parts()?;
                Ok(RankCandidate { thought, embedding })
            })
            .collect()
    }
}

/// First reason `parent_id -> child_id` cannot be added, if any.
async fn link_conflict(
    conn: &mut SqliteConnection,
    parent_id: &str,
    child_id: &str,
) -> StorageResult<Option<LinkOutcome>> {
    if parent_id == child_id {
        return Ok(Some(LinkOutcome::SelfLoop));
    }

    let parent: Option<(String,)> = sqlx::query_as("SELECT id FROM thoughts WHERE id = ?")
        .bind(parent_id)
        .fetch_optional(&mut *conn)
        .await?;
    if parent.is_none() {
        return Ok(Some(LinkOutcome::ParentMissing));
    }

    let child: Option<(bool,)> = sqlx::query_as("SELECT is_root FROM thoughts WHERE id = ?")
        .bind(child_id)
        .fetch_optional(&mut *conn)
        .await?;
    match child {
        None => return Ok(Some(LinkOutcome::ChildMissing)),
        Some((true,)) => return Ok(Some(LinkOutcome::ChildIsRoot)),
        Some((false,)) => {}
    }

    let (incoming,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM branches WHERE child_id = ?")
            .bind(child_id)
            .fetch_one(&mut *conn)
            .await?;
    if incoming > 0 {
        return Ok(Some(LinkOutcome::ChildHasParent));
    }

    // The new edge closes a cycle if the parent already descends from the child.
    let (cycles,): (i64,) = sqlx::query_as(
        r#"
        WITH RECURSIVE reach(id) AS (
            SELECT ?
            UNION
            SELECT b.child_id FROM branches b JOIN reach r ON b.parent_id = r.id
        )
        SELECT COUNT(*) FROM reach WHERE id = ?
        "#,
    )
    .bind(child_id)
    .bind(parent_id)
    .fetch_one(&mut *conn)
    .await?;
    if cycles > 0 {
        return Ok(Some(LinkOutcome::WouldCycle));
    }

    Ok(None)
}

async fn insert_branch(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    branch: &Branch,
) -> StorageResult<()> {
    sqlx::query(
        r#"
        INSERT INTO branches (id, parent_id, child_id, perspective, strength_score, strength_analysis, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&branch.id)
    .bind(&branch.parent_id)
    .bind(&branch.child_id)
    .bind(&branch.perspective)
    .bind(branch.strength_score)
    .bind(&branch.strength_analysis)
    .bind(timestamp(&branch.created_at))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn new_branch(
    parent_id: &str,
    child_id: &str,
    properties: &BranchProperties,
    created_at: DateTime<Utc>,
) -> Branch {
    Branch {
        id: Uuid::new_v4().to_string(),
        parent_id: parent_id.to_string(),
        child_id: child_id.to_string(),
        perspective: properties.perspective.clone(),
        strength_score: properties.strength_score,
        strength_analysis: properties.strength_analysis.clone(),
        created_at,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

fn sort_by_similarity(matches: &mut [SimilarThought]) {
    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
}

/// Current time at the precision the store keeps.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    // Fixed width so lexical order in SQL matches time order.
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: &str, raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Integrity {
            message: format!("Stored timestamp for {} is unreadable ({:?}): {}", id, raw, e),
        })
}

fn convert_rows<R, T>(rows: Vec<R>) -> StorageResult<Vec<T>>
where
    T: TryFrom<R, Error = StorageError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn encode_embedding(embedding: &[f32]) -> StorageResult<String> {
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(StorageError::Integrity {
            message: "Embedding contains non-finite values".to_string(),
        });
    }
    serde_json::to_string(embedding).map_err(|e| StorageError::Query {
        message: format!("Failed to encode embedding: {}", e),
    })
}

fn decode_embedding(id: &str, raw: &str) -> StorageResult<Vec<f32>> {
    serde_json::from_str(raw).map_err(|e| StorageError::Integrity {
        message: format!("Stored embedding for thought {} is unreadable: {}", id, e),
    })
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct ThoughtRow {
    id: String,
    text: String,
    is_root: bool,
    created_at: String,
}

impl TryFrom<ThoughtRow> for Thought {
    type Error = StorageError;

    fn try_from(row: ThoughtRow) -> StorageResult<Self> {
        Ok(Self {
            created_at: parse_timestamp(&row.id, &row.created_at)?,
            id: row.id,
            text: row.text,
            is_root: row.is_root,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EmbeddedThoughtRow {
    id: String,
    text: String,
    is_root: bool,
    created_at: String,
    embedding: Option<String>,
}

impl EmbeddedThoughtRow {
    fn into_parts(self) -> StorageResult<(Thought, Option<Vec<f32>>)> {
        let embedding = match &self.embedding {
            Some(raw) => Some(decode_embedding(&self.id, raw)?),
            None => None,
        };
        let thought = Thought {
            created_at: parse_timestamp(&self.id, &self.created_at)?,
            id: self.id,
            text: self.text,
            is_root: self.is_root,
        };
        Ok((thought, embedding))
    }
}

#[derive(sqlx::FromRow)]
struct ContextRow {
    role: String,
    #[sqlx(flatten)]
    thought: EmbeddedThoughtRow,
}

#[derive(sqlx::FromRow)]
struct BranchRow {
    id: String,
    parent_id: String,
    child_id: String,
    perspective: Option<String>,
    strength_score: Option<i64>,
    strength_analysis: Option<String>,
    created_at: String,
}

impl TryFrom<BranchRow> for Branch {
    type Error = StorageError;

    fn try_from(row: BranchRow) -> StorageResult<Self> {
        Ok(Self {
            created_at: parse_timestamp(&row.id, &row.created_at)?,
            id: row.id,
            parent_id: row.parent_id,
            child_id: row.child_id,
            perspective: row.perspective,
            // The column CHECK keeps stored scores within i32 range.
            strength_score: row.strength_score.and_then(|s| i32::try_from(s).ok()),
            strength_analysis: row.strength_analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(values: &[f32]) -> Vec<f32> {
        values.to_vec()
    }

    #[tokio::test]
    async fn test_create_and_get_thought() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();

        let created = storage
            .create_thought(&NewThought::root("What is time?", embedding(&[1.0, 0.0])))
            .await
            .unwrap();
        assert!(created.is_root);

        let fetched = storage.get_thought(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_branch_missing_parent_writes_nothing() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();

        let result = storage
            .create_branch(
                "missing",
                &NewThought::branch("Orphan?", embedding(&[0.0, 1.0])),
                &BranchProperties::default(),
            )
            .await
            .unwrap();
        assert!(result.is_none());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM thoughts")
            .fetch_one(storage.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_unique_child_index_rejects_second_parent() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let a = storage
            .create_thought(&NewThought::root("A", embedding(&[1.0, 0.0])))
            .await
            .unwrap();
        let b = storage
            .create_thought(&NewThought::root("B", embedding(&[0.0, 1.0])))
            .await
            .unwrap();
        let (child, _) = storage
            .create_branch(
                &a.id,
                &NewThought::branch("C", embedding(&[1.0, 1.0])),
                &BranchProperties::default(),
            )
            .await
            .unwrap()
            .unwrap();

        let result = sqlx::query(
            "INSERT INTO branches (id, parent_id, child_id, created_at) VALUES ('x', ?, ?, '2025-01-01T00:00:00.000000Z')",
        )
        .bind(&b.id)
        .bind(&child.id)
        .execute(storage.pool())
        .await;

        let err = result.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn test_timestamp_is_fixed_width() {
        let dt = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(timestamp(&dt), "2025-03-01T10:00:00.000000Z");
        assert_eq!(parse_timestamp("t1", &timestamp(&dt)).unwrap(), dt);
    }

    #[test]
    fn test_encode_embedding_rejects_nan() {
        assert!(encode_embedding(&[0.1, f32::NAN]).is_err());
        assert_eq!(encode_embedding(&[0.5, -1.0]).unwrap(), "[0.5,-1.0]");
    }
}
