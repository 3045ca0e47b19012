//! Cell ownership rows in the `claimed_cells` table.
//!
//! [`PgCellStore`] is the `PostgreSQL` implementation of [`CellStore`]. It
//! owns its connection pool and the schema migrations for the table.
//! Saving an unclaimed row deletes the cell's row, so the table only ever
//! holds claimed cells and the range probe is a plain `EXISTS`. Queries
//! are built at runtime, so no live database is needed at build time.

use std::time::Duration;

use parcel_core::{CellRange, CellStore};
use parcel_registry::StoreError;
use parcel_types::{ActorId, CellOwnership, CellTag, GroupId};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

use crate::error::DbError;

/// How long to wait for a free connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an unused connection is kept open.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// A row from the `claimed_cells` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CellRow {
    /// Dimension name.
    pub dimension: String,
    /// Cell x coordinate.
    pub x: i32,
    /// Cell z coordinate.
    pub z: i32,
    /// Owning actor.
    pub actor_owner: Option<Uuid>,
    /// Owning group.
    pub group_owner: Option<Uuid>,
}

impl TryFrom<CellRow> for CellOwnership {
    type Error = DbError;

    fn try_from(row: CellRow) -> Result<Self, Self::Error> {
        if row.actor_owner.is_none() && row.group_owner.is_none() {
            return Err(DbError::InvalidRow(format!(
                "cell {}:{},{} is stored without an owner",
                row.dimension, row.x, row.z
            )));
        }
        Ok(Self {
            cell: CellTag::new(row.dimension, row.x, row.z),
            actor_owner: row.actor_owner.map(ActorId),
            group_owner: row.group_owner.map(GroupId),
        })
    }
}

/// Operations on the `claimed_cells` table.
///
/// Cheap to clone; every clone shares one pool.
#[derive(Debug, Clone)]
pub struct PgCellStore {
    pool: PgPool,
}

impl PgCellStore {
    /// Open a pool of at most `max_connections` (at least one) to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Postgres`] if the connection fails.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DbError> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("Invalid database URL: {e}")))?;
        let max_connections = max_connections.max(1);
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect_with(options)
            .await?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Bring `claimed_cells` up to the latest schema.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if any migration fails.
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Cell store migrations applied");
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }

    /// Fetch the row for `cell`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    /// Returns [`DbError::InvalidRow`] if the stored row has no owner.
    pub async fn get(&self, cell: &CellTag) -> Result<Option<CellOwnership>, DbError> {
        let row = sqlx::query_as::<_, CellRow>(
            r"SELECT dimension, x, z, actor_owner, group_owner
              FROM claimed_cells
              WHERE dimension = $1 AND x = $2 AND z = $3",
        )
        .bind(cell.dimension.as_str())
        .bind(cell.x)
        .bind(cell.z)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CellOwnership::try_from).transpose()
    }

    /// Insert or replace the row for `row.cell`, or delete it when the row
    /// is unclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the statement fails.
    pub async fn put(&self, row: &CellOwnership) -> Result<(), DbError> {
        let cell = &row.cell;
        if row.is_unclaimed() {
            sqlx::query(r"DELETE FROM claimed_cells WHERE dimension = $1 AND x = $2 AND z = $3")
                .bind(cell.dimension.as_str())
                .bind(cell.x)
                .bind(cell.z)
                .execute(&self.pool)
                .await?;
            tracing::debug!(
                dimension = %cell.dimension,
                x = cell.x,
                z = cell.z,
                "Cell row removed"
            );
            return Ok(());
        }

        sqlx::query(
            r"INSERT INTO claimed_cells (dimension, x, z, actor_owner, group_owner)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (dimension, x, z) DO UPDATE
              SET actor_owner = EXCLUDED.actor_owner,
                  group_owner = EXCLUDED.group_owner,
                  updated_at = now()",
        )
        .bind(cell.dimension.as_str())
        .bind(cell.x)
        .bind(cell.z)
        .bind(row.actor_owner.map(|id| id.0))
        .bind(row.group_owner.map(|id| id.0))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Whether any row falls inside `range`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn exists_within(&self, range: &CellRange) -> Result<bool, DbError> {
        let found: bool = sqlx::query_scalar(
            r"SELECT EXISTS(
                  SELECT 1 FROM claimed_cells
                  WHERE dimension = $1
                    AND x BETWEEN $2 AND $3
                    AND z BETWEEN $4 AND $5
              )",
        )
        .bind(range.dimension.as_str())
        .bind(range.min_x)
        .bind(range.max_x)
        .bind(range.min_z)
        .bind(range.max_z)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    /// Insert `row` unless its cell already has one.
    ///
    /// Returns whether the row was inserted. The primary key makes this a
    /// single atomic decision, so of two racing claims only one inserts.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if `row` names no owner.
    /// Returns [`DbError::Postgres`] if the statement fails.
    pub async fn insert_new(&self, row: &CellOwnership) -> Result<bool, DbError> {
        let cell = &row.cell;
        if row.is_unclaimed() {
            return Err(DbError::InvalidRow(format!("cannot claim {cell} without an owner")));
        }
        let result = sqlx::query(
            r"INSERT INTO claimed_cells (dimension, x, z, actor_owner, group_owner)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (dimension, x, z) DO NOTHING",
        )
        .bind(cell.dimension.as_str())
        .bind(cell.x)
        .bind(cell.z)
        .bind(row.actor_owner.map(|id| id.0))
        .bind(row.group_owner.map(|id| id.0))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

impl CellStore for PgCellStore {
    async fn load(&self, cell: &CellTag) -> Result<Option<CellOwnership>, StoreError> {
        Ok(self.get(cell).await?)
    }

    async fn save(&self, row: &CellOwnership) -> Result<(), StoreError> {
        Ok(self.put(row).await?)
    }

    async fn claim_if_unclaimed(&self, row: &CellOwnership) -> Result<bool, StoreError> {
        Ok(self.insert_new(row).await?)
    }

    async fn any_claimed_within(&self, range: &CellRange) -> Result<bool, StoreError> {
        Ok(self.exists_within(range).await?)
    }
}
