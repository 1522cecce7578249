//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (other) | any other | `Persistence` |
//! | PoolClosed / network / decode | N/A | `Persistence` |
//!
//! Counters are stored as `BIGINT` with range checks matching `u32`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use shopfloor_core::{DomainError, MachineId, ProductionEntryId, ToolId, UserId};
use shopfloor_inventory::{DefectReport, FieldErrors, Tool, ToolState};
use shopfloor_production::{Machine, ProductionEntry};

use super::r#trait::{DefectReportQuery, ProductionStore, StoreError, ToolStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tools (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        stock BIGINT NOT NULL CHECK (stock BETWEEN 0 AND 4294967295),
        defective_stock BIGINT NOT NULL CHECK (defective_stock BETWEEN 0 AND 4294967295),
        min_threshold BIGINT NOT NULL CHECK (min_threshold BETWEEN 0 AND 4294967295),
        location TEXT NOT NULL DEFAULT '',
        avg_daily_outflow NUMERIC(6, 2) CHECK (avg_daily_outflow >= 0),
        last_updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS defect_reports (
        id UUID PRIMARY KEY,
        tool_id UUID NOT NULL REFERENCES tools (id),
        reported_by UUID NOT NULL,
        defective_count BIGINT NOT NULL CHECK (defective_count > 0),
        description TEXT NOT NULL DEFAULT '',
        recorded_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS defect_reports_reporter_idx
        ON defect_reports (reported_by, recorded_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS machines (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        subdivision TEXT NOT NULL,
        location_description TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS production_entries (
        id UUID PRIMARY KEY,
        worker UUID NOT NULL,
        worker_name TEXT NOT NULL DEFAULT '',
        machine_id UUID NOT NULL REFERENCES machines (id),
        detail_name TEXT NOT NULL,
        parts_made BIGINT NOT NULL CHECK (parts_made >= 0),
        defective_parts BIGINT NOT NULL CHECK (defective_parts >= 0),
        temperature_c NUMERIC(5, 2),
        vibration_mm NUMERIC(5, 3),
        tool_wear_percent NUMERIC(6, 2),
        shift TEXT NOT NULL DEFAULT '',
        note TEXT NOT NULL DEFAULT '',
        recorded_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    ALTER TABLE production_entries ADD COLUMN IF NOT EXISTS worker_name TEXT NOT NULL DEFAULT ''
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS production_entries_worker_idx
        ON production_entries (worker, recorded_at DESC)
    "#,
];

const REPLACE_STATE: &str = r#"
    UPDATE tools
    SET stock = $2,
        defective_stock = $3,
        min_threshold = $4,
        location = $5,
        avg_daily_outflow = $6,
        last_updated_at = $7
    WHERE id = $1
    RETURNING id, name, stock, defective_stock, min_threshold, location, avg_daily_outflow, last_updated_at
"#;

fn bind_state<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    id: ToolId,
    state: &'q ToolState,
    at: DateTime<Utc>,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(*id.as_uuid())
        .bind(i64::from(state.stock))
        .bind(i64::from(state.defective_stock))
        .bind(i64::from(state.min_threshold))
        .bind(&state.location)
        .bind(state.avg_daily_outflow)
        .bind(at)
}

/// Create tables and indexes when missing. Safe to run on every startup.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    Ok(())
}

/// Postgres-backed tool store.
///
/// `update_state` locks the row with `SELECT ... FOR UPDATE` before deriving
/// the next state. `record_defect` runs the counter increment and the report
/// insert in one transaction. The increment is a single `UPDATE ... SET defective_stock =
/// defective_stock + $n`, so Postgres' row lock serializes concurrent reports
/// against the same tool.
#[derive(Clone)]
pub struct PostgresToolStore {
    pool: Arc<PgPool>,
}

impl PostgresToolStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl ToolStore for PostgresToolStore {
    #[instrument(skip(self, tool), fields(tool_id = %tool.id), err)]
    async fn insert_tool(&self, tool: &Tool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tools
                (id, name, stock, defective_stock, min_threshold, location, avg_daily_outflow, last_updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(tool.id.as_uuid())
        .bind(&tool.name)
        .bind(i64::from(tool.stock))
        .bind(i64::from(tool.defective_stock))
        .bind(i64::from(tool.min_threshold))
        .bind(&tool.location)
        .bind(tool.avg_daily_outflow)
        .bind(tool.last_updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_tool", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(tool_id = %id), err)]
    async fn get_tool(&self, id: ToolId) -> Result<Option<Tool>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, stock, defective_stock, min_threshold, location, avg_daily_outflow, last_updated_at
            FROM tools
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_tool", e))?;

        row.as_ref().map(tool_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_tools(&self) -> Result<Vec<Tool>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, stock, defective_stock, min_threshold, location, avg_daily_outflow, last_updated_at
            FROM tools
            ORDER BY name
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_tools", e))?;

        rows.iter().map(tool_from_row).collect()
    }

    #[instrument(skip(self, state), fields(tool_id = %id), err)]
    async fn replace_state(
        &self,
        id: ToolId,
        state: &ToolState,
        at: DateTime<Utc>,
    ) -> Result<Tool, StoreError> {
        let row = bind_state(sqlx::query(REPLACE_STATE), id, state, at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("replace_state", e))?;

        match row {
            Some(row) => tool_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self, update), fields(tool_id = %id), err)]
    async fn update_state(
        &self,
        id: ToolId,
        update: &(dyn for<'s> Fn(&'s ToolState) -> Result<ToolState, FieldErrors> + Send + Sync),
        at: DateTime<Utc>,
    ) -> Result<Tool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_state", e))?;

        let current = sqlx::query(
            r#"
            SELECT id, name, stock, defective_stock, min_threshold, location, avg_daily_outflow, last_updated_at
            FROM tools
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_state", e))?;

        let Some(current) = current else {
            return Err(StoreError::NotFound);
        };
        let current = tool_from_row(&current)?;
        // Dropping `tx` on rejection rolls back and releases the row lock.
        let next = update(&current.state()).map_err(StoreError::Rejected)?;

        let row = bind_state(sqlx::query(REPLACE_STATE), id, &next, at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_state", e))?;
        let tool = tool_from_row(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_state", e))?;
        Ok(tool)
    }

    #[instrument(
        skip(self, report),
        fields(tool_id = %report.tool_id, defective_count = report.defective_count),
        err
    )]
    async fn record_defect(&self, report: &DefectReport) -> Result<Tool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("record_defect", e))?;

        let updated = sqlx::query(
            r#"
            UPDATE tools
            SET defective_stock = defective_stock + $2,
                last_updated_at = $3
            WHERE id = $1 AND defective_stock + $2 <= $4
            RETURNING id, name, stock, defective_stock, min_threshold, location, avg_daily_outflow, last_updated_at
            "#,
        )
        .bind(report.tool_id.as_uuid())
        .bind(i64::from(report.defective_count))
        .bind(report.recorded_at)
        .bind(i64::from(u32::MAX))
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("record_defect", e))?;

        let Some(row) = updated else {
            // Either the tool is missing or the increment would overflow.
            let exists = sqlx::query("SELECT 1 FROM tools WHERE id = $1")
                .bind(report.tool_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("record_defect", e))?
                .is_some();
            return Err(if exists {
                DomainError::invariant("defective_stock would overflow").into()
            } else {
                StoreError::NotFound
            });
        };
        let tool = tool_from_row(&row)?;

        sqlx::query(
            r#"
            INSERT INTO defect_reports
                (id, tool_id, reported_by, defective_count, description, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(report.id.as_uuid())
        .bind(report.tool_id.as_uuid())
        .bind(report.reported_by.as_uuid())
        .bind(i64::from(report.defective_count))
        .bind(&report.description)
        .bind(report.recorded_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("record_defect", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("record_defect", e))?;
        Ok(tool)
    }

    #[instrument(skip(self), err)]
    async fn list_defect_reports(
        &self,
        query: DefectReportQuery,
    ) -> Result<Vec<DefectReport>, StoreError> {
        let limit = query.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let rows = sqlx::query(
            r#"
            SELECT id, tool_id, reported_by, defective_count, description, recorded_at
            FROM defect_reports
            WHERE ($1::uuid IS NULL OR reported_by = $1)
            ORDER BY recorded_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(query.reported_by.map(|u| *u.as_uuid()))
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_defect_reports", e))?;

        rows.iter().map(report_from_row).collect()
    }
}

/// Postgres-backed production log store.
#[derive(Clone)]
pub struct PostgresProductionStore {
    pool: Arc<PgPool>,
}

impl PostgresProductionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl ProductionStore for PostgresProductionStore {
    #[instrument(skip(self, machine), fields(machine_id = %machine.id), err)]
    async fn insert_machine(&self, machine: &Machine) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO machines (id, name, subdivision, location_description)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(machine.id.as_uuid())
        .bind(&machine.name)
        .bind(&machine.subdivision)
        .bind(&machine.location_description)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_machine", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(machine_id = %id), err)]
    async fn get_machine(&self, id: MachineId) -> Result<Option<Machine>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, subdivision, location_description FROM machines WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_machine", e))?;

        row.as_ref().map(machine_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_machines(&self) -> Result<Vec<Machine>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, subdivision, location_description FROM machines ORDER BY name",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_machines", e))?;

        rows.iter().map(machine_from_row).collect()
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.id, machine_id = %entry.machine_id), err)]
    async fn insert_entry(&self, entry: &ProductionEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO production_entries
                (id, worker, worker_name, machine_id, detail_name, parts_made, defective_parts,
                 temperature_c, vibration_mm, tool_wear_percent, shift, note, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.worker.as_uuid())
        .bind(&entry.worker_name)
        .bind(entry.machine_id.as_uuid())
        .bind(&entry.detail_name)
        .bind(i64::from(entry.parts_made))
        .bind(i64::from(entry.defective_parts))
        .bind(entry.temperature_c)
        .bind(entry.vibration_mm)
        .bind(entry.tool_wear_percent)
        .bind(&entry.shift)
        .bind(&entry.note)
        .bind(entry.recorded_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_entry", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_entries(&self) -> Result<Vec<ProductionEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, worker, worker_name, machine_id, detail_name, parts_made, defective_parts,
                   temperature_c, vibration_mm, tool_wear_percent, shift, note, recorded_at
            FROM production_entries
            ORDER BY recorded_at, id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_entries", e))?;

        rows.iter().map(entry_from_row).collect()
    }

    #[instrument(skip(self), fields(worker = %worker), err)]
    async fn list_worker_entries(
        &self,
        worker: UserId,
        limit: usize,
    ) -> Result<Vec<ProductionEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, worker, worker_name, machine_id, detail_name, parts_made, defective_parts,
                   temperature_c, vibration_mm, tool_wear_percent, shift, note, recorded_at
            FROM production_entries
            WHERE worker = $1
            ORDER BY recorded_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(worker.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_worker_entries", e))?;

        rows.iter().map(entry_from_row).collect()
    }
}

fn counter(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let raw: i64 = row.try_get(column).map_err(decode_error)?;
    u32::try_from(raw)
        .map_err(|_| StoreError::Persistence(format!("column {column} out of range: {raw}")))
}

fn tool_from_row(row: &PgRow) -> Result<Tool, StoreError> {
    Ok(Tool {
        id: ToolId::from_uuid(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        stock: counter(row, "stock")?,
        defective_stock: counter(row, "defective_stock")?,
        min_threshold: counter(row, "min_threshold")?,
        location: row.try_get("location").map_err(decode_error)?,
        avg_daily_outflow: row
            .try_get::<Option<Decimal>, _>("avg_daily_outflow")
            .map_err(decode_error)?,
        last_updated_at: row.try_get("last_updated_at").map_err(decode_error)?,
    })
}

fn report_from_row(row: &PgRow) -> Result<DefectReport, StoreError> {
    Ok(DefectReport {
        id: shopfloor_core::DefectReportId::from_uuid(row.try_get("id").map_err(decode_error)?),
        tool_id: ToolId::from_uuid(row.try_get("tool_id").map_err(decode_error)?),
        reported_by: UserId::from_uuid(row.try_get("reported_by").map_err(decode_error)?),
        defective_count: counter(row, "defective_count")?,
        description: row.try_get("description").map_err(decode_error)?,
        recorded_at: row.try_get("recorded_at").map_err(decode_error)?,
    })
}

fn machine_from_row(row: &PgRow) -> Result<Machine, StoreError> {
    Ok(Machine {
        id: MachineId::from_uuid(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        subdivision: row.try_get("subdivision").map_err(decode_error)?,
        location_description: row.try_get("location_description").map_err(decode_error)?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<ProductionEntry, StoreError> {
    Ok(ProductionEntry {
        id: ProductionEntryId::from_uuid(row.try_get("id").map_err(decode_error)?),
        worker: UserId::from_uuid(row.try_get("worker").map_err(decode_error)?),
        worker_name: row.try_get("worker_name").map_err(decode_error)?,
        machine_id: MachineId::from_uuid(row.try_get("machine_id").map_err(decode_error)?),
        detail_name: row.try_get("detail_name").map_err(decode_error)?,
        parts_made: counter(row, "parts_made")?,
        defective_parts: counter(row, "defective_parts")?,
        temperature_c: row.try_get("temperature_c").map_err(decode_error)?,
        vibration_mm: row.try_get("vibration_mm").map_err(decode_error)?,
        tool_wear_percent: row.try_get("tool_wear_percent").map_err(decode_error)?,
        shift: row.try_get("shift").map_err(decode_error)?,
        note: row.try_get("note").map_err(decode_error)?,
        recorded_at: row.try_get("recorded_at").map_err(decode_error)?,
    })
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Persistence(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    let mapped = match &err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound,
                _ => StoreError::Persistence(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Persistence(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Persistence(format!("sqlx error in {operation}: {err}")),
    };
    if matches!(mapped, StoreError::Persistence(_)) {
        tracing::error!(operation, error = %err, "store operation failed");
    }
    mapped
}
