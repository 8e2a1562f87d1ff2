//! Repository for the `bus_events` queue table.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` so concurrent pollers never hand
//! out the same row twice within one lease.

use sqlx::PgPool;
use sheetflow_core::types::EntityId;

use crate::models::bus_event::BusEvent;

const COLUMNS: &str = "id, kind, payload, created_at, claimed_until, attempts, acked_at";

pub struct BusEventRepo;

impl BusEventRepo {
    /// Enqueue an envelope.
    pub async fn insert(
        pool: &PgPool,
        id: EntityId,
        kind: &str,
        payload: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO bus_events (id, kind, payload) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(kind)
            .bind(payload)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Lease up to `limit` unacknowledged rows of the given kinds whose
    /// previous lease (if any) has expired. Returned oldest first.
    pub async fn claim_batch(
        pool: &PgPool,
        kinds: &[String],
        lease_secs: f64,
        limit: i64,
    ) -> Result<Vec<BusEvent>, sqlx::Error> {
        let query = format!(
            "UPDATE bus_events \
             SET claimed_until = NOW() + make_interval(secs => $2), attempts = attempts + 1 \
             WHERE id IN ( \
                 SELECT id FROM bus_events \
                 WHERE kind = ANY($1) \
                   AND acked_at IS NULL \
                   AND (claimed_until IS NULL OR claimed_until < NOW()) \
                 ORDER BY created_at ASC \
                 LIMIT $3 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, BusEvent>(&query)
            .bind(kinds)
            .bind(lease_secs)
            .bind(limit)
            .fetch_all(pool)
            .await?;
        rows.sort_by_key(|row| row.created_at);
        Ok(rows)
    }

    /// Mark a row as handled. Returns `false` if it was already acknowledged.
    pub async fn ack(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE bus_events SET acked_at = NOW() WHERE id = $1 AND acked_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }
}
