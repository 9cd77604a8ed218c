// src/db/movement_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        movement::{DailyMovement, MovementFilter, MovementKind, MovementTotals, StockMovement, UserProductivity},
        stock::StockLocation,
    },
};

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;

// Dados de um novo registro no livro-razão
#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub product_id: Uuid,
    pub ean: &'a str,
    pub location: StockLocation,
    pub kind: MovementKind,
    pub quantity_changed: i32,
    pub balance_after: i32,
    pub expiration_date: NaiveDate,
    pub batch: Option<&'a str>,
    pub address: &'a str,
    pub user_id: Option<Uuid>,
    pub user_email: Option<&'a str>,
    pub notes: Option<&'a str>,
}

pub fn effective_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

// Filtros comuns a listagem e agregações (o limite fica de fora)
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &MovementFilter) {
    if let Some(ean) = filter.ean.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND m.ean = ").push_bind(ean.to_string());
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND m.kind = ").push_bind(kind);
    }
    if let Some(location) = filter.location {
        qb.push(" AND m.location = ").push_bind(location);
    }
    if let Some(batch) = filter.batch.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND m.batch = ").push_bind(batch.to_string());
    }
    if let Some(email) = filter.user_email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND m.user_email = ").push_bind(email.to_lowercase());
    }
    if let Some(from) = filter.from {
        qb.push(" AND m.created_at::date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND m.created_at::date <= ").push_bind(to);
    }
}

#[derive(Clone)]
pub struct MovementRepository {
    pool: PgPool,
}

impl MovementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registra uma movimentação no livro-razão (auditoria).
    pub async fn record<'e, E>(&self, executor: E, movement: NewMovement<'_>) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let recorded = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                product_id, ean, location, kind, quantity_changed, balance_after,
                expiration_date, batch, address, user_id, user_email, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(movement.product_id)
        .bind(movement.ean)
        .bind(movement.location)
        .bind(movement.kind)
        .bind(movement.quantity_changed)
        .bind(movement.balance_after)
        .bind(movement.expiration_date)
        .bind(movement.batch)
        .bind(movement.address)
        .bind(movement.user_id)
        .bind(movement.user_email)
        .bind(movement.notes)
        .fetch_one(executor)
        .await?;
        Ok(recorded)
    }

    pub async fn list(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT m.* FROM stock_movements m WHERE TRUE");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY m.created_at DESC LIMIT ")
            .push_bind(effective_limit(filter.limit));

        let movements = qb.build_query_as::<StockMovement>().fetch_all(&self.pool).await?;
        Ok(movements)
    }

    pub async fn totals(&self, filter: &MovementFilter) -> Result<MovementTotals, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                COALESCE(SUM(m.quantity_changed) FILTER (WHERE m.kind = 'ENTRY'), 0)::BIGINT AS entries,
                COALESCE(-SUM(m.quantity_changed) FILTER (WHERE m.kind = 'EXIT'), 0)::BIGINT AS exits
            FROM stock_movements m
            WHERE TRUE"#,
        );
        push_filters(&mut qb, filter);

        let totals = qb.build_query_as::<MovementTotals>().fetch_one(&self.pool).await?;
        Ok(totals)
    }

    pub async fn daily(&self, filter: &MovementFilter) -> Result<Vec<DailyMovement>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                m.created_at::date AS day,
                COALESCE(SUM(m.quantity_changed) FILTER (WHERE m.kind = 'ENTRY'), 0)::BIGINT AS entries,
                COALESCE(-SUM(m.quantity_changed) FILTER (WHERE m.kind = 'EXIT'), 0)::BIGINT AS exits
            FROM stock_movements m
            WHERE TRUE"#,
        );
        push_filters(&mut qb, filter);
        qb.push(" GROUP BY 1 ORDER BY 1 ASC");

        let days = qb.build_query_as::<DailyMovement>().fetch_all(&self.pool).await?;
        Ok(days)
    }

    pub async fn productivity(&self, filter: &MovementFilter) -> Result<Vec<UserProductivity>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                COALESCE(m.user_email, 'desconhecido') AS user_email,
                COUNT(*) FILTER (WHERE m.kind = 'ENTRY') AS entry_count,
                COALESCE(SUM(m.quantity_changed) FILTER (WHERE m.kind = 'ENTRY'), 0)::BIGINT AS entry_quantity,
                COUNT(*) FILTER (WHERE m.kind = 'EXIT') AS exit_count,
                COALESCE(-SUM(m.quantity_changed) FILTER (WHERE m.kind = 'EXIT'), 0)::BIGINT AS exit_quantity
            FROM stock_movements m
            WHERE TRUE"#,
        );
        push_filters(&mut qb, filter);
        qb.push(" GROUP BY 1 ORDER BY 1 ASC");

        let rows = qb.build_query_as::<UserProductivity>().fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_limit_defaults_and_caps() {
        assert_eq!(effective_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(effective_limit(Some(5000)), MAX_LIST_LIMIT);
        assert_eq!(effective_limit(Some(0)), 1);
        assert_eq!(effective_limit(Some(25)), 25);
    }

    #[test]
    fn filters_become_bound_predicates() {
        let filter = MovementFilter {
            ean: Some(" 7891000100103 ".into()),
            kind: Some(MovementKind::Exit),
            from: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT m.* FROM stock_movements m WHERE TRUE");
        push_filters(&mut qb, &filter);

        let sql = qb.sql();
        assert!(sql.contains("m.ean = $1"), "{sql}");
        assert!(sql.contains("m.kind = $2"), "{sql}");
        assert!(sql.contains("m.created_at::date >= $3"), "{sql}");
        assert!(!sql.contains("m.location"), "{sql}");
    }
}
