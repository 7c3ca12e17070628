//! Operator dashboard reads: aggregate counters, hourly activity and
//! campaign listings.

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, PgPool};

use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/dashboard-stats
pub async fn handle_dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let target: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contract_pkwt.list_contract")
        .fetch_one(&state.db)
        .await?;
    let sent: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM contract_pkwt.contract_status WHERE send_status = TRUE",
    )
    .fetch_one(&state.db)
    .await?;
    let signed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM contract_pkwt.contract_status WHERE signed_status = TRUE",
    )
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "target": target,
        "sent": sent,
        "signed": signed,
    })))
}

async fn counts_by_hour(db: &PgPool, column: &str) -> Result<[i64; 24], AppError> {
    // `column` is one of two compile-time literals, never user input.
    let sql = format!(
        "SELECT CAST(EXTRACT(HOUR FROM {column}) AS INTEGER) AS hour, COUNT(*) AS count
         FROM contract_pkwt.contract_status
         WHERE {column} IS NOT NULL
         GROUP BY 1
         ORDER BY 1"
    );
    let rows: Vec<(i32, i64)> = sqlx::query_as(&sql).fetch_all(db).await?;

    let mut buckets = [0i64; 24];
    for (hour, count) in rows {
        if (0..24).contains(&hour) {
            buckets[hour as usize] = count;
        }
    }
    Ok(buckets)
}

/// GET /api/analytics/hourly — 24 fixed buckets, zero-filled.
pub async fn handle_hourly_analytics(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let emails_sent = counts_by_hour(&state.db, "send_at").await?;
    let contracts_signed = counts_by_hour(&state.db, "signed_at").await?;

    Ok(Json(json!({
        "hours": (0..24).collect::<Vec<i32>>(),
        "emails_sent": emails_sent.to_vec(),
        "contracts_signed": contracts_signed.to_vec(),
    })))
}

#[derive(Debug, Serialize, FromRow)]
pub struct CampaignListRow {
    pub campaign_id: i32,
    pub company: String,
    pub created_at: NaiveDate,
    pub send_at: NaiveDate,
    pub due_date: NaiveDate,
    pub total_contracts: i64,
    pub sent_count: i64,
}

/// GET /api/campaigns-list
pub async fn handle_campaigns_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<CampaignListRow>>, AppError> {
    let rows: Vec<CampaignListRow> = sqlx::query_as(
        "SELECT
             c.campaign_id, c.company, c.created_at, c.send_at, c.due_date,
             COUNT(lc.contract_id) AS total_contracts,
             COUNT(CASE WHEN cs.send_status = TRUE THEN 1 END) AS sent_count
         FROM contract_pkwt.campaign c
         LEFT JOIN contract_pkwt.list_contract lc ON c.campaign_id = lc.campaign_id
         LEFT JOIN contract_pkwt.contract_status cs ON lc.contract_id = cs.contract_id
         GROUP BY c.campaign_id, c.company, c.created_at, c.send_at, c.due_date
         ORDER BY c.created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize, FromRow)]
pub struct CampaignStatsRow {
    pub campaign_id: i32,
    pub company: String,
    pub created_at: NaiveDate,
    pub send_at: NaiveDate,
    pub due_date: NaiveDate,
    pub pdf_total: i32,
    pub pdf_generated: i32,
    pub pdf_status: String,
    pub total_contracts: i64,
    pub sent_count: i64,
    pub signed_count: i64,
}

/// GET /api/campaigns-with-stats — campaign listing plus PDF progress, the
/// dashboard's generation poll target.
pub async fn handle_campaigns_with_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<CampaignStatsRow>>, AppError> {
    let rows: Vec<CampaignStatsRow> = sqlx::query_as(
        "SELECT
             c.campaign_id, c.company, c.created_at, c.send_at, c.due_date,
             c.pdf_total, c.pdf_generated, c.pdf_status,
             COUNT(lc.contract_id) AS total_contracts,
             COUNT(CASE WHEN cs.send_status = TRUE THEN 1 END) AS sent_count,
             COUNT(CASE WHEN cs.signed_status = TRUE THEN 1 END) AS signed_count
         FROM contract_pkwt.campaign c
         LEFT JOIN contract_pkwt.list_contract lc ON c.campaign_id = lc.campaign_id
         LEFT JOIN contract_pkwt.contract_status cs ON lc.contract_id = cs.contract_id
         GROUP BY c.campaign_id, c.company, c.created_at, c.send_at, c.due_date,
                  c.pdf_total, c.pdf_generated, c.pdf_status
         ORDER BY c.created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CompanySearchQuery {
    pub q: String,
}

/// GET /api/companies/search?q=
pub async fn handle_company_search(
    State(state): State<AppState>,
    Query(query): Query<CompanySearchQuery>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let companies: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT company
         FROM contract_pkwt.campaign
         WHERE company ILIKE $1
         ORDER BY company
         LIMIT 10",
    )
    .bind(format!("%{}%", query.q))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(
        companies
            .into_iter()
            .map(|(company,)| json!({ "company": company }))
            .collect(),
    ))
}

/// GET /api/test-db — database connectivity check.
pub async fn handle_test_db(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&state.db).await?;
    Ok(Json(json!({ "status": "success", "result": result })))
}
