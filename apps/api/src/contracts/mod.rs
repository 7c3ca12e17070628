//! Contract read endpoints: listings, per-contract detail and PDF download.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::contract::EmployeeContract;
use crate::state::AppState;

#[derive(Debug, Serialize, FromRow)]
pub struct ContractWithStatusRow {
    pub contract_id: i32,
    pub campaign_id: i32,
    pub contract_num_detail: String,
    pub nip: Option<String>,
    pub name: String,
    pub nik: String,
    pub job_description: String,
    pub mobile_number: String,
    pub email: String,
    pub send_status: Option<bool>,
    pub signed_status: Option<bool>,
    pub signed_at: Option<NaiveDateTime>,
    pub send_at: Option<NaiveDateTime>,
}

/// GET /api/contracts
pub async fn handle_list_contracts(
    State(state): State<AppState>,
) -> Result<Json<Vec<EmployeeContract>>, AppError> {
    let contracts: Vec<EmployeeContract> =
        sqlx::query_as("SELECT * FROM contract_pkwt.list_contract")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(contracts))
}

/// GET /api/contracts-with-status — status columns are null until the PDF
/// pipeline has visited the contract.
pub async fn handle_contracts_with_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContractWithStatusRow>>, AppError> {
    let rows: Vec<ContractWithStatusRow> = sqlx::query_as(
        "SELECT
             lc.contract_id, lc.campaign_id, lc.contract_num_detail, lc.nip,
             lc.name, lc.nik, lc.job_description, lc.mobile_number, lc.email,
             cs.send_status, cs.signed_status, cs.signed_at, cs.send_at
         FROM contract_pkwt.list_contract lc
         LEFT JOIN contract_pkwt.contract_status cs ON lc.contract_id = cs.contract_id
         ORDER BY lc.contract_id",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize, FromRow)]
pub struct CampaignContractRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub employee: EmployeeContract,
    pub send_status: Option<bool>,
    pub signed_status: Option<bool>,
    pub signed_at: Option<NaiveDateTime>,
}

/// GET /api/campaigns/:campaign_id/contracts-with-status
pub async fn handle_campaign_contracts_with_status(
    State(state): State<AppState>,
    Path(campaign_id): Path<i32>,
) -> Result<Json<Vec<CampaignContractRow>>, AppError> {
    let rows: Vec<CampaignContractRow> = sqlx::query_as(
        "SELECT lc.*, cs.send_status, cs.signed_status, cs.signed_at
         FROM contract_pkwt.list_contract lc
         LEFT JOIN contract_pkwt.contract_status cs ON lc.contract_id = cs.contract_id
         WHERE lc.campaign_id = $1
         ORDER BY lc.contract_id",
    )
    .bind(campaign_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[derive(Debug, Serialize, FromRow)]
pub struct ContractDetailRow {
    pub contract_id: i32,
    pub campaign_id: i32,
    pub contract_num_detail: String,
    pub name: String,
    pub nip: Option<String>,
    pub job_description: String,
    pub location: String,
    pub email: String,
    pub mobile_number: String,
    pub send_status: Option<bool>,
    pub signed_status: Option<bool>,
    pub signed_at: Option<NaiveDateTime>,
}

/// GET /api/contract/:contract_id
pub async fn handle_contract_detail(
    State(state): State<AppState>,
    Path(contract_id): Path<i32>,
) -> Result<Json<ContractDetailRow>, AppError> {
    let row: Option<ContractDetailRow> = sqlx::query_as(
        "SELECT
             lc.contract_id, lc.campaign_id, lc.contract_num_detail, lc.name,
             lc.nip, lc.job_description, lc.location, lc.email, lc.mobile_number,
             cs.send_status, cs.signed_status, cs.signed_at
         FROM contract_pkwt.list_contract lc
         LEFT JOIN contract_pkwt.contract_status cs ON lc.contract_id = cs.contract_id
         WHERE lc.contract_id = $1",
    )
    .bind(contract_id)
    .fetch_optional(&state.db)
    .await?;
    row.map(Json)
        .ok_or_else(|| AppError::NotFound("Contract not found".to_string()))
}

/// GET /api/contracts/:contract_id/pdf — streams the stored blob.
pub async fn handle_contract_pdf(
    State(state): State<AppState>,
    Path(contract_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let pdf: Option<Vec<u8>> = sqlx::query_scalar(
        "SELECT pdf_data FROM contract_pkwt.contract_status WHERE contract_id = $1",
    )
    .bind(contract_id)
    .fetch_optional(&state.db)
    .await?
    .flatten();

    match pdf {
        Some(pdf) => Ok(([(CONTENT_TYPE, "application/pdf")], Bytes::from(pdf))),
        None => Err(AppError::NotFound(
            "PDF not found. Please regenerate contract status.".to_string(),
        )),
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct UnsignedContractRow {
    pub uid: Uuid,
    pub contract_id: i32,
    pub contract_num_detail: String,
    pub name: String,
    pub nik: String,
    pub nip: Option<String>,
    pub email: String,
    pub job_description: String,
    pub mobile_number: String,
}

/// GET /api/unsigned-active-contracts — portal users who have not signed.
pub async fn handle_unsigned_active_contracts(
    State(state): State<AppState>,
) -> Result<Json<Vec<UnsignedContractRow>>, AppError> {
    let rows: Vec<UnsignedContractRow> = sqlx::query_as(
        "SELECT uc.uid, alc.contract_id, alc.contract_num_detail, alc.name,
                alc.nik, alc.nip, alc.email, alc.job_description, alc.mobile_number
         FROM uid_contracts uc
         JOIN authenticated_list_contract alc ON uc.uid = alc.uid
         WHERE uc.active = TRUE
           AND uc.uid NOT IN (SELECT DISTINCT uid FROM contract_signatures)
         ORDER BY alc.name",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}
