//! Campaign HTTP handlers.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::email::body::registration_hash;
use crate::errors::AppError;
use crate::models::campaign::Campaign;
use crate::models::contract::EmployeeContract;
use crate::pipeline;
use crate::state::AppState;

use super::roster::{parse_roster, RosterRow};

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub company: String,
    pub send_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// POST /api/campaigns
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.company.trim().is_empty() {
        return Err(AppError::Validation("company must not be empty".to_string()));
    }

    let campaign_id: i32 = sqlx::query_scalar(
        "INSERT INTO contract_pkwt.campaign (company, created_at, send_at, due_date)
         VALUES ($1, CURRENT_DATE, $2, $3)
         RETURNING campaign_id",
    )
    .bind(request.company.trim())
    .bind(request.send_date)
    .bind(request.due_date)
    .fetch_one(&state.db)
    .await?;

    info!("campaign {campaign_id} created for {}", request.company.trim());

    Ok(Json(json!({
        "campaign_id": campaign_id,
        "message": "Campaign created successfully",
    })))
}

/// GET /api/campaigns/:campaign_id
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<i32>,
) -> Result<Json<Campaign>, AppError> {
    let campaign: Option<Campaign> =
        sqlx::query_as("SELECT * FROM contract_pkwt.campaign WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_optional(&state.db)
            .await?;
    campaign
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Campaign {campaign_id} not found")))
}

/// GET /api/campaigns/:campaign_id/contracts
pub async fn get_campaign_contracts(
    State(state): State<AppState>,
    Path(campaign_id): Path<i32>,
) -> Result<Json<Vec<EmployeeContract>>, AppError> {
    let contracts: Vec<EmployeeContract> =
        sqlx::query_as("SELECT * FROM contract_pkwt.list_contract WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(contracts))
}

/// DELETE /api/campaigns/:campaign_id/contracts
pub async fn delete_campaign_contracts(
    State(state): State<AppState>,
    Path(campaign_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = sqlx::query("DELETE FROM contract_pkwt.list_contract WHERE campaign_id = $1")
        .bind(campaign_id)
        .execute(&state.db)
        .await?;
    Ok(Json(json!({
        "message": format!("Deleted {} contracts", result.rows_affected()),
    })))
}

/// GET /api/campaigns/:campaign_id/contract-template
pub async fn get_contract_template(
    State(state): State<AppState>,
    Path(campaign_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let html: Option<String> =
        sqlx::query_scalar("SELECT html_page FROM contract_pkwt.contract WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_optional(&state.db)
            .await?;
    match html {
        Some(html_page) => Ok(Json(json!({ "html_page": html_page }))),
        None => Err(AppError::NotFound(
            "Contract template not found".to_string(),
        )),
    }
}

async fn campaign_exists(db: &PgPool, campaign_id: i32) -> Result<bool, AppError> {
    let found: Option<i32> =
        sqlx::query_scalar("SELECT campaign_id FROM contract_pkwt.campaign WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_optional(db)
            .await?;
    Ok(found.is_some())
}

/// Pulls a file field plus a `campaign_id` field out of a multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>, i32), AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut campaign_id: Option<i32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                file = Some((filename, data.to_vec()));
            }
            Some("campaign_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                campaign_id = Some(text.trim().parse().map_err(|_| {
                    AppError::Validation("campaign_id must be an integer".to_string())
                })?);
            }
            _ => {}
        }
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::Validation("Missing file".to_string()))?;
    let campaign_id =
        campaign_id.ok_or_else(|| AppError::Validation("Missing campaign_id".to_string()))?;
    Ok((filename, data, campaign_id))
}

/// POST /api/campaigns/upload-employees
pub async fn upload_employees(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let (filename, data, campaign_id) = read_upload(&mut multipart).await?;

    if !campaign_exists(&state.db, campaign_id).await? {
        return Err(AppError::Validation(format!(
            "Campaign with ID {campaign_id} not found"
        )));
    }

    let parsed = parse_roster(&data, &filename)?;
    for skip in &parsed.skipped {
        warn!(
            "campaign {campaign_id}: skipped roster row {}: {}",
            skip.row_number, skip.reason
        );
    }

    let mut processed_count = 0u32;
    let mut skipped_count = parsed.skipped.len() as u32;
    for row in &parsed.rows {
        match insert_roster_row(&state.db, campaign_id, row).await {
            Ok(()) => processed_count += 1,
            Err(err) => {
                skipped_count += 1;
                warn!(
                    "campaign {campaign_id}: skipped roster row {} ({}): {err}",
                    row.contract_num_detail, row.name
                );
            }
        }
    }

    info!(
        "campaign {campaign_id}: imported {processed_count}/{} employees",
        parsed.rows.len()
    );

    Ok(Json(json!({
        "message": "Employee data uploaded successfully",
        "processed_count": processed_count,
        "skipped_count": skipped_count,
    })))
}

async fn insert_roster_row(db: &PgPool, campaign_id: i32, row: &RosterRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO contract_pkwt.list_contract (
             campaign_id, contract_num_detail, nip, name, job_description, location,
             birthplace, birthdate, marriage_status, gender, address, nik,
             tax_status, npwp, mobile_number, email, mothers_name, bank_account,
             gt, job_position, contract_num_detail_md5
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                   $15, $16, $17, $18, $19, $20, $21)",
    )
    .bind(campaign_id)
    .bind(&row.contract_num_detail)
    .bind(&row.nip)
    .bind(&row.name)
    .bind(&row.job_description)
    .bind(&row.location)
    .bind(&row.birthplace)
    .bind(row.birthdate)
    .bind(&row.marriage_status)
    .bind(&row.gender)
    .bind(&row.address)
    .bind(&row.nik)
    .bind(&row.tax_status)
    .bind(&row.npwp)
    .bind(&row.mobile_number)
    .bind(&row.email)
    .bind(&row.mothers_name)
    .bind(&row.bank_account)
    .bind(row.gt)
    .bind(&row.job_position)
    .bind(registration_hash(&row.contract_num_detail))
    .execute(db)
    .await?;
    Ok(())
}

/// POST /api/campaigns/upload-contract — stores the HTML template and kicks
/// off PDF generation in the background.
pub async fn upload_contract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let (_, data, campaign_id) = read_upload(&mut multipart).await?;

    if !campaign_exists(&state.db, campaign_id).await? {
        return Err(AppError::Validation(format!(
            "Campaign with ID {campaign_id} not found"
        )));
    }

    let employee_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM contract_pkwt.list_contract WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_one(&state.db)
            .await?;
    if employee_count == 0 {
        return Err(AppError::Validation(
            "No employees found for this campaign".to_string(),
        ));
    }

    let html = String::from_utf8_lossy(&data).into_owned();

    sqlx::query(
        "INSERT INTO contract_pkwt.contract (base_contract_id, campaign_id, html_page)
         VALUES ($1, $1, $2)",
    )
    .bind(campaign_id)
    .bind(&html)
    .execute(&state.db)
    .await?;

    let db = state.db.clone();
    let renderer = state.renderer.clone();
    tokio::spawn(async move {
        if let Err(err) = pipeline::generate(&db, renderer.as_ref(), campaign_id).await {
            error!("campaign {campaign_id}: background PDF generation failed: {err}");
        }
    });

    Ok(Json(json!({
        "message": "Contract template uploaded successfully. PDFs are being generated in the background.",
        "campaign_id": campaign_id,
    })))
}

/// POST /api/campaigns/:campaign_id/populate-status — synchronous
/// (re-)generation of PDFs and status rows for every employee.
pub async fn populate_status(
    State(state): State<AppState>,
    Path(campaign_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !campaign_exists(&state.db, campaign_id).await? {
        return Err(AppError::NotFound("Campaign not found".to_string()));
    }

    let summary = pipeline::generate(&state.db, state.renderer.as_ref(), campaign_id).await?;

    Ok(Json(json!({
        "message": "Contract status populated successfully",
        "inserted_count": summary.inserted_count,
        "pdf_generated_count": summary.pdf_generated_count,
        "total_contracts": summary.total_contracts,
    })))
}
