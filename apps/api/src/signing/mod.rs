//! Signature application endpoint: takes an uploaded signature asset plus a
//! contract id, stamps the stored PDF and flips the signed flags.

pub mod overlay;

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::NaiveDateTime;
use serde_json::json;
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;
use overlay::{overlay_signature, OverlayError};

/// POST /api/sign-contract (multipart: `signature` file, `contract_id` field).
pub async fn handle_sign_contract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut signature: Option<(String, Vec<u8>)> = None;
    let mut contract_id: Option<i32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("signature") => {
                let filename = field.file_name().unwrap_or("signature.png").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                signature = Some((filename, data.to_vec()));
            }
            Some("contract_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                contract_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::Validation("contract_id must be an integer".to_string()))?,
                );
            }
            _ => {}
        }
    }

    let (filename, asset) =
        signature.ok_or_else(|| AppError::Validation("Missing signature file".to_string()))?;
    let contract_id =
        contract_id.ok_or_else(|| AppError::Validation("Missing contract_id".to_string()))?;
    if asset.is_empty() {
        return Err(AppError::Validation("Signature file is empty".to_string()));
    }

    let pdf: Option<Vec<u8>> = sqlx::query_scalar(
        "SELECT pdf_data FROM contract_pkwt.contract_status WHERE contract_id = $1",
    )
    .bind(contract_id)
    .fetch_optional(&state.db)
    .await?
    .flatten();
    let pdf = pdf.ok_or_else(|| {
        AppError::NotFound(format!("PDF not found for contract {contract_id}"))
    })?;

    let is_svg = filename.to_lowercase().ends_with(".svg");
    let signed_pdf = overlay_signature(&pdf, &asset, is_svg).map_err(|e| match e {
        OverlayError::MarkersNotFound => AppError::NotFound(e.to_string()),
        OverlayError::Asset(msg) => AppError::Validation(msg),
        OverlayError::Pdf(msg) => AppError::Render(msg),
    })?;

    let signed_at: NaiveDateTime = sqlx::query_scalar(
        "UPDATE contract_pkwt.contract_status
         SET pdf_data = $1, signed_status = TRUE, signed_at = CURRENT_TIMESTAMP
         WHERE contract_id = $2
         RETURNING signed_at",
    )
    .bind(&signed_pdf)
    .bind(contract_id)
    .fetch_one(&state.db)
    .await?;

    info!("contract {contract_id}: signature applied ({} bytes)", signed_pdf.len());

    Ok(Json(json!({
        "message": "Contract signed successfully",
        "contract_id": contract_id,
        "signed_at": signed_at,
    })))
}
