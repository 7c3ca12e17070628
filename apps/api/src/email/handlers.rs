//! Email endpoints: preview, single send, bulk send, reminders.

use axum::extract::State;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::state::AppState;

use super::body::{registration_hash, reminder_email, welcome_email, EmailBody, WelcomeEmailInput};
use super::{Mailer, OutboundEmail};

#[derive(Debug, Clone, FromRow)]
pub struct EmailContactRow {
    name: String,
    birthplace: String,
    birthdate: Option<chrono::NaiveDate>,
    nik: String,
    location: String,
    job_description: String,
    email: String,
    contract_num_detail: String,
    contract_num_detail_md5: Option<String>,
}

/// Contact lookup and send-state writes behind a seam, so the send loops
/// are testable without Postgres (same pattern as the pipeline store).
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn load_contact(&self, contract_id: i32) -> Result<Option<EmailContactRow>, sqlx::Error>;
    async fn mark_sent(&self, contract_id: i32) -> Result<(), sqlx::Error>;
}

pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn load_contact(&self, contract_id: i32) -> Result<Option<EmailContactRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT name, birthplace, birthdate, nik, location, job_description,
                    email, contract_num_detail, contract_num_detail_md5
             FROM contract_pkwt.list_contract
             WHERE contract_id = $1",
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_sent(&self, contract_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE contract_pkwt.contract_status
             SET send_status = TRUE, send_at = CURRENT_TIMESTAMP
             WHERE contract_id = $1",
        )
        .bind(contract_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

async fn load_contact_required(
    store: &dyn ContactStore,
    contract_id: i32,
) -> Result<EmailContactRow, AppError> {
    store
        .load_contact(contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {contract_id} not found")))
}

fn compose_welcome(row: &EmailContactRow, base_url: &str) -> EmailBody {
    // Imports before the hash column existed fall back to a computed hash.
    let hash = row
        .contract_num_detail_md5
        .clone()
        .unwrap_or_else(|| registration_hash(&row.contract_num_detail));
    welcome_email(
        &WelcomeEmailInput {
            name: row.name.clone(),
            birthplace: row.birthplace.clone(),
            birthdate: row.birthdate,
            nik: row.nik.clone(),
            location: row.location.clone(),
            job_description: row.job_description.clone(),
            registration_hash: hash,
        },
        base_url,
    )
}

/// Sends the welcome email for one contract and marks it sent.
async fn send_one(
    store: &dyn ContactStore,
    mailer: &dyn Mailer,
    base_url: &str,
    contract_id: i32,
) -> Result<(), AppError> {
    let row = load_contact_required(store, contract_id).await?;
    if row.email.is_empty() {
        return Err(AppError::NotFound(format!(
            "Employee email not found for contract {contract_id}"
        )));
    }

    let body = compose_welcome(&row, base_url);
    mailer
        .send(&OutboundEmail {
            to: row.email,
            subject: body.subject,
            html_body: body.html,
            text_body: body.text,
        })
        .await
        .map_err(|e| AppError::Delivery(e.to_string()))?;

    store.mark_sent(contract_id).await?;

    info!("contract {contract_id}: welcome email sent");
    Ok(())
}

/// Iterates the id list independently; one contract's failure never stops
/// the batch.
async fn bulk_send(
    store: &dyn ContactStore,
    mailer: &dyn Mailer,
    base_url: &str,
    contract_ids: &[i32],
) -> serde_json::Value {
    let mut success = Vec::new();
    let mut failed = Vec::new();

    for &contract_id in contract_ids {
        match send_one(store, mailer, base_url, contract_id).await {
            Ok(()) => success.push(contract_id),
            Err(err) => {
                warn!("contract {contract_id}: bulk email failed: {err}");
                failed.push(json!({
                    "contract_id": contract_id,
                    "error": err.to_string(),
                }));
            }
        }
    }

    json!({
        "success": success,
        "failed": failed,
        "total": contract_ids.len(),
        "success_count": success.len(),
        "failed_count": failed.len(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ContractIdForm {
    pub contract_id: i32,
}

/// POST /api/email-preview
pub async fn handle_email_preview(
    State(state): State<AppState>,
    Form(form): Form<ContractIdForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = PgContactStore::new(state.db.clone());
    let row = load_contact_required(&store, form.contract_id).await?;
    let body = compose_welcome(&row, &state.config.public_base_url);
    Ok(Json(json!({
        "email_body": body.html,
        "recipient": row.email,
    })))
}

/// POST /api/send-email
pub async fn handle_send_email(
    State(state): State<AppState>,
    Form(form): Form<ContractIdForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = PgContactStore::new(state.db.clone());
    send_one(
        &store,
        state.mailer.as_ref(),
        &state.config.public_base_url,
        form.contract_id,
    )
    .await?;
    Ok(Json(json!({
        "message": "Email sent successfully!",
        "contract_id": form.contract_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct BulkEmailRequest {
    pub contract_ids: Vec<i32>,
    #[allow(dead_code)]
    pub mode: Option<String>,
    #[allow(dead_code)]
    pub campaign_id: Option<i32>,
}

/// POST /api/bulk-send-email — best effort, per-contract errors collected.
pub async fn handle_bulk_send_email(
    State(state): State<AppState>,
    Json(request): Json<BulkEmailRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = PgContactStore::new(state.db.clone());
    let report = bulk_send(
        &store,
        state.mailer.as_ref(),
        &state.config.public_base_url,
        &request.contract_ids,
    )
    .await;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    pub uids: Vec<Uuid>,
    pub names: Vec<String>,
}

/// POST /api/send-reminders — signing-day nudges for selected portal users.
pub async fn handle_send_reminders(
    State(state): State<AppState>,
    Json(request): Json<ReminderRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut success_count = 0u32;
    let mut failed_count = 0u32;

    for (uid, name) in request.uids.iter().zip(request.names.iter()) {
        let lookup: Option<(Option<String>, String)> = sqlx::query_as(
            "SELECT contract_num_detail_md5, email
             FROM authenticated_list_contract
             WHERE uid = $1
             LIMIT 1",
        )
        .bind(uid)
        .fetch_optional(&state.db)
        .await?;

        let (hash, email) = match lookup {
            Some((Some(hash), email)) if !email.is_empty() => (hash, email),
            _ => {
                warn!("reminder skipped for {name}: no contract hash or email for uid {uid}");
                failed_count += 1;
                continue;
            }
        };

        let body = reminder_email(name, &hash, &state.config.public_base_url);
        match state
            .mailer
            .send(&OutboundEmail {
                to: email,
                subject: body.subject,
                html_body: body.html,
                text_body: body.text,
            })
            .await
        {
            Ok(()) => success_count += 1,
            Err(err) => {
                warn!("reminder failed for {name}: {err}");
                failed_count += 1;
            }
        }
    }

    Ok(Json(json!({
        "success_count": success_count,
        "failed_count": failed_count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::MailError;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Rejects recipients carrying a poison marker, like a provider
    /// bouncing specific addresses.
    struct BouncyMailer;

    #[async_trait]
    impl Mailer for BouncyMailer {
        async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
            if email.to.contains("bounce") {
                Err(MailError::Rejected {
                    status: 422,
                    message: "inactive recipient".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct MemContacts {
        contacts: BTreeMap<i32, EmailContactRow>,
        sent: Mutex<Vec<i32>>,
    }

    impl MemContacts {
        fn new(contacts: Vec<(i32, EmailContactRow)>) -> Self {
            Self {
                contacts: contacts.into_iter().collect(),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContactStore for MemContacts {
        async fn load_contact(
            &self,
            contract_id: i32,
        ) -> Result<Option<EmailContactRow>, sqlx::Error> {
            Ok(self.contacts.get(&contract_id).cloned())
        }

        async fn mark_sent(&self, contract_id: i32) -> Result<(), sqlx::Error> {
            self.sent.lock().unwrap().push(contract_id);
            Ok(())
        }
    }

    fn contact(email: &str) -> EmailContactRow {
        EmailContactRow {
            name: "Budi Santoso".to_string(),
            birthplace: "Bekasi".to_string(),
            birthdate: chrono::NaiveDate::from_ymd_opt(1999, 5, 2),
            nik: "3216051234560001".to_string(),
            location: "Cibitung".to_string(),
            job_description: "Operator Produksi".to_string(),
            email: email.to_string(),
            contract_num_detail: "001/PKWT/2025".to_string(),
            contract_num_detail_md5: None,
        }
    }

    const BASE_URL: &str = "https://pkwt.example.com";

    #[tokio::test]
    async fn test_bulk_send_isolates_rejections_and_marks_only_successes() {
        let store = MemContacts::new(vec![
            (1, contact("a@example.com")),
            (2, contact("bounce1@example.com")),
            (3, contact("b@example.com")),
            (4, contact("bounce2@example.com")),
            (5, contact("c@example.com")),
        ]);

        let report = bulk_send(&store, &BouncyMailer, BASE_URL, &[1, 2, 3, 4, 5]).await;

        assert_eq!(report["success_count"], 3);
        assert_eq!(report["failed_count"], 2);
        assert_eq!(report["total"], 5);
        assert_eq!(report["success"], json!([1, 3, 5]));
        assert_eq!(*store.sent.lock().unwrap(), vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_bulk_send_reports_missing_contact_without_stopping() {
        let store = MemContacts::new(vec![(1, contact("a@example.com"))]);

        let report = bulk_send(&store, &BouncyMailer, BASE_URL, &[99, 1]).await;

        assert_eq!(report["success_count"], 1);
        assert_eq!(report["failed_count"], 1);
        assert!(report["failed"][0]["error"]
            .as_str()
            .unwrap()
            .contains("not found"));
        assert_eq!(*store.sent.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_send_one_does_not_mark_sent_on_rejection() {
        let store = MemContacts::new(vec![(1, contact("bounce@example.com"))]);

        let err = send_one(&store, &BouncyMailer, BASE_URL, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Delivery(_)));
        assert!(store.sent.lock().unwrap().is_empty());
    }
}
