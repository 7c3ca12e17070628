//! Campaign PDF Pipeline — walks every employee in a campaign through
//! substitution and rendering, persisting PDFs and progress as it goes.
//!
//! Failure model: a render failure for one employee is logged and skipped
//! (best-effort batch); only batch-wide infrastructure failures abort, in
//! which case the campaign is marked `failed`. There is no automatic retry;
//! operators re-trigger the whole pipeline, which re-renders existing
//! contracts and overwrites their blobs.

pub mod substitute;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::campaign::PdfStatus;
use crate::models::contract::EmployeeContract;
use crate::render::PdfRenderer;
use substitute::render_contract_html;

/// Storage operations the batch performs. Handlers pass the Postgres-backed
/// implementation; tests swap in an in-memory one, the same seam pattern as
/// `PdfRenderer`.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn load_template(&self, campaign_id: i32) -> Result<Option<String>, sqlx::Error>;
    async fn load_employees(&self, campaign_id: i32) -> Result<Vec<EmployeeContract>, sqlx::Error>;
    /// Sets `pdf_total`, resets `pdf_generated` and moves the campaign to
    /// `processing` in one write, visible to progress pollers before any
    /// PDF work begins.
    async fn begin_batch(&self, campaign_id: i32, total: i32) -> Result<(), sqlx::Error>;
    async fn set_status(&self, campaign_id: i32, status: PdfStatus) -> Result<(), sqlx::Error>;
    /// Insert-if-absent status row; returns true when a new row was created.
    async fn ensure_status_row(&self, campaign_id: i32, contract_id: i32)
        -> Result<bool, sqlx::Error>;
    async fn store_pdf(&self, contract_id: i32, pdf: &[u8]) -> Result<(), sqlx::Error>;
    async fn set_generated(&self, campaign_id: i32, generated: i32) -> Result<(), sqlx::Error>;
}

pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineStore for PgPipelineStore {
    async fn load_template(&self, campaign_id: i32) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT html_page FROM contract_pkwt.contract WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn load_employees(&self, campaign_id: i32) -> Result<Vec<EmployeeContract>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM contract_pkwt.list_contract WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn begin_batch(&self, campaign_id: i32, total: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE contract_pkwt.campaign
             SET pdf_total = $1, pdf_generated = 0, pdf_status = $2
             WHERE campaign_id = $3",
        )
        .bind(total)
        .bind(PdfStatus::Processing.as_str())
        .bind(campaign_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(&self, campaign_id: i32, status: PdfStatus) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE contract_pkwt.campaign SET pdf_status = $1 WHERE campaign_id = $2")
            .bind(status.as_str())
            .bind(campaign_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ensure_status_row(
        &self,
        campaign_id: i32,
        contract_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO contract_pkwt.contract_status
                 (campaign_id, contract_id, send_status, signed_status)
             VALUES ($1, $2, FALSE, FALSE)
             ON CONFLICT (contract_id) DO NOTHING",
        )
        .bind(campaign_id)
        .bind(contract_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn store_pdf(&self, contract_id: i32, pdf: &[u8]) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE contract_pkwt.contract_status SET pdf_data = $1 WHERE contract_id = $2")
            .bind(pdf)
            .bind(contract_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_generated(&self, campaign_id: i32, generated: i32) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE contract_pkwt.campaign SET pdf_generated = $1 WHERE campaign_id = $2")
            .bind(generated)
            .bind(campaign_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub inserted_count: u32,
    pub pdf_generated_count: u32,
    pub total_contracts: usize,
}

/// Generates PDFs for every contract in a campaign.
pub async fn generate(
    db: &PgPool,
    renderer: &dyn PdfRenderer,
    campaign_id: i32,
) -> Result<GenerationSummary, AppError> {
    let store = PgPipelineStore::new(db.clone());
    generate_with(&store, renderer, campaign_id).await
}

/// Pipeline body behind the storage seam.
///
/// Fails with NotFound before touching any campaign state when the template
/// is missing or the roster is empty. Otherwise sets
/// `pdf_total`/`pdf_generated`/`pdf_status` so progress pollers see the
/// batch start before the first render.
pub async fn generate_with(
    store: &dyn PipelineStore,
    renderer: &dyn PdfRenderer,
    campaign_id: i32,
) -> Result<GenerationSummary, AppError> {
    let template = store.load_template(campaign_id).await?.ok_or_else(|| {
        AppError::NotFound(format!(
            "Contract template not found for campaign {campaign_id}"
        ))
    })?;

    let employees = store.load_employees(campaign_id).await?;
    if employees.is_empty() {
        return Err(AppError::NotFound(format!(
            "No contracts found for campaign {campaign_id}"
        )));
    }

    store.begin_batch(campaign_id, employees.len() as i32).await?;

    match run_batch(store, renderer, campaign_id, &template, &employees).await {
        Ok(summary) => {
            store.set_status(campaign_id, PdfStatus::Completed).await?;
            info!(
                "campaign {campaign_id}: generated {}/{} PDFs",
                summary.pdf_generated_count, summary.total_contracts
            );
            Ok(summary)
        }
        Err(err) => {
            error!("campaign {campaign_id}: PDF batch aborted: {err}");
            // Best effort: the store itself may be what failed.
            if let Err(mark_err) = store.set_status(campaign_id, PdfStatus::Failed).await {
                error!("campaign {campaign_id}: could not mark campaign failed: {mark_err}");
            }
            Err(err.into())
        }
    }
}

/// Sequential per-employee loop. Row writes commit independently, so
/// progress is observable mid-batch.
async fn run_batch(
    store: &dyn PipelineStore,
    renderer: &dyn PdfRenderer,
    campaign_id: i32,
    template: &str,
    employees: &[EmployeeContract],
) -> Result<GenerationSummary, sqlx::Error> {
    let mut inserted_count = 0u32;
    let mut pdf_generated_count = 0u32;

    for employee in employees {
        // Insert-if-absent: an existing row is still visited, and the PDF is
        // re-rendered and overwritten.
        if store.ensure_status_row(campaign_id, employee.contract_id).await? {
            inserted_count += 1;
        }

        let pdf = match render_employee(renderer, template, employee).await {
            Ok(pdf) => pdf,
            Err(err) => {
                warn!(
                    "campaign {campaign_id}: render failed for contract {} ({}): {err}",
                    employee.contract_id, employee.contract_num_detail
                );
                continue;
            }
        };

        store.store_pdf(employee.contract_id, &pdf).await?;

        pdf_generated_count += 1;
        store.set_generated(campaign_id, pdf_generated_count as i32).await?;
    }

    Ok(GenerationSummary {
        inserted_count,
        pdf_generated_count,
        total_contracts: employees.len(),
    })
}

async fn render_employee(
    renderer: &dyn PdfRenderer,
    template: &str,
    employee: &EmployeeContract,
) -> Result<Vec<u8>, crate::render::RenderError> {
    let html = render_contract_html(template, employee);
    renderer.render_html(&html).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Fails any document whose HTML carries a poison marker.
    struct FlakyRenderer;

    #[async_trait]
    impl PdfRenderer for FlakyRenderer {
        async fn render_html(&self, html: &str) -> Result<Vec<u8>, RenderError> {
            if html.contains("BROKEN") {
                Err(RenderError::Browser("render crashed".to_string()))
            } else {
                Ok(b"%PDF-1.4 fake".to_vec())
            }
        }
    }

    #[derive(Default)]
    struct MemState {
        template: Option<String>,
        employees: Vec<EmployeeContract>,
        pdf_total: i32,
        pdf_generated: i32,
        pdf_status: String,
        status_rows: BTreeMap<i32, Option<Vec<u8>>>,
    }

    /// In-memory single-campaign store.
    struct MemStore(Mutex<MemState>);

    impl MemStore {
        fn new(template: Option<&str>, employees: Vec<EmployeeContract>) -> Self {
            MemStore(Mutex::new(MemState {
                template: template.map(str::to_string),
                employees,
                pdf_status: "pending".to_string(),
                ..MemState::default()
            }))
        }
    }

    #[async_trait]
    impl PipelineStore for MemStore {
        async fn load_template(&self, _campaign_id: i32) -> Result<Option<String>, sqlx::Error> {
            Ok(self.0.lock().unwrap().template.clone())
        }

        async fn load_employees(
            &self,
            _campaign_id: i32,
        ) -> Result<Vec<EmployeeContract>, sqlx::Error> {
            Ok(self.0.lock().unwrap().employees.clone())
        }

        async fn begin_batch(&self, _campaign_id: i32, total: i32) -> Result<(), sqlx::Error> {
            let mut state = self.0.lock().unwrap();
            state.pdf_total = total;
            state.pdf_generated = 0;
            state.pdf_status = "processing".to_string();
            Ok(())
        }

        async fn set_status(
            &self,
            _campaign_id: i32,
            status: PdfStatus,
        ) -> Result<(), sqlx::Error> {
            self.0.lock().unwrap().pdf_status = status.as_str().to_string();
            Ok(())
        }

        async fn ensure_status_row(
            &self,
            _campaign_id: i32,
            contract_id: i32,
        ) -> Result<bool, sqlx::Error> {
            let mut state = self.0.lock().unwrap();
            if state.status_rows.contains_key(&contract_id) {
                Ok(false)
            } else {
                state.status_rows.insert(contract_id, None);
                Ok(true)
            }
        }

        async fn store_pdf(&self, contract_id: i32, pdf: &[u8]) -> Result<(), sqlx::Error> {
            self.0
                .lock()
                .unwrap()
                .status_rows
                .insert(contract_id, Some(pdf.to_vec()));
            Ok(())
        }

        async fn set_generated(&self, _campaign_id: i32, generated: i32) -> Result<(), sqlx::Error> {
            self.0.lock().unwrap().pdf_generated = generated;
            Ok(())
        }
    }

    fn employee(id: i32, name: &str) -> EmployeeContract {
        EmployeeContract {
            contract_id: id,
            campaign_id: 1,
            contract_num_detail: format!("{id:03}/PKWT/2025"),
            nip: Some(format!("NIP{id}")),
            name: name.to_string(),
            job_description: "Operator".to_string(),
            location: "Cikarang".to_string(),
            birthplace: "Bandung".to_string(),
            birthdate: NaiveDate::from_ymd_opt(2000, 1, 15),
            marriage_status: "K/1".to_string(),
            gender: "P".to_string(),
            address: "Jl. Anggrek No. 9".to_string(),
            nik: "3204012345678901".to_string(),
            tax_status: "K1".to_string(),
            npwp: "-".to_string(),
            mobile_number: "0811111111".to_string(),
            email: "x@example.com".to_string(),
            mothers_name: "Ibu".to_string(),
            bank_account: "987654".to_string(),
            gt: 4_900_000,
            job_position: "Produksi".to_string(),
            contract_num_detail_md5: None,
        }
    }

    const TEMPLATE: &str = "<title>t</title><p>{name}</p>";

    #[tokio::test]
    async fn test_missing_template_is_not_found() {
        let store = MemStore::new(None, vec![employee(1, "Ani")]);
        let err = generate_with(&store, &FlakyRenderer, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.0.lock().unwrap().pdf_status, "pending");
    }

    #[tokio::test]
    async fn test_empty_roster_is_not_found_and_status_untouched() {
        let store = MemStore::new(Some(TEMPLATE), vec![]);
        let err = generate_with(&store, &FlakyRenderer, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let state = store.0.lock().unwrap();
        assert_eq!(state.pdf_status, "pending");
        assert_eq!(state.pdf_total, 0);
        assert!(state.status_rows.is_empty());
    }

    #[tokio::test]
    async fn test_one_failed_render_completes_with_partial_blobs() {
        let store = MemStore::new(
            Some(TEMPLATE),
            vec![employee(1, "Ani"), employee(2, "BROKEN"), employee(3, "Citra")],
        );

        let summary = generate_with(&store, &FlakyRenderer, 1).await.unwrap();
        assert_eq!(summary.inserted_count, 3);
        assert_eq!(summary.pdf_generated_count, 2);
        assert_eq!(summary.total_contracts, 3);

        let state = store.0.lock().unwrap();
        assert_eq!(state.pdf_status, "completed");
        assert_eq!(state.pdf_total, 3);
        assert_eq!(state.pdf_generated, 2);
        assert_eq!(state.status_rows.len(), 3);
        let missing: Vec<i32> = state
            .status_rows
            .iter()
            .filter(|(_, pdf)| pdf.is_none())
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(missing, vec![2]);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_without_reinserting() {
        let store = MemStore::new(
            Some(TEMPLATE),
            vec![employee(1, "Ani"), employee(2, "BROKEN"), employee(3, "Citra")],
        );

        let first = generate_with(&store, &FlakyRenderer, 1).await.unwrap();
        assert_eq!(first.inserted_count, 3);

        let second = generate_with(&store, &FlakyRenderer, 1).await.unwrap();
        assert_eq!(second.inserted_count, 0);
        assert_eq!(second.pdf_generated_count, 2);

        let state = store.0.lock().unwrap();
        assert_eq!(state.pdf_status, "completed");
        assert_eq!(state.pdf_generated, 2);
        assert_eq!(state.status_rows.len(), 3);
    }
}
