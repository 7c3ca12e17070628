#![allow(dead_code)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Campaign PDF-generation lifecycle. Transitions are
/// pending → processing → completed | failed; terminal once
/// completed/failed. Only the pipeline writes this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PdfStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfStatus::Pending => "pending",
            PdfStatus::Processing => "processing",
            PdfStatus::Completed => "completed",
            PdfStatus::Failed => "failed",
        }
    }
}

/// A batch of contracts sharing one template, one send window, and
/// aggregate progress counters.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Campaign {
    pub campaign_id: i32,
    pub company: String,
    pub created_at: NaiveDate,
    pub send_at: NaiveDate,
    pub due_date: NaiveDate,
    pub pdf_total: i32,
    pub pdf_generated: i32,
    pub pdf_status: String,
}
