#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One employee's contract row in the campaign roster
/// (`contract_pkwt.list_contract`). `contract_num_detail` is the unique
/// natural key; every column doubles as a template substitution variable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeContract {
    pub contract_id: i32,
    pub campaign_id: i32,
    pub contract_num_detail: String,
    pub nip: Option<String>,
    pub name: String,
    pub job_description: String,
    pub location: String,
    pub birthplace: String,
    pub birthdate: Option<NaiveDate>,
    pub marriage_status: String,
    pub gender: String,
    pub address: String,
    pub nik: String,
    pub tax_status: String,
    pub npwp: String,
    pub mobile_number: String,
    pub email: String,
    pub mothers_name: String,
    pub bank_account: String,
    /// Gross pay in rupiah; rendered with `.` thousands separators.
    pub gt: i32,
    pub job_position: String,
    /// MD5 hex digest of `contract_num_detail`, the registration hash.
    pub contract_num_detail_md5: Option<String>,
}

/// Per-contract status ledger row (`contract_pkwt.contract_status`),
/// excluding the PDF blob which is fetched separately.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContractStatus {
    pub status_id: i32,
    pub campaign_id: i32,
    pub contract_id: i32,
    pub send_status: bool,
    pub signed_status: bool,
    pub signed_at: Option<NaiveDateTime>,
    pub send_at: Option<NaiveDateTime>,
}
