//! Placeholder Substitution Engine — merges a campaign's HTML template with
//! one employee record.
//!
//! Templates come out of a Word rich-text export, so every field can appear
//! in two forms: `{field}` and `{<span class=SpellE>field</span>}`. Both are
//! replaced. Unmatched placeholders stay verbatim; substitution is pure and
//! order-independent because the placeholder keys are disjoint strings.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::contract::EmployeeContract;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<title>.*?</title>").expect("title regex"));

const INDONESIAN_MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Formats a date as `DD <Indonesian month name> YYYY`, e.g. "02 Mei 2025".
pub fn format_indonesian_date(date: NaiveDate) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        INDONESIAN_MONTHS[date.month0() as usize],
        date.year()
    )
}

/// Formats an integer with `.` as the thousands separator, e.g. 1500000
/// becomes "1.500.000".
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Every substitution variable for one employee, pre-formatted.
/// Null fields substitute to the empty string, never a "null" literal.
fn substitution_fields(employee: &EmployeeContract) -> Vec<(&'static str, String)> {
    vec![
        ("contract_id", employee.contract_id.to_string()),
        ("campaign_id", employee.campaign_id.to_string()),
        (
            "contract_num_detail",
            employee.contract_num_detail.clone(),
        ),
        ("nip", employee.nip.clone().unwrap_or_default()),
        ("name", employee.name.clone()),
        ("job_description", employee.job_description.clone()),
        ("location", employee.location.clone()),
        ("birthplace", employee.birthplace.clone()),
        (
            "birthdate",
            employee
                .birthdate
                .map(format_indonesian_date)
                .unwrap_or_default(),
        ),
        ("marriage_status", employee.marriage_status.clone()),
        ("gender", employee.gender.clone()),
        ("address", employee.address.clone()),
        ("nik", employee.nik.clone()),
        ("tax_status", employee.tax_status.clone()),
        ("npwp", employee.npwp.clone()),
        ("mobile_number", employee.mobile_number.clone()),
        ("email", employee.email.clone()),
        ("mothers_name", employee.mothers_name.clone()),
        ("bank_account", employee.bank_account.clone()),
        ("gt", format_thousands(employee.gt as i64)),
        ("job_position", employee.job_position.clone()),
        (
            "contract_num_detail_md5",
            employee.contract_num_detail_md5.clone().unwrap_or_default(),
        ),
    ]
}

/// Replaces both placeholder syntaxes for every employee field.
pub fn substitute_placeholders(template: &str, employee: &EmployeeContract) -> String {
    let mut html = template.to_string();
    for (key, value) in substitution_fields(employee) {
        let plain = format!("{{{key}}}");
        let spell_e = format!("{{<span class=SpellE>{key}</span>}}");
        html = html.replace(&plain, &value);
        html = html.replace(&spell_e, &value);
    }
    html
}

/// Overwrites the document `<title>` with the contract number.
pub fn set_document_title(html: &str, title: &str) -> String {
    TITLE_RE
        .replace_all(html, format!("<title>{title}</title>").as_str())
        .into_owned()
}

/// Full substitution step for one employee: placeholders plus title.
pub fn render_contract_html(template: &str, employee: &EmployeeContract) -> String {
    let html = substitute_placeholders(template, employee);
    set_document_title(&html, &employee.contract_num_detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_employee() -> EmployeeContract {
        EmployeeContract {
            contract_id: 7,
            campaign_id: 1,
            contract_num_detail: "001/PKWT-HRD/V/2025".to_string(),
            nip: None,
            name: "Budi Santoso".to_string(),
            job_description: "Operator Produksi".to_string(),
            location: "Cibitung".to_string(),
            birthplace: "Bekasi".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1999, 5, 2),
            marriage_status: "TK/0".to_string(),
            gender: "L".to_string(),
            address: "Jl. Melati No. 3".to_string(),
            nik: "3216051234560001".to_string(),
            tax_status: "TK0".to_string(),
            npwp: "-".to_string(),
            mobile_number: "081234567890".to_string(),
            email: "budi@example.com".to_string(),
            mothers_name: "Siti Aminah".to_string(),
            bank_account: "123456789".to_string(),
            gt: 5_100_000,
            job_position: "Produksi".to_string(),
            contract_num_detail_md5: None,
        }
    }

    #[test]
    fn test_plain_placeholder_replaced() {
        let html = substitute_placeholders("<p>Nama: {name}</p>", &sample_employee());
        assert_eq!(html, "<p>Nama: Budi Santoso</p>");
    }

    #[test]
    fn test_spell_e_placeholder_replaced() {
        let html = substitute_placeholders(
            "<p>{<span class=SpellE>nik</span>}</p>",
            &sample_employee(),
        );
        assert_eq!(html, "<p>3216051234560001</p>");
    }

    #[test]
    fn test_null_field_substitutes_to_empty_string() {
        let html = substitute_placeholders("NIP: [{nip}]", &sample_employee());
        assert_eq!(html, "NIP: []");
        assert!(!html.contains("null"));
    }

    #[test]
    fn test_unmatched_placeholder_left_verbatim() {
        let html = substitute_placeholders("{no_such_field}", &sample_employee());
        assert_eq!(html, "{no_such_field}");
    }

    #[test]
    fn test_birthdate_formatted_indonesian() {
        let html = substitute_placeholders("{birthdate}", &sample_employee());
        assert_eq!(html, "02 Mei 1999");
    }

    #[test]
    fn test_missing_birthdate_is_empty() {
        let mut employee = sample_employee();
        employee.birthdate = None;
        assert_eq!(substitute_placeholders("{birthdate}", &employee), "");
    }

    #[test]
    fn test_gt_thousands_separated() {
        let html = substitute_placeholders("{gt}", &sample_employee());
        assert_eq!(html, "5.100.000");
    }

    #[test]
    fn test_format_thousands_small_values() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1.000");
        assert_eq!(format_thousands(-2500000), "-2.500.000");
    }

    #[test]
    fn test_title_replaced_case_insensitive() {
        let html = set_document_title("<TITLE>old</TITLE><p>x</p>", "002/PKWT/2025");
        assert_eq!(html, "<title>002/PKWT/2025</title><p>x</p>");
    }

    #[test]
    fn test_render_contract_html_sets_title_to_contract_number() {
        let html = render_contract_html(
            "<title>template</title>{name}",
            &sample_employee(),
        );
        assert_eq!(html, "<title>001/PKWT-HRD/V/2025</title>Budi Santoso");
    }
}
