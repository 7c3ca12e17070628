//! Welcome and reminder email composition.

use chrono::{Local, NaiveDate};

use crate::pipeline::substitute::format_indonesian_date;

/// Registration path segment: lowercase hex MD5 of the contract number.
pub fn registration_hash(contract_number: &str) -> String {
    format!("{:x}", md5::compute(contract_number.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct EmailBody {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Employee fields the welcome email shows in its info table.
#[derive(Debug, Clone)]
pub struct WelcomeEmailInput {
    pub name: String,
    pub birthplace: String,
    pub birthdate: Option<NaiveDate>,
    pub nik: String,
    pub location: String,
    pub job_description: String,
    pub registration_hash: String,
}

/// Onboarding email with the personal registration link.
pub fn welcome_email(input: &WelcomeEmailInput, base_url: &str) -> EmailBody {
    let birthdate = input
        .birthdate
        .map(format_indonesian_date)
        .unwrap_or_else(|| "-".to_string());
    let link = format!("{base_url}/registrasi/{}", input.registration_hash);
    let name = &input.name;

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{
            font-family: Arial, sans-serif;
            line-height: 1.6;
            color: #333;
        }}
        .info-table {{
            margin: 20px 0;
        }}
        .info-row {{
            display: flex;
            margin: 8px 0;
        }}
        .info-label {{
            min-width: 200px;
            font-weight: 500;
        }}
        .info-value {{
            flex: 1;
        }}
        a {{
            color: #7c3aed;
            text-decoration: none;
        }}
    </style>
</head>
<body>
    <p><strong>Penempatan PT Mandom Indonesia Tbk</strong></p>

    <p>Dear {name},</p>

    <p>Selamat datang di PT JMAX Indonesia!</p>

    <p>Kami dengan senang hati menyambut Anda sebagai bagian dari tim kami dalam penempatan PT Mandom Indonesia Tbk. Kehadiran Anda merupakan kontribusi penting dalam mendukung keberhasilan dan kelancaran proyek ini.</p>

    <p>Berikut beberapa informasi awal yang perlu Anda ketahui:</p>

    <div class="info-table">
        <div class="info-row">
            <div class="info-label"> Nama</div>
            <div class="info-value">: {name}</div>
        </div>
        <div class="info-row">
            <div class="info-label"> Tempat/Tanggal Lahir</div>
            <div class="info-value">: {birthplace}, {birthdate}</div>
        </div>
        <div class="info-row">
            <div class="info-label"> NIK</div>
            <div class="info-value">: {nik}</div>
        </div>
        <div class="info-row">
            <div class="info-label"> Lokasi Penempatan</div>
            <div class="info-value">: {location}</div>
        </div>
        <div class="info-row">
            <div class="info-label"> Jabatan / Posisi</div>
            <div class="info-value">: {job_description}</div>
        </div>
    </div>

    <p>Untuk melanjutkan proses administrasi, anda harus melengkapi dokumen melalui link:<br>
    <a href="{link}">{link}</a></p>

    <p>Kami percaya bahwa semangat, keahlian, dan dedikasi Anda akan membawa nilai tambah bagi tim dan perusahaan.</p>

    <p>Jika Anda memiliki pertanyaan atau membutuhkan informasi lebih lanjut, jangan ragu untuk menghubungi HRD kami di ebenezer@jmaxindo.com.</p>

    <p>Sekali lagi, selamat bergabung dan mari kita wujudkan kesuksesan bersama!</p>

    <p>Salam hangat,<br>
    Tajunissa Legisa W<br>
    General Manager<br>
    PT JMAX Indonesia<br>
     Lisa@jmaxindo.com</p>
</body>
</html>"#,
        birthplace = input.birthplace,
        nik = input.nik,
        location = input.location,
        job_description = input.job_description,
    );

    let text = format!(
        r#"Penempatan PT Mandom Indonesia Tbk

Dear {name},

Selamat datang di PT JMAX Indonesia!

Kami dengan senang hati menyambut Anda sebagai bagian dari tim kami dalam penempatan PT Mandom Indonesia Tbk. Kehadiran Anda merupakan kontribusi penting dalam mendukung keberhasilan dan kelancaran proyek ini.

Berikut beberapa informasi awal yang perlu Anda ketahui:

 Nama                   : {name}
 Tempat/Tanggal Lahir   : {birthplace}, {birthdate}
 NIK                    : {nik}
 Lokasi Penempatan      : {location}
 Jabatan / Posisi       : {job_description}

Untuk melanjutkan proses administrasi, anda harus melengkapi dokumen melalui link:
{link}

Kami percaya bahwa semangat, keahlian, dan dedikasi Anda akan membawa nilai tambah bagi tim dan perusahaan.

Jika Anda memiliki pertanyaan atau membutuhkan informasi lebih lanjut, jangan ragu untuk menghubungi HRD kami di ebenezer@jmaxindo.com.

Sekali lagi, selamat bergabung dan mari kita wujudkan kesuksesan bersama!

Salam hangat,
Tajunissa Legisa W
General Manager
PT JMAX Indonesia
 Lisa@jmaxindo.com"#,
        birthplace = input.birthplace,
        nik = input.nik,
        location = input.location,
        job_description = input.job_description,
    );

    EmailBody {
        subject: "Selamat Bergabung di PT JMAX Indonesia".to_string(),
        html,
        text,
    }
}

/// Same-day signing reminder with the employee's signing portal link.
pub fn reminder_email(name: &str, registration_hash: &str, base_url: &str) -> EmailBody {
    let login_url = format!("{base_url}/{registration_hash}");
    reminder_email_on(name, &login_url, Local::now().date_naive())
}

fn reminder_email_on(name: &str, login_url: &str, today: NaiveDate) -> EmailBody {
    let date = format_indonesian_date(today);
    let text = format!(
        r#"Kami mengingatkan bahwa proses penandatanganan kontrak kerja waktu tertentu (PKWT) dijadwalkan untuk dilakukan hari ini {date}, melalui platform digital.

Mohon agar Saudara/i segera mengakses lampiran PKWT berikut untuk melakukan penandatanganan.
{login_url}

Batas waktu penandatanganan adalah hari ini pukul 20:00.

Terima kasih atas perhatian dan kerja samanya.

Salam hangat,
Tajunissa Legisa W
General Manager
PT JMAX Indonesia
 Lisa@jmaxindo.com"#,
    );
    let html = format!("<p>{}</p>", text.replace('\n', "<br>"));

    EmailBody {
        subject: format!("Reminder: Penandatanganan PKWT - {name}"),
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_hash_is_lowercase_md5() {
        // md5("abc") is well known.
        assert_eq!(registration_hash("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    fn sample_input() -> WelcomeEmailInput {
        WelcomeEmailInput {
            name: "Budi Santoso".to_string(),
            birthplace: "Bekasi".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1999, 5, 2),
            nik: "3216051234560001".to_string(),
            location: "Cibitung".to_string(),
            job_description: "Operator Produksi".to_string(),
            registration_hash: "deadbeef".to_string(),
        }
    }

    #[test]
    fn test_welcome_email_contains_registration_link() {
        let body = welcome_email(&sample_input(), "https://pkwt.example.com");
        assert!(body.html.contains("https://pkwt.example.com/registrasi/deadbeef"));
        assert!(body.text.contains("https://pkwt.example.com/registrasi/deadbeef"));
        assert_eq!(body.subject, "Selamat Bergabung di PT JMAX Indonesia");
    }

    #[test]
    fn test_welcome_email_missing_birthdate_shows_dash() {
        let mut input = sample_input();
        input.birthdate = None;
        let body = welcome_email(&input, "https://pkwt.example.com");
        assert!(body.text.contains("Bekasi, -"));
    }

    #[test]
    fn test_reminder_email_carries_login_url_and_date() {
        let body = reminder_email_on(
            "Budi",
            "https://pkwt.example.com/deadbeef",
            NaiveDate::from_ymd_opt(2025, 10, 7).unwrap(),
        );
        assert!(body.text.contains("hari ini 07 Oktober 2025"));
        assert!(body.text.contains("https://pkwt.example.com/deadbeef"));
        assert_eq!(body.subject, "Reminder: Penandatanganan PKWT - Budi");
        assert!(body.html.contains("<br>"));
    }
}
