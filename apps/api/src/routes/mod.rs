pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::{auth, campaigns, contracts, dashboard, email, signing};

/// Roster spreadsheets and contract templates can be a few MB; uploads are
/// capped well above that.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/login", post(auth::handle_login))
        .route("/api/logout", post(auth::handle_logout))
        // Campaigns
        .route("/api/campaigns", post(campaigns::handlers::create_campaign))
        .route(
            "/api/campaigns/upload-employees",
            post(campaigns::handlers::upload_employees),
        )
        .route(
            "/api/campaigns/upload-contract",
            post(campaigns::handlers::upload_contract),
        )
        .route(
            "/api/campaigns/:campaign_id",
            get(campaigns::handlers::get_campaign),
        )
        .route(
            "/api/campaigns/:campaign_id/contracts",
            get(campaigns::handlers::get_campaign_contracts)
                .delete(campaigns::handlers::delete_campaign_contracts),
        )
        .route(
            "/api/campaigns/:campaign_id/contract-template",
            get(campaigns::handlers::get_contract_template),
        )
        .route(
            "/api/campaigns/:campaign_id/populate-status",
            post(campaigns::handlers::populate_status),
        )
        .route(
            "/api/campaigns/:campaign_id/contracts-with-status",
            get(contracts::handle_campaign_contracts_with_status),
        )
        // Contracts
        .route("/api/contracts", get(contracts::handle_list_contracts))
        .route(
            "/api/contracts-with-status",
            get(contracts::handle_contracts_with_status),
        )
        .route(
            "/api/contract/:contract_id",
            get(contracts::handle_contract_detail),
        )
        .route(
            "/api/contracts/:contract_id/pdf",
            get(contracts::handle_contract_pdf),
        )
        .route(
            "/api/unsigned-active-contracts",
            get(contracts::handle_unsigned_active_contracts),
        )
        // Signing
        .route("/api/sign-contract", post(signing::handle_sign_contract))
        // Email
        .route(
            "/api/email-preview",
            post(email::handlers::handle_email_preview),
        )
        .route("/api/send-email", post(email::handlers::handle_send_email))
        .route(
            "/api/bulk-send-email",
            post(email::handlers::handle_bulk_send_email),
        )
        .route(
            "/api/send-reminders",
            post(email::handlers::handle_send_reminders),
        )
        // Dashboard
        .route(
            "/api/dashboard-stats",
            get(dashboard::handle_dashboard_stats),
        )
        .route(
            "/api/analytics/hourly",
            get(dashboard::handle_hourly_analytics),
        )
        .route("/api/campaigns-list", get(dashboard::handle_campaigns_list))
        .route(
            "/api/campaigns-with-stats",
            get(dashboard::handle_campaigns_with_stats),
        )
        .route(
            "/api/companies/search",
            get(dashboard::handle_company_search),
        )
        .route("/api/test-db", get(dashboard::handle_test_db))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
