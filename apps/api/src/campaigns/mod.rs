//! Campaign lifecycle: creation, roster upload, template upload and PDF
//! regeneration triggers.

pub mod handlers;
pub mod roster;
