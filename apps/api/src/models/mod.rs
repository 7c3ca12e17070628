pub mod campaign;
pub mod contract;
pub mod user;
