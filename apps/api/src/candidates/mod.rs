// Candidate records: parsing the oracle's output, persistence, and read endpoints.

pub mod handlers;
pub mod models;
pub mod store;
