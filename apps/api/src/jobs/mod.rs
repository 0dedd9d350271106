// Background résumé jobs: the session table, the runner that drives each
// session's pipeline, and the endpoints that start and poll them.

pub mod handlers;
pub mod ranking;
pub mod runner;
pub mod session;
pub mod workspace;
