pub mod config;
pub mod llm;
pub mod oracle;
pub mod routes;
pub mod verification;
