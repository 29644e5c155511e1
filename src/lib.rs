pub mod app;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod facade;
pub mod optimizer;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;

#[cfg(test)]
mod test_support;
