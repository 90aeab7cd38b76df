//! Permission resolution core for a member-management application.
//!
//! The [`authz::PermissionResolver`] answers "may this user access or manage
//! this function?" from four additive sources. The [`store`] layer mutates
//! those sources, each write paired with an entry in the [`audit`] log.

pub mod app;
pub mod audit;
pub mod authz;
pub mod bulk;
pub mod catalog;
pub mod db;
pub mod docs;
pub mod errors;
pub mod jwt;
pub mod models;
pub mod routes;
pub mod store;
pub mod utils;

pub use app::create_app;
