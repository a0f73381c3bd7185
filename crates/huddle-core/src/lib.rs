// Shared foundations: league data types, the snapshot provider seam,
// configuration, persistence, and result caching.

pub mod cache;
pub mod config;
pub mod db;
pub mod league;
pub mod provider;
