//! bakecost Library
//!
//! Ingredient prices, recipes, nutrition labels and product costs for a
//! small bakery, plus the editor controllers that drive the admin pages.

pub mod api;
pub mod build_info;
pub mod config;
pub mod costing;
pub mod db;
pub mod editor;
pub mod mcp;
pub mod models;
pub mod tools;
