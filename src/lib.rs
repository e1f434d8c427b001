//! Property Wizard - guided creation of rental property listings
//!
//! The wizard keeps one in-progress property draft, walks the user through
//! the steps that apply to its property type, and autosaves the draft to a
//! remote properties service.

pub mod api;
pub mod config;
pub mod logging;
pub mod services;
pub mod wizard;
