//! Services that run alongside the wizard.
//!
//! These coordinate the synchronous wizard store with the asynchronous
//! properties service.

pub mod draft_sync;

pub use draft_sync::{SessionError, WizardSession};
