//! # Signup form
//!
//! Validation for a signup screen with a username, a password and a repeated
//! password, built on `formwire-core` observables.
//!
//! - [`validation`]: pure rules and the messages they produce.
//! - [`ValidationService`]: debounced, latest-wins remote username checks.
//! - [`SignupViewModel`]: per-field states, `can_submit`, and the submit
//!   handler that calls [`SignupApi::sign_up`] at most once at a time.
//! - [`SearchViewModel`]: the repository search screen.
//!
//! ```rust
//! use formwire_signup::*;
//!
//! let config = ValidationConfig::default();
//! assert_eq!(
//!     validate_password(&config, "abc"),
//!     ValidationResult::Failed("Password must be at least 5 characters".into())
//! );
//! assert!(validate_repeated_password("hunter22", "hunter22").is_valid());
//! assert_eq!(validate_username(&config, "ok name"), UsernameCheck::Settled(
//!     ValidationResult::Failed(USERNAME_CHARSET.into())
//! ));
//! ```

pub mod api;
pub mod config;
pub mod search;
pub mod service;
pub mod validation;
pub mod view_model;

pub use api::*;
pub use config::*;
pub use search::*;
pub use service::*;
pub use validation::*;
pub use view_model::*;
