#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod cli;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod generator;
pub mod prompt;
pub mod providers;
pub mod suggest;
pub mod tone;

pub use config::Config;
pub use error::{BackendError, ConfigError, DraftError, Result};
pub use generator::{
    Document, EmailGenerator, GeneratedResponse, GenerationContext, GeneratorOptions,
    ResponseKind, UserIdentity,
};
