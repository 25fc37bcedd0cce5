pub mod schema;

pub use schema::{Config, EmbeddingConfig, GenerationConfig, IdentityConfig};
