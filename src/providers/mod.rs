pub mod compatible;
pub mod embeddings;
pub mod factory;
pub mod http_client;
pub mod scrub;
pub mod traits;

pub use compatible::OpenAiCompatibleBackend;
pub use embeddings::{EmbeddingBackend, NoopEmbedding, OpenAiCompatibleEmbedding, embed_named};
pub use factory::{create_completion_backend, create_embedding_backend};
pub use http_client::{build_backend_client, build_backend_client_with_timeout};
pub use scrub::sanitize_api_error;
pub use traits::{CompletionBackend, CompletionRequest, CompletionResponse};
