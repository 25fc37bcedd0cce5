use super::{ContextMap, ContextProvider};
use crate::generator::GenerationContext;
use std::future::Future;
use std::pin::Pin;

/// Metadata about relevant prior correspondence.
///
/// Placeholder capability: it emits an explicit "not yet implemented" marker
/// plus its knobs, which is still valid pipeline input.
// TODO: query the mail store and rank candidates by embedding similarity.
pub struct EmailHistoryProvider {
    max_emails: usize,
    similarity_threshold: f64,
}

impl EmailHistoryProvider {
    pub fn new(max_emails: usize, similarity_threshold: f64) -> Self {
        Self {
            max_emails,
            similarity_threshold,
        }
    }
}

impl Default for EmailHistoryProvider {
    fn default() -> Self {
        Self::new(5, 0.7)
    }
}

impl ContextProvider for EmailHistoryProvider {
    fn name(&self) -> &str {
        "email-history"
    }

    fn retrieve<'a>(
        &'a self,
        _prompt: &'a str,
        _context: &'a GenerationContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ContextMap>> + Send + 'a>> {
        Box::pin(async move {
            let mut fragment = ContextMap::new();
            fragment.insert(
                "email_history".to_string(),
                serde_json::json!({
                    "message": "Email history retrieval not yet implemented",
                    "max_emails": self.max_emails,
                    "similarity_threshold": self.similarity_threshold,
                }),
            );
            Ok(fragment)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_placeholder_marker_with_knobs() {
        let provider = EmailHistoryProvider::default();
        let fragment = provider
            .retrieve("anything", &GenerationContext::default())
            .await
            .unwrap();

        let history = &fragment["email_history"];
        assert!(
            history["message"]
                .as_str()
                .unwrap()
                .contains("not yet implemented")
        );
        assert_eq!(history["max_emails"], 5);
        assert_eq!(history["similarity_threshold"], 0.7);
    }
}
