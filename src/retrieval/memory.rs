//! Process-local conversation store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::retrieval::collaborators::ConversationStore;
use crate::retrieval::error::RetrieveError;

/// Keeps pinned chunk ids in memory. Unknown conversations have no pins.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    pins: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get_pinned(&self, conversation_id: &str) -> Result<Vec<String>, RetrieveError> {
        Ok(self
            .pins
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_pinned(
        &self,
        conversation_id: &str,
        chunk_ids: &[String],
    ) -> Result<(), RetrieveError> {
        self.pins
            .write()
            .await
            .insert(conversation_id.to_string(), chunk_ids.to_vec());
        Ok(())
    }
}
