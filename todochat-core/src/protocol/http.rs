use serde::{Deserialize, Serialize};

use crate::models::MessageDraft;
/*
    http dto for http requests.
    The history endpoint answers with a bare JSON array of ChatMessage, so it has no DTO.
*/

// Send: every field is optional on the wire so that a missing one becomes a 400
// decided by the server instead of an extractor rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, alias = "todoListId")]
    pub list_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl From<SendMessageRequest> for MessageDraft {
    fn from(req: SendMessageRequest) -> Self {
        MessageDraft {
            content: req.content,
            user_id: req.user_id,
            username: req.username,
            list_id: req.list_id,
            // il timestamp lo decide sempre il server sulla via REST
            created_at: None,
        }
    }
}
