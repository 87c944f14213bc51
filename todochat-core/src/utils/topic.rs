use uuid::Uuid;

/// Prefisso fisso dei topic: i client si iscrivono a `/topic/todolist/{listId}`.
pub const TOPIC_PREFIX: &str = "/topic/todolist/";

pub fn topic_for(list_id: &Uuid) -> String {
    format!("{TOPIC_PREFIX}{list_id}")
}
