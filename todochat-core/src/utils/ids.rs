use uuid::Uuid;

/// Genera un nuovo id di messaggio (UUIDv4).
pub fn new_message_id() -> Uuid {
    Uuid::new_v4()
}
