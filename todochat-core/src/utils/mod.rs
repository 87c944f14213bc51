pub mod ids;
pub mod time;
pub mod topic;

pub use ids::new_message_id;
pub use self::time::now_utc;
pub use topic::{topic_for, TOPIC_PREFIX};
