/// All entity ids are UUIDs: opaque, globally unique and hex-encodable.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Allocate a fresh time-ordered entity id.
pub fn new_id() -> EntityId {
    uuid::Uuid::now_v7()
}
