/// All persisted identifiers are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// 1-based version sequence number, unique within one content item.
pub type VersionSeq = u32;
