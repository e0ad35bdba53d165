//! UUID v7 utilities for time-ordered identifiers.
//!
//! Every entity id in tabula is a UUIDv7 (RFC 9562): the first 48 bits
//! embed a millisecond Unix timestamp, so ids sort in creation order and
//! chat history stays well-ordered even when rows are written
//! concurrently.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// IDs generated later are lexicographically greater, which keeps
/// `ORDER BY id` equivalent to creation order.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Extract the embedded timestamp from a UUIDv7.
///
/// Returns `None` if the UUID is not version 7.
pub fn extract_timestamp(uuid: &Uuid) -> Option<DateTime<Utc>> {
    let bytes = uuid.as_bytes();
    if (bytes[6] >> 4) != 7 {
        return None;
    }

    // 48-bit millisecond timestamp in the first 6 bytes
    let millis = ((bytes[0] as u64) << 40)
        | ((bytes[1] as u64) << 32)
        | ((bytes[2] as u64) << 24)
        | ((bytes[3] as u64) << 16)
        | ((bytes[4] as u64) << 8)
        | (bytes[5] as u64);

    Utc.timestamp_millis_opt(millis as i64).single()
}

/// Check if a UUID is version 7.
#[inline]
pub fn is_v7(uuid: &Uuid) -> bool {
    uuid.get_version_num() == 7
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_v7_is_version_7() {
        let id = new_v7();
        assert!(is_v7(&id));
    }

    #[test]
    fn test_v7_ordering() {
        let id1 = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = new_v7();

        // Later UUIDs should be greater
        assert!(id2 > id1);
    }

    #[test]
    fn test_timestamp_extraction() {
        let before = Utc::now();
        let id = new_v7();
        let after = Utc::now();

        let extracted = extract_timestamp(&id).expect("should extract timestamp");

        assert!(extracted >= before - Duration::milliseconds(1));
        assert!(extracted <= after + Duration::milliseconds(1));
    }

    #[test]
    fn test_v4_has_no_timestamp() {
        let v4_id = Uuid::new_v4();
        assert!(!is_v7(&v4_id));
        assert!(extract_timestamp(&v4_id).is_none());
    }
}
