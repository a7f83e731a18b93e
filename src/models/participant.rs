use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A participant in the room and the last time it was seen alive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    pub name: String,
    /// Milliseconds since the Unix epoch of the last heartbeat (or of the join)
    #[serde(rename = "lastStatus")]
    pub last_status: i64,
}

/// Request to join the room
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    pub name: String,
}

impl Participant {
    pub fn new(name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            name: name.into(),
            last_status: now_ms,
        }
    }

    /// A participant is expired when its last heartbeat is strictly older than `threshold`
    pub fn is_expired(&self, threshold: i64) -> bool {
        self.last_status < threshold
    }
}

impl JoinRequest {
    /// Validate the request and return the display name to register
    pub fn validate(&self) -> Result<String, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Participant name must not be empty".to_string());
        }
        Ok(name.to_string())
    }
}

/// Current wall clock in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_wire_format() {
        let participant = Participant::new("alice", 1_700_000_000_000);
        let json = serde_json::to_value(&participant).unwrap();

        assert_eq!(json["name"], "alice");
        assert_eq!(json["lastStatus"], 1_700_000_000_000_i64);
    }

    #[test]
    fn test_expiry_is_strict() {
        let participant = Participant::new("alice", 1_000);

        assert!(!participant.is_expired(1_000));
        assert!(participant.is_expired(1_001));
    }

    #[test]
    fn test_join_request_validation() {
        let req = JoinRequest { name: "  bob ".to_string() };
        assert_eq!(req.validate().unwrap(), "bob");

        let req = JoinRequest { name: "   ".to_string() };
        assert!(req.validate().is_err());

        let req = JoinRequest { name: String::new() };
        assert!(req.validate().is_err());
    }
}
