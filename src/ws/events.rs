use serde::{Deserialize, Serialize};

/// A state change fanned out to every connected peer.
///
/// Wire shape: `{"type": "<tag>", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum BroadcastEvent {
    LevelUpdate { level: i64 },
}

impl BroadcastEvent {
    pub fn level_update(level: i64) -> Self {
        BroadcastEvent::LevelUpdate { level }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_update_wire_shape() {
        let json = serde_json::to_string(&BroadcastEvent::level_update(5)).unwrap();
        assert_eq!(json, r#"{"type":"levelupdate","data":{"level":5}}"#);
    }

    #[test]
    fn level_update_round_trips() {
        let event: BroadcastEvent =
            serde_json::from_str(r#"{"type":"levelupdate","data":{"level":2}}"#).unwrap();
        assert_eq!(event, BroadcastEvent::level_update(2));
    }
}
