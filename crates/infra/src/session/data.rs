use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use tabkeep_core::UserId;

use super::SessionError;

/// Version tag written into every cached record. Records carrying any other
/// version fail to decode and the session is treated as absent.
const RECORD_VERSION: u8 = 1;

/// Session state as held in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    /// `None` for an anonymous session.
    pub user_id: Option<UserId>,
    pub csrf_token: String,
    /// Caller address observed when the session was created.
    pub origin_ip: IpAddr,
}

/// Wire form: `{"v":1,"user_id":"<uuid or empty>","csrf_token":"..","origin_ip":".."}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionRecord {
    v: u8,
    user_id: String,
    csrf_token: String,
    origin_ip: IpAddr,
}

impl SessionData {
    pub fn anonymous(csrf_token: String, origin_ip: IpAddr) -> Self {
        Self {
            user_id: None,
            csrf_token,
            origin_ip,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn encode(&self) -> Result<Vec<u8>, SessionError> {
        let record = SessionRecord {
            v: RECORD_VERSION,
            user_id: self.user_id.map(|id| id.to_string()).unwrap_or_default(),
            csrf_token: self.csrf_token.clone(),
            origin_ip: self.origin_ip,
        };
        serde_json::to_vec(&record).map_err(|e| SessionError::Malformed(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SessionError> {
        let record: SessionRecord =
            serde_json::from_slice(bytes).map_err(|e| SessionError::Malformed(e.to_string()))?;

        if record.v != RECORD_VERSION {
            return Err(SessionError::Malformed(format!(
                "unsupported record version {}",
                record.v
            )));
        }
        if record.csrf_token.is_empty() {
            return Err(SessionError::Malformed("empty csrf token".to_string()));
        }

        let user_id = if record.user_id.is_empty() {
            None
        } else {
            Some(
                record
                    .user_id
                    .parse::<UserId>()
                    .map_err(|e| SessionError::Malformed(e.to_string()))?,
            )
        };

        Ok(Self {
            user_id,
            csrf_token: record.csrf_token,
            origin_ip: record.origin_ip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip() -> IpAddr {
        "10.0.0.7".parse().unwrap()
    }

    #[test]
    fn anonymous_is_stored_as_empty_user_id() {
        let data = SessionData::anonymous("tok".to_string(), ip());
        let json: serde_json::Value = serde_json::from_slice(&data.encode().unwrap()).unwrap();

        assert_eq!(json["v"], 1);
        assert_eq!(json["user_id"], "");
        assert_eq!(json["origin_ip"], "10.0.0.7");
        assert_eq!(SessionData::decode(&data.encode().unwrap()).unwrap(), data);
    }

    #[test]
    fn authenticated_record_decodes_user() {
        let user = UserId::new();
        let data = SessionData {
            user_id: Some(user),
            csrf_token: "tok".to_string(),
            origin_ip: ip(),
        };
        let decoded = SessionData::decode(&data.encode().unwrap()).unwrap();
        assert_eq!(decoded.user_id, Some(user));
        assert!(!decoded.is_anonymous());
    }

    #[test]
    fn rejects_other_versions_and_shapes() {
        let future = br#"{"v":2,"user_id":"","csrf_token":"t","origin_ip":"10.0.0.7"}"#;
        assert!(matches!(SessionData::decode(future), Err(SessionError::Malformed(_))));

        let extra = br#"{"v":1,"user_id":"","csrf_token":"t","origin_ip":"10.0.0.7","admin":true}"#;
        assert!(matches!(SessionData::decode(extra), Err(SessionError::Malformed(_))));

        let bad_user = br#"{"v":1,"user_id":"bob","csrf_token":"t","origin_ip":"10.0.0.7"}"#;
        assert!(matches!(SessionData::decode(bad_user), Err(SessionError::Malformed(_))));

        assert!(matches!(SessionData::decode(b"not json"), Err(SessionError::Malformed(_))));
    }
}
