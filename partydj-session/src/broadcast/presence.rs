//! Presence channel signatures
//!
//! Signs the member metadata a client attaches to its presence channel
//! subscription. The signature lets other members trust who is present; it
//! grants no access to session data.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Member info carried on a presence channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceInfo {
    pub user_name: String,
    pub is_host: bool,
}

/// Presence metadata of one subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceData {
    pub user_id: String,
    pub user_info: PresenceInfo,
}

/// Signed subscription grant returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAuth {
    /// `"{app_key}:{hex_signature}"`
    pub auth: String,
    /// Exact JSON string that was signed
    pub channel_data: String,
}

/// HMAC-SHA256 signer keyed by the broadcast app secret
#[derive(Clone)]
pub struct PresenceSigner {
    app_key: String,
    app_secret: String,
}

impl std::fmt::Debug for PresenceSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceSigner")
            .field("app_key", &self.app_key)
            .finish_non_exhaustive()
    }
}

impl PresenceSigner {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Sign `presence` for `socket_id` on `channel`
    pub fn sign(&self, socket_id: &str, channel: &str, presence: &PresenceData) -> Result<ChannelAuth> {
        let channel_data = serde_json::to_string(presence)?;
        let signature = self.signature(&format!("{socket_id}:{channel}:{channel_data}"))?;
        Ok(ChannelAuth {
            auth: format!("{}:{}", self.app_key, signature),
            channel_data,
        })
    }

    fn signature(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.app_secret.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid broadcast app secret: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(format!("{:x}", mac.finalize().into_bytes()))
    }

    /// Check a signature produced by `sign`
    pub fn verify(&self, socket_id: &str, channel: &str, auth: &ChannelAuth) -> bool {
        let Some((key, signature)) = auth.auth.split_once(':') else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.app_secret.as_bytes()) else {
            return false;
        };
        mac.update(format!("{socket_id}:{channel}:{}", auth.channel_data).as_bytes());
        key == self.app_key && format!("{:x}", mac.finalize().into_bytes()) == signature
    }
}

/// Whether `socket_id` has the `<digits>.<digits>` shape clients are issued
pub fn is_valid_socket_id(socket_id: &str) -> bool {
    match socket_id.split_once('.') {
        Some((a, b)) => {
            !a.is_empty()
                && !b.is_empty()
                && a.bytes().all(|c| c.is_ascii_digit())
                && b.bytes().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence() -> PresenceData {
        PresenceData {
            user_id: "user1".to_string(),
            user_info: PresenceInfo {
                user_name: "Alice".to_string(),
                is_host: true,
            },
        }
    }

    #[test]
    fn test_channel_data_shape() {
        let signer = PresenceSigner::new("key", "secret");
        let auth = signer.sign("123.456", "presence-cache-ABC123", &presence()).unwrap();
        assert_eq!(
            auth.channel_data,
            r#"{"user_id":"user1","user_info":{"userName":"Alice","isHost":true}}"#
        );
        let (key, signature) = auth.auth.split_once(':').unwrap();
        assert_eq!(key, "key");
        assert_eq!(signature.len(), 64);
        assert!(signature.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_is_bound_to_socket_and_channel() {
        let signer = PresenceSigner::new("key", "secret");
        let auth = signer.sign("123.456", "presence-cache-ABC123", &presence()).unwrap();

        assert!(signer.verify("123.456", "presence-cache-ABC123", &auth));
        assert!(!signer.verify("123.457", "presence-cache-ABC123", &auth));
        assert!(!signer.verify("123.456", "presence-cache-XYZ789", &auth));
        assert!(!PresenceSigner::new("key", "other").verify("123.456", "presence-cache-ABC123", &auth));
    }

    #[test]
    fn test_socket_id_shape() {
        assert!(is_valid_socket_id("123.456"));
        assert!(!is_valid_socket_id("123"));
        assert!(!is_valid_socket_id("123."));
        assert!(!is_valid_socket_id("a.1"));
    }
}
