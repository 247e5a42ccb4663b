//! Server identity keypair for push authorization.
//!
//! Lazily generated on first use, persisted under the push state directory,
//! stable for the lifetime of the installation. The public half is what
//! browsers pass as `applicationServerKey` when subscribing.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const VAPID_FILE: &str = "vapid.json";

/// P-256 keypair, base64url-encoded without padding: the private scalar and
/// the uncompressed public point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VapidKeys {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

pub struct ServerIdentity {
    path: PathBuf,
    cached: Mutex<Option<VapidKeys>>,
}

impl ServerIdentity {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(VAPID_FILE),
            cached: Mutex::new(None),
        }
    }

    /// Load the persisted keypair, generating and persisting a fresh one if
    /// none exists yet.
    pub fn keys(&self) -> Result<VapidKeys> {
        let mut cached = self.cached.lock().unwrap();
        if let Some(keys) = cached.as_ref() {
            return Ok(keys.clone());
        }

        let keys = match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(_) => {
                let keys = generate();
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&self.path, serde_json::to_string_pretty(&keys)?)?;
                keys
            }
        };

        *cached = Some(keys.clone());
        Ok(keys)
    }

    /// The public half exposed to subscribing clients.
    pub fn public_key(&self) -> Result<String> {
        Ok(self.keys()?.public_key)
    }
}

fn generate() -> VapidKeys {
    let secret = SecretKey::random(&mut OsRng);
    let public = secret.public_key().to_encoded_point(false);
    VapidKeys {
        public_key: URL_SAFE_NO_PAD.encode(public.as_bytes()),
        private_key: URL_SAFE_NO_PAD.encode(secret.to_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_generated_once_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let identity = ServerIdentity::new(dir.path());

        let first = identity.keys().unwrap();
        assert!(dir.path().join(VAPID_FILE).exists());

        let second = identity.keys().unwrap();
        assert_eq!(first.public_key, second.public_key);

        // a fresh handle over the same directory loads the same pair
        let reloaded = ServerIdentity::new(dir.path()).keys().unwrap();
        assert_eq!(first.public_key, reloaded.public_key);
        assert_eq!(first.private_key, reloaded.private_key);
    }

    #[test]
    fn public_key_is_an_uncompressed_p256_point() {
        let dir = tempfile::tempdir().unwrap();
        let identity = ServerIdentity::new(dir.path());
        let public = identity.public_key().unwrap();

        let bytes = URL_SAFE_NO_PAD.decode(public).unwrap();
        assert_eq!(bytes.len(), 65);
        assert_eq!(bytes[0], 0x04);
    }

    #[test]
    fn private_key_is_a_32_byte_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let keys = ServerIdentity::new(dir.path()).keys().unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(keys.private_key).unwrap();
        assert_eq!(bytes.len(), 32);
    }
}
