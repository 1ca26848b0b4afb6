use std::time::{Duration, SystemTime};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac as _};
use sha2::Sha256;
use tracing::debug;

use crate::error::Result;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of the MAC kept in the code - enough to make guessing hopeless,
/// short enough to paste from an email.
const MAC_LEN: usize = 15;

/// The account state a confirmation code is bound to. Any change to
/// `last_login` (which happens on every token issue) invalidates all codes
/// made from the previous state.
#[derive(Debug, Clone)]
pub struct CodeSeed {
    pub user_id: i64,
    pub email: String,
    pub last_login: Option<String>,
}

/// Generates and checks single-use signup confirmation codes.
///
/// A code is `<timestamp-hex>-<base64url MAC prefix>` where the MAC is
/// HMAC-SHA256 over the seed state and the timestamp. Codes expire after
/// `validity` and die early when the seed state changes.
pub struct ConfirmationCodes {
    key: Vec<u8>,
    validity: Duration,
}

impl ConfirmationCodes {
    pub fn new(secret: impl AsRef<[u8]>, validity: Duration) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            validity,
        }
    }

    fn mac(&self, seed: &CodeSeed, timestamp: u64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key)?;
        mac.update(seed.user_id.to_string().as_bytes());
        mac.update(b"\n");
        mac.update(seed.email.as_bytes());
        mac.update(b"\n");
        mac.update(seed.last_login.as_deref().unwrap_or("never").as_bytes());
        mac.update(b"\n");
        mac.update(timestamp.to_string().as_bytes());
        Ok(mac)
    }

    pub fn make_code(&self, seed: &CodeSeed) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs();
        let tag = self.mac(seed, timestamp)?.finalize().into_bytes();
        Ok(format!(
            "{:x}-{}",
            timestamp,
            URL_SAFE_NO_PAD.encode(&tag[..MAC_LEN])
        ))
    }

    pub fn check_code(&self, seed: &CodeSeed, code: &str) -> bool {
        let Some((timestamp, tag)) = code.split_once('-') else {
            debug!("Malformed confirmation code");
            return false;
        };
        let Ok(timestamp) = u64::from_str_radix(timestamp, 16) else {
            debug!("Malformed confirmation code timestamp");
            return false;
        };
        let Ok(tag) = URL_SAFE_NO_PAD.decode(tag) else {
            debug!("Malformed confirmation code MAC");
            return false;
        };
        let now = match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
            Ok(now) => now.as_secs(),
            Err(_) => return false,
        };
        if timestamp > now || now - timestamp > self.validity.as_secs() {
            debug!("Confirmation code outside validity window");
            return false;
        }
        match self.mac(seed, timestamp) {
            // constant-time comparison of the truncated tag
            Ok(mac) => mac.verify_truncated_left(&tag).is_ok(),
            Err(e) => {
                debug!("Cannot compute MAC: {e}");
                false
            }
        }
    }
}
