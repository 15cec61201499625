//! Admission integrity check for join requests

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Validates a join request before the roster admits the candidate
pub trait AdmissionGate: Send + Sync {
    fn verify(&self, candidate: &str, proof: &str) -> bool;
}

/// Proof is the lowercase hex HMAC-SHA256 of the candidate id under a
/// shared secret
pub struct HmacGate {
    secret: Vec<u8>,
}

impl HmacGate {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Proof a client holding the same secret would send
    #[cfg(test)]
    pub fn sign(&self, candidate: &str) -> String {
        let mut mac = self.mac();
        mac.update(candidate.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length")
    }
}

impl AdmissionGate for HmacGate {
    fn verify(&self, candidate: &str, proof: &str) -> bool {
        let Ok(provided) = hex::decode(proof.trim()) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(candidate.as_bytes());
        // constant-time comparison
        mac.verify_slice(&provided).is_ok()
    }
}
