// Jupyter wire protocol
// [identities..., "<IDS|MSG>", signature, header, parent_header, metadata, content, buffers...]

use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::error::{Result, WireError};

type HmacSha256 = Hmac<Sha256>;

/// Separates routing identities from the signed message body
pub const DELIMITER: &[u8] = b"<IDS|MSG>";

/// Messaging protocol version spoken by the fallback kernel
pub const PROTOCOL_VERSION: &str = "5.3";

/// HMAC-SHA256 message signer; an empty key disables signing
#[derive(Clone)]
pub struct Signer {
    key: Option<Vec<u8>>,
}

impl Signer {
    pub fn new(key: &str) -> Self {
        Self {
            key: (!key.is_empty()).then(|| key.as_bytes().to_vec()),
        }
    }

    fn mac(&self, parts: &[&[u8]]) -> Option<HmacSha256> {
        let key = self.key.as_ref()?;
        // HMAC takes keys of any length
        let mut mac = HmacSha256::new_from_slice(key).ok()?;
        for part in parts {
            mac.update(part);
        }
        Some(mac)
    }

    /// Hex signature of the four JSON frames
    pub fn sign(&self, parts: &[&[u8]]) -> String {
        self.mac(parts)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default()
    }

    pub fn verify(&self, parts: &[&[u8]], signature: &[u8]) -> bool {
        let Some(mac) = self.mac(parts) else {
            return true;
        };
        hex::decode(signature)
            .map(|expected| mac.verify_slice(&expected).is_ok())
            .unwrap_or(false)
    }
}

/// Message header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub msg_id: String,
    pub session: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub date: String,
    pub msg_type: String,
    #[serde(default)]
    pub version: String,
}

/// A decoded Jupyter message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// ROUTER peer identities, or the topic for IOPub messages
    pub identities: Vec<Bytes>,
    pub header: Header,
    /// `{}` when the message has no parent
    pub parent_header: Value,
    pub metadata: Value,
    pub content: Value,
}

impl Message {
    pub fn msg_type(&self) -> &str {
        &self.header.msg_type
    }

    /// Encode into frames, signing with `signer`
    pub fn encode(&self, signer: &Signer) -> Result<Vec<Bytes>> {
        let header = serde_json::to_vec(&self.header)?;
        let parent = serde_json::to_vec(&self.parent_header)?;
        let metadata = serde_json::to_vec(&self.metadata)?;
        let content = serde_json::to_vec(&self.content)?;

        let signature = signer.sign(&[
            header.as_slice(),
            parent.as_slice(),
            metadata.as_slice(),
            content.as_slice(),
        ]);

        let mut frames = self.identities.clone();
        frames.push(Bytes::from_static(DELIMITER));
        frames.push(Bytes::from(signature));
        frames.extend([header, parent, metadata, content].map(Bytes::from));
        Ok(frames)
    }

    /// Decode frames received on a socket, verifying the signature
    ///
    /// Extra buffer frames after `content` are ignored.
    pub fn decode(frames: &[Bytes], signer: &Signer) -> Result<Self> {
        let split = frames
            .iter()
            .position(|f| f[..] == *DELIMITER)
            .ok_or(WireError::MissingDelimiter)?;

        let body = &frames[split + 1..];
        if body.len() < 5 {
            return Err(WireError::Truncated(body.len()));
        }

        let parts: [&[u8]; 4] = [&body[1][..], &body[2][..], &body[3][..], &body[4][..]];
        if !signer.verify(&parts, &body[0][..]) {
            return Err(WireError::BadSignature);
        }

        Ok(Self {
            identities: frames[..split].to_vec(),
            header: serde_json::from_slice(&body[1])?,
            parent_header: serde_json::from_slice(&body[2])?,
            metadata: serde_json::from_slice(&body[3])?,
            content: serde_json::from_slice(&body[4])?,
        })
    }
}
