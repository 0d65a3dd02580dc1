//! Out-of-band device pairing.
//!
//! On start the service builds a payload carrying its base URL and the
//! session credential, rendered as a scannable QR code. No identity provider
//! is involved: physical possession of the rendered code is the trust
//! bootstrap, so the code must only be shown on the operator's own screen.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credential::Credential;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("failed to serialize pairing payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to generate QR code: {0}")]
    Qr(#[from] qrcode::types::QrError),
}

/// What a pairing client needs to connect: where the server is and the key
/// to present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingPayload {
    pub server: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

impl PairingPayload {
    pub fn new(host: &str, port: u16, credential: &Credential) -> Self {
        Self {
            server: format!("http://{}:{}", host, port),
            api_key: credential.expose().to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, PairingError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render the payload as a unicode QR block suitable for a terminal.
    pub fn qr_string(&self) -> Result<String, PairingError> {
        let json = self.to_json()?;
        let code = qrcode::QrCode::new(json.as_bytes())?;
        Ok(code.render::<qrcode::render::unicode::Dense1x2>().build())
    }
}
