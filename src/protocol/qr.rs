//! QR code pairing for linking a phone to the session.
//!
//! Handles QR payload generation, code rotation and rendering.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::render::{svg, unicode};
use qrcode::QrCode;
use rand::RngCore;
use thiserror::Error;

use crate::state::DeviceKeys;
use crate::types::QRCode;

/// Validity of the first code.
pub const FIRST_CODE_TIMEOUT: Duration = Duration::from_secs(60);
/// Validity of every following code.
pub const NEXT_CODE_TIMEOUT: Duration = Duration::from_secs(20);

/// QR code errors.
#[derive(Debug, Clone, Error)]
pub enum QRError {
    #[error("QR generation failed: {0}")]
    GenerationFailed(String),
}

/// QR pairing state: issues one code per rotation.
pub struct QRPairing {
    keys: DeviceKeys,
    issued: u32,
}

impl QRPairing {
    /// Create a new QR pairing session for the given key material.
    pub fn new(keys: DeviceKeys) -> Self {
        Self { keys, issued: 0 }
    }

    /// Issue the next code.
    ///
    /// Format: ref,noisePublicKey,identityPublicKey,advSecretKey
    pub fn next_code(&mut self) -> QRCode {
        let mut reference = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut reference);

        let timeout = if self.issued == 0 {
            FIRST_CODE_TIMEOUT
        } else {
            NEXT_CODE_TIMEOUT
        };
        self.issued += 1;

        QRCode {
            code: format!(
                "2@{},{},{},{}",
                STANDARD.encode(reference),
                self.keys.noise_public,
                self.keys.identity_public,
                self.keys.adv_secret
            ),
            timeout,
        }
    }

    /// Number of codes issued so far.
    pub fn issued(&self) -> u32 {
        self.issued
    }
}

/// Render QR code as ASCII for terminal display.
pub fn render_qr_ascii(data: &str) -> Result<String, QRError> {
    let code =
        QrCode::new(data.as_bytes()).map_err(|e| QRError::GenerationFailed(e.to_string()))?;

    let image = code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build();

    Ok(image)
}

/// Render QR code as an SVG image data URL, usable as an `<img>` source.
pub fn render_qr_data_url(data: &str) -> Result<String, QRError> {
    let code =
        QrCode::new(data.as_bytes()).map_err(|e| QRError::GenerationFailed(e.to_string()))?;

    let image = code
        .render::<svg::Color>()
        .min_dimensions(264, 264)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image.as_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_code_rotation() {
        let mut pairing = QRPairing::new(DeviceKeys::generate());
        let first = pairing.next_code();
        let second = pairing.next_code();

        assert_eq!(first.timeout, FIRST_CODE_TIMEOUT);
        assert_eq!(second.timeout, NEXT_CODE_TIMEOUT);
        assert_ne!(first.code, second.code);
        assert_eq!(pairing.issued(), 2);
    }

    #[test]
    fn test_codes_share_key_material() {
        let keys = DeviceKeys::generate();
        let mut pairing = QRPairing::new(keys.clone());
        let code = pairing.next_code().code;

        let parts: Vec<&str> = code.split(',').collect();
        assert_eq!(parts.len(), 4);
        assert!(parts[0].starts_with("2@"));
        assert_eq!(parts[1], keys.noise_public);
        assert_eq!(parts[3], keys.adv_secret);
    }

    #[test]
    fn test_qr_ascii_render() {
        let result = render_qr_ascii("test data");
        assert!(result.is_ok());
        assert!(!result.unwrap().is_empty());
    }

    #[test]
    fn test_qr_data_url_render() {
        let url = render_qr_data_url("test data").unwrap();
        let encoded = url.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(svg.contains("<svg"));
    }
}
