//! Protocol module for the session client.
//!
//! Contains the session-backed client and the QR pairing flow.

pub mod qr;
mod session;

pub use qr::{render_qr_ascii, render_qr_data_url, QRError, QRPairing};
pub use session::SessionClient;
