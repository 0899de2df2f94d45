//! Ledger configuration.

use crate::code::DEFAULT_CODE_LENGTH;

/// Default bound on code-generation retries before giving up.
pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 10;

/// Configuration for the coupon ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// WhatsApp channel number for redemption deep links. When unset, issued
    /// tokens carry no deep link and the code is delivered some other way.
    pub whatsapp_number: Option<String>,
    /// Token code length.
    pub code_length: usize,
    /// Bound on code-generation retries.
    pub max_code_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            whatsapp_number: None,
            code_length: DEFAULT_CODE_LENGTH,
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
        }
    }
}

impl LedgerConfig {
    /// Create a configuration from environment variables.
    ///
    /// Expects:
    /// - `KIOSKO_WHATSAPP_NUMBER` - Channel number for deep links (optional)
    /// - `KIOSKO_CODE_LENGTH` - Token code length (optional, defaults to 8)
    /// - `KIOSKO_MAX_CODE_ATTEMPTS` - Code retry bound (optional, defaults to 10)
    pub fn from_env() -> Self {
        Self {
            whatsapp_number: std::env::var("KIOSKO_WHATSAPP_NUMBER")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            code_length: std::env::var("KIOSKO_CODE_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CODE_LENGTH),
            max_code_attempts: std::env::var("KIOSKO_MAX_CODE_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CODE_ATTEMPTS),
        }
    }
}
