//! WhatsApp deep-link construction.
//!
//! A pure function of code + configured channel number. Rendering the link
//! as a QR image or outbound message belongs to the messaging layer.

/// Build a `wa.me` deep link that opens a chat with the kiosk's WhatsApp
/// number, prefilled with the redemption code.
pub fn wa_me_link(channel_number: &str, code: &str) -> String {
    // wa.me wants the number with no plus sign or separators.
    let number: String = channel_number.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("https://wa.me/{number}?text=REDEEM%20{code}")
}
