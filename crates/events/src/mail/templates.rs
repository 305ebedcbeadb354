//! Plain-text bodies for the emails the API sends.

use atelier_core::types::Timestamp;

use super::OutgoingEmail;

/// Sign-in link email. `link` already carries the token.
pub fn magic_link(to: &str, link: &str, expires_at: Timestamp) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Your Atelier sign-in link".to_string(),
        body: format!(
            "Click the link below to sign in to Atelier:\n\n{link}\n\n\
             The link can be used once and expires at {} UTC.\n\
             If you did not request it, you can ignore this email.\n",
            expires_at.format("%Y-%m-%d %H:%M")
        ),
    }
}

/// Receipt sent after a checkout completes and the license is active.
pub fn license_receipt(
    to: &str,
    tier: &str,
    seats: i32,
    amount_cents: Option<i64>,
    currency: Option<&str>,
) -> OutgoingEmail {
    let amount = match (amount_cents, currency) {
        (Some(cents), Some(currency)) => format!(
            "{}.{:02} {}",
            cents / 100,
            cents % 100,
            currency.to_uppercase()
        ),
        _ => "n/a".to_string(),
    };
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Your Atelier {tier} license is active"),
        body: format!(
            "Thanks for your purchase.\n\n\
             Plan: {tier}\nSeats: {seats}\nAmount: {amount}\n\n\
             Every {tier} component is now unlocked for your account.\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn magic_link_contains_link_and_expiry() {
        let expires = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        let email = magic_link("a@example.com", "https://app/auth/verify?token=abc", expires);
        assert_eq!(email.to, "a@example.com");
        assert!(email.body.contains("https://app/auth/verify?token=abc"));
        assert!(email.body.contains("2025-03-01 12:30"));
    }

    #[test]
    fn receipt_formats_amount() {
        let email = license_receipt("a@example.com", "pro", 1, Some(14905), Some("usd"));
        assert!(email.subject.contains("pro"));
        assert!(email.body.contains("149.05 USD"));

        let email = license_receipt("a@example.com", "team", 5, None, None);
        assert!(email.body.contains("Amount: n/a"));
        assert!(email.body.contains("Seats: 5"));
    }
}
