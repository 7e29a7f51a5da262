//! Confirmation message rendering
//!
//! Pure construction of the outbound confirmation: subject, a plain-text
//! body and an HTML alternative. Rendering validates the notification
//! preconditions (recipient, date, time) and never fails on missing
//! optional fields; those render as neutral placeholders.

use booking_core::booking::Booking;
use booking_core::config::MailerConfig;
use booking_core::error::{Error, Result};

/// Placeholder for optional fields that were never supplied
const PLACEHOLDER: &str = "N/A";

/// A fully rendered confirmation message, ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    /// Sender mailbox (`"Name <addr>"` or bare address)
    pub from: String,
    /// Primary recipient (the customer)
    pub to: String,
    /// Operational copy recipient
    pub bcc: Option<String>,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text_body: String,
    /// HTML alternative body
    pub html_body: String,
}

/// Render the confirmation for a booking.
///
/// Fails fast with an invalid-input error when the booking cannot be
/// notified at all: no recipient address, or no date/time to confirm.
/// Everything else degrades to placeholders.
pub fn render_confirmation(booking: &Booking, config: &MailerConfig) -> Result<RenderedMail> {
    let recipient = booking
        .customer_email
        .as_deref()
        .map(str::trim)
        .unwrap_or("");
    if recipient.is_empty() {
        return Err(Error::invalid_notification_input(format!(
            "booking {} has no recipient email",
            booking.id
        )));
    }
    if booking.date.trim().is_empty() || booking.time.trim().is_empty() {
        return Err(Error::invalid_notification_input(format!(
            "booking {} is missing its date or time",
            booking.id
        )));
    }

    let customer = booking.customer_name.as_deref().unwrap_or("Customer");
    let location = booking.location.as_deref().unwrap_or(PLACEHOLDER);
    let category = category_label(booking);
    let renegotiate = if booking.renegotiate { "Yes" } else { "No" };

    let subject = if config.sender_name.is_empty() {
        "Your Booking Confirmation".to_string()
    } else {
        format!("Your Booking Confirmation - {}", config.sender_name)
    };

    let text_body = format!(
        "Dear {customer},\n\n\
         Your cleaning appointment has been confirmed. Here are your booking details:\n\n\
         Location: {location}\n\
         Date: {date}\n\
         Time: {time}\n\
         Cleaning type: {category}\n\
         Duration: {duration} hours\n\
         Renegotiate if longer: {renegotiate}\n\
         Price: EUR {price}\n\n\
         If you need to make any changes, simply reply to this email.\n",
        date = booking.date,
        time = booking.time,
        duration = booking.duration_hours,
        price = booking.price,
    );

    let html_body = format!(
        "<h2>Booking Confirmation</h2>\n\
         <p>Dear <strong>{customer}</strong>,</p>\n\
         <p>Your cleaning appointment has been <strong>confirmed</strong>. \
         Below are your booking details:</p>\n\
         <table>\n\
         <tr><td><strong>Location</strong></td><td>{location}</td></tr>\n\
         <tr><td><strong>Date</strong></td><td>{date}</td></tr>\n\
         <tr><td><strong>Time</strong></td><td>{time}</td></tr>\n\
         <tr><td><strong>Cleaning type</strong></td><td>{category}</td></tr>\n\
         <tr><td><strong>Duration</strong></td><td>{duration} hours</td></tr>\n\
         <tr><td><strong>Renegotiate if longer</strong></td><td>{renegotiate}</td></tr>\n\
         <tr><td><strong>Price</strong></td><td>&euro;{price}</td></tr>\n\
         </table>\n\
         <p>If you need to make any changes, simply reply to this email.</p>\n",
        date = booking.date,
        time = booking.time,
        duration = booking.duration_hours,
        price = booking.price,
    );

    Ok(RenderedMail {
        from: config.from_mailbox(),
        to: recipient.to_string(),
        bcc: config.copy_address.clone(),
        subject,
        text_body,
        html_body,
    })
}

/// Category name with human-readable add-on names appended
fn category_label(booking: &Booking) -> String {
    if booking.addons.is_empty() {
        booking.category.to_string()
    } else {
        let addons: Vec<&str> = booking.addons.iter().map(|a| a.label()).collect();
        format!("{} ({})", booking.category, addons.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_core::booking::{Booking, BookingDraft};
    use booking_core::config::MailerConfig;
    use booking_core::pricing::{AddOn, CleaningCategory};

    fn config() -> MailerConfig {
        MailerConfig {
            host: "mail.example.com".to_string(),
            port: 587,
            username: "office@example.com".to_string(),
            password: "secret".to_string(),
            sender: "office@example.com".to_string(),
            sender_name: "Cleaning Team".to_string(),
            copy_address: Some("office@example.com".to_string()),
            implicit_tls: false,
            connect_timeout_secs: 30,
            greeting_timeout_secs: 30,
            io_timeout_secs: 30,
        }
    }

    fn confirmed_booking() -> Booking {
        let draft = BookingDraft {
            location: Some("Vienna".to_string()),
            date: Some("2026-09-01".to_string()),
            time: Some("09:00".to_string()),
            duration_hours: Some(5),
            category: Some(CleaningCategory::Standard),
            addons: [AddOn::WindowCleaning].into_iter().collect(),
            renegotiate: true,
        };
        let mut booking = Booking::new(1, draft.validate().unwrap());
        booking.customer_name = Some("Maria Huber".to_string());
        booking.customer_email = Some("maria@example.com".to_string());
        booking
    }

    #[test]
    fn renders_all_booking_details() {
        let mail = render_confirmation(&confirmed_booking(), &config()).unwrap();

        assert_eq!(mail.to, "maria@example.com");
        assert_eq!(mail.bcc.as_deref(), Some("office@example.com"));
        assert_eq!(mail.from, "Cleaning Team <office@example.com>");
        assert_eq!(mail.subject, "Your Booking Confirmation - Cleaning Team");

        for body in [&mail.text_body, &mail.html_body] {
            assert!(body.contains("Maria Huber"));
            assert!(body.contains("2026-09-01"));
            assert!(body.contains("09:00"));
            assert!(body.contains("Standard (Window cleaning)"));
            assert!(body.contains("5 hours"));
            assert!(body.contains("Yes"));
        }
        // Two-decimal price: 5h at the one-addon tier
        assert!(mail.text_body.contains("EUR 210.00"));
        assert!(mail.html_body.contains("210.00"));
    }

    #[test]
    fn missing_optional_fields_render_placeholders() {
        let mut booking = confirmed_booking();
        booking.location = None;
        booking.customer_name = None;

        let mail = render_confirmation(&booking, &config()).unwrap();
        assert!(mail.text_body.contains("Location: N/A"));
        assert!(mail.text_body.contains("Dear Customer"));
    }

    #[test]
    fn missing_recipient_fails_before_rendering() {
        let mut booking = confirmed_booking();
        booking.customer_email = None;

        assert!(matches!(
            render_confirmation(&booking, &config()),
            Err(Error::InvalidNotificationInput(_))
        ));
    }

    #[test]
    fn missing_date_or_time_fails_fast() {
        let mut booking = confirmed_booking();
        booking.date = String::new();
        assert!(matches!(
            render_confirmation(&booking, &config()),
            Err(Error::InvalidNotificationInput(_))
        ));

        let mut booking = confirmed_booking();
        booking.time = "  ".to_string();
        assert!(matches!(
            render_confirmation(&booking, &config()),
            Err(Error::InvalidNotificationInput(_))
        ));
    }

    #[test]
    fn subject_without_sender_name_is_plain() {
        let mut cfg = config();
        cfg.sender_name = String::new();

        let mail = render_confirmation(&confirmed_booking(), &cfg).unwrap();
        assert_eq!(mail.subject, "Your Booking Confirmation");
        assert_eq!(mail.from, "office@example.com");
    }
}
