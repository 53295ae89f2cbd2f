//! Human-readable text derived from an [`AlertEvent`].

use core::fmt::{self, Write};

use heapless::String;

use crate::wire::{AlertEvent, GeoPoint};

/// Title of the local notification raised for every received alert.
pub const NOTIFICATION_TITLE: &str = "Emergency Alert";

pub const MAX_LINK_LEN: usize = 80;
pub const MAX_BODY_LEN: usize = 320;
pub const MAX_SMS_URL_LEN: usize = 1024;

pub type MapsLink = String<MAX_LINK_LEN>;
pub type MessageBody = String<MAX_BODY_LEN>;
pub type SmsUrl = String<MAX_SMS_URL_LEN>;

/// `https://maps.google.com/?q={lat},{lon}`
pub fn maps_link(point: GeoPoint) -> Result<MapsLink, fmt::Error> {
    let mut link = MapsLink::new();
    write!(
        link,
        "https://maps.google.com/?q={},{}",
        point.latitude, point.longitude
    )?;
    Ok(link)
}

/// Notification and text body for `event`.
///
/// `utc_offset_minutes` shifts the rendered timestamp from UTC to the
/// receiver's local time.
pub fn alert_body(event: &AlertEvent, utc_offset_minutes: i32) -> Result<MessageBody, fmt::Error> {
    let location = event.location();
    let mut body = MessageBody::new();
    write!(
        body,
        "{} may need help. Location: {:.6}, {:.6} {} Time: {}",
        event.wearer_name(),
        location.latitude,
        location.longitude,
        maps_link(location)?,
        LocalTime::new(event.timestamp(), utc_offset_minutes),
    )?;
    Ok(body)
}

/// `sms:` URL opened when no interactive composer is available.
pub fn sms_url(phone: &str, body: &str) -> Result<SmsUrl, fmt::Error> {
    let mut url = SmsUrl::new();
    write!(url, "sms:{phone}&body=")?;
    for byte in body.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            url.push(char::from(byte)).map_err(|_| fmt::Error)?;
        } else {
            write!(url, "%{byte:02X}")?;
        }
    }
    Ok(url)
}

/// Unix timestamp rendered as an en-US short date and medium time,
/// e.g. `11/14/23, 10:13:20 PM`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalTime {
    seconds: i64,
}

impl LocalTime {
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(unix_seconds: f64, utc_offset_minutes: i32) -> Self {
        let whole = if unix_seconds.is_finite() {
            libm::floor(unix_seconds) as i64
        } else {
            0
        };
        Self {
            seconds: whole.saturating_add(i64::from(utc_offset_minutes) * 60),
        }
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.seconds.div_euclid(86_400);
        let of_day = self.seconds.rem_euclid(86_400);
        let (year, month, day) = civil_from_days(days);

        let hour = of_day / 3_600;
        let minute = of_day % 3_600 / 60;
        let second = of_day % 60;
        let meridiem = if hour < 12 { "AM" } else { "PM" };
        let hour12 = match hour % 12 {
            0 => 12,
            other => other,
        };

        write!(
            f,
            "{month}/{day}/{:02}, {hour12}:{minute:02}:{second:02} {meridiem}",
            year.rem_euclid(100)
        )
    }
}

/// Proleptic Gregorian date for a day count relative to 1970-01-01.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
