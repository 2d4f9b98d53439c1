//! Pure validators for the caller-entered identity fields.
//!
//! All three accept whatever the collaborator captured (DTMF digits may
//! arrive with separators) and judge only the digit content. Handlers store
//! the stripped digit string, so record matching stays exact string equality.

use chrono::NaiveDate;

/// The digit characters of `raw`, in order, with everything else stripped.
pub fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True iff exactly 4 digit characters remain after stripping.
pub fn digits4(raw: &str) -> bool {
    digits(raw).len() == 4
}

/// True iff exactly 5 digit characters remain after stripping (ZIP).
pub fn digits5(raw: &str) -> bool {
    digits(raw).len() == 5
}

/// True iff `raw` reduces to exactly 8 digits read as MMDDYYYY naming a real
/// calendar date: month in [1,12], year >= 1900, day accepted by the calendar
/// for that month and year (Feb 30 and non-leap Feb 29 fail), and the date is
/// not after `today`.
pub fn date_of_birth(raw: &str, today: NaiveDate) -> bool {
    let cleaned = digits(raw);
    if cleaned.len() != 8 {
        return false;
    }

    // Slices of an all-digit ASCII string, parse cannot fail
    let month: u32 = match cleaned[0..2].parse() {
        Ok(m) => m,
        Err(_) => return false,
    };
    let day: u32 = match cleaned[2..4].parse() {
        Ok(d) => d,
        Err(_) => return false,
    };
    let year: i32 = match cleaned[4..8].parse() {
        Ok(y) => y,
        Err(_) => return false,
    };

    if !(1..=12).contains(&month) || year < 1900 {
        return false;
    }

    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date <= today,
        None => false,
    }
}
