//! Stderr stamp format shared by the sandbox runner and the engine
//!
//! The sandbox runner relays the artifact's stderr with a leading
//! `YYYY/MM/DD HH:MM:SS ` stamp. The engine removes that stamp before putting
//! the text into a runtime error.

use chrono::{Local, NaiveDateTime};

/// strftime pattern of the stamp, trailing separator included
pub const STAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S ";

/// Byte width of a rendered stamp
pub const STAMP_WIDTH: usize = 20;

/// Render the stamp for the current local time
pub fn now() -> String {
    Local::now().format(STAMP_FORMAT).to_string()
}

/// Prefix `text` with the current stamp
pub fn stamp(text: &str) -> String {
    format!("{}{}", now(), text)
}

/// Remove a leading stamp from `text`.
///
/// Text that does not start with a well-formed stamp is returned unchanged,
/// so stderr written by something other than the sandbox runner is never
/// truncated.
pub fn strip(text: &str) -> &str {
    let Some(head) = text.get(..STAMP_WIDTH) else {
        return text;
    };

    match NaiveDateTime::parse_from_str(head.trim_end(), STAMP_FORMAT.trim_end()) {
        Ok(_) => &text[STAMP_WIDTH..],
        Err(_) => text,
    }
}
