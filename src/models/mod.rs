//! API data models
//!
//! Defines the contact and file objects returned by the API, plus the
//! public identifier scheme shared by both.

pub mod contact;
pub mod file;

pub use contact::Contact;
pub use file::{trim_filename, Disposition, File, NewFile};

use uuid::Uuid;

/// Width of a public id; 36^25 covers the full 128-bit UUID range
const PUBLIC_ID_LEN: usize = 25;

/// Generate a new public identifier
///
/// Public ids are random (v4) UUIDs rendered in lowercase base 36 and
/// left-padded with zeros to a fixed width.
pub fn generate_public_id() -> String {
    encode_base36(Uuid::new_v4().as_u128())
}

fn encode_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = [b'0'; PUBLIC_ID_LEN];
    let mut pos = PUBLIC_ID_LEN;
    while value > 0 {
        pos -= 1;
        buf[pos] = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    buf.iter().map(|&b| b as char).collect()
}
