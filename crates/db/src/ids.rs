//! Identifier and token generation for stored entities.

use nanoid::nanoid;

const ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

fn prefixed(prefix: &str) -> String {
    format!("{}_{}", prefix, nanoid!(12, &ALPHABET))
}

pub fn licence_id() -> String {
    prefixed("lic")
}

pub fn invitation_id() -> String {
    prefixed("inv")
}

pub fn membership_id() -> String {
    prefixed("mmb")
}

pub fn snapshot_id() -> String {
    prefixed("snp")
}

pub fn reader_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 32 random bytes, hex encoded. Used as the capability in acceptance links.
pub fn invitation_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}
