//! Content fingerprinting for duplicate detection.
//!
//! The fingerprint is the classic 31-multiplier string hash over the UTF-16
//! code units of `title + body`, in wrapping 32-bit arithmetic. It is an
//! equality proxy only: collisions merge two saves into one record.

/// Returns the fingerprint of the concatenation `title + body`.
pub fn fingerprint(title: &str, body: &str) -> i32 {
    title
        .encode_utf16()
        .chain(body.encode_utf16())
        .fold(0i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        })
}
