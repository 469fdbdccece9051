//! Rule identifier mapping
//!
//! The filtering engine addresses rules by small positive integers while
//! declared rules carry opaque string keys. The mapping is a classic
//! multiplicative string hash folded into `[1, 2_000_000]`.
//!
//! # Collisions
//!
//! The range admits collisions between unrelated keys. Two declared rules that
//! map to the same id occupy the same engine slot and the one translated last
//! wins. No collision chaining is attempted.

/// Engine-side rule identifier.
pub type RuleId = u32;

/// Number of buckets in the id space.
const ID_BUCKETS: u32 = 2_000_000;

/// Largest id [`rule_id`] can return.
pub const MAX_RULE_ID: RuleId = ID_BUCKETS;

/// Rolling `h = h * 31 + c` over UTF-16 code units, wrapped to `i32`.
#[inline]
pub fn string_hash(key: &str) -> i32 {
    key.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Map a declared rule key onto the engine id space.
///
/// Pure function of `key`: the same key always yields the same id, so
/// repeated passes update rules in place without remembering prior
/// assignments.
#[inline]
pub fn rule_id(key: &str) -> RuleId {
    string_hash(key).unsigned_abs() % ID_BUCKETS + 1
}
