//! Jenkins lookup3 hashing and file name hashes
//!
//! CASC identifies file names by a 64-bit hash of the normalized path: the
//! path is uppercased, forward slashes are folded into backslashes and the
//! result is fed to `hashlittle2()` from Bob Jenkins' lookup3.c with both
//! seeds set to zero. The two 32-bit outputs are combined as `(pc << 32) | pb`.

use std::fmt;

/// Canonical path separator used when hashing names
pub const HASH_SEPARATOR: char = '\\';

/// Jenkins96 hash result containing both 64-bit and 32-bit components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Jenkins96 {
    /// Primary 64-bit hash value
    pub hash64: u64,
    /// Secondary 32-bit hash value
    pub hash32: u32,
}

impl Jenkins96 {
    /// Compute Jenkins96 hash of data
    pub fn hash(data: &[u8]) -> Self {
        let mut pc = 0u32;
        let mut pb = 0u32;
        hashlittle2(data, &mut pc, &mut pb);

        Self {
            hash64: (u64::from(pc) << 32) | u64::from(pb),
            hash32: pc,
        }
    }
}

impl fmt::Display for Jenkins96 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}:{:08x}", self.hash64, self.hash32)
    }
}

/// Normalize a file name for hashing: ASCII uppercase, `/` becomes `\`.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    push_normalized(&mut normalized, name);
    normalized
}

/// Append the normalized form of `name` to `out`.
pub fn push_normalized(out: &mut String, name: &str) {
    out.extend(name.chars().map(|ch| match ch {
        '/' => HASH_SEPARATOR,
        other => other.to_ascii_uppercase(),
    }));
}

/// 64-bit name hash of a path.
///
/// # Examples
///
/// ```
/// use cascette_keys::name_hash;
///
/// assert_eq!(name_hash("a/b.txt"), name_hash("A\\B.TXT"));
/// ```
pub fn name_hash(path: &str) -> u64 {
    hash_normalized(normalize_name(path).as_bytes())
}

/// 64-bit name hash of an already normalized path.
pub fn hash_normalized(normalized: &[u8]) -> u64 {
    Jenkins96::hash(normalized).hash64
}

/// Compute Jenkins hash producing a single 32-bit value
///
/// This is `hashlittle()` from lookup3.c.
///
/// # Examples
///
/// ```
/// use cascette_keys::hashlittle;
///
/// assert_eq!(hashlittle(b"", 0), 0xdead_beef);
/// ```
pub fn hashlittle(data: &[u8], initval: u32) -> u32 {
    let mut pc = initval;
    let mut pb = 0u32;
    hashlittle2(data, &mut pc, &mut pb);
    pc
}

/// Compute Jenkins hash producing two 32-bit values
///
/// This is `hashlittle2()` from lookup3.c. `pc` and `pb` are the seeds on
/// input and the primary/secondary hashes on output.
pub fn hashlittle2(key: &[u8], pc: &mut u32, pb: &mut u32) {
    let mut a = 0xdead_beef_u32
        .wrapping_add(u32::try_from(key.len()).unwrap_or(u32::MAX))
        .wrapping_add(*pc);
    let mut b = a;
    let mut c = a.wrapping_add(*pb);

    if key.is_empty() {
        *pc = c;
        *pb = b;
        return;
    }

    let mut k = key;
    while k.len() > 12 {
        a = a.wrapping_add(read_le(&k[0..4]));
        b = b.wrapping_add(read_le(&k[4..8]));
        c = c.wrapping_add(read_le(&k[8..12]));
        mix(&mut a, &mut b, &mut c);
        k = &k[12..];
    }

    // Trailing 1..=12 bytes; missing bytes contribute zero
    let mut tail = [0u8; 12];
    tail[..k.len()].copy_from_slice(k);
    a = a.wrapping_add(read_le(&tail[0..4]));
    b = b.wrapping_add(read_le(&tail[4..8]));
    c = c.wrapping_add(read_le(&tail[8..12]));

    final_mix(&mut a, &mut b, &mut c);

    *pc = c;
    *pb = b;
}

fn read_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Mix 3 u32 values reversibly
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(4);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(6);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(8);
    *b = b.wrapping_add(*a);

    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(16);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(19);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(4);
    *b = b.wrapping_add(*a);
}

/// Final mixing of 3 u32 values
fn final_mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(14));

    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(11));

    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(25));

    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(16));

    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(4));

    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(14));

    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(24));
}
