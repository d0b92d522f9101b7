/// Display name shared by every GREASE code once canonicalized.
pub const GREASE_NAME: &str = "Reserved (GREASE)";

/// Check if a u16 code point is a GREASE value (RFC 8701).
///
/// GREASE values follow the pattern 0x?A?A where both bytes are identical:
/// 0x0A0A, 0x1A1A, 0x2A2A, ..., 0xFAFA. The same set is reserved in the
/// cipher suite, extension type and named group registries.
pub fn is_grease(val: u16) -> bool {
    let hi = (val >> 8) as u8;
    let lo = val as u8;
    hi == lo && (hi & 0x0F) == 0x0A
}

/// Number of GREASE values in a code list.
pub fn count_grease(values: &[u16]) -> usize {
    values.iter().filter(|v| is_grease(**v)).count()
}
