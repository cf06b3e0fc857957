/// Upper bound on code units read from any single embedded native string.
pub const MAX_WIDE_UNITS: usize = 4096;

/// Reads a NUL-terminated UTF-16 string. Null yields an empty string; a
/// string with no terminator inside `MAX_WIDE_UNITS` is cut at the cap.
///
/// # Safety
///
/// A non-null `ptr` must be readable up to its terminator or
/// `MAX_WIDE_UNITS` code units, whichever comes first.
#[allow(unsafe_code)]
pub unsafe fn string_from_wide_ptr(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0usize;
    while len < MAX_WIDE_UNITS && unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    if len == MAX_WIDE_UNITS {
        tracing::warn!(cap = MAX_WIDE_UNITS, "unterminated native string truncated");
    }
    let units = unsafe { std::slice::from_raw_parts(ptr, len) };
    String::from_utf16_lossy(units)
}

/// Reads exactly `units` UTF-16 code units without scanning for a
/// terminator. Lengths above `MAX_WIDE_UNITS` are clamped.
///
/// # Safety
///
/// A non-null `ptr` must be readable for `min(units, MAX_WIDE_UNITS)` code
/// units.
#[allow(unsafe_code)]
pub unsafe fn string_from_counted(ptr: *const u16, units: usize) -> String {
    if ptr.is_null() || units == 0 {
        return String::new();
    }
    let len = if units > MAX_WIDE_UNITS {
        tracing::warn!(units, cap = MAX_WIDE_UNITS, "oversized native string truncated");
        MAX_WIDE_UNITS
    } else {
        units
    };
    let units = unsafe { std::slice::from_raw_parts(ptr, len) };
    String::from_utf16_lossy(units)
}

/// Encodes `s` as a NUL-terminated UTF-16 buffer for passing into native calls.
pub fn to_wide_nul(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::{MAX_WIDE_UNITS, string_from_counted, string_from_wide_ptr, to_wide_nul};

    #[test]
    fn null_pointers_are_empty() {
        assert_eq!(unsafe { string_from_wide_ptr(std::ptr::null()) }, "");
        assert_eq!(unsafe { string_from_counted(std::ptr::null(), 12) }, "");
    }

    #[test]
    fn terminated_string_stops_at_nul() {
        let wide = to_wide_nul(r"C:\Shares\Réports");
        assert_eq!(unsafe { string_from_wide_ptr(wide.as_ptr()) }, r"C:\Shares\Réports");
    }

    #[test]
    fn counted_string_ignores_trailing_units() {
        let wide: Vec<u16> = "ACMEjunk".encode_utf16().collect();
        assert_eq!(unsafe { string_from_counted(wide.as_ptr(), 4) }, "ACME");
    }

    #[test]
    fn unterminated_string_is_capped() {
        let wide = vec![u16::from(b'a'); MAX_WIDE_UNITS + 10];
        let s = unsafe { string_from_wide_ptr(wide.as_ptr()) };
        assert_eq!(s.len(), MAX_WIDE_UNITS);
    }

    #[test]
    fn oversized_counted_length_is_clamped() {
        let wide = vec![u16::from(b'z'); MAX_WIDE_UNITS];
        let s = unsafe { string_from_counted(wide.as_ptr(), usize::from(u16::MAX)) };
        assert_eq!(s.len(), MAX_WIDE_UNITS);
    }
}
