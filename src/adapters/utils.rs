//! Shared string helpers for the network adapters.

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Copy `s` into a topic segment, replacing `:` with `_`.  Characters
/// beyond capacity are dropped.
pub(super) fn topic_segment<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(if c == ':' { '_' } else { c }).is_err() {
            break;
        }
    }
    out
}
