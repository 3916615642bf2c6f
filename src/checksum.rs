/// Internet checksum (RFC 1071) over `buf`.
///
/// An odd trailing byte is treated as the high byte of a final word. The
/// empty buffer checksums to `0xFFFF`.
pub fn checksum(buf: &[u8]) -> u16 {
    let mut words = buf.chunks_exact(2);
    let mut sum: u64 = 0;
    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u64;
    }
    if let [last] = words.remainder() {
        sum += (*last as u64) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    !(sum as u16)
}

/// Receiver-side check: a message carrying its true checksum sums to `0xFFFF`.
pub fn is_valid(message: &[u8]) -> bool {
    checksum(message) == 0
}
