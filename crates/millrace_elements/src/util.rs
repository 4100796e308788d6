//! Small protocol helpers shared by the IP-path elements.

/// RFC 1071 internet checksum over `data`, with odd trailing bytes padded
/// with zero. The caller zeroes the checksum field before calling.
#[must_use]
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(u16::from_be_bytes([*last, 0]));
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Milliseconds since midnight UTC, the encoding the IP timestamp option
/// carries.
#[must_use]
pub fn millis_since_midnight(timestamp: millrace_core::Timestamp) -> u32 {
    (timestamp.as_millis() % 86_400_000) as u32
}
