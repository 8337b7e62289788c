use std::ops::Range;

use super::{checksum, PacketType, PREAMBLE};

/// A helper to match a sequence of bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Matcher<'a> {
    needle: &'a [u8],
    start: Option<usize>,
    pos: usize,
}

/// Result of search().
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MatchResult {
    /// Match successful, with the matched range.
    Matched(Range<usize>),
    /// Match not successful.
    NotMatched,
    /// Match incomplete, with index of where match might start.
    Incomplete(usize),
}

impl<'a> Matcher<'a> {
    fn new(needle: &'a [u8]) -> Self {
        Self {
            needle,
            start: None,
            pos: 0,
        }
    }

    fn test(&mut self, i: usize, b: u8) -> Option<Range<usize>> {
        if b != self.needle[self.pos] {
            self.start = None;
            self.pos = 0;
        }

        // a mismatch may still be the first byte of a fresh match
        if b == self.needle[self.pos] {
            if self.pos == 0 {
                self.start = Some(i);
            }
            self.pos += 1;
            if self.pos == self.needle.len() {
                return self.start.map(|s| s..s + self.needle.len());
            }
        }

        None
    }

    // search the iterator for our needle.
    // not matched means it was not found anywhere inside.
    // incomplete means we found a partial needle at the end
    fn search(&mut self, iter: impl Iterator<Item = (usize, u8)>) -> MatchResult {
        for (i, b) in iter {
            if let Some(range) = self.test(i, b) {
                return MatchResult::Matched(range);
            }
        }

        if let Some(start) = self.start {
            MatchResult::Incomplete(start)
        } else {
            MatchResult::NotMatched
        }
    }
}

/// Find the first preamble at or after `from`.
fn search_preamble(input: &[u8], from: usize) -> MatchResult {
    let bytes = input.iter().copied().enumerate().skip(from);
    Matcher::new(&PREAMBLE).search(bytes)
}

/// Find the first preamble in the input, or a partial preamble at the
/// very end that more data might complete.
pub fn preamble_start(input: &[u8]) -> Option<usize> {
    match search_preamble(input, 0) {
        MatchResult::Matched(range) => Some(range.start),
        MatchResult::Incomplete(start) => Some(start),
        MatchResult::NotMatched => None,
    }
}

/// Check the trailing checksum of a complete declared frame.
fn checksum_ok(bytes: &[u8]) -> bool {
    let (body, sum) = bytes.split_at(bytes.len() - 2);
    checksum::checksum(body) == u16::from_be_bytes([sum[0], sum[1]])
}

/// Find the first frame in the input.
///
/// A frame is as long as its type byte declares. Until that many bytes
/// are present nothing is returned, even if the partial payload happens
/// to spell the preamble. Once the declared span is present but fails
/// its checksum, the frame instead runs from its preamble to the start
/// of the next one, so a truncated frame does not swallow the frame
/// behind it.
///
/// Returns the range of the frame, or None if no frame can be
/// isolated yet. Everything before the range may be discarded along
/// with the frame.
pub fn find_frame(input: &[u8]) -> Option<Range<usize>> {
    let start = match search_preamble(input, 0) {
        MatchResult::Matched(range) => range.start,
        // no preamble, or only part of one at the very end
        MatchResult::NotMatched | MatchResult::Incomplete(_) => return None,
    };

    let type_byte = *input.get(start + PREAMBLE.len())?;
    let end = start + PacketType::from_byte(type_byte).frame_len();
    let declared = input.get(start..end)?;
    if checksum_ok(declared) {
        return Some(start..end);
    }

    match search_preamble(input, start + PREAMBLE.len()) {
        MatchResult::Matched(next) => Some(start..next.start),
        // might be a longer frame, wait for more data
        MatchResult::NotMatched | MatchResult::Incomplete(_) => None,
    }
}

/// Carve the next frame out of a buffer.
///
/// Returns the frame and the rest of the buffer after it, or None and
/// the whole, unchanged buffer if no frame can be isolated yet.
pub fn extract_next_frame(buffer: &[u8]) -> (Option<&[u8]>, &[u8]) {
    match find_frame(buffer) {
        Some(range) => (Some(&buffer[range.clone()]), &buffer[range.end..]),
        None => (None, buffer),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::build_request_frame;

    fn health(value: u32) -> Vec<u8> {
        build_request_frame(0x80, 0x55, &value.to_be_bytes())
    }

    #[test]
    fn extract_empty() {
        assert_eq!(extract_next_frame(b""), (None, b"".as_ref()));
    }

    #[test]
    fn extract_discard_nothing_without_preamble() {
        let data = b"abcdef";
        let (frame, rest) = extract_next_frame(data);
        assert_eq!(frame, None);
        assert_eq!(rest, data);

        // and again, nothing changes
        let (frame, rest) = extract_next_frame(rest);
        assert_eq!(frame, None);
        assert_eq!(rest, data);
    }

    #[test]
    fn extract_incomplete_prefix() {
        let data = b"abcsn";
        assert_eq!(extract_next_frame(data), (None, data.as_ref()));
    }

    #[test]
    fn extract_incomplete_frame() {
        let frame = health(7);
        let data = &frame[..9];
        assert_eq!(extract_next_frame(data), (None, data));
    }

    #[test]
    fn extract_complete_single() {
        let frame = health(7);
        assert_eq!(
            extract_next_frame(&frame),
            (Some(frame.as_ref()), b"".as_ref())
        );
    }

    #[test]
    fn extract_skips_leading_garbage() {
        let frame = health(7);
        let mut data = b"xyz".to_vec();
        data.extend_from_slice(&frame);
        assert_eq!(find_frame(&data), Some(3..14));
    }

    #[test]
    fn extract_back_to_back() {
        let a = health(1);
        let b = health(2);
        let data = [a.clone(), b.clone()].concat();

        let (frame, rest) = extract_next_frame(&data);
        assert_eq!(frame, Some(a.as_ref()));
        let (frame, rest) = extract_next_frame(rest);
        assert_eq!(frame, Some(b.as_ref()));
        assert_eq!(extract_next_frame(rest), (None, b"".as_ref()));
    }

    #[test]
    fn extract_corrupt_frame_delimited_by_next_preamble() {
        let mut a = health(1);
        a[6] ^= 0x40;
        let b = health(2);
        let data = [a.clone(), b.clone()].concat();

        let (frame, rest) = extract_next_frame(&data);
        assert_eq!(frame, Some(a.as_ref()));
        assert_eq!(rest, b.as_slice());
    }

    #[test]
    fn extract_truncated_frame_delimited_by_next_preamble() {
        let a = health(1);
        let b = health(2);
        let data = [&a[..8], &b[..]].concat();

        let (frame, rest) = extract_next_frame(&data);
        assert_eq!(frame, Some(&a[..8]));
        assert_eq!(rest, b.as_slice());
    }

    #[test]
    fn extract_preamble_inside_payload() {
        let a = build_request_frame(0x80, 0x55, b"snp!");
        let b = health(2);
        let data = [a.clone(), b.clone()].concat();

        let (frame, rest) = extract_next_frame(&data);
        assert_eq!(frame, Some(a.as_ref()));
        assert_eq!(rest, b.as_slice());
    }

    #[test]
    fn extract_waits_for_payload_spelling_preamble() {
        let a = build_request_frame(0x80, 0x55, b"snp!");
        let b = health(2);
        let data = [a.clone(), b.clone()].concat();

        // the inner "snp" is no frame boundary while the span is short
        for len in 0..a.len() {
            assert_eq!(find_frame(&data[..len]), None, "length {}", len);
        }
        assert_eq!(find_frame(&data[..a.len()]), Some(0..a.len()));
    }

    #[test]
    fn extract_corrupt_frame_waits_for_next_preamble() {
        let mut a = health(1);
        a[6] ^= 0x40;
        assert_eq!(find_frame(&a), None);

        let mut data = a.clone();
        data.extend_from_slice(b"sn");
        assert_eq!(find_frame(&data), None);
        data.push(b'p');
        assert_eq!(find_frame(&data), Some(0..a.len()));
    }

    #[test]
    fn preamble_start_finds_partial_tail() {
        assert_eq!(preamble_start(b"abc"), None);
        assert_eq!(preamble_start(b"abcsn"), Some(3));
        assert_eq!(preamble_start(b"xsnpsn"), Some(1));
    }

    #[test]
    fn extract_repeated_preamble_prefix() {
        let frame = health(3);
        let mut data = b"ssnsn".to_vec();
        data.extend_from_slice(&frame);
        assert_eq!(find_frame(&data), Some(5..16));
    }
}
