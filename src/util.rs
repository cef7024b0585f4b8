// Copyright 2020 CoreOS, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Convert an identity byte string from a device response into a printable
/// string, dropping leading/trailing ASCII whitespace and NUL padding.
/// Identity fields are nominally ASCII but real hardware ships garbage, so
/// non-UTF-8 bytes are replaced rather than rejected.
pub fn trim_byte_string(bytes: &[u8]) -> String {
    let is_padding = |b: &u8| b.is_ascii_whitespace() || *b == 0;
    let start = match bytes.iter().position(|b| !is_padding(b)) {
        Some(start) => start,
        None => return String::new(),
    };
    let end = bytes.iter().rposition(|b| !is_padding(b)).unwrap();
    String::from_utf8_lossy(&bytes[start..=end]).into_owned()
}

/// Decode an ATA IDENTIFY string field.  ATA strings are stored as 16-bit
/// words with the characters swapped within each word, so each byte pair
/// is swapped back before trimming.
pub fn ata_string(bytes: &[u8]) -> String {
    let mut swapped = Vec::with_capacity(bytes.len());
    for pair in bytes.chunks(2) {
        if pair.len() == 2 {
            swapped.push(pair[1]);
        }
        swapped.push(pair[0]);
    }
    trim_byte_string(&swapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_byte_string_variants() {
        assert_eq!(trim_byte_string(b"  WDC WD10EZEX  "), "WDC WD10EZEX");
        assert_eq!(trim_byte_string(b"PLEXTOR \x00\x00"), "PLEXTOR");
        assert_eq!(trim_byte_string(b"\x00\x00  \x00"), "");
        assert_eq!(trim_byte_string(b""), "");
        assert_eq!(trim_byte_string(b"X"), "X");
        // interior whitespace is preserved
        assert_eq!(trim_byte_string(b" DVD RW AD-7200A "), "DVD RW AD-7200A");
    }

    #[test]
    fn ata_string_swaps_pairs() {
        // "SERIAL12" is stored on the wire as "ESIRLA21"
        assert_eq!(ata_string(b"ESIRLA21"), "SERIAL12");
        // odd trailing byte is kept in place
        assert_eq!(ata_string(b"BAX"), "ABX");
        assert_eq!(ata_string(b""), "");
        assert_eq!(ata_string(b"OTHSBI A"), "TOSHIBA");
    }
}
