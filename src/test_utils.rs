//! Shared test fixtures.
//!
//! Synthesizes minimal but fully valid WAV files (PCM header plus a RIFF
//! INFO tag list) so tests can exercise real tag extraction, content
//! sniffing, and end-to-end reconciliation without checked-in binary
//! fixtures. 8 kHz mono 8-bit PCM keeps the files small and makes the
//! duration exactly the requested number of seconds.

use std::path::Path;

const SAMPLE_RATE: u32 = 8000;

fn chunk(id: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + data.len() + 1);
    out.extend_from_slice(id);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 != 0 {
        // RIFF chunks are word-aligned; the pad byte is not part of the size
        out.push(0);
    }
    out
}

fn info_value(value: &str) -> Vec<u8> {
    let mut data = value.as_bytes().to_vec();
    data.push(0); // INFO strings are null-terminated
    data
}

/// Write a PCM WAV of `seconds` duration with the given RIFF INFO entries.
///
/// `info` entries are (four-character code, value) pairs, e.g.
/// `("INAM", "Title")`, `("IART", "Artist")`, `("IPRD", "Album")`,
/// `("IGNR", "Genre")`. Pass an empty slice for an untagged file.
pub fn write_wav(path: &Path, seconds: u32, info: &[(&str, &str)]) {
    let mut fmt = Vec::new();
    fmt.extend_from_slice(&1u16.to_le_bytes()); // PCM
    fmt.extend_from_slice(&1u16.to_le_bytes()); // mono
    fmt.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    fmt.extend_from_slice(&SAMPLE_RATE.to_le_bytes()); // byte rate
    fmt.extend_from_slice(&1u16.to_le_bytes()); // block align
    fmt.extend_from_slice(&8u16.to_le_bytes()); // bits per sample

    // 8-bit PCM silence is the 0x80 midpoint
    let samples = vec![0x80u8; (seconds * SAMPLE_RATE) as usize];

    let mut body = Vec::new();
    body.extend_from_slice(b"WAVE");
    body.extend_from_slice(&chunk(b"fmt ", &fmt));
    body.extend_from_slice(&chunk(b"data", &samples));

    if !info.is_empty() {
        let mut list = Vec::new();
        list.extend_from_slice(b"INFO");
        for (key, value) in info {
            let id: [u8; 4] = key.as_bytes().try_into().expect("INFO key must be 4 bytes");
            list.extend_from_slice(&chunk(&id, &info_value(value)));
        }
        body.extend_from_slice(&chunk(b"LIST", &list));
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);

    std::fs::write(path, out).expect("failed to write test wav");
}

/// Write a tagged WAV with the usual title/artist/album/genre fields.
pub fn write_tagged_wav(
    path: &Path,
    seconds: u32,
    title: &str,
    artist: &str,
    album: &str,
    genre: &str,
) {
    let mut info: Vec<(&str, &str)> = Vec::new();
    if !title.is_empty() {
        info.push(("INAM", title));
    }
    if !artist.is_empty() {
        info.push(("IART", artist));
    }
    if !album.is_empty() {
        info.push(("IPRD", album));
    }
    if !genre.is_empty() {
        info.push(("IGNR", genre));
    }
    write_wav(path, seconds, &info);
}

/// A tiny valid 1x1 PNG, for directory/manual artwork fixtures.
pub fn png_bytes() -> Vec<u8> {
    // Signature + IHDR + IDAT (one zlib-deflated zero row) + IEND
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x00, 0x00, 0x00, 0x00, 0x3A,
        0x7E, 0x9B, 0x55, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x60,
        0x00, 0x00, 0x00, 0x02, 0x00, 0x01, 0x73, 0x75, 0x01, 0x18, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_is_parseable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.wav");
        write_tagged_wav(&path, 2, "T", "A", "Alb", "G");

        use lofty::file::{AudioFile, TaggedFileExt};
        let tagged = lofty::probe::Probe::open(&path).unwrap().read().unwrap();
        assert!(tagged.first_tag().is_some());
        assert_eq!(tagged.properties().duration().as_secs(), 2);
    }

    #[test]
    fn test_png_bytes_sniff_as_png() {
        assert_eq!(
            image::guess_format(&png_bytes()).unwrap(),
            image::ImageFormat::Png
        );
    }
}
