use std::fmt;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::MalformedPolicy;
use crate::error::{Result, PrepError};

/// One timed block of a subtitle file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
}

/// SRT timestamp as written in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub milliseconds: u32,
}

impl Timecode {
    /// Parse `HH:MM:SS,mmm`. A `.` is accepted in place of the comma and
    /// hours may have any number of digits.
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.trim().split(':');
        let hours = parse_digits(parts.next()?)?;
        let minutes = parse_digits(parts.next()?)?;
        let rest = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let (seconds, millis) = rest.split_once([',', '.'])?;
        let seconds = parse_digits(seconds)?;
        if millis.is_empty() || millis.len() > 3 {
            return None;
        }
        let milliseconds = parse_digits(millis)?;

        if minutes >= 60 || seconds >= 60 {
            return None;
        }

        Some(Self { hours, minutes, seconds, milliseconds })
    }

    pub fn to_seconds(&self) -> f64 {
        self.hours as f64 * 3600.0
            + self.minutes as f64 * 60.0
            + self.seconds as f64
            + self.milliseconds as f64 / 1000.0
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02},{:03}",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Read and parse an SRT file
pub async fn parse_srt_file<P: AsRef<Path>>(
    path: P,
    policy: MalformedPolicy,
) -> Result<Vec<SubtitleEntry>> {
    let path = path.as_ref();
    info!("Parsing subtitle file: {}", path.display());

    if !path.exists() {
        return Err(PrepError::FileNotFound(path.display().to_string()));
    }

    let bytes = fs::read(path).await?;
    let content = decode_subtitle_bytes(&bytes)?;
    let entries = parse_srt(&content, policy)?;

    info!("Parsed {} subtitle entries", entries.len());
    Ok(entries)
}

/// Decode raw subtitle file bytes. UTF-32 and UTF-16 byte-order marks
/// select that encoding; anything else must be UTF-8. The BOM is kept for
/// `parse_srt` to strip.
pub fn decode_subtitle_bytes(bytes: &[u8]) -> Result<String> {
    // UTF-32 LE must be checked before UTF-16 LE, they share the FF FE prefix
    if bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
        return decode_utf32(bytes, u32::from_le_bytes);
    }
    if bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
        return decode_utf32(bytes, u32::from_be_bytes);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return decode_utf16(bytes, u16::from_le_bytes);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return decode_utf16(bytes, u16::from_be_bytes);
    }

    String::from_utf8(bytes.to_vec()).map_err(|e| {
        let valid = &bytes[..e.utf8_error().valid_up_to()];
        PrepError::Parse {
            line: line_of_offset(valid),
            message: format!("file is not valid UTF-8: {}", e.utf8_error()),
        }
    })
}

fn line_of_offset(valid_prefix: &[u8]) -> usize {
    valid_prefix.iter().filter(|&&b| b == b'\n').count() + 1
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(PrepError::Parse {
            line: 0,
            message: "UTF-16 file has an odd number of bytes".to_string(),
        });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units).map_err(|e| PrepError::Parse {
        line: 0,
        message: format!("file is not valid UTF-16: {}", e),
    })
}

fn decode_utf32(bytes: &[u8], to_unit: fn([u8; 4]) -> u32) -> Result<String> {
    if bytes.len() % 4 != 0 {
        return Err(PrepError::Parse {
            line: 0,
            message: "UTF-32 file has a truncated code unit".to_string(),
        });
    }

    let mut text = String::with_capacity(bytes.len() / 4);
    let mut line = 1;
    for quad in bytes.chunks_exact(4) {
        let unit = to_unit([quad[0], quad[1], quad[2], quad[3]]);
        let ch = char::from_u32(unit).ok_or_else(|| PrepError::Parse {
            line,
            message: format!("file is not valid UTF-32: invalid code point {:#x}", unit),
        })?;
        if ch == '\n' {
            line += 1;
        }
        text.push(ch);
    }
    Ok(text)
}

/// Parse SRT content into entries, in file order
pub fn parse_srt(content: &str, policy: MalformedPolicy) -> Result<Vec<SubtitleEntry>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut entries = Vec::new();
    for (first_line, lines) in split_blocks(&normalized) {
        match parse_block(first_line, &lines) {
            Ok(entry) => entries.push(entry),
            Err(e) => match policy {
                MalformedPolicy::Abort => return Err(e),
                MalformedPolicy::Skip => warn!("Skipping malformed subtitle block: {}", e),
            },
        }
    }

    Ok(entries)
}

/// Group lines into blank-line separated blocks, keeping the 1-based line
/// number of each block's first line.
fn split_blocks(content: &str) -> Vec<(usize, Vec<&str>)> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 0;

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push((start, std::mem::take(&mut current)));
            }
            continue;
        }
        if current.is_empty() {
            start = idx + 1;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push((start, current));
    }

    blocks
}

fn parse_block(first_line: usize, lines: &[&str]) -> Result<SubtitleEntry> {
    let malformed = |offset: usize, message: String| PrepError::Parse {
        line: first_line + offset,
        message,
    };

    // Optional numeric counter before the timing line
    let timing_idx = if lines[0].contains("-->") {
        0
    } else if parse_digits(lines[0].trim()).is_some() && lines.len() > 1 {
        1
    } else {
        return Err(malformed(0, format!("expected a timing line, found {:?}", lines[0])));
    };

    let timing = lines[timing_idx];
    let (left, right) = timing
        .split_once("-->")
        .ok_or_else(|| malformed(timing_idx, format!("expected a timing line, found {:?}", timing)))?;

    let start = Timecode::parse(left)
        .ok_or_else(|| malformed(timing_idx, format!("invalid start timecode {:?}", left.trim())))?;
    // Anything after the end timecode (positioning hints) is ignored
    let end_token = right.split_whitespace().next().unwrap_or("");
    let end = Timecode::parse(end_token)
        .ok_or_else(|| malformed(timing_idx, format!("invalid end timecode {:?}", end_token)))?;

    let start_time = start.to_seconds();
    let end_time = end.to_seconds();
    if end_time < start_time {
        return Err(malformed(timing_idx, format!("end {} precedes start {}", end, start)));
    }

    let text = lines[timing_idx + 1..].join("\n").trim().to_string();
    debug!("Subtitle block at line {}: {} --> {}", first_line, start, end);

    Ok(SubtitleEntry {
        text,
        start_time,
        end_time,
        duration: end_time - start_time,
    })
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
pub fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:01:02,500 --> 00:01:04,000\n  Azul fellawen  \n\n2\n00:01:05,250 --> 00:01:07,125\nfirst line\nsecond line\n\n3\n01:00:00.000 --> 01:00:01.001\nlast\n";

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
    }

    #[test]
    fn test_timecode_to_seconds() {
        let tc = Timecode::parse("00:01:02,500").unwrap();
        assert_eq!(tc, Timecode { hours: 0, minutes: 1, seconds: 2, milliseconds: 500 });
        assert_eq!(tc.to_seconds(), 62.5);
        assert_eq!(tc.to_string(), "00:01:02,500");

        let long = Timecode::parse("123:00:00.001").unwrap();
        assert_eq!(long.hours, 123);
        assert_eq!(long.milliseconds, 1);
    }

    #[test]
    fn test_timecode_rejects_garbage() {
        for input in ["", "00:00", "00:00:00", "00:61:00,000", "aa:00:00,000", "00:00:00,1000", "00:00:00:00,000"] {
            assert!(Timecode::parse(input).is_none(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_parse_sample() {
        let entries = parse_srt(SAMPLE, MalformedPolicy::Abort).unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].text, "Azul fellawen");
        assert_eq!(entries[0].start_time, 62.5);
        assert_eq!(entries[0].end_time, 64.0);
        assert_eq!(entries[1].text, "first line\nsecond line");
        assert_eq!(entries[2].start_time, 3600.0);

        for entry in &entries {
            assert_eq!(entry.duration, entry.end_time - entry.start_time);
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse_srt(SAMPLE, MalformedPolicy::Abort).unwrap();
        let second = parse_srt(SAMPLE, MalformedPolicy::Abort).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_crlf_bom_and_missing_counter() {
        let content = "\u{feff}00:00:01,000 --> 00:00:02,000 X1:10 X2:20\r\nhello\r\n\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\n";
        let entries = parse_srt(content, MalformedPolicy::Abort).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "hello");
        assert_eq!(entries[0].end_time, 2.0);
        assert_eq!(entries[1].text, "");
    }

    #[test]
    fn test_abort_reports_line() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nok\n\n2\n00:00:xx,000 --> 00:00:04,000\nbad\n";
        match parse_srt(content, MalformedPolicy::Abort) {
            Err(PrepError::Parse { line, message }) => {
                assert_eq!(line, 6);
                assert!(message.contains("start"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_skip_drops_bad_blocks() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nok\n\nnot a block\n\n3\n00:00:05,000 --> 00:00:04,000\nbackwards\n\n4\n00:00:06,000 --> 00:00:07,000\nalso ok\n";
        let entries = parse_srt(content, MalformedPolicy::Skip).unwrap();
        let texts: Vec<_> = entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["ok", "also ok"]);

        assert!(parse_srt(content, MalformedPolicy::Abort).is_err());
    }

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[tokio::test]
    async fn test_parse_utf16_file_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windows.srt");
        std::fs::write(
            &path,
            utf16le_with_bom("1\r\n00:01:02,500 --> 00:01:04,000\r\nAzul, café\r\n"),
        )
        .unwrap();

        let entries = parse_srt_file(&path, MalformedPolicy::Abort).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Azul, café");
        assert_eq!(entries[0].start_time, 62.5);
    }

    #[tokio::test]
    async fn test_non_utf8_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.srt");
        std::fs::write(&path, b"1\n00:00:01,000 --> 00:00:02,000\ncaf\xe9\n").unwrap();

        match parse_srt_file(&path, MalformedPolicy::Abort).await {
            Err(PrepError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("UTF-8"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_other_byte_order_marks() {
        let mut utf32be = vec![0x00, 0x00, 0xFE, 0xFF];
        for ch in "00:00:01,000 --> 00:00:02,000\nhi".chars() {
            utf32be.extend_from_slice(&(ch as u32).to_be_bytes());
        }
        let text = decode_subtitle_bytes(&utf32be).unwrap();
        let entries = parse_srt(&text, MalformedPolicy::Abort).unwrap();
        assert_eq!(entries[0].text, "hi");

        let mut utf16be = vec![0xFE, 0xFF];
        for unit in "hi".encode_utf16() {
            utf16be.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_subtitle_bytes(&utf16be).unwrap(), "\u{feff}hi");

        let mut truncated = utf16le_with_bom("hi");
        truncated.push(0x41);
        assert!(matches!(decode_subtitle_bytes(&truncated), Err(PrepError::Parse { line: 0, .. })));
    }

    #[tokio::test]
    async fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.srt");
        std::fs::write(&path, SAMPLE).unwrap();

        let entries = parse_srt_file(&path, MalformedPolicy::Abort).await.unwrap();
        assert_eq!(entries.len(), 3);

        let missing = parse_srt_file(dir.path().join("nope.srt"), MalformedPolicy::Abort).await;
        assert!(matches!(missing, Err(PrepError::FileNotFound(_))));
    }
}
