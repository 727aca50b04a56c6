use log::{debug, warn};
use scan_fmt::*;
use std::fs;
use std::io;
use std::io::BufReader;

pub const BEGIN_MARKER: &str = "; thumbnail begin";
pub const END_MARKER: &str = "; thumbnail end";

/// Dimensions and payload length a slicer announces on the begin marker line,
/// e.g. `; thumbnail begin 300x300 12345`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHint {
    pub width: u32,
    pub height: u32,
    pub length: usize,
}

impl SizeHint {
    fn parse(line: &str) -> Option<Self> {
        let (width, height, length) =
            scan_fmt!(line, "; thumbnail begin {d}x{d} {d}", u32, u32, usize).ok()?;

        Some(Self { width, height, length })
    }
}

/// The base64 text of one terminated thumbnail block
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub payload: String,
    pub hint: Option<SizeHint>,
}

impl Candidate {
    /// Length of the payload in characters
    pub fn len(&self) -> usize {
        self.payload.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

struct Capture {
    payload: String,
    hint: Option<SizeHint>,
    first_line: usize,
}

/// Lazily yields every terminated thumbnail block of a G-code document in document order
pub struct Candidates<R> {
    reader: R,
    capture: Option<Capture>,
    line: Vec<u8>,
    line_number: usize,
    finished: bool,
}

impl<R: io::BufRead> Candidates<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            capture: None,
            line: Vec::new(),
            line_number: 0,
            finished: false,
        }
    }

    fn read_line(&mut self) -> Option<String> {
        self.line.clear();

        match self.reader.read_until(b'\n', &mut self.line) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;

                if self.line.ends_with(b"\n") {
                    self.line.pop();
                }
                if self.line.ends_with(b"\r") {
                    self.line.pop();
                }

                Some(String::from_utf8_lossy(&self.line).into_owned())
            }
            Err(err) => {
                warn!("stopped reading after line {}: {}", self.line_number, err);
                None
            }
        }
    }

    fn drop_capture(&mut self) {
        if let Some(capture) = self.capture.take() {
            debug!(
                "dropping unterminated thumbnail block starting at line {}",
                capture.first_line
            );
        }
    }
}

impl<R: io::BufRead> Iterator for Candidates<R> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        if self.finished {
            return None;
        }

        while let Some(line) = self.read_line() {
            if line.starts_with(BEGIN_MARKER) {
                self.drop_capture();
                self.capture = Some(Capture {
                    payload: String::new(),
                    hint: SizeHint::parse(&line),
                    first_line: self.line_number,
                });
            } else if line == END_MARKER {
                if let Some(capture) = self.capture.take() {
                    return Some(Candidate {
                        payload: capture.payload,
                        hint: capture.hint,
                    });
                }
            } else if let Some(capture) = self.capture.as_mut() {
                capture.payload.push_str(strip_comment_prefix(&line));
            }
        }

        self.finished = true;
        self.drop_capture();

        None
    }
}

/// Skips the comment marker and the separator in front of a payload fragment
fn strip_comment_prefix(line: &str) -> &str {
    line.char_indices().nth(2).map_or("", |(i, _)| &line[i..])
}

pub fn extract_candidates<R: io::BufRead>(reader: R) -> Candidates<R> {
    Candidates::new(reader)
}

pub fn extract_candidates_from_file(filename: &str) -> anyhow::Result<Candidates<BufReader<fs::File>>> {
    let file = fs::File::open(filename)?;
    Ok(extract_candidates(BufReader::new(file)))
}

/// Picks the longest candidate, the first one wins on ties
pub fn select_best(candidates: impl IntoIterator<Item = Candidate>) -> Option<Candidate> {
    candidates
        .into_iter()
        .map(|candidate| (candidate.len(), candidate))
        .fold(None, |best: Option<(usize, Candidate)>, (len, candidate)| match best {
            Some(best) if best.0 >= len => Some(best),
            _ => Some((len, candidate)),
        })
        .map(|(_, candidate)| candidate)
}

#[cfg(test)]
mod test {
    use crate::parser::*;
    use std::io::Cursor;

    const CALIBRATION_CUBE: &'static [u8] = include_bytes!("test_gcode/calibration_cube.gcode");

    fn candidates(text: &str) -> Vec<Candidate> {
        extract_candidates(Cursor::new(text.as_bytes())).collect()
    }

    fn payloads(text: &str) -> Vec<String> {
        candidates(text).into_iter().map(|c| c.payload).collect()
    }

    fn candidate(payload: &str) -> Candidate {
        Candidate {
            payload: payload.to_string(),
            hint: None,
        }
    }

    #[test]
    fn single_block_test() {
        let text = "G28\n; thumbnail begin 2x2 8\n; AAAA\n; BBBB\n; thumbnail end\nG1 X0\n";

        let found = candidates(text);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, "AAAABBBB");
        assert_eq!(
            found[0].hint,
            Some(SizeHint {
                width: 2,
                height: 2,
                length: 8
            })
        );
    }

    #[test]
    fn crlf_test() {
        let text = "; thumbnail begin\r\n; AAAA\r\n; BB==\r\n; thumbnail end\r\n";
        assert_eq!(payloads(text), vec!["AAAABB=="]);
    }

    #[test]
    fn multiple_blocks_in_document_order_test() {
        let text = "; thumbnail begin\n; one\n; thumbnail end\n;\n; thumbnail begin\n; two\n; thumbnail end\n";
        assert_eq!(payloads(text), vec!["one", "two"]);
    }

    #[test]
    fn unterminated_block_test() {
        // a begin marker restarts the capture, the incomplete block is dropped
        let text = "; thumbnail begin\n; lost\n; thumbnail begin\n; kept\n; thumbnail end\n";
        assert_eq!(payloads(text), vec!["kept"]);

        let text = "; thumbnail begin\n; kept\n; thumbnail end\n; thumbnail begin\n; lost\n";
        assert_eq!(payloads(text), vec!["kept"]);

        let text = "; thumbnail begin\n; lost\n";
        assert!(payloads(text).is_empty());
    }

    #[test]
    fn end_marker_must_match_exactly_test() {
        let text = "; thumbnail begin\n; AAAA\n; thumbnail end \n; BBBB\n; thumbnail end\n";
        assert_eq!(payloads(text), vec!["AAAAthumbnail end BBBB"]);
    }

    #[test]
    fn stray_end_marker_test() {
        let text = "; thumbnail end\nG1 X1\n; thumbnail begin\n; AAAA\n; thumbnail end\n";
        assert_eq!(payloads(text), vec!["AAAA"]);
    }

    #[test]
    fn short_lines_test() {
        let text = "; thumbnail begin\n;\n\n; AAAA\n;;\nx\n; thumbnail end\n";
        assert_eq!(payloads(text), vec!["AAAA"]);
    }

    #[test]
    fn strip_comment_prefix_test() {
        assert_eq!(strip_comment_prefix("; QUJD"), "QUJD");
        assert_eq!(strip_comment_prefix(";;"), "");
        assert_eq!(strip_comment_prefix(";"), "");
        assert_eq!(strip_comment_prefix(""), "");
        assert_eq!(strip_comment_prefix("äöx"), "x");
    }

    #[test]
    fn invalid_utf8_test() {
        let text: &[u8] = b"\xff\xfe\n; thumbnail begin\n; AB\xffCD\n; thumbnail end\n";
        let found: Vec<Candidate> = extract_candidates(Cursor::new(text)).collect();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, "AB\u{FFFD}CD");
    }

    #[test]
    fn hint_test() {
        assert_eq!(
            SizeHint::parse("; thumbnail begin 300x200 4567"),
            Some(SizeHint {
                width: 300,
                height: 200,
                length: 4567
            })
        );
        assert_eq!(SizeHint::parse("; thumbnail begin"), None);
        assert_eq!(SizeHint::parse("; thumbnail begin big"), None);
    }

    #[test]
    fn select_best_test() {
        assert_eq!(select_best(Vec::new()), None);

        let best = select_best(vec![candidate("aa"), candidate("aaaa"), candidate("aaa")]);
        assert_eq!(best, Some(candidate("aaaa")));
    }

    #[test]
    fn select_best_first_wins_test() {
        let best = select_best(vec![candidate("ab"), candidate("cd"), candidate("e")]);
        assert_eq!(best, Some(candidate("ab")));
    }

    #[test]
    fn select_best_counts_characters_test() {
        // 8 bytes but only 4 characters
        let best = select_best(vec![candidate("ääää"), candidate("abcde")]);
        assert_eq!(best, Some(candidate("abcde")));
    }

    #[test]
    fn calibration_cube_test() {
        let found: Vec<Candidate> = extract_candidates(Cursor::new(CALIBRATION_CUBE)).collect();

        assert_eq!(found.len(), 2);
        for c in &found {
            assert_eq!(c.len(), c.hint.unwrap().length);
        }

        let best = select_best(found).unwrap();
        assert_eq!(
            best.hint,
            Some(SizeHint {
                width: 32,
                height: 24,
                length: 1764
            })
        );
    }
}
