use super::line::LineParser;
use crate::aggregate::types::Metrics;
use crate::error::Result;

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Runs `parser` over the lines in `[offset, offset + length)` of `path`.
///
/// The range is expected to be line-aligned. A trailing line without a newline is
/// still parsed. Invalid UTF-8 is replaced rather than rejected.
pub fn process_chunk<P: LineParser + ?Sized>(
    path: &Path,
    offset: u64,
    length: u64,
    parser: &P,
) -> Result<Metrics> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    parse_lines(BufReader::new(file.take(length)), parser)
}

/// Runs `parser` over the whole file sequentially.
pub fn process_whole_file<P: LineParser + ?Sized>(path: &Path, parser: &P) -> Result<Metrics> {
    parse_lines(BufReader::new(File::open(path)?), parser)
}

fn parse_lines<R: BufRead, P: LineParser + ?Sized>(mut reader: R, parser: &P) -> Result<Metrics> {
    let mut metrics = Metrics::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        parser.parse_line(line.trim_end_matches(['\n', '\r']), &mut metrics);
    }

    Ok(metrics)
}
