use crate::error::{AnalyzerError, Result};
use crate::ledger::types::{Chunk, ChunkId};

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Splits `[0, file_size)` into at most `target` line-aligned chunks.
///
/// Nominal boundaries divide the file evenly; each one is then moved forward to the
/// start of the next line. Boundaries that collapse onto the previous one or run off
/// the end of the file are dropped, so short files yield fewer chunks than asked
/// for but never an empty one. The last chunk absorbs the remainder.
pub fn partition<R: Read + Seek>(reader: R, file_size: u64, target: usize) -> Result<Vec<Chunk>> {
    if file_size == 0 {
        return Err(AnalyzerError::InvalidInput(
            "cannot partition an empty file".to_string(),
        ));
    }
    if target == 0 {
        return Err(AnalyzerError::InvalidInput(
            "chunk target must be positive".to_string(),
        ));
    }

    let mut reader = BufReader::new(reader);
    let mut boundaries = vec![0u64];

    for i in 1..target {
        let previous = *boundaries.last().unwrap_or(&0);
        let nominal = (file_size as u128 * i as u128 / target as u128) as u64;

        let aligned = next_line_start(&mut reader, nominal.max(previous + 1), file_size)?;
        if aligned >= file_size {
            break;
        }
        boundaries.push(aligned);
    }
    boundaries.push(file_size);

    let chunks: Vec<Chunk> = boundaries
        .windows(2)
        .enumerate()
        .map(|(i, range)| Chunk::new(ChunkId(i as u32), range[0], range[1] - range[0]))
        .collect();

    tracing::debug!(
        "Partitioned {} bytes into {} chunks (target {})",
        file_size,
        chunks.len(),
        target
    );

    Ok(chunks)
}

/// Opens `path` and partitions it.
pub fn partition_file(path: &Path, target: usize) -> Result<Vec<Chunk>> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    partition(file, file_size, target)
}

/// Offset of the first line that starts at or after `from`.
///
/// `from` itself is a line start when the byte before it is a newline. Returns
/// `file_size` when no newline follows.
fn next_line_start<R: BufRead + Seek>(reader: &mut R, from: u64, file_size: u64) -> Result<u64> {
    if from == 0 {
        return Ok(0);
    }
    if from >= file_size {
        return Ok(file_size);
    }

    let mut position = from - 1;
    reader.seek(SeekFrom::Start(position))?;

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(file_size);
        }

        if let Some(index) = buf.iter().position(|&byte| byte == b'\n') {
            return Ok(position + index as u64 + 1);
        }

        let consumed = buf.len();
        position += consumed as u64;
        reader.consume(consumed);
    }
}
