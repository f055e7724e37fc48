//! Run-length byte coder.
//!
//! The encoded stream is a sequence of `(count, byte)` pairs, each count a
//! single byte in `1..=255`. Longer runs are split over several pairs. A
//! dangling count at the end of the input (no byte after it) marks the end of
//! the stream rather than an error.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::instrument;

use crate::errors::Result;

pub const MAX_RUN: u8 = 255;

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2 + 2);
    let mut iter = data.iter().copied();
    let mut current = match iter.next() {
        Some(b) => b,
        None => return out,
    };
    let mut count: u8 = 1;
    for byte in iter {
        if byte == current && count < MAX_RUN {
            count += 1;
        } else {
            out.push(count);
            out.push(current);
            current = byte;
            count = 1;
        }
    }
    out.push(count);
    out.push(current);
    out
}

pub fn decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for pair in data.chunks(2) {
        if let [count, byte] = pair {
            out.extend(std::iter::repeat(*byte).take(*count as usize));
        }
    }
    out
}

/// Streaming form of [`encode`]. Returns the number of bytes written.
pub fn encode_stream<R: Read, W: Write>(reader: R, writer: W) -> std::io::Result<u64> {
    let reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);
    let mut written = 0;
    let mut run: Option<(u8, u8)> = None;
    for byte in reader.bytes() {
        let byte = byte?;
        run = match run {
            Some((value, count)) if value == byte && count < MAX_RUN => {
                Some((value, count + 1))
            }
            Some((value, count)) => {
                writer.write_all(&[count, value])?;
                written += 2;
                Some((byte, 1))
            }
            None => Some((byte, 1)),
        };
    }
    if let Some((value, count)) = run {
        writer.write_all(&[count, value])?;
        written += 2;
    }
    writer.flush()?;
    Ok(written)
}

/// Streaming form of [`decode`]. Returns the number of bytes written.
pub fn decode_stream<R: Read, W: Write>(reader: R, writer: W) -> std::io::Result<u64> {
    let mut bytes = BufReader::new(reader).bytes();
    let mut writer = BufWriter::new(writer);
    let mut written = 0;
    while let Some(count) = bytes.next() {
        let count = count?;
        let value = match bytes.next() {
            Some(v) => v?,
            None => break,
        };
        writer.write_all(&vec![value; count as usize])?;
        written += count as u64;
    }
    writer.flush()?;
    Ok(written)
}

#[instrument]
pub fn compress_file(source: &Path, destination: &Path) -> Result<u64> {
    let input = File::open(source)?;
    let output = File::create(destination)?;
    let written = encode_stream(input, output)?;
    tracing::info!("Compressed {} into {} bytes", source.display(), written);
    Ok(written)
}

#[instrument]
pub fn decompress_file(source: &Path, destination: &Path) -> Result<u64> {
    let input = File::open(source)?;
    let output = File::create(destination)?;
    let written = decode_stream(input, output)?;
    tracing::info!("Expanded {} into {} bytes", source.display(), written);
    Ok(written)
}
