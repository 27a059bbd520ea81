// Blinkwire - RP2040 LED beacon firmware and simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Program-upload framing for the serial loader.
//!
//! A frame is the ASCII keyword `LOADPROG`, the image length as a
//! little-endian `u64`, then the raw image bytes. While a frame goes out
//! over a serial port, [`monitor`] copies whatever the loader prints.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

pub const LOAD_KEYWORD: &[u8] = b"LOADPROG";

/// Serial read timeout; bounds how long [`monitor`] takes to notice `stop`.
pub const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Length of everything before the image bytes.
pub const HEADER_LEN: usize = LOAD_KEYWORD.len() + 8;

pub fn encode_header(image_len: usize) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..LOAD_KEYWORD.len()].copy_from_slice(LOAD_KEYWORD);
    header[LOAD_KEYWORD.len()..].copy_from_slice(&(image_len as u64).to_le_bytes());
    header
}

pub fn encode_frame(image: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + image.len());
    frame.extend_from_slice(&encode_header(image.len()));
    frame.extend_from_slice(image);
    frame
}

/// Writes the keyword, the length and the image as three flushed parts,
/// pausing `gap` between them so a polling loader can keep up.
pub fn send_frame<W: Write>(out: &mut W, image: &[u8], gap: Duration) -> io::Result<()> {
    let header = encode_header(image.len());
    let (keyword, length) = header.split_at(LOAD_KEYWORD.len());

    tracing::info!("Sending LOADPROG keyword");
    out.write_all(keyword)?;
    out.flush()?;
    pause(gap);

    tracing::info!("Sending program size: {} bytes", image.len());
    out.write_all(length)?;
    out.flush()?;
    pause(gap);

    out.write_all(image)?;
    out.flush()?;
    tracing::info!("Sent {} bytes", image.len());
    Ok(())
}

/// Copies device output to `sink` until `stop` is set or the reader ends.
///
/// Read timeouts are expected on an idle line and only re-check `stop`.
/// Returns the number of bytes copied.
pub fn monitor<R, W>(port: &mut R, stop: &AtomicBool, sink: &mut W) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write,
{
    let mut buf = [0u8; 256];
    let mut total = 0u64;
    while !stop.load(Ordering::Relaxed) {
        match port.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                sink.write_all(&buf[..n])?;
                sink.flush()?;
                total += n as u64;
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(e),
        }
    }
    tracing::debug!("Serial logger stopped after {} bytes", total);
    Ok(total)
}

fn pause(gap: Duration) {
    if !gap.is_zero() {
        thread::sleep(gap);
    }
}
