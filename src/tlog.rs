//! Telemetry log decoding.
//!
//! A `.tlog` is a stream of MAVLink frames, each preceded by an 8-byte
//! timestamp. The reader scans for the frame magic bytes directly, which
//! steps over the timestamps (and any other framing junk) without
//! interpreting them, then parses each complete candidate frame.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use mavlink::common::MavMessage;
use mavlink::peek_reader::PeekReader;

use flight_replay_core::sample::PositionSample;

/// MAVLink v1 frame magic.
const MAGIC_V1: u8 = 0xFE;
/// MAVLink v2 frame magic.
const MAGIC_V2: u8 = 0xFD;
/// Chunk size when refilling the scan buffer.
const READ_CHUNK: usize = 4096;

/// Streaming reader yielding position records from a telemetry log.
///
/// A single forward pass over the log: GLOBAL_POSITION_INT messages are
/// decoded into [`PositionSample`]s, messages of other kinds are
/// skipped, and records whose latitude is exactly zero (no GPS fix yet)
/// are dropped. The first frame that fails to decode ends the stream,
/// as does any read error; the iterator is fused.
pub struct TlogReader<R> {
    source: R,
    buf: Vec<u8>,
    next_index: usize,
    done: bool,
}

impl TlogReader<BufReader<File>> {
    /// Open a telemetry log file.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> TlogReader<R> {
    /// Wrap an arbitrary byte stream.
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: Vec::new(),
            next_index: 0,
            done: false,
        }
    }

    /// Pull one chunk from the source into the scan buffer.
    ///
    /// Returns false when the source is exhausted or fails; either way
    /// there is nothing more to scan.
    fn fill(&mut self) -> bool {
        let mut chunk = [0u8; READ_CHUNK];
        match self.source.read(&mut chunk) {
            Ok(0) | Err(_) => false,
            Ok(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                true
            }
        }
    }

    /// Extract the next complete frame from the buffer, refilling as
    /// needed. Returns None once the input is exhausted.
    fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            // Drop everything ahead of the next frame magic.
            match self
                .buf
                .iter()
                .position(|&b| b == MAGIC_V1 || b == MAGIC_V2)
            {
                Some(0) => {}
                Some(pos) => {
                    self.buf.drain(..pos);
                }
                None => {
                    self.buf.clear();
                    if !self.fill() {
                        return None;
                    }
                    continue;
                }
            }

            if self.buf.len() < 3 {
                if !self.fill() {
                    return None;
                }
                continue;
            }

            let magic = self.buf[0];
            let payload_len = self.buf[1] as usize;
            let frame_size = if magic == MAGIC_V2 {
                // incompat_flags bit 0 marks a signed frame, which
                // carries a 13-byte signature after the CRC
                let base = 12 + payload_len;
                if self.buf[2] & 0x01 != 0 {
                    base + 13
                } else {
                    base
                }
            } else {
                8 + payload_len
            };

            if self.buf.len() < frame_size {
                if !self.fill() {
                    return None;
                }
                continue;
            }

            return Some(self.buf.drain(..frame_size).collect());
        }
    }
}

impl<R: Read> Iterator for TlogReader<R> {
    type Item = PositionSample;

    fn next(&mut self) -> Option<PositionSample> {
        while !self.done {
            let Some(frame) = self.next_frame() else {
                self.done = true;
                break;
            };
            let Some(msg) = parse_frame(&frame) else {
                // Undecodable frame: treat the rest of the log as lost.
                self.done = true;
                break;
            };
            let MavMessage::GLOBAL_POSITION_INT(data) = msg else {
                continue;
            };
            if data.lat == 0 {
                // No fix yet
                continue;
            }
            let index = self.next_index;
            self.next_index += 1;
            return Some(PositionSample {
                lat_e7: data.lat,
                lon_e7: data.lon,
                alt_mm: data.alt,
                index,
            });
        }
        None
    }
}

fn parse_frame(frame: &[u8]) -> Option<MavMessage> {
    let cursor = Cursor::new(frame);
    let mut reader = PeekReader::new(cursor);
    let parsed = if frame[0] == MAGIC_V2 {
        mavlink::read_v2_msg::<MavMessage, _>(&mut reader)
    } else {
        mavlink::read_v1_msg::<MavMessage, _>(&mut reader)
    };
    parsed.ok().map(|(_, msg)| msg)
}
