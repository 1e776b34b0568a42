//! Byte-level stitch stream decoder.
//!
//! Turns the compact delta-coded byte stream into absolute-position stitch
//! events. The stream packs each delta in one of two forms: a 1-byte biased
//! short form (roughly -64..63) or a 2-byte sign-extended 12-bit long form
//! whose control byte also carries the trim/move flags. Two reserved byte
//! pairs mark a color stop (0xFE 0xB0) and the end of the stream (0xFF 0x00).
//!
//! The decoder is an explicit state machine over an owned cursor rather than
//! ad hoc flags, so every termination path is spelled out.

use crate::cursor::ByteCursor;
use crate::pattern::{Bounds, Stitch, StitchKind};

const END_MARKER: (u8, u8) = (0xFF, 0x00);
const COLOR_STOP_MARKER: (u8, u8) = (0xFE, 0xB0);

const LONG_FORM_BIT: u8 = 0x80;
const TRIM_FLAG: u8 = 0x20;
const MOVE_FLAG: u8 = 0x10;

/// Everything recovered from one pass over the stitch stream.
#[derive(Debug)]
pub struct StreamOutcome {
    /// Ordered stitch events, including `Stop` markers and (when the stream
    /// terminated normally) a final `End` event.
    pub events: Vec<Stitch>,
    /// Bounding box of `Stitch`-kind events only; `None` if the stream held
    /// no visible stitches.
    pub bounds: Option<Bounds>,
    /// `true` when the explicit end marker was found. `false` means the
    /// stream exhausted the buffer and the events are a truncated prefix.
    pub complete: bool,
}

#[derive(Debug, Clone, Copy)]
enum StreamState {
    /// Next bytes are a marker pair or a dx control byte.
    AwaitControl,
    /// dx is decoded; next byte(s) carry dy. `long_dx` selects whether dy
    /// may itself use the long form.
    AwaitDy {
        kind: StitchKind,
        dx: i32,
        long_dx: bool,
    },
    Finished,
}

/// Decode one stitch stream starting at the cursor's current position.
///
/// Never fails: pathological input is bounded by the buffer length, and a
/// stream that runs out mid-pair simply yields `complete: false` for the
/// caller's truncation policy to judge.
pub fn decode_stream(mut cursor: ByteCursor<'_>) -> StreamOutcome {
    let mut events = Vec::new();
    let mut tracker = BoundsTracker::default();
    let (mut x, mut y) = (0i32, 0i32);
    let mut state = StreamState::AwaitControl;
    let mut complete = false;

    loop {
        state = match state {
            StreamState::AwaitControl => match cursor.peek2() {
                None => StreamState::Finished,
                Some(pair) if pair == END_MARKER => {
                    cursor.skip(2);
                    events.push(Stitch {
                        x,
                        y,
                        kind: StitchKind::End,
                    });
                    complete = true;
                    StreamState::Finished
                }
                Some(pair) if pair == COLOR_STOP_MARKER => {
                    cursor.skip(2);
                    // The palette index repeated here is already captured in
                    // the header table; skip it without re-reading.
                    if cursor.read_u8().is_err() {
                        StreamState::Finished
                    } else {
                        events.push(Stitch {
                            x,
                            y,
                            kind: StitchKind::Stop,
                        });
                        StreamState::AwaitControl
                    }
                }
                Some((b0, _)) => {
                    cursor.skip(1);
                    if b0 & LONG_FORM_BIT != 0 {
                        let kind = if b0 & TRIM_FLAG != 0 {
                            StitchKind::Trim
                        } else if b0 & MOVE_FLAG != 0 {
                            StitchKind::Move
                        } else {
                            StitchKind::Stitch
                        };
                        match cursor.read_u8() {
                            Ok(b1) => StreamState::AwaitDy {
                                kind,
                                dx: long_delta(b0, b1),
                                long_dx: true,
                            },
                            Err(_) => StreamState::Finished,
                        }
                    } else {
                        StreamState::AwaitDy {
                            kind: StitchKind::Stitch,
                            dx: short_delta(b0),
                            long_dx: false,
                        }
                    }
                }
            },
            StreamState::AwaitDy { kind, dx, long_dx } => match cursor.read_u8() {
                Err(_) => StreamState::Finished,
                Ok(b) => {
                    let dy = if long_dx && b & LONG_FORM_BIT != 0 {
                        match cursor.read_u8() {
                            Ok(b1) => long_delta(b, b1),
                            // long dy cut off mid-pair
                            Err(_) => break,
                        }
                    } else {
                        // After a short-form dx the pair occupies exactly
                        // two bytes, so dy is always the short form.
                        short_delta(b)
                    };
                    x += dx;
                    y += dy;
                    events.push(Stitch { x, y, kind });
                    if kind == StitchKind::Stitch {
                        tracker.update(x, y);
                    }
                    StreamState::AwaitControl
                }
            },
            StreamState::Finished => break,
        };
    }

    StreamOutcome {
        events,
        bounds: tracker.finish(),
        complete,
    }
}

/// Short form: the low 7 bits, biased so values above 63 wrap negative.
/// The asymmetric -64..63 range is preserved exactly as observed in the
/// reference format.
fn short_delta(b: u8) -> i32 {
    let v = (b & 0x7F) as i32;
    if v > 63 {
        v - 128
    } else {
        v
    }
}

/// Long form: low nibble of the control byte and the continuation byte form
/// a 12-bit magnitude, sign-extended from bit 11.
fn long_delta(b0: u8, b1: u8) -> i32 {
    let v = (((b0 & 0x0F) as i32) << 8) | b1 as i32;
    if v & 0x800 != 0 {
        v - 4096
    } else {
        v
    }
}

#[derive(Debug, Default)]
struct BoundsTracker {
    bounds: Option<Bounds>,
}

impl BoundsTracker {
    fn update(&mut self, x: i32, y: i32) {
        match &mut self.bounds {
            None => {
                self.bounds = Some(Bounds {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                });
            }
            Some(b) => {
                b.min_x = b.min_x.min(x);
                b.min_y = b.min_y.min(y);
                b.max_x = b.max_x.max(x);
                b.max_y = b.max_y.max(y);
            }
        }
    }

    fn finish(self) -> Option<Bounds> {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> StreamOutcome {
        decode_stream(ByteCursor::new(bytes))
    }

    #[test]
    fn test_short_form_prefix_sums() {
        // dx=5 dy=-3, then dx=-2 dy=10, then end
        let out = decode(&[0x05, 0x7D, 0x7E, 0x0A, 0xFF, 0x00]);
        assert!(out.complete);
        let positions: Vec<(i32, i32, StitchKind)> =
            out.events.iter().map(|s| (s.x, s.y, s.kind)).collect();
        assert_eq!(
            positions,
            vec![
                (5, -3, StitchKind::Stitch),
                (3, 7, StitchKind::Stitch),
                (3, 7, StitchKind::End),
            ]
        );
    }

    #[test]
    fn test_short_form_dy_ignores_high_bit() {
        // 0xFD carries the high bit but follows a short dx, so it decodes
        // as the 7-bit biased value -3.
        let out = decode(&[0x05, 0xFD, 0xFF, 0x00]);
        assert!(out.complete);
        assert_eq!(out.events[0].x, 5);
        assert_eq!(out.events[0].y, -3);
    }

    #[test]
    fn test_long_form_sign_extension() {
        // dx long: control 0x8F low nibble 0xF with 0xFF -> 0xFFF -> -1
        // dy long: 0x80 0x64 -> 0x064 -> 100
        let out = decode(&[0x8F, 0xFF, 0x80, 0x64, 0xFF, 0x00]);
        assert_eq!(out.events[0].x, -1);
        assert_eq!(out.events[0].y, 100);
        assert_eq!(out.events[0].kind, StitchKind::Stitch);
    }

    #[test]
    fn test_long_form_flags() {
        // bit 5 -> trim, bit 4 -> move
        let trim = decode(&[0xA0, 0x05, 0x02, 0xFF, 0x00]);
        assert_eq!(trim.events[0].kind, StitchKind::Trim);
        let mov = decode(&[0x90, 0x05, 0x02, 0xFF, 0x00]);
        assert_eq!(mov.events[0].kind, StitchKind::Move);
    }

    #[test]
    fn test_long_dx_short_dy() {
        // long dx 0x80 0x10 -> 16; dy byte 0x7F -> -1 short form
        let out = decode(&[0x80, 0x10, 0x7F, 0xFF, 0x00]);
        assert_eq!(out.events[0].x, 16);
        assert_eq!(out.events[0].y, -1);
    }

    #[test]
    fn test_color_stop_keeps_position_and_skips_index() {
        let out = decode(&[0x05, 0x05, 0xFE, 0xB0, 0x02, 0x01, 0x01, 0xFF, 0x00]);
        assert!(out.complete);
        assert_eq!(out.events[1].kind, StitchKind::Stop);
        assert_eq!((out.events[1].x, out.events[1].y), (5, 5));
        // stream resumes after the skipped palette byte
        assert_eq!((out.events[2].x, out.events[2].y), (6, 6));
    }

    #[test]
    fn test_bounds_ignore_moves_and_trims() {
        // move far away, stitch near origin
        let out = decode(&[0x9F, 0xFF, 0x8F, 0x9C, 0x02, 0x03, 0xFF, 0x00]);
        let b = out.bounds.expect("one visible stitch");
        assert_eq!((b.min_x, b.max_x), (out.events[1].x, out.events[1].x));
        assert_eq!((b.min_y, b.max_y), (out.events[1].y, out.events[1].y));
    }

    #[test]
    fn test_only_moves_yield_no_bounds() {
        let out = decode(&[0x90, 0x05, 0x02, 0xFF, 0x00]);
        assert!(out.bounds.is_none());
    }

    #[test]
    fn test_missing_end_marker_is_incomplete() {
        let out = decode(&[0x05, 0x05, 0x01]);
        assert!(!out.complete);
        assert_eq!(out.events.len(), 1);
        assert_eq!((out.events[0].x, out.events[0].y), (5, 5));
    }

    #[test]
    fn test_empty_stream_is_incomplete() {
        let out = decode(&[]);
        assert!(!out.complete);
        assert!(out.events.is_empty());
        assert!(out.bounds.is_none());
    }
}
