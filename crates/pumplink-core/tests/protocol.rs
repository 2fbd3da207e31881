//! Wire-level behavior: framing, command encoding, reply parsing and the
//! transaction loop, exercised through the public API with a scripted link.

use pretty_assertions::assert_eq;
use pumplink_core::protocol::{
    find_frame, Link, ProtocolError, PumpCommand, ResponseParser, Transceiver, TERMINATOR,
};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// Link double that answers every write from a canned reply queue.
struct CannedLink {
    replies: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
}

impl CannedLink {
    fn new(replies: &[&[u8]]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.to_vec()).collect(),
            pending: VecDeque::new(),
        }
    }
}

impl Link for CannedLink {
    fn send(&mut self, _bytes: &[u8]) -> io::Result<()> {
        if let Some(reply) = self.replies.pop_front() {
            self.pending.extend(reply);
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.pending.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}

#[test]
fn buffers_without_terminator_are_incomplete() {
    for buffer in [b"".as_slice(), b"O", b"OK,5.0,120", b"garbage without end"] {
        assert_eq!(find_frame(buffer, TERMINATOR), None, "{buffer:?}");
    }
}

#[test]
fn terminator_at_k_yields_frame_zero_to_k() {
    let frame = find_frame(b"OK,1/", TERMINATOR).unwrap();
    assert_eq!((frame.start, frame.end), (0, 4));

    let frame = find_frame(b"/trailing noise", TERMINATOR).unwrap();
    assert_eq!((frame.start, frame.end), (0, 0));

    let frame = find_frame(b"OK/OK/", TERMINATOR).unwrap();
    assert_eq!(frame.end, 2, "only the first terminator counts");
}

#[test]
fn command_encodings_match_the_wire_table() {
    assert_eq!(PumpCommand::Identify.encode(), b"ID");
    assert_eq!(PumpCommand::CurrentConditions.encode(), b"CC");
    assert_eq!(PumpCommand::DisableKeypad.encode(), b"KD");
    assert_eq!(PumpCommand::SetFlow(0.0).encode(), b"FO0000");
    assert_eq!(PumpCommand::Run.encode(), b"RU");
    assert_eq!(PumpCommand::SetUpperLimit(6000.0).encode(), b"UP6000");
    assert_eq!(PumpCommand::SetLowerLimit(20.0).encode(), b"LP0020");
    assert_eq!(PumpCommand::Stop.encode(), b"ST");
    assert_eq!(PumpCommand::Status.encode(), b"CS");
    assert_eq!(PumpCommand::Faults.encode(), b"RF");
    assert_eq!(PumpCommand::ReadPressure.encode(), b"PR");
    assert_eq!(PumpCommand::ReadHead.encode(), b"RH");
    assert_eq!(PumpCommand::Clear.encode(), b"#");
}

#[test]
fn identify_transaction_parses_the_serial() {
    let link = CannedLink::new(&[b"OK,12345/"]);
    let mut tx = Transceiver::new(link, Duration::from_millis(25));

    let reply = tx.transact(&PumpCommand::Identify).unwrap();
    let mut p = ResponseParser::new(&reply);
    p.expect_literal("OK,").unwrap();

    let mut serial = String::new();
    while let Some(byte) = p.parse_byte().unwrap() {
        if byte == TERMINATOR || byte == b' ' {
            break;
        }
        serial.push(byte as char);
    }
    assert_eq!(serial, "12345");
}

#[test]
fn non_digit_run_fails_integer_extraction_but_accumulates_as_text() {
    let reply = b"OK,AB/";

    // As an integer field the run is rejected at the first non-digit.
    let mut p = ResponseParser::new(reply);
    p.expect_literal("OK,").unwrap();
    assert!(p.parse_int().is_err());

    // The serial-number loop takes the same bytes as characters.
    let mut p = ResponseParser::new(reply);
    p.expect_literal("OK,").unwrap();
    let mut serial = String::new();
    while let Some(byte) = p.parse_byte().unwrap() {
        if byte == TERMINATOR || byte == b' ' {
            break;
        }
        serial.push(byte as char);
    }
    assert_eq!(serial, "AB");
}

#[test]
fn silent_device_times_out_without_retry() {
    let link = CannedLink::new(&[]);
    let mut tx = Transceiver::new(link, Duration::from_millis(25));
    match tx.transact(&PumpCommand::CurrentConditions) {
        Err(ProtocolError::Timeout(25)) => {}
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn reply_split_across_reads_still_frames() {
    // Two bursts: the terminator only arrives with the second.
    struct SplitLink {
        bursts: VecDeque<Vec<u8>>,
    }

    impl Link for SplitLink {
        fn send(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.bursts.pop_front() {
                Some(burst) => {
                    buf[..burst.len()].copy_from_slice(&burst);
                    Ok(burst.len())
                }
                None => Ok(0),
            }
        }

        fn clear_input(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let link = SplitLink {
        bursts: VecDeque::from([b"OK,5.".to_vec(), b"0,120/".to_vec()]),
    };
    let mut tx = Transceiver::new(link, Duration::from_millis(50));
    let reply = tx.transact(&PumpCommand::CurrentConditions).unwrap();
    assert_eq!(reply, b"OK,5.0,120/");
}

#[test]
fn mismatched_reply_surfaces_as_protocol_error() {
    let link = CannedLink::new(&[b"ER,9/"]);
    let mut tx = Transceiver::new(link, Duration::from_millis(25));
    let reply = tx.transact(&PumpCommand::Run).unwrap();
    let err = ResponseParser::new(&reply)
        .expect_literal("OK/")
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Mismatch(_)));
}
