//! Reply parsing
//!
//! [`ResponseParser`] walks one received frame strictly left to right,
//! consuming typed fields as it goes. There is no backtracking: the first
//! failed step poisons the parser, and every later call reports the same
//! failure instead of extracting from an inconsistent position.

use super::ProtocolError;

/// Sequential field extractor over a single response frame.
///
/// The frame slice includes the terminator byte, so literal matches may
/// span it (`expect_literal("OK/")`).
#[derive(Debug)]
pub struct ResponseParser<'a> {
    frame: &'a [u8],
    pos: usize,
    poisoned: bool,
}

impl<'a> ResponseParser<'a> {
    /// Start parsing at the first byte of `frame`.
    pub fn new(frame: &'a [u8]) -> Self {
        Self {
            frame,
            pos: 0,
            poisoned: false,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.frame[self.pos..]
    }

    fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.frame[start..end]
    }

    fn check_live(&self) -> Result<(), ProtocolError> {
        if self.poisoned {
            return Err(ProtocolError::Mismatch(
                "parse already failed earlier in this frame".into(),
            ));
        }
        Ok(())
    }

    fn fail(&mut self, what: impl std::fmt::Display) -> ProtocolError {
        self.poisoned = true;
        ProtocolError::expected(format!(
            "{what} at offset {} of {:?}",
            self.pos,
            String::from_utf8_lossy(self.frame)
        ))
    }

    /// Consume exactly `text.len()` bytes and require them to equal `text`.
    pub fn expect_literal(&mut self, text: &str) -> Result<(), ProtocolError> {
        self.check_live()?;
        let want = text.as_bytes();
        let end = self.pos + want.len();
        if end > self.frame.len() || &self.frame[self.pos..end] != want {
            return Err(self.fail(format!("literal {text:?}")));
        }
        self.pos = end;
        Ok(())
    }

    /// Consume exactly one byte and require it to equal `byte`.
    pub fn expect_byte(&mut self, byte: u8) -> Result<(), ProtocolError> {
        self.check_live()?;
        if self.frame.get(self.pos) != Some(&byte) {
            return Err(self.fail(format!("byte 0x{byte:02X}")));
        }
        self.pos += 1;
        Ok(())
    }

    /// Consume a maximal run of ASCII digits and return its value.
    ///
    /// Fails if the cursor is not on a digit.
    pub fn parse_int(&mut self) -> Result<i64, ProtocolError> {
        self.check_live()?;
        let digits = self.take_while(|b| b.is_ascii_digit());
        if digits.is_empty() {
            return Err(self.fail("integer"));
        }
        // Only ASCII digits reach here, so both conversions hold.
        let text = std::str::from_utf8(digits).map_err(|_| self.fail("integer"))?;
        text.parse::<i64>().map_err(|_| self.fail("integer"))
    }

    /// Consume a maximal run of digits with at most one decimal point and
    /// return its value.
    ///
    /// Fails if the run contains no digit at all.
    pub fn parse_double(&mut self) -> Result<f64, ProtocolError> {
        self.check_live()?;
        let start = self.pos;
        let mut seen_dot = false;
        let mut seen_digit = false;
        while let Some(&b) = self.frame.get(self.pos) {
            if b.is_ascii_digit() {
                seen_digit = true;
            } else if b == b'.' && !seen_dot {
                seen_dot = true;
            } else {
                break;
            }
            self.pos += 1;
        }
        if !seen_digit {
            self.pos = start;
            return Err(self.fail("number"));
        }
        let digits = self.slice(start, self.pos);
        let text = std::str::from_utf8(digits).map_err(|_| self.fail("number"))?;
        text.parse::<f64>().map_err(|_| self.fail("number"))
    }

    /// Consume one byte, or report `None` at end of frame.
    ///
    /// End of frame is the expected way character-accumulation loops stop,
    /// so it does not poison the parser.
    pub fn parse_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        self.check_live()?;
        match self.frame.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Ok(Some(b))
            }
            None => Ok(None),
        }
    }

    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.frame.get(self.pos).is_some_and(|&b| keep(b)) {
            self.pos += 1;
        }
        &self.frame[start..self.pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_then_fields() {
        let mut p = ResponseParser::new(b"OK,5.0,120/");
        p.expect_literal("OK,").unwrap();
        assert_eq!(p.parse_double().unwrap(), 5.0);
        p.expect_literal(",").unwrap();
        assert_eq!(p.parse_double().unwrap(), 120.0);
        p.expect_byte(b'/').unwrap();
    }

    #[test]
    fn literal_mismatch_fails() {
        let mut p = ResponseParser::new(b"ER,1/");
        assert!(p.expect_literal("OK,").is_err());
    }

    #[test]
    fn int_requires_a_digit() {
        let mut p = ResponseParser::new(b"AB/");
        assert!(p.parse_int().is_err());
    }

    #[test]
    fn int_stops_at_first_non_digit() {
        let mut p = ResponseParser::new(b"42,7/");
        assert_eq!(p.parse_int().unwrap(), 42);
        assert_eq!(p.remaining(), b",7/");
    }

    #[test]
    fn double_takes_one_decimal_point() {
        let mut p = ResponseParser::new(b"3.25.9/");
        assert_eq!(p.parse_double().unwrap(), 3.25);
        assert_eq!(p.remaining(), b".9/");
    }

    #[test]
    fn byte_reports_end_of_frame() {
        let mut p = ResponseParser::new(b"A/");
        assert_eq!(p.parse_byte().unwrap(), Some(b'A'));
        assert_eq!(p.parse_byte().unwrap(), Some(b'/'));
        assert_eq!(p.parse_byte().unwrap(), None);
    }

    #[test]
    fn failure_poisons_the_parser() {
        let mut p = ResponseParser::new(b"OK,12/");
        assert!(p.expect_literal("NO").is_err());
        // Even a step that would have succeeded is refused now.
        assert!(p.expect_literal("OK").is_err());
        assert!(p.parse_int().is_err());
    }

    #[test]
    fn end_of_frame_does_not_poison() {
        let mut p = ResponseParser::new(b"/");
        assert_eq!(p.parse_byte().unwrap(), Some(b'/'));
        assert_eq!(p.parse_byte().unwrap(), None);
        assert_eq!(p.parse_byte().unwrap(), None);
    }
}
