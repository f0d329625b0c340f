//! Pkt-line framing.
//!
//! Every protocol line is prefixed with its total length as 4 hex digits;
//! a `0000` prefix is a flush packet carrying no payload.

use crate::{ProtocolError, Result};
use std::io::{Read, Write};

/// A pkt-line packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data line with content.
    Data(Vec<u8>),
    /// Flush packet (0000).
    Flush,
}

impl PktLine {
    /// Creates a data packet from a string slice.
    pub fn from_string(s: &str) -> Self {
        Self::Data(s.as_bytes().to_vec())
    }

    /// Encodes the packet to bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Data(data) => {
                let mut result = format!("{:04x}", data.len() + 4).into_bytes();
                result.extend_from_slice(data);
                result
            }
            Self::Flush => b"0000".to_vec(),
        }
    }

    /// Returns true if this is a flush packet.
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    /// Returns the data content, or None for a flush.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            Self::Flush => None,
        }
    }

    /// Returns the data as a string, trimming any trailing newline.
    pub fn as_str(&self) -> Option<&str> {
        self.data()
            .and_then(|d| std::str::from_utf8(d).ok())
            .map(|s| s.trim_end_matches('\n'))
    }
}

/// Reader for pkt-line framed streams.
pub struct PktLineReader<R> {
    reader: R,
}

impl<R: Read> PktLineReader<R> {
    /// Creates a new pkt-line reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next packet, or None on clean EOF.
    pub fn read(&mut self) -> Result<Option<PktLine>> {
        let mut len_buf = [0u8; 4];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len_str = std::str::from_utf8(&len_buf)
            .map_err(|_| ProtocolError::InvalidPktLine("non-ascii length prefix".to_string()))?;
        let len = usize::from_str_radix(len_str, 16).map_err(|_| {
            ProtocolError::InvalidPktLine(format!("bad length prefix '{}'", len_str))
        })?;

        match len {
            0 => Ok(Some(PktLine::Flush)),
            1..=3 => Err(ProtocolError::InvalidPktLine(format!(
                "length {} too small",
                len
            ))),
            _ => {
                let mut data = vec![0u8; len - 4];
                self.reader.read_exact(&mut data).map_err(|_| {
                    ProtocolError::InvalidPktLine("truncated pkt-line payload".to_string())
                })?;
                Ok(Some(PktLine::Data(data)))
            }
        }
    }

    /// Reads packets until a flush packet or EOF.
    pub fn read_until_flush(&mut self) -> Result<Vec<PktLine>> {
        let mut packets = Vec::new();
        loop {
            match self.read()? {
                Some(PktLine::Flush) | None => break,
                Some(pkt) => packets.push(pkt),
            }
        }
        Ok(packets)
    }

    /// Returns a mutable reference to the inner reader.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

/// Writer for pkt-line framed streams.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    /// Creates a new pkt-line writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a packet.
    pub fn write(&mut self, pkt: &PktLine) -> Result<()> {
        self.writer.write_all(&pkt.encode())?;
        Ok(())
    }

    /// Writes a newline-terminated string line.
    pub fn write_line(&mut self, s: &str) -> Result<()> {
        let mut data = s.as_bytes().to_vec();
        if !s.ends_with('\n') {
            data.push(b'\n');
        }
        self.write(&PktLine::Data(data))
    }

    /// Writes a flush packet.
    pub fn flush_pkt(&mut self) -> Result<()> {
        self.write(&PktLine::Flush)
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode() {
        assert_eq!(PktLine::from_string("hello\n").encode(), b"000ahello\n");
        assert_eq!(PktLine::Flush.encode(), b"0000");
        assert_eq!(PktLine::Data(Vec::new()).encode(), b"0004");
    }

    #[test]
    fn test_roundtrip() {
        let mut buf = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut buf);
            writer.write_line("want cafebabe").unwrap();
            writer.write_line("done").unwrap();
            writer.flush_pkt().unwrap();
        }

        let mut reader = PktLineReader::new(Cursor::new(buf));
        assert_eq!(
            reader.read().unwrap().unwrap().as_str(),
            Some("want cafebabe")
        );
        assert_eq!(reader.read().unwrap().unwrap().as_str(), Some("done"));
        assert!(reader.read().unwrap().unwrap().is_flush());
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn test_read_until_flush() {
        let mut buf = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut buf);
            writer.write_line("one").unwrap();
            writer.write_line("two").unwrap();
            writer.flush_pkt().unwrap();
            writer.write_line("after").unwrap();
        }

        let mut reader = PktLineReader::new(Cursor::new(buf));
        let packets = reader.read_until_flush().unwrap();
        assert_eq!(packets.len(), 2);
    }

    #[test]
    fn test_bad_length_prefix() {
        let mut reader = PktLineReader::new(Cursor::new(b"zzzz".to_vec()));
        assert!(matches!(
            reader.read(),
            Err(ProtocolError::InvalidPktLine(_))
        ));

        let mut reader = PktLineReader::new(Cursor::new(b"0003".to_vec()));
        assert!(matches!(
            reader.read(),
            Err(ProtocolError::InvalidPktLine(_))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut reader = PktLineReader::new(Cursor::new(b"00ffshort".to_vec()));
        assert!(matches!(
            reader.read(),
            Err(ProtocolError::InvalidPktLine(_))
        ));
    }

    #[test]
    fn test_binary_payload() {
        let pkt = PktLine::Data(vec![0x00, 0xff, 0x80]);
        let encoded = pkt.encode();
        let mut reader = PktLineReader::new(Cursor::new(encoded));
        assert_eq!(reader.read().unwrap().unwrap(), pkt);
    }

    #[test]
    fn test_as_str_trims_newline() {
        assert_eq!(PktLine::from_string("NAK\n").as_str(), Some("NAK"));
        assert_eq!(PktLine::from_string("NAK").as_str(), Some("NAK"));
        assert_eq!(PktLine::Flush.as_str(), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    proptest! {
        /// Property: any data packet survives an encode/read cycle.
        #[test]
        fn prop_pktline_roundtrip(data in prop::collection::vec(any::<u8>(), 0..4096)) {
            let pkt = PktLine::Data(data);
            let mut reader = PktLineReader::new(Cursor::new(pkt.encode()));
            prop_assert_eq!(reader.read().unwrap().unwrap(), pkt);
        }

        /// Property: arbitrary input never panics the reader.
        #[test]
        fn prop_reader_no_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let mut reader = PktLineReader::new(Cursor::new(data));
            for _ in 0..64 {
                match reader.read() {
                    Ok(Some(_)) => continue,
                    Ok(None) | Err(_) => break,
                }
            }
        }
    }
}
