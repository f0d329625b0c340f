//! Pack file parsing.
//!
//! A pack is a 12-byte header (`PACK`, version 2, object count) followed by
//! back-to-back records and a 20-byte trailing checksum. Each record is a
//! variable-length type/size header and a raw zlib stream with no length
//! prefix, so decompression must report exactly how many input bytes it
//! consumed for the cursor to land on the next record.

use crate::delta::RefDelta;
use crate::{ProtocolError, Result};
use flate2::{Decompress, FlushDecompress, Status};
use marrow_storage::{ObjectId, ObjectStore, ObjectType};

/// Magic bytes at the start of a pack file.
const PACK_SIGNATURE: &[u8; 4] = b"PACK";
/// Pack format version this parser accepts.
const PACK_VERSION: u32 = 2;
/// Length of the trailing pack checksum.
const PACK_TRAILER_LEN: usize = 20;
/// Entry tag for ref-delta records.
const REF_DELTA_TAG: u8 = 7;

/// Result of unpacking: stored literals and queued deltas.
#[derive(Debug, Default)]
pub struct UnpackOutcome {
    /// Ids of literal objects written to the store, in pack order.
    pub stored: Vec<ObjectId>,
    /// Ref-delta records awaiting resolution, in pack order.
    pub pending: Vec<RefDelta>,
}

/// Parses a pack file and splits literals from deltas.
pub struct PackParser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackParser<'a> {
    /// Creates a parser over a complete pack (trailer included).
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Parses the pack, storing literal objects and queuing ref-deltas.
    pub fn parse(&mut self, store: &ObjectStore) -> Result<UnpackOutcome> {
        if self.data.len() < 12 + PACK_TRAILER_LEN {
            return Err(ProtocolError::CorruptPack("pack too small".to_string()));
        }
        if &self.data[0..4] != PACK_SIGNATURE {
            return Err(ProtocolError::CorruptPack("bad signature".to_string()));
        }

        let version = u32::from_be_bytes([self.data[4], self.data[5], self.data[6], self.data[7]]);
        if version != PACK_VERSION {
            return Err(ProtocolError::CorruptPack(format!(
                "unsupported version: {}",
                version
            )));
        }

        let object_count =
            u32::from_be_bytes([self.data[8], self.data[9], self.data[10], self.data[11]]);
        self.pos = 12;
        tracing::debug!(objects = object_count, "parsing pack");

        let mut outcome = UnpackOutcome::default();
        for _ in 0..object_count {
            self.parse_record(store, &mut outcome)?;
        }

        // Exactly the trailer must remain after the declared count.
        if self.pos != self.data.len() - PACK_TRAILER_LEN {
            return Err(ProtocolError::CorruptPack(format!(
                "record stream ends at byte {} of {} for {} objects",
                self.pos,
                self.data.len() - PACK_TRAILER_LEN,
                object_count
            )));
        }

        tracing::debug!(
            literals = outcome.stored.len(),
            deltas = outcome.pending.len(),
            "pack parsed"
        );
        Ok(outcome)
    }

    /// Parses one record at the cursor.
    fn parse_record(&mut self, store: &ObjectStore, outcome: &mut UnpackOutcome) -> Result<()> {
        let (tag, size) = self.read_entry_header()?;

        if tag == REF_DELTA_TAG {
            let base = self.read_base_id()?;
            let data = self.decompress_entry(size)?;
            outcome.pending.push(RefDelta { base, data });
            return Ok(());
        }

        let object_type = ObjectType::from_pack_type(tag)
            .map_err(|_| ProtocolError::CorruptPack(format!("unsupported entry tag {}", tag)))?;
        let data = self.decompress_entry(size)?;
        // The store recomputes the real content hash; pack order carries no
        // identity.
        let id = store.put(object_type, data)?;
        outcome.stored.push(id);
        Ok(())
    }

    /// Reads the variable-length type/size header.
    ///
    /// The low 4 bits of the first byte seed the size, bits 4-6 carry the
    /// type tag, and each continuation byte contributes 7 more size bits,
    /// least-significant chunk first.
    fn read_entry_header(&mut self) -> Result<(u8, usize)> {
        let first = self.next_byte()?;
        let tag = (first >> 4) & 0x07;
        let mut size = (first & 0x0f) as usize;
        let mut shift = 4;

        let mut byte = first;
        while byte & 0x80 != 0 {
            if shift >= usize::BITS as usize {
                return Err(ProtocolError::CorruptPack(
                    "entry size varint too long".to_string(),
                ));
            }
            byte = self.next_byte()?;
            size |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
        }

        Ok((tag, size))
    }

    /// Reads the 20 raw base-id bytes of a ref-delta record.
    fn read_base_id(&mut self) -> Result<ObjectId> {
        let raw = self
            .data
            .get(self.pos..self.pos + 20)
            .ok_or_else(|| ProtocolError::CorruptPack("truncated base id".to_string()))?;
        self.pos += 20;
        Ok(ObjectId::from_raw(raw)?)
    }

    fn next_byte(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| ProtocolError::CorruptPack("truncated entry header".to_string()))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Decompresses one zlib stream at the cursor, advancing it by exactly
    /// the number of compressed bytes consumed.
    fn decompress_entry(&mut self, expected_size: usize) -> Result<Vec<u8>> {
        let mut decomp = Decompress::new(true);
        // Capacity is a hint only; the declared size is untrusted input.
        let mut output = Vec::with_capacity(expected_size.min(1 << 20));
        let mut buf = [0u8; 8192];

        loop {
            let input = &self.data[self.pos..];
            let before_in = decomp.total_in();
            let before_out = decomp.total_out();

            let status = decomp
                .decompress(input, &mut buf, FlushDecompress::None)
                .map_err(|e| ProtocolError::CorruptPack(format!("zlib error: {}", e)))?;

            let consumed = (decomp.total_in() - before_in) as usize;
            let produced = (decomp.total_out() - before_out) as usize;
            self.pos += consumed;
            output.extend_from_slice(&buf[..produced]);

            match status {
                Status::StreamEnd => break,
                Status::Ok => continue,
                Status::BufError => {
                    if input.is_empty() {
                        return Err(ProtocolError::CorruptPack(
                            "truncated compressed data".to_string(),
                        ));
                    }
                }
            }
        }

        if output.len() != expected_size {
            return Err(ProtocolError::CorruptPack(format!(
                "entry declared {} bytes but decompressed to {}",
                expected_size,
                output.len()
            )));
        }

        Ok(output)
    }
}


#[cfg(test)]
mod proptests {
    use super::tests::build_pack;
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    proptest! {
        /// Property: arbitrary bytes never panic the parser.
        #[test]
        fn prop_parse_no_panic(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let dir = TempDir::new().unwrap();
            let store = ObjectStore::open(dir.path());
            let _ = PackParser::new(&data).parse(&store);
        }

        /// Property: packed blobs come back out of the store byte-identical.
        #[test]
        fn prop_blob_roundtrip(data in prop::collection::vec(any::<u8>(), 0..2048)) {
            let dir = TempDir::new().unwrap();
            let store = ObjectStore::open(dir.path());
            let pack = build_pack(&[(3, None, &data)]);
            let outcome = PackParser::new(&pack).parse(&store).unwrap();
            prop_assert_eq!(outcome.stored.len(), 1);
            let obj = store.get(&outcome.stored[0]).unwrap();
            prop_assert_eq!(obj.data.as_ref(), data.as_slice());
        }
    }
}
