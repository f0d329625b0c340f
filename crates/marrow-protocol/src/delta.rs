//! Delta instruction streams.
//!
//! A ref-delta body declares the base and target sizes as little-endian
//! 7-bit varints, then replays copy/insert instructions against the base
//! object's content. Copies must stay inside the base and the produced
//! output must match the declared target size exactly.

use crate::{ProtocolError, Result};
use marrow_storage::{ObjectId, ObjectStore};

/// Copy length used when a copy instruction encodes length zero.
const DEFAULT_COPY_LEN: usize = 4096;

/// A pack entry expressed as instructions against a named base object.
#[derive(Debug, Clone)]
pub struct RefDelta {
    /// Id of the base object the instructions replay against.
    pub base: ObjectId,
    /// Raw instruction stream (sizes + copy/insert opcodes).
    pub data: Vec<u8>,
}

/// Reads a little-endian 7-bit varint (continuation in the high bit).
fn read_varint(input: &[u8], pos: &mut usize) -> Result<usize> {
    let mut value = 0usize;
    let mut shift = 0;
    loop {
        if shift >= usize::BITS as usize {
            return Err(ProtocolError::DeltaRange(
                "size varint too long".to_string(),
            ));
        }
        let byte = *input
            .get(*pos)
            .ok_or_else(|| ProtocolError::DeltaRange("truncated size varint".to_string()))?;
        *pos += 1;
        value |= ((byte & 0x7f) as usize) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    Ok(value)
}

/// Replays a delta instruction stream against base content.
pub fn apply(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut pos = 0;
    let source_size = read_varint(delta, &mut pos)?;
    let target_size = read_varint(delta, &mut pos)?;

    if source_size != base.len() {
        return Err(ProtocolError::DeltaSizeMismatch(format!(
            "declared source size {} but base has {} bytes",
            source_size,
            base.len()
        )));
    }

    // Capacity is a hint only; the declared size is untrusted input.
    let mut output = Vec::with_capacity(target_size.min(1 << 20));
    while pos < delta.len() {
        let opcode = delta[pos];
        pos += 1;

        if opcode & 0x80 != 0 {
            // Copy: bits 0-3 select offset bytes, bits 4-6 select length
            // bytes; absent bytes contribute zero.
            let mut offset = 0usize;
            for bit in 0..4 {
                if opcode & (1 << bit) != 0 {
                    let byte = *delta.get(pos).ok_or_else(|| {
                        ProtocolError::DeltaRange("truncated copy offset".to_string())
                    })?;
                    pos += 1;
                    offset |= (byte as usize) << (bit * 8);
                }
            }
            let mut len = 0usize;
            for bit in 4..7 {
                if opcode & (1 << bit) != 0 {
                    let byte = *delta.get(pos).ok_or_else(|| {
                        ProtocolError::DeltaRange("truncated copy length".to_string())
                    })?;
                    pos += 1;
                    len |= (byte as usize) << ((bit - 4) * 8);
                }
            }
            if len == 0 {
                len = DEFAULT_COPY_LEN;
            }

            let end = offset.checked_add(len).ok_or_else(|| {
                ProtocolError::DeltaRange("copy range overflows".to_string())
            })?;
            if end > source_size {
                return Err(ProtocolError::DeltaRange(format!(
                    "copy {}..{} exceeds source size {}",
                    offset, end, source_size
                )));
            }
            output.extend_from_slice(&base[offset..end]);
        } else if opcode != 0 {
            // Insert: low 7 bits give the literal length.
            let len = opcode as usize;
            let literal = delta.get(pos..pos + len).ok_or_else(|| {
                ProtocolError::DeltaRange("truncated insert literal".to_string())
            })?;
            pos += len;
            output.extend_from_slice(literal);
        } else {
            return Err(ProtocolError::DeltaRange(
                "reserved zero instruction".to_string(),
            ));
        }
    }

    if output.len() != target_size {
        return Err(ProtocolError::DeltaSizeMismatch(format!(
            "declared target size {} but produced {} bytes",
            target_size,
            output.len()
        )));
    }

    Ok(output)
}

/// Resolves queued deltas against the store, in passes.
///
/// Each pass applies every delta whose base is already present; the result
/// is stored under the base's type and becomes available to later entries,
/// so delta-of-delta chains and out-of-order bases resolve without any
/// ordering guarantee from the pack. A pass that makes no progress means
/// some base exists in neither the pack nor the store, which is fatal.
pub fn resolve(store: &ObjectStore, mut pending: Vec<RefDelta>) -> Result<Vec<ObjectId>> {
    let mut resolved = Vec::new();

    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();

        for delta in pending {
            if !store.contains(&delta.base) {
                deferred.push(delta);
                continue;
            }
            let base = store.get(&delta.base)?;
            let content = apply(&base.data, &delta.data)?;
            let id = store.put(base.object_type, content)?;
            tracing::debug!(base = %delta.base, id = %id, "resolved delta");
            resolved.push(id);
        }

        if deferred.len() == before {
            return Err(ProtocolError::MissingBase(deferred[0].base));
        }
        pending = deferred;
    }

    Ok(resolved)
}
