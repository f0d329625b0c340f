//! Smart-HTTP fetch client.
//!
//! One fetch round-trip against a single remote: GET the reference
//! advertisement, then POST a want list and receive the pack. Parsing is
//! split out of the transport so the wire formats are testable offline.

use crate::{PktLine, PktLineReader, PktLineWriter, ProtocolError, Result};
use marrow_storage::ObjectId;
use sha1::{Digest, Sha1};
use std::io::Cursor;

/// Content type for the upload-pack request body.
const UPLOAD_PACK_REQUEST: &str = "application/x-git-upload-pack-request";
/// Length of the trailing pack checksum.
const PACK_TRAILER_LEN: usize = 20;

/// Parsed reference advertisement.
#[derive(Debug, Clone)]
pub struct RefAdvertisement {
    /// Ref the remote's HEAD points at, from the `symref=HEAD:` capability.
    pub default_branch: Option<String>,
    /// Advertised `(id, refname)` pairs, in advertisement order.
    pub refs: Vec<(ObjectId, String)>,
}

impl RefAdvertisement {
    /// Returns the distinct advertised tips, in first-seen order.
    pub fn wanted_ids(&self) -> Vec<ObjectId> {
        let mut seen = Vec::new();
        for (id, _) in &self.refs {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }
}

/// Parses an `info/refs?service=git-upload-pack` response body.
///
/// Layout: a service announcement pkt-line, a flush, the first ref line
/// carrying NUL-separated capabilities, further `<id> <refname>` lines, and
/// a terminating flush.
pub fn parse_advertisement(body: &[u8]) -> Result<RefAdvertisement> {
    let mut reader = PktLineReader::new(Cursor::new(body));

    let service = reader.read()?.ok_or_else(|| {
        ProtocolError::Protocol("empty advertisement response".to_string())
    })?;
    match service.as_str() {
        Some(line) if line.starts_with("# service=") => {}
        _ => {
            return Err(ProtocolError::Protocol(
                "missing service announcement".to_string(),
            ));
        }
    }
    match reader.read()? {
        Some(PktLine::Flush) => {}
        _ => {
            return Err(ProtocolError::Protocol(
                "missing flush after service announcement".to_string(),
            ));
        }
    }

    let mut default_branch = None;
    let mut refs = Vec::new();

    for (index, pkt) in reader.read_until_flush()?.into_iter().enumerate() {
        let Some(data) = pkt.data() else { continue };

        // The first ref line carries capabilities after a NUL.
        let (ref_part, capabilities) = match data.iter().position(|&b| b == 0) {
            Some(nul) => (&data[..nul], Some(&data[nul + 1..])),
            None => (data, None),
        };
        if index == 0 {
            if let Some(caps) = capabilities {
                default_branch = parse_symref_head(caps);
            }
        }

        let line = std::str::from_utf8(ref_part)
            .map_err(|_| ProtocolError::Protocol("non-UTF-8 ref line".to_string()))?
            .trim_end_matches('\n');
        let (hex, name) = line.split_once(' ').ok_or_else(|| {
            ProtocolError::Protocol(format!("malformed ref line: '{}'", line))
        })?;
        let id = ObjectId::from_hex(hex)
            .map_err(|_| ProtocolError::Protocol(format!("bad ref id: '{}'", hex)))?;
        refs.push((id, name.to_string()));
    }

    if refs.is_empty() {
        return Err(ProtocolError::Protocol(
            "remote advertised no refs".to_string(),
        ));
    }

    Ok(RefAdvertisement {
        default_branch,
        refs,
    })
}

/// Extracts the `symref=HEAD:<ref>` capability value, if present.
fn parse_symref_head(capabilities: &[u8]) -> Option<String> {
    let caps = std::str::from_utf8(capabilities).ok()?;
    caps.split_whitespace()
        .find_map(|cap| cap.strip_prefix("symref=HEAD:"))
        .map(|target| target.to_string())
}

/// Builds the pkt-line framed body of an upload-pack request.
pub fn build_want_request(wants: &[ObjectId]) -> Result<Vec<u8>> {
    let mut writer = PktLineWriter::new(Vec::new());
    for id in wants {
        writer.write_line(&format!("want {}", id))?;
    }
    writer.flush_pkt()?;
    writer.write_line("done")?;
    Ok(writer.into_inner())
}

/// Validates an upload-pack response and returns the verified pack bytes.
///
/// The response opens with a `NAK` pkt-line; everything after it is the
/// pack, whose final 20 bytes must equal the SHA-1 of all preceding pack
/// bytes. The checksum is verified here, before any parsing trusts the
/// payload.
pub fn verify_fetch_response(body: &[u8]) -> Result<Vec<u8>> {
    let mut reader = PktLineReader::new(Cursor::new(body));
    let nak = reader
        .read()?
        .ok_or_else(|| ProtocolError::Protocol("empty fetch response".to_string()))?;
    if nak.as_str() != Some("NAK") {
        return Err(ProtocolError::Protocol(
            "fetch response did not open with NAK".to_string(),
        ));
    }

    let consumed = reader.inner_mut().position() as usize;
    let pack = &body[consumed..];
    if pack.len() < PACK_TRAILER_LEN {
        return Err(ProtocolError::Protocol(
            "fetch response too short for a pack".to_string(),
        ));
    }

    let (payload, trailer) = pack.split_at(pack.len() - PACK_TRAILER_LEN);
    let mut hasher = Sha1::new();
    hasher.update(payload);
    if hasher.finalize().as_slice() != trailer {
        return Err(ProtocolError::Protocol(
            "pack checksum mismatch".to_string(),
        ));
    }

    Ok(pack.to_vec())
}

/// Blocking client for one remote repository.
pub struct RemoteClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl RemoteClient {
    /// Creates a client for the given repository URL.
    pub fn new(url: &str) -> Self {
        let base_url = url.trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Fetches and parses the reference advertisement.
    pub fn advertise(&self) -> Result<RefAdvertisement> {
        let url = format!("{}/info/refs?service=git-upload-pack", self.base_url);
        tracing::debug!(url = %url, "requesting ref advertisement");

        let response = self.http.get(&url).send()?;
        if !response.status().is_success() {
            return Err(ProtocolError::Protocol(format!(
                "advertisement request failed with status {}",
                response.status()
            )));
        }
        let body = response.bytes()?;
        parse_advertisement(&body)
    }

    /// Negotiates a fetch for the wanted ids and returns the verified pack.
    pub fn fetch(&self, wants: &[ObjectId]) -> Result<Vec<u8>> {
        let url = format!("{}/git-upload-pack", self.base_url);
        tracing::debug!(url = %url, wants = wants.len(), "requesting pack");

        let body = build_want_request(wants)?;
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, UPLOAD_PACK_REQUEST)
            .body(body)
            .send()?;
        if !response.status().is_success() {
            return Err(ProtocolError::Protocol(format!(
                "fetch request failed with status {}",
                response.status()
            )));
        }
        let body = response.bytes()?;
        verify_fetch_response(&body)
    }
}
