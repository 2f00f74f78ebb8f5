use std::collections::HashMap;

use thiserror::Error;

pub const SOH: u8 = 0x01;

#[derive(Debug, Error)]
pub enum FixProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("checksum mismatch: expected {expected:03}, computed {actual:03}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("frame buffer exceeded 1 MiB without a complete message")]
    FrameOverflow,
}

/// A parsed FIX message: the ordered tag=value pairs as they appeared on
/// the wire (spec §3 `FIX Message`, tag-map). Order is preserved because
/// repeating groups rely on it; `get` returns the first match for a tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixMessage {
    pub fields: Vec<(u32, String)>,
}

impl FixMessage {
    pub fn get(&self, tag: u32) -> Option<&str> {
        self.fields.iter().find(|(t, _)| *t == tag).map(|(_, v)| v.as_str())
    }

    pub fn msg_type(&self) -> Option<&str> {
        self.get(35)
    }

    pub fn seq_num(&self) -> Option<u32> {
        self.get(34).and_then(|v| v.parse().ok())
    }

    /// Recognized-tag-set equality used by the round-trip property: two
    /// messages agree iff their tag maps agree, independent of any
    /// incidental ordering difference.
    pub fn as_map(&self) -> HashMap<u32, String> {
        self.fields.iter().cloned().collect()
    }
}

/// Sum of all bytes in `data`, mod 256 (spec §4.3, property 2).
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Parse a single, already-framed FIX message (the trailing `10=NNN<SOH>`
/// is included). Recomputes and validates the checksum against the
/// declared value (property 2); mismatches are reported, never
/// silently accepted.
pub fn parse_message(raw: &[u8]) -> Result<FixMessage, FixProtocolError> {
    let mut fields = Vec::new();
    for chunk in raw.split(|&b| b == SOH) {
        if chunk.is_empty() {
            continue;
        }
        let s = std::str::from_utf8(chunk).map_err(|_| FixProtocolError::Malformed("non-utf8 field".into()))?;
        let (tag_str, value) = s
            .split_once('=')
            .ok_or_else(|| FixProtocolError::Malformed(format!("missing '=' in field '{s}'")))?;
        let tag: u32 = tag_str
            .parse()
            .map_err(|_| FixProtocolError::Malformed(format!("non-numeric tag '{tag_str}'")))?;
        fields.push((tag, value.to_string()));
    }

    let Some((last_tag, last_value)) = fields.last().cloned() else {
        return Err(FixProtocolError::Malformed("empty message".into()));
    };
    if last_tag != 10 {
        return Err(FixProtocolError::Malformed("message does not end in checksum tag 10".into()));
    }
    let declared: u8 = last_value
        .parse()
        .map_err(|_| FixProtocolError::Malformed(format!("non-numeric checksum value '{last_value}'")))?;

    let mut prefix = Vec::new();
    for (tag, value) in &fields[..fields.len() - 1] {
        prefix.extend_from_slice(format!("{tag}={value}").as_bytes());
        prefix.push(SOH);
    }
    let actual = checksum(&prefix);
    if actual != declared {
        return Err(FixProtocolError::ChecksumMismatch { expected: declared, actual });
    }

    if fields.iter().find(|(t, _)| *t == 35).is_none() {
        return Err(FixProtocolError::Malformed("missing MsgType (35)".into()));
    }
    if fields.iter().find(|(t, _)| *t == 49).is_none() {
        return Err(FixProtocolError::Malformed("missing SenderCompID (49)".into()));
    }

    Ok(FixMessage { fields })
}

/// Build a complete outbound message: tag order `8, 9, 35, ...ascending,
/// 10`, with BodyLength and CheckSum computed over the constructed bytes
/// (spec §4.3 "Outbound message construction"). `body_fields` must not
/// include tags 8, 9, 10, or 35 — those are supplied separately.
pub fn build_message(begin_string: &str, msg_type: &str, mut body_fields: Vec<(u32, String)>) -> Vec<u8> {
    body_fields.retain(|(t, _)| !matches!(t, 8 | 9 | 10 | 35));
    body_fields.sort_by_key(|(t, _)| *t);

    let mut body = String::new();
    body.push_str(&format!("35={msg_type}"));
    body.push(SOH as char);
    for (tag, value) in &body_fields {
        body.push_str(&format!("{tag}={value}"));
        body.push(SOH as char);
    }

    let head = format!("8={begin_string}{soh}9={len}{soh}", soh = SOH as char, len = body.len());

    let mut without_checksum = String::with_capacity(head.len() + body.len());
    without_checksum.push_str(&head);
    without_checksum.push_str(&body);

    let csum = checksum(without_checksum.as_bytes());

    let mut full = without_checksum;
    full.push_str(&format!("10={csum:03}"));
    full.push(SOH as char);

    full.into_bytes()
}
