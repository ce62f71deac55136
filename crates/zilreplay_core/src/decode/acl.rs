//! Access-control entry arrays.
//!
//! The legacy encoding is `count` fixed 12-byte entries. The current encoding
//! is a byte stream of `acl_bytes` bytes holding variable-size entries,
//! padded with zeros to the next word; the size of each entry depends on its
//! flags and type (see [`Ace::current_len`]).

use tracing::trace;
use zilreplay_codec::{round_up_u64, ByteSwapper, CodecResult, RecordReader, RecordWriter};
use zilreplay_store::{Ace, AclEncoding, AclSet, ObjectAceGuids};

use crate::error::{ReplayError, ReplayResult};

/// Returns the number of bytes an ACE stream of `acl_bytes` occupies once
/// padded to a word.
pub fn padded_acl_len(acl_bytes: u64) -> ReplayResult<u64> {
    round_up_u64(acl_bytes)
        .ok_or_else(|| ReplayError::malformed(format!("ACL byte count {acl_bytes} overflows")))
}

fn read_header(reader: &mut RecordReader<'_>) -> ReplayResult<Ace> {
    Ok(Ace {
        who: reader.read_u32()?,
        access_mask: reader.read_u32()?,
        flags: reader.read_u16()?,
        ace_type: reader.read_u16()?,
        object: None,
    })
}

/// Decodes `count` legacy entries and advances past them.
pub fn decode_legacy_aces(reader: &mut RecordReader<'_>, count: u64) -> ReplayResult<AclSet> {
    let start = reader.absolute_position();
    let count = reader.checked_count(count, Ace::HEADER_LEN)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(read_header(reader)?);
    }
    trace!(offset = start, entries = count, "decoded legacy ACEs");
    Ok(AclSet {
        encoding: AclEncoding::Legacy,
        entries,
        flags: 0,
        byte_len: (count * Ace::HEADER_LEN) as u64,
    })
}

/// Decodes a current-encoding ACE stream and its padding, and advances past
/// both.
///
/// The stream must hold exactly `aclcnt` entries and no partial entry.
pub fn decode_current_aces(
    reader: &mut RecordReader<'_>,
    aclcnt: u64,
    acl_bytes: u64,
    acl_flags: u64,
) -> ReplayResult<AclSet> {
    let start = reader.absolute_position();
    let padded = padded_acl_len(acl_bytes)?;
    let mut stream = reader.nested(acl_bytes)?;
    reader.skip(usize::try_from(padded - acl_bytes).unwrap_or(usize::MAX))?;

    let mut entries = Vec::with_capacity(stream.remaining() / Ace::HEADER_LEN);
    while !stream.is_empty() {
        let mut ace = read_header(&mut stream)?;
        if Ace::current_len(ace.flags, ace.ace_type) == Ace::OBJECT_LEN {
            ace.object = Some(ObjectAceGuids {
                object_type: stream.read_array::<16>()?,
                inherit_object_type: stream.read_array::<16>()?,
            });
        }
        entries.push(ace);
    }
    if entries.len() as u64 != aclcnt {
        return Err(ReplayError::malformed(format!(
            "ACL declares {aclcnt} entries, stream holds {}",
            entries.len()
        )));
    }
    trace!(
        offset = start,
        len = reader.absolute_position() - start,
        entries = entries.len(),
        "decoded ACEs"
    );
    Ok(AclSet {
        encoding: AclEncoding::Current,
        entries,
        flags: acl_flags,
        byte_len: acl_bytes,
    })
}

/// Writes entries in the given encoding. The current encoding is followed by
/// word padding; the legacy encoding is not padded.
pub fn encode_aces(writer: &mut RecordWriter, encoding: AclEncoding, entries: &[Ace]) {
    for ace in entries {
        writer.put_u32(ace.who);
        writer.put_u32(ace.access_mask);
        writer.put_u16(ace.flags);
        writer.put_u16(ace.ace_type);
        if encoding == AclEncoding::Current
            && Ace::current_len(ace.flags, ace.ace_type) == Ace::OBJECT_LEN
        {
            let guids = ace.object.unwrap_or_default();
            writer.put_bytes(&guids.object_type);
            writer.put_bytes(&guids.inherit_object_type);
        }
    }
    if encoding == AclEncoding::Current {
        writer.pad_to_word();
    }
}

/// Returns the unpadded size of `entries` in the current encoding.
pub fn current_acl_bytes(entries: &[Ace]) -> u64 {
    entries
        .iter()
        .map(|ace| Ace::current_len(ace.flags, ace.ace_type) as u64)
        .sum()
}

/// Swaps one entry header and returns its host-order flags and type.
fn swap_header(swapper: &mut ByteSwapper<'_>) -> CodecResult<(u16, u16)> {
    swapper.swap_u32()?;
    swapper.swap_u32()?;
    let flags = swapper.swap_u16()?;
    let ace_type = swapper.swap_u16()?;
    Ok((flags, ace_type))
}

/// Converts the byte order of `count` legacy entries in place.
pub(crate) fn swap_legacy_aces(swapper: &mut ByteSwapper<'_>, count: u64) -> ReplayResult<()> {
    let len = count
        .checked_mul(Ace::HEADER_LEN as u64)
        .and_then(|len| usize::try_from(len).ok())
        .ok_or_else(|| ReplayError::malformed(format!("ACE count {count} overflows")))?;
    swapper.nested(len, |s| {
        for _ in 0..count {
            swap_header(s)?;
        }
        Ok(())
    })?;
    Ok(())
}

/// Converts the byte order of a current-encoding stream in place and steps
/// over its padding. Object GUIDs are opaque and are not swapped.
pub(crate) fn swap_current_aces(swapper: &mut ByteSwapper<'_>, acl_bytes: u64) -> ReplayResult<()> {
    let padded = padded_acl_len(acl_bytes)?;
    let too_long = || ReplayError::malformed(format!("ACL byte count {acl_bytes} overflows"));
    let len = usize::try_from(acl_bytes).map_err(|_| too_long())?;
    let pad = usize::try_from(padded - acl_bytes).map_err(|_| too_long())?;
    swapper.nested(len, |s| {
        while s.remaining() > 0 {
            let (flags, ace_type) = swap_header(s)?;
            s.skip(Ace::current_len(flags, ace_type) - Ace::HEADER_LEN)?;
        }
        Ok(())
    })?;
    swapper.skip(pad)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zilreplay_codec::SwapDirection;
    use zilreplay_store::{
        ACE_ACCESS_ALLOWED_OBJECT_ACE_TYPE, ACE_EVERYONE, ACE_IDENTIFIER_GROUP, ACE_OWNER,
    };

    fn sample() -> Vec<Ace> {
        vec![
            Ace {
                who: 0,
                access_mask: 0x1f,
                flags: ACE_OWNER,
                ace_type: 0,
                object: None,
            },
            Ace {
                who: 2001,
                access_mask: 0x3,
                flags: ACE_IDENTIFIER_GROUP,
                ace_type: ACE_ACCESS_ALLOWED_OBJECT_ACE_TYPE,
                object: Some(ObjectAceGuids {
                    object_type: [1; 16],
                    inherit_object_type: [2; 16],
                }),
            },
            Ace {
                who: 0,
                access_mask: 0x1,
                flags: ACE_EVERYONE,
                ace_type: 1,
                object: None,
            },
        ]
    }

    fn encoded(entries: &[Ace], encoding: AclEncoding) -> Vec<u8> {
        let mut writer = RecordWriter::new();
        encode_aces(&mut writer, encoding, entries);
        writer.into_vec()
    }

    #[test]
    fn current_stream_size() {
        assert_eq!(current_acl_bytes(&sample()), 12 + 44 + 12);
        assert_eq!(encoded(&sample(), AclEncoding::Current).len(), 72);
    }

    #[test]
    fn decodes_current_stream_and_padding() {
        let entries = sample();
        let mut bytes = encoded(&entries, AclEncoding::Current);
        bytes.extend_from_slice(b"next\0");
        let mut reader = RecordReader::new(&bytes);
        let acl = decode_current_aces(&mut reader, 3, current_acl_bytes(&entries), 7).unwrap();
        assert_eq!(acl.entries, entries);
        assert_eq!(acl.flags, 7);
        assert_eq!(acl.byte_len, 68);
        assert_eq!(reader.position(), 72);
        assert_eq!(reader.read_cstr().unwrap(), b"next");
    }

    #[test]
    fn entry_count_must_match() {
        let entries = sample();
        let bytes = encoded(&entries, AclEncoding::Current);
        let err = decode_current_aces(&mut RecordReader::new(&bytes), 2, 68, 0).unwrap_err();
        assert!(matches!(err, ReplayError::Malformed { .. }));
    }

    #[test]
    fn partial_entry_is_truncation() {
        let entries = sample();
        let bytes = encoded(&entries, AclEncoding::Current);
        // 30 bytes ends inside the object entry.
        let err = decode_current_aces(&mut RecordReader::new(&bytes), 2, 30, 0).unwrap_err();
        assert!(matches!(err, ReplayError::Codec(_)));
    }

    #[test]
    fn legacy_entries_ignore_object_types() {
        let entries: Vec<Ace> = sample()
            .into_iter()
            .map(|ace| Ace { object: None, ..ace })
            .collect();
        let bytes = encoded(&entries, AclEncoding::Legacy);
        assert_eq!(bytes.len(), 36);
        let mut reader = RecordReader::new(&bytes);
        let acl = decode_legacy_aces(&mut reader, 3).unwrap();
        assert_eq!(acl.entries, entries);
        assert_eq!(acl.encoding, AclEncoding::Legacy);
        assert!(reader.is_empty());
    }

    #[test]
    fn legacy_count_larger_than_buffer() {
        let bytes = [0u8; 24];
        assert!(decode_legacy_aces(&mut RecordReader::new(&bytes), 3).is_err());
    }

    #[test]
    fn current_swap_round_trip_keeps_guids() {
        let entries = sample();
        let original = encoded(&entries, AclEncoding::Current);
        let mut bytes = original.clone();
        swap_current_aces(
            &mut ByteSwapper::new(&mut bytes, SwapDirection::ToForeign),
            68,
        )
        .unwrap();
        assert_ne!(bytes, original);
        assert_eq!(&bytes[24..56], &original[24..56]);
        swap_current_aces(&mut ByteSwapper::new(&mut bytes, SwapDirection::ToHost), 68).unwrap();
        assert_eq!(bytes, original);
    }

    #[test]
    fn legacy_swap_is_per_field() {
        let entries = vec![Ace {
            who: 0x0102_0304,
            access_mask: 0,
            flags: 0x0506,
            ace_type: 0,
            object: None,
        }];
        let mut bytes = encoded(&entries, AclEncoding::Legacy);
        swap_legacy_aces(&mut ByteSwapper::new(&mut bytes, SwapDirection::ToForeign), 1).unwrap();
        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
        assert_eq!(&bytes[8..10], &[5, 6]);
    }
}
