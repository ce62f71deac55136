//! Extended-attribute block.
//!
//! ```text
//! u32 masksize
//! u32 bitmap[masksize]
//! u64 attrs
//! u64 crtime[2]
//! u8  scanstamp[32]
//! ```
//!
//! Only word 0 of the bitmap names attributes this crate knows. Boolean
//! values live in `attrs` under the same bits as the bitmap.

use tracing::{error, trace};
use zilreplay_codec::{ByteSwapper, RecordReader, RecordWriter};
use zilreplay_store::{Timestamp, XattrSet, XoptAttrs, AV_SCANSTAMP_LEN};

use crate::config::ReplayConfig;
use crate::error::{ReplayError, ReplayResult};

/// Returns the encoded size of a block with `masksize` bitmap words.
#[must_use]
pub const fn xvattr_block_len(masksize: u32) -> usize {
    4 + 4 * masksize as usize + 3 * 8 + AV_SCANSTAMP_LEN
}

/// An extended-attribute block as logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XvattrBlock {
    /// Requested-attribute bitmap.
    pub bitmap: Vec<u32>,
    /// Boolean attribute values.
    pub attrs: u64,
    /// Creation time.
    pub crtime: [u64; 2],
    /// Anti-virus scan stamp.
    pub scanstamp: [u8; AV_SCANSTAMP_LEN],
}

impl XvattrBlock {
    /// Reads a block. The declared bitmap size must equal `map_size`.
    pub fn read(reader: &mut RecordReader<'_>, map_size: u32) -> ReplayResult<Self> {
        let start = reader.absolute_position();
        let masksize = reader.read_u32()?;
        if masksize != map_size {
            error!(
                offset = start,
                masksize, map_size, "extended-attribute map size mismatch"
            );
            return Err(ReplayError::incompatible(format!(
                "extended-attribute block declares {masksize} map words, expected {map_size}"
            )));
        }
        let count = reader.checked_count(u64::from(masksize), 4)?;
        let mut bitmap = Vec::with_capacity(count);
        for _ in 0..count {
            bitmap.push(reader.read_u32()?);
        }
        let attrs = reader.read_u64()?;
        let crtime = reader.read_words::<2>()?;
        let scanstamp = reader.read_array::<AV_SCANSTAMP_LEN>()?;
        trace!(
            offset = start,
            len = reader.absolute_position() - start,
            "decoded extended-attribute block"
        );
        Ok(Self {
            bitmap,
            attrs,
            crtime,
            scanstamp,
        })
    }

    /// Writes the block.
    pub fn write(&self, writer: &mut RecordWriter) {
        writer.put_u32(self.bitmap.len() as u32);
        for word in &self.bitmap {
            writer.put_u32(*word);
        }
        writer.put_u64(self.attrs);
        writer.put_words(&self.crtime);
        writer.put_bytes(&self.scanstamp);
    }

    /// Returns the attributes requested in bitmap word 0.
    pub fn requested(&self) -> XattrSet {
        XattrSet::from_bits(self.bitmap.first().copied().unwrap_or(0))
    }

    /// Copies every attribute requested by both the block and `capability`
    /// into `out`. Fields of `out` for other attributes are left untouched.
    pub fn apply(&self, capability: XattrSet, out: &mut XoptAttrs) {
        let requested = self.requested().intersection(capability);
        let values = XattrSet::from_bits(self.attrs as u32);
        out.request_map = self.bitmap.clone();
        out.requested = requested;

        let flags: [(XattrSet, &mut bool); 11] = [
            (XattrSet::HIDDEN, &mut out.hidden),
            (XattrSet::SYSTEM, &mut out.system),
            (XattrSet::ARCHIVE, &mut out.archive),
            (XattrSet::READONLY, &mut out.readonly),
            (XattrSet::IMMUTABLE, &mut out.immutable),
            (XattrSet::NOUNLINK, &mut out.nounlink),
            (XattrSet::APPENDONLY, &mut out.appendonly),
            (XattrSet::NODUMP, &mut out.nodump),
            (XattrSet::OPAQUE, &mut out.opaque),
            (XattrSet::AV_MODIFIED, &mut out.av_modified),
            (XattrSet::AV_QUARANTINED, &mut out.av_quarantined),
        ];
        for (attr, field) in flags {
            if requested.contains(attr) {
                *field = values.contains(attr);
            }
        }
        if requested.contains(XattrSet::CREATETIME) {
            out.createtime = Timestamp::from_words(self.crtime);
        }
        if requested.contains(XattrSet::AV_SCANSTAMP) {
            out.av_scanstamp = self.scanstamp;
        }
    }
}

/// Decodes an extended-attribute block into `out` and advances past it.
///
/// Fails with [`ReplayError::IncompatibleLayout`] when the declared bitmap
/// size differs from the configured one.
pub fn decode_xvattr(
    reader: &mut RecordReader<'_>,
    config: &ReplayConfig,
    out: &mut XoptAttrs,
) -> ReplayResult<()> {
    let block = XvattrBlock::read(reader, config.xva_map_size)?;
    block.apply(config.xattr_capability, out);
    Ok(())
}

/// Converts the byte order of an extended-attribute block in place.
///
/// The scan stamp is opaque and is stepped over.
pub(crate) fn swap_xvattr(swapper: &mut ByteSwapper<'_>) -> ReplayResult<()> {
    let masksize = swapper.swap_u32()?;
    swapper.swap_u32_array(masksize as usize)?;
    swapper.swap_u64_array(3)?;
    swapper.skip(AV_SCANSTAMP_LEN)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zilreplay_codec::SwapDirection;

    fn block(bitmap0: u32, attrs: u64) -> XvattrBlock {
        XvattrBlock {
            bitmap: vec![bitmap0, 0, 0],
            attrs,
            crtime: [1_700_000_000, 250],
            scanstamp: [0xab; AV_SCANSTAMP_LEN],
        }
    }

    fn encode(block: &XvattrBlock) -> Vec<u8> {
        let mut writer = RecordWriter::new();
        block.write(&mut writer);
        writer.into_vec()
    }

    #[test]
    fn block_length_formula() {
        assert_eq!(xvattr_block_len(3), 72);
        assert_eq!(xvattr_block_len(1), 64);
        assert_eq!(encode(&block(0, 0)).len(), xvattr_block_len(3));
    }

    #[test]
    fn consumes_exactly_the_block() {
        let mut bytes = encode(&block(XattrSet::HIDDEN.bits(), 0));
        bytes.extend_from_slice(b"name\0");
        let mut reader = RecordReader::new(&bytes);
        let mut out = XoptAttrs::default();
        decode_xvattr(&mut reader, &ReplayConfig::default(), &mut out).unwrap();
        assert_eq!(reader.position(), xvattr_block_len(3));
        assert_eq!(reader.read_cstr().unwrap(), b"name");
    }

    #[test]
    fn only_requested_attributes_are_written() {
        let req = XattrSet::IMMUTABLE | XattrSet::CREATETIME;
        let values = XattrSet::IMMUTABLE | XattrSet::HIDDEN | XattrSet::SYSTEM;
        let bytes = encode(&block(req.bits(), u64::from(values.bits())));
        let mut out = XoptAttrs::default();
        decode_xvattr(
            &mut RecordReader::new(&bytes),
            &ReplayConfig::default(),
            &mut out,
        )
        .unwrap();
        assert!(out.immutable);
        assert_eq!(out.createtime, Timestamp::from_words([1_700_000_000, 250]));
        assert!(!out.hidden);
        assert!(!out.system);
        assert_eq!(out.av_scanstamp, [0; AV_SCANSTAMP_LEN]);
        assert_eq!(out.requested, req);
    }

    #[test]
    fn unrequested_fields_keep_caller_defaults() {
        let bytes = encode(&block(XattrSet::READONLY.bits(), 0));
        let mut out = XoptAttrs {
            hidden: true,
            nodump: true,
            ..XoptAttrs::default()
        };
        decode_xvattr(
            &mut RecordReader::new(&bytes),
            &ReplayConfig::default(),
            &mut out,
        )
        .unwrap();
        assert!(out.hidden);
        assert!(out.nodump);
        assert!(!out.readonly);
    }

    #[test]
    fn capability_map_filters_requests() {
        let req = XattrSet::AV_SCANSTAMP | XattrSet::ARCHIVE;
        let bytes = encode(&block(req.bits(), u64::from(XattrSet::ARCHIVE.bits())));
        let config = ReplayConfig::default().xattr_capability(XattrSet::ARCHIVE);
        let mut out = XoptAttrs::default();
        decode_xvattr(&mut RecordReader::new(&bytes), &config, &mut out).unwrap();
        assert!(out.archive);
        assert_eq!(out.av_scanstamp, [0; AV_SCANSTAMP_LEN]);
        assert!(!out.is_requested(XattrSet::AV_SCANSTAMP));
    }

    #[test]
    fn map_size_mismatch_is_fatal() {
        let bytes = encode(&block(0, 0));
        let config = ReplayConfig::default().xva_map_size(2);
        let err = decode_xvattr(
            &mut RecordReader::new(&bytes),
            &config,
            &mut XoptAttrs::default(),
        )
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn truncated_block_is_rejected() {
        let bytes = encode(&block(0, 0));
        let err = decode_xvattr(
            &mut RecordReader::new(&bytes[..40]),
            &ReplayConfig::default(),
            &mut XoptAttrs::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ReplayError::Codec(_)));
    }

    #[test]
    fn swap_leaves_scanstamp_alone() {
        let original = encode(&block(0x1234, 0x55));
        let mut bytes = original.clone();
        swap_xvattr(&mut ByteSwapper::new(&mut bytes, SwapDirection::ToForeign)).unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 0, 3]);
        assert_eq!(&bytes[40..], &original[40..]);
        swap_xvattr(&mut ByteSwapper::new(&mut bytes, SwapDirection::ToHost)).unwrap();
        assert_eq!(bytes, original);
    }
}
