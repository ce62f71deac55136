//! Byte-order normalization of whole records.
//!
//! A log written on a host of the opposite byte order is converted in place
//! before it is decoded. Every multi-byte integer in the record is reversed:
//! the header, the fixed payload, extended-attribute blocks, ACE headers and
//! logged FUIDs. Names, domain strings, write data, scan stamps and object
//! GUIDs are opaque bytes and are left alone.
//!
//! Sub-structures are sized by counts stored earlier in the same record, so
//! each count is taken in host order before the region it sizes is visited.

use zilreplay_codec::{ByteSwapper, RecordReader, SwapDirection};
use zilreplay_store::AttrMask;

use crate::decode::acl::{swap_current_aces, swap_legacy_aces};
use crate::decode::fuid::swap_identity_list;
use crate::decode::xvattr::swap_xvattr;
use crate::error::{ReplayError, ReplayResult};
use crate::record::layout::{
    AclCreateFields, AclFields, AclV0Fields, CreateFields, FixedLayout, LinkFields, RemoveFields,
    RenameFields, SetAttrFields, TruncateFields, WriteFields,
};
use crate::record::{LogHeader, TxType};

/// Converts a record written in the opposite byte order to host order.
///
/// The transaction type is checked before any byte is changed, so a record
/// of an unknown type is returned untouched with
/// [`ReplayError::Unsupported`]. A record that ends before its own counts say
/// it should fails with a codec error and may be left partly converted.
pub fn normalize(record: &mut [u8]) -> ReplayResult<()> {
    convert(record, SwapDirection::ToHost)
}

/// Converts a host-order record to the opposite byte order.
///
/// The inverse of [`normalize`]; used to produce foreign-order records.
pub fn denormalize(record: &mut [u8]) -> ReplayResult<()> {
    convert(record, SwapDirection::ToForeign)
}

/// Returns the transaction type and case-insensitive hint of a record,
/// reading only its first word.
pub fn peek_txtype(record: &[u8], byteswapped: bool) -> ReplayResult<(TxType, bool)> {
    let raw = RecordReader::new(record).read_u64()?;
    let raw = if byteswapped { raw.swap_bytes() } else { raw };
    Ok(TxType::split(raw))
}

fn convert(record: &mut [u8], direction: SwapDirection) -> ReplayResult<()> {
    let (txtype, _) = peek_txtype(record, direction == SwapDirection::ToHost)?;
    if !txtype.is_replayable() {
        return Err(ReplayError::Unsupported {
            code: txtype.code(),
        });
    }
    if record.len() < LogHeader::LEN {
        // Surface the truncation without touching the buffer.
        RecordReader::new(record).read_words::<4>()?;
    }

    let mut swapper = ByteSwapper::new(record, direction);
    swapper.swap_words::<4>()?;
    match txtype {
        TxType::Create | TxType::Mkdir | TxType::MkXattr | TxType::Symlink => {
            CreateFields::swap(&mut swapper)?;
        }
        TxType::CreateAttr | TxType::MkdirAttr => {
            CreateFields::swap(&mut swapper)?;
            swap_xvattr(&mut swapper)?;
        }
        TxType::CreateAcl
        | TxType::MkdirAcl
        | TxType::CreateAclAttr
        | TxType::MkdirAclAttr => {
            let fields = AclCreateFields::swap(&mut swapper)?;
            if txtype.has_xvattr() {
                swap_xvattr(&mut swapper)?;
            }
            swap_current_aces(&mut swapper, fields.acl_bytes)?;
            swap_identity_list(&mut swapper, fields.fuidcnt)?;
        }
        TxType::Remove | TxType::Rmdir => {
            RemoveFields::swap(&mut swapper)?;
        }
        TxType::Link => {
            LinkFields::swap(&mut swapper)?;
        }
        TxType::Rename => {
            RenameFields::swap(&mut swapper)?;
        }
        TxType::Write => {
            WriteFields::swap(&mut swapper)?;
        }
        TxType::Truncate => {
            TruncateFields::swap(&mut swapper)?;
        }
        TxType::SetAttr => {
            let fields = SetAttrFields::swap(&mut swapper)?;
            if AttrMask::from_bits(fields.mask).contains(AttrMask::XVATTR) {
                swap_xvattr(&mut swapper)?;
            }
        }
        TxType::AclV0 => {
            let fields = AclV0Fields::swap(&mut swapper)?;
            swap_legacy_aces(&mut swapper, fields.aclcnt)?;
        }
        TxType::Acl => {
            let fields = AclFields::swap(&mut swapper)?;
            swap_current_aces(&mut swapper, fields.acl_bytes)?;
            if fields.fuidcnt > 0 {
                swap_identity_list(&mut swapper, fields.fuidcnt)?;
            }
        }
        TxType::Reserved | TxType::Unknown(_) => {
            return Err(ReplayError::Unsupported {
                code: txtype.code(),
            })
        }
    }
    Ok(())
}
