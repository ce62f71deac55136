//! Record builders.
//!
//! Builders produce bit-exact host-order records. The header's `reclen` is
//! filled in with the padded record length, as the log writer does.
//!
//! ```rust
//! use zilreplay_testkit::builders;
//!
//! let record = builders::rename(4, b"a", 4, b"b").case_insensitive(true).build();
//! assert_eq!(record.len() % 8, 0);
//! ```

use zilreplay_codec::RecordWriter;
use zilreplay_core::decode::{current_acl_bytes, encode_aces, XvattrBlock};
use zilreplay_core::layout::{
    AclCreateFields, AclFields, AclV0Fields, CreateFields, FixedLayout, LinkFields, RemoveFields,
    RenameFields, SetAttrFields, TruncateFields, WriteFields,
};
use zilreplay_core::{denormalize, LogHeader, ReplayResult, TxType, DEFAULT_XVA_MAP_SIZE};
use zilreplay_store::{Ace, AclEncoding, AttrMask, Timestamp, XattrSet, AV_SCANSTAMP_LEN};

/// Offset of `reclen` within the header.
const RECLEN_OFFSET: usize = 8;

/// Builds one record by appending its regions in layout order.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    txtype: TxType,
    case_insensitive: bool,
    txg: u64,
    seq: u64,
    body: RecordWriter,
}

impl RecordBuilder {
    /// Starts a record of the given type with an empty body.
    pub fn new(txtype: TxType) -> Self {
        Self {
            txtype,
            case_insensitive: false,
            txg: 1,
            seq: 1,
            body: RecordWriter::new(),
        }
    }

    /// Sets the case-insensitive lookup hint.
    #[must_use]
    pub fn case_insensitive(mut self, value: bool) -> Self {
        self.case_insensitive = value;
        self
    }

    /// Sets the transaction group.
    #[must_use]
    pub fn txg(mut self, txg: u64) -> Self {
        self.txg = txg;
        self
    }

    /// Sets the sequence number.
    #[must_use]
    pub fn seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    /// Appends a fixed payload.
    #[must_use]
    pub fn fixed<L: FixedLayout>(mut self, fields: &L) -> Self {
        fields.write(&mut self.body);
        self
    }

    /// Appends an extended-attribute block.
    #[must_use]
    pub fn xvattr(mut self, block: &XvattrBlock) -> Self {
        block.write(&mut self.body);
        self
    }

    /// Appends NUL-terminated domain strings.
    #[must_use]
    pub fn domains(mut self, domains: &[&str]) -> Self {
        for domain in domains {
            self.body.put_cstr(domain.as_bytes());
        }
        self
    }

    /// Appends ACEs in the given encoding.
    #[must_use]
    pub fn aces(mut self, encoding: AclEncoding, entries: &[Ace]) -> Self {
        encode_aces(&mut self.body, encoding, entries);
        self
    }

    /// Appends logged FUIDs.
    #[must_use]
    pub fn fuids(mut self, fuids: &[u64]) -> Self {
        self.body.put_words(fuids);
        self
    }

    /// Appends a NUL-terminated string.
    #[must_use]
    pub fn cstr(mut self, bytes: &[u8]) -> Self {
        self.body.put_cstr(bytes);
        self
    }

    /// Appends raw bytes.
    #[must_use]
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.body.put_bytes(bytes);
        self
    }

    /// Returns the finished host-order record.
    pub fn build(self) -> Vec<u8> {
        let mut writer = RecordWriter::with_capacity(LogHeader::LEN + self.body.len() + 8);
        LogHeader {
            txtype: self.txtype,
            case_insensitive: self.case_insensitive,
            reclen: 0,
            txg: self.txg,
            seq: self.seq,
        }
        .write(&mut writer);
        writer.put_bytes(self.body.as_bytes());
        writer.pad_to_word();
        let reclen = writer.len() as u64;
        writer.patch_u64(RECLEN_OFFSET, reclen);
        writer.into_vec()
    }

    /// Returns the finished record in the opposite byte order.
    pub fn build_foreign(self) -> ReplayResult<Vec<u8>> {
        let mut record = self.build();
        denormalize(&mut record)?;
        Ok(record)
    }
}

/// Returns create-family fixed fields with a set creation time and
/// generation. `mode` must carry the file type bits.
pub fn create_fields(doid: u64, foid: u64, mode: u64, uid: u64, gid: u64) -> CreateFields {
    CreateFields {
        doid,
        foid,
        mode,
        uid,
        gid,
        gen: 1,
        crtime: [1_700_000_000, 0],
        rdev: 0,
    }
}

/// Returns an extended-attribute block with a default-size map requesting
/// `requested`, holding boolean values `values`.
pub fn xvattr_block(requested: XattrSet, values: XattrSet, crtime: Timestamp) -> XvattrBlock {
    let mut bitmap = vec![0; DEFAULT_XVA_MAP_SIZE as usize];
    bitmap[0] = requested.bits();
    XvattrBlock {
        bitmap,
        attrs: u64::from(values.bits()),
        crtime: crtime.to_words(),
        scanstamp: [0; AV_SCANSTAMP_LEN],
    }
}

/// A create, mkdir or mkxattr record.
///
/// `domains` must hold one string per distinct domain the owner and group
/// reference.
pub fn create(txtype: TxType, fields: CreateFields, domains: &[&str], name: &[u8]) -> RecordBuilder {
    RecordBuilder::new(txtype)
        .fixed(&fields)
        .domains(domains)
        .cstr(name)
}

/// A create of a regular file with resolved owner and group.
pub fn create_file(doid: u64, foid: u64, name: &[u8]) -> RecordBuilder {
    create(
        TxType::Create,
        create_fields(doid, foid, 0o100_644, 1000, 1000),
        &[],
        name,
    )
}

/// A mkdir with resolved owner and group.
pub fn mkdir(doid: u64, foid: u64, name: &[u8]) -> RecordBuilder {
    create(
        TxType::Mkdir,
        create_fields(doid, foid, 0o040_755, 1000, 1000),
        &[],
        name,
    )
}

/// A symlink record.
pub fn symlink(doid: u64, foid: u64, name: &[u8], target: &[u8]) -> RecordBuilder {
    RecordBuilder::new(TxType::Symlink)
        .fixed(&create_fields(doid, foid, 0o120_777, 1000, 1000))
        .cstr(name)
        .cstr(target)
}

/// A create-with-attributes or mkdir-with-attributes record.
pub fn create_attr(
    txtype: TxType,
    fields: CreateFields,
    block: &XvattrBlock,
    domains: &[&str],
    name: &[u8],
) -> RecordBuilder {
    RecordBuilder::new(txtype)
        .fixed(&fields)
        .xvattr(block)
        .domains(domains)
        .cstr(name)
}

/// A create-family record carrying an ACL, with an extended-attribute block
/// for the `_ATTR` variants.
pub fn create_acl(
    txtype: TxType,
    fields: CreateFields,
    block: Option<&XvattrBlock>,
    aces: &[Ace],
    fuids: &[u64],
    domains: &[&str],
    name: &[u8],
) -> RecordBuilder {
    let payload = AclCreateFields {
        create: fields,
        aclcnt: aces.len() as u64,
        domcnt: domains.len() as u64,
        fuidcnt: fuids.len() as u64,
        acl_bytes: current_acl_bytes(aces),
        acl_flags: 0,
    };
    let mut builder = RecordBuilder::new(txtype).fixed(&payload);
    if let Some(block) = block {
        builder = builder.xvattr(block);
    }
    builder
        .aces(AclEncoding::Current, aces)
        .fuids(fuids)
        .domains(domains)
        .cstr(name)
}

/// A remove record.
pub fn remove(doid: u64, name: &[u8]) -> RecordBuilder {
    RecordBuilder::new(TxType::Remove)
        .fixed(&RemoveFields { doid })
        .cstr(name)
}

/// An rmdir record.
pub fn rmdir(doid: u64, name: &[u8]) -> RecordBuilder {
    RecordBuilder::new(TxType::Rmdir)
        .fixed(&RemoveFields { doid })
        .cstr(name)
}

/// A link record.
pub fn link(doid: u64, link_obj: u64, name: &[u8]) -> RecordBuilder {
    RecordBuilder::new(TxType::Link)
        .fixed(&LinkFields { doid, link_obj })
        .cstr(name)
}

/// A rename record.
pub fn rename(sdoid: u64, src_name: &[u8], tdoid: u64, dst_name: &[u8]) -> RecordBuilder {
    RecordBuilder::new(TxType::Rename)
        .fixed(&RenameFields { sdoid, tdoid })
        .cstr(src_name)
        .cstr(dst_name)
}

/// A write record carrying `data`.
pub fn write(foid: u64, offset: u64, data: &[u8]) -> RecordBuilder {
    RecordBuilder::new(TxType::Write)
        .fixed(&WriteFields {
            foid,
            offset,
            length: data.len() as u64,
            blkoff: 0,
            blkptr: [0; 16],
        })
        .raw(data)
}

/// A truncate record.
pub fn truncate(foid: u64, offset: u64, length: u64) -> RecordBuilder {
    RecordBuilder::new(TxType::Truncate).fixed(&TruncateFields {
        foid,
        offset,
        length,
    })
}

/// A setattr record. The `XVATTR` mask bit is set when `block` is given.
pub fn setattr(
    mut fields: SetAttrFields,
    block: Option<&XvattrBlock>,
    domains: &[&str],
) -> RecordBuilder {
    if block.is_some() {
        fields.mask |= AttrMask::XVATTR.bits();
    }
    let mut builder = RecordBuilder::new(TxType::SetAttr).fixed(&fields);
    if let Some(block) = block {
        builder = builder.xvattr(block);
    }
    builder.domains(domains)
}

/// A legacy-format ACL record.
pub fn acl_v0(foid: u64, aces: &[Ace]) -> RecordBuilder {
    RecordBuilder::new(TxType::AclV0)
        .fixed(&AclV0Fields {
            foid,
            aclcnt: aces.len() as u64,
        })
        .aces(AclEncoding::Legacy, aces)
}

/// A current-format ACL record. The identity list and domains are written
/// only when `fuids` is not empty.
pub fn acl(foid: u64, aces: &[Ace], fuids: &[u64], domains: &[&str]) -> RecordBuilder {
    let (domains, domcnt) = if fuids.is_empty() {
        (&[][..], 0)
    } else {
        (domains, domains.len() as u64)
    };
    RecordBuilder::new(TxType::Acl)
        .fixed(&AclFields {
            foid,
            aclcnt: aces.len() as u64,
            domcnt,
            fuidcnt: fuids.len() as u64,
            acl_bytes: current_acl_bytes(aces),
            acl_flags: 0,
        })
        .aces(AclEncoding::Current, aces)
        .fuids(fuids)
        .domains(domains)
}
