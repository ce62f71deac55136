use tracing::trace;
use zilreplay_codec::{RecordReader, WORD_SIZE};
use zilreplay_store::{
    AclSet, AttrMask, IdentityContext, IdentityRef, NameFlags, ObjectId, Timestamp, Vattr,
    XoptAttrs,
};

use super::layout::{
    AclCreateFields, AclFields, AclV0Fields, CreateFields, FixedLayout, LinkFields, RemoveFields,
    RenameFields, SetAttrFields, TruncateFields, WriteFields,
};
use super::{LogHeader, TxType};
use crate::config::ReplayConfig;
use crate::decode::{
    decode_compact_domains, decode_current_aces, decode_identity_list, decode_legacy_aces,
    decode_xvattr,
};
use crate::error::{ReplayError, ReplayResult};

/// What a create-family record creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateKind<'a> {
    /// A regular file, device node, fifo or socket.
    File,
    /// A directory.
    Directory,
    /// The extended-attribute directory of the parent.
    XattrDir,
    /// A symbolic link.
    Symlink {
        /// Link target.
        target: &'a [u8],
    },
}

/// A decoded create-family record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRecord<'a> {
    /// What to create.
    pub kind: CreateKind<'a>,
    /// Parent directory.
    pub parent: ObjectId,
    /// Id the new object must get.
    pub object: ObjectId,
    /// Entry name. Empty and unused for [`CreateKind::XattrDir`].
    pub name: &'a [u8],
    /// Attributes, with the creation time in `ctime` and the generation in
    /// `nblocks`.
    pub attrs: Vattr,
    /// Extended attributes, for the `_ATTR` variants.
    pub xoptattrs: Option<XoptAttrs>,
    /// Initial ACL, for the `_ACL` variants.
    pub acl: Option<AclSet>,
    /// Identity data for ephemeral owner, group and ACL ids.
    pub identities: IdentityContext,
}

/// The mutation a record describes, with every trailing structure decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody<'a> {
    /// Create a file, directory, xattr directory or symlink.
    Create(CreateRecord<'a>),
    /// Remove a non-directory entry.
    Remove {
        /// Directory holding the entry.
        parent: ObjectId,
        /// Entry name.
        name: &'a [u8],
    },
    /// Remove an empty directory.
    Rmdir {
        /// Directory holding the entry.
        parent: ObjectId,
        /// Entry name.
        name: &'a [u8],
    },
    /// Add a hard link.
    Link {
        /// Directory to add the entry to.
        parent: ObjectId,
        /// Object the entry names.
        target: ObjectId,
        /// Entry name.
        name: &'a [u8],
    },
    /// Rename an entry.
    Rename {
        /// Source directory.
        src_parent: ObjectId,
        /// Source name.
        src_name: &'a [u8],
        /// Target directory.
        dst_parent: ObjectId,
        /// Target name.
        dst_name: &'a [u8],
    },
    /// Write file data.
    Write {
        /// File.
        object: ObjectId,
        /// Offset of the write.
        offset: u64,
        /// Data to write.
        data: &'a [u8],
    },
    /// Free a byte range.
    Truncate {
        /// File.
        object: ObjectId,
        /// Start of the range.
        offset: u64,
        /// Length of the range.
        length: u64,
    },
    /// Set attributes.
    SetAttr {
        /// Object.
        object: ObjectId,
        /// Attributes selected by `attrs.mask`.
        attrs: Vattr,
        /// Extended attributes, when the mask carries `XVATTR`.
        xoptattrs: Option<XoptAttrs>,
        /// Identity data for ephemeral owner and group.
        identities: IdentityContext,
    },
    /// Replace an ACL.
    SetAcl {
        /// Object.
        object: ObjectId,
        /// The new list.
        acl: AclSet,
        /// Identity data for ephemeral ACL ids.
        identities: IdentityContext,
    },
}

/// A fully decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord<'a> {
    /// Common header.
    pub header: LogHeader,
    /// The mutation.
    pub body: RecordBody<'a>,
}

impl<'a> LogRecord<'a> {
    /// Decodes a host-order record.
    ///
    /// Decoding walks the record strictly in layout order. Every count is
    /// checked against the bytes that remain before anything is allocated,
    /// and a record that ends early fails with a codec error instead of being
    /// read past its end.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::Unsupported`] for reserved and unknown types
    /// - [`ReplayError::CapabilityDisabled`] when the record needs extended
    ///   attributes or ACLs and the configuration disables them
    /// - [`ReplayError::IncompatibleLayout`] when an extended-attribute block
    ///   declares the wrong map size
    /// - [`ReplayError::Codec`] and [`ReplayError::Malformed`] for truncated,
    ///   inconsistent or over-long records
    pub fn decode(record: &'a [u8], config: &ReplayConfig) -> ReplayResult<Self> {
        let mut reader = RecordReader::new(record);
        let header = LogHeader::read(&mut reader)?;
        let txtype = header.txtype;
        if !txtype.is_replayable() {
            return Err(ReplayError::Unsupported {
                code: txtype.code(),
            });
        }
        if txtype.has_xvattr() && !config.xattr_support {
            return Err(capability_disabled("xattr", txtype));
        }
        if txtype.has_acl() && !config.acl_support {
            return Err(capability_disabled("acl", txtype));
        }

        let body = match txtype {
            TxType::Create | TxType::Mkdir | TxType::MkXattr => {
                decode_plain_create(&mut reader, txtype)?
            }
            TxType::Symlink => decode_symlink(&mut reader)?,
            TxType::CreateAttr | TxType::MkdirAttr => {
                decode_attr_create(&mut reader, txtype, config)?
            }
            TxType::CreateAcl
            | TxType::MkdirAcl
            | TxType::CreateAclAttr
            | TxType::MkdirAclAttr => decode_acl_create(&mut reader, txtype, config)?,
            TxType::Remove => {
                let fields = RemoveFields::read(&mut reader)?;
                RecordBody::Remove {
                    parent: ObjectId::new(fields.doid),
                    name: reader.read_cstr()?,
                }
            }
            TxType::Rmdir => {
                let fields = RemoveFields::read(&mut reader)?;
                RecordBody::Rmdir {
                    parent: ObjectId::new(fields.doid),
                    name: reader.read_cstr()?,
                }
            }
            TxType::Link => {
                let fields = LinkFields::read(&mut reader)?;
                RecordBody::Link {
                    parent: ObjectId::new(fields.doid),
                    target: ObjectId::new(fields.link_obj),
                    name: reader.read_cstr()?,
                }
            }
            TxType::Rename => {
                let fields = RenameFields::read(&mut reader)?;
                let src_name = reader.read_cstr()?;
                let dst_name = reader.read_cstr()?;
                RecordBody::Rename {
                    src_parent: ObjectId::new(fields.sdoid),
                    src_name,
                    dst_parent: ObjectId::new(fields.tdoid),
                    dst_name,
                }
            }
            TxType::Write => {
                let fields = WriteFields::read(&mut reader)?;
                RecordBody::Write {
                    object: ObjectId::new(fields.foid),
                    offset: fields.offset,
                    data: reader.read_bytes_u64(fields.length)?,
                }
            }
            TxType::Truncate => {
                let fields = TruncateFields::read(&mut reader)?;
                RecordBody::Truncate {
                    object: ObjectId::new(fields.foid),
                    offset: fields.offset,
                    length: fields.length,
                }
            }
            TxType::SetAttr => decode_setattr(&mut reader, config)?,
            TxType::AclV0 => {
                let fields = AclV0Fields::read(&mut reader)?;
                RecordBody::SetAcl {
                    object: ObjectId::new(fields.foid),
                    acl: decode_legacy_aces(&mut reader, fields.aclcnt)?,
                    identities: IdentityContext::new(),
                }
            }
            TxType::Acl => {
                let fields = AclFields::read(&mut reader)?;
                let acl = decode_current_aces(
                    &mut reader,
                    fields.aclcnt,
                    fields.acl_bytes,
                    fields.acl_flags,
                )?;
                let identities = if fields.fuidcnt > 0 {
                    decode_identity_list(
                        &mut reader,
                        fields.fuidcnt,
                        fields.domcnt,
                        IdentityRef::default(),
                        IdentityRef::default(),
                    )?
                } else {
                    IdentityContext::new()
                };
                RecordBody::SetAcl {
                    object: ObjectId::new(fields.foid),
                    acl,
                    identities,
                }
            }
            TxType::Reserved | TxType::Unknown(_) => {
                return Err(ReplayError::Unsupported {
                    code: txtype.code(),
                })
            }
        };

        check_trailing(&reader, config)?;
        Ok(Self { header, body })
    }

    /// Returns the transaction type.
    pub fn txtype(&self) -> TxType {
        self.header.txtype
    }

    /// Returns the name-lookup flags every name-based primitive must get.
    pub fn name_flags(&self) -> NameFlags {
        NameFlags::case_insensitive(self.header.case_insensitive)
    }
}

fn capability_disabled(capability: &'static str, txtype: TxType) -> ReplayError {
    ReplayError::CapabilityDisabled {
        capability,
        code: txtype.code(),
    }
}

fn check_trailing(reader: &RecordReader<'_>, config: &ReplayConfig) -> ReplayResult<()> {
    let left = reader.remaining();
    if left >= WORD_SIZE && config.strict_trailing {
        return Err(ReplayError::malformed(format!(
            "{left} bytes left after the last field at offset {}",
            reader.position()
        )));
    }
    if left > 0 {
        trace!(padding = left, "ignoring record padding");
    }
    Ok(())
}

fn create_attrs(fields: &CreateFields) -> Vattr {
    let mut attrs = Vattr::new(
        AttrMask::TYPE | AttrMask::MODE | AttrMask::UID | AttrMask::GID,
        fields.mode,
        fields.uid,
        fields.gid,
        fields.rdev,
        ObjectId::new(fields.foid),
    );
    attrs.ctime = Timestamp::from_words(fields.crtime);
    attrs.nblocks = fields.gen;
    attrs
}

fn create_kind(txtype: TxType) -> CreateKind<'static> {
    match txtype {
        TxType::Mkdir | TxType::MkdirAttr | TxType::MkdirAcl | TxType::MkdirAclAttr => {
            CreateKind::Directory
        }
        TxType::MkXattr => CreateKind::XattrDir,
        _ => CreateKind::File,
    }
}

fn decode_plain_create<'a>(
    reader: &mut RecordReader<'a>,
    txtype: TxType,
) -> ReplayResult<RecordBody<'a>> {
    let fields = CreateFields::read(reader)?;
    let attrs = create_attrs(&fields);
    let identities = decode_compact_domains(reader, attrs.owner, attrs.group)?;
    let name = reader.read_cstr()?;
    let kind = create_kind(txtype);
    let name = if kind == CreateKind::XattrDir { &[][..] } else { name };
    Ok(RecordBody::Create(CreateRecord {
        kind,
        parent: ObjectId::new(fields.doid),
        object: ObjectId::new(fields.foid),
        name,
        attrs,
        xoptattrs: None,
        acl: None,
        identities,
    }))
}

fn decode_symlink<'a>(reader: &mut RecordReader<'a>) -> ReplayResult<RecordBody<'a>> {
    let fields = CreateFields::read(reader)?;
    let name = reader.read_cstr()?;
    let target = reader.read_cstr()?;
    Ok(RecordBody::Create(CreateRecord {
        kind: CreateKind::Symlink { target },
        parent: ObjectId::new(fields.doid),
        object: ObjectId::new(fields.foid),
        name,
        attrs: create_attrs(&fields),
        xoptattrs: None,
        acl: None,
        identities: IdentityContext::new(),
    }))
}

fn decode_attr_create<'a>(
    reader: &mut RecordReader<'a>,
    txtype: TxType,
    config: &ReplayConfig,
) -> ReplayResult<RecordBody<'a>> {
    let fields = CreateFields::read(reader)?;
    let mut attrs = create_attrs(&fields);
    let mut xoptattrs = XoptAttrs::default();
    decode_xvattr(reader, config, &mut xoptattrs)?;
    attrs.mask = attrs.mask | AttrMask::XVATTR;
    let identities = decode_compact_domains(reader, attrs.owner, attrs.group)?;
    let name = reader.read_cstr()?;
    Ok(RecordBody::Create(CreateRecord {
        kind: create_kind(txtype),
        parent: ObjectId::new(fields.doid),
        object: ObjectId::new(fields.foid),
        name,
        attrs,
        xoptattrs: Some(xoptattrs),
        acl: None,
        identities,
    }))
}

fn decode_acl_create<'a>(
    reader: &mut RecordReader<'a>,
    txtype: TxType,
    config: &ReplayConfig,
) -> ReplayResult<RecordBody<'a>> {
    let fields = AclCreateFields::read(reader)?;
    let mut attrs = create_attrs(&fields.create);
    let xoptattrs = if txtype.has_xvattr() {
        let mut xoptattrs = XoptAttrs::default();
        decode_xvattr(reader, config, &mut xoptattrs)?;
        attrs.mask = attrs.mask | AttrMask::XVATTR;
        Some(xoptattrs)
    } else {
        None
    };
    let acl = decode_current_aces(reader, fields.aclcnt, fields.acl_bytes, fields.acl_flags)?;
    let identities =
        decode_identity_list(reader, fields.fuidcnt, fields.domcnt, attrs.owner, attrs.group)?;
    let name = reader.read_cstr()?;
    Ok(RecordBody::Create(CreateRecord {
        kind: create_kind(txtype),
        parent: ObjectId::new(fields.create.doid),
        object: ObjectId::new(fields.create.foid),
        name,
        attrs,
        xoptattrs,
        acl: Some(acl),
        identities,
    }))
}

fn decode_setattr<'a>(
    reader: &mut RecordReader<'a>,
    config: &ReplayConfig,
) -> ReplayResult<RecordBody<'a>> {
    let fields = SetAttrFields::read(reader)?;
    let mask = AttrMask::from_bits(fields.mask);
    let mut attrs = Vattr::new(
        mask,
        fields.mode,
        fields.uid,
        fields.gid,
        0,
        ObjectId::new(fields.foid),
    );
    attrs.size = fields.size;
    attrs.atime = Timestamp::from_words(fields.atime);
    attrs.mtime = Timestamp::from_words(fields.mtime);

    let xoptattrs = if mask.contains(AttrMask::XVATTR) {
        if !config.xattr_support {
            return Err(capability_disabled("xattr", TxType::SetAttr));
        }
        let mut xoptattrs = XoptAttrs::default();
        decode_xvattr(reader, config, &mut xoptattrs)?;
        Some(xoptattrs)
    } else {
        None
    };
    let identities = decode_compact_domains(reader, attrs.owner, attrs.group)?;
    Ok(RecordBody::SetAttr {
        object: ObjectId::new(fields.foid),
        attrs,
        xoptattrs,
        identities,
    })
}
