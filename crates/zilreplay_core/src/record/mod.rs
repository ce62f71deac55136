//! Intent-log record types.
//!
//! A record is a four-word common header followed by a fixed payload whose
//! layout depends on the transaction type, followed by a trailing region of
//! variable-length sub-structures. See [`layout`] for the fixed payloads and
//! [`LogRecord::decode`] for the trailing regions.

pub mod layout;
mod log;

pub use log::{CreateKind, CreateRecord, LogRecord, RecordBody};

use zilreplay_codec::{CodecResult, RecordReader, RecordWriter};

/// Case-insensitive name lookup hint, carried in the transaction-type word.
pub const TX_CI: u64 = 1 << 63;

/// Number of defined transaction-type codes, reserved code 0 included.
pub const TX_MAX_TYPE: usize = 20;

/// The mutation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    /// Code 0, never written.
    Reserved,
    /// Create a file.
    Create,
    /// Create a directory.
    Mkdir,
    /// Create an extended-attribute directory.
    MkXattr,
    /// Create a symbolic link.
    Symlink,
    /// Remove a file.
    Remove,
    /// Remove a directory.
    Rmdir,
    /// Add a hard link.
    Link,
    /// Rename an entry.
    Rename,
    /// Write file data.
    Write,
    /// Free a byte range.
    Truncate,
    /// Set attributes.
    SetAttr,
    /// Set a legacy-format ACL.
    AclV0,
    /// Set an ACL.
    Acl,
    /// Create a file with an ACL.
    CreateAcl,
    /// Create a file with extended attributes.
    CreateAttr,
    /// Create a file with an ACL and extended attributes.
    CreateAclAttr,
    /// Create a directory with an ACL.
    MkdirAcl,
    /// Create a directory with extended attributes.
    MkdirAttr,
    /// Create a directory with an ACL and extended attributes.
    MkdirAclAttr,
    /// A code this crate does not know.
    Unknown(u64),
}

impl TxType {
    /// Every defined code in code order, reserved code 0 first.
    pub const ALL: [Self; TX_MAX_TYPE] = [
        Self::Reserved,
        Self::Create,
        Self::Mkdir,
        Self::MkXattr,
        Self::Symlink,
        Self::Remove,
        Self::Rmdir,
        Self::Link,
        Self::Rename,
        Self::Write,
        Self::Truncate,
        Self::SetAttr,
        Self::AclV0,
        Self::Acl,
        Self::CreateAcl,
        Self::CreateAttr,
        Self::CreateAclAttr,
        Self::MkdirAcl,
        Self::MkdirAttr,
        Self::MkdirAclAttr,
    ];

    /// Classifies a code. The case-insensitive bit must already be removed.
    #[must_use]
    pub const fn from_code(code: u64) -> Self {
        match code {
            0 => Self::Reserved,
            1 => Self::Create,
            2 => Self::Mkdir,
            3 => Self::MkXattr,
            4 => Self::Symlink,
            5 => Self::Remove,
            6 => Self::Rmdir,
            7 => Self::Link,
            8 => Self::Rename,
            9 => Self::Write,
            10 => Self::Truncate,
            11 => Self::SetAttr,
            12 => Self::AclV0,
            13 => Self::Acl,
            14 => Self::CreateAcl,
            15 => Self::CreateAttr,
            16 => Self::CreateAclAttr,
            17 => Self::MkdirAcl,
            18 => Self::MkdirAttr,
            19 => Self::MkdirAclAttr,
            other => Self::Unknown(other),
        }
    }

    /// Splits a raw transaction-type word into its type and the
    /// case-insensitive hint.
    #[must_use]
    pub const fn split(raw: u64) -> (Self, bool) {
        (Self::from_code(raw & !TX_CI), raw & TX_CI != 0)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::Reserved => 0,
            Self::Create => 1,
            Self::Mkdir => 2,
            Self::MkXattr => 3,
            Self::Symlink => 4,
            Self::Remove => 5,
            Self::Rmdir => 6,
            Self::Link => 7,
            Self::Rename => 8,
            Self::Write => 9,
            Self::Truncate => 10,
            Self::SetAttr => 11,
            Self::AclV0 => 12,
            Self::Acl => 13,
            Self::CreateAcl => 14,
            Self::CreateAttr => 15,
            Self::CreateAclAttr => 16,
            Self::MkdirAcl => 17,
            Self::MkdirAttr => 18,
            Self::MkdirAclAttr => 19,
            Self::Unknown(code) => code,
        }
    }

    /// Returns true if records of this type can be decoded.
    #[must_use]
    pub const fn is_replayable(self) -> bool {
        !matches!(self, Self::Reserved | Self::Unknown(_))
    }

    /// Returns true if the record carries an extended-attribute block.
    #[must_use]
    pub const fn has_xvattr(self) -> bool {
        matches!(
            self,
            Self::CreateAttr | Self::MkdirAttr | Self::CreateAclAttr | Self::MkdirAclAttr
        )
    }

    /// Returns true if the record carries an access-control list.
    #[must_use]
    pub const fn has_acl(self) -> bool {
        matches!(
            self,
            Self::AclV0
                | Self::Acl
                | Self::CreateAcl
                | Self::CreateAclAttr
                | Self::MkdirAcl
                | Self::MkdirAclAttr
        )
    }

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Create => "create",
            Self::Mkdir => "mkdir",
            Self::MkXattr => "mkxattr",
            Self::Symlink => "symlink",
            Self::Remove => "remove",
            Self::Rmdir => "rmdir",
            Self::Link => "link",
            Self::Rename => "rename",
            Self::Write => "write",
            Self::Truncate => "truncate",
            Self::SetAttr => "setattr",
            Self::AclV0 => "acl_v0",
            Self::Acl => "acl",
            Self::CreateAcl => "create_acl",
            Self::CreateAttr => "create_attr",
            Self::CreateAclAttr => "create_acl_attr",
            Self::MkdirAcl => "mkdir_acl",
            Self::MkdirAttr => "mkdir_attr",
            Self::MkdirAclAttr => "mkdir_acl_attr",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({code})"),
            other => f.write_str(other.name()),
        }
    }
}

/// The common header every record starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    /// Transaction type.
    pub txtype: TxType,
    /// Case-insensitive name lookup hint.
    pub case_insensitive: bool,
    /// Record length as logged. Informational only.
    pub reclen: u64,
    /// Transaction group the record was committed in.
    pub txg: u64,
    /// Sequence number within the log.
    pub seq: u64,
}

impl LogHeader {
    /// Number of words in the header.
    pub const WORDS: usize = 4;

    /// Size of the header in bytes.
    pub const LEN: usize = Self::WORDS * 8;

    /// Returns the raw transaction-type word.
    #[must_use]
    pub const fn raw_txtype(&self) -> u64 {
        let ci = if self.case_insensitive { TX_CI } else { 0 };
        self.txtype.code() | ci
    }

    /// Reads a header.
    pub fn read(reader: &mut RecordReader<'_>) -> CodecResult<Self> {
        let [raw, reclen, txg, seq] = reader.read_words::<4>()?;
        let (txtype, case_insensitive) = TxType::split(raw);
        Ok(Self {
            txtype,
            case_insensitive,
            reclen,
            txg,
            seq,
        })
    }

    /// Writes a header.
    pub fn write(&self, writer: &mut RecordWriter) {
        writer.put_words(&[self.raw_txtype(), self.reclen, self.txg, self.seq]);
    }
}
