//! Base and extended attribute descriptors.

use crate::identity::IdentityRef;
use crate::types::ObjectId;

/// Permission bits kept from a logged mode.
pub const MODE_MASK: u64 = 0o7777;

/// Length of the anti-virus scan stamp blob.
pub const AV_SCANSTAMP_LEN: usize = 32;

/// A logged timestamp: seconds and nanoseconds, each one log word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Seconds since the epoch.
    pub secs: u64,
    /// Nanoseconds within the second.
    pub nanos: u64,
}

impl Timestamp {
    /// Builds a timestamp from its two logged words.
    #[must_use]
    pub const fn from_words(words: [u64; 2]) -> Self {
        Self {
            secs: words[0],
            nanos: words[1],
        }
    }

    /// Returns the two logged words.
    #[must_use]
    pub const fn to_words(self) -> [u64; 2] {
        [self.secs, self.nanos]
    }
}

/// Selects which fields of a [`Vattr`] are meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AttrMask(u64);

impl AttrMask {
    /// File type.
    pub const TYPE: Self = Self(0x0001);
    /// Permission bits.
    pub const MODE: Self = Self(0x0002);
    /// Owner.
    pub const UID: Self = Self(0x0004);
    /// Group.
    pub const GID: Self = Self(0x0008);
    /// Filesystem id.
    pub const FSID: Self = Self(0x0010);
    /// Object id.
    pub const NODEID: Self = Self(0x0020);
    /// Link count.
    pub const NLINK: Self = Self(0x0040);
    /// File size.
    pub const SIZE: Self = Self(0x0080);
    /// Access time.
    pub const ATIME: Self = Self(0x0100);
    /// Modification time.
    pub const MTIME: Self = Self(0x0200);
    /// Change time.
    pub const CTIME: Self = Self(0x0400);
    /// Device number.
    pub const RDEV: Self = Self(0x0800);
    /// Block size.
    pub const BLKSIZE: Self = Self(0x1000);
    /// Block count.
    pub const NBLOCKS: Self = Self(0x2000);
    /// Sequence number.
    pub const SEQ: Self = Self(0x8000);
    /// Extended attributes follow.
    pub const XVATTR: Self = Self(0x1_0000);

    /// Builds a mask from logged bits.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `self` without the bits of `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl std::ops::BitOr for AttrMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Object type encoded in the high bits of a logged mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// No type bits.
    #[default]
    None,
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Block device.
    BlockDevice,
    /// Character device.
    CharDevice,
    /// Symbolic link.
    Symlink,
    /// Named pipe.
    Fifo,
    /// Door.
    Door,
    /// Socket.
    Socket,
    /// Event port.
    Port,
    /// Unrecognised type bits.
    Bad,
}

impl FileKind {
    /// Extracts the object type from a mode word.
    #[must_use]
    pub const fn from_mode(mode: u64) -> Self {
        match mode & 0o170_000 {
            0 => Self::None,
            0o010_000 => Self::Fifo,
            0o020_000 => Self::CharDevice,
            0o040_000 => Self::Directory,
            0o060_000 => Self::BlockDevice,
            0o100_000 => Self::Regular,
            0o120_000 => Self::Symlink,
            0o140_000 => Self::Socket,
            0o150_000 => Self::Door,
            0o160_000 => Self::Port,
            _ => Self::Bad,
        }
    }
}

/// Base attributes handed to create and set-attribute primitives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vattr {
    /// Which fields are set.
    pub mask: AttrMask,
    /// Object type.
    pub kind: FileKind,
    /// Permission bits.
    pub mode: u32,
    /// Owner.
    pub owner: IdentityRef,
    /// Group.
    pub group: IdentityRef,
    /// Device number for device nodes.
    pub rdev: u64,
    /// Object id. Creates reuse the logged id.
    pub nodeid: ObjectId,
    /// File size.
    pub size: u64,
    /// Access time.
    pub atime: Timestamp,
    /// Modification time.
    pub mtime: Timestamp,
    /// Change time. Creates carry the logged creation time here.
    pub ctime: Timestamp,
    /// Block count. Creates carry the logged generation number here.
    pub nblocks: u64,
}

impl Vattr {
    /// Builds the attribute descriptor shared by every record kind.
    ///
    /// Ephemeral owner/group values are kept as [`IdentityRef::Ephemeral`];
    /// the store resolves them through the record's identity context.
    #[must_use]
    pub fn new(mask: AttrMask, mode: u64, uid: u64, gid: u64, rdev: u64, nodeid: ObjectId) -> Self {
        Self {
            mask,
            kind: FileKind::from_mode(mode),
            mode: (mode & MODE_MASK) as u32,
            owner: IdentityRef::from_raw(uid),
            group: IdentityRef::from_raw(gid),
            rdev,
            nodeid,
            ..Self::default()
        }
    }
}

/// A set of extended attributes, as laid out in word 0 of the attribute
/// bitmap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct XattrSet(u32);

impl XattrSet {
    /// Creation time.
    pub const CREATETIME: Self = Self(0x0000_0001);
    /// Archive flag.
    pub const ARCHIVE: Self = Self(0x0000_0002);
    /// System flag.
    pub const SYSTEM: Self = Self(0x0000_0004);
    /// Read-only flag.
    pub const READONLY: Self = Self(0x0000_0008);
    /// Hidden flag.
    pub const HIDDEN: Self = Self(0x0000_0010);
    /// No-unlink flag.
    pub const NOUNLINK: Self = Self(0x0000_0020);
    /// Immutable flag.
    pub const IMMUTABLE: Self = Self(0x0000_0040);
    /// Append-only flag.
    pub const APPENDONLY: Self = Self(0x0000_0080);
    /// No-dump flag.
    pub const NODUMP: Self = Self(0x0000_0100);
    /// Opaque flag.
    pub const OPAQUE: Self = Self(0x0000_0200);
    /// Anti-virus quarantined flag.
    pub const AV_QUARANTINED: Self = Self(0x0000_0400);
    /// Anti-virus modified flag.
    pub const AV_MODIFIED: Self = Self(0x0000_0800);
    /// Anti-virus scan stamp.
    pub const AV_SCANSTAMP: Self = Self(0x0000_1000);
    /// Every defined attribute.
    pub const ALL: Self = Self(0x0000_1fff);
    /// No attributes.
    pub const EMPTY: Self = Self(0);

    /// Builds a set from bitmap word 0.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every attribute of `other` is in the set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the attributes present in both sets.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Returns the attributes present in either set.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for XattrSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Extended attribute values.
///
/// Only the attributes listed in [`requested`](Self::requested) carry decoded
/// values; every other field keeps whatever the caller initialised it to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XoptAttrs {
    /// The bitmap words as logged.
    pub request_map: Vec<u32>,
    /// Attributes that were decoded into this descriptor.
    pub requested: XattrSet,
    /// Hidden flag.
    pub hidden: bool,
    /// System flag.
    pub system: bool,
    /// Archive flag.
    pub archive: bool,
    /// Read-only flag.
    pub readonly: bool,
    /// Immutable flag.
    pub immutable: bool,
    /// No-unlink flag.
    pub nounlink: bool,
    /// Append-only flag.
    pub appendonly: bool,
    /// No-dump flag.
    pub nodump: bool,
    /// Opaque flag.
    pub opaque: bool,
    /// Anti-virus modified flag.
    pub av_modified: bool,
    /// Anti-virus quarantined flag.
    pub av_quarantined: bool,
    /// Creation time.
    pub createtime: Timestamp,
    /// Anti-virus scan stamp.
    pub av_scanstamp: [u8; AV_SCANSTAMP_LEN],
}

impl XoptAttrs {
    /// Returns true if `attr` was decoded into this descriptor.
    pub fn is_requested(&self, attr: XattrSet) -> bool {
        self.requested.contains(attr)
    }
}
