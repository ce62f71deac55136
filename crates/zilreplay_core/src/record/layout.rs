//! Fixed payloads.
//!
//! Each payload directly follows the [`LogHeader`](super::LogHeader) and is a
//! whole number of 64-bit words. Field order and widths are the on-disk
//! contract with the log writer.

use zilreplay_codec::{ByteSwapper, CodecResult, RecordReader, RecordWriter};

/// A fixed payload made of 64-bit words.
pub trait FixedLayout: Sized {
    /// Number of words in the payload.
    const WORDS: usize;

    /// Size of the payload in bytes.
    const LEN: usize = Self::WORDS * 8;

    /// Builds the payload from its words, in log order. Missing words read
    /// as zero.
    fn from_words(words: &[u64]) -> Self;

    /// Returns the payload's words, in log order.
    fn to_words(&self) -> Vec<u64>;

    /// Reads the payload.
    fn read(reader: &mut RecordReader<'_>) -> CodecResult<Self> {
        reader.checked_count(Self::WORDS as u64, 8)?;
        let mut words = Vec::with_capacity(Self::WORDS);
        for _ in 0..Self::WORDS {
            words.push(reader.read_u64()?);
        }
        Ok(Self::from_words(&words))
    }

    /// Converts the payload's byte order in place and returns its host-order
    /// value.
    fn swap(swapper: &mut ByteSwapper<'_>) -> CodecResult<Self> {
        let mut words = Vec::with_capacity(Self::WORDS);
        for _ in 0..Self::WORDS {
            words.push(swapper.swap_u64()?);
        }
        Ok(Self::from_words(&words))
    }

    /// Writes the payload.
    fn write(&self, writer: &mut RecordWriter) {
        writer.put_words(&self.to_words());
    }
}

struct Words<'a>(std::slice::Iter<'a, u64>);

impl<'a> Words<'a> {
    fn new(words: &'a [u64]) -> Self {
        Self(words.iter())
    }

    fn word(&mut self) -> u64 {
        self.0.next().copied().unwrap_or(0)
    }

    fn array<const N: usize>(&mut self) -> [u64; N] {
        let mut out = [0u64; N];
        for word in &mut out {
            *word = self.word();
        }
        out
    }
}

/// Payload of create, mkdir, mkxattr and symlink records, and of their
/// extended-attribute variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateFields {
    /// Parent directory.
    pub doid: u64,
    /// Id of the new object.
    pub foid: u64,
    /// Type and permission bits.
    pub mode: u64,
    /// Owner.
    pub uid: u64,
    /// Group.
    pub gid: u64,
    /// Generation number.
    pub gen: u64,
    /// Creation time.
    pub crtime: [u64; 2],
    /// Device number.
    pub rdev: u64,
}

impl FixedLayout for CreateFields {
    const WORDS: usize = 9;

    fn from_words(words: &[u64]) -> Self {
        let mut w = Words::new(words);
        Self {
            doid: w.word(),
            foid: w.word(),
            mode: w.word(),
            uid: w.word(),
            gid: w.word(),
            gen: w.word(),
            crtime: w.array(),
            rdev: w.word(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        vec![
            self.doid,
            self.foid,
            self.mode,
            self.uid,
            self.gid,
            self.gen,
            self.crtime[0],
            self.crtime[1],
            self.rdev,
        ]
    }
}

/// Payload of the create-with-ACL family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AclCreateFields {
    /// The plain create payload.
    pub create: CreateFields,
    /// Number of ACEs.
    pub aclcnt: u64,
    /// Number of domain strings.
    pub domcnt: u64,
    /// Number of logged identities.
    pub fuidcnt: u64,
    /// Size of the ACE array in bytes, without padding.
    pub acl_bytes: u64,
    /// ACL flags.
    pub acl_flags: u64,
}

impl FixedLayout for AclCreateFields {
    const WORDS: usize = CreateFields::WORDS + 5;

    fn from_words(words: &[u64]) -> Self {
        let split = words.len().min(CreateFields::WORDS);
        let mut w = Words::new(&words[split..]);
        Self {
            create: CreateFields::from_words(&words[..split]),
            aclcnt: w.word(),
            domcnt: w.word(),
            fuidcnt: w.word(),
            acl_bytes: w.word(),
            acl_flags: w.word(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        let mut words = self.create.to_words();
        words.extend_from_slice(&[
            self.aclcnt,
            self.domcnt,
            self.fuidcnt,
            self.acl_bytes,
            self.acl_flags,
        ]);
        words
    }
}

/// Payload of remove and rmdir records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveFields {
    /// Parent directory.
    pub doid: u64,
}

impl FixedLayout for RemoveFields {
    const WORDS: usize = 1;

    fn from_words(words: &[u64]) -> Self {
        Self {
            doid: Words::new(words).word(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        vec![self.doid]
    }
}

/// Payload of link records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkFields {
    /// Directory to add the entry to.
    pub doid: u64,
    /// Object the entry names.
    pub link_obj: u64,
}

impl FixedLayout for LinkFields {
    const WORDS: usize = 2;

    fn from_words(words: &[u64]) -> Self {
        let mut w = Words::new(words);
        Self {
            doid: w.word(),
            link_obj: w.word(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        vec![self.doid, self.link_obj]
    }
}

/// Payload of rename records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameFields {
    /// Source directory.
    pub sdoid: u64,
    /// Target directory.
    pub tdoid: u64,
}

impl FixedLayout for RenameFields {
    const WORDS: usize = 2;

    fn from_words(words: &[u64]) -> Self {
        let mut w = Words::new(words);
        Self {
            sdoid: w.word(),
            tdoid: w.word(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        vec![self.sdoid, self.tdoid]
    }
}

/// Words in an opaque block pointer.
pub const BLKPTR_WORDS: usize = 16;

/// Payload of write records. The data follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteFields {
    /// File.
    pub foid: u64,
    /// Offset of the write.
    pub offset: u64,
    /// Number of data bytes following the payload.
    pub length: u64,
    /// Offset of the write within its block.
    pub blkoff: u64,
    /// Block pointer of an indirect write. Not used by replay.
    pub blkptr: [u64; BLKPTR_WORDS],
}

impl FixedLayout for WriteFields {
    const WORDS: usize = 4 + BLKPTR_WORDS;

    fn from_words(words: &[u64]) -> Self {
        let mut w = Words::new(words);
        Self {
            foid: w.word(),
            offset: w.word(),
            length: w.word(),
            blkoff: w.word(),
            blkptr: w.array(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        let mut words = vec![self.foid, self.offset, self.length, self.blkoff];
        words.extend_from_slice(&self.blkptr);
        words
    }
}

/// Payload of truncate records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruncateFields {
    /// File.
    pub foid: u64,
    /// Start of the freed range.
    pub offset: u64,
    /// Length of the freed range.
    pub length: u64,
}

impl FixedLayout for TruncateFields {
    const WORDS: usize = 3;

    fn from_words(words: &[u64]) -> Self {
        let mut w = Words::new(words);
        Self {
            foid: w.word(),
            offset: w.word(),
            length: w.word(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        vec![self.foid, self.offset, self.length]
    }
}

/// Payload of setattr records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetAttrFields {
    /// Object.
    pub foid: u64,
    /// Attribute mask.
    pub mask: u64,
    /// Type and permission bits.
    pub mode: u64,
    /// Owner.
    pub uid: u64,
    /// Group.
    pub gid: u64,
    /// File size.
    pub size: u64,
    /// Access time.
    pub atime: [u64; 2],
    /// Modification time.
    pub mtime: [u64; 2],
}

impl FixedLayout for SetAttrFields {
    const WORDS: usize = 10;

    fn from_words(words: &[u64]) -> Self {
        let mut w = Words::new(words);
        Self {
            foid: w.word(),
            mask: w.word(),
            mode: w.word(),
            uid: w.word(),
            gid: w.word(),
            size: w.word(),
            atime: w.array(),
            mtime: w.array(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        vec![
            self.foid,
            self.mask,
            self.mode,
            self.uid,
            self.gid,
            self.size,
            self.atime[0],
            self.atime[1],
            self.mtime[0],
            self.mtime[1],
        ]
    }
}

/// Payload of legacy ACL records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AclV0Fields {
    /// Object.
    pub foid: u64,
    /// Number of ACEs.
    pub aclcnt: u64,
}

impl FixedLayout for AclV0Fields {
    const WORDS: usize = 2;

    fn from_words(words: &[u64]) -> Self {
        let mut w = Words::new(words);
        Self {
            foid: w.word(),
            aclcnt: w.word(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        vec![self.foid, self.aclcnt]
    }
}

/// Payload of ACL records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AclFields {
    /// Object.
    pub foid: u64,
    /// Number of ACEs.
    pub aclcnt: u64,
    /// Number of domain strings.
    pub domcnt: u64,
    /// Number of logged identities.
    pub fuidcnt: u64,
    /// Size of the ACE array in bytes, without padding.
    pub acl_bytes: u64,
    /// ACL flags.
    pub acl_flags: u64,
}

impl FixedLayout for AclFields {
    const WORDS: usize = 6;

    fn from_words(words: &[u64]) -> Self {
        let mut w = Words::new(words);
        Self {
            foid: w.word(),
            aclcnt: w.word(),
            domcnt: w.word(),
            fuidcnt: w.word(),
            acl_bytes: w.word(),
            acl_flags: w.word(),
        }
    }

    fn to_words(&self) -> Vec<u64> {
        vec![
            self.foid,
            self.aclcnt,
            self.domcnt,
            self.fuidcnt,
            self.acl_bytes,
            self.acl_flags,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zilreplay_codec::SwapDirection;

    fn check<L: FixedLayout + PartialEq + std::fmt::Debug>(value: L) {
        let words = value.to_words();
        assert_eq!(words.len(), L::WORDS);
        let mut writer = RecordWriter::new();
        value.write(&mut writer);
        assert_eq!(writer.len(), L::LEN);
        let bytes = writer.into_vec();
        let mut reader = RecordReader::new(&bytes);
        assert_eq!(L::read(&mut reader).unwrap(), value);
        assert!(reader.is_empty());
    }

    #[test]
    fn sizes_match_wire_format() {
        assert_eq!(CreateFields::LEN, 72);
        assert_eq!(AclCreateFields::LEN, 112);
        assert_eq!(RemoveFields::LEN, 8);
        assert_eq!(LinkFields::LEN, 16);
        assert_eq!(RenameFields::LEN, 16);
        assert_eq!(WriteFields::LEN, 160);
        assert_eq!(TruncateFields::LEN, 24);
        assert_eq!(SetAttrFields::LEN, 80);
        assert_eq!(AclV0Fields::LEN, 16);
        assert_eq!(AclFields::LEN, 48);
    }

    #[test]
    fn every_layout_keeps_field_order() {
        check(CreateFields {
            doid: 1,
            foid: 2,
            mode: 3,
            uid: 4,
            gid: 5,
            gen: 6,
            crtime: [7, 8],
            rdev: 9,
        });
        check(AclCreateFields {
            create: CreateFields {
                doid: 1,
                ..CreateFields::default()
            },
            aclcnt: 2,
            domcnt: 3,
            fuidcnt: 4,
            acl_bytes: 5,
            acl_flags: 6,
        });
        check(RemoveFields { doid: 11 });
        check(LinkFields {
            doid: 1,
            link_obj: 2,
        });
        check(RenameFields { sdoid: 1, tdoid: 2 });
        let mut blkptr = [0u64; BLKPTR_WORDS];
        blkptr[15] = 99;
        check(WriteFields {
            foid: 1,
            offset: 2,
            length: 3,
            blkoff: 4,
            blkptr,
        });
        check(TruncateFields {
            foid: 1,
            offset: 2,
            length: 3,
        });
        check(SetAttrFields {
            foid: 1,
            mask: 2,
            mode: 3,
            uid: 4,
            gid: 5,
            size: 6,
            atime: [7, 8],
            mtime: [9, 10],
        });
        check(AclV0Fields { foid: 1, aclcnt: 2 });
        check(AclFields {
            foid: 1,
            aclcnt: 2,
            domcnt: 3,
            fuidcnt: 4,
            acl_bytes: 5,
            acl_flags: 6,
        });
    }

    #[test]
    fn create_field_positions() {
        let words: Vec<u64> = (1..=9).collect();
        let fields = CreateFields::from_words(&words);
        assert_eq!(fields.gen, 6);
        assert_eq!(fields.crtime, [7, 8]);
        assert_eq!(fields.rdev, 9);
    }

    #[test]
    fn short_input_is_truncated_error() {
        let bytes = [0u8; 15];
        let mut reader = RecordReader::new(&bytes);
        assert!(LinkFields::read(&mut reader).is_err());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn swap_returns_host_values_in_both_directions() {
        let fields = RenameFields { sdoid: 5, tdoid: 6 };
        let mut writer = RecordWriter::new();
        fields.write(&mut writer);
        let mut bytes = writer.into_vec();
        let original = bytes.clone();

        let out = RenameFields::swap(&mut ByteSwapper::new(&mut bytes, SwapDirection::ToForeign))
            .unwrap();
        assert_eq!(out, fields);
        assert_eq!(u64::from_be_bytes(bytes[..8].try_into().unwrap()), 5);

        let back =
            RenameFields::swap(&mut ByteSwapper::new(&mut bytes, SwapDirection::ToHost)).unwrap();
        assert_eq!(back, fields);
        assert_eq!(bytes, original);
    }
}
