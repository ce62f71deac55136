//! Access-control lists.

/// Entry applies to the file owner.
pub const ACE_OWNER: u16 = 0x1000;
/// Entry applies to a group.
pub const ACE_GROUP: u16 = 0x2000;
/// Entry applies to everyone.
pub const ACE_EVERYONE: u16 = 0x4000;
/// `who` names a group rather than a user.
pub const ACE_IDENTIFIER_GROUP: u16 = 0x0040;
/// Flags that decide whom an entry applies to.
pub const ACE_TYPE_FLAGS: u16 = ACE_OWNER | ACE_GROUP | ACE_EVERYONE | ACE_IDENTIFIER_GROUP;

/// Object-specific allow entry.
pub const ACE_ACCESS_ALLOWED_OBJECT_ACE_TYPE: u16 = 0x05;
/// Object-specific deny entry.
pub const ACE_ACCESS_DENIED_OBJECT_ACE_TYPE: u16 = 0x06;
/// Object-specific audit entry.
pub const ACE_SYSTEM_AUDIT_OBJECT_ACE_TYPE: u16 = 0x07;
/// Object-specific alarm entry.
pub const ACE_SYSTEM_ALARM_OBJECT_ACE_TYPE: u16 = 0x08;

/// Which on-disk ACE encoding a list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclEncoding {
    /// Fixed 12-byte entries, no ACL flags.
    Legacy,
    /// Variable-size entries; object entries carry two GUIDs.
    Current,
}

/// The GUID pair carried by object-specific entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ObjectAceGuids {
    /// Object type GUID.
    pub object_type: [u8; 16],
    /// Inherited object type GUID.
    pub inherit_object_type: [u8; 16],
}

/// One access-control entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ace {
    /// User or group id.
    pub who: u32,
    /// Permission bits.
    pub access_mask: u32,
    /// Inheritance and type flags.
    pub flags: u16,
    /// Allow, deny, audit or alarm, possibly object-specific.
    pub ace_type: u16,
    /// GUIDs for object-specific entries.
    pub object: Option<ObjectAceGuids>,
}

impl Ace {
    /// Size of the fixed entry header.
    pub const HEADER_LEN: usize = 12;
    /// Size of an object-specific entry.
    pub const OBJECT_LEN: usize = Self::HEADER_LEN + 32;

    /// Returns true if `ace_type` is one of the object-specific types.
    #[must_use]
    pub const fn is_object_type(ace_type: u16) -> bool {
        matches!(
            ace_type,
            ACE_ACCESS_ALLOWED_OBJECT_ACE_TYPE
                | ACE_ACCESS_DENIED_OBJECT_ACE_TYPE
                | ACE_SYSTEM_AUDIT_OBJECT_ACE_TYPE
                | ACE_SYSTEM_ALARM_OBJECT_ACE_TYPE
        )
    }

    /// Returns the encoded size of an entry in the current encoding.
    ///
    /// Owner, everyone and owning-group entries are always plain. Any other
    /// entry is an object entry when its type says so.
    #[must_use]
    pub const fn current_len(flags: u16, ace_type: u16) -> usize {
        match flags & ACE_TYPE_FLAGS {
            ACE_OWNER | ACE_EVERYONE => Self::HEADER_LEN,
            f if f == ACE_IDENTIFIER_GROUP | ACE_GROUP => Self::HEADER_LEN,
            _ if Self::is_object_type(ace_type) => Self::OBJECT_LEN,
            _ => Self::HEADER_LEN,
        }
    }
}

/// A decoded access-control list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclSet {
    /// Encoding the list was logged in.
    pub encoding: AclEncoding,
    /// Entries in log order.
    pub entries: Vec<Ace>,
    /// ACL flags word. Always 0 for the legacy encoding.
    pub flags: u64,
    /// Size of the entry array in bytes, without padding.
    pub byte_len: u64,
}

impl AclSet {
    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
