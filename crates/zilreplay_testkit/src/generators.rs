//! Property-based test generators using proptest.
//!
//! Record strategies produce well-formed host-order records: counts agree
//! with the regions they size and the compact domain table holds exactly the
//! domains the owner and group reference.

use proptest::prelude::*;
use zilreplay_core::decode::{compact_domain_count, XvattrBlock};
use zilreplay_core::layout::{CreateFields, SetAttrFields};
use zilreplay_core::{TxType, DEFAULT_XVA_MAP_SIZE};
use zilreplay_store::{
    Ace, AttrMask, IdentityRef, ObjectAceGuids, XattrSet, ACE_ACCESS_ALLOWED_OBJECT_ACE_TYPE,
    ACE_EVERYONE, ACE_GROUP, ACE_IDENTIFIER_GROUP, ACE_OWNER, AV_SCANSTAMP_LEN, MAXUID,
};

use crate::builders::{self, RecordBuilder};

/// Strategy for entry names.
pub fn name_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::string::string_regex("[a-zA-Z0-9._-]{1,48}")
        .expect("Invalid regex")
        .prop_map(String::into_bytes)
}

/// Strategy for object ids above the root.
pub fn object_id_strategy() -> impl Strategy<Value = u64> {
    2u64..1 << 40
}

/// Strategy for raw owner and group values, resolved or ephemeral.
pub fn identity_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        3 => 0..=MAXUID,
        1 => (1u64..4, any::<u32>()).prop_map(|(domain, rid)| (domain << 32) | u64::from(rid)),
    ]
}

/// Returns one domain string per domain `uid` and `gid` reference.
pub fn domains_for(uid: u64, gid: u64) -> Vec<String> {
    let count = compact_domain_count(IdentityRef::from_raw(uid), IdentityRef::from_raw(gid));
    (0..count).map(|i| format!("S-1-5-21-{}", 1000 + i)).collect()
}

/// Strategy for entries valid in the current encoding.
pub fn ace_strategy() -> impl Strategy<Value = Ace> {
    let flags = prop_oneof![
        Just(ACE_OWNER),
        Just(ACE_EVERYONE),
        Just(ACE_GROUP | ACE_IDENTIFIER_GROUP),
        Just(ACE_IDENTIFIER_GROUP),
        Just(0u16),
    ];
    let ace_type = prop_oneof![0u16..=3, Just(ACE_ACCESS_ALLOWED_OBJECT_ACE_TYPE), 6u16..=8];
    (
        any::<u32>(),
        any::<u32>(),
        flags,
        ace_type,
        any::<[u8; 16]>(),
        any::<[u8; 16]>(),
    )
        .prop_map(|(who, access_mask, flags, ace_type, a, b)| {
            let object = (Ace::current_len(flags, ace_type) == Ace::OBJECT_LEN).then_some(
                ObjectAceGuids {
                    object_type: a,
                    inherit_object_type: b,
                },
            );
            Ace {
                who,
                access_mask,
                flags,
                ace_type,
                object,
            }
        })
}

/// Strategy for entries valid in the legacy encoding.
pub fn legacy_ace_strategy() -> impl Strategy<Value = Ace> {
    (any::<u32>(), any::<u32>(), any::<u16>(), 0u16..=3).prop_map(
        |(who, access_mask, flags, ace_type)| Ace {
            who,
            access_mask,
            flags,
            ace_type,
            object: None,
        },
    )
}

/// Strategy for extended-attribute blocks with the default map size.
pub fn xvattr_block_strategy() -> impl Strategy<Value = XvattrBlock> {
    (
        any::<u32>(),
        any::<u32>(),
        any::<[u64; 2]>(),
        any::<[u8; AV_SCANSTAMP_LEN]>(),
    )
        .prop_map(|(requested, values, crtime, scanstamp)| {
            let mut bitmap = vec![0; DEFAULT_XVA_MAP_SIZE as usize];
            bitmap[0] = requested & XattrSet::ALL.bits();
            XvattrBlock {
                bitmap,
                attrs: u64::from(values & XattrSet::ALL.bits()),
                crtime,
                scanstamp,
            }
        })
}

fn create_fields_strategy() -> impl Strategy<Value = CreateFields> {
    (
        object_id_strategy(),
        object_id_strategy(),
        prop_oneof![Just(0o100_644u64), Just(0o040_755), Just(0o010_600)],
        identity_strategy(),
        identity_strategy(),
        any::<u64>(),
        any::<[u64; 2]>(),
    )
        .prop_map(|(doid, foid, mode, uid, gid, gen, crtime)| CreateFields {
            doid,
            foid,
            mode,
            uid,
            gid,
            gen,
            crtime,
            rdev: 0,
        })
}

fn strs(domains: &[String]) -> Vec<&str> {
    domains.iter().map(String::as_str).collect()
}

fn plain_create_strategy() -> impl Strategy<Value = RecordBuilder> {
    (
        prop_oneof![Just(TxType::Create), Just(TxType::Mkdir), Just(TxType::MkXattr)],
        create_fields_strategy(),
        name_strategy(),
    )
        .prop_map(|(txtype, fields, name)| {
            let domains = domains_for(fields.uid, fields.gid);
            builders::create(txtype, fields, &strs(&domains), &name)
        })
}

fn attr_create_strategy() -> impl Strategy<Value = RecordBuilder> {
    (
        prop_oneof![Just(TxType::CreateAttr), Just(TxType::MkdirAttr)],
        create_fields_strategy(),
        xvattr_block_strategy(),
        name_strategy(),
    )
        .prop_map(|(txtype, fields, block, name)| {
            let domains = domains_for(fields.uid, fields.gid);
            builders::create_attr(txtype, fields, &block, &strs(&domains), &name)
        })
}

fn acl_create_strategy() -> impl Strategy<Value = RecordBuilder> {
    (
        prop_oneof![
            Just(TxType::CreateAcl),
            Just(TxType::MkdirAcl),
            Just(TxType::CreateAclAttr),
            Just(TxType::MkdirAclAttr),
        ],
        create_fields_strategy(),
        xvattr_block_strategy(),
        prop::collection::vec(ace_strategy(), 0..6),
        prop::collection::vec(identity_strategy(), 0..4),
        name_strategy(),
    )
        .prop_map(|(txtype, fields, block, aces, fuids, name)| {
            let domains: Vec<String> = (0..fuids.len()).map(|i| format!("dom-{i}")).collect();
            let block = txtype.has_xvattr().then_some(&block);
            builders::create_acl(txtype, fields, block, &aces, &fuids, &strs(&domains), &name)
        })
}

fn setattr_strategy() -> impl Strategy<Value = RecordBuilder> {
    (
        object_id_strategy(),
        any::<u64>(),
        identity_strategy(),
        identity_strategy(),
        any::<u64>(),
        prop::option::of(xvattr_block_strategy()),
    )
        .prop_map(|(foid, mask, uid, gid, size, block)| {
            let fields = SetAttrFields {
                foid,
                mask: mask & !AttrMask::XVATTR.bits() & 0xffff,
                mode: 0o644,
                uid,
                gid,
                size,
                atime: [1, 2],
                mtime: [3, 4],
            };
            let domains = domains_for(uid, gid);
            builders::setattr(fields, block.as_ref(), &strs(&domains))
        })
}

fn name_op_strategy() -> impl Strategy<Value = RecordBuilder> {
    (
        0usize..4,
        object_id_strategy(),
        object_id_strategy(),
        name_strategy(),
        name_strategy(),
    )
        .prop_map(|(which, a, b, n1, n2)| match which {
            0 => builders::remove(a, &n1),
            1 => builders::rmdir(a, &n1),
            2 => builders::link(a, b, &n1),
            _ => builders::rename(a, &n1, b, &n2),
        })
}

fn data_op_strategy() -> impl Strategy<Value = RecordBuilder> {
    (
        any::<bool>(),
        object_id_strategy(),
        0u64..1 << 20,
        prop::collection::vec(any::<u8>(), 0..512),
        any::<u64>(),
    )
        .prop_map(|(is_write, foid, offset, data, length)| {
            if is_write {
                builders::write(foid, offset, &data)
            } else {
                builders::truncate(foid, offset, length)
            }
        })
}

fn acl_strategy() -> impl Strategy<Value = RecordBuilder> {
    (
        any::<bool>(),
        object_id_strategy(),
        prop::collection::vec(ace_strategy(), 0..6),
        prop::collection::vec(legacy_ace_strategy(), 0..6),
        prop::collection::vec(identity_strategy(), 0..3),
    )
        .prop_map(|(legacy, foid, aces, legacy_aces, fuids)| {
            if legacy {
                builders::acl_v0(foid, &legacy_aces)
            } else {
                let domains: Vec<String> = (0..fuids.len()).map(|i| format!("dom-{i}")).collect();
                builders::acl(foid, &aces, &fuids, &strs(&domains))
            }
        })
}

/// Strategy for a well-formed host-order record of any replayable type.
pub fn record_strategy() -> impl Strategy<Value = Vec<u8>> {
    let symlink = (
        object_id_strategy(),
        object_id_strategy(),
        name_strategy(),
        name_strategy(),
    )
        .prop_map(|(doid, foid, name, target)| builders::symlink(doid, foid, &name, &target));
    (
        prop_oneof![
            plain_create_strategy(),
            symlink,
            attr_create_strategy(),
            acl_create_strategy(),
            setattr_strategy(),
            name_op_strategy(),
            data_op_strategy(),
            acl_strategy(),
        ],
        any::<bool>(),
        any::<u64>(),
    )
        .prop_map(|(builder, ci, txg)| builder.case_insensitive(ci).txg(txg).build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zilreplay_core::{LogRecord, ReplayConfig};

    proptest! {
        #[test]
        fn generated_records_decode(record in record_strategy()) {
            prop_assert!(LogRecord::decode(&record, &ReplayConfig::default()).is_ok());
        }

        #[test]
        fn generated_aces_have_consistent_guids(ace in ace_strategy()) {
            let is_object = Ace::current_len(ace.flags, ace.ace_type) == Ace::OBJECT_LEN;
            prop_assert_eq!(ace.object.is_some(), is_object);
        }
    }

    #[test]
    fn domains_follow_identities() {
        assert!(domains_for(5, 6).is_empty());
        assert_eq!(domains_for((1 << 32) | 5, (2 << 32) | 6).len(), 2);
        assert_eq!(domains_for((1 << 32) | 5, (1 << 32) | 6).len(), 1);
    }
}
