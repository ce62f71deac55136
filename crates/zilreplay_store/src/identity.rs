//! Record-local identity data.
//!
//! Owner and group fields in the log are 64-bit FUIDs: the high 32 bits index
//! a per-record domain table, the low 32 bits are the id relative to that
//! domain. Values up to [`MAXUID`] are ordinary host ids. Anything larger is
//! ephemeral: it only means something together with the domain strings logged
//! in the same record, and the store maps it to a real id when the mutation is
//! applied.

/// Largest id that is valid on the host without domain information.
pub const MAXUID: u64 = 0x7fff_ffff;

/// An ephemeral owner or group as logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EphemeralId {
    fuid: u64,
}

impl EphemeralId {
    /// Wraps a logged FUID.
    #[must_use]
    pub const fn from_fuid(fuid: u64) -> Self {
        Self { fuid }
    }

    /// Returns the logged 64-bit value.
    #[must_use]
    pub const fn fuid(self) -> u64 {
        self.fuid
    }

    /// Returns the 1-based domain-table index, or 0 for a host-local
    /// ephemeral id.
    #[must_use]
    pub const fn domain_index(self) -> u32 {
        (self.fuid >> 32) as u32
    }

    /// Returns the id relative to its domain.
    #[must_use]
    pub const fn rid(self) -> u32 {
        self.fuid as u32
    }
}

/// An owner or group reference decoded from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityRef {
    /// A host-valid id, used directly.
    Resolved(u32),
    /// A record-local id that the store must map through the identity context.
    Ephemeral(EphemeralId),
}

impl IdentityRef {
    /// Classifies a raw logged owner/group value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        if raw > MAXUID {
            Self::Ephemeral(EphemeralId::from_fuid(raw))
        } else {
            Self::Resolved(raw as u32)
        }
    }

    /// Returns the ephemeral id, if this is one.
    #[must_use]
    pub const fn ephemeral(self) -> Option<EphemeralId> {
        match self {
            Self::Ephemeral(id) => Some(id),
            Self::Resolved(_) => None,
        }
    }

    /// Returns the domain index referenced by this id, 0 if none.
    #[must_use]
    pub const fn domain_index(self) -> u32 {
        match self {
            Self::Ephemeral(id) => id.domain_index(),
            Self::Resolved(_) => 0,
        }
    }
}

impl Default for IdentityRef {
    fn default() -> Self {
        Self::Resolved(0)
    }
}

/// One entry of an explicit identity list, awaiting resolution by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingIdentity {
    /// The FUID as logged.
    pub logged: u64,
    /// The host id the store assigned, once resolved.
    pub resolved: Option<u32>,
    /// Domain-table slot the store assigned, once resolved.
    pub domain_slot: u32,
}

impl PendingIdentity {
    /// Creates an unresolved entry for a logged FUID.
    #[must_use]
    pub const fn new(logged: u64) -> Self {
        Self {
            logged,
            resolved: None,
            domain_slot: 0,
        }
    }
}

/// Identity information reconstructed from one record.
///
/// Built while decoding a record, handed to exactly one store primitive, and
/// dropped with the record. It never outlives the replay call that built it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    /// Domain names in log order. Ephemeral domain index `n` names entry `n - 1`.
    pub domains: Vec<String>,
    /// Explicit identity list, in log order.
    pub pending: Vec<PendingIdentity>,
    /// Ephemeral owner of the object, if any.
    pub owner: Option<EphemeralId>,
    /// Ephemeral group of the object, if any.
    pub group: Option<EphemeralId>,
}

impl IdentityContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the context carries nothing for the store to resolve.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
            && self.pending.is_empty()
            && self.owner.is_none()
            && self.group.is_none()
    }

    /// Records owner and group when they are ephemeral.
    pub fn set_owner_group(&mut self, owner: IdentityRef, group: IdentityRef) {
        if let Some(id) = owner.ephemeral() {
            self.owner = Some(id);
        }
        if let Some(id) = group.ephemeral() {
            self.group = Some(id);
        }
    }

    /// Returns the domain name an ephemeral id refers to.
    pub fn domain_of(&self, id: EphemeralId) -> Option<&str> {
        let index = id.domain_index() as usize;
        index
            .checked_sub(1)
            .and_then(|slot| self.domains.get(slot))
            .map(String::as_str)
    }
}
