//! Identity and domain tables.
//!
//! Two layouts carry identity data. Records without an ACL use the compact
//! form: a domain table sized implicitly by how many distinct domains the
//! owner and group reference. Records with an ACL use the explicit form: a
//! counted list of logged FUIDs followed by a counted domain table.
//!
//! Neither decoder resolves anything; the store does that when it is handed
//! the resulting [`IdentityContext`].

use tracing::trace;
use zilreplay_codec::{ByteSwapper, RecordReader};
use zilreplay_store::{IdentityContext, IdentityRef, PendingIdentity};

use crate::error::ReplayResult;

/// Size of one logged FUID in the explicit form.
pub const FUID_LEN: usize = 8;

/// Returns the number of domain strings the compact form carries for this
/// owner and group.
///
/// The owner's domain counts once if it has one. The group's counts if it
/// has one that differs from the owner's.
#[must_use]
pub fn compact_domain_count(owner: IdentityRef, group: IdentityRef) -> usize {
    let owner_idx = owner.domain_index();
    let group_idx = group.domain_index();
    let mut count = 0;
    if owner_idx != 0 {
        count += 1;
    }
    if group_idx != 0 && group_idx != owner_idx {
        count += 1;
    }
    count
}

/// Decodes the compact form and advances past it.
///
/// With no domains referenced nothing is read and the context is empty.
pub fn decode_compact_domains(
    reader: &mut RecordReader<'_>,
    owner: IdentityRef,
    group: IdentityRef,
) -> ReplayResult<IdentityContext> {
    let count = compact_domain_count(owner, group);
    let mut ctx = IdentityContext::new();
    if count == 0 {
        return Ok(ctx);
    }
    ctx.set_owner_group(owner, group);
    let start = reader.absolute_position();
    ctx.domains = read_domains(reader, count)?;
    trace!(
        offset = start,
        len = reader.absolute_position() - start,
        domains = count,
        "decoded compact domain table"
    );
    Ok(ctx)
}

/// Decodes the explicit form and advances past it.
///
/// Reads `idcnt` logged FUIDs, each becoming an unresolved
/// [`PendingIdentity`], then `domcnt` domain strings. Ephemeral owner and
/// group values are recorded on the context as well.
pub fn decode_identity_list(
    reader: &mut RecordReader<'_>,
    idcnt: u64,
    domcnt: u64,
    owner: IdentityRef,
    group: IdentityRef,
) -> ReplayResult<IdentityContext> {
    let start = reader.absolute_position();
    let ids = reader.checked_count(idcnt, FUID_LEN)?;
    let mut ctx = IdentityContext::new();
    ctx.pending.reserve(ids);
    for _ in 0..ids {
        ctx.pending.push(PendingIdentity::new(reader.read_u64()?));
    }
    // Every domain string is at least its terminator.
    let domains = reader.checked_count(domcnt, 1)?;
    ctx.domains = read_domains(reader, domains)?;
    ctx.set_owner_group(owner, group);
    trace!(
        offset = start,
        len = reader.absolute_position() - start,
        ids,
        domains,
        "decoded identity list"
    );
    Ok(ctx)
}

fn read_domains(reader: &mut RecordReader<'_>, count: usize) -> ReplayResult<Vec<String>> {
    let mut domains = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        domains.push(reader.read_utf8_cstr()?.to_owned());
    }
    Ok(domains)
}

/// Converts the byte order of an explicit identity list in place. Domain
/// strings are not touched.
pub(crate) fn swap_identity_list(swapper: &mut ByteSwapper<'_>, idcnt: u64) -> ReplayResult<()> {
    let count = usize::try_from(idcnt).unwrap_or(usize::MAX);
    swapper.swap_u64_array(count)?;
    Ok(())
}
