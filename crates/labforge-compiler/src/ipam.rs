//! Deterministic IPv4 address allocation.
//!
//! Addresses are drawn from a subnet in ascending numeric order.
//! Reservation policy: the subnet's network address, its first usable
//! host (the gateway), and its broadcast address are never allocated.
//! The policy applies to whichever subnet an allocation draws from, so
//! sub-subnets used for replica fan-out reserve their own three
//! addresses.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use labforge_common::error::{LabError, Result};

/// Addresses already committed within one compilation run.
///
/// Append-only: entries are never removed while the run lasts, and the
/// pool is discarded when the run ends.
#[derive(Debug, Default)]
pub struct AddressPool {
    committed: BTreeSet<Ipv4Addr>,
}

impl AddressPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `addr` has already been committed.
    #[must_use]
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.committed.contains(&addr)
    }

    /// Commits addresses into the pool for the rest of the run.
    pub fn commit(&mut self, addrs: impl IntoIterator<Item = Ipv4Addr>) {
        self.committed.extend(addrs);
    }

    /// Returns the committed set, for use as an allocation exclusion
    /// list.
    #[must_use]
    pub fn as_set(&self) -> &BTreeSet<Ipv4Addr> {
        &self.committed
    }
}

/// Produces the next `count` available addresses in `subnet`.
///
/// Pure with respect to its inputs: `used` is not mutated; the caller
/// is responsible for committing the returned addresses.
///
/// # Errors
///
/// Returns [`LabError::PoolExhausted`] when fewer than `count` eligible
/// addresses remain in `subnet`.
pub fn allocate(
    subnet: Ipv4Net,
    used: &BTreeSet<Ipv4Addr>,
    count: usize,
) -> Result<Vec<Ipv4Addr>> {
    // hosts() walks the subnet ascending, already excluding the network
    // and broadcast addresses; the first usable host is the gateway.
    let gateway = subnet.hosts().next();

    // `count` is caller-controlled; do not pre-reserve it.
    let mut result = Vec::new();
    for addr in subnet.hosts() {
        if result.len() == count {
            break;
        }
        if Some(addr) == gateway || used.contains(&addr) {
            continue;
        }
        result.push(addr);
    }

    if result.len() < count {
        tracing::warn!(%subnet, requested = count, available = result.len(), "address pool exhausted");
        return Err(LabError::PoolExhausted {
            subnet,
            requested: count,
            available: result.len(),
        });
    }
    Ok(result)
}
