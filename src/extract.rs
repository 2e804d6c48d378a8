//! ERC20 transfer call extraction
//!
//! Picks out transactions whose call data starts with the
//! `transfer(address,uint256)` selector and reports the addresses that took
//! part: the sender and the called contract. The token recipient encoded in
//! the call data is not decoded.

use crate::types::{Address, Block, Transaction};
use std::collections::HashSet;
use tracing::trace;

/// First four bytes of keccak256("transfer(address,uint256)")
pub const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// How often one address may be counted within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Each qualifying transaction counts its sender and its callee, even
    /// when they are the same address.
    #[default]
    PerTransaction,
    /// Each address counts at most once per block.
    PerBlock,
}

/// Check whether call data begins with the ERC20 transfer selector.
///
/// `input` is the `0x`-prefixed hex string from the transaction object.
/// Only the selector is inspected; the payload after it is ignored.
pub fn is_erc20_transfer(input: &str) -> bool {
    let Some(hex_part) = input.strip_prefix("0x") else {
        return false;
    };
    let Some(selector_hex) = hex_part.get(..8) else {
        return false;
    };
    let mut selector = [0u8; 4];
    match hex::decode_to_slice(selector_hex, &mut selector) {
        Ok(()) => selector == ERC20_TRANSFER_SELECTOR,
        Err(_) => false,
    }
}

/// Addresses taking part in a single transaction, if it is an ERC20 transfer.
fn transfer_participants(tx: &Transaction) -> Vec<&Address> {
    let qualifies = tx.input.as_deref().map_or(false, is_erc20_transfer);
    if !qualifies {
        return Vec::new();
    }

    let mut participants = Vec::with_capacity(2);
    if let Some(from) = &tx.from {
        participants.push(from);
    }
    if let Some(to) = &tx.to {
        participants.push(to);
    }
    trace!(
        "erc20 transfer {}: {} participants",
        tx.hash.as_deref().unwrap_or("<no hash>"),
        participants.len()
    );
    participants
}

/// Collect the addresses involved in ERC20 transfer calls within a block.
///
/// A missing block yields no addresses. Transactions lacking `input`,
/// `from` or `to` contribute whatever fields they do have, or nothing.
pub fn extract_erc20_addresses(block: Option<&Block>, policy: DedupPolicy) -> Vec<Address> {
    let Some(block) = block else {
        return Vec::new();
    };

    let participants = block.transactions.iter().flat_map(transfer_participants);
    match policy {
        DedupPolicy::PerTransaction => participants.cloned().collect(),
        DedupPolicy::PerBlock => {
            let mut seen = HashSet::new();
            participants
                .filter(|addr| seen.insert(*addr))
                .cloned()
                .collect()
        }
    }
}
