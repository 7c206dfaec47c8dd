//! Escrow events and typed receipt decoding
//!
//! A successful batched lock emits one `OrderLocked` event per locked order.
//! Settlement needs exactly one decoded event per submitted entry; anything
//! else means the chain moved funds that cannot be mirrored off-chain.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;
use types::ids::{LockId, OrderId, WalletAddress};
use types::numeric::TokenAmount;

use crate::errors::EventDecodeError;
use crate::ledger::{LogEntry, TransactionReceipt};

/// Event name of the lock confirmation
pub const ORDER_LOCKED_EVENT: &str = "OrderLocked";

/// Lock confirmation emitted per locked order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLocked {
    pub lock_id: LockId,
    pub order_id: OrderId,
    pub buyer: WalletAddress,
    pub amount: TokenAmount,
}

impl OrderLocked {
    /// Encode as a receipt log entry
    pub fn to_log(&self, contract: &str) -> Result<LogEntry, serde_json::Error> {
        Ok(LogEntry {
            address: contract.to_string(),
            event: ORDER_LOCKED_EVENT.to_string(),
            data: serde_json::to_value(self)?,
        })
    }
}

/// Extract the lock confirmations for a submitted batch
///
/// `expected` lists the submitted `(order id, amount)` entries in submission
/// order (an order id may repeat). Only `OrderLocked` logs emitted by
/// `contract` count; other events and other emitters are ignored. Every
/// decoded event must name `buyer`. The decoded events come back in log
/// order.
pub fn decode_lock_events(
    receipt: &TransactionReceipt,
    contract: &str,
    buyer: &WalletAddress,
    expected: &[(OrderId, TokenAmount)],
) -> Result<Vec<OrderLocked>, EventDecodeError> {
    let events = receipt
        .logs
        .iter()
        .enumerate()
        .filter(|(index, log)| {
            if log.event != ORDER_LOCKED_EVENT {
                return false;
            }
            let ours = log.address.eq_ignore_ascii_case(contract);
            if !ours {
                warn!(
                    tx_hash = %receipt.tx_hash,
                    index = *index,
                    emitter = %log.address,
                    "Ignoring lock event from foreign contract"
                );
            }
            ours
        })
        .map(|(index, log)| {
            serde_json::from_value::<OrderLocked>(log.data.clone()).map_err(|e| {
                EventDecodeError::Malformed {
                    index,
                    reason: e.to_string(),
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if events.len() != expected.len() {
        return Err(EventDecodeError::CountMismatch {
            expected: expected.len(),
            found: events.len(),
        });
    }

    let mut outstanding: HashMap<OrderId, Vec<TokenAmount>> = HashMap::new();
    for (order_id, amount) in expected {
        outstanding.entry(*order_id).or_default().push(*amount);
    }
    for event in &events {
        if !event.buyer.as_str().eq_ignore_ascii_case(buyer.as_str()) {
            return Err(EventDecodeError::WrongBuyer {
                order_id: event.order_id,
                buyer: event.buyer.clone(),
            });
        }
        let submitted = match outstanding.get_mut(&event.order_id) {
            Some(amounts) if !amounts.is_empty() => amounts,
            _ => return Err(EventDecodeError::UnexpectedOrder { order_id: event.order_id }),
        };
        match submitted.iter().position(|amount| *amount == event.amount) {
            Some(position) => {
                submitted.swap_remove(position);
            }
            None => {
                let requested = submitted.swap_remove(0);
                warn!(
                    tx_hash = %receipt.tx_hash,
                    lock_id = %event.lock_id,
                    order_id = %event.order_id,
                    requested = %requested,
                    locked = %event.amount,
                    "Locked amount differs from submitted amount"
                );
            }
        }
    }

    Ok(events)
}
