//! Forwarding authorized payloads to the account.

use keymanager_core::{abi, Bytes, Selector, U256};
use keymanager_store::{AccountCall, CallOutcome};

use crate::error::{KeyManagerError, Result};

/// Record of a call the account accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutedRecord {
    pub selector: Selector,
    pub value: U256,
}

/// A successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub output: Bytes,
    pub record: ExecutedRecord,
}

/// Calls the account and turns reverts into errors.
pub struct ExecutionDispatcher<A> {
    account: A,
    unwrap_results: bool,
}

impl<A: AccountCall> ExecutionDispatcher<A> {
    pub fn new(account: A, unwrap_results: bool) -> Self {
        Self {
            account,
            unwrap_results,
        }
    }

    /// Forward `payload` with `value` attached.
    ///
    /// A revert carrying an `Error(string)` surfaces as
    /// [`KeyManagerError::CallReverted`]; any other revert as
    /// [`KeyManagerError::CallFailed`] with the raw data.
    pub fn dispatch(&self, payload: &[u8], value: U256) -> Result<Dispatched> {
        let selector = payload
            .get(..4)
            .map(Selector::from_slice)
            .unwrap_or_default();

        match self.account.call(payload, value)? {
            CallOutcome::Success(output) => {
                let output = if self.unwrap_results {
                    abi::unwrap_bytes_result(&output)
                } else {
                    output
                };
                tracing::info!(%selector, %value, "account call executed");
                Ok(Dispatched {
                    output,
                    record: ExecutedRecord { selector, value },
                })
            }
            CallOutcome::Revert(data) => match abi::decode_revert_reason(&data) {
                Some(reason) => {
                    tracing::warn!(%selector, %reason, "account call reverted");
                    Err(KeyManagerError::CallReverted { reason })
                }
                None => {
                    tracing::warn!(%selector, len = data.len(), "account call failed");
                    Err(KeyManagerError::CallFailed { data })
                }
            },
        }
    }
}
