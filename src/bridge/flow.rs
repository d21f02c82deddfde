use crate::error::{BridgeError, Result};
use crate::types::{SubmittedTransaction, TransferIntent, TxPurpose};
use alloy_primitives::{B256, U256};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum TransferState {
    Created,
    Validated,
    Submitted { step: TxPurpose, tx: B256 },
    Confirmed { step: TxPurpose, tx: B256 },
    Finalized { tx: B256 },
    Failed { reason: String },
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Finalized { .. } | TransferState::Failed { .. })
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferState::Created => f.write_str("created"),
            TransferState::Validated => f.write_str("validated"),
            TransferState::Submitted { step, .. } => write!(f, "submitted({step})"),
            TransferState::Confirmed { step, .. } => write!(f, "confirmed({step})"),
            TransferState::Finalized { .. } => f.write_str("finalized"),
            TransferState::Failed { .. } => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Validated { amount: U256 },
    Submitted(SubmittedTransaction),
    /// The receipt of the current step was mined with status 1.
    Confirmed,
    Finalized,
    Failed(String),
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferEvent::Validated { .. } => f.write_str("validated"),
            TransferEvent::Submitted(tx) => write!(f, "submitted({})", tx.purpose),
            TransferEvent::Confirmed => f.write_str("confirmed"),
            TransferEvent::Finalized => f.write_str("finalized"),
            TransferEvent::Failed(_) => f.write_str("failed"),
        }
    }
}

/// One transfer's lifecycle: the ordered steps it needs and every transaction sent so far.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFlow {
    pub intent: TransferIntent,
    pub steps: Vec<TxPurpose>,
    pub state: TransferState,
    pub amount: Option<U256>,
    pub history: Vec<SubmittedTransaction>,
}

impl TransferFlow {
    pub fn new(intent: TransferIntent, steps: Vec<TxPurpose>) -> Self {
        Self {
            intent,
            steps,
            state: TransferState::Created,
            amount: None,
            history: Vec::new(),
        }
    }

    /// Step the next submission must carry, if any is left.
    pub fn next_step(&self) -> Option<TxPurpose> {
        self.steps.get(self.history.len()).copied()
    }

    pub fn last_tx(&self) -> Option<&SubmittedTransaction> {
        self.history.last()
    }

    pub fn advance(&mut self, event: TransferEvent) -> Result<&TransferState> {
        let next = match (&self.state, &event) {
            (state, TransferEvent::Failed(reason)) if !state.is_terminal() => {
                TransferState::Failed {
                    reason: reason.clone(),
                }
            }
            (TransferState::Created, TransferEvent::Validated { amount }) => {
                self.amount = Some(*amount);
                TransferState::Validated
            }
            (
                TransferState::Validated | TransferState::Confirmed { .. },
                TransferEvent::Submitted(tx),
            ) if self.next_step() == Some(tx.purpose) => {
                self.history.push(tx.clone());
                TransferState::Submitted {
                    step: tx.purpose,
                    tx: tx.hash,
                }
            }
            (TransferState::Submitted { step, tx }, TransferEvent::Confirmed) => {
                TransferState::Confirmed {
                    step: *step,
                    tx: *tx,
                }
            }
            // Final steps that are not waited on finalize straight from submission.
            (TransferState::Submitted { tx, .. } | TransferState::Confirmed { tx, .. }, TransferEvent::Finalized)
                if self.next_step().is_none() =>
            {
                TransferState::Finalized { tx: *tx }
            }
            (state, event) => {
                return Err(BridgeError::InvalidTransition {
                    from: state.to_string(),
                    event: event.to_string(),
                })
            }
        };
        tracing::debug!(from = %self.state, to = %next, "transfer advanced");
        self.state = next;
        Ok(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chain, Direction};
    use alloy_primitives::Address;

    fn flow(steps: Vec<TxPurpose>) -> TransferFlow {
        let intent = TransferIntent::native(Direction::L1ToL2, Chain::L1, Address::ZERO, "1.0");
        TransferFlow::new(intent, steps)
    }

    fn submitted(byte: u8, purpose: TxPurpose) -> TransferEvent {
        TransferEvent::Submitted(SubmittedTransaction::new(
            B256::repeat_byte(byte),
            Chain::L1,
            purpose,
        ))
    }

    #[test]
    fn two_step_deposit_walks_every_state() {
        let mut flow = flow(vec![TxPurpose::Approve, TxPurpose::Deposit]);
        flow.advance(TransferEvent::Validated { amount: U256::from(5u64) })
            .unwrap();
        flow.advance(submitted(1, TxPurpose::Approve)).unwrap();
        flow.advance(TransferEvent::Confirmed).unwrap();
        assert_eq!(flow.next_step(), Some(TxPurpose::Deposit));
        flow.advance(submitted(2, TxPurpose::Deposit)).unwrap();
        let state = flow.advance(TransferEvent::Finalized).unwrap();
        assert_eq!(
            *state,
            TransferState::Finalized {
                tx: B256::repeat_byte(2)
            }
        );
        assert_eq!(flow.history.len(), 2);
        assert_eq!(flow.amount, Some(U256::from(5u64)));
    }

    #[test]
    fn submission_before_validation_is_rejected() {
        let mut flow = flow(vec![TxPurpose::Deposit]);
        let err = flow.advance(submitted(1, TxPurpose::Deposit)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidTransition { .. }));
        assert_eq!(flow.state, TransferState::Created);
    }

    #[test]
    fn second_step_waits_for_confirmation() {
        let mut flow = flow(vec![TxPurpose::Approve, TxPurpose::Deposit]);
        flow.advance(TransferEvent::Validated { amount: U256::from(1u64) })
            .unwrap();
        flow.advance(submitted(1, TxPurpose::Approve)).unwrap();
        assert!(flow.advance(submitted(2, TxPurpose::Deposit)).is_err());
        assert!(flow.advance(TransferEvent::Finalized).is_err());
    }

    #[test]
    fn wrong_step_order_is_rejected() {
        let mut flow = flow(vec![TxPurpose::Approve, TxPurpose::Deposit]);
        flow.advance(TransferEvent::Validated { amount: U256::from(1u64) })
            .unwrap();
        assert!(flow.advance(submitted(1, TxPurpose::Deposit)).is_err());
    }

    #[test]
    fn failure_is_terminal() {
        let mut flow = flow(vec![TxPurpose::Withdraw]);
        flow.advance(TransferEvent::Failed("bad amount".into())).unwrap();
        assert!(flow.state.is_terminal());
        assert!(flow.advance(TransferEvent::Failed("again".into())).is_err());
        assert!(flow
            .advance(TransferEvent::Validated { amount: U256::from(1u64) })
            .is_err());
    }
}
