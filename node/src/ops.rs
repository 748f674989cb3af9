//! # Operations
//!
//! The wire form of every state-changing call the node accepts, shared by
//! `POST /operations` and `ngu-node replay`. Each variant names its caller
//! explicitly.
//!
//! ```json
//! { "transfer": { "from": "0x…", "to": "0x…", "amount": 5000000000000000000 } }
//! ```

use serde::{Deserialize, Serialize};

use ngu_contracts::{ContractError, NumberGoUp};
use ngu_ledger::{Address, TokenId, TransferSummary};

/// One state-changing call against the deployed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Transfer {
        from: Address,
        to: Address,
        amount: u128,
    },
    TransferFrom {
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    },
    Approve {
        owner: Address,
        spender: Address,
        amount: u128,
    },
    Erc721TransferFrom {
        spender: Address,
        from: Address,
        to: Address,
        id: TokenId,
    },
    ApproveToken {
        caller: Address,
        spender: Address,
        id: TokenId,
    },
    SetApprovalForAll {
        owner: Address,
        operator: Address,
        approved: bool,
    },
    /// Owner-only.
    SetErc721TransferExempt {
        caller: Address,
        target: Address,
        state: bool,
    },
    SetSelfErc721TransferExempt {
        caller: Address,
        state: bool,
    },
    /// Owner-only.
    TransferOwnership {
        caller: Address,
        new_owner: Address,
    },
}

impl Operation {
    /// Short name used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Transfer { .. } => "transfer",
            Operation::TransferFrom { .. } => "transfer_from",
            Operation::Approve { .. } => "approve",
            Operation::Erc721TransferFrom { .. } => "erc721_transfer_from",
            Operation::ApproveToken { .. } => "approve_token",
            Operation::SetApprovalForAll { .. } => "set_approval_for_all",
            Operation::SetErc721TransferExempt { .. } => "set_erc721_transfer_exempt",
            Operation::SetSelfErc721TransferExempt { .. } => "set_self_erc721_transfer_exempt",
            Operation::TransferOwnership { .. } => "transfer_ownership",
        }
    }
}

/// Applies `op` to `ngu`. Calls with no non-fungible side effects report an
/// empty summary.
pub fn apply(ngu: &mut NumberGoUp, op: &Operation) -> Result<TransferSummary, ContractError> {
    let none = TransferSummary::default();
    match *op {
        Operation::Transfer { from, to, amount } => ngu.transfer(from, to, amount),
        Operation::TransferFrom {
            spender,
            from,
            to,
            amount,
        } => ngu.transfer_from(spender, from, to, amount),
        Operation::Approve {
            owner,
            spender,
            amount,
        } => ngu.approve(owner, spender, amount).map(|_| none),
        Operation::Erc721TransferFrom { spender, from, to, id } => {
            ngu.erc721_transfer_from(spender, from, to, id).map(|_| none)
        }
        Operation::ApproveToken { caller, spender, id } => ngu.approve_token(caller, spender, id).map(|_| none),
        Operation::SetApprovalForAll {
            owner,
            operator,
            approved,
        } => ngu.set_approval_for_all(owner, operator, approved).map(|_| none),
        Operation::SetErc721TransferExempt { caller, target, state } => {
            ngu.set_erc721_transfer_exempt(caller, target, state)
        }
        Operation::SetSelfErc721TransferExempt { caller, state } => {
            ngu.set_self_erc721_transfer_exempt(caller, state)
        }
        Operation::TransferOwnership { caller, new_owner } => {
            ngu.transfer_ownership(caller, new_owner).map(|_| none)
        }
    }
}

/// Result of one operation in a replay report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub index: usize,
    pub kind: String,
    pub ok: bool,
    #[serde(default)]
    pub minted: u128,
    #[serde(default)]
    pub burned: u128,
    #[serde(default)]
    pub reassigned: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationOutcome {
    pub fn new(index: usize, op: &Operation, result: &Result<TransferSummary, ContractError>) -> Self {
        let (summary, error) = match result {
            Ok(summary) => (*summary, None),
            Err(e) => (TransferSummary::default(), Some(e.to_string())),
        };
        Self {
            index,
            kind: op.kind().to_string(),
            ok: error.is_none(),
            minted: summary.minted,
            burned: summary.burned,
            reassigned: summary.reassigned,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentConfig;

    fn deployed() -> (NumberGoUp, Address, u128) {
        let config = DeploymentConfig::default();
        let ngu = config.deploy().unwrap();
        let units = ngu.ledger().units();
        (ngu, config.deployment.initial_owner, units)
    }

    #[test]
    fn parses_externally_tagged_json() {
        let alice = Address::derive("alice");
        let raw = format!(
            r#"{{"transfer":{{"from":"{}","to":"{}","amount":340282366920938463463374607431768211455}}}}"#,
            alice, alice
        );
        let op: Operation = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            op,
            Operation::Transfer {
                from: alice,
                to: alice,
                amount: u128::MAX
            }
        );
        assert_eq!(op.kind(), "transfer");
    }

    #[test]
    fn apply_transfer_reports_mints() {
        let (mut ngu, owner, units) = deployed();
        let op = Operation::Transfer {
            from: owner,
            to: Address::derive("alice"),
            amount: 3 * units,
        };
        let summary = apply(&mut ngu, &op).unwrap();
        assert_eq!(summary.minted, 3);
    }

    #[test]
    fn owner_gate_surfaces_through_apply() {
        let (mut ngu, _, _) = deployed();
        let stranger = Address::derive("stranger");
        let op = Operation::SetErc721TransferExempt {
            caller: stranger,
            target: stranger,
            state: true,
        };
        let result = apply(&mut ngu, &op);
        assert_eq!(result, Err(ContractError::Unauthorized { caller: stranger }));

        let outcome = OperationOutcome::new(4, &op, &result);
        assert!(!outcome.ok);
        assert_eq!(outcome.index, 4);
        assert!(outcome.error.unwrap().contains("not the owner"));
    }
}
