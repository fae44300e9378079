//! Operation scripts.
//!
//! A script is a JSON document listing calls in the order the environment
//! delivers them:
//!
//! ```json
//! { "steps": [
//!     { "caller": "0x11…", "op": "create_list", "entries": ["0x01…"] },
//!     { "caller": "0x01…", "op": "self_enroll", "list": 1, "season": 1, "payment": 5 }
//! ] }
//! ```
//!
//! Every step is applied atomically; a failing step is reported with its
//! failure category and replay continues with the next one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use roster_access::Enrollment;
use roster_types::{Address, Amount, CallContext, FailureKind, ListId, SeasonId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RosterError;
use crate::service::RosterService;

/// One public roster operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Grant { holder: Address },
    RevokeAuthority { holder: Address },
    SetCurrentSeason { season: SeasonId },
    Issue { members: Vec<Address>, season: SeasonId },
    Revoke { member: Address, season: SeasonId },
    CreateList { entries: Vec<Address> },
    AppendToList { list: ListId, entries: Vec<Address> },
    RemoveFromList { list: ListId, member: Address },
    SetFee { list: ListId, fee: Amount },
    SetOpen { list: ListId, open: bool },
    SelfEnroll { list: ListId, season: SeasonId, payment: Amount },
    Withdraw { to: Address },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Grant { .. } => "grant",
            Operation::RevokeAuthority { .. } => "revoke_authority",
            Operation::SetCurrentSeason { .. } => "set_current_season",
            Operation::Issue { .. } => "issue",
            Operation::Revoke { .. } => "revoke",
            Operation::CreateList { .. } => "create_list",
            Operation::AppendToList { .. } => "append_to_list",
            Operation::RemoveFromList { .. } => "remove_from_list",
            Operation::SetFee { .. } => "set_fee",
            Operation::SetOpen { .. } => "set_open",
            Operation::SelfEnroll { .. } => "self_enroll",
            Operation::Withdraw { .. } => "withdraw",
        }
    }
}

/// What a successful operation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OperationOutcome {
    Done,
    Issued { members: Vec<Address> },
    ListCreated { list: ListId },
    Removed { cleared: usize },
    Enrolled(Enrollment),
    Withdrawn { amount: Amount },
}

/// A scripted call: who makes it, optionally when, and what it does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub caller: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub op: Operation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub caller: Address,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OperationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StepReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Per-step results plus the roster state after the last step.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub current_season: SeasonId,
    pub authority_holders: Vec<Address>,
    pub seasons: BTreeMap<SeasonId, Vec<Address>>,
    pub lists: u64,
    pub gate_balance: Amount,
    pub journal_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_head: Option<String>,
}

impl ReplayReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|step| !step.succeeded()).count()
    }
}

impl RosterService {
    /// Apply one operation as `ctx.caller`.
    pub fn apply(
        &self,
        ctx: &CallContext,
        op: &Operation,
    ) -> Result<OperationOutcome, RosterError> {
        let outcome = match op {
            Operation::Grant { holder } => {
                self.grant_authority(ctx, *holder)?;
                OperationOutcome::Done
            }
            Operation::RevokeAuthority { holder } => {
                self.revoke_authority(ctx, *holder)?;
                OperationOutcome::Done
            }
            Operation::SetCurrentSeason { season } => {
                self.set_current_season(ctx, *season)?;
                OperationOutcome::Done
            }
            Operation::Issue { members, season } => OperationOutcome::Issued {
                members: self.issue(ctx, members, *season)?,
            },
            Operation::Revoke { member, season } => {
                self.revoke_credential(ctx, *member, *season)?;
                OperationOutcome::Done
            }
            Operation::CreateList { entries } => OperationOutcome::ListCreated {
                list: self.create_list(ctx, entries)?,
            },
            Operation::AppendToList { list, entries } => {
                self.append_to_list(ctx, *list, entries)?;
                OperationOutcome::Done
            }
            Operation::RemoveFromList { list, member } => OperationOutcome::Removed {
                cleared: self.remove_from_list(ctx, *list, *member)?,
            },
            Operation::SetFee { list, fee } => {
                self.set_fee(ctx, *list, *fee)?;
                OperationOutcome::Done
            }
            Operation::SetOpen { list, open } => {
                self.set_open(ctx, *list, *open)?;
                OperationOutcome::Done
            }
            Operation::SelfEnroll {
                list,
                season,
                payment,
            } => OperationOutcome::Enrolled(self.self_enroll(ctx, *list, *season, *payment)?),
            Operation::Withdraw { to } => OperationOutcome::Withdrawn {
                amount: self.withdraw(ctx, *to)?,
            },
        };
        Ok(outcome)
    }

    /// Apply every step in order and summarize the resulting state.
    pub fn replay(&self, script: &Script) -> Result<ReplayReport, RosterError> {
        let mut steps = Vec::with_capacity(script.steps.len());

        for (index, step) in script.steps.iter().enumerate() {
            let ctx = CallContext::at(step.caller, step.at.unwrap_or_else(Utc::now));
            let report = match self.apply(&ctx, &step.op) {
                Ok(outcome) => {
                    debug!(index, op = step.op.name(), "Step applied");
                    StepReport {
                        index,
                        caller: step.caller,
                        op: step.op.name(),
                        outcome: Some(outcome),
                        failure: None,
                        message: None,
                    }
                }
                Err(err) => {
                    warn!(index, op = step.op.name(), kind = %err.kind(), error = %err, "Step failed");
                    StepReport {
                        index,
                        caller: step.caller,
                        op: step.op.name(),
                        outcome: None,
                        failure: Some(err.kind()),
                        message: Some(err.to_string()),
                    }
                }
            };
            steps.push(report);
        }

        let mut seasons = BTreeMap::new();
        for season in self.seasons()? {
            seasons.insert(season, self.members_of(season)?);
        }

        Ok(ReplayReport {
            steps,
            current_season: self.current_season()?,
            authority_holders: self.authority_holders()?,
            seasons,
            lists: self.list_count()?,
            gate_balance: self.gate_balance(),
            journal_entries: self.journal().len(),
            journal_head: self.journal().head()?.map(hex::encode),
        })
    }
}
