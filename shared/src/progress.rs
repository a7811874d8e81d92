//! Stepper model for lifecycle progress.
//!
//! The backend reports progress either as `FlowNode`s or as raw
//! `StatusReceipt`s; both end up as a [`Stepper`], which is what views
//! render: one node per step and a connector between neighbours.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::{FlowNode, StatusReceipt};
use crate::models::BackOfficeStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Completed,
    Current,
    Pending,
    Failed,
    Blocked,
    WaitingApproval,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Current => "CURRENT",
            Self::Pending => "PENDING",
            Self::Failed => "FAILED",
            Self::Blocked => "BLOCKED",
            Self::WaitingApproval => "WAITING_APPROVAL",
        }
    }

    /// Class applied to the step node.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Completed => "step-completed",
            Self::Current => "step-current",
            Self::Pending => "step-pending",
            Self::Failed => "step-failed",
            Self::Blocked => "step-blocked",
            Self::WaitingApproval => "step-waiting-approval",
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            Self::Completed => "[x]",
            Self::Current => "[>]",
            Self::Pending => "[ ]",
            Self::Failed => "[!]",
            Self::Blocked => "[#]",
            Self::WaitingApproval => "[?]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStepStatus(pub String);

impl fmt::Display for UnknownStepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown step status: {}", self.0)
    }
}

impl std::error::Error for UnknownStepStatus {}

impl FromStr for StepStatus {
    type Err = UnknownStepStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COMPLETED" => Ok(Self::Completed),
            "CURRENT" => Ok(Self::Current),
            "PENDING" => Ok(Self::Pending),
            "FAILED" => Ok(Self::Failed),
            "BLOCKED" => Ok(Self::Blocked),
            "WAITING_APPROVAL" => Ok(Self::WaitingApproval),
            _ => Err(UnknownStepStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub label: String,
    pub status: StepStatus,
    pub timestamp: Option<NaiveDateTime>,
}

impl Step {
    pub fn new(label: impl Into<String>, status: StepStatus) -> Self {
        Self {
            label: label.into(),
            status,
            timestamp: None,
        }
    }
}

/// Line drawn between two adjacent steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connector {
    pub completed: bool,
}

impl Connector {
    pub fn css_class(&self) -> &'static str {
        if self.completed {
            "step-connector connector-completed"
        } else {
            "step-connector"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stepper {
    pub steps: Vec<Step>,
}

impl Stepper {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Converts backend flow nodes. Unknown statuses render as pending.
    pub fn from_flow_nodes(nodes: &[FlowNode]) -> Self {
        let steps = nodes
            .iter()
            .map(|node| Step {
                label: node.name.clone(),
                status: node.status.parse().unwrap_or_else(|e: UnknownStepStatus| {
                    tracing::warn!("{}, rendering {} as pending", e, node.id);
                    StepStatus::Pending
                }),
                timestamp: node.timestamp,
            })
            .collect();
        Self { steps }
    }

    /// One connector between each pair of neighbours; complete when the
    /// left-hand step is complete.
    pub fn connectors(&self) -> Vec<Connector> {
        self.steps
            .windows(2)
            .map(|pair| Connector {
                completed: pair[0].status == StepStatus::Completed,
            })
            .collect()
    }

    pub fn current(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Current)
    }

    pub fn has_failure(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Failed | StepStatus::Blocked))
    }

    pub fn progress_percentage(&self) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }
        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        ((completed * 100) / self.steps.len()) as u8
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Display for Stepper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" -- ")?;
            }
            write!(f, "{} {}", step.status.marker(), step.label)?;
        }
        Ok(())
    }
}

/// Derives steps from status receipts.
///
/// A receipt that is neither successful, failed nor processing is the
/// current step when the receipt before it succeeded, otherwise pending.
pub fn flow_nodes_from_receipts(receipts: &[StatusReceipt]) -> Stepper {
    let steps = receipts
        .iter()
        .enumerate()
        .map(|(i, receipt)| {
            let status = match receipt.status.as_str() {
                "SUCCESS" => StepStatus::Completed,
                "FAILED" => StepStatus::Failed,
                "PROCESSING" => StepStatus::Current,
                _ if i > 0 && receipts[i - 1].status == "SUCCESS" => StepStatus::Current,
                _ => StepStatus::Pending,
            };
            Step {
                label: receipt.stage.clone(),
                status,
                timestamp: receipt.timestamp,
            }
        })
        .collect();
    Stepper { steps }
}

pub const TRANSACTION_STAGES: [&str; 5] = ["Point of trade", "Confirmed", "Booked", "Sent", "Completed"];

/// Five-stage transaction stepper for a back-office status.
///
/// Every stage up to and including the one the status names is complete and
/// the next one is current. A completed transaction has every stage complete.
pub fn transaction_lifecycle(status: BackOfficeStatus) -> Stepper {
    let reached = match status {
        BackOfficeStatus::Confirmed => 1,
        BackOfficeStatus::SettledPendingReport => 2,
        BackOfficeStatus::ReportedPendingReceipt => 3,
        BackOfficeStatus::Completed => 4,
    };

    let steps = TRANSACTION_STAGES
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let status = if i <= reached {
                StepStatus::Completed
            } else if i == reached + 1 {
                StepStatus::Current
            } else {
                StepStatus::Pending
            };
            Step::new(*label, status)
        })
        .collect();
    Stepper { steps }
}
