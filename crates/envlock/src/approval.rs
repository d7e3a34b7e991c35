//! Executing an approval.
//!
//! An [`ApprovalPlan`] is persisted as three independent writes. There is
//! no cross-write atomicity: if one fails, the earlier ones stay applied
//! and the caller gets [`EnvlockError::ApprovalInterrupted`] naming the
//! failed step and the completed ones.

use std::fmt;

use envlock_core::{ApprovalPlan, EnrollmentRequest, Invite, Recipient};
use envlock_store::MetadataStore;
use tracing::{debug, warn};

use crate::error::{EnvlockError, Result};

/// One write of the approval sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalStep {
    WriteRecipients,
    SaveRequest,
    MarkInviteUsed,
}

impl ApprovalStep {
    /// All steps in the order they run.
    pub const ORDER: [ApprovalStep; 3] = [
        ApprovalStep::WriteRecipients,
        ApprovalStep::SaveRequest,
        ApprovalStep::MarkInviteUsed,
    ];
}

impl fmt::Display for ApprovalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApprovalStep::WriteRecipients => "write recipients",
            ApprovalStep::SaveRequest => "save request",
            ApprovalStep::MarkInviteUsed => "mark invite used",
        })
    }
}

/// What an approval did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientChange {
    /// The device was added as a new recipient.
    Added(Recipient),
    /// The device was already a recipient; the registry is unchanged.
    AlreadyPresent,
}

/// Result of a completed approval.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub request: EnrollmentRequest,
    pub invite: Invite,
    pub recipient: RecipientChange,
}

impl ApprovalOutcome {
    pub fn recipient_added(&self) -> bool {
        matches!(self.recipient, RecipientChange::Added(_))
    }
}

/// Persist `plan` in [`ApprovalStep::ORDER`].
pub(crate) async fn execute<S>(store: &S, plan: ApprovalPlan) -> Result<ApprovalOutcome>
where
    S: MetadataStore + ?Sized,
{
    let mut completed = Vec::with_capacity(ApprovalStep::ORDER.len());

    for step in ApprovalStep::ORDER {
        let written = match step {
            ApprovalStep::WriteRecipients => store.write_recipients(&plan.registry).await,
            ApprovalStep::SaveRequest => store.save_request(&plan.request).await,
            ApprovalStep::MarkInviteUsed => store.save_invite(&plan.invite).await,
        };

        if let Err(source) = written {
            warn!(
                request_id = %plan.request.id,
                step = %step,
                completed = completed.len(),
                error = %source,
                "approval interrupted"
            );
            return Err(EnvlockError::ApprovalInterrupted {
                request_id: plan.request.id.clone(),
                failed: step,
                completed,
                source,
            });
        }

        debug!(request_id = %plan.request.id, step = %step, "approval step written");
        completed.push(step);
    }

    let recipient = match plan.added {
        Some(recipient) => RecipientChange::Added(recipient),
        None => RecipientChange::AlreadyPresent,
    };

    Ok(ApprovalOutcome {
        request: plan.request,
        invite: plan.invite,
        recipient,
    })
}
