//! Side effects a report save applies to the records it references.
//!
//! # Responsibility
//! - Add the report's student to every referenced guardian's student set.
//! - Back-fill the student on the attached response action and observation.
//!
//! # Invariants
//! - Every step is skipped when its reference is `None`.
//! - Guardian linking is idempotent.
//! - A follow-up that already has a student keeps it (first writer wins).

use crate::model::guardian::GuardianKind;
use crate::model::report::Report;
use crate::repo::follow_up_repo::FollowUpRepository;
use crate::repo::guardian_repo::GuardianRepository;
use crate::repo::RepoResult;

/// What one cascade run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// Guardian slots whose student set gained the report's student.
    pub newly_linked: Vec<GuardianKind>,
    pub response_action_claimed: bool,
    pub observation_claimed: bool,
}

/// Runs guardian linking, then response-action and observation back-fill.
pub fn apply_cascade<G, F>(guardians: &G, follow_ups: &F, report: &Report) -> RepoResult<CascadeOutcome>
where
    G: GuardianRepository + ?Sized,
    F: FollowUpRepository + ?Sized,
{
    let newly_linked = link_guardians(guardians, report)?;
    let (response_action_claimed, observation_claimed) = backfill_follow_ups(follow_ups, report)?;
    Ok(CascadeOutcome {
        newly_linked,
        response_action_claimed,
        observation_claimed,
    })
}

/// Links the report's student to its father, mother and legal guardian.
pub fn link_guardians<G>(guardians: &G, report: &Report) -> RepoResult<Vec<GuardianKind>>
where
    G: GuardianRepository + ?Sized,
{
    let mut newly_linked = Vec::new();
    for (kind, guardian) in report.guardians() {
        if guardians.link_student(kind, guardian, report.student_uuid)? {
            newly_linked.push(kind);
        }
    }
    Ok(newly_linked)
}

/// Returns `(response_action_claimed, observation_claimed)`.
pub fn backfill_follow_ups<F>(follow_ups: &F, report: &Report) -> RepoResult<(bool, bool)>
where
    F: FollowUpRepository + ?Sized,
{
    let action_claimed = match report.response_action_uuid {
        Some(action) => follow_ups.claim_response_action_student(action, report.student_uuid)?,
        None => false,
    };
    let observation_claimed = match report.observation_uuid {
        Some(observation) => {
            follow_ups.claim_observation_student(observation, report.student_uuid)?
        }
        None => false,
    };
    Ok((action_claimed, observation_claimed))
}
