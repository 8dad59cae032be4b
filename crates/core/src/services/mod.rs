//! Lifecycle services: the command handlers behind every session, meeting,
//! completion, cancellation, report, and standing operation.
//!
//! Each service validates a command against the current record, applies one
//! precondition-checked write through its repository, and emits a
//! [`LifecycleEvent`](crate::events::LifecycleEvent).

pub mod cancellation;
pub mod completion;
pub mod meetings;
pub mod reports;
pub mod sessions;
pub mod standing;

use std::sync::Arc;

pub use cancellation::{CancellationOutcome, CancellationService};
pub use completion::{CompletionOutcome, CompletionTracker};
pub use meetings::{MeetingCancellation, MeetingService};
pub use reports::ReportResolver;
pub use sessions::SessionService;
pub use standing::StandingService;

use crate::error::{CoreError, CoreResult};
use crate::events::NotificationSink;
use crate::repository::{Repositories, SessionRepository};
use crate::session::Session;
use crate::types::{Actor, SessionId};

/// All lifecycle services wired to one set of repositories and one sink.
#[derive(Clone)]
pub struct Services {
    pub sessions: SessionService,
    pub completion: CompletionTracker,
    pub cancellations: CancellationService,
    pub meetings: MeetingService,
    pub reports: ReportResolver,
    pub standing: StandingService,
}

impl Services {
    pub fn new(repos: Repositories, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sessions: SessionService::new(repos.sessions.clone(), sink.clone()),
            completion: CompletionTracker::new(
                repos.sessions.clone(),
                repos.completions.clone(),
                repos.progress.clone(),
                sink.clone(),
            ),
            cancellations: CancellationService::new(
                repos.sessions.clone(),
                repos.cancellations.clone(),
                sink.clone(),
            ),
            meetings: MeetingService::new(repos.meetings.clone(), sink.clone()),
            reports: ReportResolver::new(
                repos.sessions.clone(),
                repos.reports.clone(),
                repos.standings.clone(),
                sink.clone(),
            ),
            standing: StandingService::new(repos.standings, sink),
        }
    }
}

/// Fail with `Forbidden` unless the actor holds the admin role.
pub fn require_admin(actor: Actor, action: &str) -> CoreResult<()> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!("Admin role required to {action}")))
    }
}

/// Load a session or fail with `NotFound`.
pub(crate) async fn load_session(
    sessions: &dyn SessionRepository,
    id: SessionId,
) -> CoreResult<Session> {
    sessions
        .find_by_id(id)
        .await?
        .ok_or(CoreError::not_found("Session", id))
}

/// Fail with `Forbidden` unless the actor is a party to the session or an admin.
pub(crate) fn require_party_or_admin(session: &Session, actor: Actor) -> CoreResult<()> {
    if actor.is_admin || session.is_party(actor.user_id) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "User {} is not a party to session {}",
            actor.user_id, session.id
        )))
    }
}
