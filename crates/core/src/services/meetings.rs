//! Meeting scheduling: propose, respond, cancel, acknowledge, complete.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::events::{entity_types, event_types, LifecycleEvent, NotificationSink};
use crate::meeting::{
    validate_cancel_reason, CancelMeeting, Meeting, MeetingDecision, MeetingState, NewMeeting,
};
use crate::repository::MeetingRepository;
use crate::types::{Actor, MeetingId, UserId};

/// A cancelled meeting and the record explaining why.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingCancellation {
    pub meeting: Meeting,
    pub cancellation: CancelMeeting,
}

#[derive(Clone)]
pub struct MeetingService {
    meetings: Arc<dyn MeetingRepository>,
    sink: Arc<dyn NotificationSink>,
}

impl MeetingService {
    pub fn new(meetings: Arc<dyn MeetingRepository>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { meetings, sink }
    }

    pub async fn propose_meeting(&self, input: &NewMeeting) -> CoreResult<Meeting> {
        input.validate()?;
        let meeting = self.meetings.create(input).await?;

        tracing::info!(
            meeting_id = meeting.id,
            sender_id = meeting.sender_id,
            receiver_id = meeting.receiver_id,
            "Meeting proposed",
        );
        self.sink.notify(
            LifecycleEvent::new(
                event_types::MEETING_PROPOSED,
                entity_types::MEETING,
                meeting.id,
                meeting.sender_id,
            )
            .notify(meeting.receiver_id)
            .with_payload(json!({ "meeting_time": meeting.meeting_time })),
        );
        Ok(meeting)
    }

    pub async fn get_meeting(&self, id: MeetingId, actor: Actor) -> CoreResult<Meeting> {
        let meeting = self.load(id).await?;
        if !actor.is_admin && !meeting.is_party(actor.user_id) {
            return Err(CoreError::Forbidden(format!(
                "User {} is not a party to meeting {id}",
                actor.user_id
            )));
        }
        Ok(meeting)
    }

    pub async fn list_meetings(&self, user_id: UserId) -> CoreResult<Vec<Meeting>> {
        self.meetings.list_for_user(user_id).await
    }

    /// The receiver accepts or rejects a pending meeting.
    pub async fn respond_meeting(
        &self,
        id: MeetingId,
        by: UserId,
        decision: MeetingDecision,
    ) -> CoreResult<Meeting> {
        let meeting = self.load(id).await?;
        if by != meeting.receiver_id {
            return Err(CoreError::Forbidden(format!(
                "Only the receiver may respond to meeting {id}"
            )));
        }
        if meeting.state != MeetingState::Pending {
            return Err(CoreError::Conflict(format!(
                "Meeting {id} is already {}",
                meeting.state
            )));
        }

        let target = decision.target_state();
        let updated = self
            .meetings
            .transition(id, MeetingState::Pending, target)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!("Meeting {id} was answered by another request"))
            })?;

        let event_type = match decision {
            MeetingDecision::Accept => event_types::MEETING_ACCEPTED,
            MeetingDecision::Reject => event_types::MEETING_REJECTED,
        };
        tracing::info!(meeting_id = id, user_id = by, state = %target, "Meeting answered");
        self.sink.notify(
            LifecycleEvent::new(event_type, entity_types::MEETING, id, by)
                .notify(updated.sender_id),
        );
        Ok(updated)
    }

    /// Cancel a meeting and record the reason.
    ///
    /// The sender may withdraw a pending meeting; either party may cancel an
    /// accepted one.
    pub async fn cancel_meeting(
        &self,
        id: MeetingId,
        by: UserId,
        reason: &str,
    ) -> CoreResult<MeetingCancellation> {
        validate_cancel_reason(reason)?;
        let meeting = self.load(id).await?;
        if !meeting.is_party(by) {
            return Err(CoreError::Forbidden(format!(
                "User {by} is not a party to meeting {id}"
            )));
        }

        match meeting.state {
            MeetingState::Accepted => {}
            MeetingState::Pending if by == meeting.sender_id => {}
            MeetingState::Pending => {
                return Err(CoreError::Forbidden(
                    "The receiver of a pending meeting should reject it instead".into(),
                ))
            }
            other => {
                return Err(CoreError::Conflict(format!(
                    "Meeting {id} cannot be cancelled while {other}"
                )))
            }
        }

        let (meeting, cancellation) = self
            .meetings
            .cancel(id, meeting.state, by, reason.trim())
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!("Meeting {id} changed state during cancellation"))
            })?;

        let other_party = if by == meeting.sender_id {
            meeting.receiver_id
        } else {
            meeting.sender_id
        };
        tracing::info!(meeting_id = id, cancelled_by = by, "Meeting cancelled");
        self.sink.notify(
            LifecycleEvent::new(event_types::MEETING_CANCELLED, entity_types::MEETING, id, by)
                .notify(other_party)
                .with_payload(json!({ "reason": cancellation.reason })),
        );
        Ok(MeetingCancellation {
            meeting,
            cancellation,
        })
    }

    /// The other party acknowledges a cancellation. Acknowledging twice
    /// returns the existing record.
    pub async fn acknowledge_cancellation(
        &self,
        meeting_id: MeetingId,
        by: UserId,
    ) -> CoreResult<CancelMeeting> {
        let meeting = self.load(meeting_id).await?;
        if !meeting.is_party(by) {
            return Err(CoreError::Forbidden(format!(
                "User {by} is not a party to meeting {meeting_id}"
            )));
        }

        let record = self
            .meetings
            .find_cancellation(meeting_id)
            .await?
            .ok_or(CoreError::not_found("CancelMeeting", meeting_id))?;
        if record.acknowledged {
            return Ok(record);
        }
        if record.cancelled_by == by {
            return Err(CoreError::Forbidden(
                "A cancellation is acknowledged by the other party".into(),
            ));
        }

        match self
            .meetings
            .acknowledge_cancellation(meeting_id, by)
            .await?
        {
            Some(acknowledged) => {
                tracing::info!(meeting_id, acknowledged_by = by, "Meeting cancellation acknowledged");
                self.sink.notify(
                    LifecycleEvent::new(
                        event_types::MEETING_CANCELLATION_ACKNOWLEDGED,
                        entity_types::MEETING,
                        meeting_id,
                        by,
                    )
                    .notify(acknowledged.cancelled_by),
                );
                Ok(acknowledged)
            }
            None => self
                .meetings
                .find_cancellation(meeting_id)
                .await?
                .ok_or(CoreError::not_found("CancelMeeting", meeting_id)),
        }
    }

    /// Mark an accepted meeting whose time has passed as completed.
    pub async fn complete_meeting(&self, id: MeetingId, by: UserId) -> CoreResult<Meeting> {
        let meeting = self.load(id).await?;
        if !meeting.is_party(by) {
            return Err(CoreError::Forbidden(format!(
                "User {by} is not a party to meeting {id}"
            )));
        }
        if meeting.state != MeetingState::Accepted {
            return Err(CoreError::Conflict(format!(
                "Only accepted meetings can be completed (meeting {id} is {})",
                meeting.state
            )));
        }
        if meeting.meeting_time > Utc::now() {
            return Err(CoreError::Conflict(format!(
                "Meeting {id} has not taken place yet"
            )));
        }

        let completed = self
            .meetings
            .transition(id, MeetingState::Accepted, MeetingState::Completed)
            .await?
            .ok_or_else(|| CoreError::Conflict(format!("Meeting {id} changed state")))?;

        tracing::info!(meeting_id = id, user_id = by, "Meeting completed");
        self.sink.notify(
            LifecycleEvent::new(event_types::MEETING_COMPLETED, entity_types::MEETING, id, by)
                .notify(completed.sender_id)
                .notify(completed.receiver_id),
        );
        Ok(completed)
    }

    async fn load(&self, id: MeetingId) -> CoreResult<Meeting> {
        self.meetings
            .find_by_id(id)
            .await?
            .ok_or(CoreError::not_found("Meeting", id))
    }
}
