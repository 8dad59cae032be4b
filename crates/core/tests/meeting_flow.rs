//! Meeting proposal, response, cancellation, and completion.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};

use common::{admin, harness, Harness, ALICE, BOB, CAROL};
use skillswap_core::error::CoreError;
use skillswap_core::events::event_types;
use skillswap_core::meeting::{Meeting, MeetingDecision, MeetingState, NewMeeting};
use skillswap_core::repository::MeetingRepository;
use skillswap_core::types::Actor;

fn new_meeting(hours_from_now: i64) -> NewMeeting {
    NewMeeting {
        sender_id: ALICE,
        receiver_id: BOB,
        description: "Kick-off call to plan the lessons".to_string(),
        meeting_time: Utc::now() + Duration::hours(hours_from_now),
        meeting_link: Some("https://meet.example.com/abc".to_string()),
    }
}

async fn accepted_meeting(h: &Harness, hours_from_now: i64) -> Meeting {
    let meeting = h
        .services
        .meetings
        .propose_meeting(&new_meeting(hours_from_now))
        .await
        .unwrap();
    h.services
        .meetings
        .respond_meeting(meeting.id, BOB, MeetingDecision::Accept)
        .await
        .unwrap()
}

#[tokio::test]
async fn receiver_accepts_meeting() {
    let h = harness();
    let meeting = accepted_meeting(&h, 24).await;
    assert_eq!(meeting.state, MeetingState::Accepted);
    assert!(meeting.accept_status);
    assert_eq!(
        h.sink.event_types(),
        vec![event_types::MEETING_PROPOSED, event_types::MEETING_ACCEPTED]
    );
}

#[tokio::test]
async fn sender_cannot_respond_to_own_meeting() {
    let h = harness();
    let meeting = h
        .services
        .meetings
        .propose_meeting(&new_meeting(24))
        .await
        .unwrap();
    assert_matches!(
        h.services
            .meetings
            .respond_meeting(meeting.id, ALICE, MeetingDecision::Accept)
            .await,
        Err(CoreError::Forbidden(_))
    );
}

#[tokio::test]
async fn rejected_meeting_is_terminal() {
    let h = harness();
    let meeting = h
        .services
        .meetings
        .propose_meeting(&new_meeting(24))
        .await
        .unwrap();
    let rejected = h
        .services
        .meetings
        .respond_meeting(meeting.id, BOB, MeetingDecision::Reject)
        .await
        .unwrap();
    assert_eq!(rejected.state, MeetingState::Rejected);

    assert_matches!(
        h.services
            .meetings
            .respond_meeting(meeting.id, BOB, MeetingDecision::Accept)
            .await,
        Err(CoreError::Conflict(_))
    );
    assert_matches!(
        h.services
            .meetings
            .cancel_meeting(meeting.id, ALICE, "No longer needed")
            .await,
        Err(CoreError::Conflict(_))
    );
}

#[tokio::test]
async fn sender_withdraws_pending_meeting() {
    let h = harness();
    let meeting = h
        .services
        .meetings
        .propose_meeting(&new_meeting(24))
        .await
        .unwrap();

    assert_matches!(
        h.services
            .meetings
            .cancel_meeting(meeting.id, BOB, "Not interested")
            .await,
        Err(CoreError::Forbidden(_))
    );

    let cancelled = h
        .services
        .meetings
        .cancel_meeting(meeting.id, ALICE, "Found another time")
        .await
        .unwrap();
    assert_eq!(cancelled.meeting.state, MeetingState::Cancelled);
    assert_eq!(cancelled.cancellation.cancelled_by, ALICE);
    assert!(!cancelled.cancellation.acknowledged);
}

#[tokio::test]
async fn cancellation_requires_reason() {
    let h = harness();
    let meeting = accepted_meeting(&h, 24).await;
    assert_matches!(
        h.services.meetings.cancel_meeting(meeting.id, BOB, "  ").await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn other_party_acknowledges_cancellation_once() {
    let h = harness();
    let meeting = accepted_meeting(&h, 24).await;
    h.services
        .meetings
        .cancel_meeting(meeting.id, BOB, "Feeling unwell")
        .await
        .unwrap();

    assert_matches!(
        h.services
            .meetings
            .acknowledge_cancellation(meeting.id, BOB)
            .await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.services
            .meetings
            .acknowledge_cancellation(meeting.id, CAROL)
            .await,
        Err(CoreError::Forbidden(_))
    );

    let ack = h
        .services
        .meetings
        .acknowledge_cancellation(meeting.id, ALICE)
        .await
        .unwrap();
    assert!(ack.acknowledged);
    assert_eq!(ack.acknowledged_by, Some(ALICE));

    let again = h
        .services
        .meetings
        .acknowledge_cancellation(meeting.id, ALICE)
        .await
        .unwrap();
    assert_eq!(again, ack);

    // Once acknowledged, the canceller sees the same record instead of an error.
    let seen_by_canceller = h
        .services
        .meetings
        .acknowledge_cancellation(meeting.id, BOB)
        .await
        .unwrap();
    assert_eq!(seen_by_canceller, ack);

    let acks = h
        .sink
        .event_types()
        .into_iter()
        .filter(|t| *t == event_types::MEETING_CANCELLATION_ACKNOWLEDGED)
        .count();
    assert_eq!(acks, 1);
}

#[tokio::test]
async fn acknowledging_uncancelled_meeting_is_not_found() {
    let h = harness();
    let meeting = accepted_meeting(&h, 24).await;
    assert_matches!(
        h.services
            .meetings
            .acknowledge_cancellation(meeting.id, ALICE)
            .await,
        Err(CoreError::NotFound { entity: "CancelMeeting", .. })
    );
}

#[tokio::test]
async fn past_accepted_meeting_can_be_completed() {
    let h = harness();
    let meeting = accepted_meeting(&h, -2).await;
    let completed = h
        .services
        .meetings
        .complete_meeting(meeting.id, ALICE)
        .await
        .unwrap();
    assert_eq!(completed.state, MeetingState::Completed);
}

#[tokio::test]
async fn future_meeting_cannot_be_completed() {
    let h = harness();
    let meeting = accepted_meeting(&h, 24).await;
    assert_matches!(
        h.services.meetings.complete_meeting(meeting.id, ALICE).await,
        Err(CoreError::Conflict(_))
    );
}

#[tokio::test]
async fn meetings_visible_to_parties_and_admins() {
    let h = harness();
    let meeting = accepted_meeting(&h, 24).await;
    assert!(h
        .services
        .meetings
        .get_meeting(meeting.id, Actor::user(BOB))
        .await
        .is_ok());
    assert!(h.services.meetings.get_meeting(meeting.id, admin()).await.is_ok());
    assert_matches!(
        h.services
            .meetings
            .get_meeting(meeting.id, Actor::user(CAROL))
            .await,
        Err(CoreError::Forbidden(_))
    );

    assert_eq!(h.services.meetings.list_meetings(ALICE).await.unwrap().len(), 1);
    assert!(h.services.meetings.list_meetings(CAROL).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_http_link_is_rejected() {
    let h = harness();
    let mut input = new_meeting(24);
    input.meeting_link = Some("ftp://example.com/room".to_string());
    assert_matches!(
        h.services.meetings.propose_meeting(&input).await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn store_refuses_meeting_moves_outside_the_table() {
    let h = harness();
    let meeting = h
        .services
        .meetings
        .propose_meeting(&new_meeting(24))
        .await
        .unwrap();

    assert_matches!(
        MeetingRepository::transition(
            h.store.as_ref(),
            meeting.id,
            MeetingState::Pending,
            MeetingState::Completed,
        )
        .await,
        Err(CoreError::Conflict(_))
    );
    assert_matches!(
        MeetingRepository::cancel(
            h.store.as_ref(),
            meeting.id,
            MeetingState::Rejected,
            ALICE,
            "Never happening",
        )
        .await,
        Err(CoreError::Conflict(_))
    );

    let stored = MeetingRepository::find_by_id(h.store.as_ref(), meeting.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, MeetingState::Pending);
}
