//! Meeting rows (`meetings`) and cancellation records (`cancel_meetings`).

use skillswap_core::error::CoreError;
use skillswap_core::meeting::{CancelMeeting, Meeting, MeetingState};
use skillswap_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::corrupt_column;

/// A row from the `meetings` table.
#[derive(Debug, Clone, FromRow)]
pub struct MeetingRow {
    pub id: DbId,
    pub sender_id: DbId,
    pub receiver_id: DbId,
    pub description: String,
    pub meeting_time: Timestamp,
    pub meeting_link: Option<String>,
    pub state: String,
    pub accept_status: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<MeetingRow> for Meeting {
    type Error = CoreError;

    fn try_from(row: MeetingRow) -> Result<Self, Self::Error> {
        Ok(Meeting {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            description: row.description,
            meeting_time: row.meeting_time,
            meeting_link: row.meeting_link,
            state: MeetingState::parse(&row.state)
                .map_err(|e| corrupt_column("meetings", "state", e))?,
            accept_status: row.accept_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `cancel_meetings` table.
#[derive(Debug, Clone, FromRow)]
pub struct CancelMeetingRow {
    pub id: DbId,
    pub meeting_id: DbId,
    pub cancelled_by: DbId,
    pub reason: String,
    pub acknowledged: bool,
    pub acknowledged_by: Option<DbId>,
    pub acknowledged_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<CancelMeetingRow> for CancelMeeting {
    fn from(row: CancelMeetingRow) -> Self {
        CancelMeeting {
            id: row.id,
            meeting_id: row.meeting_id,
            cancelled_by: row.cancelled_by,
            reason: row.reason,
            acknowledged: row.acknowledged,
            acknowledged_by: row.acknowledged_by,
            acknowledged_at: row.acknowledged_at,
            created_at: row.created_at,
        }
    }
}
