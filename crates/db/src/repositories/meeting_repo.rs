//! Repository for the `meetings` and `cancel_meetings` tables.

use async_trait::async_trait;
use skillswap_core::error::CoreResult;
use skillswap_core::meeting::{
    validate_transition, CancelMeeting, Meeting, MeetingState, NewMeeting,
};
use skillswap_core::repository::MeetingRepository;
use skillswap_core::types::{MeetingId, UserId};

use crate::map_db_error;
use crate::models::meeting::{CancelMeetingRow, MeetingRow};
use crate::DbPool;

/// Column list for `meetings` queries.
const COLUMNS: &str = "\
    id, sender_id, receiver_id, description, meeting_time, meeting_link, \
    state, accept_status, created_at, updated_at";

/// Column list for `cancel_meetings` queries.
const CANCEL_COLUMNS: &str = "\
    id, meeting_id, cancelled_by, reason, acknowledged, acknowledged_by, \
    acknowledged_at, created_at";

pub struct PgMeetingRepo {
    pool: DbPool,
}

impl PgMeetingRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MeetingRepository for PgMeetingRepo {
    async fn create(&self, input: &NewMeeting) -> CoreResult<Meeting> {
        let query = format!(
            "INSERT INTO meetings \
                (sender_id, receiver_id, description, meeting_time, meeting_link) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, MeetingRow>(&query)
            .bind(input.sender_id)
            .bind(input.receiver_id)
            .bind(input.description.trim())
            .bind(input.meeting_time)
            .bind(input.meeting_link.as_deref().map(str::trim))
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Meeting::try_from(row)
    }

    async fn find_by_id(&self, id: MeetingId) -> CoreResult<Option<Meeting>> {
        let query = format!("SELECT {COLUMNS} FROM meetings WHERE id = $1");
        sqlx::query_as::<_, MeetingRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(Meeting::try_from)
            .transpose()
    }

    async fn list_for_user(&self, user_id: UserId) -> CoreResult<Vec<Meeting>> {
        let query = format!(
            "SELECT {COLUMNS} FROM meetings \
             WHERE sender_id = $1 OR receiver_id = $1 \
             ORDER BY meeting_time"
        );
        sqlx::query_as::<_, MeetingRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(Meeting::try_from)
            .collect()
    }

    async fn transition(
        &self,
        id: MeetingId,
        from: MeetingState,
        to: MeetingState,
    ) -> CoreResult<Option<Meeting>> {
        validate_transition(from, to)?;
        let query = format!(
            "UPDATE meetings SET \
                state = $3, \
                accept_status = accept_status OR $3::text = 'accepted', \
                updated_at = NOW() \
             WHERE id = $1 AND state = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MeetingRow>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(Meeting::try_from)
            .transpose()
    }

    /// State change and cancellation record commit together or not at all.
    async fn cancel(
        &self,
        id: MeetingId,
        from: MeetingState,
        cancelled_by: UserId,
        reason: &str,
    ) -> CoreResult<Option<(Meeting, CancelMeeting)>> {
        validate_transition(from, MeetingState::Cancelled)?;
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let query = format!(
            "UPDATE meetings SET state = 'cancelled', updated_at = NOW() \
             WHERE id = $1 AND state = $2 \
             RETURNING {COLUMNS}"
        );
        let Some(meeting) = sqlx::query_as::<_, MeetingRow>(&query)
            .bind(id)
            .bind(from.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
        else {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO cancel_meetings (meeting_id, cancelled_by, reason) \
             VALUES ($1, $2, $3) \
             RETURNING {CANCEL_COLUMNS}"
        );
        let record = sqlx::query_as::<_, CancelMeetingRow>(&query)
            .bind(id)
            .bind(cancelled_by)
            .bind(reason)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(Some((Meeting::try_from(meeting)?, CancelMeeting::from(record))))
    }

    async fn find_cancellation(&self, meeting_id: MeetingId) -> CoreResult<Option<CancelMeeting>> {
        let query = format!("SELECT {CANCEL_COLUMNS} FROM cancel_meetings WHERE meeting_id = $1");
        let row = sqlx::query_as::<_, CancelMeetingRow>(&query)
            .bind(meeting_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(CancelMeeting::from))
    }

    async fn acknowledge_cancellation(
        &self,
        meeting_id: MeetingId,
        acknowledged_by: UserId,
    ) -> CoreResult<Option<CancelMeeting>> {
        let query = format!(
            "UPDATE cancel_meetings SET \
                acknowledged = TRUE, acknowledged_by = $2, acknowledged_at = NOW() \
             WHERE meeting_id = $1 AND NOT acknowledged \
             RETURNING {CANCEL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CancelMeetingRow>(&query)
            .bind(meeting_id)
            .bind(acknowledged_by)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(CancelMeeting::from))
    }
}
