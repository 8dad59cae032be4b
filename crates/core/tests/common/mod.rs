//! Shared fixtures for the lifecycle service tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};

use skillswap_core::memory::{InMemoryStore, RecordingSink};
use skillswap_core::services::Services;
use skillswap_core::session::{NewSession, Session};
use skillswap_core::types::{Actor, UserId};

pub const ALICE: UserId = 1;
pub const BOB: UserId = 2;
pub const CAROL: UserId = 3;
pub const ADMIN: UserId = 99;

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub sink: Arc<RecordingSink>,
    pub services: Services,
}

pub fn harness() -> Harness {
    let store = InMemoryStore::new();
    let sink = RecordingSink::new();
    let services = Services::new(store.repositories(), sink.clone());
    Harness {
        store,
        sink,
        services,
    }
}

pub fn admin() -> Actor {
    Actor::admin(ADMIN)
}

pub fn new_session(user1_id: UserId, user2_id: UserId) -> NewSession {
    NewSession {
        user1_id,
        skill1_id: 10,
        description_of_service1: "Guitar lessons, one hour weekly".to_string(),
        user2_id,
        skill2_id: 20,
        description_of_service2: "Conversational Spanish practice".to_string(),
        start_date: Utc::now() + Duration::days(1),
        expected_end_date: Some(Utc::now() + Duration::days(30)),
    }
}

impl Harness {
    /// Propose a session from `user1` to `user2` and have `user2` accept it.
    pub async fn active_session(&self, user1_id: UserId, user2_id: UserId) -> Session {
        let session = self
            .services
            .sessions
            .propose_session(&new_session(user1_id, user2_id))
            .await
            .unwrap();
        self.services
            .sessions
            .accept_session(session.id, user2_id)
            .await
            .unwrap()
    }
}
