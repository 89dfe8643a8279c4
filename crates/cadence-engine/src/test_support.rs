//! Scripted collaborators for engine tests

use crate::session::{Services, Session, SessionSettings};
use async_trait::async_trait;
use cadence_core::config::CadenceConfig;
use cadence_core::{
    Ack, CadenceError, ChatTransport, Clock, ContentGenerator, Credential, CredentialProvider,
    ModelInfo, MonotonicClock, NetworkErrorKind, NullSink, PointsService, PointsSnapshot,
    QuotaService, QuotaSnapshot, Result, RunState, StatusLevel, StatusSink, ThreadId, UserInfo,
};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) fn refused() -> CadenceError {
    CadenceError::network(
        NetworkErrorKind::ConnectionRefused,
        "connect ECONNREFUSED 127.0.0.1:443",
    )
}

pub(crate) fn timeout() -> CadenceError {
    CadenceError::network(NetworkErrorKind::Timeout, "request timed out")
}

fn pop(script: &Mutex<VecDeque<CadenceError>>) -> Option<CadenceError> {
    script.lock().unwrap().pop_front()
}

#[derive(Default)]
pub(crate) struct FakeCredentials {
    logins: AtomicU32,
    user_fetches: AtomicU32,
    cached_user: Mutex<Option<UserInfo>>,
    login_errors: Mutex<VecDeque<CadenceError>>,
}

impl FakeCredentials {
    pub fn fail_logins(&self, errors: impl IntoIterator<Item = CadenceError>) {
        self.login_errors.lock().unwrap().extend(errors);
    }

    pub fn logins(&self) -> u32 {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn user_fetches(&self) -> u32 {
        self.user_fetches.load(Ordering::SeqCst)
    }

    pub fn clear_cache(&self) {
        *self.cached_user.lock().unwrap() = None;
    }
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    async fn login(&self) -> Result<Credential> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        match pop(&self.login_errors) {
            Some(err) => Err(err),
            None => Ok(Credential::new("test-token")),
        }
    }

    async fn current_user(&self, use_cache: bool) -> Result<UserInfo> {
        if use_cache {
            if let Some(user) = self.cached_user.lock().unwrap().clone() {
                return Ok(user);
            }
        }
        self.user_fetches.fetch_add(1, Ordering::SeqCst);
        let user = UserInfo {
            id: "u-1".to_string(),
            username: "tester".to_string(),
            referral_code: None,
            created_at: None,
        };
        *self.cached_user.lock().unwrap() = Some(user.clone());
        Ok(user)
    }
}

#[derive(Default)]
pub(crate) struct FakeChat {
    attempts: AtomicU32,
    delivered: AtomicU32,
    threads: AtomicU32,
    send_errors: Mutex<VecDeque<CadenceError>>,
}

impl FakeChat {
    pub fn fail_sends(&self, errors: impl IntoIterator<Item = CadenceError>) {
        self.send_errors.lock().unwrap().extend(errors);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> u32 {
        self.delivered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for FakeChat {
    async fn create_thread(&self) -> Result<ThreadId> {
        let n = self.threads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ThreadId(format!("t-{}", n)))
    }

    async fn send_message(&self, thread: &ThreadId, text: &str) -> Result<Ack> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = pop(&self.send_errors) {
            return Err(err);
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(Ack {
            thread_id: thread.clone(),
            message_id: None,
            reply_chars: text.len(),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "m-1".to_string(),
            name: "Default".to_string(),
            is_default: true,
        }])
    }
}

pub(crate) struct FixedGenerator;

#[async_trait]
impl ContentGenerator for FixedGenerator {
    async fn generate_message(&self) -> Result<String> {
        Ok("hello".to_string())
    }
}

/// Quota that follows the test clock
pub(crate) struct FakeQuota {
    clock: Arc<MonotonicClock>,
    exhausted_until: Mutex<Option<DateTime<Utc>>>,
    stale_reset: AtomicBool,
    errors: Mutex<VecDeque<CadenceError>>,
    calls: AtomicU32,
    probes: AtomicU32,
}

impl FakeQuota {
    fn new(clock: Arc<MonotonicClock>) -> Self {
        Self {
            clock,
            exhausted_until: Mutex::new(None),
            stale_reset: AtomicBool::new(false),
            errors: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
            probes: AtomicU32::new(0),
        }
    }

    /// Report zero remaining for the next `secs` seconds
    pub fn exhaust_for(&self, secs: i64) {
        let until = self.clock.now() + chrono::Duration::seconds(secs);
        *self.exhausted_until.lock().unwrap() = Some(until);
    }

    /// Report a reset time that has already passed while exhausted
    pub fn report_stale_reset(&self) {
        self.stale_reset.store(true, Ordering::SeqCst);
    }

    pub fn end_exhaustion(&self) {
        *self.exhausted_until.lock().unwrap() = None;
    }

    pub fn fail_quota(&self, errors: impl IntoIterator<Item = CadenceError>) {
        self.errors.lock().unwrap().extend(errors);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    fn exhausted_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (*self.exhausted_until.lock().unwrap()).filter(|until| now < *until)
    }
}

#[async_trait]
impl QuotaService for FakeQuota {
    async fn get_quota(&self) -> Result<QuotaSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = pop(&self.errors) {
            return Err(err);
        }

        let now = self.clock.now();
        Ok(match self.exhausted_until(now) {
            Some(until) => QuotaSnapshot {
                limit: 100,
                remaining: 0,
                reset_time: if self.stale_reset.load(Ordering::SeqCst) {
                    now - chrono::Duration::seconds(5)
                } else {
                    until
                },
                current_usage: 100,
            },
            None => QuotaSnapshot {
                limit: 100,
                remaining: 50,
                reset_time: now + chrono::Duration::hours(1),
                current_usage: 50,
            },
        })
    }

    async fn is_cooldown_active(&self) -> Result<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.exhausted_until(self.clock.now()).is_some())
    }
}

pub(crate) struct FakePoints;

#[async_trait]
impl PointsService for FakePoints {
    async fn get_points(&self) -> Result<PointsSnapshot> {
        Ok(PointsSnapshot {
            total: 10,
            inference: 10,
            referral: 0,
        })
    }
}

/// Status sink that remembers everything it is told
#[derive(Default)]
pub(crate) struct RecordingSink {
    statuses: Mutex<Vec<(String, StatusLevel)>>,
    states: Mutex<Vec<RunState>>,
    countdowns: Mutex<Vec<Option<DateTime<Utc>>>>,
    models: AtomicU32,
}

impl RecordingSink {
    pub fn has_status(&self, needle: &str) -> bool {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .any(|(text, _)| text.contains(needle))
    }

    pub fn saw_state(&self, state: RunState) -> bool {
        self.states.lock().unwrap().contains(&state)
    }

    pub fn countdown_shown(&self) -> bool {
        self.countdowns.lock().unwrap().iter().any(Option::is_some)
    }

    pub fn models_shown(&self) -> u32 {
        self.models.load(Ordering::SeqCst)
    }
}

impl StatusSink for RecordingSink {
    fn set_status(&self, text: &str, level: StatusLevel) {
        self.statuses.lock().unwrap().push((text.to_string(), level));
    }

    fn set_run_state(&self, state: RunState) {
        self.states.lock().unwrap().push(state);
    }

    fn show_cooldown_countdown(&self, reset_time: Option<DateTime<Utc>>) {
        self.countdowns.lock().unwrap().push(reset_time);
    }

    fn update_model(&self, _model: &ModelInfo) {
        self.models.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct Fakes {
    pub credentials: Arc<FakeCredentials>,
    pub chat: Arc<FakeChat>,
    pub quota: Arc<FakeQuota>,
    pub status: Arc<RecordingSink>,
    pub clock: Arc<MonotonicClock>,
}

impl Fakes {
    pub fn new() -> Self {
        let clock = Arc::new(MonotonicClock::new());
        Self {
            credentials: Arc::new(FakeCredentials::default()),
            chat: Arc::new(FakeChat::default()),
            quota: Arc::new(FakeQuota::new(clock.clone())),
            status: Arc::new(RecordingSink::default()),
            clock,
        }
    }

    /// Session with a fixed 3s inter-cycle delay
    pub fn session(&self) -> Session {
        let mut config = CadenceConfig::default();
        config.schedule.min_delay_ms = 3000;
        config.schedule.max_delay_ms = 3000;
        self.session_with(SessionSettings::from_config(&config))
    }

    pub fn session_with(&self, settings: SessionSettings) -> Session {
        let services = Services {
            credentials: self.credentials.clone(),
            chat: self.chat.clone(),
            generator: Arc::new(FixedGenerator),
            quota: self.quota.clone(),
            points: Arc::new(FakePoints),
            status: self.status.clone(),
            diagnostics: Arc::new(NullSink),
            clock: self.clock.clone(),
        };
        Session::new(services, settings)
    }
}
