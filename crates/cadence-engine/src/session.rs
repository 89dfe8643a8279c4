//! Session: control operations and shared state of one automation run
//!
//! `start`, `pause`, `resume` and `stop` feed events into the pure state
//! machine and carry out the returned actions. The orchestration loop lives
//! in `loop_engine`. At most one loop runs per session: the `loop_active`
//! flag is set and cleared under the same lock that guards the run state.

use crate::circuit_breaker::CircuitBreaker;
use crate::cooldown::CooldownCoordinator;
use crate::retry::RetryPolicy;
use crate::state_machine::{transition, Action, Event};
use cadence_core::config::{BreakerConfig, CadenceConfig, ScheduleConfig};
use cadence_core::{
    ChatTransport, Clock, ContentGenerator, CredentialProvider, DiagnosticSink, PointsService,
    QuotaService, Result, RunState, StatusLevel, StatusSink, UserInfo,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Collaborators the session drives
#[derive(Clone)]
pub struct Services {
    pub credentials: Arc<dyn CredentialProvider>,
    pub chat: Arc<dyn ChatTransport>,
    pub generator: Arc<dyn ContentGenerator>,
    pub quota: Arc<dyn QuotaService>,
    pub points: Arc<dyn PointsService>,
    pub status: Arc<dyn StatusSink>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
    pub clock: Arc<dyn Clock>,
}

/// Timing and escalation settings resolved from config
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub retry: RetryPolicy,
    pub breaker: BreakerConfig,
    pub schedule: ScheduleConfig,
}

impl SessionSettings {
    pub fn from_config(config: &CadenceConfig) -> Self {
        Self {
            retry: RetryPolicy::from_config(&config.retry),
            breaker: config.breaker.clone(),
            schedule: config.schedule.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&CadenceConfig::default())
    }
}

/// Running totals for the current process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub cycles: u64,
    pub messages_sent: u64,
    pub send_failures: u64,
    pub loop_errors: u64,
    pub reauths: u64,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub run_state: RunState,
    pub consecutive_failures: u32,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub loop_active: bool,
    pub stats: SessionStats,
}

pub(crate) struct SessionState {
    pub(crate) run_state: RunState,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) cooldown: CooldownCoordinator,
    pub(crate) loop_active: bool,
    pub(crate) starting: bool,
    pub(crate) start_generation: u64,
    pub(crate) stats: SessionStats,
}

pub(crate) struct SessionInner {
    pub(crate) id: String,
    pub(crate) services: Services,
    pub(crate) settings: SessionSettings,
    pub(crate) state: Mutex<SessionState>,
}

/// Handle to one automation session. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(services: Services, settings: SessionSettings) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), services, settings)
    }

    /// Create a session under a caller-chosen id, so sinks built before the
    /// session can carry it
    pub fn with_id(id: String, services: Services, settings: SessionSettings) -> Self {
        let state = SessionState {
            run_state: RunState::Stopped,
            breaker: CircuitBreaker::from_config(&settings.breaker),
            cooldown: CooldownCoordinator::with_stale_wait(settings.schedule.cooldown_recheck()),
            loop_active: false,
            starting: false,
            start_generation: 0,
            stats: SessionStats::default(),
        };

        Self {
            inner: Arc::new(SessionInner {
                id,
                services,
                settings,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().await
    }

    pub async fn run_state(&self) -> RunState {
        self.lock().await.run_state
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let st = self.lock().await;
        SessionSnapshot {
            run_state: st.run_state,
            consecutive_failures: st.breaker.failure_count(),
            cooldown_until: st.cooldown.reset_time(),
            loop_active: st.loop_active,
            stats: st.stats,
        }
    }

    /// Current user; `use_cache` lets the credential provider answer from
    /// its own cache
    pub async fn user(&self, use_cache: bool) -> Result<UserInfo> {
        self.inner.services.credentials.current_user(use_cache).await
    }

    /// Log in, fetch the initial snapshots and start the loop
    ///
    /// A no-op with a warning unless the session is stopped. A transient
    /// failure schedules one automatic restart.
    pub async fn start(&self) -> Result<()> {
        {
            let mut st = self.lock().await;
            if st.starting {
                drop(st);
                self.perform(vec![Action::Warn {
                    message: "Start ignored: already starting".to_string(),
                }]);
                return Ok(());
            }

            let (_, actions) = transition(st.run_state, Event::StartRequested);
            if !actions.contains(&Action::Bootstrap) {
                drop(st);
                self.perform(actions);
                return Ok(());
            }

            st.starting = true;
            st.start_generation += 1;
        }

        info!("Starting session {}", self.id());
        self.inner
            .services
            .status
            .set_status("Starting...", StatusLevel::Info);

        match self.bootstrap().await {
            Ok(()) => {
                self.apply(Event::StartSucceeded).await;
                Ok(())
            }
            Err(e) => {
                error!("Start failed: {}", e);
                self.apply(Event::StartFailed {
                    error: e.to_string(),
                    transient: e.is_transient(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn bootstrap(&self) -> Result<()> {
        let services = &self.inner.services;
        let retry = &self.inner.settings.retry;

        services.status.set_status("Logging in...", StatusLevel::Info);
        retry
            .execute("login", || services.credentials.login())
            .await?;

        let user = retry
            .execute("current_user", || services.credentials.current_user(false))
            .await?;
        services.status.update_user(&user);

        let points = retry
            .execute("get_points", || services.points.get_points())
            .await?;
        services.status.update_points(&points);

        let quota = retry
            .execute("get_quota", || services.quota.get_quota())
            .await?;
        services.status.update_quota(&quota);

        let models = retry
            .execute("list_models", || services.chat.list_models())
            .await?;
        match models.iter().find(|m| m.is_default).or_else(|| models.first()) {
            Some(model) => services.status.update_model(model),
            None => warn!("Service reported no models"),
        }

        info!(
            "Logged in as {} ({} points, {}/{} quota left)",
            user.username, points.total, quota.remaining, quota.limit
        );
        services.diagnostics.record(
            "Logged in",
            Some(serde_json::json!({
                "user": user.username,
                "points": points.total,
                "quota_remaining": quota.remaining,
            })),
        );

        services.status.render();
        Ok(())
    }

    /// Pause after the current cycle
    pub async fn pause(&self) -> RunState {
        self.apply(Event::PauseRequested).await
    }

    /// Resume a paused session
    ///
    /// Rejected while a quota cooldown is active, whatever the run state.
    pub async fn resume(&self) -> RunState {
        let mut expired = false;
        let state = self
            .apply_with(|st, now| {
                expired = st.cooldown.expire(now);
                Event::ResumeRequested {
                    cooldown_active: st.cooldown.is_active(),
                }
            })
            .await;

        if expired {
            self.inner.services.status.show_cooldown_countdown(None);
        }
        state
    }

    /// Stop the session; the loop exits at its next check
    pub async fn stop(&self) -> RunState {
        self.apply(Event::StopRequested).await
    }

    pub(crate) async fn apply(&self, event: Event) -> RunState {
        self.apply_with(|_, _| event).await
    }

    /// Build an event under the state lock, transition, then act
    pub(crate) async fn apply_with<F>(&self, make_event: F) -> RunState
    where
        F: FnOnce(&mut SessionState, DateTime<Utc>) -> Event + Send,
    {
        let now = self.inner.services.clock.now();

        let (previous, next, actions, spawn_loop, restart_generation) = {
            let mut st = self.lock().await;
            let event = make_event(&mut *st, now);
            if matches!(event, Event::StartSucceeded | Event::StartFailed { .. }) {
                st.starting = false;
            }

            let previous = st.run_state;
            let (next, actions) = transition(previous, event);
            st.run_state = next;

            let mut spawn_loop = false;
            let mut restart_generation = None;
            for action in &actions {
                match action {
                    Action::SpawnLoop if !st.loop_active => {
                        st.loop_active = true;
                        spawn_loop = true;
                    }
                    Action::ScheduleAutoRestart => restart_generation = Some(st.start_generation),
                    _ => {}
                }
            }

            (previous, next, actions, spawn_loop, restart_generation)
        };

        if previous != next {
            info!("Run state {} -> {}", previous, next);
            self.inner.services.status.set_run_state(next);
        }
        self.perform(actions);

        if spawn_loop {
            self.spawn_driver();
        }
        if let Some(generation) = restart_generation {
            self.schedule_auto_restart(generation);
        }

        next
    }

    fn perform(&self, actions: Vec<Action>) {
        let services = &self.inner.services;
        for action in actions {
            match action {
                Action::SetStatus { text, level } => services.status.set_status(&text, level),
                Action::Warn { message } => {
                    warn!("{}", message);
                    services.status.set_status(&message, StatusLevel::Warning);
                }
                Action::LogActivity { message } => services.diagnostics.record(&message, None),
                Action::Bootstrap | Action::SpawnLoop | Action::ScheduleAutoRestart => {}
            }
        }
    }

    fn spawn_driver(&self) {
        let session = self.clone();
        tokio::spawn(async move {
            session.drive().await;
        });
    }

    fn schedule_auto_restart(&self, generation: u64) {
        let delay = self.inner.settings.schedule.auto_restart();
        info!("Scheduling automatic restart in {}s", delay.as_secs());
        self.inner.services.diagnostics.record(
            "Auto-restart scheduled",
            Some(serde_json::json!({ "delay_secs": delay.as_secs() })),
        );

        let session = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            session.auto_restart(generation).await;
        });
    }

    async fn auto_restart(&self, generation: u64) {
        {
            let st = self.lock().await;
            if st.start_generation != generation
                || st.starting
                || st.run_state != RunState::Stopped
            {
                debug!("Auto-restart skipped: session was started or changed since");
                return;
            }
        }

        info!("Auto-restarting session");
        if let Err(e) = self.start().await {
            warn!("Auto-restart failed: {}", e);
        }
    }

    #[cfg(test)]
    pub(crate) async fn force_running(&self) {
        let mut st = self.lock().await;
        st.run_state = RunState::Running;
        st.loop_active = true;
    }
}
