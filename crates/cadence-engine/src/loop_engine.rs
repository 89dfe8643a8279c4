//! Orchestration loop
//!
//! Each cycle:
//! 1. Exits unless the session is running
//! 2. Waits out an active quota cooldown (polling every second)
//! 3. Checks quota, entering cooldown when it is exhausted
//! 4. Sends one message through the retry executor
//! 5. Refreshes points and quota for display (fail-open)
//! 6. Schedules the next cycle after a random delay
//!
//! A failed send goes through the circuit breaker. Any other error aborts
//! the cycle and goes through the loop-error ladder instead.

use crate::circuit_breaker::BreakerAdvice;
use crate::cooldown::CooldownPoll;
use crate::session::Session;
use crate::state_machine::Event;
use cadence_core::config::ScheduleConfig;
use cadence_core::fail_open::fail_open;
use cadence_core::{Ack, CadenceError, Result, RunState, StatusLevel};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What the driver does after a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleOutcome {
    /// Run another cycle after this delay
    Continue(Duration),
    /// The session left Running; the loop exits
    Stop,
}

/// Random inter-cycle delay in `[min, max)`
fn next_delay(schedule: &ScheduleConfig) -> Duration {
    let (min, max) = (schedule.min_delay_ms, schedule.max_delay_ms);
    let millis = if max <= min {
        min
    } else {
        rand::thread_rng().gen_range(min..max)
    };
    Duration::from_millis(millis)
}

impl Session {
    pub(crate) async fn drive(&self) {
        info!(session = %self.id(), "Orchestration loop started");

        loop {
            match self.run_cycle().await {
                CycleOutcome::Continue(delay) => {
                    debug!("Next cycle in {}ms", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
                CycleOutcome::Stop => break,
            }
        }

        info!(session = %self.id(), "Orchestration loop exited");
    }

    pub(crate) async fn run_cycle(&self) -> CycleOutcome {
        match self.try_cycle().await {
            Ok(outcome) => outcome,
            Err(e) => self.handle_loop_error(e).await,
        }
    }

    async fn try_cycle(&self) -> Result<CycleOutcome> {
        let schedule = &self.inner.settings.schedule;
        let services = &self.inner.services;

        if !self.claim_cycle().await {
            return Ok(CycleOutcome::Stop);
        }

        match self.poll_cooldown().await {
            CooldownPoll::Waiting { .. } => {
                return Ok(CycleOutcome::Continue(schedule.cooldown_poll()));
            }
            CooldownPoll::Resumed => {
                info!("Cooldown finished");
                services.status.show_cooldown_countdown(None);
                services
                    .status
                    .set_status("Cooldown over, resuming", StatusLevel::Success);
                services.diagnostics.record("Cooldown ended", None);

                if !self.still_running().await {
                    return Ok(CycleOutcome::Stop);
                }
            }
            CooldownPoll::Idle => {}
        }

        let quota = services.quota.get_quota().await?;
        services.status.update_quota(&quota);
        if quota.is_exhausted() {
            self.enter_cooldown(quota.reset_time).await;
            return Ok(CycleOutcome::Continue(schedule.cooldown_poll()));
        }

        self.perform_work().await;

        self.refresh_display().await;

        if self.still_running().await {
            Ok(CycleOutcome::Continue(next_delay(schedule)))
        } else {
            Ok(CycleOutcome::Stop)
        }
    }

    /// Count the cycle if running, otherwise release the loop
    async fn claim_cycle(&self) -> bool {
        let mut st = self.lock().await;
        if st.run_state != RunState::Running {
            st.loop_active = false;
            return false;
        }
        st.stats.cycles += 1;
        true
    }

    /// `true` if still running; otherwise the loop is released
    async fn still_running(&self) -> bool {
        let mut st = self.lock().await;
        if st.run_state != RunState::Running {
            st.loop_active = false;
            return false;
        }
        true
    }

    async fn poll_cooldown(&self) -> CooldownPoll {
        let services = &self.inner.services;
        let now = services.clock.now();

        let (poll, probe) = {
            let mut st = self.lock().await;
            let poll = st.cooldown.poll(now);
            let probe = matches!(poll, CooldownPoll::Waiting { .. })
                && st
                    .cooldown
                    .probe_due(now, self.inner.settings.schedule.cooldown_recheck());
            (poll, probe)
        };

        if let (CooldownPoll::Waiting { remaining }, true) = (poll, probe) {
            debug!(
                "Asking whether cooldown still holds ({}s left)",
                remaining.as_secs()
            );
            let active = fail_open("cooldown_probe", || services.quota.is_cooldown_active()).await;
            if active == Some(false) && self.lock().await.cooldown.confirm_available() {
                info!("Quota available before reset time, ending cooldown early");
                return CooldownPoll::Resumed;
            }
        }

        poll
    }

    async fn enter_cooldown(&self, reset_time: DateTime<Utc>) {
        let services = &self.inner.services;
        let now = services.clock.now();

        let reset_time = {
            let mut st = self.lock().await;
            if !st.cooldown.enter(reset_time, now) {
                return;
            }
            st.cooldown.reset_time().unwrap_or(reset_time)
        };

        let wait_secs = (reset_time - now).num_seconds().max(0);
        info!(
            "Quota exhausted, suspending until {} ({}s)",
            reset_time, wait_secs
        );
        services.status.show_cooldown_countdown(Some(reset_time));
        services.status.set_status(
            &format!(
                "Quota exhausted. Cooling down until {}",
                reset_time.format("%H:%M:%S UTC")
            ),
            StatusLevel::Warning,
        );
        services.diagnostics.record(
            "Cooldown started",
            Some(json!({
                "reset_time": reset_time.to_rfc3339(),
                "wait_secs": wait_secs,
            })),
        );
    }

    async fn deliver_once(&self) -> Result<Ack> {
        let services = &self.inner.services;
        let text = services.generator.generate_message().await?;
        let thread = services.chat.create_thread().await?;
        services.chat.send_message(&thread, &text).await
    }

    async fn perform_work(&self) {
        let services = &self.inner.services;

        let result = self
            .inner
            .settings
            .retry
            .execute_with(
                "send_message",
                || self.deliver_once(),
                |attempt, err| {
                    services.status.set_status(
                        &format!(
                            "Send attempt {}/{} failed: {}. Retrying in {:.1}s",
                            attempt.number,
                            attempt.max_attempts,
                            err,
                            attempt.delay().as_secs_f64()
                        ),
                        StatusLevel::Warning,
                    );
                },
            )
            .await;

        match result {
            Ok(ack) => {
                let sent = {
                    let mut st = self.lock().await;
                    st.breaker.record_success();
                    st.stats.messages_sent += 1;
                    st.stats.messages_sent
                };
                services.status.record_send(true);
                services.status.set_status(
                    &format!("Message sent ({} total)", sent),
                    StatusLevel::Success,
                );
                services.diagnostics.record(
                    "Message sent",
                    Some(json!({
                        "thread": ack.thread_id.to_string(),
                        "reply_chars": ack.reply_chars,
                    })),
                );
            }
            Err(e) => self.on_work_failure(e).await,
        }
    }

    async fn on_work_failure(&self, err: CadenceError) {
        let services = &self.inner.services;

        let (advice, failures) = {
            let mut st = self.lock().await;
            st.stats.send_failures += 1;
            let advice = st.breaker.record_failure();
            (advice, st.breaker.failure_count())
        };

        warn!(error = %err, consecutive_failures = failures, "Send failed");
        services.status.record_send(false);
        services.diagnostics.record(
            "Send failed",
            Some(json!({
                "error": err.to_string(),
                "consecutive_failures": failures,
            })),
        );

        if err.is_auth_failure() && !self.reauthenticate().await {
            return;
        }

        match advice {
            BreakerAdvice::Backoff(pause) => {
                services.status.set_status(
                    &format!("Send failed: {}. Waiting {}s", err, pause.as_secs()),
                    StatusLevel::Warning,
                );
                tokio::time::sleep(pause).await;
            }
            BreakerAdvice::LongPause(pause) => self.error_pause(pause).await,
        }
    }

    /// Log in again after the credential was rejected
    ///
    /// Returns `false` if the session was halted.
    async fn reauthenticate(&self) -> bool {
        let services = &self.inner.services;

        info!("Credential rejected, logging in again");
        services
            .status
            .set_status("Session expired, logging in again", StatusLevel::Warning);

        let result = self
            .inner
            .settings
            .retry
            .execute("login", || services.credentials.login())
            .await;

        match result {
            Ok(_) => {
                self.lock().await.stats.reauths += 1;
                services.diagnostics.record("Re-authenticated", None);
                true
            }
            Err(e) if e.is_transient() => {
                warn!("Re-login failed, trying again next cycle: {}", e);
                true
            }
            Err(e) => {
                error!("Re-login failed: {}", e);
                self.apply(Event::Halted {
                    reason: format!("Re-login failed: {}", e),
                })
                .await;
                false
            }
        }
    }

    /// Long pause after too many consecutive failures
    async fn error_pause(&self, pause: Duration) {
        let services = &self.inner.services;

        warn!(
            "Too many consecutive failures, pausing for {}s",
            pause.as_secs()
        );
        self.apply(Event::ErrorPauseBegan).await;
        services.status.set_status(
            &format!("Multiple errors, pausing for {}s...", pause.as_secs()),
            StatusLevel::Error,
        );
        services.diagnostics.record(
            "Error pause",
            Some(json!({ "pause_secs": pause.as_secs() })),
        );

        tokio::time::sleep(pause).await;

        self.lock().await.breaker.reset();
        self.apply(Event::ErrorPauseEnded).await;
    }

    async fn refresh_display(&self) {
        let services = &self.inner.services;

        if let Some(points) = fail_open("points_refresh", || services.points.get_points()).await {
            services.status.update_points(&points);
        }
        if let Some(quota) = fail_open("quota_refresh", || services.quota.get_quota()).await {
            services.status.update_quota(&quota);
        }
        services.status.render();
    }

    async fn handle_loop_error(&self, err: CadenceError) -> CycleOutcome {
        let services = &self.inner.services;

        let advice = {
            let mut st = self.lock().await;
            st.stats.loop_errors += 1;
            st.breaker.record_loop_error(&self.inner.settings.schedule)
        };
        let delay = advice.duration();

        error!(error = %err, transient = err.is_transient(), "Cycle aborted");
        services.diagnostics.record(
            "Loop error",
            Some(json!({
                "error": err.to_string(),
                "transient": err.is_transient(),
            })),
        );

        match advice {
            BreakerAdvice::Backoff(_) => services.status.set_status(
                &format!("Error: {}. Retrying in {}s...", err, delay.as_secs()),
                StatusLevel::Warning,
            ),
            BreakerAdvice::LongPause(_) => services.status.set_status(
                &format!("Multiple errors, pausing for {}s...", delay.as_secs()),
                StatusLevel::Error,
            ),
        }

        if self.still_running().await {
            CycleOutcome::Continue(delay)
        } else {
            CycleOutcome::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{refused, timeout, Fakes};
    use tokio::time::Instant;

    const NEXT: CycleOutcome = CycleOutcome::Continue(Duration::from_secs(3));

    fn secs_since(start: Instant) -> u64 {
        start.elapsed().as_secs()
    }

    #[test]
    fn test_next_delay_range() {
        let mut schedule = ScheduleConfig::default();
        for _ in 0..100 {
            let d = next_delay(&schedule).as_millis() as u64;
            assert!((schedule.min_delay_ms..schedule.max_delay_ms).contains(&d));
        }

        schedule.max_delay_ms = schedule.min_delay_ms;
        assert_eq!(
            next_delay(&schedule),
            Duration::from_millis(schedule.min_delay_ms)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_loop_after_repeated_starts() {
        let fakes = Fakes::new();
        let session = fakes.session();

        session.start().await.unwrap();
        session.start().await.unwrap();
        session.resume().await;

        // Cycles at 0s, 3s, 6s and 9s
        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert_eq!(fakes.chat.delivered(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_mid_cycle_prevents_next_cycle() {
        let fakes = Fakes::new();
        let session = fakes.session();
        session.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fakes.chat.delivered(), 1);

        assert_eq!(session.pause().await, RunState::Paused);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(fakes.chat.delivered(), 1);
        let snap = session.snapshot().await;
        assert_eq!(snap.run_state, RunState::Paused);
        assert!(!snap.loop_active);

        assert_eq!(session.resume().await, RunState::Running);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fakes.chat.delivered(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_exhaustion_suspends_until_reset() {
        let fakes = Fakes::new();
        fakes.quota.exhaust_for(60);
        let session = fakes.session();
        session.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(30_500)).await;

        assert_eq!(fakes.chat.attempts(), 0);
        let snap = session.snapshot().await;
        assert_eq!(snap.run_state, RunState::Running);
        assert!(snap.cooldown_until.is_some());
        // Polled about once a second while suspended
        assert!(snap.stats.cycles >= 25);
        assert!(fakes.status.countdown_shown());
        assert_eq!(fakes.quota.probes(), 1);

        tokio::time::sleep(Duration::from_millis(30_500)).await;

        assert_eq!(fakes.chat.delivered(), 1);
        assert!(session.snapshot().await.cooldown_until.is_none());
        assert!(fakes.status.has_status("Cooldown over"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reset_time_does_not_poll_quota_every_second() {
        let fakes = Fakes::new();
        fakes.quota.exhaust_for(120);
        fakes.quota.report_stale_reset();
        let session = fakes.session();
        session.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let snap = session.snapshot().await;
        assert!(snap.cooldown_until.is_some());
        assert!(snap.stats.cycles >= 8);
        // One call from start, one from the cycle that entered the cooldown
        assert_eq!(fakes.quota.calls(), 2);

        tokio::time::sleep(Duration::from_secs(55)).await;
        assert!(fakes.quota.calls() <= 4);
        assert_eq!(fakes.chat.attempts(), 0);
        assert_eq!(session.snapshot().await.run_state, RunState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_ends_early_when_quota_returns() {
        let fakes = Fakes::new();
        fakes.quota.exhaust_for(3600);
        let session = fakes.session();
        session.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(session.snapshot().await.cooldown_until.is_some());

        fakes.quota.end_exhaustion();
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(session.snapshot().await.cooldown_until.is_none());
        assert!(fakes.chat.delivered() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_rejected_while_cooldown_active() {
        let fakes = Fakes::new();
        fakes.quota.exhaust_for(60);
        let session = fakes.session();
        session.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Rejected even though nothing is paused
        assert_eq!(session.resume().await, RunState::Running);
        assert!(fakes.status.has_status("Resume rejected"));

        assert_eq!(session.pause().await, RunState::Paused);
        assert_eq!(session.resume().await, RunState::Paused);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(fakes.chat.attempts(), 0);

        assert_eq!(session.resume().await, RunState::Running);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fakes.chat.delivered(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_work_failures_trigger_long_pause() {
        let fakes = Fakes::new();
        fakes
            .chat
            .fail_sends((0..3).map(|_| CadenceError::http(422, "message rejected")));
        let session = fakes.session();
        session.force_running().await;

        let start = Instant::now();
        assert_eq!(session.run_cycle().await, NEXT);
        assert_eq!(secs_since(start), 10);
        assert_eq!(session.snapshot().await.consecutive_failures, 1);

        assert_eq!(session.run_cycle().await, NEXT);
        assert_eq!(secs_since(start), 20);
        assert_eq!(session.snapshot().await.consecutive_failures, 2);

        assert_eq!(session.run_cycle().await, NEXT);
        assert_eq!(secs_since(start), 200);
        let snap = session.snapshot().await;
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.run_state, RunState::Running);
        assert!(fakes.status.saw_state(RunState::ErrorPaused));

        assert_eq!(session.run_cycle().await, NEXT);
        assert_eq!(fakes.chat.delivered(), 1);
        assert_eq!(fakes.chat.attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_after_long_pause_escalate_again() {
        let fakes = Fakes::new();
        fakes
            .chat
            .fail_sends((0..6).map(|_| CadenceError::http(422, "message rejected")));
        let session = fakes.session();
        session.force_running().await;

        let start = Instant::now();
        for _ in 0..3 {
            assert_eq!(session.run_cycle().await, NEXT);
        }
        assert_eq!(secs_since(start), 200);
        assert_eq!(session.snapshot().await.consecutive_failures, 0);

        // Fourth failure is a fresh first strike
        assert_eq!(session.run_cycle().await, NEXT);
        assert_eq!(secs_since(start), 210);
        assert_eq!(session.snapshot().await.consecutive_failures, 1);

        assert_eq!(session.run_cycle().await, NEXT);
        assert_eq!(secs_since(start), 220);
        assert_eq!(session.snapshot().await.consecutive_failures, 2);

        assert_eq!(session.run_cycle().await, NEXT);
        assert_eq!(secs_since(start), 400);
        let snap = session.snapshot().await;
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.run_state, RunState::Running);
        assert_eq!(fakes.chat.attempts(), 6);
        assert_eq!(fakes.chat.delivered(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retried_send_counts_as_one_failure() {
        let fakes = Fakes::new();
        fakes.chat.fail_sends((0..5).map(|_| timeout()));
        let session = fakes.session();
        session.force_running().await;

        let start = Instant::now();
        assert_eq!(session.run_cycle().await, NEXT);

        assert_eq!(fakes.chat.attempts(), 5);
        assert_eq!(session.snapshot().await.consecutive_failures, 1);
        // 16.25s of retry backoff, then the 10s short pause
        assert_eq!(start.elapsed().as_millis() / 10, 2625);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let fakes = Fakes::new();
        fakes
            .chat
            .fail_sends([CadenceError::http(422, "message rejected")]);
        let session = fakes.session();
        session.force_running().await;

        session.run_cycle().await;
        assert_eq!(session.snapshot().await.consecutive_failures, 1);

        session.run_cycle().await;
        assert_eq!(session.snapshot().await.consecutive_failures, 0);
        assert_eq!(fakes.chat.delivered(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_errors_back_off_5s_then_15s_then_long_pause() {
        let fakes = Fakes::new();
        fakes.quota.fail_quota((0..3).map(|_| refused()));
        let session = fakes.session();
        session.force_running().await;

        assert_eq!(
            session.run_cycle().await,
            CycleOutcome::Continue(Duration::from_secs(5))
        );
        assert!(fakes.status.has_status("Retrying in 5s"));
        assert_eq!(
            session.run_cycle().await,
            CycleOutcome::Continue(Duration::from_secs(15))
        );
        assert_eq!(
            session.run_cycle().await,
            CycleOutcome::Continue(Duration::from_secs(180))
        );

        let snap = session.snapshot().await;
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.stats.loop_errors, 3);
        assert_eq!(fakes.chat.attempts(), 0);

        assert_eq!(session.run_cycle().await, NEXT);
        assert_eq!(fakes.chat.delivered(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_credential_triggers_relogin() {
        let fakes = Fakes::new();
        fakes
            .chat
            .fail_sends([CadenceError::http(401, "token expired")]);
        let session = fakes.session();
        session.force_running().await;

        assert_eq!(session.run_cycle().await, NEXT);

        assert_eq!(fakes.credentials.logins(), 1);
        let snap = session.snapshot().await;
        assert_eq!(snap.stats.reauths, 1);
        assert_eq!(snap.run_state, RunState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_relogin_halts_session() {
        let fakes = Fakes::new();
        fakes
            .chat
            .fail_sends([CadenceError::http(401, "token expired")]);
        fakes
            .credentials
            .fail_logins([CadenceError::Auth("API key revoked".into())]);
        let session = fakes.session();
        session.force_running().await;

        assert_eq!(session.run_cycle().await, CycleOutcome::Stop);

        let snap = session.snapshot().await;
        assert_eq!(snap.run_state, RunState::Stopped);
        assert!(!snap.loop_active);
        assert!(fakes.status.has_status("Re-login failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_stops_when_not_running() {
        let fakes = Fakes::new();
        let session = fakes.session();

        assert_eq!(session.run_cycle().await, CycleOutcome::Stop);
        assert_eq!(fakes.quota.calls(), 0);
    }
}
