//! OTP verification flow controller

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use otp_shared::phone::{display_hint, mask_phone_number, normalize_subscriber_number, to_international};
use otp_shared::validation::validators::is_numeric_code;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::domain::entities::{Channel, CountdownTick, FlowPhase, VerificationSession};
use crate::domain::events::FlowEvent;
use crate::domain::value_objects::CODE_LENGTH;
use crate::errors::{FlowError, FlowResult, ServiceError};

use super::config::FlowConfig;
use super::scheduler::{CountdownScheduler, TickControl, TimerHandle};
use super::traits::{CodeDeliveryService, CodeVerificationService};
use super::types::ServiceReply;

const EVENT_CAPACITY: usize = 32;

struct FlowState {
    session: VerificationSession,
    delivery_in_flight: bool,
    verification_in_flight: bool,
    /// Running countdown; replacing or clearing it cancels the previous timer
    timer: Option<TimerHandle>,
    /// Bumped on every timer change so ticks of a replaced timer are ignored
    timer_epoch: u64,
}

impl FlowState {
    fn cancel_countdown(&mut self) {
        self.timer = None;
        self.timer_epoch += 1;
    }

    fn is_current(&self, session_id: Uuid) -> bool {
        self.session.id == session_id
    }
}

struct FlowInner {
    state: Mutex<FlowState>,
    snapshots: watch::Sender<VerificationSession>,
    events: broadcast::Sender<FlowEvent>,
}

impl FlowInner {
    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &FlowState) {
        self.snapshots.send_replace(state.session.clone());
    }

    fn emit(&self, event: FlowEvent) {
        // No subscribers is fine; focus events are advisory
        let _ = self.events.send(event);
    }

    fn on_tick(&self, epoch: u64) -> TickControl {
        let mut state = self.lock();
        if state.timer_epoch != epoch {
            return TickControl::Stop;
        }

        match state.session.tick() {
            CountdownTick::Running(remaining) => {
                self.publish(&state);
                tracing::trace!(
                    session_id = %state.session.id,
                    remaining = remaining,
                    "Countdown tick"
                );
                TickControl::Continue
            }
            CountdownTick::Expired => {
                self.publish(&state);
                tracing::info!(
                    session_id = %state.session.id,
                    channel = %state.session.channel,
                    fallback_offered = state.session.fallback_offered,
                    event = "countdown_expired",
                    "Countdown expired; resend available"
                );
                TickControl::Stop
            }
            CountdownTick::Idle => TickControl::Stop,
        }
    }
}

/// Drives one phone-number verification at a time
///
/// The controller owns the [`VerificationSession`]; presentation layers read it through
/// [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe), listen for focus hints on
/// [`events`](Self::events), and call the operations below. Failures are recorded in the
/// session as the single visible message and also returned to the caller.
pub struct VerificationFlow<D, V>
where
    D: CodeDeliveryService + ?Sized,
    V: CodeVerificationService + ?Sized,
{
    inner: Arc<FlowInner>,
    delivery: Arc<D>,
    verifier: Arc<V>,
    scheduler: Arc<dyn CountdownScheduler>,
    config: FlowConfig,
}

impl<D, V> VerificationFlow<D, V>
where
    D: CodeDeliveryService + ?Sized,
    V: CodeVerificationService + ?Sized,
{
    /// Create a controller waiting for a phone number
    ///
    /// # Arguments
    ///
    /// * `delivery` - Service that sends codes
    /// * `verifier` - Service that checks codes
    /// * `scheduler` - Source of countdown ticks
    /// * `config` - Timing and numbering plan
    pub fn new(
        delivery: Arc<D>,
        verifier: Arc<V>,
        scheduler: Arc<dyn CountdownScheduler>,
        config: FlowConfig,
    ) -> Self {
        let session = VerificationSession::new();
        let (snapshots, _) = watch::channel(session.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(FlowInner {
                state: Mutex::new(FlowState {
                    session,
                    delivery_in_flight: false,
                    verification_in_flight: false,
                    timer: None,
                    timer_epoch: 0,
                }),
                snapshots,
                events,
            }),
            delivery,
            verifier,
            scheduler,
            config,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Current state of the session
    pub fn snapshot(&self) -> VerificationSession {
        self.inner.snapshots.borrow().clone()
    }

    /// Receiver that sees every state change
    pub fn subscribe(&self) -> watch::Receiver<VerificationSession> {
        self.inner.snapshots.subscribe()
    }

    /// Receiver for focus hints emitted from now on
    pub fn events(&self) -> broadcast::Receiver<FlowEvent> {
        self.inner.events.subscribe()
    }

    /// Validate `raw` and request the first code by SMS
    ///
    /// Ignored while a submission is outstanding or once the session left the phone step.
    pub async fn submit_phone_number(&self, raw: &str) -> FlowResult<()> {
        let (session_id, subscriber) = {
            let mut state = self.inner.lock();
            if state.session.phase != FlowPhase::AwaitingPhone || state.session.submitting {
                tracing::debug!(
                    session_id = %state.session.id,
                    phase = ?state.session.phase,
                    "Phone submission ignored"
                );
                return Ok(());
            }

            let Some(subscriber) = normalize_subscriber_number(raw, &self.config.country_code)
            else {
                let error = FlowError::invalid_phone(raw);
                state.session.record_error(&error);
                self.inner.publish(&state);
                tracing::warn!(
                    session_id = %state.session.id,
                    event = "invalid_phone_format",
                    "Rejected phone number before delivery"
                );
                return Err(error);
            };

            state.session.submitting = true;
            state.session.clear_error();
            self.inner.publish(&state);
            (state.session.id, subscriber)
        };

        let phone = to_international(&subscriber, &self.config.country_code);
        tracing::info!(
            session_id = %session_id,
            phone = %mask_phone_number(&phone),
            channel = %Channel::Sms,
            event = "otp_send_requested",
            "Requesting verification code"
        );

        let result = self.guarded(self.delivery.send(&phone, Channel::Sms)).await;

        let outcome = {
            let mut state = self.inner.lock();
            if !state.is_current(session_id) {
                tracing::debug!(session_id = %session_id, "Delivery finished for abandoned session");
                return Ok(());
            }
            state.session.submitting = false;

            let outcome = match result {
                Ok(reply) if reply.success => {
                    let hint = display_hint(&subscriber, &self.config.country_code);
                    let countdown = self.config.countdown_for(Channel::Sms);
                    state.session.begin_code_entry(phone.clone(), hint, countdown);
                    self.restart_countdown(&mut state);
                    tracing::info!(
                        session_id = %session_id,
                        phone = %mask_phone_number(&phone),
                        countdown = countdown,
                        event = "otp_sent",
                        "Verification code sent; awaiting code"
                    );
                    Ok(())
                }
                Ok(reply) => {
                    tracing::warn!(
                        session_id = %session_id,
                        phone = %mask_phone_number(&phone),
                        status = ?reply.status,
                        event = "otp_send_failed",
                        "Delivery service refused the request"
                    );
                    Err(FlowError::delivery_rejected(reply.status))
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        phone = %mask_phone_number(&phone),
                        error = %e,
                        event = "otp_send_failed",
                        "Delivery service unreachable"
                    );
                    Err(FlowError::delivery_unreachable())
                }
            };

            if let Err(error) = &outcome {
                state.session.record_error(error);
            }
            self.inner.publish(&state);
            outcome
        };

        if outcome.is_ok() {
            self.inner.emit(FlowEvent::FocusFirstSlot);
        }
        outcome
    }

    /// Put `value` into slot `index`
    ///
    /// `value` must be empty or one decimal digit; anything else is ignored. Filling the
    /// last empty slot submits the code.
    pub async fn set_digit(&self, index: usize, value: &str) -> FlowResult<()> {
        let complete = {
            let mut state = self.inner.lock();
            if state.session.phase != FlowPhase::AwaitingCode {
                return Ok(());
            }
            if !state.session.code_digits.set(index, value) {
                tracing::debug!(index = index, "Digit input ignored");
                return Ok(());
            }
            state.session.clear_error();
            self.inner.publish(&state);
            state.session.code_digits.code()
        };

        if !value.is_empty() && index + 1 < CODE_LENGTH {
            self.inner.emit(FlowEvent::FocusSlot(index + 1));
        }

        match complete {
            Some(code) => self.submit_code(&code).await,
            None => Ok(()),
        }
    }

    /// Backspace on an already empty slot moves focus back one slot
    pub fn handle_backspace_at(&self, index: usize) {
        let empty = {
            let state = self.inner.lock();
            state.session.phase == FlowPhase::AwaitingCode
                && state.session.code_digits.is_empty_at(index)
        };

        if empty && index > 0 && index < CODE_LENGTH {
            self.inner.emit(FlowEvent::FocusPreviousSlot(index - 1));
        }
    }

    /// Spread pasted text over the slots; a full six-digit paste submits the code
    pub async fn paste_code(&self, text: &str) -> FlowResult<()> {
        let complete = {
            let mut state = self.inner.lock();
            if state.session.phase != FlowPhase::AwaitingCode {
                return Ok(());
            }
            let Some(placed) = state.session.code_digits.fill_from_paste(text) else {
                tracing::debug!(session_id = %state.session.id, "Paste ignored");
                return Ok(());
            };
            state.session.clear_error();
            self.inner.publish(&state);

            if placed == CODE_LENGTH {
                state.session.code_digits.code()
            } else {
                None
            }
        };

        match complete {
            Some(code) => self.submit_code(&code).await,
            None => Ok(()),
        }
    }

    /// Check `code` with the verification service
    ///
    /// At most one verification runs at a time; calls made while one is outstanding,
    /// outside the code step, or with a code that is not six digits are ignored.
    pub async fn submit_code(&self, code: &str) -> FlowResult<()> {
        if !is_numeric_code(code, CODE_LENGTH) {
            tracing::warn!(
                length = code.len(),
                event = "malformed_code_ignored",
                "Code submission ignored"
            );
            return Ok(());
        }

        let (session_id, phone) = {
            let mut state = self.inner.lock();
            if state.session.phase != FlowPhase::AwaitingCode || state.verification_in_flight {
                tracing::debug!(
                    session_id = %state.session.id,
                    phase = ?state.session.phase,
                    "Code submission coalesced"
                );
                return Ok(());
            }
            let Some(phone) = state.session.phone_number.clone() else {
                return Ok(());
            };

            state.verification_in_flight = true;
            state.session.begin_verification();
            self.inner.publish(&state);
            (state.session.id, phone)
        };

        tracing::info!(
            session_id = %session_id,
            phone = %mask_phone_number(&phone),
            event = "otp_verify_requested",
            "Verifying code"
        );

        let result = self.guarded(self.verifier.verify(&phone, code)).await;

        let outcome = {
            let mut state = self.inner.lock();
            if !state.is_current(session_id) {
                tracing::debug!(session_id = %session_id, "Verification finished for abandoned session");
                return Ok(());
            }
            state.verification_in_flight = false;

            let outcome = match result {
                Ok(reply) if reply.success => {
                    state.session.mark_verified();
                    state.cancel_countdown();
                    tracing::info!(
                        session_id = %session_id,
                        phone = %mask_phone_number(&phone),
                        channel = %state.session.channel,
                        event = "otp_verified",
                        "Phone number verified"
                    );
                    Ok(())
                }
                Ok(reply) => {
                    let error = FlowError::code_rejected(reply.status);
                    state.session.verification_failed(&error);
                    tracing::warn!(
                        session_id = %session_id,
                        phone = %mask_phone_number(&phone),
                        event = "otp_rejected",
                        "Verification service rejected the code"
                    );
                    Err(error)
                }
                Err(e) => {
                    let error = FlowError::verification_unreachable();
                    state.session.verification_failed(&error);
                    tracing::warn!(
                        session_id = %session_id,
                        error = %e,
                        event = "otp_verify_failed",
                        "Verification service unreachable"
                    );
                    Err(error)
                }
            };

            self.inner.publish(&state);
            outcome
        };

        if let Err(FlowError::InvalidCode { .. }) = &outcome {
            self.inner.emit(FlowEvent::FocusFirstSlot);
        }
        outcome
    }

    /// Move to the voice channel once the SMS countdown ran out
    ///
    /// Returns `false` without side effects when the fallback is not on offer or a
    /// delivery is outstanding. The session moves to the voice channel before the call
    /// is placed and stays there if the call fails; the failure becomes the visible
    /// message.
    pub async fn switch_to_voice(&self) -> bool {
        let countdown = self.config.countdown_for(Channel::Voice);
        self.redeliver("switch_to_voice", |session| session.switch_to_voice(countdown))
            .await
    }

    /// Send a fresh code on the current channel once the countdown ran out
    ///
    /// Same delivery-failure policy as [`switch_to_voice`](Self::switch_to_voice).
    pub async fn resend(&self) -> bool {
        let config = &self.config;
        self.redeliver("resend", |session| {
            let countdown = config.countdown_for(session.channel);
            session.resend(countdown)
        })
        .await
    }

    /// Drop the current session and start over at the phone step
    ///
    /// Outstanding service calls of the old session complete without touching the new one.
    pub fn abandon(&self) {
        let mut state = self.inner.lock();
        let previous = state.session.id;
        state.cancel_countdown();
        state.session = VerificationSession::new();
        state.delivery_in_flight = false;
        state.verification_in_flight = false;
        self.inner.publish(&state);

        tracing::info!(
            session_id = %previous,
            new_session_id = %state.session.id,
            event = "session_abandoned",
            "Verification session abandoned"
        );
    }

    async fn redeliver<F>(&self, operation: &'static str, transition: F) -> bool
    where
        F: FnOnce(&mut VerificationSession) -> bool,
    {
        let (session_id, phone, channel) = {
            let mut state = self.inner.lock();
            if state.delivery_in_flight {
                tracing::debug!(operation = operation, "Delivery outstanding; request ignored");
                return false;
            }
            let Some(phone) = state.session.phone_number.clone() else {
                return false;
            };
            if !transition(&mut state.session) {
                tracing::debug!(
                    session_id = %state.session.id,
                    operation = operation,
                    "Request not available"
                );
                return false;
            }

            state.delivery_in_flight = true;
            self.restart_countdown(&mut state);
            self.inner.publish(&state);
            (state.session.id, phone, state.session.channel)
        };

        self.inner.emit(FlowEvent::FocusFirstSlot);
        tracing::info!(
            session_id = %session_id,
            phone = %mask_phone_number(&phone),
            channel = %channel,
            operation = operation,
            event = "otp_send_requested",
            "Requesting verification code"
        );

        let result = self.guarded(self.delivery.send(&phone, channel)).await;

        let mut state = self.inner.lock();
        if !state.is_current(session_id) {
            return true;
        }
        state.delivery_in_flight = false;

        let error = match result {
            Ok(reply) if reply.success => None,
            Ok(reply) => Some(FlowError::delivery_rejected(reply.status)),
            Err(e) => {
                tracing::debug!(error = %e, "Delivery transport fault");
                Some(FlowError::delivery_unreachable())
            }
        };

        match error {
            Some(error) if !state.session.is_terminal() => {
                tracing::warn!(
                    session_id = %session_id,
                    channel = %channel,
                    operation = operation,
                    reason = %error,
                    event = "otp_send_failed",
                    "Delivery failed; staying on the new channel"
                );
                state.session.record_error(&error);
                self.inner.publish(&state);
            }
            Some(_) => {}
            None => {
                tracing::info!(
                    session_id = %session_id,
                    channel = %channel,
                    event = "otp_sent",
                    "Verification code sent"
                );
            }
        }
        true
    }

    fn restart_countdown(&self, state: &mut FlowState) {
        state.cancel_countdown();
        let epoch = state.timer_epoch;
        let inner: Weak<FlowInner> = Arc::downgrade(&self.inner);

        let handle = self.scheduler.schedule_repeating(
            self.config.tick_interval,
            Box::new(move || match inner.upgrade() {
                Some(inner) => inner.on_tick(epoch),
                None => TickControl::Stop,
            }),
        );
        state.timer = Some(handle);
    }

    async fn guarded<F>(&self, call: F) -> Result<ServiceReply, ServiceError>
    where
        F: Future<Output = Result<ServiceReply, ServiceError>>,
    {
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(ServiceError::Timeout(limit))),
            None => call.await,
        }
    }
}

impl<D, V> Drop for VerificationFlow<D, V>
where
    D: CodeDeliveryService + ?Sized,
    V: CodeVerificationService + ?Sized,
{
    fn drop(&mut self) {
        self.inner.lock().cancel_countdown();
    }
}
