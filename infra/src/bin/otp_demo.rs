//! Console front end for the verification flow
//!
//! Reads operator commands from stdin and renders session snapshots and focus
//! hints as they arrive. Configuration is loaded the same way as any other
//! process in the workspace (`otp.<environment>.toml`, then `OTP__*` variables).

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use otp_core::domain::{FlowEvent, FlowPhase, VerificationSession, CODE_LENGTH};
use otp_core::services::verification::{
    CodeDeliveryService, CodeVerificationService, FlowConfig, TokioScheduler, VerificationFlow,
};
use otp_infra::{create_otp_services, init_tracing, load_config};

type ConsoleFlow = VerificationFlow<dyn CodeDeliveryService, dyn CodeVerificationService>;

const HELP: &str = "\
commands:
  <phone number>      request a code (while no code was requested)
  <six digits>        paste a full code
  d <slot> <digit>    type one digit into a slot (slots 0-5)
  b <slot>            backspace on a slot
  p <text>            paste arbitrary text
  voice               get the code by phone call once the countdown ran out
  resend              send the code again once the countdown ran out
  status              print the current session
  abandon             start over with a new phone number
  quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config(None).context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise logging")?;

    let services = create_otp_services(&config.otp_service, config.environment)
        .context("failed to create OTP services")?;
    let scheduler = TokioScheduler::try_current().context("no tokio runtime")?;

    let flow: Arc<ConsoleFlow> = Arc::new(VerificationFlow::new(
        services.delivery.clone(),
        services.verifier.clone(),
        Arc::new(scheduler),
        FlowConfig::from(&config.flow),
    ));

    println!(
        "Phone verification ({} provider, {} environment)",
        services.provider, config.environment
    );
    println!("{}", HELP);
    println!("Enter your phone number:");

    let renderer = tokio::spawn(render_snapshots(flow.clone()));
    let focus = tokio::spawn(render_focus(flow.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        dispatch(&flow, line.to_string());
    }

    renderer.abort();
    focus.abort();
    Ok(())
}

/// Run one command in its own task
///
/// A delivery or verification call can take a while; reading the next line
/// meanwhile lets the operator `abandon` an outstanding request.
fn dispatch(flow: &Arc<ConsoleFlow>, line: String) -> JoinHandle<()> {
    let flow = Arc::clone(flow);
    tokio::spawn(async move { handle_command(&flow, &line).await })
}

async fn handle_command(flow: &ConsoleFlow, line: &str) {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();

    // Errors are already recorded in the session and rendered from there
    match command {
        "status" => print_session(&flow.snapshot()),
        "voice" => {
            if !flow.switch_to_voice().await {
                println!("Voice call is not available right now");
            }
        }
        "resend" => {
            if !flow.resend().await {
                println!("Resend is not available right now");
            }
        }
        "abandon" => {
            flow.abandon();
            println!("Enter your phone number:");
        }
        "d" => match (parts.next().and_then(|s| s.parse::<usize>().ok()), parts.next()) {
            (Some(slot), Some(digit)) => {
                let _ = flow.set_digit(slot, digit).await;
            }
            _ => println!("usage: d <slot> <digit>"),
        },
        "b" => match parts.next().and_then(|s| s.parse::<usize>().ok()) {
            Some(slot) => flow.handle_backspace_at(slot),
            None => println!("usage: b <slot>"),
        },
        "p" => {
            let text = line[1..].trim_start();
            let _ = flow.paste_code(text).await;
        }
        "help" => println!("{}", HELP),
        _ => match flow.snapshot().phase {
            FlowPhase::AwaitingPhone => {
                let _ = flow.submit_phone_number(line).await;
            }
            FlowPhase::AwaitingCode
                if line.len() == CODE_LENGTH && line.chars().all(|c| c.is_ascii_digit()) =>
            {
                let _ = flow.paste_code(line).await;
            }
            _ => println!("Unknown command, type `help`"),
        },
    }
}

/// Print the parts of each snapshot an operator cares about
///
/// Countdown ticks are only shown when they unlock an action, the rest of
/// the time the `status` command shows the remaining seconds.
async fn render_snapshots(flow: Arc<ConsoleFlow>) {
    let mut snapshots = flow.subscribe();
    let mut previous = snapshots.borrow().clone();

    while snapshots.changed().await.is_ok() {
        let current = snapshots.borrow_and_update().clone();

        if current.id != previous.id {
            previous = current;
            continue;
        }
        if current.phase != previous.phase || current.channel != previous.channel {
            match current.phase {
                FlowPhase::AwaitingCode => println!(
                    "Code sent by {} to {}. Enter the {} digits.",
                    current.channel,
                    current.phone_hint.as_deref().unwrap_or("your phone"),
                    CODE_LENGTH
                ),
                FlowPhase::Verifying => println!("Verifying..."),
                FlowPhase::Verified => println!("Phone number verified."),
                FlowPhase::AwaitingPhone => {}
            }
        }
        if current.last_error_message != previous.last_error_message {
            if let Some(message) = &current.last_error_message {
                println!("! {}", message);
            }
        }
        if current.fallback_offered && !previous.fallback_offered {
            println!("Didn't get the SMS? Type `voice` for a call.");
        }
        if current.resend_available && !previous.resend_available {
            println!("Type `resend` for a new code.");
        }
        if current.code_digits != previous.code_digits {
            println!("[{}]", render_digits(&current));
        }

        previous = current;
    }
}

async fn render_focus(flow: Arc<ConsoleFlow>) {
    let mut events = flow.events();
    loop {
        match events.recv().await {
            Ok(FlowEvent::FocusSlot(slot)) | Ok(FlowEvent::FocusPreviousSlot(slot)) => {
                println!("(slot {})", slot)
            }
            Ok(FlowEvent::FocusFirstSlot) => println!("(slot 0)"),
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

fn render_digits(session: &VerificationSession) -> String {
    (0..CODE_LENGTH)
        .map(|i| session.code_digits.get(i).unwrap_or('_'))
        .map(String::from)
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_session(session: &VerificationSession) {
    println!("phase:     {:?}", session.phase);
    if let Some(hint) = &session.phone_hint {
        println!("phone:     {}", hint);
    }
    println!("channel:   {}", session.channel);
    println!("countdown: {}s", session.countdown);
    println!("code:      [{}]", render_digits(session));
    if let Some(message) = &session.last_error_message {
        println!("error:     {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use otp_core::errors::ServiceError;
    use otp_core::services::verification::{ManualScheduler, ServiceReply};
    use otp_core::domain::Channel;
    use otp_infra::MockOtpService;

    /// Delivery that never answers
    struct StalledDelivery;

    #[async_trait]
    impl CodeDeliveryService for StalledDelivery {
        async fn send(&self, _phone: &str, _channel: Channel) -> Result<ServiceReply, ServiceError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_abandon_accepted_while_delivery_outstanding() {
        let flow: Arc<ConsoleFlow> = Arc::new(VerificationFlow::new(
            Arc::new(StalledDelivery) as Arc<dyn CodeDeliveryService>,
            Arc::new(MockOtpService::new()) as Arc<dyn CodeVerificationService>,
            Arc::new(ManualScheduler::new()),
            FlowConfig::default(),
        ));
        let first_session = flow.snapshot().id;

        let pending = dispatch(&flow, "9876543210".to_string());
        let mut snapshots = flow.subscribe();
        snapshots.wait_for(|s| s.submitting).await.unwrap();

        dispatch(&flow, "abandon".to_string()).await.unwrap();

        let session = flow.snapshot();
        assert_ne!(session.id, first_session);
        assert_eq!(session.phase, FlowPhase::AwaitingPhone);
        assert!(!session.submitting);
        assert!(!pending.is_finished());
        pending.abort();
    }
}
