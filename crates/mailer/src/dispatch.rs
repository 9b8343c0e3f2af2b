//! Bounded delivery of a composed message.
//!
//! One send attempt is raced against a timer. The send runs on its own tokio
//! task so the caller stops waiting when the window closes; the task itself is
//! left to finish in the background and its result is dropped.

use crate::compose::{ComposedMessage, Composer};
use crate::config::DeliveryConfig;
use crate::error::{DispatchError, MailError};
use crate::event::{Action, Event};
use crate::logging::OUTCOME_TARGET;
use crate::mailgun::{MailSender, MailgunClient, OutgoingMail};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum DeliveryOutcome {
    Sent {
        short_name: String,
        recipient: String,
    },
    TimedOut {
        short_name: String,
        action: Action,
    },
    SendFailed {
        short_name: String,
        error: MailError,
    },
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent { .. })
    }

    pub fn short_name(&self) -> &str {
        match self {
            DeliveryOutcome::Sent { short_name, .. }
            | DeliveryOutcome::TimedOut { short_name, .. }
            | DeliveryOutcome::SendFailed { short_name, .. } => short_name,
        }
    }
}

/// The single log line reported for a dispatch attempt.
impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Sent {
                short_name,
                recipient,
            } => write!(f, "mail -- sent alert for {short_name} to {recipient}"),
            DeliveryOutcome::TimedOut { short_name, action } => write!(
                f,
                "mail -- timed out while attempting to {action} an incident -- {short_name}"
            ),
            DeliveryOutcome::SendFailed { short_name, error } => {
                write!(f, "mail -- failed to send alert for {short_name} -- {error}")
            }
        }
    }
}

pub struct Dispatcher<S> {
    sender: Arc<S>,
    timeout: Duration,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            timeout: self.timeout,
        }
    }
}

impl Dispatcher<MailgunClient> {
    /// Build a dispatcher backed by Mailgun using the configured credential.
    pub fn mailgun(config: &DeliveryConfig, timeout: Duration) -> Result<Self, DispatchError> {
        let client = MailgunClient::new(config.mg_apikey.clone())?;
        Ok(Self::new(client, timeout))
    }
}

impl<S: MailSender> Dispatcher<S> {
    pub fn new(sender: S, timeout: Duration) -> Self {
        Self::from_shared(Arc::new(sender), timeout)
    }

    pub fn from_shared(sender: Arc<S>, timeout: Duration) -> Self {
        Self { sender, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Make one bounded attempt to deliver `message`.
    ///
    /// Timeouts and failures reported by the sender become outcomes. A send
    /// task that panics or is cancelled is not recovered and is returned as
    /// `DispatchError::Aborted`.
    #[tracing::instrument(
        name = "dispatch",
        skip_all,
        fields(short_name = %event.short_name(), action = %event.action, timeout = ?self.timeout)
    )]
    pub async fn dispatch(
        &self,
        message: ComposedMessage,
        config: &DeliveryConfig,
        event: &Event,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let short_name = event.short_name();
        let mail = OutgoingMail {
            from: config.mail_from.clone(),
            to: config.mail_to.clone(),
            subject: message.subject,
            text: message.body,
        };
        let domain = config.mg_domain.clone();
        let sender = self.sender.clone();

        let task = tokio::spawn(async move { sender.send_message(&domain, &mail).await });

        // Dropping the JoinHandle on timeout detaches the task without aborting it.
        let outcome = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(()))) => DeliveryOutcome::Sent {
                short_name,
                recipient: config.mail_to.clone(),
            },
            Ok(Ok(Err(error))) => DeliveryOutcome::SendFailed { short_name, error },
            Ok(Err(join_error)) => {
                error!(
                    name = "dispatch.send_task_aborted",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    error = %join_error,
                    short_name = %short_name,
                    message = "Mail send task did not complete"
                );
                return Err(DispatchError::Aborted(join_error.to_string()));
            }
            Err(_) => DeliveryOutcome::TimedOut {
                short_name,
                action: event.action,
            },
        };

        match &outcome {
            DeliveryOutcome::Sent { .. } => info!(target: OUTCOME_TARGET, "{outcome}"),
            DeliveryOutcome::TimedOut { .. } => warn!(target: OUTCOME_TARGET, "{outcome}"),
            DeliveryOutcome::SendFailed { error, .. } => {
                error!(target: OUTCOME_TARGET, retryable = error.is_retryable(), "{outcome}")
            }
        }

        Ok(outcome)
    }

    /// Validate, compose and dispatch in one step.
    pub async fn notify(
        &self,
        composer: &Composer,
        event: &Event,
        config: &DeliveryConfig,
    ) -> Result<DeliveryOutcome, DispatchError> {
        event.validate()?;
        config.validate()?;
        let message = composer.compose(event, config);
        self.dispatch(message, config, event).await
    }
}

/// Deliver `message` through Mailgun, waiting at most `timeout`.
pub async fn dispatch(
    message: ComposedMessage,
    config: &DeliveryConfig,
    event: &Event,
    timeout: Duration,
) -> Result<DeliveryOutcome, DispatchError> {
    Dispatcher::mailgun(config, timeout)?
        .dispatch(message, config, event)
        .await
}

/// Validate the inputs, compose the message and deliver it through Mailgun.
pub async fn notify(
    composer: &Composer,
    event: &Event,
    config: &DeliveryConfig,
    timeout: Duration,
) -> Result<DeliveryOutcome, DispatchError> {
    Dispatcher::mailgun(config, timeout)?
        .notify(composer, event, config)
        .await
}
