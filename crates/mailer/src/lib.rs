//! Alert mailer for Sensu-style monitoring pipelines.
//!
//! Turns a check event into a plain-text email and delivers it through the
//! Mailgun API within a bounded time window, reporting the outcome back to the
//! caller.

pub mod compose;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod logging;
pub mod mailgun;
pub mod tls;

pub use crate::compose::{ComposedMessage, Composer, compose};
pub use crate::config::{DeliveryConfig, MailerSettings, load_config};
pub use crate::dispatch::{DEFAULT_TIMEOUT, DeliveryOutcome, Dispatcher, dispatch, notify};
pub use crate::error::{ConfigError, DispatchError, InputError, MailError};
pub use crate::event::{Action, Event};
pub use crate::mailgun::{MailSender, MailgunClient, MailgunRegion, OutgoingMail};
