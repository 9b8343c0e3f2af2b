//! Rendering of events into mail subject and body.

use crate::config::DeliveryConfig;
use crate::event::Event;
use chrono::{Local, TimeZone};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// `2023-11-14 22:13:20 +0000`
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
);

/// Same layout for `chrono::Local` date-times.
const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedMessage {
    pub subject: String,
    pub body: String,
}

/// Zone used to render check timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Zone {
    /// Process time zone, with the offset in force at each rendered instant.
    Local,
    Fixed(UtcOffset),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Composer {
    zone: Zone,
}

impl Composer {
    /// Render timestamps in the process's time zone (`TZ`, else the system
    /// zone). Daylight-saving changes are honoured per timestamp.
    pub fn local() -> Self {
        Self { zone: Zone::Local }
    }

    /// Render every timestamp in one pinned offset.
    pub fn with_offset(offset: UtcOffset) -> Self {
        Self {
            zone: Zone::Fixed(offset),
        }
    }

    /// The pinned offset, or `None` for a local composer.
    pub fn fixed_offset(&self) -> Option<UtcOffset> {
        match self.zone {
            Zone::Local => None,
            Zone::Fixed(offset) => Some(offset),
        }
    }

    #[tracing::instrument(skip_all, fields(short_name = %event.short_name()))]
    pub fn compose(&self, event: &Event, config: &DeliveryConfig) -> ComposedMessage {
        ComposedMessage {
            subject: subject(event, config),
            body: self.body(event),
        }
    }

    pub fn body(&self, event: &Event) -> String {
        format!(
            "{output}\n\
             Host: {host}\n\
             Timestamp: {timestamp}\n\
             Address:  {address}\n\
             Check Name:  {check}\n\
             Command:  {command}\n\
             Status:  {status}\n\
             Occurrences:  {occurrences}\n",
            output = event.check_output,
            host = event.client_name,
            timestamp = self.timestamp(event.check_issued),
            address = event.client_address,
            check = event.check_name,
            command = event.check_command,
            status = event.check_status,
            occurrences = event.occurrences,
        )
    }

    /// Epoch seconds as a calendar date-time in this composer's zone.
    ///
    /// A local lookup that fails renders in UTC; values outside the
    /// representable range are rendered as the raw number.
    pub fn timestamp(&self, epoch_secs: i64) -> String {
        let local = match self.zone {
            Zone::Local => local_timestamp(epoch_secs),
            Zone::Fixed(_) => None,
        };
        local
            .or_else(|| {
                let offset = self.fixed_offset().unwrap_or(UtcOffset::UTC);
                OffsetDateTime::from_unix_timestamp(epoch_secs)
                    .ok()
                    .and_then(|dt| dt.to_offset(offset).format(TIMESTAMP_FORMAT).ok())
            })
            .unwrap_or_else(|| epoch_secs.to_string())
    }
}

fn local_timestamp(epoch_secs: i64) -> Option<String> {
    Local
        .timestamp_opt(epoch_secs, 0)
        .single()
        .map(|dt| dt.format(LOCAL_TIMESTAMP_FORMAT).to_string())
}

impl Default for Composer {
    fn default() -> Self {
        Self::local()
    }
}

pub fn subject(event: &Event, config: &DeliveryConfig) -> String {
    let headline = format!(
        "{} - {}: {}",
        event.action.label(),
        event.short_name(),
        event.notification
    );
    match config.subject_prefix.as_deref() {
        Some(prefix) => format!("{prefix} {headline}"),
        None => headline,
    }
}

/// Compose with timestamps in the process's time zone. See [`Composer::local`].
pub fn compose(event: &Event, config: &DeliveryConfig) -> ComposedMessage {
    Composer::local().compose(event, config)
}
