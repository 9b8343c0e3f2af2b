use crate::error::ConfigError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Section of the settings file holding the mailer's keys, unless overridden
/// with `MAILER_SECTION`.
pub const DEFAULT_SECTION: &str = "mailer-mailgun";

/// Settings file looked up in the working directory, unless overridden with
/// `MAILER_CONFIG`. The extension is resolved by the `config` crate.
pub const DEFAULT_CONFIG_PATH: &str = "mailer-mailgun";

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Deserialize)]
pub struct DeliveryConfig {
    pub mail_from: String,
    pub mail_to: String,
    pub mg_apikey: String,
    pub mg_domain: String,
    #[serde(default)]
    pub subject_prefix: Option<String>,
}

impl std::fmt::Debug for DeliveryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryConfig")
            .field("mail_from", &self.mail_from)
            .field("mail_to", &self.mail_to)
            .field("mg_apikey", &"<redacted>")
            .field("mg_domain", &self.mg_domain)
            .field("subject_prefix", &self.subject_prefix)
            .finish()
    }
}

impl DeliveryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("mail_from", &self.mail_from),
            ("mail_to", &self.mail_to),
            ("mg_apikey", &self.mg_apikey),
            ("mg_domain", &self.mg_domain),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct MailerSettings {
    pub delivery: DeliveryConfig,
    pub timeout_secs: u64,
}

impl MailerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load mailer settings from the settings file + environment overrides.
///
/// The file path comes from `MAILER_CONFIG` and the section from
/// `MAILER_SECTION`. Any `MAILER__<KEY>` variable (e.g. `MAILER__MAIL_TO`)
/// overrides the file value.
pub fn load_config() -> Result<MailerSettings, ConfigError> {
    let path = env::var("MAILER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let section = env::var("MAILER_SECTION").unwrap_or_else(|_| DEFAULT_SECTION.to_string());
    load_config_from(&path, &section)
}

pub fn load_config_from(path: &str, section: &str) -> Result<MailerSettings, ConfigError> {
    let file = Config::builder()
        .add_source(File::with_name(path))
        .build()?;
    settings_from_config(file, section, Some(Environment::with_prefix("MAILER").separator("__")))
}

/// Resolve settings from an already built `Config`.
///
/// When `section` names a table the mailer keys are read from it; when it is
/// absent they are read from the root of the document. A `section` key that
/// is not a table is an error. `env` is layered on top.
pub fn settings_from_config(
    file: Config,
    section: &str,
    env: Option<Environment>,
) -> Result<MailerSettings, ConfigError> {
    let mut builder = Config::builder();
    match file.get_table(section) {
        Ok(table) => {
            for (key, value) in table {
                builder = builder.set_default(key, value)?;
            }
        }
        Err(config::ConfigError::NotFound(_)) => builder = builder.add_source(file),
        Err(e) => return Err(e.into()),
    }
    if let Some(env) = env {
        builder = builder.add_source(env);
    }
    let cfg = builder.build()?;

    let timeout_secs = match cfg.get::<u64>("timeout_secs") {
        Ok(secs) => secs,
        Err(config::ConfigError::NotFound(_)) => DEFAULT_TIMEOUT_SECS,
        Err(e) => return Err(e.into()),
    };
    if timeout_secs == 0 {
        return Err(ConfigError::Validation("timeout_secs must be > 0".into()));
    }

    let delivery: DeliveryConfig = cfg.try_deserialize()?;
    delivery.validate()?;

    Ok(MailerSettings {
        delivery,
        timeout_secs,
    })
}
