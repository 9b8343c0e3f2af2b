use color_eyre::eyre::WrapErr;
use mailer_mailgun::logging::initialize_tracing;
use mailer_mailgun::{Composer, DeliveryOutcome, Event, load_config, notify};
use std::io::Read;
use std::process::ExitCode;

fn main() -> color_eyre::eyre::Result<ExitCode> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    initialize_tracing();

    let settings = load_config().wrap_err("Failed to load mailer configuration")?;

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .wrap_err("Failed to read event from stdin")?;
    let event = Event::from_json(&raw).wrap_err("Failed to parse event")?;
    let composer = Composer::local();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(notify(
        &composer,
        &event,
        &settings.delivery,
        settings.timeout(),
    ))?;

    // The only line written to stdout per attempt.
    println!("{outcome}");

    // A timeout is reported but not treated as a handler failure.
    Ok(match outcome {
        DeliveryOutcome::Sent { .. } | DeliveryOutcome::TimedOut { .. } => ExitCode::SUCCESS,
        DeliveryOutcome::SendFailed { .. } => ExitCode::FAILURE,
    })
}
