mod alert;

use alert::{AlertLayer, AlertNotifier};
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

/// Installs the tracing stack: env-filtered fmt output plus, when
/// `ALERT_WEBHOOK_URL` is set, a layer that forwards ERROR events to the
/// operational alert webhook.
pub fn init_observability(component: &str) -> Result<()> {
    let raw_webhook = std::env::var("ALERT_WEBHOOK_URL").ok();
    let mut webhook_warning = None;

    let alert_layer = raw_webhook.as_deref().and_then(|raw| match Url::parse(raw) {
        Ok(url) => Some(AlertLayer::new(
            AlertNotifier::new(url),
            component.to_string(),
        )),
        Err(err) => {
            webhook_warning = Some(format!("ALERT_WEBHOOK_URL is not a valid url: {err}"));
            None
        }
    });

    // Default log level stays at info; RUST_LOG overrides it.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    if let Some(warning) = webhook_warning {
        warn!(component, warning = %warning, "Observability config warning");
    }

    if raw_webhook.is_some() {
        info!(component, "Operational alert webhook enabled");
    } else {
        info!(component, "Operational alert webhook disabled");
    }

    Ok(())
}
