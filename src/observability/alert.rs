use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use url::Url;

/// Error-level event shipped to the operational alert webhook. Used for
/// conditions that need a human, e.g. stock decrements that failed after a
/// payment was already confirmed.
#[derive(Clone, Debug)]
pub(crate) struct AlertEvent {
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) component: String,
    pub(crate) target: String,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
}

#[derive(Clone)]
pub(crate) struct AlertNotifier {
    tx: mpsc::Sender<AlertEvent>,
}

impl AlertNotifier {
    pub(crate) fn new(webhook_url: Url) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertEvent>(256);
        let http = Arc::new(reqwest::Client::new());

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let body = json!({
                    "timestamp": event.timestamp.to_rfc3339(),
                    "level": "ERROR",
                    "component": event.component,
                    "target": event.target,
                    "message": event.message,
                    "fields": event.fields,
                });

                let result = http.post(webhook_url.clone()).json(&body).send().await;
                match result {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => {
                        warn!(status = %resp.status(), "Alert webhook rejected event");
                    }
                    Err(error) => {
                        warn!(error = %error, "Alert webhook delivery failed");
                    }
                }
            }
        });

        Self { tx }
    }

    pub(crate) fn try_notify(&self, event: AlertEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Alert queue full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Alert queue closed; dropping event");
            }
        }
    }
}

pub(crate) struct AlertLayer {
    notifier: AlertNotifier,
    component: String,
}

impl AlertLayer {
    pub(crate) fn new(notifier: AlertNotifier, component: String) -> Self {
        Self {
            notifier,
            component,
        }
    }
}

#[derive(Default)]
struct FieldMapVisitor {
    values: BTreeMap<String, String>,
}

impl Visit for FieldMapVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.values
            .insert(field.name().to_string(), redact(field.name(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.values
            .insert(field.name().to_string(), redact(field.name(), value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.values
            .insert(field.name().to_string(), redact(field.name(), value.to_string()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.values
            .insert(field.name().to_string(), redact(field.name(), value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.values
            .insert(field.name().to_string(), redact(field.name(), value.to_string()));
    }
}

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }

        let mut visitor = FieldMapVisitor::default();
        event.record(&mut visitor);

        let mut message = None;
        if let Some(raw) = visitor.values.remove("message") {
            message = Some(unquote_debug_string(&raw));
        }

        self.notifier.try_notify(AlertEvent {
            timestamp: Utc::now(),
            component: self.component.clone(),
            target: event.metadata().target().to_string(),
            message,
            fields: visitor.values,
        });
    }
}

fn unquote_debug_string(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        return trimmed[1..trimmed.len() - 1].to_string();
    }
    trimmed.to_string()
}

fn redact(field_name: &str, value: String) -> String {
    if is_sensitive_key(field_name) {
        return "[REDACTED]".to_string();
    }
    value
}

fn is_sensitive_key(field_name: &str) -> bool {
    let field = field_name.to_ascii_lowercase();
    field.contains("secret")
        || field.contains("password")
        || field.contains("token")
        || field.contains("signature")
        || field.contains("authorization")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_bearing_fields_are_redacted() {
        assert!(is_sensitive_key("gateway_signature"));
        assert!(is_sensitive_key("IDENTITY_JWT_SECRET"));
        assert!(!is_sensitive_key("order_ref"));
    }

    #[test]
    fn debug_quoted_messages_are_unquoted() {
        assert_eq!(unquote_debug_string("\"boom\""), "boom");
        assert_eq!(unquote_debug_string("boom"), "boom");
    }
}
