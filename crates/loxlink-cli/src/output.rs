//! Event rendering for the terminal and for JSON lines.

use loxlink_client::ConnectionEvent;
use loxlink_protocol::{FrameKind, Message};
use serde_json::{Value, json};

/// Output format for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tty,
    Json,
}

/// Renders one event as a single line.
pub fn render(event: &ConnectionEvent, format: OutputFormat) -> String {
    match format {
        OutputFormat::Tty => render_tty(event),
        OutputFormat::Json => render_json(event).to_string(),
    }
}

fn render_tty(event: &ConnectionEvent) -> String {
    let name = event.name();
    match event {
        ConnectionEvent::Connected => name.to_string(),
        ConnectionEvent::Closed { graceful, reason } => {
            let how = if *graceful { "graceful" } else { "unexpected" };
            format!("{name} {how}: {reason}")
        }
        ConnectionEvent::ConnectFailed { reason } | ConnectionEvent::ConnectionError { reason } => {
            format!("{name}: {reason}")
        }
        ConnectionEvent::Sent(text) => format!("{name} {text}"),
        ConnectionEvent::Header(header) => header.to_string(),
        ConnectionEvent::Text(text) => match &text.reply {
            Some(reply) => format!(
                "{name} {} code={} value={}",
                reply.control,
                reply.code.map_or_else(|| "-".to_string(), |c| c.to_string()),
                reply.value
            ),
            None => format!("{name} {}", text.raw),
        },
        ConnectionEvent::File(file) => format!(
            "{name} {} bytes for {}",
            file.payload.len(),
            file.request.as_deref().unwrap_or("unknown request")
        ),
        ConnectionEvent::ValueTable(values) => {
            let mut out = format!("{name} ({})", values.len());
            for value in values {
                out.push_str(&format!("\n  {} = {}", value.uuid, value.value));
            }
            out
        }
        ConnectionEvent::TextTable(texts) => {
            let mut out = format!("{name} ({})", texts.len());
            for text in texts {
                out.push_str(&format!("\n  {} = {:?}", text.uuid, text.text));
            }
            out
        }
        ConnectionEvent::DaytimerTable(daytimers) => {
            let mut out = format!("{name} ({})", daytimers.len());
            for daytimer in daytimers {
                out.push_str(&format!(
                    "\n  {} default={} entries={}",
                    daytimer.uuid,
                    daytimer.default_value,
                    daytimer.entries.len()
                ));
            }
            out
        }
        ConnectionEvent::WeatherTable(weather) => {
            let mut out = format!("{name} ({})", weather.len());
            for w in weather {
                out.push_str(&format!(
                    "\n  {} last_update={} entries={}",
                    w.uuid,
                    w.last_update_time()
                        .map_or_else(|| w.last_update.to_string(), |t| t.to_rfc3339()),
                    w.entries.len()
                ));
            }
            out
        }
        ConnectionEvent::Invalid { expected, message } => format!(
            "{name}: {} frame of {} bytes while expecting {expected}",
            frame_name(message),
            message.len()
        ),
        ConnectionEvent::CorruptedPayload { state, error } => {
            format!("{name} in {state}: {error}")
        }
        ConnectionEvent::Keepalive(latency) => {
            format!("{name} {}ms", latency.as_millis())
        }
    }
}

fn render_json(event: &ConnectionEvent) -> Value {
    let data = match event {
        ConnectionEvent::Connected => Value::Null,
        ConnectionEvent::Closed { graceful, reason } => {
            json!({ "graceful": graceful, "reason": reason })
        }
        ConnectionEvent::ConnectFailed { reason } | ConnectionEvent::ConnectionError { reason } => {
            json!({ "reason": reason })
        }
        ConnectionEvent::Sent(text) => json!(text),
        ConnectionEvent::Header(header) => json!(header),
        ConnectionEvent::Text(text) => json!(text),
        ConnectionEvent::File(file) => json!({
            "request": file.request,
            "frame": file.payload.frame_kind(),
            "length": file.payload.len(),
            "text": file.as_text(),
        }),
        ConnectionEvent::ValueTable(values) => json!(values),
        ConnectionEvent::TextTable(texts) => json!(texts),
        ConnectionEvent::DaytimerTable(daytimers) => json!(daytimers),
        ConnectionEvent::WeatherTable(weather) => json!(weather),
        ConnectionEvent::Invalid { expected, message } => json!({
            "expected": expected,
            "frame": message.frame_kind(),
            "length": message.len(),
        }),
        ConnectionEvent::CorruptedPayload { state, error } => json!({
            "state": state,
            "error": error.to_string(),
        }),
        ConnectionEvent::Keepalive(latency) => json!({
            "latency_ms": latency.as_millis() as u64,
        }),
    };

    json!({ "event": event.name(), "data": data })
}

fn frame_name(message: &Message) -> &'static str {
    match message.frame_kind() {
        FrameKind::Binary => "binary",
        FrameKind::Text => "text",
    }
}
