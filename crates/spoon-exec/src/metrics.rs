//! Operation summaries on the tracing subscriber.
//!
//! The binary decides where they go (stderr, filtered by `SPOON_LOG`).

pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::debug_span!("spoon", event);
    let _entered = span.enter();
    let fields = key_values
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!(%event, %fields, "metric");
}
