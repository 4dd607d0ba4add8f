#![forbid(unsafe_code)]

//! Walkthrough of fieldwatch observation.
//!
//! Set `RUST_LOG=fieldwatch=trace` to see the registry's own events.

use fieldwatch::{ChangeRecord, Record};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_change(change: &ChangeRecord) {
    let object = change
        .object()
        .to_json()
        .map_or_else(|e| format!("<{e}>"), |json| json.to_string());
    println!(
        "{{ object: {object}, property: {:?}, oldValue: {}, newValue: {} }}",
        change.property(),
        change.old_value(),
        change.new_value()
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let person = match Record::from_json(&json!({"Id": 1, "Name": "Brad", "Age": 12})) {
        Ok(person) => person,
        Err(e) => {
            eprintln!("Failed to build record: {e}");
            std::process::exit(1);
        }
    };

    let observation = fieldwatch::observe(&person, print_change);

    info!("writing Name");
    person.set("Name", "Krzysztof");
    fieldwatch::run_pending();

    info!("disposing observer");
    observation.dispose();
    fieldwatch::run_pending();

    info!("writing Age, nothing should print");
    person.set("Age", 33);
    let ran = fieldwatch::run_until_idle();
    info!(tasks = ran, "queue drained");
}
