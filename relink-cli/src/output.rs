use serde::Serialize;

pub const SCHEMA_VERSION: &str = "relink-v1";

/// Standard envelope for machine-consumable responses.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub schema_version: &'static str,
    pub kind: &'static str,
    pub data: T,
}

pub fn envelope<T>(kind: &'static str, data: T) -> Envelope<T> {
    Envelope {
        schema_version: SCHEMA_VERSION,
        kind,
        data,
    }
}

/// Pretty-print an envelope to stdout
pub fn print_json<T: Serialize>(kind: &'static str, data: T) -> anyhow::Result<()> {
    let payload = serde_json::to_string_pretty(&envelope(kind, data))?;
    println!("{}", payload);
    Ok(())
}
