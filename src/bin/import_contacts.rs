//! Utility binary for loading contacts into the record store
//!
//! Stands in for the mail sync process when seeding a deployment:
//!
//! ```text
//! import_contacts <namespace_id> <contacts.json>
//! ```
//!
//! The file holds a JSON array of `{"id"?, "name", "email"}` objects.
//! Entries without an id get a fresh one; entries with an existing id are
//! updated in place.

use inbox_api::config::Config;
use inbox_api::models::{generate_public_id, Contact};
use inbox_api::store::InboxDb;
use serde::Deserialize;
use std::env;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ContactEntry {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let (namespace_id, path) = match args.as_slice() {
        [_, namespace_id, path] => (namespace_id.clone(), path.clone()),
        _ => anyhow::bail!("usage: import_contacts <namespace_id> <contacts.json>"),
    };

    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
    let entries: Vec<ContactEntry> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid contacts file {}: {}", path, e))?;

    let config = Config::from_env();
    let db = InboxDb::new(&config.storage.database_path).await?;

    let mut imported = 0usize;
    for entry in entries {
        let id = entry
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_public_id);
        let contact = Contact::new(id, namespace_id.clone(), entry.name, entry.email);
        db.upsert_contact(&contact).await?;
        imported += 1;
    }

    info!(
        namespace_id = %namespace_id,
        imported,
        database = %config.storage.database_path.display(),
        "Contacts imported"
    );
    println!("Imported {} contacts into namespace {}", imported, namespace_id);
    Ok(())
}
