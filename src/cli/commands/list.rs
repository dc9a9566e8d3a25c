//! List command - show cache stores

use crate::cache::{format_bytes, CacheIdentity, CacheStorage, StoreSummary};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::PrecacheResult;
use console::style;

/// How a store relates to the running build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreRole {
    Current,
    Stale,
    Foreign,
}

impl StoreRole {
    fn of(identity: &CacheIdentity, name: &str) -> Self {
        if name == identity.name() {
            Self::Current
        } else if identity.owns(name) {
            Self::Stale
        } else {
            Self::Foreign
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Stale => "stale",
            Self::Foreign => "foreign",
        }
    }
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> PrecacheResult<()> {
    let storage = super::storage(config);
    let identity = config.identity();

    let stores = collect(&*storage).await?;

    match args.format {
        OutputFormat::Table => print_table(&stores, &identity),
        OutputFormat::Json => print_json(&stores, &identity)?,
        OutputFormat::Plain => {
            for store in &stores {
                println!("{}", store.name);
            }
        }
    }

    Ok(())
}

async fn collect(storage: &dyn CacheStorage) -> PrecacheResult<Vec<StoreSummary>> {
    let mut stores = Vec::new();
    for name in storage.keys().await? {
        if let Some(summary) = storage.summary(&name).await? {
            stores.push(summary);
        }
    }
    Ok(stores)
}

fn print_table(stores: &[StoreSummary], identity: &CacheIdentity) {
    if stores.is_empty() {
        println!("No cache stores found.");
        return;
    }

    println!(
        "{:<40} {:<8} {:<10} {:<10} {:<20}",
        "STORE", "ENTRIES", "SIZE", "ROLE", "CREATED"
    );
    println!("{}", "-".repeat(90));

    for store in stores {
        let role = StoreRole::of(identity, &store.name);
        let role_display = match role {
            StoreRole::Current => style(role.label()).green().to_string(),
            StoreRole::Stale => style(role.label()).yellow().to_string(),
            StoreRole::Foreign => style(role.label()).dim().to_string(),
        };

        println!(
            "{:<40} {:<8} {:<10} {:<10} {:<20}",
            store.name,
            store.entries,
            format_bytes(store.size_bytes),
            role_display,
            store.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("Total: {} store(s)", stores.len());
}

fn print_json(stores: &[StoreSummary], identity: &CacheIdentity) -> PrecacheResult<()> {
    #[derive(serde::Serialize)]
    struct StoreJson<'a> {
        name: &'a str,
        entries: usize,
        size_bytes: u64,
        role: &'static str,
        created_at: String,
    }

    let json: Vec<StoreJson<'_>> = stores
        .iter()
        .map(|s| StoreJson {
            name: &s.name,
            entries: s.entries,
            size_bytes: s.size_bytes,
            role: StoreRole::of(identity, &s.name).label(),
            created_at: s.created_at.to_rfc3339(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
