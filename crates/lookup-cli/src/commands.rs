//! Subcommand handlers

use crate::scripted::CannedResolver;
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use futures::future::join_all;
use lookup_engine::{
    CacheEntry, EngineConfig, FeatureProfile, FullRecord, LookupEngine, SearchState,
    StaticDetailProvider,
};
use lookup_http::{EndpointConfig, HttpDetailProvider, HttpGenerator, HttpResolver};
use lookup_index::{FileIndexProvider, IndexStore, ItemId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const API_KEY_VAR: &str = "LOOKUP_API_KEY";

/// Profile preset, or the TOML file given with `--config`
fn load_config(args: &ArgMatches) -> Result<(FeatureProfile, EngineConfig)> {
    let profile: FeatureProfile = args
        .get_one::<String>("profile")
        .map_or("statutes", String::as_str)
        .parse()?;
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => profile.config(),
    };
    Ok((profile, config))
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .ok_or_else(|| anyhow!("--{name} is required"))
}

fn load_store(path: &Path) -> Result<IndexStore> {
    IndexStore::from_provider(&FileIndexProvider::new(path))
        .with_context(|| format!("loading dataset {}", path.display()))
}

fn endpoint(args: &ArgMatches, name: &str) -> Option<EndpointConfig> {
    let url = args.get_one::<String>(name)?;
    let mut config = EndpointConfig::new(url);
    let key = args
        .get_one::<String>("api-key")
        .cloned()
        .or_else(|| std::env::var(API_KEY_VAR).ok());
    if let Some(key) = key {
        config = config.with_api_key(key);
    }
    Some(config)
}

fn result_ids(state: &SearchState) -> Vec<ItemId> {
    match state {
        SearchState::LocalHit(items) => items.iter().map(|item| item.id.clone()).collect(),
        SearchState::AiHit(record) => vec![record.id.clone()],
        _ => Vec::new(),
    }
}

fn print_state(engine: &LookupEngine, state: &SearchState) {
    match state {
        SearchState::Idle => println!("(empty query)"),
        SearchState::LocalHit(items) => {
            for group in engine.store().group(items.iter()) {
                println!("{}", group.category);
                for item in group.items {
                    println!("  {:<14} {}", item.id, item.title());
                }
            }
        }
        SearchState::Empty { pending: false } => println!("No local matches."),
        SearchState::Empty { pending: true } | SearchState::AiSearching => {
            println!("Still searching...");
        }
        SearchState::AiHit(record) => {
            println!("{} (generated)", record.category);
            println!("  {:<14} {}", record.id, record.title());
            println!("  {}", record.description());
        }
        SearchState::AiMiss => println!("No matching result found."),
    }
}

fn print_detail(id: &ItemId, entry: &CacheEntry<FullRecord>) {
    println!("[{id}]");
    match entry {
        CacheEntry::Ready(record) => {
            for (name, value) in record.fields.iter().chain(record.details.iter()) {
                println!("  {name}: {value}");
            }
        }
        CacheEntry::Error(message) => println!("  error: {message}"),
        CacheEntry::Absent | CacheEntry::Loading => println!("  (not loaded)"),
    }
}

/// `lookup search`
pub(crate) async fn search(args: &ArgMatches) -> Result<()> {
    let (profile, config) = load_config(args)?;
    let dataset = required_path(args, "dataset")?;
    let query = args
        .get_one::<String>("query")
        .ok_or_else(|| anyhow!("a query is required"))?;

    let mut builder = LookupEngine::builder(config).store(load_store(dataset)?);

    match endpoint(args, "resolver-url") {
        Some(endpoint) if profile.uses_fallback() => {
            builder = builder.resolver(Arc::new(HttpResolver::new(&endpoint)?));
        }
        Some(_) => tracing::warn!("{profile} has no generative fallback, ignoring --resolver-url"),
        None => {}
    }
    match endpoint(args, "detail-url") {
        Some(endpoint) => {
            builder = builder.detail_provider(Arc::new(HttpDetailProvider::new(&endpoint)?));
        }
        None => {
            let records = StaticDetailProvider::from_file(dataset)
                .with_context(|| format!("loading records from {}", dataset.display()))?;
            builder = builder.detail_provider(Arc::new(records));
        }
    }
    if let Some(endpoint) = endpoint(args, "generator-url") {
        builder = builder.generator(Arc::new(HttpGenerator::new(&endpoint)?));
    }

    let engine = builder.build()?;
    engine.set_query(query);
    let state = engine.settled_state().await;
    print_state(&engine, &state);

    let ids = result_ids(&state);
    if args.get_flag("expand") && !ids.is_empty() {
        println!();
        for id in &ids {
            engine.expand(id.clone());
        }
        let entries = join_all(ids.iter().map(|id| engine.settled_detail(id))).await;
        for (id, entry) in ids.iter().zip(&entries) {
            print_detail(id, entry);
        }
    }

    if args.get_flag("derive") && !ids.is_empty() {
        println!();
        let started: Vec<&ItemId> = ids
            .iter()
            .filter(|id| engine.generate_derived((*id).clone()).is_some())
            .collect();
        if started.is_empty() {
            tracing::warn!("no derived field generator configured (--generator-url)");
        }
        join_all(started.iter().map(|id| engine.settled_derived(id))).await;
        for id in started {
            println!("[{id}]");
            println!("{}", engine.derived_text(id).unwrap_or_default());
        }
    }
    Ok(())
}

/// `lookup simulate`
pub(crate) async fn simulate(args: &ArgMatches) -> Result<()> {
    let (profile, mut config) = load_config(args)?;
    if let Some(ms) = args.get_one::<u64>("debounce-ms") {
        config = config.with_debounce(Duration::from_millis(*ms));
    }
    let store = match args.get_one::<PathBuf>("dataset") {
        Some(path) => load_store(path)?,
        None => IndexStore::default(),
    };
    let latency = Duration::from_millis(args.get_one::<u64>("latency-ms").copied().unwrap_or(1500));
    let interval = Duration::from_millis(args.get_one::<u64>("interval-ms").copied().unwrap_or(120));
    let text = args
        .get_one::<String>("type")
        .ok_or_else(|| anyhow!("--type is required"))?;

    let resolver = CannedResolver::new(latency).with_specs(
        args.get_many::<String>("answer")
            .into_iter()
            .flatten()
            .map(String::as_str),
    )?;
    tracing::debug!("{} canned answers, latency {:?}", resolver.len(), latency);

    let mut builder = LookupEngine::builder(config).store(store);
    if profile.uses_fallback() {
        builder = builder.resolver(Arc::new(resolver));
    }
    let engine = builder.build()?;

    let start = Instant::now();
    let mut rx = engine.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            println!("{:>6}ms  {state}", start.elapsed().as_millis());
        }
    });

    let mut typed = String::new();
    for ch in text.chars() {
        typed.push(ch);
        println!("{:>6}ms  > {typed:?}", start.elapsed().as_millis());
        engine.set_query(&typed);
        tokio::time::sleep(interval).await;
    }

    let settled = engine.settled_state().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    printer.abort();

    println!();
    print_state(&engine, &settled);
    println!();
    println!("{}", serde_json::to_string_pretty(&engine.stats())?);
    for entry in engine.history() {
        let outcome = entry.hit.map_or_else(|| "miss".to_string(), |id| id.to_string());
        println!("history: {:?} -> {outcome}", entry.query);
    }
    Ok(())
}

/// `lookup categories`
pub(crate) fn categories(args: &ArgMatches) -> Result<()> {
    let (_, config) = load_config(args)?;
    let store = load_store(required_path(args, "dataset")?)?
        .with_category_order(config.category_order());
    for group in store.group(store.items()) {
        println!("{} ({})", group.category, group.items.len());
    }
    Ok(())
}

/// `lookup config`
pub(crate) fn config(args: &ArgMatches) -> Result<()> {
    let (_, config) = load_config(args)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
