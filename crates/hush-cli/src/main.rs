mod fetch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use hush_core::{
    AgentConfig, AgentSnapshot, CURRENT_VERSION, DialogueGate, DialogueOutcome,
    INSTABILITY_THRESHOLD, KnowledgeBase, NetworkState, Signal, SourceEndpoint, SourceRegistry,
    SyncReport, Synchronizer, TensionEvent, TensionState, export_json, import_json,
};
use hush_store::{SharedStore, Store};

use fetch::HttpFetcher;

#[derive(Parser)]
#[command(name = "hush", about = "Tension-gated dialogue agent CLI")]
struct Cli {
    /// Path to a TOML config file (default: ./hush.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one input through the dialogue gate
    Respond {
        /// Input text
        text: String,
    },

    /// Run a synchronization pass now (same path as a reconnect)
    Sync,

    /// Signal that connectivity returned
    Online,

    /// Signal that connectivity was lost
    Offline,

    /// Manage external sources
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Show agent statistics
    Stats,

    /// Export agent state to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import agent state from a JSON file
    Import {
        /// Input file path
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum SourceAction {
    /// Register an endpoint
    Add { name: String, url: String },
    /// List endpoints in registration order
    List,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Respond { text } => cmd_respond(&cli, text),
        Commands::Sync | Commands::Online => cmd_online(&cli).await,
        Commands::Offline => cmd_offline(&cli),
        Commands::Source { action } => cmd_source(&cli, action),
        Commands::Stats => cmd_stats(&cli),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
    }
}

// ---------------------------------------------------------------------------
// Agent assembly
// ---------------------------------------------------------------------------

/// Base directory for agent state.
/// Priority: HUSH_DATA_DIR env > ~/.hush
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HUSH_DATA_DIR") {
        return PathBuf::from(dir);
    }
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".hush")
}

fn load_config(explicit: Option<&Path>) -> Result<AgentConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from("hush.toml");
            if !default.is_file() {
                return Ok(AgentConfig::default());
            }
            default
        }
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AgentConfig =
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}

/// Everything one command invocation operates on. State is loaded from the
/// store on open and written back by `persist`.
struct Agent {
    shared: SharedStore,
    config: AgentConfig,
    knowledge: KnowledgeBase,
    gate: DialogueGate,
    tension: TensionState,
    sync: Synchronizer,
    registry: SourceRegistry,
}

fn open_agent(cli: &Cli) -> Result<Agent> {
    let config = load_config(cli.config.as_deref())?;

    let dir = data_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let store = Store::open(&dir.join("hush.db"))
        .map_err(|e| anyhow::anyhow!("failed to open store: {e}"))?;
    let shared = SharedStore::new(store);

    let (entries, dialogue, tension, network, persisted_sources) = {
        let store = shared.lock();
        (
            store
                .load_entries()
                .map_err(|e| anyhow::anyhow!("failed to load entries: {e}"))?,
            store
                .get_json::<hush_core::DialogueState>("dialogue")
                .map_err(|e| anyhow::anyhow!("failed to load dialogue state: {e}"))?,
            store
                .get_json::<TensionState>("tension")
                .map_err(|e| anyhow::anyhow!("failed to load tension state: {e}"))?,
            store
                .get_json::<NetworkState>("network")
                .map_err(|e| anyhow::anyhow!("failed to load network state: {e}"))?,
            store
                .load_sources()
                .map_err(|e| anyhow::anyhow!("failed to load sources: {e}"))?,
        )
    };

    let mut knowledge = KnowledgeBase::with_archive(Arc::new(shared.clone()));
    knowledge.restore(entries);

    let mut gate = match dialogue {
        Some(state) => DialogueGate::from_state(state),
        None => DialogueGate::new(),
    };
    let tension = tension.unwrap_or_else(|| TensionState::new(config.initial_tension));
    let mut sync = Synchronizer::from_state(network.unwrap_or_else(|| NetworkState::new(true)));

    let fetcher =
        HttpFetcher::new(config.fetch_timeout_secs).map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut registry = SourceRegistry::new(Arc::new(fetcher));
    for source in &persisted_sources {
        registry.register_endpoint(source.name.clone(), source.url.clone());
    }
    for source in &config.sources {
        registry.register_endpoint(source.name.clone(), source.url.clone());
    }

    sync.init(&mut gate, &mut registry);

    Ok(Agent {
        shared,
        config,
        knowledge,
        gate,
        tension,
        sync,
        registry,
    })
}

fn persist(agent: &Agent) -> Result<()> {
    let store = agent.shared.lock();
    store
        .save_entries(agent.knowledge.entries())
        .map_err(|e| anyhow::anyhow!("failed to save entries: {e}"))?;
    store
        .set_json("dialogue", &agent.gate.state())
        .map_err(|e| anyhow::anyhow!("failed to save dialogue state: {e}"))?;
    store
        .set_json("tension", &agent.tension)
        .map_err(|e| anyhow::anyhow!("failed to save tension state: {e}"))?;
    store
        .set_json("network", agent.sync.network())
        .map_err(|e| anyhow::anyhow!("failed to save network state: {e}"))?;
    store
        .save_sources(&registered_endpoints(&agent.registry))
        .map_err(|e| anyhow::anyhow!("failed to save sources: {e}"))?;
    store
        .set_metadata("agent_name", &agent.config.agent_name)
        .map_err(|e| anyhow::anyhow!("failed to save agent name: {e}"))?;
    Ok(())
}

fn registered_endpoints(registry: &SourceRegistry) -> Vec<SourceEndpoint> {
    registry
        .sources()
        .iter()
        .map(|s| SourceEndpoint {
            name: s.name.clone(),
            url: s.url.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_respond(cli: &Cli, text: &str) -> Result<()> {
    let mut agent = open_agent(cli)?;
    let mut rng = SmallRng::from_os_rng();

    let signal = Signal::text(text);
    let processed = !signal.is_empty();
    let outcome = agent
        .gate
        .process_input(&mut agent.knowledge, &signal, &mut rng);

    match &outcome {
        DialogueOutcome::Silence => {
            if processed {
                agent.tension.apply(TensionEvent::Routine);
            }
            println!("(silence)");
        }
        DialogueOutcome::Respond(v) => {
            agent.tension.apply(TensionEvent::Outward);
            println!(
                "emitted: magnitude={:.3} entropy={:.3} observed_at={}",
                v.magnitude, v.entropy_rate, v.observed_at
            );
        }
    }

    // Running hot: the machine may de-escalate itself, gate permitting.
    if agent.tension.value() >= INSTABILITY_THRESHOLD {
        match agent
            .tension
            .try_self_correct(&mut rng, agent.config.correction_probability)
        {
            Ok(value) => tracing::info!("self-correction applied, tension now {value:.2}"),
            Err(e) => tracing::debug!("self-correction refused: {e}"),
        }
    }

    if cli.verbose {
        let matrix = agent.tension.control_matrix();
        eprintln!(
            "--- gate: silence={:.2}, tension={:.2} | machine: value={:.2}, intensity={:.2}, rigor={:.2} ---",
            agent.gate.silence_level(),
            agent.gate.tension(),
            agent.tension.value(),
            matrix.intensity,
            matrix.rigor,
        );
    }

    persist(&agent)
}

async fn cmd_online(cli: &Cli) -> Result<()> {
    let mut agent = open_agent(cli)?;

    let report = agent
        .sync
        .handle_online(&mut agent.gate, &mut agent.registry, &mut agent.knowledge)
        .await;
    print_report(&report);

    persist(&agent)
}

fn cmd_offline(cli: &Cli) -> Result<()> {
    let mut agent = open_agent(cli)?;

    agent
        .sync
        .handle_offline(&mut agent.gate, &mut agent.registry);
    println!("offline: silence forced to 1.0, external I/O disabled");

    persist(&agent)
}

fn print_report(report: &SyncReport) {
    println!(
        "sync pass {}: integrated={}, skipped={}, failed={}",
        report.pass_id,
        report.integrated,
        report.skipped,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  failed {}: {}", failure.name, failure.message);
    }
}

fn cmd_source(cli: &Cli, action: &SourceAction) -> Result<()> {
    let mut agent = open_agent(cli)?;

    match action {
        SourceAction::Add { name, url } => {
            if agent.registry.register_endpoint(name.clone(), url.clone()) {
                println!("registered {name} -> {url}");
            } else {
                println!("{name} is already registered");
            }
            persist(&agent)
        }
        SourceAction::List => {
            if agent.registry.is_empty() {
                println!("(no sources registered)");
            }
            for source in agent.registry.sources() {
                println!("{}  {}", source.name, source.url);
            }
            Ok(())
        }
    }
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let agent = open_agent(cli)?;

    let fused = agent.knowledge.fuse();
    let matrix = agent.tension.control_matrix();
    let network = agent.sync.network();
    let sync_passes = agent
        .shared
        .lock()
        .event_count("sync_pass")
        .unwrap_or_default();

    println!("agent:      {}", agent.config.agent_name);
    println!("entries:    {}", agent.knowledge.len());
    println!(
        "fused:      magnitude={:.3} entropy={:.3}",
        fused.magnitude, fused.entropy_rate
    );
    println!(
        "gate:       silence={:.2} tension={:.2}",
        agent.gate.silence_level(),
        agent.gate.tension()
    );
    println!(
        "machine:    value={:.2} intensity={:.2} rigor={:.2}",
        agent.tension.value(),
        matrix.intensity,
        matrix.rigor
    );
    println!(
        "network:    connected={} last_sync={}",
        network.connected,
        network
            .last_sync_at
            .map(|t| t.to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    println!("sources:    {}", agent.registry.len());
    println!("sync_passes: {sync_passes}");
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let agent = open_agent(cli)?;

    let snapshot = AgentSnapshot {
        version: CURRENT_VERSION,
        agent_name: agent.config.agent_name.clone(),
        entries: agent.knowledge.entries().to_vec(),
        dialogue: agent.gate.state(),
        tension: agent.tension,
        network: *agent.sync.network(),
    };

    let json = export_json(&snapshot).map_err(|e| anyhow::anyhow!("{e}"))?;
    std::fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?;

    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let mut agent = open_agent(cli)?;

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot = import_json(&raw).map_err(|e| anyhow::anyhow!("{e}"))?;

    agent.knowledge.restore(snapshot.entries);
    agent.gate = DialogueGate::from_state(snapshot.dialogue);
    agent.tension = snapshot.tension;
    agent.sync = Synchronizer::from_state(snapshot.network);
    agent.config.agent_name = snapshot.agent_name;

    persist(&agent)?;

    println!(
        "imported from {}. entries={}, agent={}",
        path.display(),
        agent.knowledge.len(),
        agent.config.agent_name
    );
    Ok(())
}
