use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use eframe::egui;

use knowledge_vault::api::identity::LocalIdentity;
use knowledge_vault::api::server;
use knowledge_vault::api::service::VaultService;
use knowledge_vault::api::MutationHook;
use knowledge_vault::graph_utils::error::VaultError;
use knowledge_vault::graph_utils::graph::{lock_store, shared, GraphStore};
use knowledge_vault::graph_utils::model::EntryId;
use knowledge_vault::gui::frontend::VaultApp;
use knowledge_vault::interaction::ViewTransform;
use knowledge_vault::persistence::persist::{self, VaultStateFile};
use knowledge_vault::persistence::settings::AppSettings;

#[derive(Parser, Debug)]
#[command(name = "Knowledge-Vault", version, about = "Personal knowledge graph")]
struct Cli {
    /// Load and save this state file instead of the default autosave location
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,
    /// Serve the HTTP API only, without opening a window
    #[arg(long)]
    headless: bool,
    /// Override the API port from settings
    #[arg(long)]
    port: Option<u16>,
    /// Override the layout seed from settings
    #[arg(long)]
    seed: Option<u64>,
    /// Print the settings directory and exit
    #[arg(long)]
    settings_dir: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.settings_dir {
        println!("{}", AppSettings::settings_dir().display());
        return Ok(());
    }

    let mut settings = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("settings unreadable, using defaults: {}", e);
        AppSettings::default()
    });
    if let Some(port) = cli.port {
        settings.api_port = port;
    }
    if let Some(seed) = cli.seed {
        settings.layout_seed = seed;
    }
    persist::set_settings_override(settings.clone());
    if let Some(path) = cli.state.clone() {
        persist::set_state_path_override(path);
    }

    let loaded = match persist::load_active() {
        Ok(state) => state,
        Err(e) => {
            log::warn!("state file unreadable, starting empty: {}", e);
            None
        }
    };
    let state = loaded.unwrap_or_default();
    let positions = state.positions();
    let view = state.view;
    let last_email = state.last_email.clone();

    let mut store: GraphStore = state.store;
    store.set_policy(settings.store_policy());
    let service = VaultService::new(shared(store), Arc::new(Mutex::new(state.identity)));

    if cli.headless {
        let hook = save_hook(service.clone(), last_email, positions, view);
        return server::run_blocking(&settings, service, Some(hook));
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 760.0])
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Knowledge-Vault",
        options,
        Box::new(move |_cc| {
            let app = VaultApp::new(service, settings).with_restored(last_email, positions, view);
            Ok(Box::new(app) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| anyhow::anyhow!("ui failed: {}", e))
}

/// Autosave after each API mutation when running without a window.
fn save_hook(
    service: VaultService<LocalIdentity>,
    last_email: Option<String>,
    positions: HashMap<EntryId, egui::Pos2>,
    view: ViewTransform,
) -> MutationHook {
    Arc::new(move || {
        let snapshot = lock_store(service.store()).and_then(|store| {
            let identity = service.identity().lock().map_err(VaultError::from)?;
            Ok(VaultStateFile::from_runtime(&store, &identity, last_email.as_deref(), &positions, view))
        });
        match snapshot {
            Ok(state) => {
                if let Err(e) = persist::save_active(&state) {
                    log::error!("autosave failed: {}", e);
                }
            }
            Err(e) => log::error!("autosave skipped: {}", e),
        }
    })
}
