#![allow(clippy::collapsible_if)]
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Vec2};

use crate::api::{self, server};
use crate::api::identity::{IdentityProvider, LocalIdentity, User};
use crate::api::service::{ApiOp, ApiReply, VaultService};
use crate::graph_utils::error::VaultError;
use crate::graph_utils::graph::lock_store;
use crate::graph_utils::model::{
    CreateEntryInput, CreateRelationshipInput, EntryFilter, EntryId, EntryType, EntryView, RelationshipType, Tag,
    UpdateEntryInput,
};
use crate::interaction::viewport::wheel_factor;
use crate::interaction::{Hover, InteractionController, InteractionEvent, InteractionState, ViewTransform};
use crate::layout::LayoutEngine;
use crate::persistence::export;
use crate::persistence::persist::{self, VaultStateFile};
use crate::persistence::settings::AppSettings;
use crate::query::{GraphSnapshot, QueryLoader};
use crate::render::{self, style, CanvasSize, HoverCard, Scene};

const AUTOSAVE_AFTER: Duration = Duration::from_secs(5);
const EDGE_HIT_TOLERANCE: f32 = 6.0;
const EMPTY_GRAPH_TEXT: &str = "No entries to display in the knowledge graph.";

// Style for toast notifications
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NoticeStyle {
    Subtle,
    Prominent,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum AuthMode {
    Login,
    Signup,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ExportFormat {
    Json,
    Markdown,
    Csv,
}

struct Session {
    token: String,
    user: User,
}

#[derive(Clone, Debug)]
struct EntryForm {
    title: String,
    content: String,
    entry_type: EntryType,
    language: String,
    url: String,
    tags: String,
}

impl Default for EntryForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            entry_type: EntryType::Article,
            language: String::new(),
            url: String::new(),
            tags: String::new(),
        }
    }
}

impl EntryForm {
    fn from_view(view: &EntryView) -> Self {
        let e = &view.entry;
        Self {
            title: e.title.clone(),
            content: e.content.clone(),
            entry_type: e.entry_type,
            language: e.language.clone().unwrap_or_default(),
            url: e.url.clone().unwrap_or_default(),
            tags: view.tag_names().join(", "),
        }
    }

    fn tag_names(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn optional(s: &str) -> Option<String> {
        let t = s.trim();
        (!t.is_empty()).then(|| t.to_string())
    }

    fn to_create(&self) -> CreateEntryInput {
        let mut input = CreateEntryInput::new(self.title.trim(), self.content.clone(), self.entry_type)
            .with_tags(self.tag_names());
        input.language = Self::optional(&self.language);
        input.url = Self::optional(&self.url);
        input
    }

    fn to_update(&self) -> UpdateEntryInput {
        UpdateEntryInput {
            title: Some(self.title.trim().to_string()),
            content: Some(self.content.clone()),
            entry_type: Some(self.entry_type),
            language: Self::optional(&self.language),
            url: Self::optional(&self.url),
            metadata: None,
            tag_names: Some(self.tag_names()),
        }
    }
}

struct RelationForm {
    from: Option<EntryId>,
    to: Option<EntryId>,
    rel_type: RelationshipType,
    description: String,
}

impl Default for RelationForm {
    fn default() -> Self {
        Self { from: None, to: None, rel_type: RelationshipType::RelatedTo, description: String::new() }
    }
}

pub struct VaultApp {
    service: VaultService<LocalIdentity>,
    app_settings: AppSettings,
    session: Option<Session>,
    // login panel
    auth_mode: AuthMode,
    auth_email: String,
    auth_password: String,
    auth_name: String,
    auth_error: Option<String>,
    last_email: Option<String>,
    // graph pipeline
    filter_search: String,
    filter_types: BTreeSet<EntryType>,
    filter_tags: BTreeSet<String>,
    loader: QueryLoader,
    graph: GraphSnapshot,
    layout: LayoutEngine,
    controller: InteractionController,
    // positions from the state file, used to warm-start the first layout
    saved_positions: HashMap<EntryId, Pos2>,
    canvas: CanvasSize,
    seen_epoch: u64,
    panning: bool,
    // vocabulary for the sidebar
    all_tags: Vec<Tag>,
    entry_choices: Vec<(EntryId, String)>,
    // errors
    load_error: Option<VaultError>,
    inline_error: Option<String>,
    // detail window
    detail: Option<EntryView>,
    detail_edit: Option<EntryForm>,
    // creation forms
    entry_form: EntryForm,
    relation_form: RelationForm,
    tag_name: String,
    tag_color: String,
    // persistence
    dirty: bool,
    last_change: Instant,
    save_error: Option<String>,
    last_save_info: Option<String>,
    last_info_time: Option<Instant>,
    last_info_style: NoticeStyle,
    show_load_versions: bool,
    // window chrome
    sidebar_open: bool,
    fullscreen: bool,
    show_prefs_window: bool,
    prefs_edit: AppSettings,
    prefs_status: Option<String>,
    api_running: bool,
}

impl VaultApp {
    pub fn new(service: VaultService<LocalIdentity>, app_settings: AppSettings) -> Self {
        let canvas = CanvasSize::measure(None, app_settings.canvas_fallback());
        let graph = GraphSnapshot::default();
        let layout = LayoutEngine::new(&graph, canvas.center(), app_settings.layout_seed);
        let controller = InteractionController::new(InteractionState::with_debounce(app_settings.search_debounce()));
        let mut app = Self {
            service,
            prefs_edit: app_settings.clone(),
            app_settings,
            session: None,
            auth_mode: AuthMode::Login,
            auth_email: String::new(),
            auth_password: String::new(),
            auth_name: String::new(),
            auth_error: None,
            last_email: None,
            filter_search: String::new(),
            filter_types: BTreeSet::new(),
            filter_tags: BTreeSet::new(),
            loader: QueryLoader::new(),
            graph,
            layout,
            controller,
            saved_positions: HashMap::new(),
            canvas,
            seen_epoch: api::mutation_epoch(),
            panning: false,
            all_tags: Vec::new(),
            entry_choices: Vec::new(),
            load_error: None,
            inline_error: None,
            detail: None,
            detail_edit: None,
            entry_form: EntryForm::default(),
            relation_form: RelationForm::default(),
            tag_name: String::new(),
            tag_color: String::new(),
            dirty: false,
            last_change: Instant::now(),
            save_error: None,
            last_save_info: None,
            last_info_time: None,
            last_info_style: NoticeStyle::Subtle,
            show_load_versions: false,
            sidebar_open: true,
            fullscreen: false,
            show_prefs_window: false,
            prefs_status: None,
            api_running: false,
        };
        if app.app_settings.api_enabled {
            app.start_api();
        }
        app
    }

    /// Carry over what the state file remembers about the last session.
    pub fn with_restored(
        mut self,
        last_email: Option<String>,
        positions: HashMap<EntryId, Pos2>,
        view: ViewTransform,
    ) -> Self {
        if let Some(email) = &last_email {
            self.auth_email = email.clone();
        }
        self.last_email = last_email;
        self.saved_positions = positions;
        self.controller.set_view(view);
        self
    }

    fn notify(&mut self, msg: impl Into<String>, style: NoticeStyle) {
        self.last_save_info = Some(msg.into());
        self.last_info_time = Some(Instant::now());
        self.last_info_style = style;
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.last_change = Instant::now();
    }

    fn snapshot_state(&self) -> anyhow::Result<VaultStateFile> {
        let store = lock_store(self.service.store())?;
        let identity = self.service.identity().lock().map_err(VaultError::from)?;
        let mut positions = self.saved_positions.clone();
        positions.extend(self.layout.positions());
        Ok(VaultStateFile::from_runtime(
            &store,
            &identity,
            self.last_email.as_deref(),
            &positions,
            self.controller.view(),
        ))
    }

    fn save_now_with(&mut self, style: NoticeStyle) {
        match self.snapshot_state().and_then(|state| persist::save_active(&state)) {
            Ok(path) => {
                self.dirty = false;
                self.save_error = None;
                self.notify(format!("Saved to {}", path.display()), style);
            }
            Err(e) => {
                log::warn!("autosave failed: {}", e);
                self.save_error = Some(format!("Save failed: {}", e));
            }
        }
    }

    fn save_now(&mut self) {
        self.save_now_with(NoticeStyle::Prominent);
    }

    fn save_versioned_now(&mut self) {
        match self.snapshot_state().and_then(|state| persist::save_versioned(&state)) {
            Ok(path) => {
                self.save_error = None;
                self.notify(format!("Saved version {}", path.display()), NoticeStyle::Prominent);
            }
            Err(e) => self.save_error = Some(format!("Save version failed: {}", e)),
        }
    }

    /// Replace store and accounts with a loaded state file. Sessions do not survive this.
    fn install_state(&mut self, state: VaultStateFile, label: &str) {
        let positions = state.positions();
        let view = state.view;
        let result = lock_store(self.service.store()).and_then(|mut store| {
            *store = state.store;
            store.set_policy(self.app_settings.store_policy());
            let mut identity = self.service.identity().lock()?;
            *identity = state.identity;
            Ok(())
        });
        if let Err(e) = result {
            self.save_error = Some(format!("Load failed: {}", e));
            return;
        }
        self.saved_positions = positions;
        self.controller.set_view(view);
        self.last_email = state.last_email;
        self.dirty = false;
        self.save_error = None;
        self.sign_out(None);
        self.notify(format!("Loaded {}; sign in again", label), NoticeStyle::Prominent);
    }

    fn menu_load_latest(&mut self) {
        match persist::load_active() {
            Ok(Some(state)) => self.install_state(state, "latest state"),
            Ok(None) => self.save_error = Some("No active state file found".into()),
            Err(e) => self.save_error = Some(format!("Load failed: {}", e)),
        }
    }

    fn menu_open_prefs(&mut self) {
        self.prefs_edit = self.app_settings.clone();
        self.prefs_status = None;
        self.show_prefs_window = true;
    }

    fn start_api(&mut self) {
        match server::start_server(&self.app_settings, self.service.clone(), None) {
            Ok(()) => {
                self.api_running = true;
                self.notify(format!("API listening on {}", self.app_settings.api_endpoint()), NoticeStyle::Subtle);
            }
            Err(e) => self.save_error = Some(format!("API start failed: {}", e)),
        }
    }

    fn stop_api(&mut self) {
        server::stop_server();
        self.api_running = false;
    }

    // ---- session ----

    fn submit_auth(&mut self) {
        let op = match self.auth_mode {
            AuthMode::Login => ApiOp::Login { email: self.auth_email.clone(), password: self.auth_password.clone() },
            AuthMode::Signup => ApiOp::Signup {
                email: self.auth_email.clone(),
                password: self.auth_password.clone(),
                name: EntryForm::optional(&self.auth_name),
            },
        };
        let signup = self.auth_mode == AuthMode::Signup;
        match self.service.execute(None, op) {
            Ok(ApiReply::Auth(payload)) => {
                log::info!("signed in as owner {}", payload.user.id);
                self.last_email = Some(payload.user.email.clone());
                self.session = Some(Session { token: payload.token, user: payload.user });
                self.auth_password.clear();
                self.auth_error = None;
                if signup {
                    self.mark_dirty();
                }
                self.refresh();
            }
            Ok(_) => self.auth_error = Some("Unexpected reply from identity service".into()),
            Err(e) => self.auth_error = Some(e.to_string()),
        }
    }

    fn sign_out(&mut self, reason: Option<String>) {
        if let Some(session) = self.session.take() {
            if let Ok(mut identity) = self.service.identity().lock() {
                identity.logout(&session.token);
            }
        }
        // a query issued for the previous session must not land after this point
        self.loader.invalidate();
        self.saved_positions.extend(self.layout.positions());
        self.graph = GraphSnapshot::default();
        self.layout = LayoutEngine::new(&self.graph, self.canvas.center(), self.app_settings.layout_seed);
        self.controller.dispatch(InteractionEvent::GraphReplaced, &self.graph, &mut self.layout);
        self.detail = None;
        self.detail_edit = None;
        self.load_error = None;
        self.inline_error = None;
        self.auth_error = reason;
    }

    fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    fn handle_error(&mut self, err: VaultError) {
        if err.is_auth_failure() {
            self.sign_out(Some(err.to_string()));
        } else if err.is_transient() {
            self.load_error = Some(err);
        } else {
            self.inline_error = Some(err.to_string());
        }
    }

    /// Run one operation for the signed-in owner. Mutations schedule a refetch and an autosave.
    fn call(&mut self, op: ApiOp) -> Option<ApiReply> {
        let mutation = op.is_mutation();
        let token = self.token().map(str::to_string);
        match self.service.execute(token.as_deref(), op) {
            Ok(reply) => {
                self.inline_error = None;
                if mutation {
                    self.mark_dirty();
                    self.refresh();
                }
                Some(reply)
            }
            Err(e) => {
                self.handle_error(e);
                None
            }
        }
    }

    // ---- graph pipeline ----

    fn current_filter(&self) -> EntryFilter {
        EntryFilter {
            search: EntryForm::optional(&self.filter_search),
            types: self.filter_types.iter().copied().collect(),
            tag_names: self.filter_tags.iter().cloned().collect(),
        }
    }

    fn filter_is_default(&self) -> bool {
        self.filter_search.trim().is_empty() && self.filter_types.is_empty() && self.filter_tags.is_empty()
    }

    /// Issue a fresh graph query and reload the sidebar vocabulary. Older in-flight results are dropped on arrival.
    fn refresh(&mut self) {
        let Some(token) = self.token().map(str::to_string) else { return };
        match self.service.owner(Some(&token)) {
            Ok(owner) => {
                let filter = self.current_filter();
                self.loader.request(self.service.store().clone(), owner, filter);
            }
            Err(e) => {
                self.handle_error(e);
                return;
            }
        }
        if let Some(ApiReply::Tags(tags)) = self.call(ApiOp::Tags) {
            self.all_tags = tags;
        }
        if let Some(ApiReply::Entries(views)) =
            self.call(ApiOp::Entries { search: None, tag_names: Vec::new(), entry_type: None })
        {
            let mut choices: Vec<(EntryId, String)> = views.into_iter().map(|v| (v.entry.id, v.entry.title)).collect();
            choices.sort_by(|a, b| a.1.to_lowercase().cmp(&b.1.to_lowercase()));
            self.entry_choices = choices;
        }
        self.reload_detail();
    }

    fn reload_detail(&mut self) {
        let Some(id) = self.controller.state().selected else {
            self.detail = None;
            return;
        };
        if self.detail.as_ref().is_some_and(|d| d.entry.id == id) && !self.dirty {
            return;
        }
        match self.call(ApiOp::Entry { id }) {
            Some(ApiReply::Entry(Some(view))) => self.detail = Some(view),
            Some(ApiReply::Entry(None)) => {
                self.inline_error = Some(format!("Entry not found: {}", id));
                self.detail = None;
                self.dispatch(InteractionEvent::CloseDetail);
            }
            _ => {}
        }
    }

    fn apply_snapshot(&mut self, graph: GraphSnapshot) {
        self.saved_positions.extend(self.layout.positions());
        self.layout = LayoutEngine::with_positions(
            &graph,
            self.canvas.center(),
            self.app_settings.layout_seed,
            &self.saved_positions,
        );
        log::debug!("layout restarted with {} nodes, {} links", graph.node_count(), graph.edge_count());
        self.graph = graph;
        self.dispatch(InteractionEvent::GraphReplaced);
        self.load_error = None;
    }

    fn dispatch(&mut self, event: InteractionEvent) {
        let before = self.controller.state().selected;
        let ends_drag = matches!(event, InteractionEvent::DragEnd);
        self.controller.dispatch(event, &self.graph, &mut self.layout);
        if self.controller.state().selected != before {
            self.detail = None;
            self.detail_edit = None;
            self.reload_detail();
        }
        if ends_drag {
            self.mark_dirty();
        }
    }

    fn poll_background(&mut self, ctx: &egui::Context) {
        let epoch = api::mutation_epoch();
        if epoch != self.seen_epoch {
            self.seen_epoch = epoch;
            self.mark_dirty();
            self.refresh();
        }
        match self.loader.poll() {
            Some(Ok(graph)) => self.apply_snapshot(graph),
            Some(Err(e)) => self.handle_error(e),
            None => {}
        }
        if self.loader.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }

    fn export(&mut self, format: ExportFormat) {
        let Some(token) = self.token().map(str::to_string) else { return };
        let owner = match self.service.owner(Some(&token)) {
            Ok(o) => o,
            Err(e) => return self.handle_error(e),
        };
        let dir = self.app_settings.export_dir();
        let result: anyhow::Result<PathBuf> = lock_store(self.service.store())
            .map_err(anyhow::Error::from)
            .and_then(|store| match format {
                ExportFormat::Json => {
                    let path = export::default_export_path(&dir, "json");
                    export::export_json(&store, owner, &path).map(|_| path)
                }
                ExportFormat::Markdown => {
                    let path = export::default_export_path(&dir, "md");
                    export::export_markdown(&store, owner, &path).map(|_| path)
                }
                ExportFormat::Csv => {
                    let base = export::default_export_path(&dir, "csv");
                    export::export_csv(&store, owner, &base).map(|(entries, _)| entries)
                }
            });
        match result {
            Ok(path) => self.notify(format!("Exported to {}", path.display()), NoticeStyle::Prominent),
            Err(e) => self.save_error = Some(format!("Export failed: {}", e)),
        }
    }

    // ---- panels ----

    fn login_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.2);
                ui.heading("Knowledge Vault");
                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.auth_mode, AuthMode::Login, "Sign in");
                    ui.selectable_value(&mut self.auth_mode, AuthMode::Signup, "Create account");
                });
                ui.add_space(8.0);
                let mut submit = false;
                egui::Grid::new("auth_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Email");
                    ui.text_edit_singleline(&mut self.auth_email);
                    ui.end_row();
                    ui.label("Password");
                    let resp = ui.add(egui::TextEdit::singleline(&mut self.auth_password).password(true));
                    if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        submit = true;
                    }
                    ui.end_row();
                    if self.auth_mode == AuthMode::Signup {
                        ui.label("Name");
                        ui.text_edit_singleline(&mut self.auth_name);
                        ui.end_row();
                    }
                });
                let label = match self.auth_mode {
                    AuthMode::Login => "Sign in",
                    AuthMode::Signup => "Sign up",
                };
                if ui.button(label).clicked() {
                    submit = true;
                }
                if let Some(err) = &self.auth_error {
                    ui.colored_label(Color32::RED, err);
                }
                if submit {
                    self.submit_auth();
                }
            });
        });
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            let save = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S);
            let save_version = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::S);
            let reset = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Num0);
            if ctx.input_mut(|i| i.consume_shortcut(&save)) {
                self.save_now();
            }
            if ctx.input_mut(|i| i.consume_shortcut(&save_version)) {
                self.save_versioned_now();
            }
            if ctx.input_mut(|i| i.consume_shortcut(&reset)) {
                self.dispatch(InteractionEvent::ResetView);
            }

            ui.horizontal(|ui| {
                ui.label("Knowledge Vault");
                ui.menu_button("File", |ui| {
                    if ui.add(egui::Button::new("Save").shortcut_text(ctx.format_shortcut(&save))).clicked() {
                        self.save_now();
                        ui.close();
                    }
                    if ui.add(egui::Button::new("Save Version").shortcut_text(ctx.format_shortcut(&save_version))).clicked() {
                        self.save_versioned_now();
                        ui.close();
                    }
                    if ui.button("Load Latest").clicked() {
                        self.menu_load_latest();
                        ui.close();
                    }
                    if ui.button("Load Version…").clicked() {
                        self.show_load_versions = true;
                        ui.close();
                    }
                    ui.separator();
                    ui.add_enabled_ui(self.session.is_some(), |ui| {
                        if ui.button("Export JSON").clicked() {
                            self.export(ExportFormat::Json);
                            ui.close();
                        }
                        if ui.button("Export Markdown").clicked() {
                            self.export(ExportFormat::Markdown);
                            ui.close();
                        }
                        if ui.button("Export CSV").clicked() {
                            self.export(ExportFormat::Csv);
                            ui.close();
                        }
                    });
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui.add(egui::Button::new("Reset View").shortcut_text(ctx.format_shortcut(&reset))).clicked() {
                        self.dispatch(InteractionEvent::ResetView);
                        ui.close();
                    }
                    let toggle_sidebar = if self.sidebar_open { "Hide Sidebar" } else { "Show Sidebar" };
                    if ui.button(toggle_sidebar).clicked() {
                        self.sidebar_open = !self.sidebar_open;
                        ui.close();
                    }
                    let toggle_fs = if self.fullscreen { "Exit Fullscreen" } else { "Fullscreen" };
                    if ui.button(toggle_fs).clicked() {
                        self.fullscreen = !self.fullscreen;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.fullscreen));
                        ui.close();
                    }
                });

                ui.menu_button("Settings", |ui| {
                    if ui.button("Preferences…").clicked() {
                        self.menu_open_prefs();
                        ui.close();
                    }
                    let api_label = if self.api_running { "Stop API" } else { "Start API" };
                    if ui.button(api_label).clicked() {
                        if self.api_running {
                            self.stop_api();
                        } else {
                            self.start_api();
                        }
                        ui.close();
                    }
                });

                let who = self
                    .session
                    .as_ref()
                    .map(|s| s.user.name.clone().unwrap_or_else(|| s.user.email.clone()));
                if let Some(who) = who {
                    ui.separator();
                    ui.small(who);
                    if ui.small_button("Sign out").clicked() {
                        self.sign_out(None);
                    }
                }
                if self.loader.is_loading() {
                    ui.spinner();
                }
                if self.api_running {
                    ui.small(format!("API {}", self.app_settings.api_endpoint()));
                }
                if let Some(err) = &self.save_error {
                    ui.separator();
                    ui.colored_label(Color32::RED, err);
                }
            });
        });
    }

    fn error_banner(&mut self, ctx: &egui::Context) {
        let Some(err) = &self.load_error else { return };
        let msg = err.to_string();
        let mut retry = false;
        let mut dismiss = false;
        egui::TopBottomPanel::top("error_banner").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(Color32::from_rgb(0xef, 0x44, 0x44), msg);
                if ui.button("Retry").clicked() {
                    retry = true;
                }
                if ui.button("Dismiss").clicked() {
                    dismiss = true;
                }
            });
        });
        if retry || dismiss {
            self.load_error = None;
        }
        if retry {
            self.refresh();
        }
    }

    fn sidebar(&mut self, ctx: &egui::Context) {
        if !self.sidebar_open {
            return;
        }
        egui::SidePanel::left("vault_sidebar")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.filter_section(ui);
                    ui.separator();
                    self.create_entry_section(ui);
                    ui.separator();
                    self.create_relation_section(ui);
                    ui.separator();
                    self.create_tag_section(ui);
                    if let Some(err) = &self.inline_error {
                        ui.separator();
                        ui.colored_label(Color32::RED, err);
                    }
                });
            });
    }

    fn filter_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Filter");
        let mut changed = false;
        let resp = ui.add(egui::TextEdit::singleline(&mut self.filter_search).hint_text("Title or content…"));
        if resp.changed() {
            changed = true;
        }
        ui.horizontal_wrapped(|ui| {
            for t in EntryType::ALL {
                let mut on = self.filter_types.contains(&t);
                if ui.checkbox(&mut on, t.human_label()).changed() {
                    if on {
                        self.filter_types.insert(t);
                    } else {
                        self.filter_types.remove(&t);
                    }
                    changed = true;
                }
            }
        });
        if !self.all_tags.is_empty() {
            ui.label("Tags");
            ui.horizontal_wrapped(|ui| {
                for tag in &self.all_tags {
                    let mut on = self.filter_tags.contains(&tag.name);
                    if ui.checkbox(&mut on, &tag.name).changed() {
                        if on {
                            self.filter_tags.insert(tag.name.clone());
                        } else {
                            self.filter_tags.remove(&tag.name);
                        }
                        changed = true;
                    }
                }
            });
        }
        if !self.filter_is_default() && ui.small_button("Clear filters").clicked() {
            self.filter_search.clear();
            self.filter_types.clear();
            self.filter_tags.clear();
            changed = true;
        }
        if changed {
            self.refresh();
        }
    }

    fn entry_form_fields(ui: &mut egui::Ui, form: &mut EntryForm, salt: &str) {
        ui.add(egui::TextEdit::singleline(&mut form.title).hint_text("Title"));
        egui::ComboBox::from_id_salt((salt, "type"))
            .selected_text(form.entry_type.human_label())
            .show_ui(ui, |ui| {
                for t in EntryType::ALL {
                    ui.selectable_value(&mut form.entry_type, t, t.human_label());
                }
            });
        ui.add(egui::TextEdit::multiline(&mut form.content).hint_text("Content").desired_rows(4));
        if form.entry_type == EntryType::CodeSnippet {
            ui.add(egui::TextEdit::singleline(&mut form.language).hint_text("Language"));
        }
        if form.entry_type == EntryType::Bookmark {
            ui.add(egui::TextEdit::singleline(&mut form.url).hint_text("URL"));
        }
        ui.add(egui::TextEdit::singleline(&mut form.tags).hint_text("Tags, comma separated"));
    }

    fn create_entry_section(&mut self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("New entry").default_open(true).show(ui, |ui| {
            Self::entry_form_fields(ui, &mut self.entry_form, "create_entry");
            if ui.button("Create entry").clicked() {
                let input = self.entry_form.to_create();
                if let Some(ApiReply::Entry(Some(view))) = self.call(ApiOp::CreateEntry { input }) {
                    self.notify(format!("Created \"{}\"", view.entry.title), NoticeStyle::Subtle);
                    self.entry_form = EntryForm::default();
                }
            }
        });
    }

    fn entry_picker(ui: &mut egui::Ui, salt: &str, choices: &[(EntryId, String)], value: &mut Option<EntryId>) {
        let selected = value
            .and_then(|id| choices.iter().find(|(c, _)| *c == id))
            .map(|(_, t)| t.clone())
            .unwrap_or_else(|| "Choose…".to_string());
        egui::ComboBox::from_id_salt(salt).selected_text(selected).show_ui(ui, |ui| {
            for (id, title) in choices {
                ui.selectable_value(value, Some(*id), title);
            }
        });
    }

    fn create_relation_section(&mut self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("New relationship").show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label("From");
                Self::entry_picker(ui, "rel_from", &self.entry_choices, &mut self.relation_form.from);
            });
            ui.horizontal(|ui| {
                ui.label("To");
                Self::entry_picker(ui, "rel_to", &self.entry_choices, &mut self.relation_form.to);
            });
            egui::ComboBox::from_id_salt("rel_type")
                .selected_text(self.relation_form.rel_type.human_label())
                .show_ui(ui, |ui| {
                    for t in RelationshipType::ALL {
                        ui.selectable_value(&mut self.relation_form.rel_type, t, t.human_label());
                    }
                });
            ui.add(egui::TextEdit::singleline(&mut self.relation_form.description).hint_text("Description"));
            let ready = self.relation_form.from.is_some() && self.relation_form.to.is_some();
            if ui.add_enabled(ready, egui::Button::new("Create relationship")).clicked() {
                if let (Some(from), Some(to)) = (self.relation_form.from, self.relation_form.to) {
                    let mut input = CreateRelationshipInput::new(from, to, self.relation_form.rel_type);
                    input.description = EntryForm::optional(&self.relation_form.description);
                    if self.call(ApiOp::CreateRelationship { input }).is_some() {
                        self.relation_form = RelationForm::default();
                    }
                }
            }
        });
    }

    fn create_tag_section(&mut self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("New tag").show(ui, |ui| {
            ui.add(egui::TextEdit::singleline(&mut self.tag_name).hint_text("Name"));
            ui.add(egui::TextEdit::singleline(&mut self.tag_color).hint_text("#rrggbb (optional)"));
            if ui.button("Create tag").clicked() {
                let op = ApiOp::CreateTag { name: self.tag_name.trim().to_string(), color: EntryForm::optional(&self.tag_color) };
                if self.call(op).is_some() {
                    self.tag_name.clear();
                    self.tag_color.clear();
                }
            }
        });
    }

    // ---- canvas ----

    fn canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_rect_before_wrap();
            let canvas = CanvasSize::measure(Some(available.size()), self.app_settings.canvas_fallback());
            if canvas != self.canvas {
                self.canvas = canvas;
                self.layout.set_center(canvas.center());
            }
            let rect = Rect::from_min_size(available.min, Vec2::new(canvas.width, canvas.height));
            let resp = ui.allocate_rect(rect, Sense::click_and_drag());

            if !self.layout.is_settled() {
                self.layout.tick();
                ctx.request_repaint();
            }
            self.dispatch(InteractionEvent::Tick(Instant::now()));
            if let Some(due) = self.controller.state().search.deadline() {
                ctx.request_repaint_after(due.saturating_duration_since(Instant::now()));
            }

            let scene = render::render(self.controller.state(), &self.layout, &self.graph);
            self.handle_pointer(ui, &resp, rect, &scene);
            // Re-project after input so hover changes show on this frame.
            let scene = render::render(self.controller.state(), &self.layout, &self.graph);

            let painter = ui.painter_at(rect);
            paint_scene(&painter, rect, &scene);

            if self.graph.is_empty() && !self.loader.is_loading() {
                self.empty_state(ui, rect);
            } else if self.graph.is_empty() {
                painter.text(rect.center(), egui::Align2::CENTER_CENTER, "Loading graph…", egui::FontId::proportional(16.0), Color32::GRAY);
            }
            paint_stats(&painter, rect, &scene);
            paint_legend(&painter, rect);
            self.view_controls(ui, rect);
            self.search_box(ui, rect);
            if let Some(card) = &scene.hover_card {
                hover_card(ctx, card);
            }
        });
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, resp: &egui::Response, rect: Rect, scene: &Scene) {
        let view = self.controller.view();
        let to_world = |p: Pos2| view.to_world(Pos2::ZERO + (p - rect.min));
        let pointer = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));
        let under = pointer.map(|p| {
            let w = to_world(p);
            (scene.node_at(w), scene.edge_at(w, EDGE_HIT_TOLERANCE))
        });

        let current = self.controller.state().pointer.hover();
        let next = match under {
            Some((Some(node), _)) => Some(Hover::Node(node)),
            Some((None, Some(edge))) => Some(Hover::Link(edge)),
            _ => None,
        };
        if next != current {
            let event = match next {
                Some(Hover::Node(id)) => InteractionEvent::PointerEnterNode(id),
                Some(Hover::Link(id)) => InteractionEvent::PointerEnterLink(id),
                None => InteractionEvent::PointerLeave,
            };
            self.dispatch(event);
        }

        let node_under = under.and_then(|(n, _)| n);
        if resp.drag_started() {
            let origin = ui.input(|i| i.pointer.press_origin()).filter(|p| rect.contains(*p));
            match origin.and_then(|p| scene.node_at(to_world(p))) {
                Some(id) => self.dispatch(InteractionEvent::DragStart(id)),
                None => self.panning = true,
            }
        }
        if resp.dragged() {
            if self.controller.state().pointer.dragging().is_some() {
                if let Some(p) = ui.input(|i| i.pointer.interact_pos()) {
                    self.dispatch(InteractionEvent::DragMove(to_world(p)));
                    ui.ctx().request_repaint();
                }
            } else if self.panning {
                self.dispatch(InteractionEvent::Pan(resp.drag_delta()));
            }
        }
        if resp.drag_stopped() {
            if self.controller.state().pointer.dragging().is_some() {
                self.dispatch(InteractionEvent::DragEnd);
                ui.ctx().request_repaint();
            }
            self.panning = false;
        }
        if resp.clicked() {
            if let Some(id) = node_under {
                self.dispatch(InteractionEvent::Click(id));
            }
        }
        if resp.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                if let Some(p) = pointer {
                    let anchor = Pos2::ZERO + (p - rect.min);
                    self.dispatch(InteractionEvent::Zoom { factor: wheel_factor(-scroll), anchor });
                    self.mark_dirty();
                }
            }
        }
    }

    fn empty_state(&mut self, ui: &mut egui::Ui, rect: Rect) {
        let area = Rect::from_center_size(rect.center(), Vec2::new(360.0, 80.0));
        let show_sample = self.filter_is_default() && self.session.is_some();
        let mut load_sample = false;
        ui.scope_builder(egui::UiBuilder::new().max_rect(area), |ui| {
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(EMPTY_GRAPH_TEXT).color(Color32::GRAY));
                if show_sample && ui.button("Load sample data").clicked() {
                    load_sample = true;
                }
            });
        });
        if load_sample {
            if let Some(ApiReply::SampleLoaded { entries, relationships }) = self.call(ApiOp::LoadSampleData) {
                self.notify(
                    format!("Loaded {} sample entries and {} relationships", entries, relationships),
                    NoticeStyle::Prominent,
                );
            }
        }
    }

    fn view_controls(&mut self, ui: &mut egui::Ui, rect: Rect) {
        let anchor = Pos2::new(rect.width() * 0.5, rect.height() * 0.5);
        let size = Vec2::new(32.0, 24.0);
        let top_right = Pos2::new(rect.right() - 12.0 - size.x, rect.top() + 48.0);
        let mut event = None;
        for (i, (label, make)) in [
            ("+", InteractionEvent::ZoomIn { anchor }),
            ("−", InteractionEvent::ZoomOut { anchor }),
            ("⟲", InteractionEvent::ResetView),
        ]
        .into_iter()
        .enumerate()
        {
            let r = Rect::from_min_size(top_right + Vec2::new(0.0, i as f32 * (size.y + 4.0)), size);
            if ui.put(r, egui::Button::new(label)).clicked() {
                event = Some(make);
            }
        }
        if let Some(event) = event {
            self.dispatch(event);
            self.mark_dirty();
        }
    }

    fn search_box(&mut self, ui: &mut egui::Ui, rect: Rect) {
        let width = 220.0;
        let r = Rect::from_min_size(Pos2::new(rect.right() - width - 12.0, rect.top() + 12.0), Vec2::new(width, 24.0));
        let mut text = self.controller.state().search.input().to_string();
        let resp = ui.put(r, egui::TextEdit::singleline(&mut text).hint_text("Search graph…"));
        if resp.changed() {
            if text.is_empty() {
                self.dispatch(InteractionEvent::SearchClear);
            } else {
                self.dispatch(InteractionEvent::SearchInput { text, at: Instant::now() });
                ui.ctx().request_repaint_after(self.controller.state().search.debounce());
            }
        }
    }

    // ---- windows ----

    fn detail_window(&mut self, ctx: &egui::Context) {
        let Some(view) = self.detail.clone() else { return };
        let id = view.entry.id;
        let mut open = true;
        let mut delete_entry = false;
        let mut delete_rel = None;
        let mut start_edit = false;
        let mut save_edit = false;
        let mut cancel_edit = false;
        let mut select = None;

        egui::Window::new(view.entry.title.clone())
            .id(egui::Id::new(("entry_detail", id)))
            .open(&mut open)
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| {
                if let Some(form) = self.detail_edit.as_mut() {
                    Self::entry_form_fields(ui, form, "edit_entry");
                    ui.horizontal(|ui| {
                        if ui.button("Save").clicked() {
                            save_edit = true;
                        }
                        if ui.button("Cancel").clicked() {
                            cancel_edit = true;
                        }
                    });
                    return;
                }
                ui.horizontal(|ui| {
                    ui.colored_label(style::entry_color(view.entry.entry_type), view.entry.entry_type.human_label());
                    ui.small(format!("updated {}", view.entry.updated_at.date()));
                });
                if !view.tags.is_empty() {
                    ui.horizontal_wrapped(|ui| {
                        for tag in &view.tags {
                            let color = tag.color.as_deref().and_then(style::parse_hex_color).unwrap_or(style::FALLBACK_COLOR);
                            ui.colored_label(color, format!("#{}", tag.name));
                        }
                    });
                }
                if let Some(url) = &view.entry.url {
                    ui.hyperlink(url);
                }
                if let Some(lang) = &view.entry.language {
                    ui.small(format!("Language: {}", lang));
                }
                ui.separator();
                egui::ScrollArea::vertical().max_height(260.0).show(ui, |ui| {
                    if view.entry.entry_type == EntryType::CodeSnippet {
                        ui.monospace(&view.entry.content);
                    } else {
                        ui.label(&view.entry.content);
                    }
                });
                if !view.from_relations.is_empty() || !view.to_relations.is_empty() {
                    ui.separator();
                    ui.label("Relationships");
                    for rel in &view.from_relations {
                        ui.horizontal(|ui| {
                            ui.colored_label(style::relationship_color(rel.rel_type), rel.rel_type.human_label());
                            if ui.link(format!("→ {}", rel.entry.title)).clicked() {
                                select = Some(rel.entry.id);
                            }
                            if ui.small_button("✕").clicked() {
                                delete_rel = Some(rel.id);
                            }
                        });
                    }
                    for rel in &view.to_relations {
                        ui.horizontal(|ui| {
                            ui.colored_label(style::relationship_color(rel.rel_type), rel.rel_type.human_label());
                            if ui.link(format!("← {}", rel.entry.title)).clicked() {
                                select = Some(rel.entry.id);
                            }
                            if ui.small_button("✕").clicked() {
                                delete_rel = Some(rel.id);
                            }
                        });
                    }
                }
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Edit").clicked() {
                        start_edit = true;
                    }
                    if ui.button("Delete entry").clicked() {
                        delete_entry = true;
                    }
                });
            });

        if start_edit {
            self.detail_edit = Some(EntryForm::from_view(&view));
        }
        if cancel_edit {
            self.detail_edit = None;
        }
        if save_edit {
            if let Some(form) = self.detail_edit.clone() {
                if let Some(ApiReply::Entry(Some(updated))) = self.call(ApiOp::UpdateEntry { id, input: form.to_update() }) {
                    self.detail = Some(updated);
                    self.detail_edit = None;
                }
            }
        }
        if let Some(rid) = delete_rel {
            if self.call(ApiOp::DeleteRelationship { id: rid }).is_some() {
                self.detail = None;
                self.reload_detail();
            }
        }
        if delete_entry {
            if self.call(ApiOp::DeleteEntry { id }).is_some() {
                self.notify(format!("Deleted \"{}\"", view.entry.title), NoticeStyle::Subtle);
                open = false;
            }
        }
        if let Some(next) = select {
            if self.graph.contains(next) {
                self.dispatch(InteractionEvent::Click(next));
                return;
            }
        }
        if !open {
            self.dispatch(InteractionEvent::CloseDetail);
        }
    }

    fn load_versions_window(&mut self, ctx: &egui::Context) {
        if !self.show_load_versions {
            return;
        }
        let mut open = true;
        let mut to_load: Option<PathBuf> = None;
        egui::Window::new("Load Version")
            .collapsible(false)
            .resizable(true)
            .open(&mut open)
            .show(ctx, |ui| match persist::list_versions() {
                Ok(list) => {
                    if list.is_empty() {
                        ui.label("No versioned snapshots yet");
                    }
                    for p in list.iter() {
                        let label = p.file_name().and_then(|s| s.to_str()).unwrap_or("<unknown>");
                        if ui.button(label).clicked() {
                            to_load = Some(p.clone());
                        }
                    }
                }
                Err(e) => {
                    ui.colored_label(Color32::RED, format!("List failed: {}", e));
                }
            });
        if let Some(p) = to_load {
            match persist::load_from_path(&p) {
                Ok(state) => {
                    let label = p.file_name().and_then(|s| s.to_str()).unwrap_or("version").to_string();
                    self.install_state(state, &label);
                    open = false;
                }
                Err(e) => self.save_error = Some(format!("Failed to load {}: {}", p.display(), e)),
            }
        }
        self.show_load_versions = open;
    }

    fn prefs_window(&mut self, ctx: &egui::Context) {
        if !self.show_prefs_window {
            return;
        }
        let mut open = true;
        let mut apply = false;
        egui::Window::new("Preferences")
            .open(&mut open)
            .resizable(true)
            .collapsible(false)
            .show(ctx, |ui| {
                egui::Grid::new("prefs_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Enable API on start");
                    ui.checkbox(&mut self.prefs_edit.api_enabled, "");
                    ui.end_row();
                    ui.label("Bind address");
                    ui.text_edit_singleline(&mut self.prefs_edit.api_bind_addr);
                    ui.end_row();
                    ui.label("Port");
                    ui.add(egui::DragValue::new(&mut self.prefs_edit.api_port).range(1..=65535));
                    ui.end_row();
                    ui.label("Same-owner relationship endpoints");
                    ui.checkbox(&mut self.prefs_edit.enforce_endpoint_ownership, "");
                    ui.end_row();
                    ui.label("Search debounce (ms)");
                    ui.add(egui::DragValue::new(&mut self.prefs_edit.search_debounce_ms).range(0..=2000));
                    ui.end_row();
                    ui.label("Layout seed");
                    ui.add(egui::DragValue::new(&mut self.prefs_edit.layout_seed));
                    ui.end_row();
                });
                ui.small(format!("Autosave: {}", self.prefs_edit.autosave_dir().display()));
                ui.small(format!("Exports: {}", self.prefs_edit.export_dir().display()));
                ui.small(format!("Settings: {}", AppSettings::settings_dir().display()));
                if ui.button("Save").clicked() {
                    apply = true;
                }
                if let Some(msg) = &self.prefs_status {
                    ui.small(msg.clone());
                }
            });
        if apply {
            let restart_api = self.api_running
                && (self.prefs_edit.api_endpoint() != self.app_settings.api_endpoint());
            self.app_settings = self.prefs_edit.clone();
            if let Ok(mut store) = lock_store(self.service.store()) {
                store.set_policy(self.app_settings.store_policy());
            }
            self.prefs_status = Some(match self.app_settings.save() {
                Ok(()) => "Saved".to_string(),
                Err(e) => format!("Save failed: {}", e),
            });
            if restart_api {
                self.start_api();
            }
        }
        self.show_prefs_window = open;
    }

    fn toast(&self, ctx: &egui::Context) {
        let (Some(msg), Some(when)) = (&self.last_save_info, self.last_info_time) else { return };
        if when.elapsed() > Duration::from_secs(3) {
            return;
        }
        egui::Area::new("bottom_right_toast".into())
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
            .interactable(false)
            .show(ctx, |ui| {
                let (fill, stroke_col, text_col) = match self.last_info_style {
                    NoticeStyle::Subtle => (Color32::from_rgba_premultiplied(20, 20, 20, 170), Color32::from_gray(60), Color32::from_gray(200)),
                    NoticeStyle::Prominent => (Color32::from_rgba_premultiplied(30, 30, 30, 230), Color32::from_gray(100), Color32::LIGHT_GREEN),
                };
                egui::Frame::popup(ui.style())
                    .corner_radius(egui::CornerRadius::same(8))
                    .stroke(Stroke::new(1.0, stroke_col))
                    .fill(fill)
                    .inner_margin(egui::Margin::symmetric(10, 6))
                    .show(ui, |ui| {
                        ui.colored_label(text_col, msg);
                    });
            });
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

impl eframe::App for VaultApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_background(ctx);
        self.top_bar(ctx);

        if self.session.is_none() {
            self.login_panel(ctx);
        } else {
            self.error_banner(ctx);
            self.sidebar(ctx);
            self.canvas(ctx);
            self.detail_window(ctx);
        }
        self.load_versions_window(ctx);
        self.prefs_window(ctx);
        self.toast(ctx);

        // Autosave five seconds after the last change
        if self.dirty && self.last_change.elapsed() >= AUTOSAVE_AFTER {
            self.save_now_with(NoticeStyle::Subtle);
        }
        if self.dirty {
            ctx.request_repaint_after(AUTOSAVE_AFTER);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.dirty {
            self.save_now_with(NoticeStyle::Subtle);
        }
        if self.api_running {
            server::stop_server();
        }
    }
}

fn screen(rect: Rect, view: &ViewTransform, world: Pos2) -> Pos2 {
    rect.min + view.to_screen(world).to_vec2()
}

fn paint_scene(painter: &egui::Painter, rect: Rect, scene: &Scene) {
    let view = &scene.view;
    for edge in &scene.edges {
        let a = screen(rect, view, edge.from);
        let b = screen(rect, view, edge.to);
        let stroke = Stroke::new(edge.width * view.scale, style::with_opacity(edge.color, edge.opacity));
        if edge.dashed {
            for seg in render::scene::dash_segments(a, b, view.scale) {
                painter.line_segment(seg, stroke);
            }
        } else {
            painter.line_segment([a, b], stroke);
        }
    }
    let font = egui::FontId::proportional((style::LABEL_FONT_SIZE * view.scale).max(6.0));
    for node in &scene.nodes {
        let c = screen(rect, view, node.center);
        let r = node.radius * view.scale;
        painter.circle_filled(c, r, style::with_opacity(node.fill, node.opacity));
        let stroke = Stroke::new(node.stroke.width * view.scale, style::with_opacity(node.stroke.color, node.opacity));
        painter.circle_stroke(c, r, stroke);
        let label_color = style::with_opacity(Color32::from_gray(220), node.opacity);
        painter.text(
            screen(rect, view, node.label_pos),
            egui::Align2::CENTER_CENTER,
            &node.label,
            font.clone(),
            label_color,
        );
    }
}

fn paint_stats(painter: &egui::Painter, rect: Rect, scene: &Scene) {
    let mut lines = vec![format!("Nodes: {}", scene.stats.nodes), format!("Links: {}", scene.stats.links)];
    if let Some(m) = scene.stats.matches {
        lines.push(format!("Filtered: {}", m));
    }
    let font = egui::FontId::proportional(12.0);
    let origin = rect.left_top() + Vec2::new(12.0, 12.0);
    let bg = Rect::from_min_size(origin, Vec2::new(110.0, 8.0 + 16.0 * lines.len() as f32));
    painter.rect_filled(bg, 6.0, Color32::from_rgba_premultiplied(20, 20, 20, 190));
    for (i, line) in lines.into_iter().enumerate() {
        painter.text(
            origin + Vec2::new(8.0, 4.0 + 16.0 * i as f32),
            egui::Align2::LEFT_TOP,
            line,
            font.clone(),
            Color32::from_gray(220),
        );
    }
}

fn paint_legend(painter: &egui::Painter, rect: Rect) {
    let nodes = style::node_legend();
    let edges = style::edge_legend();
    let row = 16.0;
    let height = 12.0 + row * (nodes.len() + edges.len()) as f32;
    let origin = rect.left_bottom() + Vec2::new(12.0, -12.0 - height);
    let bg = Rect::from_min_size(origin, Vec2::new(150.0, height));
    painter.rect_filled(bg, 6.0, Color32::from_rgba_premultiplied(20, 20, 20, 190));
    let font = egui::FontId::proportional(11.0);
    let mut y = origin.y + 6.0 + row * 0.5;
    for item in &nodes {
        painter.circle_filled(Pos2::new(origin.x + 14.0, y), 5.0, item.color);
        painter.text(Pos2::new(origin.x + 26.0, y), egui::Align2::LEFT_CENTER, &item.label, font.clone(), Color32::from_gray(220));
        y += row;
    }
    for item in &edges {
        let a = Pos2::new(origin.x + 6.0, y);
        let b = Pos2::new(origin.x + 22.0, y);
        let stroke = Stroke::new(2.0, item.color);
        if item.dashed {
            for seg in render::scene::dash_segments(a, b, 0.6) {
                painter.line_segment(seg, stroke);
            }
        } else {
            painter.line_segment([a, b], stroke);
        }
        painter.text(Pos2::new(origin.x + 26.0, y), egui::Align2::LEFT_CENTER, &item.label, font.clone(), Color32::from_gray(220));
        y += row;
    }
}

fn hover_card(ctx: &egui::Context, card: &HoverCard) {
    let Some(pointer) = ctx.pointer_hover_pos() else { return };
    egui::Area::new("hover_card".into())
        .order(egui::Order::Tooltip)
        .fixed_pos(pointer + Vec2::new(16.0, 16.0))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_max_width(280.0);
                match card {
                    HoverCard::Node { title, preview, tags } => {
                        ui.strong(title);
                        ui.label(preview);
                        if !tags.is_empty() {
                            ui.horizontal_wrapped(|ui| {
                                for (name, color) in tags {
                                    ui.colored_label(*color, format!("#{}", name));
                                }
                            });
                        }
                    }
                    HoverCard::Link { label, description, color } => {
                        ui.colored_label(*color, label);
                        if let Some(d) = description {
                            ui.label(d);
                        }
                    }
                }
            });
        });
}
