use std::io::Stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::{Frame, Terminal};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::event::{ActivityGuard, Update};
use super::state::{Activity, Focus};
use crate::config::Keymap;
use crate::connector::{ConnectParams, Connector, DriverKind};
use crate::export;
use crate::operation::{Operation, OperationRegistry};
use crate::registry::ConnectionRegistry;
use crate::session::{DatabaseEntry, SessionState};
use crate::ui::{
    activity_span, centered_rect, help_rows, render_error, AddDbForm, DbTree, FormAction,
    HelpAction, HelpPopup, PathPrompt, Priority, PromptResult, QueryEditor, ResultGrid, Segment,
    StatusLine, TreeAction,
};
use crate::util::expand_home;
use crate::workspace::QueryWorkspace;

/// Modal overlays; at most one is open and it takes every key.
enum Overlay {
    None,
    Help(HelpPopup),
    AddDb(AddDbForm),
    Download(PathPrompt),
}

/// The session controller.
///
/// Owns all presentation state and is only touched from the thread running [`App::run`].
/// Connector I/O runs on tokio tasks that report back through the update channel.
pub struct App {
    pub registry: ConnectionRegistry,
    pub workspace: QueryWorkspace,
    keymap: Keymap,
    operations: OperationRegistry,

    pub focus: Focus,
    pub current_db: Option<String>,
    pub tree: DbTree,
    pub editor: QueryEditor,
    pub grid: ResultGrid,
    overlay: Overlay,

    pub activity: Activity,
    pub last_status: Option<String>,
    pub last_error: Option<String>,

    /// Restored databases that have not reopened (yet). Kept in the saved session.
    pending_restore: Vec<DatabaseEntry>,

    rt: Handle,
    updates_tx: mpsc::UnboundedSender<Update>,
    updates_rx: mpsc::UnboundedReceiver<Update>,
    quit: bool,
}

impl App {
    /// `keymap` must already be validated against `operations`.
    pub fn new(
        keymap: Keymap,
        operations: OperationRegistry,
        rt: Handle,
        updates_tx: mpsc::UnboundedSender<Update>,
        updates_rx: mpsc::UnboundedReceiver<Update>,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            workspace: QueryWorkspace::new(),
            keymap,
            operations,

            focus: Focus::QueryInput,
            current_db: None,
            tree: DbTree::new(),
            editor: QueryEditor::new(),
            grid: ResultGrid::new(),
            overlay: Overlay::None,

            activity: Activity::default(),
            last_status: None,
            last_error: None,

            pending_restore: Vec::new(),

            rt,
            updates_tx,
            updates_rx,
            quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        while !self.quit {
            self.drain_updates();
            self.activity.tick();

            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.on_key(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Handles one key press. Returns true once the user asked to quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        if self.last_error.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.last_error = None;
            }
            return self.quit;
        }

        if !matches!(self.overlay, Overlay::None) {
            self.on_overlay_key(key);
            return self.quit;
        }

        if let Some(op) = self.resolve(&key) {
            debug!(operation = op.name(), "dispatch");
            self.execute(op);
            return self.quit;
        }

        match self.focus {
            Focus::Tree => {
                if let Some(action) = self.tree.handle_key(key) {
                    self.on_tree_action(action);
                }
            }
            Focus::QueryInput => {
                if self.editor.input(key) {
                    self.workspace.set_current_text(self.editor.text());
                }
            }
            Focus::ResultView => self.grid.handle_key(key),
        }

        self.quit
    }

    /// Plain characters typed into the query input are text, never operations.
    fn resolve(&self, key: &KeyEvent) -> Option<Operation> {
        let is_rune = matches!(key.code, KeyCode::Char(_))
            && !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
        if is_rune && self.focus == Focus::QueryInput {
            return None;
        }

        let name = self.keymap.resolve_event(key)?;
        self.operations.get(name)
    }

    pub fn execute(&mut self, op: Operation) {
        match op {
            Operation::Quit => self.quit = true,
            Operation::GotoQueryInput => self.focus = Focus::QueryInput,
            Operation::GotoTree => self.focus = Focus::Tree,
            Operation::GotoResult => self.focus = Focus::ResultView,
            Operation::SetCurrentDb => self.set_current_db(),
            Operation::AddDb => self.overlay = Overlay::AddDb(AddDbForm::new()),
            Operation::ExecQuery => self.exec_query(),
            Operation::ShowHelp => {
                let rows = help_rows(&self.keymap, &self.operations);
                self.overlay = Overlay::Help(HelpPopup::new(rows));
            }
            Operation::NextQueryTab => {
                self.workspace.next_tab();
                self.load_editor();
            }
            Operation::PrevQueryTab => {
                self.workspace.prev_tab();
                self.load_editor();
            }
            Operation::CloseTab => {
                self.workspace.close_tab();
                self.load_editor();
            }
            Operation::CloseDb => self.close_selected_db(),
            Operation::DownloadResult => {
                if self.grid.result().is_none() {
                    self.notify("No result to download");
                    return;
                }
                let name = export::default_file_name(Local::now());
                self.overlay = Overlay::Download(PathPrompt::new("Save result as", &name));
            }
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    fn on_overlay_key(&mut self, key: KeyEvent) {
        match &mut self.overlay {
            Overlay::None => {}
            Overlay::Help(popup) => {
                if popup.handle_key(key) == HelpAction::Close {
                    self.overlay = Overlay::None;
                }
            }
            Overlay::AddDb(form) => match form.handle_key(key) {
                FormAction::Continue => {}
                FormAction::Cancel => self.overlay = Overlay::None,
                FormAction::Submit { driver, params } => {
                    self.overlay = Overlay::None;
                    self.open_database(driver.name(), params);
                }
            },
            Overlay::Download(prompt) => match prompt.handle_key(key) {
                PromptResult::Pending => {}
                PromptResult::Cancelled => self.overlay = Overlay::None,
                PromptResult::Submitted(path) => {
                    self.overlay = Overlay::None;
                    self.download_result(expand_home(&path));
                }
            },
        }
    }

    fn on_tree_action(&mut self, action: TreeAction) {
        match action {
            TreeAction::LoadTables { id } => self.load_tables(id),
            TreeAction::LoadColumns { id, table } => self.load_columns(id, table),
        }
    }

    fn load_editor(&mut self) {
        self.editor.set_text(self.workspace.current_text());
    }

    /// Shows a dismissible error popup. Errors raised before it is dismissed are appended.
    fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(message = %message, "notification");
        self.last_error = Some(match self.last_error.take() {
            Some(shown) => format!("{shown}\n{message}"),
            None => message,
        });
    }

    /// Marks an operation as in flight. Move the guard into the task doing the work.
    fn begin_activity(&mut self) -> ActivityGuard {
        self.activity.start();
        ActivityGuard::new(self.updates_tx.clone())
    }

    /// Opens a database in the background. The tree is updated when it succeeds.
    pub fn open_database(&mut self, driver: &str, params: ConnectParams) {
        let kind: DriverKind = match driver.parse() {
            Ok(kind) => kind,
            Err(err) => {
                self.notify(err.to_string());
                return;
            }
        };

        info!(driver = %kind, name = %kind.display_name(&params), "opening database");
        self.last_status = Some(format!("Opening {}...", kind.display_name(&params)));

        let guard = self.begin_activity();
        self.rt.spawn(async move {
            let result = kind.open(&params).await;
            guard.send(Update::ConnectionOpened {
                driver: kind,
                params,
                result,
            });
        });
    }

    fn load_tables(&mut self, id: String) {
        let connector = match self.registry.connector(&id) {
            Ok(connector) => connector,
            Err(err) => {
                self.tree.tables_failed(&id);
                self.notify(err.to_string());
                return;
            }
        };

        let guard = self.begin_activity();
        self.rt.spawn(async move {
            let result = connector.list_tables().await;
            guard.send(Update::TablesLoaded { id, result });
        });
    }

    fn load_columns(&mut self, id: String, table: String) {
        let connector = match self.registry.connector(&id) {
            Ok(connector) => connector,
            Err(err) => {
                self.tree.columns_failed(&id, &table);
                self.notify(err.to_string());
                return;
            }
        };

        let guard = self.begin_activity();
        self.rt.spawn(async move {
            let result = connector.list_columns(&table).await;
            guard.send(Update::ColumnsLoaded { id, table, result });
        });
    }

    fn exec_query(&mut self) {
        let Some(id) = self.current_db.clone() else {
            self.notify("No database has been selected");
            return;
        };

        let text = self.workspace.current_text().trim().to_string();
        if text.is_empty() {
            self.last_status = Some("No query to run".to_string());
            return;
        }

        let connector: Arc<dyn Connector> = match self.registry.connector(&id) {
            Ok(connector) => connector,
            Err(err) => {
                self.notify(err.to_string());
                return;
            }
        };

        info!(id = %id, "running query");
        self.last_status = Some("Running query...".to_string());

        let guard = self.begin_activity();
        self.rt.spawn(async move {
            let started = Instant::now();
            let result = connector.run_query(&text).await;
            guard.send(Update::QueryFinished {
                id,
                result,
                elapsed: started.elapsed(),
            });
        });
    }

    fn set_current_db(&mut self) {
        let Some(id) = self.tree.selected_database().map(str::to_string) else {
            self.last_status = Some("Select a database in the tree first".to_string());
            return;
        };

        let name = self.registry.display_name(&id).unwrap_or(&id).to_string();
        info!(id = %id, "current database changed");
        self.last_status = Some(format!("Current DB: {name}"));
        self.current_db = Some(id);
    }

    fn close_selected_db(&mut self) {
        let Some(id) = self.tree.selected_database().map(str::to_string) else {
            self.last_status = Some("Select a database in the tree first".to_string());
            return;
        };

        let name = self.registry.close_connection(&id);
        self.tree.remove_database(&id);

        if self.current_db.as_deref() == Some(id.as_str()) {
            self.current_db = self.registry.connections().into_iter().next().map(|c| c.id);
        }

        self.last_status = Some(format!("Closed {}", name.unwrap_or(id)));
    }

    fn download_result(&mut self, path: PathBuf) {
        let Some(result) = self.grid.result() else {
            self.notify("No result to download");
            return;
        };

        match export::write_csv(result, &path) {
            Ok(()) => {
                info!(path = %path.display(), rows = result.rows.len(), "result saved");
                self.last_status = Some(format!("Saved {}", path.display()));
            }
            Err(err) => self.notify(format!("{err:#}")),
        }
    }

    /// Applies every queued update without blocking.
    pub fn drain_updates(&mut self) {
        while let Ok(update) = self.updates_rx.try_recv() {
            self.apply_update(update);
        }
    }

    /// Waits for the next update without applying it.
    pub async fn recv_update(&mut self) -> Option<Update> {
        self.updates_rx.recv().await
    }

    pub fn apply_update(&mut self, update: Update) {
        match update {
            Update::ConnectionOpened {
                driver,
                params,
                result,
            } => match result {
                Ok(connector) => {
                    if let Some(pos) = self
                        .pending_restore
                        .iter()
                        .position(|e| e.driver == driver.name() && e.connect_params == params)
                    {
                        self.pending_restore.remove(pos);
                    }

                    let name = connector.display_name().to_string();
                    let id = self.registry.insert(driver, params, connector);
                    self.tree.add_database(&id, &name);
                    if self.current_db.is_none() {
                        self.current_db = Some(id);
                    }
                    self.last_status = Some(format!("Opened {name}"));
                }
                Err(err) => self.notify(err.to_string()),
            },
            Update::TablesLoaded { id, result } => match result {
                Ok(tables) => {
                    debug!(id = %id, tables = tables.len(), "tables loaded");
                    self.tree.set_tables(&id, tables);
                }
                Err(err) => {
                    self.tree.tables_failed(&id);
                    self.notify(err.to_string());
                }
            },
            Update::ColumnsLoaded { id, table, result } => match result {
                Ok(columns) => self.tree.set_columns(&id, &table, columns),
                Err(err) => {
                    self.tree.columns_failed(&id, &table);
                    self.notify(err.to_string());
                }
            },
            Update::QueryFinished {
                id,
                result,
                elapsed,
            } => match result {
                Ok(result) => {
                    info!(
                        id = %id,
                        rows = result.rows.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "query finished"
                    );
                    self.grid.set_result(result, elapsed);
                    self.last_status = self.grid.summary();
                }
                Err(err) => {
                    self.last_status = Some("Query failed".to_string());
                    self.notify(err.to_string());
                }
            },
            Update::ActivityStopped => self.activity.stop(),
        }
    }

    /// Restores query tabs and reopens the databases of a previous session.
    pub fn restore_session(&mut self, state: SessionState) {
        if let Some(queries) = state.queries {
            self.workspace.restore(queries);
            self.load_editor();
        }

        for entry in state.databases {
            self.pending_restore.push(entry.clone());
            self.open_database(&entry.driver, entry.connect_params);
        }
    }

    /// Open databases plus restored ones still opening or that failed to reopen.
    pub fn session_state(&self) -> SessionState {
        let mut databases: Vec<DatabaseEntry> = self
            .registry
            .snapshot()
            .into_iter()
            .map(DatabaseEntry::from)
            .collect();
        databases.extend(self.pending_restore.iter().cloned());

        SessionState {
            databases,
            queries: self.workspace.snapshot(),
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let [main, status] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(25), Constraint::Percentage(75)])
                .areas(main);
        let [editor_area, grid_area] =
            Layout::vertical([Constraint::Length(10), Constraint::Min(3)]).areas(right);

        self.tree.render(
            frame,
            left,
            self.current_db.as_deref(),
            self.focus == Focus::Tree,
        );
        let title = self.workspace.title();
        self.editor
            .render(frame, editor_area, &title, self.focus == Focus::QueryInput);
        self.grid
            .render(frame, grid_area, self.focus == Focus::ResultView);

        let line = self.status_line().build(status.width);
        frame.render_widget(line, status);

        let screen = frame.area();
        match &mut self.overlay {
            Overlay::None => {}
            Overlay::Help(popup) => popup.render(frame, centered_rect(80, 70, screen)),
            Overlay::AddDb(form) => form.render(frame, screen),
            Overlay::Download(prompt) => prompt.render(frame, screen),
        }

        if let Some(message) = &self.last_error {
            render_error(frame, message);
        }
    }

    fn status_line(&self) -> StatusLine {
        let current = match &self.current_db {
            Some(id) => format!(
                "Current DB: {}",
                self.registry.display_name(id).unwrap_or(id)
            ),
            None => "Current DB: none".to_string(),
        };

        let help = self
            .keymap
            .keys_for(Operation::ShowHelp.name())
            .first()
            .map(|key| format!("{key} help"));

        StatusLine::new()
            .push(
                Segment::new(self.focus.label(), Priority::Critical)
                    .style(Style::default().fg(Color::Black).bg(Color::Cyan)),
            )
            .push(Segment::new(current, Priority::High).style(Style::default().fg(Color::Green)))
            .push_if(self.activity.is_busy(), || {
                Segment::from_span(
                    activity_span(self.activity.throbber(), self.activity.in_flight()),
                    Priority::Critical,
                )
            })
            .push_if(self.last_status.is_some(), || {
                Segment::new(self.last_status.clone().unwrap_or_default(), Priority::Low)
            })
            .push_if(help.is_some(), || {
                Segment::new(help.clone().unwrap_or_default(), Priority::Low)
                    .style(Style::default().fg(Color::DarkGray))
                    .right()
            })
    }
}
