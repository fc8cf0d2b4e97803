//! What the UI shows for a given application state.

use std::fmt::Write as _;

use db::models::generated_code::HistoryRecord;
use services::services::catalog::Component;

use crate::{App, messages, session::SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Main,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryView {
    /// Authenticated: the sorted list (possibly empty) and any load failure.
    Records {
        records: Vec<HistoryRecord>,
        load_error: Option<String>,
    },
    /// Guest or degraded session: no list, only the fixed advisory.
    LoginRequired(&'static str),
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub screen: Screen,
    pub user_label: String,
    pub is_authenticated: bool,
    pub components: Vec<&'static str>,
    pub selected_component: &'static str,
    pub description: String,
    pub submit_enabled: bool,
    pub busy: bool,
    pub code: Option<String>,
    pub error: Option<String>,
    pub advisory: Option<String>,
    pub auth_error: Option<String>,
    pub history: HistoryView,
}

impl ViewModel {
    pub fn from_app(app: &App) -> Self {
        let session = app.session();
        let generation = app.generation();

        let screen = if session.is_loading() {
            Screen::Loading
        } else {
            Screen::Main
        };

        let history = match session {
            SessionState::AuthLoading => HistoryView::Hidden,
            SessionState::Authenticated(_) => HistoryView::Records {
                records: app.history().records().to_vec(),
                load_error: app.history().load_error().map(str::to_string),
            },
            SessionState::Anonymous(_) | SessionState::Unauthenticated { .. } => {
                HistoryView::LoginRequired(messages::HISTORY_REQUIRES_LOGIN)
            }
        };

        Self {
            screen,
            user_label: session.label(),
            is_authenticated: session.is_authenticated(),
            components: Component::all().into_iter().map(Component::name).collect(),
            selected_component: app.form().component.name(),
            description: app.form().description.clone(),
            submit_enabled: !generation.busy && !session.is_loading(),
            busy: generation.busy,
            code: generation.code.clone(),
            error: generation.error.clone(),
            advisory: generation.advisory.clone(),
            auth_error: app.auth_error().map(str::to_string),
            history,
        }
    }

    /// Plain-text rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.screen == Screen::Loading {
            out.push_str("Connecting...\n");
            return out;
        }

        let _ = writeln!(out, "Signed in as: {}", self.user_label);
        if let Some(e) = &self.auth_error {
            let _ = writeln!(out, "[auth] {e}");
        }
        let _ = writeln!(out, "Component: {}", self.selected_component);
        if !self.description.is_empty() {
            let _ = writeln!(out, "Behavior: {}", self.description);
        }
        if self.busy {
            out.push_str("Generating...\n");
        }
        if let Some(e) = &self.error {
            let _ = writeln!(out, "[error] {e}");
        }
        if let Some(code) = &self.code {
            out.push_str("\n----- generated code -----\n");
            out.push_str(code);
            if !code.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("--------------------------\n");
        }
        if let Some(a) = &self.advisory {
            let _ = writeln!(out, "[note] {a}");
        }
        out
    }

    pub fn render_history_text(&self) -> String {
        let mut out = String::new();
        match &self.history {
            HistoryView::Hidden => out.push_str("Connecting...\n"),
            HistoryView::LoginRequired(message) => {
                let _ = writeln!(out, "{message}");
            }
            HistoryView::Records {
                records,
                load_error,
            } => {
                if let Some(e) = load_error {
                    let _ = writeln!(out, "[error] {e}");
                }
                if records.is_empty() {
                    let _ = writeln!(out, "{}", messages::HISTORY_EMPTY);
                }
                for record in records {
                    let when = record
                        .timestamp
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "pending".to_string());
                    let _ = writeln!(
                        out,
                        "\n# {} | {} | {}\n# {}\n{}",
                        when, record.component, record.id, record.description, record.code
                    );
                }
            }
        }
        out
    }
}

impl App {
    pub fn view(&self) -> ViewModel {
        ViewModel::from_app(self)
    }
}
