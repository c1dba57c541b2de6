//! Terminal event loop.
//!
//! Runs on a blocking thread; async work (refresh, sign-out) is dispatched
//! onto the runtime handle. The loop re-renders from controller snapshots
//! and exits as soon as the auth state stops being `Authenticated`, so the
//! protected view never outlives the session.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::runtime::Handle;

use agrivision_application::{DashboardController, SessionStore};
use agrivision_core::dashboard::DashboardTab;

use crate::ui;

const TICK: Duration = Duration::from_millis(150);

pub fn run(
    controller: Arc<DashboardController>,
    store: Arc<SessionStore>,
    handle: Handle,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &controller, &store, &handle);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &Arc<DashboardController>,
    store: &Arc<SessionStore>,
    handle: &Handle,
) -> Result<()> {
    loop {
        let auth = store.state();
        let Some(session) = auth.session().cloned() else {
            // Signed out or expired: stop rendering the protected view.
            tracing::debug!("auth state left authenticated, leaving dashboard");
            return Ok(());
        };

        let state = controller.snapshot();
        terminal.draw(|frame| ui::draw(frame, &state, &session.user.email))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Tab | KeyCode::Right => controller.select_tab(state.selected_tab.next()),
            KeyCode::BackTab | KeyCode::Left => {
                controller.select_tab(state.selected_tab.previous())
            }
            KeyCode::Char('1') => controller.select_tab(DashboardTab::Overview),
            KeyCode::Char('2') => controller.select_tab(DashboardTab::Predictions),
            KeyCode::Char('3') => controller.select_tab(DashboardTab::Analytics),
            KeyCode::Char('4') => controller.select_tab(DashboardTab::Map),
            KeyCode::Char('5') => controller.select_tab(DashboardTab::Calendar),
            KeyCode::Char('r') => {
                let controller = Arc::clone(controller);
                handle.spawn(async move { controller.resync().await });
            }
            KeyCode::Char('o') => {
                let store = Arc::clone(store);
                handle.spawn(async move {
                    if let Err(err) = store.sign_out().await {
                        tracing::warn!(error = %err, "sign-out failed");
                    }
                });
            }
            _ => {}
        }
    }
}
