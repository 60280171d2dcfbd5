pub mod state;
pub mod ui;
pub mod widgets;

use crate::messages::{Command, EngineEvent};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use state::AppState;
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc;

pub struct App {
    state: AppState,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    commands_tx: mpsc::UnboundedSender<Command>,
    export_path: PathBuf,
}

impl App {
    pub fn new(
        state: AppState,
        events_rx: mpsc::UnboundedReceiver<EngineEvent>,
        commands_tx: mpsc::UnboundedSender<Command>,
        export_path: PathBuf,
    ) -> Self {
        Self {
            state,
            events_rx,
            commands_tx,
            export_path,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        loop {
            // Render UI
            terminal.draw(|f| ui::render(f, &self.state))?;

            // Handle events (non-blocking)
            if event::poll(std::time::Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key.code);
                }
            }

            if self.state.should_quit {
                break;
            }

            // Process engine events (non-blocking)
            while let Ok(msg) = self.events_rx.try_recv() {
                self.state.update(msg);
            }

            // 60fps target
            tokio::time::sleep(std::time::Duration::from_millis(16)).await;
        }

        Ok(())
    }

    /// Map a key press to a state change or engine command. Keys whose
    /// control is disabled are ignored.
    pub fn handle_key(&mut self, code: KeyCode) {
        let controls = self.state.controls;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.state.should_quit = true;
                self.send(Command::Quit);
            }
            KeyCode::Char('s') if controls.submit_enabled => {
                let profile_name = self.state.selected_profile().unwrap_or_default().to_string();
                self.send(Command::SubmitScan {
                    directory: self.state.directory.clone(),
                    profile_name,
                });
            }
            KeyCode::Char('p') if controls.submit_enabled => {
                self.state.cycle_profile();
            }
            KeyCode::Char('f') if controls.remediation_enabled => {
                self.send(Command::SubmitFix(self.state.fix_options.clone()));
            }
            KeyCode::Char('c') if controls.cancel_enabled => {
                self.send(Command::Cancel);
            }
            KeyCode::Char('a') if controls.filters_enabled => {
                self.state.toggle_filter();
            }
            KeyCode::Char('e') => {
                if let Err(e) = self.export() {
                    tracing::warn!("Export failed: {:#}", e);
                    self.state.add_log(format!("[!] Export failed: {}", e));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.state.scroll_down(),
            KeyCode::Up | KeyCode::Char('k') => self.state.scroll_up(),
            _ => {}
        }
    }

    /// Write the currently visible rows to the export path
    fn export(&mut self) -> Result<()> {
        let rows = self.state.visible_results();
        if !rows.has_file_rows() {
            self.state.add_log("[!] No results to export".to_string());
            return Ok(());
        }

        let file = std::fs::File::create(&self.export_path).with_context(|| {
            format!("Failed to create export file: {}", self.export_path.display())
        })?;
        rows.write_csv(file)?;

        tracing::info!("Exported {} rows to {}", rows.len(), self.export_path.display());
        self.state.add_log(format!(
            "[✓] Exported {} rows to {}",
            rows.len(),
            self.export_path.display()
        ));
        Ok(())
    }

    fn send(&self, command: Command) {
        if self.commands_tx.send(command).is_err() {
            tracing::warn!("Engine is no longer receiving commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::FixOptions;
    use crate::projector::ControlVector;
    use crate::results::ResultSet;
    use crate::task::TaskKind;
    use serde_json::json;

    fn app() -> (App, mpsc::UnboundedReceiver<Command>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (_events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let state = AppState::new(
            "/media/movies".to_string(),
            vec!["roku".to_string()],
            FixOptions::default(),
        );
        let app = App::new(state, events_rx, commands_tx, dir.path().join("out.csv"));
        (app, commands_rx, dir)
    }

    #[test]
    fn test_disabled_keys_send_nothing() {
        let (mut app, mut commands, _dir) = app();
        app.state.controls = ControlVector::default();

        app.handle_key(KeyCode::Char('s'));
        app.handle_key(KeyCode::Char('c'));
        app.handle_key(KeyCode::Char('f'));

        assert!(commands.try_recv().is_err());
    }

    #[test]
    fn test_scan_key_sends_directory_and_profile() {
        let (mut app, mut commands, _dir) = app();
        app.state.controls.submit_enabled = true;

        app.handle_key(KeyCode::Char('s'));

        match commands.try_recv().unwrap() {
            Command::SubmitScan {
                directory,
                profile_name,
            } => {
                assert_eq!(directory, "/media/movies");
                assert_eq!(profile_name, "roku");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_quit_key() {
        let (mut app, mut commands, _dir) = app();
        app.handle_key(KeyCode::Char('q'));
        assert!(app.state().should_quit);
        assert!(matches!(commands.try_recv().unwrap(), Command::Quit));
    }

    #[test]
    fn test_export_writes_visible_rows() {
        let (mut app, _commands, dir) = app();
        app.state.results = ResultSet::classify(
            &json!([{"relative_path": "a.mkv", "is_compatible": false}]),
            TaskKind::Scan,
        )
        .unwrap();
        app.state.results_kind = Some(TaskKind::Scan);

        app.handle_key(KeyCode::Char('e'));

        let written = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert!(written.contains("a.mkv"));
    }
}
