//! TUI application state and main event loop

use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyCode, KeyEvent,
    KeyEventKind, KeyModifiers, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use url::Url;

use crate::api::ChatClient;
use crate::config::Config;
use crate::models::OutboundEvent;
use crate::realtime::{socket_url, RealtimeChannel};
use crate::view::{
    ChatSurface, ChatView, ClipboardItem, Composer, PasteOutcome, Severity, UploadRequest,
};

use super::backend::{Backend, BackendCommand, BackendResponse};
use super::clipboard;
use super::log_capture::LogBuffer;
use super::log_pane::LogPane;
use super::screen::{InlineImage, Screen};
use super::ui;

/// Redraw interval when nothing happens (notification expiry, log pane).
const TICK: Duration = Duration::from_millis(250);

/// Entries (feed) or lines (log pane) moved per PgUp/PgDn.
const PAGE: usize = 5;

/// Focused pane
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Feed,
    #[default]
    Compose,
}

/// Work a key press asks the event loop to do.
#[derive(Debug)]
pub enum Effect {
    Emit(OutboundEvent),
    Upload(UploadRequest),
    Download { url: String, filename: String },
    ReadClipboard,
}

/// Application state
pub struct App {
    pub view: ChatView<Screen>,
    pub composer: Composer,
    /// Ctrl+O path prompt, while open.
    pub path_prompt: Option<Composer>,
    pub active_pane: Pane,
    pub show_help: bool,
    pub log_pane: LogPane,
    /// Server URL shown in the header.
    pub server_label: String,
    pub should_exit: bool,
}

impl App {
    pub fn new(user: impl Into<String>, server_label: impl Into<String>, logs: LogBuffer) -> Self {
        Self {
            view: ChatView::new(user, Screen::default()),
            composer: Composer::default(),
            path_prompt: None,
            active_pane: Pane::default(),
            show_help: false,
            log_pane: LogPane::new(logs),
            server_label: server_label.into(),
            should_exit: false,
        }
    }

    /// Per-iteration housekeeping before drawing.
    pub fn refresh(&mut self, now: Instant) {
        self.log_pane.refresh();
        self.view.surface_mut().tick(now);
    }

    pub fn handle_event(&mut self, event: Event) -> Option<Effect> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Paste(text) => {
                self.paste_text(&text);
                None
            }
            // Resize is picked up by the next draw.
            _ => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Effect> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            self.should_exit = true;
            return None;
        }
        if self.show_help {
            self.show_help = false;
            return None;
        }
        match key.code {
            KeyCode::F(1) => {
                self.show_help = true;
                return None;
            }
            KeyCode::F(12) => {
                self.log_pane.toggle();
                return None;
            }
            _ => {}
        }

        if self.view.surface().preview.is_some() {
            return self.handle_preview_key(key);
        }
        if self.path_prompt.is_some() {
            self.handle_prompt_key(key);
            return None;
        }

        match key.code {
            KeyCode::Char('o') if ctrl => {
                self.path_prompt = Some(Composer::default());
                return None;
            }
            KeyCode::Char('v') if ctrl => return Some(Effect::ReadClipboard),
            KeyCode::Tab | KeyCode::BackTab => {
                self.active_pane = match self.active_pane {
                    Pane::Feed => Pane::Compose,
                    Pane::Compose => Pane::Feed,
                };
                return None;
            }
            KeyCode::PageUp => {
                if self.log_pane.visible {
                    self.log_pane.scroll_up(PAGE);
                } else {
                    self.view.surface_mut().feed.scroll_up(PAGE);
                }
                return None;
            }
            KeyCode::PageDown => {
                if self.log_pane.visible {
                    self.log_pane.scroll_down(PAGE);
                } else {
                    self.view.surface_mut().feed.scroll_down(PAGE);
                }
                return None;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Feed => self.handle_feed_key(key),
            Pane::Compose => self.handle_compose_key(key),
        }
    }

    fn handle_preview_key(&mut self, key: KeyEvent) -> Option<Effect> {
        match key.code {
            KeyCode::Enter => self.view.confirm_upload().map(Effect::Upload),
            KeyCode::Esc => {
                self.view.cancel_upload();
                None
            }
            _ => None,
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.path_prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Enter => {
                let path = expand_home(prompt.text().trim());
                self.path_prompt = None;
                if !path.as_os_str().is_empty() {
                    self.view.select_file(&path);
                }
            }
            KeyCode::Esc => self.path_prompt = None,
            _ => edit(prompt, key),
        }
    }

    fn handle_feed_key(&mut self, key: KeyEvent) -> Option<Effect> {
        let feed = &mut self.view.surface_mut().feed;
        match key.code {
            KeyCode::Up => feed.select_previous(),
            KeyCode::Down => feed.select_next(),
            KeyCode::End | KeyCode::Esc => feed.jump_to_bottom(),
            KeyCode::Enter => self.active_pane = Pane::Compose,
            KeyCode::Char('d') => return self.download_selected(),
            _ => {}
        }
        None
    }

    fn handle_compose_key(&mut self, key: KeyEvent) -> Option<Effect> {
        match key.code {
            KeyCode::Enter => {
                // Terminals without keyboard enhancement cannot report
                // Shift+Enter; Alt+Enter works everywhere.
                let modified = key
                    .modifiers
                    .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT);
                self.view
                    .handle_enter(&mut self.composer, modified)
                    .map(Effect::Emit)
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.composer.clear();
                None
            }
            _ => {
                edit(&mut self.composer, key);
                None
            }
        }
    }

    fn download_selected(&mut self) -> Option<Effect> {
        let file = self
            .view
            .surface()
            .feed
            .selected_entry()?
            .attachment()?
            .clone();
        self.view
            .surface_mut()
            .show_notification(&format!("Downloading {}...", file.filename), Severity::Info);
        Some(Effect::Download {
            url: file.url,
            filename: file.filename,
        })
    }

    /// Ctrl+V: attach an image if the clipboard has one, else paste its text.
    pub fn apply_clipboard(&mut self, items: Vec<ClipboardItem>) {
        let text = clipboard::text_of(&items);
        if self.view.paste(items) == PasteOutcome::Default {
            match text {
                Some(text) => self.paste_text(&text),
                None => self
                    .view
                    .surface_mut()
                    .show_notification("Clipboard is empty", Severity::Info),
            }
        }
    }

    /// Default paste: insert text into whichever input is active.
    fn paste_text(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        match self.path_prompt.as_mut() {
            // Paths are single-line.
            Some(prompt) => prompt.insert_str(text.lines().next().unwrap_or("")),
            None => {
                self.active_pane = Pane::Compose;
                self.composer.insert_str(&text);
            }
        }
    }

    pub fn handle_response(&mut self, response: BackendResponse) {
        match response {
            BackendResponse::UploadFinished { id, result } => {
                self.view.upload_finished(id, result);
            }
            BackendResponse::ImageFetched { entry, result } => {
                let image = match result {
                    Ok(thumb) => InlineImage::Ready(thumb),
                    Err(e) => {
                        tracing::warn!("Inline image for entry {} failed: {:#}", entry, e);
                        InlineImage::Failed
                    }
                };
                self.view.surface_mut().set_image(entry, image);
            }
            BackendResponse::Downloaded(Ok(path)) => {
                self.view
                    .surface_mut()
                    .show_notification(&format!("Saved {}", path.display()), Severity::Info);
            }
            BackendResponse::Downloaded(Err(e)) => {
                tracing::warn!("Download failed: {:#}", e);
                self.view
                    .surface_mut()
                    .show_notification(&format!("Download failed: {}", e), Severity::Error);
            }
        }
    }
}

/// Plain text editing keys shared by the message input and the path prompt.
fn edit(composer: &mut Composer, key: KeyEvent) {
    let ctrl_or_alt = key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
    match key.code {
        KeyCode::Char(c) if !ctrl_or_alt => composer.insert_char(c),
        KeyCode::Backspace => composer.backspace(),
        KeyCode::Delete => composer.delete(),
        KeyCode::Left => composer.move_left(),
        KeyCode::Right => composer.move_right(),
        KeyCode::Home => composer.move_home(),
        KeyCode::End => composer.move_end(),
        _ => {}
    }
}

/// `~/x` -> `$HOME/x`.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::UserDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

/// Run the TUI until the user quits.
///
/// Logging must already be routed into `logs`; anything written to stderr
/// would corrupt the screen.
pub async fn run(config: &Config, logs: LogBuffer) -> Result<()> {
    let user = config.require_username()?;
    let client = ChatClient::new(config)?;
    let url = socket_url(&config.server_url)?;

    // ratatui::init installs a panic hook that restores the terminal.
    let mut terminal = ratatui::init();
    let enhanced = enable_input_extras();
    let result = run_app(&mut terminal, config, user, client, url, logs).await;
    disable_input_extras(enhanced);
    ratatui::restore();

    result
}

/// Bracketed paste, plus Shift+Enter reporting where the terminal supports
/// it. Returns whether keyboard enhancement was pushed.
fn enable_input_extras() -> bool {
    if let Err(e) = crossterm::execute!(stdout(), EnableBracketedPaste) {
        tracing::warn!("Bracketed paste unavailable: {}", e);
    }
    let supported = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);
    if !supported {
        tracing::debug!("Keyboard enhancement unsupported; use Alt+Enter for new lines");
        return false;
    }
    match crossterm::execute!(
        stdout(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
    ) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Could not enable keyboard enhancement: {}", e);
            false
        }
    }
}

fn disable_input_extras(enhanced: bool) {
    if enhanced {
        let _ = crossterm::execute!(stdout(), PopKeyboardEnhancementFlags);
    }
    let _ = crossterm::execute!(stdout(), DisableBracketedPaste);
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    config: &Config,
    user: String,
    client: ChatClient,
    url: Url,
    logs: LogBuffer,
) -> Result<()> {
    let (channel, mut inbound) = RealtimeChannel::spawn(url, config.session_cookie.clone());
    let mut backend = Backend::start(client, config.download_dir());
    let mut app = App::new(user, config.server_url.clone(), logs);
    let mut input = EventStream::new();
    let mut tick = tokio::time::interval(TICK);

    tracing::info!("TUI started for {}", app.view.current_user());

    while !app.should_exit {
        app.refresh(Instant::now());
        for (entry, url) in app.view.surface_mut().take_image_fetches() {
            backend.send(BackendCommand::FetchImage { entry, url });
        }
        terminal
            .draw(|frame| ui::render(frame, &app))
            .context("Failed to draw terminal")?;

        tokio::select! {
            event = input.next() => match event {
                Some(Ok(event)) => match app.handle_event(event) {
                    Some(Effect::Emit(event)) => channel.emit(event),
                    Some(Effect::Upload(request)) => backend.send(BackendCommand::Upload(request)),
                    Some(Effect::Download { url, filename }) => {
                        backend.send(BackendCommand::Download { url, filename })
                    }
                    Some(Effect::ReadClipboard) => app.apply_clipboard(clipboard::read_items()),
                    None => {}
                },
                Some(Err(e)) => return Err(e).context("Terminal input error"),
                None => break,
            },
            Some(event) = inbound.recv() => app.view.dispatch(event),
            Some(response) = backend.recv() => app.handle_response(response),
            _ = tick.tick() => {}
        }
    }

    tracing::info!("TUI exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UploadError;
    use crate::models::{ChatMessage, FileAttachment, InboundEvent, MessageBody};
    use crate::view::AttachState;
    use std::io::Write;

    fn app() -> App {
        App::new("alice", "http://127.0.0.1:5000", LogBuffer::new())
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn key_with(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert!(app.handle_event(key(KeyCode::Char(c))).is_none());
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("chatroom-app-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();
        path
    }

    fn notification(app: &App) -> Option<(String, Severity)> {
        app.view
            .surface()
            .notification
            .current()
            .map(|n| (n.text.clone(), n.severity))
    }

    #[test]
    fn test_enter_sends_and_clears() {
        let mut app = app();
        type_text(&mut app, "hello");
        match app.handle_event(key(KeyCode::Enter)) {
            Some(Effect::Emit(event)) => assert_eq!(event, OutboundEvent::text("hello")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(app.composer.is_empty());
    }

    #[test]
    fn test_shift_and_alt_enter_insert_newline() {
        let mut app = app();
        type_text(&mut app, "a");
        assert!(app
            .handle_event(key_with(KeyCode::Enter, KeyModifiers::SHIFT))
            .is_none());
        type_text(&mut app, "b");
        assert!(app
            .handle_event(key_with(KeyCode::Enter, KeyModifiers::ALT))
            .is_none());
        assert_eq!(app.composer.text(), "a\nb\n");
        assert_eq!(app.composer.height(), 3);
    }

    #[test]
    fn test_whitespace_enter_keeps_input() {
        let mut app = app();
        type_text(&mut app, "   ");
        assert!(app.handle_event(key(KeyCode::Enter)).is_none());
        assert_eq!(app.composer.text(), "   ");
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = app();
        app.handle_event(key_with(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_exit);
    }

    #[test]
    fn test_help_closes_on_any_key() {
        let mut app = app();
        app.handle_event(key(KeyCode::F(1)));
        assert!(app.show_help);
        app.handle_event(key(KeyCode::Char('x')));
        assert!(!app.show_help);
        // The closing key is swallowed.
        assert!(app.composer.is_empty());
    }

    #[test]
    fn test_attach_prompt_missing_file_notifies() {
        let mut app = app();
        app.handle_event(key_with(KeyCode::Char('o'), KeyModifiers::CONTROL));
        assert!(app.path_prompt.is_some());
        type_text(&mut app, "/definitely/not/here.txt");
        app.handle_event(key(KeyCode::Enter));

        assert!(app.path_prompt.is_none());
        assert!(app.view.surface().preview.is_none());
        let (text, severity) = notification(&app).unwrap();
        assert!(text.contains("/definitely/not/here.txt"));
        assert_eq!(severity, Severity::Error);
    }

    #[test]
    fn test_attach_confirm_and_failure_keeps_preview() {
        let mut app = app();
        let path = temp_file("report.pdf");
        app.handle_event(key_with(KeyCode::Char('o'), KeyModifiers::CONTROL));
        app.handle_event(Event::Paste(path.display().to_string()));
        app.handle_event(key(KeyCode::Enter));

        let preview = app.view.surface().preview.clone().unwrap();
        assert_eq!(preview.name, "report.pdf");
        assert!(!preview.is_image);

        // Keys go to the preview, not the input.
        type_text(&mut app, "zz");
        assert!(app.composer.is_empty());

        let request = match app.handle_event(key(KeyCode::Enter)) {
            Some(Effect::Upload(request)) => request,
            other => panic!("unexpected {:?}", other),
        };
        app.handle_response(BackendResponse::UploadFinished {
            id: request.id,
            result: Err(UploadError::Rejected(Some("disk full".to_string()))),
        });
        assert_eq!(
            notification(&app),
            Some(("disk full".to_string(), Severity::Error))
        );
        assert!(app.view.surface().preview.is_some());

        app.handle_event(key(KeyCode::Esc));
        assert!(app.view.surface().preview.is_none());
        assert!(matches!(app.view.attach_state(), AttachState::Idle));
    }

    #[test]
    fn test_download_selected_file() {
        let mut app = app();
        app.view.dispatch(InboundEvent::Message(ChatMessage {
            sender: "bob".to_string(),
            timestamp: "t".to_string(),
            is_admin: false,
            body: MessageBody::File(FileAttachment {
                filename: "notes.pdf".to_string(),
                size: 10,
                filetype: "pdf".to_string(),
                url: "/uploads/notes.pdf".to_string(),
            }),
        }));

        app.handle_event(key(KeyCode::Tab));
        assert_eq!(app.active_pane, Pane::Feed);
        // Nothing selected yet.
        assert!(app.handle_event(key(KeyCode::Char('d'))).is_none());

        app.handle_event(key(KeyCode::Up));
        match app.handle_event(key(KeyCode::Char('d'))) {
            Some(Effect::Download { url, filename }) => {
                assert_eq!(url, "/uploads/notes.pdf");
                assert_eq!(filename, "notes.pdf");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_clipboard_text_is_default_paste() {
        let mut app = app();
        app.apply_clipboard(vec![ClipboardItem {
            media_type: "text/plain".to_string(),
            data: b"from clipboard".to_vec(),
        }]);
        assert_eq!(app.composer.text(), "from clipboard");
        assert!(app.view.surface().preview.is_none());
    }

    #[test]
    fn test_clipboard_image_is_attached() {
        let mut app = app();
        app.apply_clipboard(vec![
            ClipboardItem {
                media_type: "image/png".to_string(),
                data: vec![0; 16],
            },
            ClipboardItem {
                media_type: "text/plain".to_string(),
                data: b"ignored".to_vec(),
            },
        ]);
        assert!(app.composer.is_empty());
        assert!(app.view.surface().preview.is_some());
    }

    #[test]
    fn test_failed_image_fetch_marks_entry() {
        let mut app = app();
        app.handle_response(BackendResponse::ImageFetched {
            entry: 0,
            result: Err(anyhow::anyhow!("HTTP 404")),
        });
        assert_eq!(app.view.surface().image(0), Some(&InlineImage::Failed));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(expand_home("rel/x"), PathBuf::from("rel/x"));
    }
}
