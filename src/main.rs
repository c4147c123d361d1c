mod app;
mod backend;
mod config;
mod logging;
mod nav;
mod page;
mod ui;

use anyhow::{bail, Result};
use app::{App, InputMode};
use backend::{Response, TreeStore};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nav::Location;
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

/// Terminal cross-reference browser for source trees
#[derive(Parser)]
#[command(name = "lxrview", version, about)]
struct Cli {
    /// Directory whose subdirectories are the browsable trees
    /// (defaults to the current directory)
    root: Option<PathBuf>,

    /// Navigation style: incremental, popup or off
    #[arg(long)]
    mode: Option<String>,

    /// Start at a location, e.g. 'linux/kernel/fork.c#L120'
    #[arg(long)]
    open: Option<String>,

    /// Log debug detail
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let mut cfg = config::load_config();
    if let Some(mode) = cli.mode {
        cfg.nav.mode = mode;
    }

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let store = TreeStore::new(root.clone(), cfg.listing.fragment_rows);
    let trees = store.trees();
    if trees.is_empty() {
        bail!(
            "no source trees under {} (each subdirectory is a tree)",
            root.display()
        );
    }

    let initial = match &cli.open {
        Some(fragment) => Location::parse(fragment),
        None => Location::parse(&format!("{}/", trees[0])),
    };
    if !trees.contains(&initial.tree) {
        bail!(
            "unknown tree '{}' — available: {}",
            initial.tree,
            trees.join(", ")
        );
    }

    let (req_tx, req_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let _worker = backend::spawn(store, req_rx, resp_tx);

    let mut app = App::new(cfg, req_tx, initial);

    // Load syntax highlighting (once, reused for all files)
    let highlighter = ui::highlight::Highlighter::new();

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &highlighter, &resp_rx);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {:?}", err);
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    hl: &ui::highlight::Highlighter,
    resp_rx: &mpsc::Receiver<Response>,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui::draw(f, app, hl))?;
        let viewport = ui::content_viewport_height(terminal.size()?.height);

        // Poll with a timeout so responses and the watchdog keep moving
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                match app.input.clone() {
                    InputMode::Address(buf) => handle_address_input(app, key, buf),
                    InputMode::Search(buf) => handle_search_input(app, key, buf),
                    InputMode::Normal => handle_normal_input(app, key, viewport),
                }
            }
        }

        // Responses from the content worker (non-blocking, in arrival order)
        while let Ok(resp) = resp_rx.try_recv() {
            app.on_response(resp);
        }

        app.watchdog_tick();
        app.tick();

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_normal_input(app: &mut App, key: KeyEvent, viewport: usize) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true
        }

        KeyCode::Tab => app.next_link(),
        KeyCode::BackTab => app.prev_link(),
        KeyCode::Enter => app.click_current(),

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(viewport),
        KeyCode::PageUp => app.scroll_up(viewport),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(viewport / 2)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(viewport / 2)
        }
        KeyCode::Home => app.scroll_top(),
        KeyCode::End => app.scroll_bottom(),

        KeyCode::Char('g') => app.input = InputMode::Address(app.page.fragment.clone()),
        KeyCode::Char('/') | KeyCode::Char('s') => app.input = InputMode::Search(String::new()),

        KeyCode::Char(']') => app.version_next(),
        KeyCode::Char('[') => app.version_previous(),

        KeyCode::Char('b') => app.back(),
        KeyCode::Char('f') => app.forward(),
        KeyCode::Char('r') => app.reload(),
        KeyCode::Char('p') => app.show_prefs_hint(),

        KeyCode::Esc => {
            if app.popup.is_some() {
                app.popup = None;
            } else if app.page.search.visible {
                app.page.hide_search();
            }
        }
        _ => {}
    }
}

fn handle_address_input(app: &mut App, key: KeyEvent, mut buf: String) {
    match key.code {
        KeyCode::Enter => {
            app.input = InputMode::Normal;
            app.submit_address(&buf);
        }
        KeyCode::Esc => app.input = InputMode::Normal,
        KeyCode::Backspace => {
            buf.pop();
            app.input = InputMode::Address(buf);
        }
        KeyCode::Char(c) => {
            buf.push(c);
            app.input = InputMode::Address(buf);
        }
        _ => {}
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent, mut buf: String) {
    match key.code {
        KeyCode::Enter => {
            app.input = InputMode::Normal;
            app.submit_search(&buf);
        }
        KeyCode::Esc => app.input = InputMode::Normal,
        KeyCode::Backspace => {
            buf.pop();
            app.input = InputMode::Search(buf);
        }
        KeyCode::Char(c) => {
            buf.push(c);
            app.input = InputMode::Search(buf);
        }
        _ => {}
    }
}
