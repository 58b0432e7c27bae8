mod app;
mod config;
mod driver;
mod error;
mod event;
mod games;
mod input;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use app::App;
use config::ArcadeConfig;
use error::ArcadeError;
use event::{Event, EventHandler};
use games::registry;

#[derive(Parser)]
#[command(name = "rustcade", version, about = "A terminal arcade of retro games")]
struct Cli {
    /// Launch straight into a game (see --list)
    #[arg(short, long)]
    game: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Milliseconds between frames
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Fixed RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Print the available games and exit
    #[arg(long)]
    list: bool,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut ArcadeConfig) {
        if let Some(game) = &self.game {
            config.start_game = Some(game.clone());
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_ms = tick_ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn print_games() {
    for (i, info) in registry::all().iter().enumerate() {
        let key = registry::hotkey(i).unwrap_or(' ');
        println!("[{key}] {:<12} {:<16} {}", info.id, info.name, info.description);
    }
}

fn init_logging(config: &ArcadeConfig) {
    let Some(dir) = config::data_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(log_file) = std::fs::File::create(dir.join("rustcade.log")) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
}

static KEYBOARD_ENHANCED: AtomicBool = AtomicBool::new(false);

/// Restore terminal state; called on every exit path including panics.
fn restore_terminal() {
    if KEYBOARD_ENHANCED.swap(false, Ordering::SeqCst) {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

fn run(config: &ArcadeConfig, start: Option<usize>) -> Result<()> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
    if crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false) {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("enabling key release events")?;
        KEYBOARD_ENHANCED.store(true, Ordering::SeqCst);
        tracing::debug!("keyboard enhancement enabled");
    }

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).context("creating terminal")?;
    terminal.clear()?;

    let mut app = App::new(config);
    if let Some(index) = start {
        app.launch(index);
    }
    let events = EventHandler::new(config.tick_ms);

    loop {
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        match events.next()? {
            Event::Tick => app.on_tick(Instant::now()),
            Event::Key(key) => app.on_key(key, Instant::now()),
            Event::Resize(..) => {}
        }

        if app.should_quit {
            break;
        }
    }

    terminal.show_cursor()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ArcadeConfig::load(cli.config.as_deref()).context("loading config")?;
    cli.apply(&mut config);

    if cli.list {
        print_games();
        return Ok(());
    }

    if cli.save_config {
        let path = cli.config.clone().or_else(config::default_path).context("no config directory on this platform")?;
        config.save_to(&path).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let start = match config.start_game.as_deref() {
        Some(id) => Some(registry::index_of(id).ok_or_else(|| ArcadeError::UnknownGame(id.to_string()))?),
        None => None,
    };

    init_logging(&config);
    tracing::info!(tick_ms = config.tick_ms, seed = ?config.seed, "starting rustcade");

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));

    let result = run(&config, start);
    restore_terminal();
    result
}
