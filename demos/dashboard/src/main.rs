//! Fareboard taxi dashboard.
//!
//! An interactive terminal dashboard over the Chicago taxi-trip dataset,
//! running against an embedded warehouse seeded with deterministic
//! synthetic trips.
//!
//! # Running
//!
//! ```bash
//! cargo run -p fareboard-dashboard
//! ```
//!
//! Keys: `Tab` switches pages, `r` runs the current page's query, `k`
//! cycles the KPI metric, `i` toggles the yearly indicator, `e` exports
//! the current result as CSV, `s` shows the SQL, `q` quits.

use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use fareboard_warehouse::queries::{trips_schema, TRIPS_TABLE};
use fareboard_warehouse::DataFusionWarehouse;

use fareboard_dashboard::app::App;
use fareboard_dashboard::generator::TripGenerator;
use fareboard_dashboard::tui;

const GENERATOR_SEED: u64 = 20_240_101;
const TRIPS_PER_MONTH: usize = 200;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The terminal owns stdout, so logs go to a file.
    let log_file = File::create("fareboard.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    // -- Build the embedded warehouse and seed the fact table --
    let warehouse = DataFusionWarehouse::new()?;
    let mut generator = TripGenerator::new(GENERATOR_SEED);
    let batch = generator.batch(TRIPS_PER_MONTH);
    tracing::info!(rows = batch.num_rows(), "seeding trip table");
    warehouse.register_table(TRIPS_TABLE, trips_schema(), vec![batch])?;

    let mut app = App::new(Arc::new(warehouse));

    // -- Setup terminal --
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Install panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_loop(&mut terminal, &mut app);

    // -- Restore terminal --
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main event loop: render, handle input, run queries on demand.
fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| tui::draw(f, app))?;

        // Queries block the loop; show the busy marker first, then run.
        if app.busy {
            app.run_current_query();
            terminal.draw(|f| tui::draw(f, app))?;
        }

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            app.should_quit = true;
                        }
                        KeyCode::Tab => app.next_page(),
                        KeyCode::Char('r') => app.busy = true,
                        KeyCode::Char('k') => app.next_kpi(),
                        KeyCode::Char('i') => app.next_indicator(),
                        KeyCode::Char('e') => app.export_current(),
                        KeyCode::Char('s') => app.show_sql = !app.show_sql,
                        _ => {}
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
