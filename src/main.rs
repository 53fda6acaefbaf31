use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sockwatch::{
    events, source, ui, AlarmActuator, App, ConnectionSupervisor, SampleKind, Settings,
    TransportKind,
};

#[derive(Parser, Debug)]
#[command(name = "sockwatch")]
#[command(about = "Terminal monitor for the Smart Sock sleepwalking alarm")]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IP address or host of the sock's HTTP firmware
    #[arg(short, long, conflicts_with_all = ["ble", "demo"])]
    address: Option<String>,

    /// Reach the sock over Bluetooth LE
    #[arg(long, conflicts_with = "demo")]
    ble: bool,

    /// Use the built-in simulated sock
    #[arg(long)]
    demo: bool,

    /// Pressure in hPa above which the alarm sounds
    #[arg(short, long, conflicts_with = "labels")]
    threshold: Option<f64>,

    /// Alert on these gait labels instead of pressure (comma-separated)
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,

    /// Time between readings (e.g., "3s", "500ms")
    #[arg(short, long)]
    period: Option<String>,

    /// Where to write the log
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Send WiFi credentials to the sock and exit
    #[arg(long, requires_all = ["ssid", "password"], conflicts_with_all = ["ble", "demo"])]
    provision: bool,

    /// Network name for --provision
    #[arg(long)]
    ssid: Option<String>,

    /// Network password for --provision
    #[arg(long)]
    password: Option<String>,

    /// List nearby socks over Bluetooth LE and exit
    #[cfg(feature = "ble")]
    #[arg(long, conflicts_with_all = ["provision", "demo"])]
    scan: bool,
}

impl Args {
    /// Fold the command-line overrides into `settings`.
    fn apply(&self, settings: &mut Settings) {
        if let Some(address) = &self.address {
            settings.transport = TransportKind::Http;
            settings.http.address = address.clone();
        }
        if self.ble {
            settings.transport = TransportKind::Ble;
        }
        if self.demo {
            settings.transport = TransportKind::Demo;
        }
        if let Some(threshold) = self.threshold {
            settings.mode = SampleKind::Numeric;
            settings.threshold = threshold;
        }
        if !self.labels.is_empty() {
            settings.mode = SampleKind::Label;
            settings.alert_labels = self.labels.clone();
        }
        if let Some(period) = &self.period {
            settings.poll_period = period.clone();
        }
        if let Some(log_file) = &self.log_file {
            settings.log_file = log_file.clone();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;

    init_logging(&settings.log_file)?;

    let rt = Runtime::new()?;

    if args.provision {
        return provision(&rt, &settings, &args);
    }

    #[cfg(feature = "ble")]
    if args.scan {
        return scan(&rt, &settings);
    }

    run_tui(&rt, &settings)
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env("SOCKWATCH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Send WiFi credentials to a sock in setup mode
#[cfg(feature = "http")]
fn provision(rt: &Runtime, settings: &Settings, args: &Args) -> Result<()> {
    use sockwatch_adapters::{esp32::Esp32Adapter, WifiCredentials};

    let credentials = WifiCredentials::new(
        args.ssid.clone().unwrap_or_default(),
        args.password.clone().unwrap_or_default(),
    );
    let adapter = Esp32Adapter::builder()
        .address(settings.http.address.clone())
        .configure_timeout(settings.http_configure_timeout()?)
        .build()?;

    println!("Sending WiFi settings to {}...", adapter.endpoint());
    rt.block_on(adapter.configure(&credentials))?;
    println!("Configuration sent. The sock will join {:?} and restart.", credentials.ssid);
    Ok(())
}

#[cfg(not(feature = "http"))]
fn provision(_rt: &Runtime, _settings: &Settings, _args: &Args) -> Result<()> {
    anyhow::bail!("--provision needs the http feature")
}

/// List socks advertising over Bluetooth LE
#[cfg(feature = "ble")]
fn scan(rt: &Runtime, settings: &Settings) -> Result<()> {
    use sockwatch_adapters::ble::BleAdapter;

    let devices = rt.block_on(async {
        let adapter = BleAdapter::builder()
            .name_marker(settings.ble.name_marker.clone())
            .scan_time(settings.ble_scan_time()?)
            .build()
            .await?;
        println!(
            "Scanning for {:?} devices ({})...",
            settings.ble.name_marker, settings.ble.scan_time
        );
        Ok::<_, anyhow::Error>(adapter.discover().await?)
    })?;

    if devices.is_empty() {
        println!("No socks found");
    }
    for device in devices {
        println!("{}  {}", device.address, device.name);
    }
    Ok(())
}

/// Run the TUI against the transport `settings` select
fn run_tui(rt: &Runtime, settings: &Settings) -> Result<()> {
    let transport = rt.block_on(source::from_settings(settings))?;
    let session_config = settings.session_config()?;
    info!(transport = %transport.description(), "starting");

    let (supervisor, connection_events) = ConnectionSupervisor::new(transport);
    let (alarm, prompts) = AlarmActuator::from_kinds(settings.sound, settings.notifier);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let mut app = App::new(
        rt.handle().clone(),
        supervisor,
        connection_events,
        Arc::new(alarm),
        prompts,
        session_config,
    );

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("exiting");
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 14;

    while app.running {
        app.process_events();

        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(
                    0,
                    (area.height / 2).saturating_sub(2),
                    area.width,
                    5.min(area.height),
                );
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Min(10),   // Reading panel
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::reading::render(frame, app, chunks[1]);
            ui::common::render_status_bar(frame, app, chunks[2]);

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
            if app.threshold_input.is_some() {
                ui::dialog::render_threshold_input(frame, app, area);
            }
            if app.error.is_some() {
                ui::dialog::render_error(frame, app, area);
            }
            // The alert sits above everything else
            if app.alert.is_some() {
                ui::dialog::render_alert(frame, app, area);
            }
        })?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            if let Event::Key(key) = event {
                events::handle_key_event(app, key);
            }
        }
    }

    Ok(())
}
