use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use fasthotkey::catalog::{search, ApplicationCatalog, CatalogStore};
use fasthotkey::client::{FocusTracker, KdotoolClient, WindowInspector, WindowRect};
use fasthotkey::config::{self, Config};
use fasthotkey::device::{self, UinputSink};
use fasthotkey::dispatcher::Dispatcher;
use fasthotkey::entry::ShortcutEntry;
use fasthotkey::executor::{Outcome, SequenceExecutor};
use fasthotkey::listener;
use indoc::indoc;
use log::{debug, info, warn};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const AFTER_HELP: &str = indoc! {"
    Shortcut sources live in <hotkeys_dir>/<app>.json and <hotkeys_dir>/<app>/*.json,
    where <app> is the lowercased window class of the application (see `fasthotkey context`).

    Example source:
      [
        { \"name\": \"Copy\", \"hotkey\": \"ctrl+c\" },
        { \"name\": \"Zoom in twice\", \"hotkeys\": [{ \"hotkey\": \"ctrl++\" }, { \"sleep\": 100 }, { \"hotkey\": \"ctrl++\" }] }
      ]
"};

#[derive(Parser, Debug)]
#[command(version, about, after_help = AFTER_HELP)]
struct Cli {
    /// Config file (.toml, otherwise YAML). Created with defaults when missing.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Grab keyboards and open the palette on the toggle hotkey (default).
    Listen,
    /// Print the shortcuts of <APP> matching every word of the query.
    Search { app: String, query: Vec<String> },
    /// Replay the shortcut named <NAME> from <APP>'s catalog.
    Run { app: String, name: String },
    /// Print the application id and geometry of the active window.
    Context,
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::default_path);

    match cli.command.unwrap_or(Commands::Listen) {
        Commands::Listen => listen(&config::load_config(&config_path)?),
        Commands::Search { app, query } => {
            let config = config::load_config(&config_path)?;
            let catalog = CatalogStore::from_dir(&config.hotkeys_dir).load(&app);
            let mut stdout = io::stdout().lock();
            for entry in search(&catalog, &query.join(" ")) {
                writeln!(stdout, "{}\t{}", entry.name, entry.describe())?;
            }
            Ok(())
        }
        Commands::Run { app, name } => {
            let config = config::load_config(&config_path)?;
            let catalog = CatalogStore::from_dir(&config.hotkeys_dir).load(&app);
            let entry = catalog
                .find(&name)
                .with_context(|| format!("{app:?} has no shortcut named {name:?}"))?;
            run_once(&config, entry)
        }
        Commands::Context => {
            let mut client = KdotoolClient::default();
            match client.current_application_id() {
                Some(app_id) => println!("application: {app_id}"),
                None => println!("application: unknown"),
            }
            if let Some(WindowRect { x, y, width, height }) = client.current_window_rect() {
                println!("window: {width}x{height} at {x},{y}");
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "fasthotkey", &mut io::stdout());
            Ok(())
        }
    }
}

fn run_once(config: &Config, entry: &ShortcutEntry) -> anyhow::Result<()> {
    let output = device::output_device().context("failed to create uinput device (is /dev/uinput writable?)")?;
    // The compositor needs a moment to pick up a fresh device.
    thread::sleep(Duration::from_millis(300));
    let mut executor = SequenceExecutor::new(UinputSink::new(output), KdotoolClient::default(), config.keypress_delay);
    match executor.execute(entry) {
        Outcome::Completed | Outcome::Aborted => Ok(()),
        Outcome::Invalid => bail!("{:?} is not a valid shortcut", entry.name),
        Outcome::Failed => bail!("failed to send {:?}", entry.name),
    }
}

fn listen(config: &Config) -> anyhow::Result<()> {
    let Some(picker) = config.picker.as_deref() else {
        bail!("listen needs a picker command in the config");
    };
    let output = device::output_device().context("failed to create uinput device (is /dev/uinput writable?)")?;
    let dispatcher = Arc::new(Dispatcher::new());

    let (toggle_tx, toggle_rx) = mpsc::channel();
    dispatcher.bind(
        &config.toggle_hotkey,
        Arc::new(move || {
            let _ = toggle_tx.send(());
        }),
    )?;

    let listener = listener::spawn(
        device::keyboards(&config.device_names),
        Arc::clone(&dispatcher),
        Arc::clone(&output),
        config.grab,
    )?;

    let store = CatalogStore::from_dir(&config.hotkeys_dir);
    let mut inspector = KdotoolClient::default();
    let mut executor = SequenceExecutor::new(UinputSink::new(output), KdotoolClient::default(), config.keypress_delay)
        .with_dispatcher(Arc::clone(&dispatcher));
    info!("Press {} to open the palette", config.toggle_hotkey);

    loop {
        match toggle_rx.recv_timeout(Duration::from_secs(1)) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) if listener.is_running() => continue,
            Err(RecvTimeoutError::Timeout) => bail!("keyboard listener stopped"),
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }

        // Without an application the palette still offers the quit line.
        let app_id = inspector.current_application_id().unwrap_or_default();
        let window = inspector.foreground();
        let rect = inspector.current_window_rect();
        let catalog = store.load(&app_id);

        match choose(picker, &catalog, rect) {
            Ok(Some(Choice::Entry(entry))) => {
                if let Some(window) = &window {
                    if let Err(e) = inspector.activate(window) {
                        warn!("Could not refocus {app_id:?}: {e}");
                    }
                }
                executor.execute(entry);
            }
            Ok(Some(Choice::Quit)) => {
                info!("Quit requested from the palette");
                return Ok(());
            }
            Ok(None) => debug!("Palette dismissed"),
            Err(e) => warn!("Picker failed: {e:#}"),
        }
        // Toggles pressed while the picker had focus are stale.
        while toggle_rx.try_recv().is_ok() {}
    }
}

const QUIT_NAME: &str = "exit";
const QUIT_DESCRIPTION: &str = "quit fasthotkey";

#[derive(Debug, PartialEq)]
enum Choice<'a> {
    Entry(&'a ShortcutEntry),
    Quit,
}

/// Shows the catalog, followed by the quit line, in the picker.
fn choose<'a>(
    picker: &[String],
    catalog: &'a ApplicationCatalog,
    rect: Option<WindowRect>,
) -> anyhow::Result<Option<Choice<'a>>> {
    let (program, args) = picker.split_first().context("empty picker command")?;
    let mut command = Command::new(program);
    command
        .args(args)
        .env("FASTHOTKEY_APP", catalog.app_id())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped());
    if let Some(WindowRect { x, y, width, height }) = rect {
        command.env("FASTHOTKEY_WINDOW", format!("{x},{y},{width},{height}"));
    }
    let mut child = command.spawn().with_context(|| format!("failed to start {program}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        let lines = catalog
            .entries()
            .iter()
            .map(|entry| (entry.name.clone(), entry.describe()))
            .chain(std::iter::once((QUIT_NAME.to_string(), QUIT_DESCRIPTION.to_string())));
        for (name, description) in lines {
            if let Err(e) = writeln!(stdin, "{name}\t{description}") {
                debug!("Picker closed its input early: {e}");
                break;
            }
        }
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Ok(None);
    }
    Ok(resolve_choice(catalog, &String::from_utf8_lossy(&output.stdout)))
}

/// The first field of the picker's first line is an entry name or the quit
/// line; anything else is treated as a query and resolves to its best match.
fn resolve_choice<'a>(catalog: &'a ApplicationCatalog, picked: &str) -> Option<Choice<'a>> {
    let chosen = picked
        .lines()
        .next()
        .and_then(|line| line.split('\t').next())
        .map(str::trim)
        .filter(|line| !line.is_empty())?;
    if let Some(entry) = catalog.find(chosen) {
        return Some(Choice::Entry(entry));
    }
    if chosen.eq_ignore_ascii_case(QUIT_NAME) {
        return Some(Choice::Quit);
    }
    search(catalog, chosen).into_iter().next().map(Choice::Entry)
}
