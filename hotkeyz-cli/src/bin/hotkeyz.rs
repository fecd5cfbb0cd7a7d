//! Standalone CLI for hotkeyz: type keys, listen for global hotkeys, drive
//! the mouse and query windows.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use hotkeyz_core::input::{ButtonAction, MouseButton};
use hotkeyz_core::status::StatusCode;
use hotkeyz_core::window::WindowHandle;
use hotkeyz_core::{Engine, EngineConfig, HotkeyzError};
use log::{debug, info};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "hotkeyz", about = "Keyboard/mouse automation and global hotkeys")]
struct Args {
    /// Trigger queue depth (overrides HOTKEYZ_TRIGGER_QUEUE_CAPACITY)
    #[arg(long, global = true)]
    queue_capacity: Option<usize>,

    /// Log verbosely (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Type a key sequence, e.g. "Hello<enter>" or "<ctrl+a>"
    Type {
        keys: String,
    },
    /// Wait until every key in a key sequence is released
    WaitUp {
        keys: String,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Register hotkeys and print one JSON line per trigger
    Listen {
        /// Chords such as "<ctrl+shift+f1>"
        #[arg(required = true)]
        chords: Vec<String>,
        /// Exit after this many triggers
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Exit if no trigger arrives within this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Mouse actions
    Mouse {
        #[command(subcommand)]
        action: MouseCommand,
    },
    /// Window queries (JSON output)
    Window {
        #[command(subcommand)]
        query: WindowCommand,
    },
}

#[derive(Subcommand)]
enum MouseCommand {
    /// Move cursor to screen coordinates
    Move { x: i32, y: i32 },
    /// Move cursor relative to its current position
    Delta {
        #[arg(allow_negative_numbers = true)]
        dx: i32,
        #[arg(allow_negative_numbers = true)]
        dy: i32,
    },
    /// Click a button
    Click {
        #[arg(short, long, value_enum, default_value = "left")]
        button: ButtonArg,
    },
    /// Press a button without releasing it
    Down {
        #[arg(short, long, value_enum, default_value = "left")]
        button: ButtonArg,
    },
    /// Release a button
    Up {
        #[arg(short, long, value_enum, default_value = "left")]
        button: ButtonArg,
    },
    /// Scroll by DELTA (120 per notch)
    Wheel {
        #[arg(allow_negative_numbers = true)]
        delta: i32,
        /// Scroll horizontally
        #[arg(long)]
        horizontal: bool,
    },
}

#[derive(Subcommand)]
enum WindowCommand {
    /// First top-level window with exactly this class and/or title
    Find {
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Screen rectangle of a window handle
    Rect {
        /// Window handle (hex, e.g. 0x1A2B, or decimal)
        #[arg(value_parser = parse_hex_or_dec)]
        handle: isize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ButtonArg {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl From<ButtonArg> for MouseButton {
    fn from(arg: ButtonArg) -> Self {
        match arg {
            ButtonArg::Left => MouseButton::Left,
            ButtonArg::Right => MouseButton::Right,
            ButtonArg::Middle => MouseButton::Middle,
            ButtonArg::X1 => MouseButton::X1,
            ButtonArg::X2 => MouseButton::X2,
        }
    }
}

#[derive(Serialize)]
struct TriggerLine<'a> {
    id: u32,
    chord: &'a str,
}

#[derive(Serialize)]
struct FoundWindow {
    handle: Option<WindowHandle>,
}

fn parse_hex_or_dec(s: &str) -> Result<isize, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        isize::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<isize>().map_err(|e| e.to_string())
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("JSON serialization failed: {e}"),
    }
}

fn listen<P: hotkeyz_core::backend::Platform>(
    engine: &Engine<P>,
    chords: &[String],
    count: Option<usize>,
    timeout: Option<Duration>,
) -> Result<(), HotkeyzError> {
    let mut ids = Vec::with_capacity(chords.len());
    for chord in chords {
        let id = engine.register_hotkey(chord)?;
        info!("listening for {chord} as hotkey {id}");
        ids.push((id, chord.as_str()));
    }

    let mut seen = 0;
    while count.map_or(true, |n| seen < n) {
        let id = match timeout {
            Some(timeout) => match engine.wait_hotkey_timeout(timeout) {
                Some(id) => id,
                None => {
                    debug!("no trigger within {timeout:?}");
                    break;
                }
            },
            None => engine.wait_hotkey(),
        };
        let chord = ids
            .iter()
            .find(|(known, _)| *known == id)
            .map_or("", |(_, chord)| *chord);
        print_json(&TriggerLine {
            id: id.get(),
            chord,
        });
        seen += 1;
    }

    for (id, _) in ids {
        engine.unregister_hotkey(id);
    }
    Ok(())
}

fn run(args: Args) -> Result<(), HotkeyzError> {
    let mut config = EngineConfig::from_env();
    if let Some(capacity) = args.queue_capacity {
        config.trigger_queue_capacity = capacity.max(1);
    }
    let engine = Engine::system(&config);
    let input = engine.input();

    match args.command {
        Command::Type { keys } => engine.type_text(&keys)?,
        Command::WaitUp { keys, timeout_ms } => match timeout_ms {
            Some(ms) => {
                let released = engine.wait_keys_up_timeout(&keys, Duration::from_millis(ms))?;
                println!("{}", if released { "released" } else { "still held" });
            }
            None => engine.wait_keys_up(&keys)?,
        },
        Command::Listen {
            chords,
            count,
            timeout_ms,
        } => listen(&engine, &chords, count, timeout_ms.map(Duration::from_millis))?,
        Command::Mouse { action } => match action {
            MouseCommand::Move { x, y } => input.move_to(x, y)?,
            MouseCommand::Delta { dx, dy } => input.move_delta(dx, dy)?,
            MouseCommand::Click { button } => input.button_press(button.into(), ButtonAction::Click)?,
            MouseCommand::Down { button } => input.button_press(button.into(), ButtonAction::Down)?,
            MouseCommand::Up { button } => input.button_press(button.into(), ButtonAction::Up)?,
            MouseCommand::Wheel { delta, horizontal } => {
                if horizontal {
                    input.hwheel(delta)?
                } else {
                    input.wheel(delta)?
                }
            }
        },
        Command::Window { query } => match query {
            WindowCommand::Find { class, title } => {
                let handle = engine.windows().find(class.as_deref(), title.as_deref());
                print_json(&FoundWindow { handle });
            }
            WindowCommand::Rect { handle } => {
                let rect = engine.windows().get_rect(WindowHandle::from_raw(handle))?;
                print_json(&rect);
            }
        },
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let code = e.status_code().unsigned_abs();
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
