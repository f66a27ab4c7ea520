use std::{
    io::BufRead,
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    time::Duration,
};

use glam::Vec3;
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::{debug, info, info_span, warn};
use walltext_core::{pose::parse_triple, Pose};
use walltext_edit_manager::Menu;

use super::{
    commands::{Command, Operator, Replier},
    config::CommandNames,
    WallTextHost,
};

const TICK_INTERVAL: Duration = Duration::from_millis(10);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
const CONSOLE_OPERATOR: &str = "console";

/// One line typed on the console host.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleLine {
    Empty,
    MapStart(String),
    MapEnd,
    RoundStart,
    /// moves the console operator, the orientation is kept when omitted
    Position(Vec3, Option<Vec3>),
    Command(Command),
    Help,
    Quit,
}

impl ConsoleLine {
    /// Commands may be typed bare or with a `!` or `/` chat prefix.
    pub fn parse(line: &str, names: &CommandNames) -> Result<Self, String> {
        let line = line.trim();
        let line = line
            .strip_prefix('!')
            .or_else(|| line.strip_prefix('/'))
            .unwrap_or(line);
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        if word.is_empty() {
            return Ok(Self::Empty);
        }
        let word = word.to_ascii_lowercase();
        let parsed = match word.as_str() {
            "map" if rest.is_empty() => return Err("Usage: map <name>".to_owned()),
            "map" => Self::MapStart(rest.to_owned()),
            "endmap" => Self::MapEnd,
            "round" => Self::RoundStart,
            "pos" => parse_position(rest)?,
            "select" => {
                let index = rest
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| "Usage: select <item number>".to_owned())?;
                Self::Command(Command::Select(index - 1))
            }
            "back" => Self::Command(Command::Back),
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            w if w.eq_ignore_ascii_case(&names.add) => Self::Command(Command::Add(rest.to_owned())),
            w if w.eq_ignore_ascii_case(&names.remove) => Self::Command(Command::Remove),
            w if w.eq_ignore_ascii_case(&names.move_menu) => Self::Command(Command::Move),
            w if w.eq_ignore_ascii_case(&names.import) => Self::Command(Command::Import),
            w if w.eq_ignore_ascii_case(&names.refresh) => Self::Command(Command::Refresh),
            w => return Err(format!("Unknown command '{w}', type help for the list.")),
        };
        Ok(parsed)
    }
}

fn parse_position(rest: &str) -> Result<ConsoleLine, String> {
    const USAGE: &str = "Usage: pos <x> <y> <z> [<pitch> <yaw> <roll>]";
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let (position, orientation) = match parts.len() {
        3 => (parts.join(" "), None),
        6 => (parts[..3].join(" "), Some(parts[3..].join(" "))),
        _ => return Err(USAGE.to_owned()),
    };
    let position = parse_triple(&position).map_err(|e| format!("{USAGE} ({e})"))?;
    let orientation = orientation
        .map(|o| parse_triple(&o))
        .transpose()
        .map_err(|e| format!("{USAGE} ({e})"))?;
    Ok(ConsoleLine::Position(position, orientation))
}

pub fn help_text(names: &CommandNames) -> String {
    [
        "map <name>            load a map".to_owned(),
        "endmap                unload the current map".to_owned(),
        "round                 start a new round".to_owned(),
        "pos <x> <y> <z> [p y r]  move yourself".to_owned(),
        format!("{} <group>        add a placement where you stand", names.add),
        format!("{}                remove the closest placement", names.remove),
        format!("{}                open the edit menu", names.move_menu),
        format!("{}                import the json files into the database", names.import),
        format!("{}                reload the configuration", names.refresh),
        "select <n> / back     navigate the edit menu".to_owned(),
        "quit".to_owned(),
    ]
    .join("\n")
}

/// Title, then the numbered items. The highlighted one is marked with `>`.
pub fn menu_text(menu: &Menu) -> String {
    let mut text = menu.title.clone();
    for (i, item) in menu.items.iter().enumerate() {
        let marker = if i == menu.selected { '>' } else { ' ' };
        text.push_str(&format!("\n{marker} {}. {item}", i + 1));
    }
    text
}

struct StdoutReplier;

impl Replier for StdoutReplier {
    fn reply(&self, message: &str) {
        println!("{message}");
    }
}

/// Feeds `input` lines to `host` while ticking it. Returns once the input is exhausted or quit
/// was typed, after the pending background work is done.
pub fn run_console<R>(host: &mut WallTextHost, input: R) -> Result<()>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    std::thread::Builder::new()
        .name("console input".to_owned())
        .spawn(move || {
            for line in input.lines() {
                if sender.send(line).is_err() {
                    break;
                }
            }
        })
        .into_diagnostic()
        .wrap_err("failed to spawn console input thread")?;

    let permission = host.walltext().config().command_permission.clone();
    let mut operator = Operator::new(CONSOLE_OPERATOR, Pose::default(), Arc::new(StdoutReplier))
        .with_permission(&permission);
    info!("console ready, type help for the list of commands");
    loop {
        match receiver.recv_timeout(TICK_INTERVAL) {
            Ok(line) => {
                let line = line.into_diagnostic().wrap_err("failed to read console input")?;
                if !handle_line(host, &mut operator, &line) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        host.tick();
    }
    if !host.run_until_idle(DRAIN_TIMEOUT) {
        warn!("background work still running on exit");
    }
    Ok(())
}

/// Returns false when the console should stop.
fn handle_line(host: &mut WallTextHost, operator: &mut Operator, line: &str) -> bool {
    let names = host.walltext().config().commands.clone();
    let parsed = match ConsoleLine::parse(line, &names) {
        Ok(parsed) => parsed,
        Err(message) => {
            operator.reply(&message);
            return true;
        }
    };
    let _span = info_span!("console line", ?parsed).entered();
    let walltext = host.walltext();
    match parsed {
        ConsoleLine::Empty => {}
        ConsoleLine::MapStart(map_name) => walltext.on_map_start(&map_name),
        ConsoleLine::MapEnd => walltext.on_map_end(),
        ConsoleLine::RoundStart => walltext.on_round_start(),
        ConsoleLine::Position(position, orientation) => {
            operator.pose.position = position;
            if let Some(orientation) = orientation {
                operator.pose.orientation = orientation;
            }
            debug!(location = %operator.pose.location_text(), "operator moved");
        }
        ConsoleLine::Command(command) => walltext.execute(operator, command),
        ConsoleLine::Help => operator.reply(&help_text(&names)),
        ConsoleLine::Quit => return false,
    }
    true
}
