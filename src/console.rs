use virtual_location::{Coordinate, LocationRecord, RecordError};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Set(LocationRecord),
    Off,
    Current,
    History,
    Forget(String),
    Clear,
    Favorites,
    Favorite(String),
    Unfavorite(String),
    Toggle(String),
    Presets,
    Permission,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Record(#[from] RecordError),
}

pub const HELP: &str = "\
set <lat> <lon> <name> [| address]   report a virtual location
off                                   go back to the real location
current                               show the reported location
history                               list past locations, newest first
forget <name>                         remove a location from history
clear                                 clear history
favorites                             list favorites
fav <name> / unfav <name>             add or remove a favorite by name
toggle <name>                         flip the favorite star
presets                               list landmark presets
permission                            request location access
quit";

/// Parses one console line. Names given to `fav`, `toggle` and friends are looked up by the caller.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, ParseError> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let named = |usage: &'static str| -> Result<String, ParseError> {
        if rest.is_empty() {
            Err(ParseError::Usage(usage))
        } else {
            Ok(rest.to_string())
        }
    };

    match verb {
        "set" => parse_set(rest),
        "off" => Ok(ConsoleCommand::Off),
        "current" => Ok(ConsoleCommand::Current),
        "history" => Ok(ConsoleCommand::History),
        "forget" => named("forget <name>").map(ConsoleCommand::Forget),
        "clear" => Ok(ConsoleCommand::Clear),
        "favorites" => Ok(ConsoleCommand::Favorites),
        "fav" => named("fav <name>").map(ConsoleCommand::Favorite),
        "unfav" => named("unfav <name>").map(ConsoleCommand::Unfavorite),
        "toggle" => named("toggle <name>").map(ConsoleCommand::Toggle),
        "presets" => Ok(ConsoleCommand::Presets),
        "permission" => Ok(ConsoleCommand::Permission),
        "help" | "" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

fn parse_set(args: &str) -> Result<ConsoleCommand, ParseError> {
    const USAGE: &str = "set <lat> <lon> <name> [| address]";
    let (latitude, rest) = next_token(args);
    let (longitude, label) = next_token(rest);
    let (Ok(latitude), Ok(longitude)) = (latitude.parse::<f64>(), longitude.parse::<f64>()) else {
        return Err(ParseError::Usage(USAGE));
    };

    let label = label.trim();
    let (name, address) = label.split_once('|').unwrap_or((label, ""));
    let record = LocationRecord::new(
        Coordinate::new(latitude, longitude),
        name.trim(),
        address.trim(),
    )?;
    Ok(ConsoleCommand::Set(record))
}

/// Splits off the first whitespace-delimited token, however much whitespace surrounds it.
fn next_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    input.split_once(char::is_whitespace).unwrap_or((input, ""))
}
