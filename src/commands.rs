//! Chat text to typed commands.
//!
//! Keywords are matched case-insensitively after the configured prefix;
//! arguments are split on whitespace.

use schema::Item;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    PokemonInfo(String),
    Catch { name: String, ball: Item },
    Team,
    /// `None` lists the gyms, `Some(name)` challenges one.
    Gym(Option<String>),
    Item(ItemCommand),
    /// 0-based roster index.
    Evolve(usize),
    Battle(String),
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemCommand {
    List,
    Use(Item),
}

/// Commands accepted while a battle is in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleCommand {
    Attack(String),
    /// 0-based position in the battling team.
    Switch(usize),
    UsePotion,
    Forfeit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Pokemon,
    Catch,
    Item,
    Evolve,
    Battle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandParseError {
    Unknown,
    Usage(Usage),
    InvalidPokemonNumber,
    UnknownItem,
    /// `catch` was given something that is not a capture device.
    UnknownBall(String),
    InvalidSwitchNumber,
    /// Anything in battle that is not a battle command.
    NotABattleCommand,
}

impl CommandParseError {
    /// The reply for this error, with commands shown using `prefix`.
    pub fn message(&self, prefix: &str) -> String {
        let p = prefix;
        match self {
            CommandParseError::Unknown => format!("Unknown command. Try {p}help"),
            CommandParseError::Usage(Usage::Pokemon) => {
                format!("Usage: {p}pokemon <name> (e.g., {p}pokemon pikachu)")
            }
            CommandParseError::Usage(Usage::Catch) => {
                format!("Usage: {p}catch <pokemon> [pokeball|superball] (e.g., {p}catch pikachu)")
            }
            CommandParseError::Usage(Usage::Item) => format!("Usage: {p}item use <item>"),
            CommandParseError::Usage(Usage::Evolve) => {
                format!("Usage: {p}evolve <pokemon number> (from your {p}team)")
            }
            CommandParseError::Usage(Usage::Battle) => {
                format!("Usage: {p}battle <opponent-number>\nExample: {p}battle 1234567890@s.whatsapp.net")
            }
            CommandParseError::InvalidPokemonNumber => {
                format!("Invalid Pokémon number! Use {p}team to check your Pokémon.")
            }
            CommandParseError::UnknownItem => format!("Unknown item. Use {p}item to see your inventory."),
            CommandParseError::UnknownBall(name) => {
                format!("{name} isn't a Poké Ball! Use pokeball or superball.")
            }
            CommandParseError::InvalidSwitchNumber => "Invalid Pokémon number (1-6)!".to_string(),
            CommandParseError::NotABattleCommand => battle_help(prefix),
        }
    }
}

pub fn help_text(prefix: &str) -> String {
    let p = prefix;
    format!(
        "*POKÉMON BOT COMMANDS*\n\n\
         {p}start - Begin your journey\n\
         {p}catch <pokemon> - Attempt to catch a Pokémon\n\
         {p}team - View your current team\n\
         {p}pokemon <name> - Get info about a Pokémon\n\
         {p}gym - List/challenge gyms\n\
         {p}item - Use/view your items\n\
         {p}evolve <number> - Evolve a Pokémon\n\
         {p}battle <player> - Battle another trainer\n\
         {p}help - Show this menu"
    )
}

pub fn battle_help(prefix: &str) -> String {
    let p = prefix;
    format!("In battle commands:\n{p}attack <move>\n{p}switch <1-6>\n{p}use potion\n{p}forfeit")
}

/// Splits off the prefix and lowercases the keyword. None when the text is not a command.
fn split_command<'a>(text: &'a str, prefix: &str) -> Option<(String, Vec<&'a str>)> {
    let body = text.trim().strip_prefix(prefix)?;
    let mut words = body.split_whitespace();
    let keyword = words.next()?.to_lowercase();
    Some((keyword, words.collect()))
}

/// Parses a top-level command. Returns None for messages without the prefix.
pub fn parse_command(text: &str, prefix: &str) -> Option<Result<Command, CommandParseError>> {
    let (keyword, args) = split_command(text, prefix)?;
    let first = args.first().map(|arg| arg.to_lowercase());

    let command = match keyword.as_str() {
        "start" => Ok(Command::Start),
        "pokemon" => first
            .map(Command::PokemonInfo)
            .ok_or(CommandParseError::Usage(Usage::Pokemon)),
        "catch" => parse_catch(first, args.get(1).copied()),
        "team" => Ok(Command::Team),
        "gym" => Ok(Command::Gym((!args.is_empty()).then(|| args.join(" ")))),
        "item" => parse_item(&args),
        "evolve" => match first {
            None => Err(CommandParseError::Usage(Usage::Evolve)),
            Some(number) => parse_position(&number)
                .map(Command::Evolve)
                .ok_or(CommandParseError::InvalidPokemonNumber),
        },
        "battle" => args
            .first()
            .map(|opponent| Command::Battle(opponent.to_string()))
            .ok_or(CommandParseError::Usage(Usage::Battle)),
        "help" => Ok(Command::Help),
        _ => Err(CommandParseError::Unknown),
    };
    Some(command)
}

fn parse_catch(name: Option<String>, ball: Option<&str>) -> Result<Command, CommandParseError> {
    let name = name.ok_or(CommandParseError::Usage(Usage::Catch))?;
    let ball = match ball {
        None => Item::Pokeball,
        Some(raw) => match Item::from_str(raw) {
            Ok(item) if item.is_capture_device() => item,
            _ => return Err(CommandParseError::UnknownBall(raw.to_string())),
        },
    };
    Ok(Command::Catch { name, ball })
}

fn parse_item(args: &[&str]) -> Result<Command, CommandParseError> {
    match args {
        [] => Ok(Command::Item(ItemCommand::List)),
        [action, item, ..] if action.eq_ignore_ascii_case("use") => Item::from_str(item)
            .map(|item| Command::Item(ItemCommand::Use(item)))
            .map_err(|_| CommandParseError::UnknownItem),
        _ => Err(CommandParseError::Usage(Usage::Item)),
    }
}

/// 1-based user number to a 0-based index.
fn parse_position(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok().filter(|&n| n >= 1).map(|n| n - 1)
}

/// Parses a command sent while a battle is in progress. Returns None for
/// messages without the prefix.
pub fn parse_battle_command(text: &str, prefix: &str) -> Option<Result<BattleCommand, CommandParseError>> {
    let (keyword, args) = split_command(text, prefix)?;
    let first = args.first().map(|arg| arg.to_lowercase());

    let command = match (keyword.as_str(), first.as_deref()) {
        ("attack", Some(move_name)) => Ok(BattleCommand::Attack(move_name.to_string())),
        ("switch", Some(number)) => parse_position(number)
            .filter(|&index| index < crate::player::MAX_TEAM_SIZE)
            .map(BattleCommand::Switch)
            .ok_or(CommandParseError::InvalidSwitchNumber),
        ("use", Some("potion")) => Ok(BattleCommand::UsePotion),
        ("item", Some("use")) if args.get(1).is_some_and(|item| item.eq_ignore_ascii_case("potion")) => {
            Ok(BattleCommand::UsePotion)
        }
        ("forfeit", _) | ("run", _) => Ok(BattleCommand::Forfeit),
        _ => Err(CommandParseError::NotABattleCommand),
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(text: &str) -> Result<Command, CommandParseError> {
        parse_command(text, "!").expect("prefixed text is a command")
    }

    #[rstest]
    #[case("!start", Command::Start)]
    #[case("!START", Command::Start)]
    #[case("!pokemon Pikachu", Command::PokemonInfo("pikachu".to_string()))]
    #[case("!catch eevee", Command::Catch { name: "eevee".to_string(), ball: Item::Pokeball })]
    #[case("!catch eevee superball", Command::Catch { name: "eevee".to_string(), ball: Item::Superball })]
    #[case("!team", Command::Team)]
    #[case("!gym", Command::Gym(None))]
    #[case("!gym pewter   city", Command::Gym(Some("pewter city".to_string())))]
    #[case("!item", Command::Item(ItemCommand::List))]
    #[case("!item use revive", Command::Item(ItemCommand::Use(Item::Revive)))]
    #[case("!evolve 2", Command::Evolve(1))]
    #[case("!battle 555@s.whatsapp.net", Command::Battle("555@s.whatsapp.net".to_string()))]
    #[case("  !help  ", Command::Help)]
    fn test_parse_commands(#[case] text: &str, #[case] expected: Command) {
        assert_eq!(parse(text), Ok(expected));
    }

    #[rstest]
    #[case("!dance", CommandParseError::Unknown)]
    #[case("!pokemon", CommandParseError::Usage(Usage::Pokemon))]
    #[case("!catch", CommandParseError::Usage(Usage::Catch))]
    #[case("!catch eevee potion", CommandParseError::UnknownBall("potion".to_string()))]
    #[case("!item throw potion", CommandParseError::Usage(Usage::Item))]
    #[case("!item use elixir", CommandParseError::UnknownItem)]
    #[case("!evolve", CommandParseError::Usage(Usage::Evolve))]
    #[case("!evolve 0", CommandParseError::InvalidPokemonNumber)]
    #[case("!evolve first", CommandParseError::InvalidPokemonNumber)]
    #[case("!battle", CommandParseError::Usage(Usage::Battle))]
    fn test_parse_errors(#[case] text: &str, #[case] expected: CommandParseError) {
        assert_eq!(parse(text), Err(expected));
    }

    #[test]
    fn test_messages_without_prefix_are_ignored() {
        assert_eq!(parse_command("hello there", "!"), None);
        assert_eq!(parse_command("!", "!"), None);
        assert_eq!(parse_battle_command("attack tackle", "!"), None);
        assert_eq!(parse_command("start", ""), Some(Ok(Command::Start)));
    }

    #[rstest]
    #[case("!attack Thunder-Shock", Ok(BattleCommand::Attack("thunder-shock".to_string())))]
    #[case("!switch 1", Ok(BattleCommand::Switch(0)))]
    #[case("!switch 6", Ok(BattleCommand::Switch(5)))]
    #[case("!switch 7", Err(CommandParseError::InvalidSwitchNumber))]
    #[case("!switch 0", Err(CommandParseError::InvalidSwitchNumber))]
    #[case("!use potion", Ok(BattleCommand::UsePotion))]
    #[case("!item use potion", Ok(BattleCommand::UsePotion))]
    #[case("!forfeit", Ok(BattleCommand::Forfeit))]
    #[case("!attack", Err(CommandParseError::NotABattleCommand))]
    #[case("!team", Err(CommandParseError::NotABattleCommand))]
    fn test_parse_battle_commands(#[case] text: &str, #[case] expected: Result<BattleCommand, CommandParseError>) {
        assert_eq!(parse_battle_command(text, "!"), Some(expected));
    }

    #[test]
    fn test_messages_follow_prefix() {
        assert_eq!(CommandParseError::Unknown.message("!"), "Unknown command. Try !help");
        assert_eq!(
            CommandParseError::NotABattleCommand.message("/"),
            "In battle commands:\n/attack <move>\n/switch <1-6>\n/use potion\n/forfeit"
        );
        assert!(help_text("!").starts_with("*POKÉMON BOT COMMANDS*\n\n!start - Begin your journey"));
    }
}
