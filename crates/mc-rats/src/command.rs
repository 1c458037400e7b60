//! `/rats` admin command: parsing, permissions, message rendering, completion.

use crate::config::MessagesSection;

pub const COMMAND_NAME: &str = "rats";
pub const COMMAND_DESCRIPTION: &str = "Spawn, kill or reload rats";

/// Administrative ceiling on `/rats spawn`.
pub const MAX_SPAWN_AMOUNT: i64 = 50;

pub const PERM_SPAWN: &str = "minecraftrats.spawn";
pub const PERM_KILL: &str = "minecraftrats.kill";
pub const PERM_RELOAD: &str = "minecraftrats.reload";

const SUBCOMMANDS: [&str; 3] = ["spawn", "kill", "reload"];
const AMOUNT_HINTS: [&str; 5] = ["1", "5", "10", "25", "50"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatsCommand {
    /// `None` when the amount did not parse.
    Spawn(Option<usize>),
    Kill,
    Reload,
    Help,
}

impl RatsCommand {
    pub fn parse(args: &[String]) -> Self {
        let Some(sub) = args.first() else {
            return RatsCommand::Help;
        };
        match sub.to_lowercase().as_str() {
            "spawn" => RatsCommand::Spawn(parse_amount(args.get(1).map(String::as_str))),
            "kill" => RatsCommand::Kill,
            "reload" => RatsCommand::Reload,
            _ => RatsCommand::Help,
        }
    }

    /// Permission node required to run this sub-command.
    pub fn permission(self) -> Option<&'static str> {
        match self {
            RatsCommand::Spawn(_) => Some(PERM_SPAWN),
            RatsCommand::Kill => Some(PERM_KILL),
            RatsCommand::Reload => Some(PERM_RELOAD),
            RatsCommand::Help => None,
        }
    }
}

/// Amount for `/rats spawn`, defaulting to 1. Capped at the administrative
/// ceiling; negative amounts spawn nothing.
fn parse_amount(arg: Option<&str>) -> Option<usize> {
    let Some(arg) = arg else {
        return Some(1);
    };
    let n: i64 = arg.trim().parse().ok()?;
    Some(n.clamp(0, MAX_SPAWN_AMOUNT) as usize)
}

/// Translate `&` colour codes into section-sign codes.
pub fn colorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&next) if c == '&' && is_format_code(next) => out.push('§'),
            _ => out.push(c),
        }
    }
    out
}

fn is_format_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r' | 'x')
}

/// Prefix, substitute `%amount%`, colorize.
pub fn render(messages: &MessagesSection, template: &str, amount: Option<usize>) -> String {
    let body = match amount {
        Some(n) => template.replace("%amount%", &n.to_string()),
        None => template.to_string(),
    };
    colorize(&format!("{}{body}", messages.prefix))
}

pub fn help() -> String {
    [
        "§e=== MinecraftRats Commands ===",
        "§6/rats spawn [amount]§f - Spawn rats at your location",
        "§6/rats kill§f - Kill all rats",
        "§6/rats reload§f - Reload the plugin configuration",
    ]
    .join("\n")
}

/// Suggestions for the argument currently being typed.
pub fn complete(args: &[String]) -> Vec<String> {
    match args {
        [partial] => {
            let partial = partial.to_lowercase();
            SUBCOMMANDS
                .iter()
                .filter(|s| s.starts_with(&partial))
                .map(|s| s.to_string())
                .collect()
        }
        [sub, _] if sub.eq_ignore_ascii_case("spawn") => {
            AMOUNT_HINTS.iter().map(|s| s.to_string()).collect()
        }
        _ => Vec::new(),
    }
}
