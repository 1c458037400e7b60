//! Operator console: host built-ins first, everything else goes to plugins.

use mc_rats_plugin_api::{BlockPos, EntityId, EntityKind, Location};

use crate::host::Host;
use crate::world::CONSOLE;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleOutcome {
    Reply(String),
    Stop,
}

const USAGE: &str = "Built-ins: stop, list, tick [n], summon <kind> <world> <x> <y> <z>, \
break <player> <x> <y> <z>, kill <id>, as <player> <command...>, complete <command...>";

/// Handle one console line.
pub fn handle_console_command(host: &mut Host, line: &str) -> ConsoleOutcome {
    let words: Vec<&str> = line.split_whitespace().collect();
    let reply = match words.as_slice() {
        [] => String::new(),
        ["stop"] => return ConsoleOutcome::Stop,
        ["help"] => USAGE.to_string(),
        ["list"] => list(host),
        ["tick"] => advance(host, 1),
        ["tick", n] => match n.parse::<u32>() {
            Ok(n) => advance(host, n),
            Err(_) => format!("Not a tick count: {n}"),
        },
        ["summon", kind, world, x, y, z] => summon(host, kind, world, [x, y, z]),
        ["break", player, x, y, z] => match parse_block(x, y, z) {
            Some(pos) if host.break_block(player, pos) => format!("{player} broke {x} {y} {z}"),
            Some(_) => "Nothing broken".to_string(),
            None => "Bad coordinates".to_string(),
        },
        ["kill", id] => match id.parse::<u64>() {
            Ok(id) => {
                let drops = host.kill(EntityId(id), None);
                format!("Killed {id}, {} drops", drops.len())
            }
            Err(_) => format!("Not an entity id: {id}"),
        },
        ["as", player, ..] if words.len() > 2 => {
            let command = line_after(line, 2);
            host.run_command(player, command)
                .unwrap_or_else(|| format!("Unknown command: {command}"))
        }
        ["complete", ..] => {
            let partial = line_after(line, 1);
            host.complete(partial).join(" ")
        }
        _ => host
            .run_command(CONSOLE, line)
            .unwrap_or_else(|| format!("Unknown command: {}. Type help.", words[0])),
    };
    ConsoleOutcome::Reply(reply)
}

fn list(host: &Host) -> String {
    let entities = host.world.entities();
    let mut lines = vec![format!(
        "Tick {}, {} entities",
        host.world.current_tick(),
        entities.len()
    )];
    for e in entities {
        let name = host
            .world
            .custom_name(e.id)
            .map(|n| format!(" \"{n}\""))
            .unwrap_or_default();
        lines.push(format!(
            "  {} {}{name} at {} ({:.1}, {:.1}, {:.1})",
            e.id, e.kind, e.location.world, e.location.x, e.location.y, e.location.z
        ));
    }
    lines.join("\n")
}

fn advance(host: &mut Host, ticks: u32) -> String {
    for _ in 0..ticks {
        host.tick();
    }
    format!("Now at tick {}", host.world.current_tick())
}

fn summon(host: &mut Host, kind: &str, world: &str, coords: [&&str; 3]) -> String {
    let kind: EntityKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return e.to_string(),
    };
    let [Ok(x), Ok(y), Ok(z)] = coords.map(|c| c.parse::<f64>()) else {
        return "Bad coordinates".to_string();
    };
    match host.spawn(kind, Location::new(world, x, y, z)) {
        Some(id) => format!("Summoned {kind} {id}"),
        None => format!("Could not summon {kind} in {world}"),
    }
}

fn parse_block(x: &str, y: &str, z: &str) -> Option<BlockPos> {
    Some(BlockPos::new(x.parse().ok()?, y.parse().ok()?, z.parse().ok()?))
}

/// The rest of `line` after skipping `n` words.
fn line_after(line: &str, n: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..n {
        rest = rest
            .find(char::is_whitespace)
            .map(|i| rest[i..].trim_start())
            .unwrap_or("");
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin_manager::PluginManager;
    use crate::world::{HostWorld, Terrain};
    use mc_rats_plugin_api::{Biome, Material};

    fn host() -> (Host, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut world = HostWorld::new(1);
        world.add_terrain(
            "world",
            Terrain::flat(63, Material::GrassBlock, Biome::Plains, 15),
        );
        world.spawn_player("Alice", Location::new("world", 0.5, 64.0, 0.5));
        let mut host = Host::new(world, PluginManager::new(dir.path()));
        host.start();
        (host, dir)
    }

    fn reply(outcome: ConsoleOutcome) -> String {
        match outcome {
            ConsoleOutcome::Reply(text) => text,
            ConsoleOutcome::Stop => panic!("unexpected stop"),
        }
    }

    #[test]
    fn stop_is_recognised() {
        let (mut host, _dir) = host();
        assert_eq!(handle_console_command(&mut host, "stop"), ConsoleOutcome::Stop);
    }

    #[test]
    fn summon_list_and_kill() {
        let (mut host, _dir) = host();
        let text = reply(handle_console_command(&mut host, "summon cow world 3 64 3"));
        assert!(text.starts_with("Summoned cow"), "{text}");
        assert_eq!(host.world.entity_count(), 2);

        let listing = reply(handle_console_command(&mut host, "list"));
        assert!(listing.contains("2 entities"), "{listing}");

        let cow = host
            .world
            .entities()
            .into_iter()
            .find(|e| e.kind == EntityKind::Cow)
            .unwrap();
        let text = reply(handle_console_command(&mut host, &format!("kill {}", cow.id.0)));
        assert!(text.contains("1 drops"), "{text}");
    }

    #[test]
    fn bad_input_is_reported() {
        let (mut host, _dir) = host();
        assert_eq!(
            reply(handle_console_command(&mut host, "summon dragon world 0 64 0")),
            "unknown entity type: dragon"
        );
        assert_eq!(
            reply(handle_console_command(&mut host, "summon cow world a 64 0")),
            "Bad coordinates"
        );
        assert!(reply(handle_console_command(&mut host, "frobnicate")).starts_with("Unknown command"));
        assert!(reply(handle_console_command(&mut host, "as Alice nothing here")).starts_with("Unknown command"));
    }

    #[test]
    fn tick_and_break() {
        let (mut host, _dir) = host();
        assert_eq!(reply(handle_console_command(&mut host, "tick 5")), "Now at tick 5");
        assert_eq!(
            reply(handle_console_command(&mut host, "break Alice 0 63 0")),
            "Alice broke 0 63 0"
        );
        assert_eq!(
            reply(handle_console_command(&mut host, "break Alice 0 63 0")),
            "Nothing broken"
        );
    }

    #[test]
    fn line_after_skips_words() {
        assert_eq!(line_after("as Alice rats spawn 5", 2), "rats spawn 5");
        assert_eq!(line_after("complete rats ", 1), "rats ");
        assert_eq!(line_after("complete", 1), "");
    }
}
