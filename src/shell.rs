use clap::{Parser, Subcommand};

use crate::chord::membership::JoinOutcome;
use crate::chord::service::ChordService;
use crate::chord::types::NodeId;
use crate::error::ChordError;

#[derive(Parser, Debug, PartialEq, Eq)]
#[command(
    name = "command",
    no_binary_name = true,
    disable_version_flag = true,
    help_template = "{subcommands}"
)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Join the ring ADDRESS belongs to, or start a new ring if it is not connected
    Join { address: NodeId },
    /// Leave the ring
    Leave,
    /// Find the node responsible for ID (a number or a dotted quad)
    Lookup {
        #[arg(value_parser = parse_identifier)]
        id: NodeId,
    },
    /// Show whether the node at ADDRESS is connected
    Status { address: NodeId },
    /// Show this node's neighbours and finger table
    Print,
    /// Re-announce this node to its neighbours and fingers
    Repair,
    /// Stop this node
    Quit,
}

/// Accepts `3232235777` as well as `192.168.1.1`
pub fn parse_identifier(raw: &str) -> Result<NodeId, ChordError> {
    let raw = raw.trim();
    if raw.contains('.') {
        raw.parse()
    } else {
        raw.parse::<u32>()
            .map(NodeId)
            .map_err(|_| ChordError::InvalidAddress(raw.to_string()))
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    ShellLine::try_parse_from(words).map(|parsed| Some(parsed.command))
}

/// Run a command against the local node and describe the result.
/// `Quit` is left to the caller, which owns the server.
pub async fn execute(service: &ChordService, command: &ShellCommand) -> Result<String, ChordError> {
    match command {
        ShellCommand::Join { address } => match service.join(*address).await? {
            JoinOutcome::Bootstrapped {
                successor,
                predecessor,
            } => Ok(format!(
                "joined the ring: predecessor {} ({}), successor {} ({})",
                predecessor,
                predecessor.address(),
                successor,
                successor.address()
            )),
            JoinOutcome::NewRing => Ok(format!(
                "{} is not in a ring, started a new one",
                address.address()
            )),
        },
        ShellCommand::Leave => {
            service.leave().await?;
            Ok("left the ring".to_string())
        }
        ShellCommand::Lookup { id } => {
            let owner = service.find_successor(*id).await?;
            Ok(format!("{} -> {} ({})", id, owner, owner.address()))
        }
        ShellCommand::Status { address } => {
            let status = service.peer(*address).probe().await;
            Ok(format!("{}: {}", address.address(), status))
        }
        ShellCommand::Print => Ok(service.snapshot().await?.to_string()),
        ShellCommand::Repair => {
            service.repair().await?;
            Ok("repaired ring links".to_string())
        }
        ShellCommand::Quit => Ok("bye".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::types::NodeStatus;
    use crate::test_support::MemoryDirectory;
    use clap::error::ErrorKind;

    #[test]
    fn parses_every_command() {
        assert_eq!(
            parse("join 10.0.0.1").unwrap(),
            Some(ShellCommand::Join {
                address: NodeId::from_address("10.0.0.1").unwrap()
            })
        );
        assert_eq!(parse("  leave ").unwrap(), Some(ShellCommand::Leave));
        assert_eq!(
            parse("lookup 150").unwrap(),
            Some(ShellCommand::Lookup { id: NodeId(150) })
        );
        assert_eq!(
            parse("lookup 0.0.0.150").unwrap(),
            Some(ShellCommand::Lookup { id: NodeId(150) })
        );
        assert_eq!(
            parse("status 127.0.0.1").unwrap(),
            Some(ShellCommand::Status {
                address: NodeId(2130706433)
            })
        );
        assert_eq!(parse("print").unwrap(), Some(ShellCommand::Print));
        assert_eq!(parse("repair").unwrap(), Some(ShellCommand::Repair));
        assert_eq!(parse("quit").unwrap(), Some(ShellCommand::Quit));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse("join").is_err());
        assert!(parse("join 300.1.1.1").is_err());
        assert!(parse("lookup twelve").is_err());
        assert!(parse("lookup 4294967296").is_err());
        assert!(parse("dance").is_err());
        assert_eq!(parse("help").unwrap_err().kind(), ErrorKind::DisplayHelp);
    }

    #[tokio::test]
    async fn join_while_connected_is_reported_and_changes_nothing() {
        let directory = MemoryDirectory::new();
        let node = directory.spawn_node(100);

        let reply = execute(&node, &ShellCommand::Join { address: NodeId(100) })
            .await
            .unwrap();
        assert!(reply.contains("started a new one"));
        let before = node.snapshot().await.unwrap();

        let rejected = execute(&node, &ShellCommand::Join { address: NodeId(100) }).await;
        assert!(matches!(rejected, Err(ChordError::AlreadyConnected)));
        assert_eq!(node.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn lookup_status_and_print_describe_the_ring() {
        let directory = MemoryDirectory::new();
        let a = directory.spawn_node(100);
        let b = directory.spawn_node(200);
        a.join(NodeId(100)).await.unwrap();
        b.join(NodeId(100)).await.unwrap();

        let reply = execute(&a, &ShellCommand::Lookup { id: NodeId(150) }).await.unwrap();
        assert_eq!(reply, "150 -> 200 (0.0.0.200)");

        let reply = execute(&a, &ShellCommand::Status { address: NodeId(200) }).await.unwrap();
        assert_eq!(reply, format!("0.0.0.200: {}", NodeStatus::Connected));
        let reply = execute(&a, &ShellCommand::Status { address: NodeId(999) }).await.unwrap();
        assert_eq!(reply, "0.0.3.231: disconnected");

        let printed = execute(&a, &ShellCommand::Print).await.unwrap();
        assert!(printed.contains("predecessor: 200 (0.0.0.200)"));
        assert_eq!(printed.lines().filter(|l| l.starts_with("finger")).count(), 32);
    }
}
