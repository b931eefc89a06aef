//! Gatekeeper operator CLI
//!
//! Offline tooling around the authorization engine:
//! - validate a permission manifest
//! - expand grants against it
//! - check a requirement against a set of grants
//! - check a derived-credential request for escalation
//! - aggregate a principal's permissions from a groups file

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use gatekeeper_authz::groups::{Group, InMemoryGroupStore};
use gatekeeper_authz::{
    validate_subset, AuthzEngine, GatekeeperConfig, Permission, PermissionCatalog, PermissionMap,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

/// Gatekeeper CLI
#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "Gatekeeper permission engine tooling")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Permission manifest (overrides config)
    #[arg(long, env = "GATEKEEPER_CATALOG")]
    catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the manifest and report its size
    CheckCatalog,

    /// Expand grants against the catalog and print them as JSON
    Expand {
        #[command(flatten)]
        grants: GrantArgs,
    },

    /// Check a concrete requirement against grants (exit 1 on deny)
    Authorize {
        #[command(flatten)]
        grants: GrantArgs,

        /// Required concrete permission
        #[arg(short, long)]
        required: String,
    },

    /// Check that requested grants stay within held grants (exit 1 on violations)
    Validate {
        /// Requested grant, `permission=bool` (bare permission means true)
        #[arg(long = "requested", value_parser = parse_grant)]
        requested: Vec<(Permission, bool)>,

        /// Held grant, `permission=bool` (bare permission means true)
        #[arg(long = "held", value_parser = parse_grant)]
        held: Vec<(Permission, bool)>,
    },

    /// Aggregate a principal's permissions from a groups file
    Aggregate {
        /// JSON file with `groups` and `memberships`
        #[arg(short, long)]
        groups: PathBuf,

        /// Principal to aggregate
        #[arg(short, long)]
        principal: String,

        /// Print the expanded map instead of the raw one
        #[arg(long)]
        expanded: bool,
    },
}

#[derive(Args)]
struct GrantArgs {
    /// Grant, `permission=bool` (bare permission means true)
    #[arg(short, long = "grant", value_parser = parse_grant)]
    grants: Vec<(Permission, bool)>,
}

/// Groups file layout
#[derive(Deserialize)]
struct GroupsFile {
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default)]
    memberships: Vec<MembershipEntry>,
}

#[derive(Deserialize)]
struct MembershipEntry {
    principal: String,
    group: String,
    #[serde(default = "default_true")]
    active: bool,
}

fn default_true() -> bool { true }

/// Parses `permission[=bool]`
///
/// Segments may contain `=`, scopes never do, so only an `=` after the last
/// `:` separates the value.
fn parse_grant(raw: &str) -> std::result::Result<(Permission, bool), String> {
    let scope_start = raw.rfind(':').map_or(0, |i| i + 1);
    let (permission, value) = match raw[scope_start..].find('=') {
        Some(offset) => {
            let (permission, value) = raw.split_at(scope_start + offset);
            let value = &value[1..];
            let value = value
                .trim()
                .parse::<bool>()
                .map_err(|_| format!("expected true or false after '=', got '{}'", value))?;
            (permission, value)
        }
        None => (raw, true),
    };

    let permission = Permission::new(permission.trim()).map_err(|e| e.to_string())?;
    Ok((permission, value))
}

fn to_map(grants: Vec<(Permission, bool)>) -> PermissionMap {
    grants.into_iter().collect()
}

fn catalog_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.catalog {
        return Ok(path.clone());
    }

    let config = match &cli.config {
        Some(path) => GatekeeperConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => GatekeeperConfig::default(),
    };
    config.validate().context("Invalid configuration")?;

    Ok(config.catalog.path)
}

fn load_catalog(cli: &Cli) -> Result<Arc<PermissionCatalog>> {
    let path = catalog_path(cli)?;
    let catalog = PermissionCatalog::load(&path)
        .with_context(|| format!("Failed to load permission catalog {:?}", path))?;
    Ok(Arc::new(catalog))
}

async fn load_groups(path: &Path) -> Result<Arc<InMemoryGroupStore>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read groups file {:?}", path))?;
    let file: GroupsFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse groups file {:?}", path))?;

    let store = Arc::new(InMemoryGroupStore::new());
    for group in file.groups {
        store.put_group(group).await;
    }
    for membership in file.memberships {
        store
            .add_membership(&membership.principal, &membership.group)
            .await
            .with_context(|| format!("Invalid membership {} -> {}", membership.principal, membership.group))?;
        if !membership.active {
            store
                .set_membership_active(&membership.principal, &membership.group, false)
                .await?;
        }
    }

    Ok(store)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},gatekeeper_authz={}", log_level, log_level).into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let catalog = load_catalog(&cli)?;
    debug!("Catalog ready with {} entries", catalog.len());

    match cli.command {
        Command::CheckCatalog => {
            println!("{} permissions", catalog.len());
            Ok(ExitCode::SUCCESS)
        }
        Command::Expand { grants } => {
            let engine = AuthzEngine::new(catalog, Arc::new(InMemoryGroupStore::new()))?;
            print_json(&engine.expand_map(&to_map(grants.grants)))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Authorize { grants, required } => {
            let engine = AuthzEngine::new(catalog, Arc::new(InMemoryGroupStore::new()))?;
            let decision = engine.decide(&to_map(grants.grants), &required);
            print_json(&decision)?;

            info!("{} -> {}", required, decision.allowed);
            Ok(if decision.allowed { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Command::Validate { requested, held } => {
            if requested.is_empty() {
                bail!("Nothing requested; pass at least one --requested grant");
            }

            let validation = validate_subset(&to_map(requested), &to_map(held), &catalog);
            print_json(&validation)?;
            Ok(if validation.is_ok() { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Command::Aggregate { groups, principal, expanded } => {
            let store = load_groups(&groups).await?;
            let engine = AuthzEngine::new(catalog, store)?;

            let map = if expanded {
                engine.effective_permissions(&principal).await?
            } else {
                engine.aggregate_group_permissions(&principal).await?
            };
            print_json(&map)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_grant() {
        let (permission, value) = parse_grant("chats.read:own").unwrap();
        assert_eq!(permission.as_str(), "chats.read:own");
        assert!(value);

        let (permission, value) = parse_grant("chats.*:own=false").unwrap();
        assert_eq!(permission.as_str(), "chats.*:own");
        assert!(!value);

        assert!(parse_grant("chats.read:own=true").unwrap().1);
    }

    #[test]
    fn test_parse_grant_rejects_bad_input() {
        let err = parse_grant("chats.read:own=maybe").unwrap_err();
        assert!(err.contains("maybe"));

        assert!(parse_grant("chats.read=false").is_err());
        assert!(parse_grant("=true").is_err());
    }

    #[test]
    fn test_parse_grant_equals_inside_segment() {
        let (permission, value) = parse_grant("tags.k=v.read:own").unwrap();
        assert_eq!(permission.as_str(), "tags.k=v.read:own");
        assert!(value);

        let (permission, value) = parse_grant("tags.k=v.read:own=false").unwrap();
        assert_eq!(permission.as_str(), "tags.k=v.read:own");
        assert!(!value);
    }

    #[tokio::test]
    async fn test_load_groups() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
  "groups": [
    {{"id": "members", "name": "Members", "grants": {{"chats.*:own": true}}}},
    {{"id": "read-only", "name": "Read only", "grants": {{"chats.create:own": false}}}}
  ],
  "memberships": [
    {{"principal": "user:p", "group": "members"}},
    {{"principal": "user:p", "group": "read-only", "active": false}}
  ]
}}"#
        )
        .unwrap();

        let store = load_groups(file.path()).await.unwrap();
        let catalog = Arc::new(PermissionCatalog::from_manifest("chats.create:own\nchats.read:own\n").unwrap());
        let engine = AuthzEngine::new(catalog, store).unwrap();

        // The inactive deny does not apply
        assert!(engine.authorize_principal("user:p", "chats.create:own").await.unwrap());
    }

    #[tokio::test]
    async fn test_load_groups_unknown_group() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"memberships": [{{"principal": "user:p", "group": "ghost"}}]}}"#
        )
        .unwrap();

        assert!(load_groups(file.path()).await.is_err());
    }
}
