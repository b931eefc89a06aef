//! Property-based tests for the permission grammar, expansion and validation

use gatekeeper_authz::groups::{Group, GroupAggregator, InMemoryGroupStore};
use gatekeeper_authz::permission::{Permission, PermissionMap, PermissionScope};
use gatekeeper_authz::{authorize, expand, matches, validate_subset, PermissionCatalog};
use proptest::prelude::*;
use std::sync::Arc;

const SCOPES: [&str; 3] = ["own", "group", "all"];

fn segment() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

fn path(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment(), 1..=max)
}

fn scope() -> impl Strategy<Value = &'static str> {
    prop::sample::select(SCOPES.to_vec())
}

fn concrete() -> impl Strategy<Value = String> {
    (path(4), scope()).prop_map(|(segments, scope)| format!("{}:{}", segments.join("."), scope))
}

/// Replaces random segments (and possibly the scope) with wildcards
fn generalize(permission: &str, mask: &[bool], wild_scope: bool) -> String {
    let (path, scope) = permission.rsplit_once(':').unwrap();
    let segments: Vec<&str> = path
        .split('.')
        .zip(mask.iter().chain(std::iter::repeat(&false)))
        .map(|(segment, wild)| if *wild { "*" } else { segment })
        .collect();
    let scope = if wild_scope { "*" } else { scope };
    format!("{}:{}", segments.join("."), scope)
}

proptest! {
    #[test]
    fn test_scope_monotonicity(
        segments in path(4),
        held_rank in 0usize..3,
        required_rank in 0usize..3,
    ) {
        let path = segments.join(".");
        let held = format!("{}:{}", path, SCOPES[held_rank]);
        let required = format!("{}:{}", path, SCOPES[required_rank]);

        // Holding a scope grants every lower tier and nothing higher
        prop_assert_eq!(matches(&held, &required), required_rank <= held_rank);
    }

    #[test]
    fn test_generalized_pattern_still_matches(
        permission in concrete(),
        mask in prop::collection::vec(any::<bool>(), 4),
        wild_scope in any::<bool>(),
    ) {
        let pattern = generalize(&permission, &mask, wild_scope);
        prop_assert!(matches(&pattern, &permission), "{} should match {}", pattern, permission);
    }

    #[test]
    fn test_terminal_wildcard_covers_extensions(
        prefix in path(3),
        tail in path(3),
        token in scope(),
    ) {
        let pattern = format!("{}.*:{}", prefix.join("."), token);
        let extended = format!("{}.{}:{}", prefix.join("."), tail.join("."), token);
        prop_assert!(matches(&pattern, &extended));

        // Zero trailing segments match too
        let bare = format!("{}:{}", prefix.join("."), token);
        prop_assert!(matches(&pattern, &bare));
    }

    #[test]
    fn test_non_terminal_wildcard_fixes_length(
        head in segment(),
        middle in segment(),
        extra in path(2),
        action in segment(),
    ) {
        let pattern = format!("{}.*.{}:own", head, action);
        let exact = format!("{}.{}.{}:own", head, middle, action);
        prop_assert!(matches(&pattern, &exact));

        let longer = format!("{}.{}.{}.{}:own", head, middle, extra.join("."), action);
        prop_assert!(!matches(&pattern, &longer));
    }

    #[test]
    fn test_patterns_never_match_patterns(
        permission in concrete(),
        mask in prop::collection::vec(any::<bool>(), 4),
    ) {
        let pattern = generalize(&permission, &mask, true);
        prop_assert!(!matches("*:all", &pattern));
        prop_assert!(!matches(&pattern, &pattern));
    }

    #[test]
    fn test_expansion_agrees_with_matching(
        entries in prop::collection::vec(concrete(), 1..20),
        sample in concrete(),
        mask in prop::collection::vec(any::<bool>(), 4),
        wild_scope in any::<bool>(),
    ) {
        let catalog = PermissionCatalog::from_manifest(&entries.join("\n")).unwrap();
        let pattern = Permission::new(&generalize(&sample, &mask, wild_scope)).unwrap();

        let expanded = expand(&pattern, &catalog);
        for member in catalog.iter() {
            prop_assert_eq!(expanded.contains(member), pattern.matches(member));
        }

        // Idempotence: every member expands to itself
        for member in &expanded {
            prop_assert_eq!(expand(member, &catalog), vec![member.clone()]);
        }
    }

    #[test]
    fn test_denied_entries_never_authorize(
        held in prop::collection::vec(concrete(), 1..10),
        required in concrete(),
    ) {
        let map: PermissionMap = held
            .iter()
            .map(|p| (Permission::new(p).unwrap(), false))
            .collect();
        prop_assert!(!authorize(&map, &required));
    }

    #[test]
    fn test_held_map_is_always_a_valid_request(
        entries in prop::collection::vec(concrete(), 1..15),
        held in prop::collection::vec((concrete(), any::<bool>()), 0..10),
    ) {
        let catalog = PermissionCatalog::from_manifest(&entries.join("\n")).unwrap();
        let map: PermissionMap = held
            .iter()
            .map(|(p, v)| (Permission::new(p).unwrap(), *v))
            .collect();

        prop_assert!(validate_subset(&map, &map, &catalog).is_ok());
    }

    #[test]
    fn test_last_active_group_wins(
        values in prop::collection::vec((any::<bool>(), any::<bool>()), 1..8),
    ) {
        // Each group sets x.y:own; the tuple is (value, membership active)
        let aggregated = tokio_test::block_on(async {
            let store = Arc::new(InMemoryGroupStore::new());
            for (i, (value, active)) in values.iter().enumerate() {
                let id = format!("g{}", i);
                let mut grants = PermissionMap::new();
                grants.insert(Permission::new("x.y:own").unwrap(), *value);
                store.put_group(Group::new(id.clone(), id.clone()).with_grants(grants)).await;
                store.add_membership("user:p", &id).await.unwrap();
                if !active {
                    store.set_membership_active("user:p", &id, false).await.unwrap();
                }
            }
            GroupAggregator::new(store).aggregate("user:p").await.unwrap()
        });

        let expected = values.iter().rev().find(|(_, active)| *active).map(|(value, _)| *value);
        prop_assert_eq!(aggregated.get("x.y:own"), expected);
    }
}

#[test]
fn test_scope_order() {
    let ranks: Vec<u8> = [PermissionScope::Own, PermissionScope::Group, PermissionScope::All]
        .iter()
        .map(PermissionScope::rank)
        .collect();
    assert!(ranks.windows(2).all(|w| w[0] < w[1]));
    assert!(PermissionScope::Any.covers(PermissionScope::All));
    assert!(!PermissionScope::All.covers(PermissionScope::Any));
}
