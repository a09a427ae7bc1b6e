//! Statistics calculation engine.
//!
//! Computes derived metrics from the current member and equipment snapshot:
//! - Per-member gear completion
//! - Guild-wide CP and progress averages
//! - The gear leaderboard
//! - The "most needed" equipment table

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::models::{
    EquipmentId, EquipmentKind, GearProgress, GuildStats, LeaderboardEntry, NeededItemCount,
    ResolvedMember,
};
use crate::storage::{GuildStore, StoreError};

/// Leaderboard length.
pub const LEADERBOARD_SIZE: usize = 10;

/// Length of the most-needed table.
pub const MOST_NEEDED_SIZE: usize = 8;

/// Calculate gear completion from the catalog size and the number of
/// (non-stale) items a member still needs.
///
/// Owned count saturates at zero when the needed list outgrows the catalog,
/// and an empty catalog counts as fully complete.
pub fn gear_progress(total_equipment: u64, needed_count: u64) -> GearProgress {
    let owned_count = total_equipment.saturating_sub(needed_count);
    let gear_progress = if total_equipment > 0 {
        percent(owned_count, total_equipment)
    } else {
        100
    };

    GearProgress {
        needed_count,
        owned_count,
        gear_progress,
    }
}

/// Gear completion for one resolved member.
pub fn member_progress(member: &ResolvedMember, total_equipment: u64) -> GearProgress {
    gear_progress(total_equipment, member.valid_gear().count() as u64)
}

fn percent(part: u64, whole: u64) -> u32 {
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

fn rounded_mean(sum: u128, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        (sum as f64 / count as f64).round() as u64
    }
}

/// Count, per `gear` item, how many members still need it.
///
/// Sorted by count descending, ties broken by item id, truncated to `limit`.
pub fn most_needed(members: &[ResolvedMember], limit: usize) -> Vec<NeededItemCount> {
    let mut counts: HashMap<EquipmentId, NeededItemCount> = HashMap::new();

    for member in members {
        let mut seen: HashSet<&EquipmentId> = HashSet::new();
        for (item, _) in member.valid_gear() {
            if item.kind != EquipmentKind::Gear || !seen.insert(&item.id) {
                continue;
            }
            counts
                .entry(item.id.clone())
                .or_insert_with(|| NeededItemCount {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    kind: item.kind,
                    count: 0,
                })
                .count += 1;
        }
    }

    let mut ranked: Vec<NeededItemCount> = counts.into_values().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.id.cmp(&b.id)));
    ranked.truncate(limit);
    ranked
}

/// Rank members by gear progress, then CP, then id.
pub fn leaderboard(
    members: &[ResolvedMember],
    total_equipment: u64,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = members
        .iter()
        .map(|m| LeaderboardEntry {
            id: m.member.id.clone(),
            name: m.member.name.clone(),
            image: m.member.image.clone(),
            cp: m.member.cp,
            mastery: m.member.mastery,
            gear_progress: member_progress(m, total_equipment).gear_progress,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.gear_progress
            .cmp(&a.gear_progress)
            .then_with(|| b.cp.cmp(&a.cp))
            .then_with(|| a.id.cmp(&b.id))
    });
    entries.truncate(limit);
    entries
}

/// Compute guild statistics from a member snapshot and the catalog size.
pub fn aggregate(members: &[ResolvedMember], total_equipment: u64) -> GuildStats {
    if members.is_empty() {
        return GuildStats::empty(total_equipment);
    }

    let total_members = members.len() as u64;
    // Stored CP is unbounded, so sums are widened to stay overflow-free.
    let cp_sum: u128 = members.iter().map(|m| m.member.cp as u128).sum();
    let progress_sum: u128 = members
        .iter()
        .map(|m| member_progress(m, total_equipment).gear_progress as u128)
        .sum();

    GuildStats {
        total_members,
        total_equipment,
        avg_cp: rounded_mean(cp_sum, total_members),
        avg_progress: rounded_mean(progress_sum, total_members) as u32,
        most_needed: most_needed(members, MOST_NEEDED_SIZE),
        leaderboard: leaderboard(members, total_equipment, LEADERBOARD_SIZE),
    }
}

/// Read the current snapshot from the store and compute guild statistics.
///
/// The catalog count and the member read run concurrently; either failing
/// fails the whole computation.
pub async fn compute_guild_stats(store: &dyn GuildStore) -> Result<GuildStats, StoreError> {
    let (total_equipment, members) =
        tokio::try_join!(store.count_equipment(), store.onboarded_members())?;

    debug!(
        "Aggregating stats for {} members over {} equipment",
        members.len(),
        total_equipment
    );

    Ok(aggregate(&members, total_equipment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Member, NeededGear};
    use pretty_assertions::assert_eq;

    fn member(id: &str, cp: u64, gear: Vec<NeededGear>) -> ResolvedMember {
        let mut m = Member::new(&format!("{}@guild.gg", id)).with_name(id);
        m.id = id.into();
        m.cp = cp;
        m.is_onboarded = true;
        ResolvedMember {
            member: m,
            needed_gear: gear,
        }
    }

    fn gear(id: &str) -> NeededGear {
        NeededGear::resolved(id, &format!("Item {}", id), EquipmentKind::Gear)
    }

    fn special(id: &str) -> NeededGear {
        NeededGear::resolved(id, &format!("Item {}", id), EquipmentKind::Special)
    }

    #[test]
    fn test_gear_progress() {
        assert_eq!(gear_progress(4, 0).gear_progress, 100);
        assert_eq!(gear_progress(4, 2).gear_progress, 50);
        assert_eq!(gear_progress(4, 1).gear_progress, 75);
        assert_eq!(gear_progress(3, 1).gear_progress, 67);
        assert_eq!(gear_progress(3, 2).gear_progress, 33);
        assert_eq!(gear_progress(8, 1).gear_progress, 88);
    }

    #[test]
    fn test_owned_count_never_negative() {
        let p = gear_progress(2, 5);
        assert_eq!(p.owned_count, 0);
        assert_eq!(p.needed_count, 5);
        assert_eq!(p.gear_progress, 0);
    }

    #[test]
    fn test_empty_catalog_is_complete() {
        let p = gear_progress(0, 0);
        assert_eq!(p.gear_progress, 100);
        assert_eq!(gear_progress(0, 3).gear_progress, 100);
    }

    #[test]
    fn test_no_members() {
        let stats = aggregate(&[], 5);
        assert_eq!(stats, GuildStats::empty(5));
        assert_eq!(stats.avg_cp, 0);
        assert_eq!(stats.avg_progress, 0);
    }

    #[test]
    fn test_three_member_scenario() {
        let members = vec![
            member("a", 3000, vec![]),
            member("b", 2000, vec![gear("e1"), gear("e2")]),
            member("c", 1000, vec![gear("e1"), NeededGear::dangling("gone")]),
        ];

        let stats = aggregate(&members, 4);

        assert_eq!(stats.total_members, 3);
        assert_eq!(stats.total_equipment, 4);
        assert_eq!(stats.avg_cp, 2000);
        assert_eq!(stats.avg_progress, 75);

        let order: Vec<(&str, u32)> = stats
            .leaderboard
            .iter()
            .map(|e| (e.id.as_str(), e.gear_progress))
            .collect();
        assert_eq!(order, vec![("a", 100), ("c", 75), ("b", 50)]);

        assert_eq!(
            stats.most_needed,
            vec![
                NeededItemCount {
                    id: "e1".into(),
                    name: "Item e1".to_string(),
                    kind: EquipmentKind::Gear,
                    count: 2,
                },
                NeededItemCount {
                    id: "e2".into(),
                    name: "Item e2".to_string(),
                    kind: EquipmentKind::Gear,
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_stale_gear_does_not_inflate_needed_count() {
        let fresh = member("a", 0, vec![gear("e1")]);
        let with_stale = member("a", 0, vec![gear("e1"), NeededGear::dangling("deleted")]);

        assert_eq!(member_progress(&fresh, 4), member_progress(&with_stale, 4));
        assert_eq!(member_progress(&with_stale, 4).needed_count, 1);

        let ranked = most_needed(&[with_stale], MOST_NEEDED_SIZE);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id.as_str(), "e1");
    }

    #[test]
    fn test_most_needed_only_counts_gear_kind() {
        let members = vec![
            member("a", 0, vec![special("s1"), gear("g1")]),
            member("b", 0, vec![special("s1")]),
        ];
        let ranked = most_needed(&members, MOST_NEEDED_SIZE);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id.as_str(), "g1");
    }

    #[test]
    fn test_most_needed_counts_each_member_once() {
        let members = vec![member("a", 0, vec![gear("g1"), gear("g1")])];
        let ranked = most_needed(&members, MOST_NEEDED_SIZE);
        assert_eq!(ranked[0].count, 1);
    }

    #[test]
    fn test_most_needed_keys_by_id_not_name() {
        let twin_a = NeededGear::resolved("x1", "Ring", EquipmentKind::Gear);
        let twin_b = NeededGear::resolved("x2", "Ring", EquipmentKind::Gear);
        let ranked = most_needed(&[member("a", 0, vec![twin_a, twin_b])], MOST_NEEDED_SIZE);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_most_needed_truncates_and_breaks_ties_by_id() {
        let items: Vec<NeededGear> = (0..12).map(|i| gear(&format!("g{:02}", i))).collect();
        let mut members = vec![member("a", 0, items)];
        members.push(member("b", 0, vec![gear("g11")]));

        let ranked = most_needed(&members, MOST_NEEDED_SIZE);
        assert_eq!(ranked.len(), 8);
        assert_eq!(ranked[0].id.as_str(), "g11");
        assert_eq!(ranked[0].count, 2);
        let rest: Vec<&str> = ranked[1..].iter().map(|r| r.id.as_str()).collect();
        assert_eq!(rest, vec!["g00", "g01", "g02", "g03", "g04", "g05", "g06"]);
    }

    #[test]
    fn test_leaderboard_ties_break_on_cp_then_id() {
        let members = vec![
            member("m3", 100, vec![]),
            member("m1", 500, vec![]),
            member("m2", 100, vec![]),
        ];
        let board = leaderboard(&members, 0, LEADERBOARD_SIZE);
        let ids: Vec<&str> = board.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_leaderboard_truncates_to_ten() {
        let members: Vec<ResolvedMember> = (0..15)
            .map(|i| member(&format!("m{:02}", i), i * 100, vec![]))
            .collect();
        let stats = aggregate(&members, 3);
        assert_eq!(stats.leaderboard.len(), 10);
        assert_eq!(stats.leaderboard[0].cp, 1400);
        assert_eq!(stats.leaderboard[9].cp, 500);
    }

    #[test]
    fn test_averages_round() {
        let members = vec![member("a", 1, vec![]), member("b", 2, vec![])];
        let stats = aggregate(&members, 0);
        assert_eq!(stats.avg_cp, 2);
        assert_eq!(stats.avg_progress, 100);
    }

    #[test]
    fn test_huge_cp_does_not_overflow_average() {
        let members = vec![
            member("a", u64::MAX, vec![]),
            member("b", u64::MAX, vec![]),
            member("c", u64::MAX - 2, vec![]),
        ];
        let stats = aggregate(&members, 1);
        assert_eq!(stats.total_members, 3);
        assert!(stats.avg_cp > u64::MAX / 2);
        assert_eq!(stats.leaderboard[0].cp, u64::MAX);
    }

    #[tokio::test]
    async fn test_compute_guild_stats_from_store() {
        use crate::models::{Equipment, GearLogRecord};
        use crate::storage::{JsonlGuildStore, StorageConfig};

        let tmp = tempfile::tempdir().unwrap();
        let store = JsonlGuildStore::open(StorageConfig::new(tmp.path().to_path_buf())).unwrap();

        let mut ids = Vec::new();
        for name in ["Helm", "Boots", "Gloves", "Cape"] {
            let eq = store
                .insert_equipment(Equipment::new(name, EquipmentKind::Gear, "admin".into()))
                .await
                .unwrap();
            ids.push(eq.id);
        }

        let mut ana = Member::new("ana@guild.gg").with_name("Ana");
        ana.is_onboarded = true;
        ana.cp = 1200;
        ana.gear_log = vec![GearLogRecord::new(ids[0].clone())];
        store.insert_member(ana).await.unwrap();

        let mut not_onboarded = Member::new("lurker@guild.gg");
        not_onboarded.cp = 99_999;
        store.insert_member(not_onboarded).await.unwrap();

        let stats = compute_guild_stats(&store).await.unwrap();
        assert_eq!(stats.total_members, 1);
        assert_eq!(stats.total_equipment, 4);
        assert_eq!(stats.avg_cp, 1200);
        assert_eq!(stats.avg_progress, 75);
        assert_eq!(stats.most_needed.len(), 1);
        assert_eq!(stats.most_needed[0].name, "Helm");

        // Deleting the needed item leaves a dangling reference behind.
        store.delete_equipment(&ids[0]).await.unwrap();
        let stats = compute_guild_stats(&store).await.unwrap();
        assert_eq!(stats.total_equipment, 3);
        assert_eq!(stats.avg_progress, 100);
        assert!(stats.most_needed.is_empty());
    }

    #[tokio::test]
    async fn test_compute_guild_stats_propagates_read_failure() {
        use crate::storage::{Collection, JsonlGuildStore, StorageConfig};

        let tmp = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(tmp.path().to_path_buf());
        let store = JsonlGuildStore::open(config.clone()).unwrap();

        // A directory where the members file should be makes every read fail.
        std::fs::create_dir_all(config.collection_path(Collection::Members)).unwrap();

        let result = compute_guild_stats(&store).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
