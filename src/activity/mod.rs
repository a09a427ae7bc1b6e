//! Activity feed generation.
//!
//! Turns profile edits into human-readable activity entries and writes them
//! without ever failing the request that caused them.

use tracing::{debug, error};

use crate::models::{ActivityAction, ActivityLog, EquipmentRef, MemberId, ResolvedMember};
use crate::storage::GuildStore;

/// Items present in `new` but not `old`, and items present in `old` but not
/// `new`, each in their original order.
pub fn diff_list<'a, T: PartialEq>(old: &'a [T], new: &'a [T]) -> (Vec<&'a T>, Vec<&'a T>) {
    let added = new.iter().filter(|item| !old.contains(item)).collect();
    let removed = old.iter().filter(|item| !new.contains(item)).collect();
    (added, removed)
}

/// One of the owned-item lists on a member profile.
#[derive(Debug, Clone, Copy)]
enum OwnedList {
    LegendaryEquipment,
    Accessories,
    Abilities,
    Mounts,
}

impl OwnedList {
    fn items(self, member: &ResolvedMember) -> &[String] {
        let m = &member.member;
        match self {
            OwnedList::LegendaryEquipment => &m.user_equipment_items,
            OwnedList::Accessories => &m.user_equipment_accessories,
            OwnedList::Abilities => &m.user_abilities,
            OwnedList::Mounts => &m.user_mounts,
        }
    }

    fn actions(self) -> (ActivityAction, ActivityAction) {
        match self {
            OwnedList::LegendaryEquipment => (
                ActivityAction::LegendaryEquipmentAdded,
                ActivityAction::LegendaryEquipmentRemoved,
            ),
            OwnedList::Accessories => (
                ActivityAction::AccessoryAdded,
                ActivityAction::AccessoryRemoved,
            ),
            OwnedList::Abilities => (ActivityAction::AbilityAdded, ActivityAction::AbilityRemoved),
            OwnedList::Mounts => (ActivityAction::MountAdded, ActivityAction::MountRemoved),
        }
    }

    /// Noun used for a member's own edits ("as owned accessory").
    fn singular(self) -> &'static str {
        match self {
            OwnedList::LegendaryEquipment => "equipment",
            OwnedList::Accessories => "accessory",
            OwnedList::Abilities => "ability",
            OwnedList::Mounts => "mount",
        }
    }

    /// Noun used for admin edits ("to Ana's owned accessories").
    fn plural(self) -> &'static str {
        match self {
            OwnedList::LegendaryEquipment => "equipment",
            OwnedList::Accessories => "accessories",
            OwnedList::Abilities => "abilities",
            OwnedList::Mounts => "mounts",
        }
    }
}

fn gear_name(equipment: &EquipmentRef) -> &str {
    equipment
        .resolved()
        .map(|s| s.name.as_str())
        .unwrap_or("an item")
}

/// Build the activity entries describing how a member profile changed.
///
/// `before` and `after` are the same member before and after the update,
/// with gear logs resolved. `is_admin` is true when `actor` edited someone
/// else's profile; it switches owned-item and removed-gear entries to the
/// `admin_updated_user` form naming the target member.
pub fn profile_changes(
    before: &ResolvedMember,
    after: &ResolvedMember,
    actor: &MemberId,
    is_admin: bool,
) -> Vec<ActivityLog> {
    let mut logs = Vec::new();
    let old = &before.member;
    let new = &after.member;
    let target_name = new.display_name();
    let mut push = |action: ActivityAction, details: String| {
        logs.push(ActivityLog::new(actor.clone(), action, details));
    };

    if old.name != new.name {
        push(
            ActivityAction::NameUpdated,
            format!(
                "Name: {} → {}",
                old.name.as_deref().unwrap_or_default(),
                new.name.as_deref().unwrap_or_default()
            ),
        );
    }

    if old.cp != new.cp {
        push(
            ActivityAction::CpUpdated,
            format!("CP: {} → {}", old.cp, new.cp),
        );
    }

    if old.mastery != new.mastery {
        push(
            ActivityAction::MasteryUpdated,
            format!(
                "Mastery: {} → {}",
                old.mastery.map(|m| m.label()).unwrap_or_default(),
                new.mastery.map(|m| m.label()).unwrap_or_default()
            ),
        );
    }

    if old.equipment_type != new.equipment_type {
        push(
            ActivityAction::EquipmentTypeUpdated,
            format!(
                "Equipment Type: {} → {}",
                old.equipment_type.as_deref().unwrap_or_default(),
                new.equipment_type.as_deref().unwrap_or_default()
            ),
        );
    }

    for list in [
        OwnedList::LegendaryEquipment,
        OwnedList::Accessories,
        OwnedList::Abilities,
        OwnedList::Mounts,
    ] {
        let (added, removed) = diff_list(list.items(before), list.items(after));
        let (added_action, removed_action) = list.actions();

        for item in added {
            if is_admin {
                push(
                    ActivityAction::AdminUpdatedUser,
                    format!("Added {} to {}'s owned {}", item, target_name, list.plural()),
                );
            } else {
                push(
                    added_action,
                    format!("Added {} as owned {}", item, list.singular()),
                );
            }
        }

        for item in removed {
            if is_admin {
                push(
                    ActivityAction::AdminUpdatedUser,
                    format!(
                        "Removed {} from {}'s owned {}",
                        item,
                        target_name,
                        list.plural()
                    ),
                );
            } else {
                push(
                    removed_action,
                    format!("Removed {} as owned {}", item, list.singular()),
                );
            }
        }
    }

    let old_gear: Vec<&EquipmentRef> = before.needed_gear.iter().map(|g| &g.equipment).collect();
    let new_gear: Vec<&EquipmentRef> = after.needed_gear.iter().map(|g| &g.equipment).collect();
    let old_ids: Vec<_> = old_gear.iter().map(|e| e.id()).collect();
    let new_ids: Vec<_> = new_gear.iter().map(|e| e.id()).collect();
    let (added_ids, removed_ids) = diff_list(&old_ids, &new_ids);

    for id in added_ids {
        let name = new_gear
            .iter()
            .find(|e| e.id() == *id)
            .map(|e| gear_name(e))
            .unwrap_or("an item");
        push(
            ActivityAction::ItemLogAdded,
            format!("Added {} to item log", name),
        );
    }

    for id in removed_ids {
        let name = old_gear
            .iter()
            .find(|e| e.id() == *id)
            .map(|e| gear_name(e))
            .unwrap_or("an item");
        if is_admin {
            push(
                ActivityAction::AdminUpdatedUser,
                format!("Removed {} from {}'s item log", name, target_name),
            );
        } else {
            push(
                ActivityAction::ItemLogRemoved,
                format!("Removed {} from item log", name),
            );
        }
    }

    logs
}

/// Persist activity entries. Failures are logged and swallowed so the
/// operation being recorded still succeeds.
pub async fn record_activity(store: &dyn GuildStore, entries: &[ActivityLog]) {
    if entries.is_empty() {
        return;
    }

    match store.append_activity(entries).await {
        Ok(count) => debug!("Recorded {} activity entries", count),
        Err(e) => error!("Failed to record {} activity entries: {}", entries.len(), e),
    }
}
