//! The guild data-access object.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Collection, JsonlReader, JsonlWriter, StorageConfig, StoreError};
use crate::models::{
    sort_for_board, ActivityLog, Announcement, EntityId, Equipment, EquipmentId, EquipmentRef,
    EquipmentSummary, GearLogRecord, GuildEvent, Member, MemberId, NeededGear, ResolvedMember,
};

/// Every read and write the service performs against persisted guild data.
///
/// Update and delete operations return `Ok(None)` when no document has the
/// given id.
#[async_trait]
pub trait GuildStore: Send + Sync {
    // Members
    async fn list_members(&self) -> Result<Vec<Member>, StoreError>;
    /// Onboarded members with their gear log resolved against the catalog.
    async fn onboarded_members(&self) -> Result<Vec<ResolvedMember>, StoreError>;
    async fn get_member(&self, id: &MemberId) -> Result<Option<Member>, StoreError>;
    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, StoreError>;
    async fn resolve_member(&self, member: Member) -> Result<ResolvedMember, StoreError>;
    async fn insert_member(&self, member: Member) -> Result<Member, StoreError>;
    async fn update_member(&self, member: Member) -> Result<Option<Member>, StoreError>;
    /// Add `delta` attendance points to each listed member; returns how many matched.
    async fn adjust_attendance(&self, ids: &[MemberId], delta: i64) -> Result<usize, StoreError>;

    // Equipment
    async fn count_equipment(&self) -> Result<u64, StoreError>;
    /// All equipment, newest first.
    async fn list_equipment(&self) -> Result<Vec<Equipment>, StoreError>;
    async fn get_equipment(&self, id: &EquipmentId) -> Result<Option<Equipment>, StoreError>;
    async fn insert_equipment(&self, equipment: Equipment) -> Result<Equipment, StoreError>;
    async fn update_equipment(&self, equipment: Equipment)
        -> Result<Option<Equipment>, StoreError>;
    /// Member gear logs keep pointing at the removed id; readers see it as dangling.
    async fn delete_equipment(&self, id: &EquipmentId) -> Result<Option<Equipment>, StoreError>;

    // Activity
    async fn append_activity(&self, entries: &[ActivityLog]) -> Result<usize, StoreError>;
    /// Newest entries first.
    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityLog>, StoreError>;

    // Announcements
    /// Pinned first, then newest first.
    async fn list_announcements(&self) -> Result<Vec<Announcement>, StoreError>;
    async fn get_announcement(&self, id: &EntityId) -> Result<Option<Announcement>, StoreError>;
    async fn insert_announcement(&self, announcement: Announcement)
        -> Result<Announcement, StoreError>;
    async fn update_announcement(
        &self,
        announcement: Announcement,
    ) -> Result<Option<Announcement>, StoreError>;
    async fn delete_announcement(&self, id: &EntityId) -> Result<Option<Announcement>, StoreError>;

    // Attendance events
    /// Newest first.
    async fn list_events(&self) -> Result<Vec<GuildEvent>, StoreError>;
    async fn get_event(&self, id: &EntityId) -> Result<Option<GuildEvent>, StoreError>;
    async fn insert_event(&self, event: GuildEvent) -> Result<GuildEvent, StoreError>;
    async fn update_event(&self, event: GuildEvent) -> Result<Option<GuildEvent>, StoreError>;
    async fn delete_event(&self, id: &EntityId) -> Result<Option<GuildEvent>, StoreError>;
}

/// A stored document with an id and a modification timestamp.
trait Document: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;
    fn id(&self) -> &EntityId;
    fn touch(&mut self);
}

macro_rules! impl_document {
    ($ty:ty, $collection:expr) => {
        impl Document for $ty {
            const COLLECTION: Collection = $collection;
            fn id(&self) -> &EntityId {
                &self.id
            }
            fn touch(&mut self) {
                self.updated_at = Utc::now();
            }
        }
    };
}

impl_document!(Member, Collection::Members);
impl_document!(Equipment, Collection::Equipment);
impl_document!(Announcement, Collection::Announcements);
impl_document!(GuildEvent, Collection::Events);

/// Resolve stored gear-log references against the equipment catalog.
pub fn resolve_gear(
    log: &[GearLogRecord],
    catalog: &HashMap<EquipmentId, EquipmentSummary>,
) -> Vec<NeededGear> {
    log.iter()
        .map(|record| NeededGear {
            equipment: match catalog.get(&record.equipment) {
                Some(summary) => EquipmentRef::Resolved(summary.clone()),
                None => EquipmentRef::Dangling(record.equipment.clone()),
            },
            quantity: record.quantity,
        })
        .collect()
}

/// Filesystem-backed [`GuildStore`].
///
/// Reads go straight to disk; writes are serialized so concurrent
/// read-modify-write cycles cannot lose updates.
pub struct JsonlGuildStore {
    config: StorageConfig,
    write_lock: Mutex<()>,
}

impl JsonlGuildStore {
    /// Open the store, creating the data directory if needed.
    pub fn open(config: StorageConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(config.collections_dir())?;
        info!("Opened guild store at {:?}", config.data_dir);
        Ok(Self {
            config,
            write_lock: Mutex::new(()),
        })
    }

    /// Release the store. Every write is flushed when it completes, so this
    /// only waits for an in-flight write to finish.
    pub async fn close(self) {
        let _guard = self.write_lock.lock().await;
        info!("Closed guild store at {:?}", self.config.data_dir);
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn read<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StoreError> {
        JsonlReader::for_collection(&self.config, collection).read_all()
    }

    fn write<T: Serialize>(&self, collection: Collection, docs: &[T]) -> Result<(), StoreError> {
        JsonlWriter::for_collection(&self.config, collection).write_all(docs)?;
        Ok(())
    }

    fn catalog(&self) -> Result<HashMap<EquipmentId, EquipmentSummary>, StoreError> {
        let equipment: Vec<Equipment> = self.read(Collection::Equipment)?;
        Ok(equipment
            .iter()
            .map(|e| (e.id.clone(), e.summary()))
            .collect())
    }

    fn find<T: Document>(&self, id: &EntityId) -> Result<Option<T>, StoreError> {
        let docs: Vec<T> = self.read(T::COLLECTION)?;
        Ok(docs.into_iter().find(|d| d.id() == id))
    }

    async fn insert<T: Document>(&self, doc: T) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().await;
        JsonlWriter::for_collection(&self.config, T::COLLECTION)
            .append_batch(std::slice::from_ref(&doc))?;
        debug!("Inserted {} into {:?}", doc.id(), T::COLLECTION);
        Ok(doc)
    }

    async fn replace<T: Document>(&self, mut doc: T) -> Result<Option<T>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut docs: Vec<T> = self.read(T::COLLECTION)?;
        let Some(slot) = docs.iter_mut().find(|d| d.id() == doc.id()) else {
            return Ok(None);
        };
        doc.touch();
        *slot = doc.clone();
        self.write(T::COLLECTION, &docs)?;
        Ok(Some(doc))
    }

    async fn remove<T: Document>(&self, id: &EntityId) -> Result<Option<T>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut docs: Vec<T> = self.read(T::COLLECTION)?;
        let Some(pos) = docs.iter().position(|d| d.id() == id) else {
            return Ok(None);
        };
        let removed = docs.remove(pos);
        self.write(T::COLLECTION, &docs)?;
        debug!("Removed {} from {:?}", id, T::COLLECTION);
        Ok(Some(removed))
    }
}

#[async_trait]
impl GuildStore for JsonlGuildStore {
    async fn list_members(&self) -> Result<Vec<Member>, StoreError> {
        self.read(Collection::Members)
    }

    async fn onboarded_members(&self) -> Result<Vec<ResolvedMember>, StoreError> {
        let members = JsonlReader::<Member>::for_collection(&self.config, Collection::Members)
            .read_where(|m| m.is_onboarded)?;
        let catalog = self.catalog()?;
        Ok(members
            .into_iter()
            .map(|member| ResolvedMember {
                needed_gear: resolve_gear(&member.gear_log, &catalog),
                member,
            })
            .collect())
    }

    async fn get_member(&self, id: &MemberId) -> Result<Option<Member>, StoreError> {
        self.find(id)
    }

    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, StoreError> {
        let email = email.trim().to_lowercase();
        let members: Vec<Member> = self.read(Collection::Members)?;
        Ok(members.into_iter().find(|m| m.email == email))
    }

    async fn resolve_member(&self, member: Member) -> Result<ResolvedMember, StoreError> {
        let catalog = self.catalog()?;
        Ok(ResolvedMember {
            needed_gear: resolve_gear(&member.gear_log, &catalog),
            member,
        })
    }

    async fn insert_member(&self, member: Member) -> Result<Member, StoreError> {
        self.insert(member).await
    }

    async fn update_member(&self, member: Member) -> Result<Option<Member>, StoreError> {
        self.replace(member).await
    }

    async fn adjust_attendance(&self, ids: &[MemberId], delta: i64) -> Result<usize, StoreError> {
        if ids.is_empty() || delta == 0 {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;
        let mut members: Vec<Member> = self.read(Collection::Members)?;
        let mut matched = 0;
        for member in members.iter_mut().filter(|m| ids.contains(&m.id)) {
            member.attendance_points += delta;
            member.touch();
            matched += 1;
        }
        if matched > 0 {
            self.write(Collection::Members, &members)?;
        }
        debug!("Adjusted attendance by {} for {} members", delta, matched);
        Ok(matched)
    }

    async fn count_equipment(&self) -> Result<u64, StoreError> {
        let equipment: Vec<Equipment> = self.read(Collection::Equipment)?;
        Ok(equipment.len() as u64)
    }

    async fn list_equipment(&self) -> Result<Vec<Equipment>, StoreError> {
        let mut equipment: Vec<Equipment> = self.read(Collection::Equipment)?;
        equipment.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(equipment)
    }

    async fn get_equipment(&self, id: &EquipmentId) -> Result<Option<Equipment>, StoreError> {
        self.find(id)
    }

    async fn insert_equipment(&self, equipment: Equipment) -> Result<Equipment, StoreError> {
        self.insert(equipment).await
    }

    async fn update_equipment(
        &self,
        equipment: Equipment,
    ) -> Result<Option<Equipment>, StoreError> {
        self.replace(equipment).await
    }

    async fn delete_equipment(&self, id: &EquipmentId) -> Result<Option<Equipment>, StoreError> {
        self.remove(id).await
    }

    async fn append_activity(&self, entries: &[ActivityLog]) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        JsonlWriter::for_collection(&self.config, Collection::Activity).append_batch(entries)
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityLog>, StoreError> {
        let mut logs: Vec<ActivityLog> = self.read(Collection::Activity)?;
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs.truncate(limit);
        Ok(logs)
    }

    async fn list_announcements(&self) -> Result<Vec<Announcement>, StoreError> {
        let mut announcements: Vec<Announcement> = self.read(Collection::Announcements)?;
        sort_for_board(&mut announcements);
        Ok(announcements)
    }

    async fn get_announcement(&self, id: &EntityId) -> Result<Option<Announcement>, StoreError> {
        self.find(id)
    }

    async fn insert_announcement(
        &self,
        announcement: Announcement,
    ) -> Result<Announcement, StoreError> {
        self.insert(announcement).await
    }

    async fn update_announcement(
        &self,
        announcement: Announcement,
    ) -> Result<Option<Announcement>, StoreError> {
        self.replace(announcement).await
    }

    async fn delete_announcement(&self, id: &EntityId) -> Result<Option<Announcement>, StoreError> {
        self.remove(id).await
    }

    async fn list_events(&self) -> Result<Vec<GuildEvent>, StoreError> {
        let mut events: Vec<GuildEvent> = self.read(Collection::Events)?;
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn get_event(&self, id: &EntityId) -> Result<Option<GuildEvent>, StoreError> {
        self.find(id)
    }

    async fn insert_event(&self, event: GuildEvent) -> Result<GuildEvent, StoreError> {
        self.insert(event).await
    }

    async fn update_event(&self, event: GuildEvent) -> Result<Option<GuildEvent>, StoreError> {
        self.replace(event).await
    }

    async fn delete_event(&self, id: &EntityId) -> Result<Option<GuildEvent>, StoreError> {
        self.remove(id).await
    }
}
