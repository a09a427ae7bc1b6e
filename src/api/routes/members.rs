use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;

use crate::api::state::AppState;
use crate::api::views::{MemberWithProgress, RosterProfile};
use crate::api::{Actor, ApiError};
use crate::calculate::member_progress;

/// Onboarded roster, highest CP first, with per-member gear completion.
pub async fn list_members(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let (total_equipment, mut members) = tokio::try_join!(
        state.store.count_equipment(),
        state.store.onboarded_members()
    )?;

    members.sort_by(|a, b| b.member.cp.cmp(&a.member.cp));

    let rows: Vec<MemberWithProgress> = members
        .iter()
        .map(|m| MemberWithProgress {
            profile: RosterProfile::from(m),
            progress: member_progress(m, total_equipment),
            total_equipment,
        })
        .collect();

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(rows)))
}

#[cfg(test)]
mod tests {
    use crate::api::build_router;
    use crate::api::test_support::*;
    use crate::models::{Equipment, EquipmentKind, GearLogRecord, Member, Role};
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_members_sorted_by_cp_with_progress() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());

        let helm = state
            .store
            .insert_equipment(Equipment::new("Helm", EquipmentKind::Gear, "a".into()))
            .await
            .unwrap();
        let boots = state
            .store
            .insert_equipment(Equipment::new("Boots", EquipmentKind::Gear, "a".into()))
            .await
            .unwrap();

        let mut ana = add_member(&state, "Ana", Role::Member).await;
        ana.cp = 1200;
        ana.gear_log = vec![
            GearLogRecord::new(helm.id.clone()),
            GearLogRecord::new(boots.id.clone()),
        ];
        state.store.update_member(ana.clone()).await.unwrap();

        let mut bo = add_member(&state, "Bo", Role::Member).await;
        bo.cp = 4800;
        state.store.update_member(bo).await.unwrap();

        state
            .store
            .insert_member(Member::new("pending@guild.gg"))
            .await
            .unwrap();

        // Boots disappears from the catalog; Ana's entry for it goes stale.
        state.store.delete_equipment(&boots.id).await.unwrap();

        let app = build_router(state);
        let (status, headers, json) = send(app, "GET", "/api/members", Some(&ana), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get("cache-control").unwrap(), "no-store");

        let rows = json.as_array().unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Bo", "Ana"]);
        for row in rows {
            assert!(row.get("email").is_none());
        }

        let ana_row = &rows[1];
        assert_eq!(ana_row["totalEquipment"], 1);
        assert_eq!(ana_row["neededCount"], 1);
        assert_eq!(ana_row["ownedCount"], 0);
        assert_eq!(ana_row["gearProgress"], 0);
        assert_eq!(ana_row["gearLog"].as_array().unwrap().len(), 1);
        assert_eq!(ana_row["gearLog"][0]["equipment"]["name"], "Helm");

        assert_eq!(rows[0]["gearProgress"], 100);
    }
}
