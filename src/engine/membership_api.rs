use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::MembershipAPI,
    db::MembershipOutcome,
    entities::{MembershipEdit, PlaceGroup},
    error::{not_found_error, Error},
};

impl Engine {
    async fn edit_membership(
        &self,
        group_id: Uuid,
        place_id: Uuid,
        edit: MembershipEdit,
    ) -> Result<PlaceGroup, Error> {
        let outcome = self
            .store
            .update_membership(group_id, place_id, edit, Utc::now())
            .await?;

        match outcome {
            MembershipOutcome::Updated(group) => Ok(group),
            MembershipOutcome::GroupNotFound => Err(not_found_error("group", group_id)),
            MembershipOutcome::PlaceNotFound => Err(not_found_error("place", place_id)),
        }
    }
}

#[async_trait]
impl MembershipAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn add_place_to_group(
        &self,
        group_id: Uuid,
        place_id: Uuid,
    ) -> Result<PlaceGroup, Error> {
        self.edit_membership(group_id, place_id, MembershipEdit::Add)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn remove_place_from_group(
        &self,
        group_id: Uuid,
        place_id: Uuid,
    ) -> Result<PlaceGroup, Error> {
        self.edit_membership(group_id, place_id, MembershipEdit::Remove)
            .await
    }
}

#[cfg(test)]
fn seed(engine: &Engine) -> (PlaceGroup, crate::entities::Place) {
    use crate::api::{GroupAPI, PlaceAPI};
    use crate::entities::{new_place, NewGroup};
    use tokio_test::block_on;

    let group = block_on(engine.create_group(NewGroup {
        name: "Berlin walk".into(),
        description: None,
    }))
    .unwrap();
    let place = block_on(engine.create_place(new_place("Gendarmenmarkt", 52.5138, 13.3927, 60)))
        .unwrap();

    (group, place)
}

#[test]
fn add_and_remove_update_both_sides() {
    use crate::api::{GroupAPI, PlaceAPI};
    use tokio_test::block_on;

    let engine = super::test_engine();
    let (group, place) = seed(&engine);

    let updated = block_on(engine.add_place_to_group(group.id, place.id)).unwrap();
    assert!(updated.place_ids.contains(&place.id));
    assert!(block_on(engine.find_group(group.id))
        .unwrap()
        .place_ids
        .contains(&place.id));
    assert!(block_on(engine.find_place(place.id))
        .unwrap()
        .group_ids
        .contains(&group.id));

    let updated = block_on(engine.remove_place_from_group(group.id, place.id)).unwrap();
    assert!(updated.place_ids.is_empty());
    assert!(block_on(engine.find_group(group.id))
        .unwrap()
        .place_ids
        .is_empty());
    assert!(block_on(engine.find_place(place.id))
        .unwrap()
        .group_ids
        .is_empty());
}

#[test]
fn membership_edits_are_idempotent() {
    use tokio_test::block_on;

    let engine = super::test_engine();
    let (group, place) = seed(&engine);

    block_on(engine.add_place_to_group(group.id, place.id)).unwrap();
    let again = block_on(engine.add_place_to_group(group.id, place.id)).unwrap();
    assert_eq!(again.place_ids.len(), 1);

    block_on(engine.remove_place_from_group(group.id, place.id)).unwrap();
    let again = block_on(engine.remove_place_from_group(group.id, place.id)).unwrap();
    assert!(again.place_ids.is_empty());
}

#[test]
fn membership_edits_require_live_entities() {
    use crate::api::{GroupAPI, PlaceAPI};
    use tokio_test::block_on;

    let engine = super::test_engine();
    let (group, place) = seed(&engine);

    let err = block_on(engine.add_place_to_group(Uuid::new_v4(), place.id)).unwrap_err();
    assert!(err.is_not_found_error());
    assert!(err.message.starts_with("group"));

    let err = block_on(engine.add_place_to_group(group.id, Uuid::new_v4())).unwrap_err();
    assert!(err.is_not_found_error());
    assert!(err.message.starts_with("place"));

    block_on(engine.delete_place(place.id)).unwrap();
    let err = block_on(engine.remove_place_from_group(group.id, place.id)).unwrap_err();
    assert!(err.is_not_found_error());

    block_on(engine.delete_group(group.id)).unwrap();
    let err = block_on(engine.add_place_to_group(group.id, place.id)).unwrap_err();
    assert!(err.is_not_found_error());
}

#[test]
fn deleted_entities_drop_out_of_membership_listings() {
    use crate::api::{GroupAPI, PlaceAPI};
    use crate::entities::{new_place, NewGroup};
    use tokio_test::block_on;

    let engine = super::test_engine();
    let (group, place) = seed(&engine);
    let other_group = block_on(engine.create_group(NewGroup {
        name: "Sights".into(),
        description: None,
    }))
    .unwrap();
    let other_place =
        block_on(engine.create_place(new_place("Museumsinsel", 52.5169, 13.4019, 120))).unwrap();

    block_on(engine.add_place_to_group(group.id, place.id)).unwrap();
    block_on(engine.add_place_to_group(group.id, other_place.id)).unwrap();
    block_on(engine.add_place_to_group(other_group.id, other_place.id)).unwrap();

    block_on(engine.delete_place(place.id)).unwrap();
    let listed = block_on(engine.find_group(group.id)).unwrap();
    assert_eq!(listed.place_ids.len(), 1);
    assert!(listed.place_ids.contains(&other_place.id));

    block_on(engine.delete_group(other_group.id)).unwrap();
    let listed = block_on(engine.find_place(other_place.id)).unwrap();
    assert_eq!(listed.group_ids.len(), 1);
    assert!(listed.group_ids.contains(&group.id));
}
