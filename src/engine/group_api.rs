use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::GroupAPI,
    entities::{NewGroup, Page, PageRequest, PlaceGroup},
    error::{not_found_error, Error},
};

#[async_trait]
impl GroupAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_group(&self, request: NewGroup) -> Result<PlaceGroup, Error> {
        let group = PlaceGroup::new(request)?;

        self.store.insert_group(&group).await?;

        tracing::info!(id = %group.id, "group created");

        Ok(group)
    }

    #[tracing::instrument(skip(self))]
    async fn find_group(&self, id: Uuid) -> Result<PlaceGroup, Error> {
        self.store
            .fetch_group(id)
            .await?
            .ok_or_else(|| not_found_error("group", id))
    }

    #[tracing::instrument(skip(self))]
    async fn list_groups(&self, page: PageRequest) -> Result<Page<PlaceGroup>, Error> {
        self.store.list_groups(&page).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_group(&self, id: Uuid) -> Result<(), Error> {
        if !self.store.delete_group(id, Utc::now()).await? {
            return Err(not_found_error("group", id));
        }

        tracing::info!("group soft-deleted");

        Ok(())
    }
}

#[test]
fn group_lifecycle() {
    use tokio_test::block_on;

    let engine = super::test_engine();

    let group = block_on(engine.create_group(NewGroup {
        name: "Museums".into(),
        description: None,
    }))
    .unwrap();

    assert_eq!(block_on(engine.find_group(group.id)).unwrap(), group);
    assert_eq!(
        block_on(engine.list_groups(PageRequest::default()))
            .unwrap()
            .total_elements,
        1
    );

    block_on(engine.delete_group(group.id)).unwrap();

    assert!(block_on(engine.find_group(group.id))
        .unwrap_err()
        .is_not_found_error());
    assert!(block_on(engine.delete_group(group.id))
        .unwrap_err()
        .is_not_found_error());
    assert_eq!(
        block_on(engine.list_groups(PageRequest::default()))
            .unwrap()
            .total_elements,
        0
    );
}

#[test]
fn create_group_requires_name() {
    use tokio_test::block_on;

    let engine = super::test_engine();

    let err = block_on(engine.create_group(NewGroup {
        name: "   ".into(),
        description: Some("blank".into()),
    }))
    .unwrap_err();

    assert_eq!(err.code, 101);
}
