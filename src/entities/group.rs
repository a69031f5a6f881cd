use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::validate_text;
use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaceGroup {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub place_ids: BTreeSet<Uuid>,
}

impl PlaceGroup {
    pub fn new(request: NewGroup) -> Result<Self, Error> {
        validate_text(&request.name, request.description.as_deref())?;

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            place_ids: BTreeSet::new(),
        })
    }

    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    pub fn mark_deleted(&mut self, at: DateTime<Utc>) {
        if self.deleted {
            return;
        }

        self.deleted = true;
        self.deleted_at = Some(at);
        self.updated_at = at;
    }
}

#[test]
fn new_group_validates_request() {
    let group = PlaceGroup::new(NewGroup {
        name: "Berlin".into(),
        description: Some("Weekend trip".into()),
    })
    .unwrap();

    assert!(group.is_live());
    assert!(group.place_ids.is_empty());

    let err = PlaceGroup::new(NewGroup {
        name: "".into(),
        description: None,
    })
    .unwrap_err();
    assert_eq!(err.code, 101);
}
