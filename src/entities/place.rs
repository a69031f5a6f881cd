use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::validate_text;
use crate::error::{invalid_input_error, invalid_radius_error, Error};
use crate::geometry::{point_from, Coordinates};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Landmark,
    Museum,
    Park,
    Restaurant,
    City,
    Other,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Landmark => "LANDMARK",
            Self::Museum => "MUSEUM",
            Self::Park => "PARK",
            Self::Restaurant => "RESTAURANT",
            Self::City => "CITY",
            Self::Other => "OTHER",
        }
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LANDMARK" => Ok(Self::Landmark),
            "MUSEUM" => Ok(Self::Museum),
            "PARK" => Ok(Self::Park),
            "RESTAURANT" => Ok(Self::Restaurant),
            "CITY" => Ok(Self::City),
            "OTHER" => Ok(Self::Other),
            _ => Err(invalid_input_error(format!("unknown category: {s}"))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlace {
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub latitude: f64,
    pub longitude: f64,
    pub visit_radius_meters: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    /// x = longitude, y = latitude.
    pub location: Point<f64>,
    /// Distance within which a passing track counts as a visit.
    pub visit_radius_meters: i32,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub group_ids: BTreeSet<Uuid>,
}

impl Place {
    pub fn new(request: NewPlace) -> Result<Self, Error> {
        validate_text(&request.name, request.description.as_deref())?;

        if request.visit_radius_meters <= 0 {
            return Err(invalid_radius_error());
        }

        let location = point_from(request.latitude, request.longitude)?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            category: request.category,
            location,
            visit_radius_meters: request.visit_radius_meters,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            group_ids: BTreeSet::new(),
        })
    }

    pub fn coordinates(&self) -> Coordinates {
        self.location.into()
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

#[cfg(test)]
pub(crate) fn new_place(name: &str, latitude: f64, longitude: f64, radius: i32) -> NewPlace {
    NewPlace {
        name: name.into(),
        description: None,
        category: Category::Landmark,
        latitude,
        longitude,
        visit_radius_meters: radius,
    }
}

#[test]
fn category_names_round_trip() {
    for category in [
        Category::Landmark,
        Category::Museum,
        Category::Park,
        Category::Restaurant,
        Category::City,
        Category::Other,
    ] {
        assert_eq!(category.name().parse::<Category>().unwrap(), category);
        assert_eq!(
            serde_json::to_value(category).unwrap(),
            serde_json::json!(category.name())
        );
    }

    assert_eq!("park".parse::<Category>().unwrap_err().code, 101);
}

#[test]
fn new_place_validates_request() {
    let place = Place::new(new_place("Brandenburger Tor", 52.5163, 13.3777, 100)).unwrap();
    assert_eq!(place.coordinates(), Coordinates::new(52.5163, 13.3777));
    assert!(place.is_live());
    assert!(place.group_ids.is_empty());
    assert_eq!(place.created_at, place.updated_at);

    assert_eq!(Place::new(new_place("  ", 0.0, 0.0, 10)).unwrap_err().code, 101);
    assert_eq!(
        Place::new(new_place(&"x".repeat(201), 0.0, 0.0, 10))
            .unwrap_err()
            .code,
        101
    );
    assert_eq!(Place::new(new_place("a", 0.0, 0.0, 0)).unwrap_err().code, 103);
    assert_eq!(Place::new(new_place("a", 0.0, 0.0, -5)).unwrap_err().code, 103);
    assert_eq!(Place::new(new_place("a", -91.0, 0.0, 5)).unwrap_err().code, 102);

    let mut request = new_place("a", 0.0, 0.0, 5);
    request.description = Some("d".repeat(4001));
    assert_eq!(Place::new(request).unwrap_err().code, 101);
}

#[test]
fn mark_deleted_only_once() {
    let mut place = Place::new(new_place("a", 0.0, 0.0, 5)).unwrap();
    let first = Utc::now();
    place.mark_deleted(first);
    place.mark_deleted(first + chrono::Duration::seconds(5));

    assert!(!place.is_live());
    assert_eq!(place.deleted_at, Some(first));
    assert_eq!(place.updated_at, first);
}

#[test]
fn new_place_accepts_camel_case_json() {
    let request: NewPlace = serde_json::from_value(serde_json::json!({
        "name": "Tiergarten",
        "category": "PARK",
        "latitude": 52.5145,
        "longitude": 13.3501,
        "visitRadiusMeters": 250
    }))
    .unwrap();

    assert_eq!(request.category, Category::Park);
    assert_eq!(request.visit_radius_meters, 250);
    assert!(request.description.is_none());
}
