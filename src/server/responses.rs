use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{Category, Page, Place, PlaceGroup};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub latitude: f64,
    pub longitude: f64,
    pub visit_radius_meters: i32,
    pub group_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Place> for PlaceResponse {
    fn from(place: Place) -> Self {
        let coordinates = place.coordinates();

        Self {
            id: place.id,
            name: place.name,
            description: place.description,
            category: place.category,
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            visit_radius_meters: place.visit_radius_meters,
            group_ids: place.group_ids.into_iter().collect(),
            created_at: place.created_at,
            updated_at: place.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceGroupResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub place_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PlaceGroup> for PlaceGroupResponse {
    fn from(group: PlaceGroup) -> Self {
        Self {
            id: group.id,
            name: group.name,
            description: group.description,
            place_ids: group.place_ids.into_iter().collect(),
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
}

impl<T, U: From<T>> From<Page<T>> for PageResponse<U> {
    fn from(page: Page<T>) -> Self {
        let total_pages = page.total_pages();
        let first = page.is_first();
        let last = page.is_last();
        let page = page.map(U::from);

        Self {
            empty: page.content.is_empty(),
            content: page.content,
            number: page.number,
            size: page.size,
            total_elements: page.total_elements,
            total_pages,
            first,
            last,
        }
    }
}

#[test]
fn place_response_uses_lat_lon_order() {
    use crate::entities::new_place;

    let mut place = Place::new(new_place("Museumsinsel", 52.5169, 13.4019, 120)).unwrap();
    let group_id = Uuid::new_v4();
    place.group_ids.insert(group_id);

    let json = serde_json::to_value(PlaceResponse::from(place)).unwrap();

    assert_eq!(json["latitude"], 52.5169);
    assert_eq!(json["longitude"], 13.4019);
    assert_eq!(json["visitRadiusMeters"], 120);
    assert_eq!(json["category"], "LANDMARK");
    assert_eq!(json["groupIds"], serde_json::json!([group_id]));
}

#[test]
fn page_response_reports_totals() {
    use crate::entities::PageRequest;

    let page = Page::new(vec![1u32, 2], &PageRequest::new(1, 2).unwrap(), 5);
    let response: PageResponse<u64> = page.into();

    assert_eq!(response.content, vec![1u64, 2]);
    assert_eq!(response.total_pages, 3);
    assert!(!response.first);
    assert!(!response.last);
    assert!(!response.empty);
}
