use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo_types::Geometry;
use geozero::wkb;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Executor, PgConnection, Pool, Postgres, QueryBuilder, Row, Transaction,
};
use uuid::Uuid;

use super::{MembershipOutcome, SpatialQuery, Store, Threshold};
use crate::entities::{Category, MembershipEdit, Page, PageRequest, Place, PlaceGroup};
use crate::error::{unexpected_error, Error};
use crate::geometry::to_ewkt;

const PLACE_COLUMNS: &str = "
    SELECT
        p.id,
        p.name,
        p.description,
        p.category,
        p.location::geometry AS location,
        p.visit_radius_meters,
        p.deleted,
        p.deleted_at,
        p.created_at,
        p.updated_at
";

const GROUP_COLUMNS: &str = "
    SELECT
        g.id,
        g.name,
        g.description,
        g.deleted,
        g.deleted_at,
        g.created_at,
        g.updated_at
";

/// PostGIS-backed store. Locations are `geography(Point, 4326)`, so every
/// distance predicate is evaluated on the spheroid.
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::new", skip_all)]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        // TODO: move this to sqlx migrations
        pool.execute("CREATE EXTENSION IF NOT EXISTS postgis").await?;
        pool.execute(
            "CREATE TABLE IF NOT EXISTS places (
                id UUID PRIMARY KEY,
                name VARCHAR(200) NOT NULL,
                description TEXT,
                category VARCHAR(64) NOT NULL,
                location geography(Point, 4326) NOT NULL,
                visit_radius_meters INT4 NOT NULL CHECK (visit_radius_meters > 0),
                deleted BOOLEAN NOT NULL DEFAULT FALSE,
                deleted_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS places_location_idx ON places USING GIST (location)")
            .await?;
        pool.execute(
            "CREATE TABLE IF NOT EXISTS place_groups (
                id UUID PRIMARY KEY,
                name VARCHAR(200) NOT NULL,
                description TEXT,
                deleted BOOLEAN NOT NULL DEFAULT FALSE,
                deleted_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .await?;
        pool.execute(
            "CREATE TABLE IF NOT EXISTS place_group_members (
                place_id UUID NOT NULL REFERENCES places(id),
                group_id UUID NOT NULL REFERENCES place_groups(id),
                PRIMARY KEY (place_id, group_id)
            )",
        )
        .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS place_group_members_group_idx ON place_group_members (group_id)")
            .await?;

        Ok(Self { pool })
    }
}

fn place_from_row(row: &PgRow) -> Result<Place, Error> {
    let wkb::Decode { geometry } = row.try_get::<wkb::Decode<Geometry<f64>>, _>("location")?;
    let location = match geometry {
        Some(Geometry::Point(point)) => point,
        other => {
            tracing::error!(?other, "place location is not a point");
            return Err(unexpected_error());
        }
    };

    let category: String = row.try_get("category")?;

    Ok(Place {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: category.parse()?,
        location,
        visit_radius_meters: row.try_get("visit_radius_meters")?,
        deleted: row.try_get("deleted")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        group_ids: BTreeSet::new(),
    })
}

fn group_from_row(row: &PgRow) -> Result<PlaceGroup, Error> {
    Ok(PlaceGroup {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        deleted: row.try_get("deleted")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        place_ids: BTreeSet::new(),
    })
}

/// Fills `group_ids` with the live groups of each place.
async fn attach_groups(conn: &mut PgConnection, places: &mut [Place]) -> Result<(), Error> {
    if places.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = places.iter().map(|p| p.id).collect();
    let rows = sqlx::query(
        "SELECT m.place_id, m.group_id
         FROM place_group_members m
         JOIN place_groups g ON g.id = m.group_id
         WHERE g.deleted = FALSE AND m.place_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut edges: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
    for row in rows.iter() {
        let place_id: Uuid = row.try_get("place_id")?;
        let group_id: Uuid = row.try_get("group_id")?;
        edges.entry(place_id).or_default().insert(group_id);
    }

    for place in places.iter_mut() {
        place.group_ids = edges.remove(&place.id).unwrap_or_default();
    }

    Ok(())
}

/// Fills `place_ids` with the live places of each group.
async fn attach_places(conn: &mut PgConnection, groups: &mut [PlaceGroup]) -> Result<(), Error> {
    if groups.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
    let rows = sqlx::query(
        "SELECT m.group_id, m.place_id
         FROM place_group_members m
         JOIN places p ON p.id = m.place_id
         WHERE p.deleted = FALSE AND m.group_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut edges: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
    for row in rows.iter() {
        let group_id: Uuid = row.try_get("group_id")?;
        let place_id: Uuid = row.try_get("place_id")?;
        edges.entry(group_id).or_default().insert(place_id);
    }

    for group in groups.iter_mut() {
        group.place_ids = edges.remove(&group.id).unwrap_or_default();
    }

    Ok(())
}

async fn fetch_live_group(conn: &mut PgConnection, id: Uuid) -> Result<Option<PlaceGroup>, Error> {
    let row = sqlx::query(&format!(
        "{GROUP_COLUMNS} FROM place_groups g WHERE g.id = $1 AND g.deleted = FALSE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let mut group = match row {
        Some(row) => group_from_row(&row)?,
        None => return Ok(None),
    };

    attach_places(conn, std::slice::from_mut(&mut group)).await?;

    Ok(Some(group))
}

/// WHERE clause shared by place listing and spatial search. The soft-delete
/// condition is always first.
fn push_place_filter(
    builder: &mut QueryBuilder<'_, Postgres>,
    spatial: Option<&SpatialQuery>,
    category: Option<Category>,
) {
    builder.push(" FROM places p WHERE p.deleted = FALSE");

    if let Some(query) = spatial {
        builder.push(" AND ST_DWithin(p.location, ST_SetSRID(");
        builder.push_bind(wkb::Encode(query.geometry.clone()));
        builder.push(", 4326)::geography, ");
        match query.threshold {
            Threshold::SearchRadius(search_radius_meters) => {
                builder.push_bind(search_radius_meters);
            }
            Threshold::VisitRadius => {
                builder.push("p.visit_radius_meters");
            }
        }
        builder.push(")");
    }

    if let Some(category) = category {
        builder.push(" AND p.category = ");
        builder.push_bind(category.name());
    }
}

impl PgStore {
    /// Read-only repeatable-read transaction. Every statement in it sees the
    /// same snapshot.
    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>, Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }

    /// Runs the page and count queries in one snapshot so the reported total
    /// matches the page contents.
    async fn fetch_place_page(
        &self,
        spatial: Option<&SpatialQuery>,
        category: Option<Category>,
        page: &PageRequest,
    ) -> Result<Page<Place>, Error> {
        let mut tx = self.begin_snapshot().await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) AS total");
        push_place_filter(&mut count, spatial, category);
        let total: i64 = count.build().fetch_one(&mut *tx).await?.try_get("total")?;

        let mut select = QueryBuilder::new(PLACE_COLUMNS);
        push_place_filter(&mut select, spatial, category);
        select.push(" ORDER BY p.created_at ASC, p.id ASC LIMIT ");
        select.push_bind(page.limit());
        select.push(" OFFSET ");
        select.push_bind(page.offset());

        let rows = select.build().fetch_all(&mut *tx).await?;
        let mut places = rows
            .iter()
            .map(place_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        attach_groups(&mut tx, &mut places).await?;
        tx.commit().await?;

        Ok(Page::new(places, page, total as u64))
    }
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(skip(self, place), fields(id = %place.id))]
    async fn insert_place(&self, place: &Place) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query(
                "INSERT INTO places (id, name, description, category, location, visit_radius_meters, deleted, deleted_at, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, ST_SetSRID($5, 4326)::geography, $6, FALSE, NULL, $7, $7)",
            )
            .bind(&place.id)
            .bind(&place.name)
            .bind(&place.description)
            .bind(place.category.name())
            .bind(wkb::Encode(Geometry::Point(place.location)))
            .bind(place.visit_radius_meters)
            .bind(place.created_at),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_place(&self, id: Uuid) -> Result<Option<Place>, Error> {
        let mut tx = self.begin_snapshot().await?;

        let maybe_result = sqlx::query(&format!(
            "{PLACE_COLUMNS} FROM places p WHERE p.id = $1 AND p.deleted = FALSE"
        ))
        .bind(&id)
        .fetch_optional(&mut *tx)
        .await?;

        let place = match maybe_result {
            Some(row) => {
                let mut place = place_from_row(&row)?;
                attach_groups(&mut tx, std::slice::from_mut(&mut place)).await?;
                Some(place)
            }
            None => None,
        };

        tx.commit().await?;

        Ok(place)
    }

    #[tracing::instrument(skip(self))]
    async fn list_places(
        &self,
        category: Option<Category>,
        page: &PageRequest,
    ) -> Result<Page<Place>, Error> {
        self.fetch_place_page(None, category, page).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_place(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query(
                    "UPDATE places SET deleted = TRUE, deleted_at = $2, updated_at = $2
                     WHERE id = $1 AND deleted = FALSE",
                )
                .bind(&id)
                .bind(at),
            )
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, group), fields(id = %group.id))]
    async fn insert_group(&self, group: &PlaceGroup) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query(
                "INSERT INTO place_groups (id, name, description, deleted, deleted_at, created_at, updated_at)
                 VALUES ($1, $2, $3, FALSE, NULL, $4, $4)",
            )
            .bind(&group.id)
            .bind(&group.name)
            .bind(&group.description)
            .bind(group.created_at),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_group(&self, id: Uuid) -> Result<Option<PlaceGroup>, Error> {
        let mut tx = self.begin_snapshot().await?;

        let group = fetch_live_group(&mut tx, id).await?;
        tx.commit().await?;

        Ok(group)
    }

    #[tracing::instrument(skip(self))]
    async fn list_groups(&self, page: &PageRequest) -> Result<Page<PlaceGroup>, Error> {
        let mut tx = self.begin_snapshot().await?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM place_groups WHERE deleted = FALSE")
            .fetch_one(&mut *tx)
            .await?
            .try_get("total")?;

        let rows = sqlx::query(&format!(
            "{GROUP_COLUMNS} FROM place_groups g WHERE g.deleted = FALSE
             ORDER BY g.created_at ASC, g.id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *tx)
        .await?;

        let mut groups = rows
            .iter()
            .map(group_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        attach_places(&mut tx, &mut groups).await?;
        tx.commit().await?;

        Ok(Page::new(groups, page, total as u64))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_group(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query(
                    "UPDATE place_groups SET deleted = TRUE, deleted_at = $2, updated_at = $2
                     WHERE id = $1 AND deleted = FALSE",
                )
                .bind(&id)
                .bind(at),
            )
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, query), fields(geometry = %to_ewkt(&query.geometry), threshold = ?query.threshold))]
    async fn search_places(
        &self,
        query: &SpatialQuery,
        page: &PageRequest,
    ) -> Result<Page<Place>, Error> {
        self.fetch_place_page(Some(query), query.category, page).await
    }

    #[tracing::instrument(skip(self))]
    async fn update_membership(
        &self,
        group_id: Uuid,
        place_id: Uuid,
        edit: MembershipEdit,
        at: DateTime<Utc>,
    ) -> Result<MembershipOutcome, Error> {
        let mut tx = self.pool.begin().await?;

        // lock order is group then place for every membership edit
        let group = sqlx::query("SELECT id FROM place_groups WHERE id = $1 AND deleted = FALSE FOR UPDATE")
            .bind(&group_id)
            .fetch_optional(&mut *tx)
            .await?;
        if group.is_none() {
            return Ok(MembershipOutcome::GroupNotFound);
        }

        let place = sqlx::query("SELECT id FROM places WHERE id = $1 AND deleted = FALSE FOR UPDATE")
            .bind(&place_id)
            .fetch_optional(&mut *tx)
            .await?;
        if place.is_none() {
            return Ok(MembershipOutcome::PlaceNotFound);
        }

        let edge = match edit {
            MembershipEdit::Add => sqlx::query(
                "INSERT INTO place_group_members (place_id, group_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            ),
            MembershipEdit::Remove => sqlx::query(
                "DELETE FROM place_group_members WHERE place_id = $1 AND group_id = $2",
            ),
        };
        let changed = edge
            .bind(&place_id)
            .bind(&group_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if changed {
            sqlx::query("UPDATE places SET updated_at = $2 WHERE id = $1")
                .bind(&place_id)
                .bind(at)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE place_groups SET updated_at = $2 WHERE id = $1")
                .bind(&group_id)
                .bind(at)
                .execute(&mut *tx)
                .await?;
        } else {
            tracing::info!("membership already in requested state");
        }

        let group = fetch_live_group(&mut tx, group_id)
            .await?
            .ok_or_else(unexpected_error)?;

        tx.commit().await?;

        Ok(MembershipOutcome::Updated(group))
    }
}

#[test]
#[ignore = "requires a PostGIS database at DATABASE_URL"]
fn postgis_round_trip() {
    use crate::entities::new_place;
    use crate::geometry::Coordinates;
    use tokio_test::block_on;

    let db_uri = std::env::var("DATABASE_URL").unwrap();
    let store = block_on(PgStore::new(&db_uri, 2)).unwrap();

    let place = Place::new(new_place("Alexanderplatz", 52.521918, 13.413215, 75)).unwrap();
    block_on(store.insert_place(&place)).unwrap();

    let stored = block_on(store.fetch_place(place.id)).unwrap().unwrap();
    assert_eq!(stored.coordinates(), Coordinates::new(52.521918, 13.413215));

    let near = SpatialQuery {
        geometry: Geometry::Point(place.location),
        threshold: Threshold::SearchRadius(1.0),
        category: None,
    };
    let page = block_on(store.search_places(&near, &PageRequest::default())).unwrap();
    assert!(page.content.iter().any(|p| p.id == place.id));

    assert!(block_on(store.delete_place(place.id, Utc::now())).unwrap());
    assert!(block_on(store.fetch_place(place.id)).unwrap().is_none());
}

#[test]
#[ignore = "requires a PostGIS database at DATABASE_URL"]
fn fetch_reads_entity_and_edges_together() {
    use crate::entities::{new_place, NewGroup};
    use tokio_test::block_on;

    let db_uri = std::env::var("DATABASE_URL").unwrap();
    let store = block_on(PgStore::new(&db_uri, 2)).unwrap();

    let place = Place::new(new_place("Gendarmenmarkt", 52.5137, 13.3927, 60)).unwrap();
    let group = PlaceGroup::new(NewGroup {
        name: "Squares".into(),
        description: None,
    })
    .unwrap();
    block_on(store.insert_place(&place)).unwrap();
    block_on(store.insert_group(&group)).unwrap();

    let outcome = block_on(store.update_membership(
        group.id,
        place.id,
        MembershipEdit::Add,
        Utc::now(),
    ))
    .unwrap();
    assert!(matches!(outcome, MembershipOutcome::Updated(_)));

    let stored_place = block_on(store.fetch_place(place.id)).unwrap().unwrap();
    assert!(stored_place.group_ids.contains(&group.id));

    let stored_group = block_on(store.fetch_group(group.id)).unwrap().unwrap();
    assert!(stored_group.place_ids.contains(&place.id));

    assert!(block_on(store.delete_group(group.id, Utc::now())).unwrap());
    assert!(block_on(store.fetch_group(group.id)).unwrap().is_none());

    let stored_place = block_on(store.fetch_place(place.id)).unwrap().unwrap();
    assert!(stored_place.group_ids.is_empty());
}
