use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingFilter, BookingStatus, ServiceFilter, ServiceListing, User};

const BOOKING_COLUMNS: &str = "id, customer_id, provider_id, service_id, service_title, date, time, room_count, notes, status, created_at, updated_at";

fn to_millis(ts: Option<DateTime<Utc>>) -> Option<i64> {
    ts.map(|t| t.timestamp_millis())
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, customer_id, provider_id, service_id, service_title, date, time, room_count, notes, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.customer_id,
            booking.provider_id,
            booking.service_id,
            booking.service_title,
            booking.date,
            booking.time,
            booking.room_count,
            booking.notes,
            booking.status.as_str(),
            to_millis(booking.created_at),
            to_millis(booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        parse_booking_row,
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_by(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let column = match filter {
        BookingFilter::Customer(_) => "customer_id",
        BookingFilter::Provider(_) => "provider_id",
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {column} = ?1 ORDER BY id ASC"
    ))?;

    let rows = stmt.query_map(params![filter.identity()], parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

// Compare-and-set on `status`. `updated_at` is forced strictly past its previous value.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    status: BookingStatus,
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings
         SET status = ?1, updated_at = MAX(?2, COALESCE(updated_at, 0) + 1)
         WHERE id = ?3 AND status = ?4",
        params![status.as_str(), now.timestamp_millis(), id, expected.as_str()],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let status_str: String = row.get(9)?;
    let created_at: Option<i64> = row.get(10)?;
    let updated_at: Option<i64> = row.get(11)?;

    Ok(Booking {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        provider_id: row.get(2)?,
        service_id: row.get(3)?,
        service_title: row.get(4)?,
        date: row.get(5)?,
        time: row.get(6)?,
        room_count: row.get(7)?,
        notes: row.get(8)?,
        status: BookingStatus::parse(&status_str),
        created_at: from_millis(created_at),
        updated_at: from_millis(updated_at),
    })
}

// ── Services ──

pub fn create_service(conn: &Connection, service: &ServiceListing) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, provider_id, title, description, category, daily_rate, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            service.id,
            service.provider_id,
            service.title,
            service.description,
            service.category,
            service.daily_rate,
            service.active as i32,
            service.created_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

const SERVICE_COLUMNS: &str =
    "id, provider_id, title, description, category, daily_rate, active, created_at";

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<ServiceListing>> {
    let result = conn.query_row(
        &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
        params![id],
        parse_service_row,
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_active_services(
    conn: &Connection,
    filter: &ServiceFilter,
    limit: i64,
) -> anyhow::Result<Vec<ServiceListing>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services
         WHERE active = 1
           AND (?1 IS NULL OR provider_id = ?1)
           AND (?2 IS NULL OR instr(lower(title), lower(?2)) > 0)
           AND (?2 IS NOT NULL OR ?3 IS NULL OR category = ?3)
         ORDER BY created_at DESC LIMIT ?4"
    ))?;
    let rows = stmt.query_map(
        params![filter.provider_id, filter.search, filter.category, limit],
        parse_service_row,
    )?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<ServiceListing> {
    let created_at: i64 = row.get(7)?;
    Ok(ServiceListing {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        daily_rate: row.get(5)?,
        active: row.get::<_, i32>(6)? != 0,
        created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_default(),
    })
}

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, display_name, api_token) VALUES (?1, ?2, ?3)",
        params![user.id, user.display_name, user.api_token],
    )?;
    Ok(())
}

pub fn get_user_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, display_name, api_token FROM users WHERE api_token = ?1",
        params![token],
        |row| {
            Ok(User {
                id: row.get(0)?,
                display_name: row.get(1)?,
                api_token: row.get(2)?,
            })
        },
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn rotate_user_token(conn: &Connection, id: &str, token: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET api_token = ?1 WHERE id = ?2",
        params![token, id],
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn booking(id: &str, customer: &str, provider: &str, created_ms: Option<i64>) -> Booking {
        let created_at = created_ms.and_then(DateTime::from_timestamp_millis);
        Booking {
            id: id.to_string(),
            customer_id: customer.to_string(),
            provider_id: provider.to_string(),
            service_id: "svc-1".to_string(),
            service_title: "Deep Clean".to_string(),
            date: "2025-06-16".to_string(),
            time: "10:00 AM".to_string(),
            room_count: 3,
            notes: Some("Two cats".to_string()),
            status: BookingStatus::Pending,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_create_and_get_booking() {
        let conn = setup_db();
        let b = booking("b1", "alice", "bob", Some(1_700_000_000_000));
        create_booking(&conn, &b).unwrap();

        let loaded = get_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(loaded, b);
        assert!(get_booking_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_missing_timestamps_survive() {
        let conn = setup_db();
        create_booking(&conn, &booking("b1", "alice", "bob", None)).unwrap();

        let loaded = get_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert!(loaded.created_at.is_none());
        assert!(loaded.updated_at.is_none());
    }

    #[test]
    fn test_get_bookings_by_role() {
        let conn = setup_db();
        create_booking(&conn, &booking("b1", "alice", "bob", Some(1))).unwrap();
        create_booking(&conn, &booking("b2", "bob", "carol", Some(2))).unwrap();
        create_booking(&conn, &booking("b3", "carol", "dave", Some(3))).unwrap();

        let as_customer =
            get_bookings_by(&conn, &BookingFilter::Customer("bob".to_string())).unwrap();
        let as_provider =
            get_bookings_by(&conn, &BookingFilter::Provider("bob".to_string())).unwrap();

        assert_eq!(as_customer.len(), 1);
        assert_eq!(as_customer[0].id, "b2");
        assert_eq!(as_provider.len(), 1);
        assert_eq!(as_provider[0].id, "b1");
    }

    #[test]
    fn test_update_status_requires_expected_status() {
        let conn = setup_db();
        create_booking(&conn, &booking("b1", "alice", "bob", Some(1_000))).unwrap();

        let stale = update_booking_status(
            &conn,
            "b1",
            BookingStatus::Accepted,
            BookingStatus::InProgress,
            Utc::now(),
        )
        .unwrap();
        assert!(!stale);

        let applied = update_booking_status(
            &conn,
            "b1",
            BookingStatus::Pending,
            BookingStatus::Accepted,
            Utc::now(),
        )
        .unwrap();
        assert!(applied);

        let loaded = get_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::Accepted);
    }

    #[test]
    fn test_update_status_moves_updated_at_forward_even_with_clock_skew() {
        let conn = setup_db();
        let future_ms = Utc::now().timestamp_millis() + 60_000;
        create_booking(&conn, &booking("b1", "alice", "bob", Some(future_ms))).unwrap();

        update_booking_status(
            &conn,
            "b1",
            BookingStatus::Pending,
            BookingStatus::Accepted,
            Utc::now(),
        )
        .unwrap();

        let loaded = get_booking_by_id(&conn, "b1").unwrap().unwrap();
        assert_eq!(loaded.updated_at.unwrap().timestamp_millis(), future_ms + 1);
        assert_eq!(loaded.created_at.unwrap().timestamp_millis(), future_ms);
    }

    #[test]
    fn test_update_status_missing_booking() {
        let conn = setup_db();
        let updated = update_booking_status(
            &conn,
            "nope",
            BookingStatus::Pending,
            BookingStatus::Accepted,
            Utc::now(),
        )
        .unwrap();
        assert!(!updated);
    }

    fn service(id: &str, provider: &str, title: &str, category: &str, created_ms: i64) -> ServiceListing {
        ServiceListing {
            id: id.to_string(),
            provider_id: provider.to_string(),
            title: title.to_string(),
            description: "Thorough and on time".to_string(),
            category: category.to_string(),
            daily_rate: 500.0,
            active: true,
            created_at: DateTime::from_timestamp_millis(created_ms).unwrap(),
        }
    }

    fn ids(services: &[ServiceListing]) -> Vec<&str> {
        services.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_services() {
        let conn = setup_db();
        let active = service("s1", "bob", "Window Washing", "cleaning", 1_000);
        let retired = ServiceListing {
            id: "s2".to_string(),
            active: false,
            ..active.clone()
        };
        create_service(&conn, &active).unwrap();
        create_service(&conn, &retired).unwrap();

        let listed = list_active_services(&conn, &ServiceFilter::default(), 50).unwrap();
        assert_eq!(listed, vec![active]);

        let loaded = get_service(&conn, "s2").unwrap().unwrap();
        assert!(!loaded.active);
        assert_eq!(loaded.title, "Window Washing");
        assert_eq!(loaded.category, "cleaning");
        assert_eq!(loaded.daily_rate, 500.0);
    }

    #[test]
    fn test_services_filtered() {
        let conn = setup_db();
        create_service(&conn, &service("s1", "bob", "Deep Clean", "cleaning", 1_000)).unwrap();
        create_service(&conn, &service("s2", "bob", "Garden Tidy", "gardening", 2_000)).unwrap();
        create_service(&conn, &service("s3", "carol", "Spring CLEANING", "cleaning", 3_000)).unwrap();

        let by_category = ServiceFilter::new(None, Some("cleaning".to_string()), None);
        assert_eq!(ids(&list_active_services(&conn, &by_category, 50).unwrap()), vec!["s3", "s1"]);

        let by_provider = ServiceFilter::new(Some("bob".to_string()), None, None);
        assert_eq!(ids(&list_active_services(&conn, &by_provider, 50).unwrap()), vec!["s2", "s1"]);

        // case-insensitive, and it overrides the category
        let search = ServiceFilter::new(None, Some("gardening".to_string()), Some("clean".to_string()));
        assert_eq!(ids(&list_active_services(&conn, &search, 50).unwrap()), vec!["s3", "s1"]);

        let provider_and_search =
            ServiceFilter::new(Some("carol".to_string()), None, Some("clean".to_string()));
        assert_eq!(ids(&list_active_services(&conn, &provider_and_search, 50).unwrap()), vec!["s3"]);

        assert_eq!(ids(&list_active_services(&conn, &ServiceFilter::default(), 1).unwrap()), vec!["s3"]);
    }

    #[test]
    fn test_user_tokens() {
        let conn = setup_db();
        let user = User {
            id: "u1".to_string(),
            display_name: "Alice".to_string(),
            api_token: "tok-1".to_string(),
        };
        create_user(&conn, &user).unwrap();

        assert_eq!(get_user_by_token(&conn, "tok-1").unwrap().unwrap().id, "u1");

        assert!(rotate_user_token(&conn, "u1", "tok-2").unwrap());
        assert!(get_user_by_token(&conn, "tok-1").unwrap().is_none());
        assert!(get_user_by_token(&conn, "tok-2").unwrap().is_some());
        assert!(!rotate_user_token(&conn, "ghost", "tok-3").unwrap());
    }
}
