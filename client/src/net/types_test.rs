use super::*;
use serde_json::json;
use time::macros::datetime;

// =============================================================================
// Role
// =============================================================================

#[test]
fn role_parses_known_values() {
    let user: User = serde_json::from_value(json!({ "id": 1, "username": "a", "role": "root" })).unwrap();
    assert_eq!(user.role, Role::Root);
    assert!(user.is_root());
}

#[test]
fn role_unknown_value_is_preserved_and_not_root() {
    let user: User = serde_json::from_value(json!({ "id": 2, "username": "b", "role": "admin" })).unwrap();
    assert_eq!(user.role, Role::Other("admin".to_owned()));
    assert!(!user.is_root());
    assert_eq!(serde_json::to_value(&user).unwrap()["role"], "admin");
}

#[test]
fn role_defaults_to_user_when_missing() {
    let user: User = serde_json::from_value(json!({ "id": 3, "username": "c" })).unwrap();
    assert_eq!(user.role, Role::User);
}

#[test]
fn role_display_matches_wire_value() {
    assert_eq!(Role::Root.to_string(), "root");
    assert_eq!(Role::User.to_string(), "user");
}

// =============================================================================
// Auth payloads
// =============================================================================

#[test]
fn credentials_debug_redacts_password() {
    let creds = Credentials::new("alice", "hunter2");
    let rendered = format!("{creds:?}");
    assert!(rendered.contains("alice"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn registration_omits_missing_email() {
    let reg = Registration { username: "n".into(), password: "p".into(), email: None };
    assert_eq!(serde_json::to_value(&reg).unwrap(), json!({ "username": "n", "password": "p" }));
}

#[test]
fn auth_response_decodes_login_payload() {
    let resp: AuthResponse = serde_json::from_value(json!({
        "token": "T",
        "user": { "id": 1, "username": "u", "role": "user" }
    }))
    .unwrap();
    assert_eq!(resp.token, "T");
    assert_eq!(resp.user.username, "u");
}

#[test]
fn password_change_uses_snake_case_fields() {
    let body = PasswordChange { current_password: "old".into(), new_password: "new".into() };
    assert_eq!(
        serde_json::to_value(&body).unwrap(),
        json!({ "current_password": "old", "new_password": "new" })
    );
}

#[test]
fn user_update_serializes_only_set_fields() {
    let update = UserUpdate { role: Some(Role::Root), ..UserUpdate::default() };
    assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "role": "root" }));
}

// =============================================================================
// Servers
// =============================================================================

#[test]
fn server_decodes_minimal_record() {
    let server: Server = serde_json::from_value(json!({ "id": 7, "name": "db-01", "status": "reserved" })).unwrap();
    assert_eq!(server.status, ServerStatus::Reserved);
    assert!(server.ip_address.is_none());
    assert!(server.created_at.is_none());
}

#[test]
fn server_unknown_status_maps_to_unknown() {
    let server: Server = serde_json::from_value(json!({ "id": 7, "name": "db-01", "status": "retired" })).unwrap();
    assert_eq!(server.status, ServerStatus::Unknown);
}

#[test]
fn server_decodes_timestamps() {
    let server: Server = serde_json::from_value(json!({
        "id": 1,
        "name": "web",
        "status": "available",
        "created_at": "2024-03-01T09:30:00Z",
        "updated_at": "2024-03-01T09:30:00.123456789Z"
    }))
    .unwrap();
    assert_eq!(server.created_at, Some(datetime!(2024-03-01 09:30:00 UTC)));
    assert!(server.updated_at.is_some());
}

#[test]
fn server_input_skips_unset_optionals() {
    let input = ServerInput { name: "web".into(), ip_address: Some("10.0.0.5".into()), ..ServerInput::default() };
    assert_eq!(serde_json::to_value(&input).unwrap(), json!({ "name": "web", "ip_address": "10.0.0.5" }));
}

// =============================================================================
// Reservations
// =============================================================================

fn reservation(start: OffsetDateTime, end: OffsetDateTime) -> Reservation {
    Reservation {
        id: 1,
        server_id: 2,
        user_id: 3,
        start_time: start,
        end_time: end,
        status: ReservationStatus::Active,
        server_name: None,
        username: None,
        server_username: None,
        server_password: None,
        server_ip: None,
        created_at: None,
        updated_at: None,
    }
}

#[test]
fn reservation_decodes_joined_fields() {
    let r: Reservation = serde_json::from_value(json!({
        "id": 10,
        "server_id": 2,
        "user_id": 5,
        "start_time": "2024-05-01T10:00:00Z",
        "end_time": "2024-05-01T12:00:00+02:00",
        "status": "cancelled",
        "server_name": "gpu-1",
        "username": "alice",
        "server_ip": "10.1.1.1"
    }))
    .unwrap();
    assert_eq!(r.status, ReservationStatus::Cancelled);
    assert_eq!(r.server_name.as_deref(), Some("gpu-1"));
    assert_eq!(r.end_time, datetime!(2024-05-01 10:00:00 UTC));
}

#[test]
fn reservation_overlap_is_half_open() {
    let r = reservation(datetime!(2024-05-01 10:00 UTC), datetime!(2024-05-01 12:00 UTC));
    assert!(r.overlaps(datetime!(2024-05-01 11:00 UTC), datetime!(2024-05-01 13:00 UTC)));
    assert!(!r.overlaps(datetime!(2024-05-01 12:00 UTC), datetime!(2024-05-01 13:00 UTC)));
    assert!(!r.overlaps(datetime!(2024-05-01 08:00 UTC), datetime!(2024-05-01 10:00 UTC)));
}

#[test]
fn reservation_input_serializes_rfc3339() {
    let input = ReservationInput {
        server_id: 4,
        start_time: datetime!(2024-05-01 10:00 UTC),
        end_time: datetime!(2024-05-01 11:00 UTC),
    };
    assert_eq!(
        serde_json::to_value(&input).unwrap(),
        json!({ "server_id": 4, "start_time": "2024-05-01T10:00:00Z", "end_time": "2024-05-01T11:00:00Z" })
    );
}
