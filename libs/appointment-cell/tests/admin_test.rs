use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{AppointmentError, AppointmentQueryParameters, RescheduleRequest};
use appointment_cell::services::admin::AdminAppointmentService;
use assert_matches::assert_matches;
use shared_utils::test_utils::TestConfig;

const TOKEN: &str = "admin-token";

fn service_against(server: &MockServer) -> AdminAppointmentService {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    AdminAppointmentService::new(&config)
}

fn listing_row() -> serde_json::Value {
    json!({
        "id": 1,
        "doctor_id": 2,
        "patient_id": 3,
        "start_time": "2025-11-26T09:00:00",
        "duration_minutes": 30,
        "doctor": { "name": "Dr. Grey" },
        "patient": { "name": "Jane Roe", "file_no": "F-1001" }
    })
}

#[tokio::test]
async fn lists_appointments_with_joined_names_and_total() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("limit", "20"))
        .and(query_param("offset", "0"))
        .and(query_param("order", "start_time.asc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([listing_row()]))
                .insert_header("content-range", "0-0/57"),
        )
        .mount(&mock_server)
        .await;

    let service = service_against(&mock_server);
    let paged = service
        .list_appointments(AppointmentQueryParameters::default(), TOKEN)
        .await
        .unwrap();

    assert_eq!(paged.total_count, 57);
    assert_eq!(paged.page, 1);
    assert_eq!(paged.page_size, 20);
    assert_eq!(paged.items.len(), 1);

    let item = &paged.items[0];
    assert_eq!(item.doctor_name, "Dr. Grey");
    assert_eq!(item.patient_name, "Jane Roe");
    assert_eq!(item.patient_file_no, "F-1001");
    assert_eq!(item.end_time.format("%H:%M:%S").to_string(), "09:30:00");
}

#[tokio::test]
async fn clamps_page_size_and_applies_sort() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("limit", "200"))
        .and(query_param("order", "doctor(name).desc,start_time.asc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .insert_header("content-range", "*/0"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = AppointmentQueryParameters {
        page_size: Some(5000),
        sort_by: Some("doctor".to_string()),
        sort_dir: Some("desc".to_string()),
        ..Default::default()
    };

    let service = service_against(&mock_server);
    let paged = service.list_appointments(query, TOKEN).await.unwrap();

    assert_eq!(paged.page_size, 200);
    assert_eq!(paged.total_count, 0);
}

#[tokio::test]
async fn filters_by_doctor_and_date_range() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", "eq.2"))
        .and(query_param("start_time", "gte.2025-11-26T00:00:00"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([listing_row()]))
                .insert_header("content-range", "0-0/1"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = AppointmentQueryParameters {
        doctor_id: Some(2),
        from: Some("2025-11-26".to_string()),
        ..Default::default()
    };

    let service = service_against(&mock_server);
    let paged = service.list_appointments(query, TOKEN).await.unwrap();
    assert_eq!(paged.items.len(), 1);
}

#[tokio::test]
async fn cancel_deletes_after_existence_check() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 9, "doctor_id": 2, "patient_id": 3,
            "start_time": "2025-11-26T09:00:00", "duration_minutes": 30
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_against(&mock_server);
    service.cancel_appointment(9, TOKEN).await.unwrap();
}

#[tokio::test]
async fn cancel_of_missing_appointment_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_against(&mock_server);
    let err = service.cancel_appointment(9, TOKEN).await.unwrap_err();
    assert_matches!(err, AppointmentError::NotFound);
}

#[tokio::test]
async fn reschedule_into_taken_slot_is_a_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 9, "doctor_id": 2, "patient_id": 3,
            "start_time": "2025-11-26T09:00:00", "duration_minutes": 30
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/move_appointment_slot"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_string("duplicate key value violates unique constraint"),
        )
        .mount(&mock_server)
        .await;

    let request = RescheduleRequest {
        start_time: "2099-11-26T10:00:00".to_string(),
        duration_in_minutes: None,
    };

    let service = service_against(&mock_server);
    let err = service.reschedule_appointment(9, request, TOKEN).await.unwrap_err();
    assert_matches!(err, AppointmentError::ConflictDetected);
}

#[tokio::test]
async fn reschedule_rejects_past_start_times() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 9, "doctor_id": 2, "patient_id": 3,
            "start_time": "2025-11-26T09:00:00", "duration_minutes": 30
        }])))
        .mount(&mock_server)
        .await;

    let request = RescheduleRequest {
        start_time: "2000-01-01T10:00:00".to_string(),
        duration_in_minutes: None,
    };

    let service = service_against(&mock_server);
    let err = service.reschedule_appointment(9, request, TOKEN).await.unwrap_err();
    assert_matches!(
        err,
        AppointmentError::ValidationError(msg) if msg == "Selected appointment time must be in the future."
    );
}
