use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::BookingRequest;
use appointment_cell::services::booking::BookingService;
use patient_cell::models::PatientHints;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::{MockClinicRows, TestConfig};

const OVERLAP_MESSAGE: &str =
    "Requested time overlaps an existing appointment. Please choose another slot.";

fn frozen_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn service_against(server: &MockServer) -> BookingService {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    BookingService::with_clock(&config, Arc::new(FixedClock(frozen_now())))
}

fn request() -> BookingRequest {
    BookingRequest {
        doctor_id: 1,
        start_time: "2025-11-26T09:00:00".to_string(),
        duration_in_minutes: 30,
        patient: PatientHints {
            name: "Jane Roe".to_string(),
            phone: "05321112233".to_string(),
            file_no: Some("F-1001".to_string()),
            address: "12 Elm St".to_string(),
            date_of_birth: "1990-01-01".to_string(),
            gender: "F".to_string(),
        },
    }
}

async fn mount_doctor(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockClinicRows::doctor_row(1, "Dr. Grey", "Cardiology")
        ])))
        .mount(server)
        .await;
}

async fn mount_existing_patient(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("file_no", "eq.F-1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockClinicRows::patient_row(3, "F-1001", "Jane Roe", "05321112233")
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn books_a_free_slot() {
    let mock_server = MockServer::start().await;
    mount_doctor(&mock_server).await;
    mount_existing_patient(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_slot"))
        .and(body_partial_json(json!({
            "p_doctor_id": 1,
            "p_patient_id": 3,
            "p_start_time": "2025-11-26T09:00:00",
            "p_duration_minutes": 30
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(501)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_against(&mock_server);
    let result = service.book(&request(), None).await.unwrap();

    assert!(result.success);
    assert_eq!(result.message, "Appointment booked");
    assert_eq!(result.appointment_id, Some(501));
}

#[tokio::test]
async fn rejects_overlapping_slot_before_reserving() {
    let mock_server = MockServer::start().await;
    mount_doctor(&mock_server).await;
    mount_existing_patient(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 77 }])))
        .mount(&mock_server)
        .await;

    // No reserve call may go out once the probe sees an overlap.
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_slot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(999)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_against(&mock_server);
    let result = service.book(&request(), None).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.message, OVERLAP_MESSAGE);
    assert_eq!(result.appointment_id, None);
}

#[tokio::test]
async fn rejects_unknown_doctor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_against(&mock_server);
    let result = service.book(&request(), None).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.message, "Doctor not found.");
}

#[tokio::test]
async fn blank_patient_field_wins_over_unknown_doctor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let mut req = request();
    req.patient.gender = String::new();

    let service = service_against(&mock_server);
    let result = service.book(&req, None).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.message, "Patient gender is required.");
}

#[tokio::test]
async fn surfaces_patient_validation_as_rejection() {
    let mock_server = MockServer::start().await;
    mount_doctor(&mock_server).await;

    let mut req = request();
    req.patient.address = String::new();

    let service = service_against(&mock_server);
    let result = service.book(&req, None).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.message, "Patient address is required.");
}

#[tokio::test]
async fn concurrent_bookings_for_the_same_slot_yield_one_winner() {
    let mock_server = MockServer::start().await;
    mount_doctor(&mock_server).await;
    mount_existing_patient(&mock_server).await;

    // Both racers pass the advisory probe; the database function admits
    // exactly one insert and answers the loser with a conflict.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_slot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(601)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_slot"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_string("duplicate key value violates unique constraint"),
        )
        .mount(&mock_server)
        .await;

    let service = service_against(&mock_server);
    let req = request();

    let (first, second) = tokio::join!(service.book(&req, None), service.book(&req, None));
    let first = first.unwrap();
    let second = second.unwrap();

    let winners = [&first, &second].iter().filter(|r| r.success).count();
    assert_eq!(winners, 1);

    let loser = if first.success { &second } else { &first };
    assert_eq!(loser.message, OVERLAP_MESSAGE);
    assert_eq!(loser.appointment_id, None);
}
