use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use crate::booking::{Booking, Guest, GuestPassUsage};
use crate::teetime::PostedBooking;
use crate::uplink::Uplink;

fn create_test_client() -> Client {
    Client::tracked(super::build_rocket(None)).unwrap()
}

fn posted(time: &str, bay: &str) -> PostedBooking {
    PostedBooking {
        location: "Location 1".to_string(),
        date: "2024-06-01".to_string(),
        time: time.to_string(),
        bay: bay.to_string(),
        guests: vec![],
    }
}

#[test]
fn pages_render() {
    let client = create_test_client();

    let resp = client.get("/").dispatch();
    assert_eq!(resp.status(), Status::Ok);

    let resp = client.get("/tee-time").dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body = resp.into_string().unwrap();
    // full grid with every bay
    assert!(body.contains("12:00 AM"));
    assert!(body.contains("11:30 PM"));
    assert!(body.contains("Bay 3"));

    let resp = client.get("/tee-times").dispatch();
    assert_eq!(resp.status(), Status::Ok);
}

#[test]
fn select_without_location_is_rejected() {
    let client = create_test_client();
    let resp = client.post("/tee-time/select")
        .header(ContentType::Form)
        .body("location=&date=&slot=9%3A00+AM%40Bay+1")
        .dispatch();
    assert_eq!(resp.status(), Status::SeeOther);

    // the queued notice lands on the next page view, exactly once
    let body = client.get("/tee-time").dispatch().into_string().unwrap();
    assert!(body.contains("Please select a location first"));
    let body = client.get("/tee-time").dispatch().into_string().unwrap();
    assert!(!body.contains("Please select a location first"));
}

#[test]
fn blocked_successor_slot_rejects_selection() {
    let client = create_test_client();
    // 9:30 AM is on the stock blocked schedule, so 9:00 AM cannot be taken
    let resp = client.post("/tee-time/select")
        .header(ContentType::Form)
        .body("location=Location+1&date=2024-06-01&slot=9%3A00+AM%40Bay+1")
        .dispatch();
    assert_eq!(resp.status(), Status::SeeOther);

    let body = client.get("/tee-time").dispatch().into_string().unwrap();
    assert!(body.contains("Time slot conflict"));
    assert!(body.contains("The slot at 9:30 AM is unavailable."));
}

#[test]
fn full_booking_flow() {
    let client = create_test_client();

    let resp = client.post("/tee-time/select")
        .header(ContentType::Form)
        .body("location=Location+1&date=2024-06-01&slot=8%3A00+AM%40Bay+2")
        .dispatch();
    assert_eq!(resp.status(), Status::SeeOther);

    let body = client.get("/tee-time").dispatch().into_string().unwrap();
    assert!(body.contains("Time slot chosen"));
    assert!(body.contains("You have selected 8:00 AM at Bay 2."));

    // confirm with three guests, one above the free allowance
    let resp = client.post("/tee-time/book")
        .header(ContentType::Form)
        .body("location=Location+1&date=2024-06-01\
               &guests%5B0%5D.name=Alice&guests%5B0%5D.cell=5551234567\
               &guests%5B1%5D.name=Bob&guests%5B1%5D.cell=5559876543\
               &guests%5B2%5D.name=Carol&guests%5B2%5D.cell=5550001111")
        .dispatch();
    assert_eq!(resp.status(), Status::SeeOther);

    let body = client.get("/tee-time").dispatch().into_string().unwrap();
    assert!(body.contains("Tee time booked!"));
    assert!(body.contains("with 3 guest(s)"));
    assert!(body.contains("(Extra charge: $10)"));
    assert!(body.contains("A link to sign the waiver was sent to Alice (5551234567)"));

    let resp = client.get("/api/bookings").dispatch();
    assert_eq!(resp.status(), Status::Ok);
    assert_eq!(resp.content_type(), Some(ContentType::JSON));
    let bookings = resp.into_json::<Vec<Booking>>().unwrap();
    assert_eq!(bookings.len(), 1);
    let booking = &bookings[0];
    assert_eq!(booking.location, "Location 1");
    assert_eq!(booking.bay, "Bay 2");
    assert_eq!(booking.time.to_string(), "8:00 AM");
    assert_eq!(booking.guests.len(), 3);
    assert_eq!(booking.guest_pass_usage, GuestPassUsage { free: 2, charged: 1 });

    let body = client.get("/tee-times").dispatch().into_string().unwrap();
    assert!(body.contains(&booking.confirmation_code));
    assert!(body.contains("8:00 AM"));
}

#[test]
fn incomplete_booking_reports_the_fields() {
    let client = create_test_client();
    let resp = client.post("/tee-time/book")
        .header(ContentType::Form)
        .body("location=Location+1&date=")
        .dispatch();
    assert_eq!(resp.status(), Status::SeeOther);

    let body = client.get("/tee-time").dispatch().into_string().unwrap();
    assert!(body.contains("Booking incomplete"));
    assert!(body.contains("Missing or invalid: date, time, bay"));

    let bookings = client.get("/api/bookings").dispatch()
        .into_json::<Vec<Booking>>().unwrap();
    assert!(bookings.is_empty());
}

#[test]
fn api_booking_and_conflicts() {
    let client = create_test_client();

    let resp = client.post("/api/tee-time/book").json(&posted("10:30 AM", "Bay 1")).dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let booking = resp.into_json::<Booking>().unwrap();
    assert_eq!(booking.time.to_string(), "10:30 AM");
    assert_eq!(booking.guest_pass_usage, GuestPassUsage { free: 0, charged: 0 });

    // the same cell again
    let resp = client.post("/api/tee-time/book").json(&posted("10:30 AM", "Bay 1")).dispatch();
    assert_eq!(resp.status(), Status::Conflict);
    assert!(resp.into_string().unwrap().contains("10:30 AM"));

    // the preceding slot runs into the same booking
    let resp = client.post("/api/tee-time/book").json(&posted("10:00 AM", "Bay 1")).dispatch();
    assert_eq!(resp.status(), Status::Conflict);

    // a different bay at the same time is free
    let resp = client.post("/api/tee-time/book").json(&posted("10:30 AM", "Bay 2")).dispatch();
    assert_eq!(resp.status(), Status::Ok);
}

#[test]
fn api_booking_validates_guests() {
    let client = create_test_client();
    let mut bad = posted("3:00 PM", "Bay 1");
    bad.guests = vec![Guest { name: "".to_string(), cell: "5551234567".to_string() }];
    let resp = client.post("/api/tee-time/book").json(&bad).dispatch();
    assert_eq!(resp.status(), Status::UnprocessableEntity);
    assert!(resp.into_string().unwrap().contains("guests[0].name"));

    let mut missing = posted("3:00 PM", "Bay 1");
    missing.location = "".to_string();
    let resp = client.post("/api/tee-time/book").json(&missing).dispatch();
    assert_eq!(resp.status(), Status::UnprocessableEntity);
}

#[test]
fn api_rejects_malformed_time() {
    let client = create_test_client();
    let resp = client.post("/api/tee-time/book").json(&posted("25:00", "Bay 1")).dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
}

struct FailingUplink;

#[rocket::async_trait]
impl Uplink for FailingUplink {
    async fn transmit(&self) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("uplink down"))
    }
}

#[test]
fn submission_failure_stays_generic() {
    let client = Client::tracked(super::build_rocket(Some(Box::new(FailingUplink)))).unwrap();

    let resp = client.post("/api/tee-time/book").json(&posted("8:00 AM", "Bay 1")).dispatch();
    assert_eq!(resp.status(), Status::ServiceUnavailable);
    assert!(resp.into_string().unwrap().contains("Please try again later."));

    let resp = client.post("/tee-time/book")
        .header(ContentType::Form)
        .body("location=Location+1&date=2024-06-01")
        .dispatch();
    assert_eq!(resp.status(), Status::SeeOther);
    let body = client.get("/tee-time").dispatch().into_string().unwrap();
    assert!(body.contains("Failed to book tee time"));

    let bookings = client.get("/api/bookings").dispatch()
        .into_json::<Vec<Booking>>().unwrap();
    assert!(bookings.is_empty());
}
