use log::error;
use rocket::form::Form;
use rocket::http::Status;
use rocket::response::Redirect;
use rocket::response::status::Custom;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::{Build, Rocket, State};
use rocket_dyn_templates::{context, Template};
use crate::avail::{cell_state, CellState};
use crate::booking::{compute_guest_charges, Booking, BookingStore, Guest, ValidationError};
use crate::config::ClubConfig;
use crate::flow::{BookingFlow, FlowState, SelectError, Selection};
use crate::notify::{broadcast_notice, Notice, NoticeSink};
use crate::slot::SlotTime;
use crate::uplink::Uplink;
use crate::{SharedClubState, TeeSessionId};

pub const GUEST_LIMIT: usize = 3;

#[derive(Debug, FromForm)]
pub struct GuestFormValues<'v> {
    #[field(default = "")]
    name: &'v str,
    #[field(default = "")]
    cell: &'v str,
}

#[derive(Debug, FromForm)]
pub struct TeeTimeFormValues<'v> {
    #[field(default = "")]
    location: &'v str,
    #[field(default = "")]
    date: &'v str,
    /// Grid button value, `"H:MM AM|PM@Bay"`.
    #[field(default = "")]
    slot: &'v str,
    guests: Vec<GuestFormValues<'v>>,
}

/// Guest rows the member left completely empty are not guests.
fn collect_guests(values: &[GuestFormValues]) -> Vec<Guest> {
    values
        .iter()
        .filter(|g| !(g.name.is_empty() && g.cell.is_empty()))
        .take(GUEST_LIMIT)
        .map(|g| Guest { name: g.name.to_string(), cell: g.cell.to_string() })
        .collect()
}

fn apply_form_fields(flow: &mut BookingFlow, location: &str, date: &str, guests: Vec<Guest>) {
    flow.set_guests(guests);
    flow.choose_location(location);
    flow.set_date(date.parse().ok());
}

fn report_selection(outcome: &Result<Selection, SelectError>, sink: &mut dyn NoticeSink) {
    match outcome {
        Ok(selection) => sink.push(Notice::slot_chosen(selection)),
        Err(SelectError::MissingLocation) => sink.push(Notice::missing_location()),
        Err(SelectError::Conflict { conflict }) => sink.push(Notice::conflict(conflict)),
    }
}

fn report_submission(
    outcome: &Result<Booking, ValidationError>,
    extra_charge: i64,
    sink: &mut dyn NoticeSink,
) {
    match outcome {
        Ok(booking) => {
            for guest in &booking.guests {
                sink.push(Notice::waiver_sms(guest));
            }
            sink.push(Notice::booked(booking, extra_charge));
        }
        Err(err) => sink.push(Notice::invalid(err)),
    }
}

#[derive(Serialize, Debug)]
struct GridCell {
    bay: String,
    /// Grid button value posted back on selection.
    value: String,
    chosen: bool,
    blocked: bool,
}

#[derive(Serialize, Debug)]
struct GridRow {
    time: String,
    cells: Vec<GridCell>,
}

fn grid_rows(cfg: &ClubConfig, selection: Option<&Selection>) -> Vec<GridRow> {
    let selection = selection.map(|s| (s.time, s.bay.as_str()));
    SlotTime::grid()
        .map(|time| GridRow {
            time: time.to_string(),
            cells: cfg
                .bays
                .iter()
                .map(|bay| {
                    let state = cell_state(time, bay, selection, &cfg.blocked_slots);
                    GridCell {
                        bay: bay.clone(),
                        value: format!("{time}@{bay}"),
                        chosen: state == CellState::Chosen,
                        blocked: state == CellState::Blocked,
                    }
                })
                .collect(),
        })
        .collect()
}

#[get("/tee-time")]
async fn get_tee_time(
    session_id: TeeSessionId,
    state: &State<SharedClubState>,
    cfg: &State<ClubConfig>,
) -> Template {
    let (notices, flow) = {
        let mut st = state.write().await;
        let notices = st.take_notices(&session_id);
        (notices, st.flow_entry(&session_id).clone())
    };
    let rows = grid_rows(cfg, flow.selection.as_ref());

    #[derive(Serialize)]
    struct GuestRow {
        n: usize,
        index: usize,
        name: String,
        cell: String,
    }
    let mut guests = flow.guests.clone();
    guests.resize(GUEST_LIMIT, Guest::default());
    let guest_rows = guests
        .into_iter()
        .enumerate()
        .map(|(index, g)| GuestRow { n: index + 1, index, name: g.name, cell: g.cell })
        .collect::<Vec<_>>();

    #[derive(Serialize)]
    struct LocationOption {
        name: String,
        selected: bool,
    }
    let location_options = cfg
        .locations
        .iter()
        .map(|name| LocationOption {
            selected: flow.location.as_deref() == Some(name),
            name: name.clone(),
        })
        .collect::<Vec<_>>();

    let charges = compute_guest_charges(
        flow.guests.len() as u32,
        cfg.free_guest_passes_per_month,
        cfg.guest_pass_charge,
    );
    Template::render("teetime", context! {
        notices,
        location_options,
        location: &flow.location,
        date: flow.date.map(|d| d.to_string()).unwrap_or_default(),
        selection: &flow.selection,
        flow_state: flow.state(),
        ready: flow.state() == FlowState::ReadyToSubmit,
        guest_count: flow.guests.len(),
        guest_rows,
        free_used: charges.free_used,
        extra_charge: charges.total_charge,
        bays: &cfg.bays,
        rows,
    })
}

#[post("/tee-time/select", data = "<form>")]
async fn post_select(
    form: Form<TeeTimeFormValues<'_>>,
    session_id: TeeSessionId,
    state: &State<SharedClubState>,
    cfg: &State<ClubConfig>,
) -> Result<Redirect, Custom<String>> {
    // an empty slot value is the plain "apply form fields" post
    if form.slot.is_empty() {
        let mut st = state.write().await;
        let flow = st.flow_entry(&session_id);
        apply_form_fields(flow, form.location, form.date, collect_guests(&form.guests));
        return Ok(Redirect::to("/tee-time"));
    }
    let Some((time_str, bay)) = form.slot.split_once('@') else {
        return Err(Custom(Status::BadRequest, format!("Malformed slot value: {}", form.slot)));
    };
    let time = SlotTime::parse(time_str).map_err(|e| {
        error!("Slot select: {e}");
        Custom(Status::BadRequest, e.to_string())
    })?;

    let mut notices: Vec<Notice> = Vec::new();
    let mut st = state.write().await;
    let inner = &mut *st;
    let flow = inner.flows.entry(session_id.0.clone()).or_default();
    apply_form_fields(flow, form.location, form.date, collect_guests(&form.guests));
    let outcome = flow.select_slot(time, bay, inner.store.list_all(), &cfg.blocked_slots);
    report_selection(&outcome, &mut notices);
    inner.queue_notices(&session_id, notices);
    Ok(Redirect::to("/tee-time"))
}

#[post("/tee-time/book", data = "<form>")]
async fn post_book(
    form: Form<TeeTimeFormValues<'_>>,
    session_id: TeeSessionId,
    state: &State<SharedClubState>,
    cfg: &State<ClubConfig>,
    uplink: &State<Box<dyn Uplink>>,
) -> Redirect {
    // the artificial network hop happens before any state changes
    if let Err(e) = uplink.transmit().await {
        error!("Booking uplink error: {e}");
        let mut st = state.write().await;
        st.queue_notices(&session_id, vec![Notice::submit_failed()]);
        return Redirect::to("/tee-time");
    }

    let mut notices: Vec<Notice> = Vec::new();
    let mut st = state.write().await;
    let inner = &mut *st;
    let flow = inner.flows.entry(session_id.0.clone()).or_default();
    apply_form_fields(flow, form.location, form.date, collect_guests(&form.guests));
    let outcome = flow.submit(cfg, &mut inner.store);
    let extra_charge = outcome
        .as_ref()
        .map(|b| i64::from(b.guest_pass_usage.charged) * cfg.guest_pass_charge)
        .unwrap_or(0);
    report_submission(&outcome, extra_charge, &mut notices);
    inner.queue_notices(&session_id, notices);
    Redirect::to("/tee-time")
}

#[get("/tee-times")]
async fn get_tee_times(
    session_id: TeeSessionId,
    state: &State<SharedClubState>,
    cfg: &State<ClubConfig>,
) -> Template {
    #[derive(Serialize)]
    struct Row {
        booking: Booking,
        guest_count: usize,
        extra_charge: i64,
    }
    let mut st = state.write().await;
    let notices = st.take_notices(&session_id);
    let rows = st
        .store
        .list_all()
        .iter()
        .map(|b| Row {
            guest_count: b.guests.len(),
            extra_charge: i64::from(b.guest_pass_usage.charged) * cfg.guest_pass_charge,
            booking: b.clone(),
        })
        .collect::<Vec<_>>();
    Template::render("teetimes", context! {
        notices,
        rows,
    })
}

#[get("/api/bookings")]
async fn get_api_bookings(state: &State<SharedClubState>) -> Json<Vec<Booking>> {
    let st = state.read().await;
    Json(st.store.list_all().to_vec())
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostedBooking {
    pub location: String,
    pub date: String,
    pub time: String,
    pub bay: String,
    #[serde(default)]
    pub guests: Vec<Guest>,
}

/// One-shot booking for API clients: the selection check and the
/// submission run back to back against a throwaway flow.
#[post("/api/tee-time/book", data = "<posted>")]
async fn post_api_book(
    posted: Json<PostedBooking>,
    state: &State<SharedClubState>,
    cfg: &State<ClubConfig>,
    uplink: &State<Box<dyn Uplink>>,
) -> Result<Json<Booking>, Custom<String>> {
    let time = SlotTime::parse(&posted.time)
        .map_err(|e| Custom(Status::BadRequest, e.to_string()))?;
    uplink.transmit().await.map_err(|e| {
        error!("Booking uplink error: {e}");
        Custom(Status::ServiceUnavailable, "Failed to book tee time. Please try again later.".to_string())
    })?;

    let mut st = state.write().await;
    let inner = &mut *st;
    let mut flow = BookingFlow::default();
    flow.choose_location(&posted.location);
    flow.set_date(posted.date.parse().ok());
    flow.set_guests(posted.guests.clone());
    if let Err(e) = flow.select_slot(time, &posted.bay, inner.store.list_all(), &cfg.blocked_slots) {
        let status = match &e {
            SelectError::MissingLocation => Status::UnprocessableEntity,
            SelectError::Conflict { .. } => Status::Conflict,
        };
        return Err(Custom(status, e.to_string()));
    }
    let booking = flow
        .submit(cfg, &mut inner.store)
        .map_err(|e| Custom(Status::UnprocessableEntity, e.to_string()))?;
    let extra_charge = i64::from(booking.guest_pass_usage.charged) * cfg.guest_pass_charge;
    broadcast_notice(&inner.notice_sender, &Notice::booked(&booking, extra_charge));
    Ok(Json(booking))
}

#[get("/notices/sse")]
async fn notices_sse(state: &State<SharedClubState>) -> EventStream![] {
    let mut receiver = state.read().await.notice_receiver.activate_cloned();
    EventStream! {
        loop {
            let notice = match receiver.recv().await {
                Ok(notice) => notice,
                Err(async_broadcast::RecvError::Overflowed(missed)) => {
                    error!("Notice stream lagged, {missed} notices dropped");
                    continue;
                }
                Err(async_broadcast::RecvError::Closed) => break,
            };
            match serde_json::to_string(&notice) {
                Ok(json) => yield Event::data(json),
                Err(e) => error!("Cannot serialize notice: {e}"),
            }
        }
    }
}

pub fn extend(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/", routes![
        get_tee_time,
        post_select,
        post_book,
        get_tee_times,
        get_api_bookings,
        post_api_book,
        notices_sse,
    ])
}
