#[macro_use] extern crate rocket;

use std::collections::HashMap;
use std::time::Duration;
use async_broadcast::{InactiveReceiver, Sender};
use rocket::fs::FileServer;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::tokio::sync::RwLock;
use rocket::{request, Build, Rocket, State};
use rocket_dyn_templates::handlebars::{Handlebars, Helper};
use rocket_dyn_templates::{context, handlebars, Template};
use crate::booking::{BookingStore, MemoryStore};
use crate::config::ClubConfig;
use crate::flow::BookingFlow;
use crate::notify::{broadcast_notice, notice_channel, Notice};
use crate::uplink::{SimulatedUplink, Uplink};
use crate::util::{datestr, generate_random_string};

#[cfg(test)]
mod tests;
mod avail;
mod booking;
mod config;
mod flow;
mod notify;
mod slot;
mod teetime;
mod uplink;
mod util;

pub const TEE_SESSION_ID: &str = "tee_session_id";

/// Anonymous member session, tagged with a private cookie on first
/// contact.
#[derive(Eq, Hash, PartialEq, Clone)]
pub struct TeeSessionId(pub String);

#[rocket::async_trait]
impl<'r> request::FromRequest<'r> for TeeSessionId {
    type Error = ();
    async fn from_request(request: &'r request::Request<'_>) -> request::Outcome<TeeSessionId, ()> {
        let cookies = request
            .guard::<&CookieJar<'_>>()
            .await
            .expect("request cookies");
        if let Some(cookie) = cookies.get_private(TEE_SESSION_ID) {
            return request::Outcome::Success(TeeSessionId(cookie.value().to_string()));
        }
        let session_id = generate_random_string(32);
        cookies.add_private(
            Cookie::build((TEE_SESSION_ID, session_id.clone()))
                .same_site(SameSite::Lax)
                .build(),
        );
        request::Outcome::Success(TeeSessionId(session_id))
    }
}

pub struct ClubState {
    /// One booking-in-progress per member session.
    flows: HashMap<String, BookingFlow>,
    /// Notices queued per session, drained into the next rendered page.
    pending_notices: HashMap<String, Vec<Notice>>,
    pub store: MemoryStore,
    pub notice_sender: Sender<Notice>,
    pub notice_receiver: InactiveReceiver<Notice>,
}

impl ClubState {
    fn new() -> Self {
        let (notice_sender, notice_receiver) = notice_channel();
        Self {
            flows: Default::default(),
            pending_notices: Default::default(),
            store: Default::default(),
            notice_sender,
            notice_receiver,
        }
    }
    pub fn flow_entry(&mut self, session_id: &TeeSessionId) -> &mut BookingFlow {
        self.flows.entry(session_id.0.clone()).or_default()
    }
    pub fn take_notices(&mut self, session_id: &TeeSessionId) -> Vec<Notice> {
        self.pending_notices.remove(&session_id.0).unwrap_or_default()
    }
    pub fn queue_notices(&mut self, session_id: &TeeSessionId, notices: Vec<Notice>) {
        for notice in &notices {
            broadcast_notice(&self.notice_sender, notice);
        }
        self.pending_notices
            .entry(session_id.0.clone())
            .or_default()
            .extend(notices);
    }
}

pub type SharedClubState = RwLock<ClubState>;

#[get("/")]
async fn index(
    session_id: TeeSessionId,
    state: &State<SharedClubState>,
    cfg: &State<ClubConfig>,
) -> Template {
    let mut st = state.write().await;
    let notices = st.take_notices(&session_id);
    let bookings = st.store.list_all();
    let last_booked = bookings
        .last()
        .map(|b| format!("{} at {} ({}, {})", b.date, b.time, b.location, b.bay));
    Template::render("index", context! {
        notices,
        booking_count: bookings.len(),
        last_booked,
        locations: &cfg.locations,
        bays: &cfg.bays,
    })
}

fn build_rocket(uplink_override: Option<Box<dyn Uplink>>) -> Rocket<Build> {
    let rocket = rocket::build()
        .attach(Template::custom(|engines| {
            let handlebars = &mut engines.handlebars;

            handlebars.register_helper("datestr",
                                       Box::new(|h: &Helper, _r: &Handlebars, _: &handlebars::Context, _rc: &mut handlebars::RenderContext, out: &mut dyn handlebars::Output| -> handlebars::HelperResult {
                                           let val = h.param(0).ok_or(handlebars::RenderErrorReason::ParamNotFoundForIndex("datestr", 0))?.value();
                                           let s = datestr(val.as_str());
                                           out.write(&s)?;
                                           Ok(())
                                       }));
        }))
        .mount("/", FileServer::from("./static"))
        .mount("/", routes![
            index,
        ]);
    let rocket = teetime::extend(rocket);

    let figment = rocket.figment().clone();
    let club_cfg = ClubConfig::load(&figment);
    let delay = if cfg!(test) {
        Duration::ZERO
    } else {
        Duration::from_millis(club_cfg.submit_delay_ms)
    };
    let uplink = uplink_override.unwrap_or_else(|| Box::new(SimulatedUplink { delay }));

    rocket
        .manage(club_cfg)
        .manage(uplink)
        .manage(SharedClubState::new(ClubState::new()))
}

#[launch]
fn rocket() -> _ {
    build_rocket(None)
}
