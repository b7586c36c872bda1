use async_broadcast::{InactiveReceiver, Sender, TrySendError};
use itertools::Itertools;
use log::warn;
use rocket::serde::{Deserialize, Serialize};
use crate::avail::Conflict;
use crate::booking::{Booking, Guest, ValidationError};
use crate::flow::Selection;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// Advisory message for the member: a title/description pair plus a
/// severity used for styling. How it reaches the member (page flash,
/// SSE stream) is the sink's business.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn missing_location() -> Notice {
        Notice {
            kind: NoticeKind::Error,
            title: "Please select a location first".to_string(),
            description: String::new(),
        }
    }

    pub fn conflict(conflict: &Conflict) -> Notice {
        Notice {
            kind: NoticeKind::Error,
            title: "Time slot conflict".to_string(),
            description: format!("The slot at {} is unavailable.", conflict.blocking_time),
        }
    }

    pub fn slot_chosen(selection: &Selection) -> Notice {
        Notice {
            kind: NoticeKind::Info,
            title: "Time slot chosen".to_string(),
            description: format!(
                "You have selected {} at {}. Proceed to review.",
                selection.time, selection.bay
            ),
        }
    }

    pub fn waiver_sms(guest: &Guest) -> Notice {
        Notice {
            kind: NoticeKind::Info,
            title: "SMS sent to guest".to_string(),
            description: format!(
                "A link to sign the waiver was sent to {} ({})",
                guest.name, guest.cell
            ),
        }
    }

    pub fn booked(booking: &Booking, extra_charge: i64) -> Notice {
        let guests = if booking.guests.is_empty() {
            String::new()
        } else {
            format!(" with {} guest(s)", booking.guests.len())
        };
        let charge = if extra_charge > 0 {
            format!(" (Extra charge: ${extra_charge})")
        } else {
            String::new()
        };
        Notice {
            kind: NoticeKind::Success,
            title: "Tee time booked!".to_string(),
            description: format!(
                "Booked at {} ({}) on {} at {}{guests}{charge}",
                booking.location, booking.bay, booking.date, booking.time
            ),
        }
    }

    pub fn invalid(err: &ValidationError) -> Notice {
        Notice {
            kind: NoticeKind::Error,
            title: "Booking incomplete".to_string(),
            description: format!("Missing or invalid: {}", err.fields.iter().join(", ")),
        }
    }

    /// The deliberately generic submission failure.
    pub fn submit_failed() -> Notice {
        Notice {
            kind: NoticeKind::Error,
            title: "Failed to book tee time".to_string(),
            description: "Please try again later.".to_string(),
        }
    }
}

/// Receives advisory messages. The per-request queue is a plain
/// `Vec<Notice>` drained into the next rendered page.
pub trait NoticeSink {
    fn push(&mut self, notice: Notice);
}

impl NoticeSink for Vec<Notice> {
    fn push(&mut self, notice: Notice) {
        Vec::push(self, notice);
    }
}

/// Broadcast channel feeding the live notice stream. The inactive
/// receiver keeps the channel open while nobody is listening; SSE
/// handlers activate a clone of it.
pub fn notice_channel() -> (Sender<Notice>, InactiveReceiver<Notice>) {
    let (mut sender, receiver) = async_broadcast::broadcast(16);
    sender.set_overflow(true);
    (sender, receiver.deactivate())
}

pub fn broadcast_notice(sender: &Sender<Notice>, notice: &Notice) {
    match sender.try_broadcast(notice.clone()) {
        Ok(_) => {}
        Err(TrySendError::Inactive(_)) => {}
        Err(e) => warn!("Cannot broadcast notice: {e}"),
    }
}
