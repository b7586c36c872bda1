use chrono::NaiveDate;
use itertools::Itertools;
use rocket::serde::{Deserialize, Serialize};
use crate::config::ClubConfig;
use crate::slot::SlotTime;
use crate::util::generate_random_string;

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct Guest {
    pub name: String,
    pub cell: String,
}

/// Derived per booking, never stored on its own.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuestPassUsage {
    pub free: u32,
    pub charged: u32,
}

/// A finalized tee time. Immutable once created; lives as long as the
/// store it was appended to.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Booking {
    pub confirmation_code: String,
    pub date: NaiveDate,
    pub location: String,
    pub bay: String,
    pub time: SlotTime,
    pub guests: Vec<Guest>,
    pub guest_pass_usage: GuestPassUsage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuestCharges {
    pub free_used: u32,
    pub charged_count: u32,
    pub total_charge: i64,
}

/// Guest-pass accounting for a single booking. Tolerates any guest count,
/// the form surface caps it at 3.
pub fn compute_guest_charges(guest_count: u32, free_allowance: u32, per_guest_charge: i64) -> GuestCharges {
    let free_used = guest_count.min(free_allowance);
    let charged_count = guest_count.saturating_sub(free_allowance);
    GuestCharges {
        free_used,
        charged_count,
        total_charge: i64::from(charged_count) * per_guest_charge,
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid booking request, offending fields: {}", fields.iter().join(", "))]
pub struct ValidationError {
    pub fields: Vec<String>,
}

/// Field values collected by the form surface, not yet a booking.
#[derive(Default, Clone, Debug)]
pub struct BookingRequest {
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<SlotTime>,
    pub bay: Option<String>,
    pub guests: Vec<Guest>,
}

impl BookingRequest {
    /// Defensive re-validation of what the form surface should have
    /// enforced already. Every offending field is enumerated. Guest
    /// fields are only checked when guests were actually added.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut fields = Vec::new();
        if self.location.as_deref().unwrap_or("").is_empty() {
            fields.push("location".to_string());
        }
        if self.date.is_none() {
            fields.push("date".to_string());
        }
        if self.time.is_none() {
            fields.push("time".to_string());
        }
        if self.bay.as_deref().unwrap_or("").is_empty() {
            fields.push("bay".to_string());
        }
        for (n, guest) in self.guests.iter().enumerate() {
            if guest.name.is_empty() {
                fields.push(format!("guests[{n}].name"));
            }
            if guest.cell.len() < 10 {
                fields.push(format!("guests[{n}].cell"));
            }
        }
        if fields.is_empty() { Ok(()) } else { Err(ValidationError { fields }) }
    }
}

/// Session-lifetime storage for finalized bookings. A persistent backend
/// can replace [`MemoryStore`] later without touching the engine.
pub trait BookingStore: Send + Sync {
    fn append(&mut self, booking: Booking);
    /// All bookings, in insertion order.
    fn list_all(&self) -> &[Booking];
}

#[derive(Default)]
pub struct MemoryStore {
    bookings: Vec<Booking>,
}

impl BookingStore for MemoryStore {
    fn append(&mut self, booking: Booking) {
        self.bookings.push(booking);
    }
    fn list_all(&self) -> &[Booking] {
        &self.bookings
    }
}

/// Turn a validated request into an immutable [`Booking`] and append it
/// to the store. Performs no network I/O, simulated submission latency
/// is the uplink's concern.
pub fn submit_booking(
    request: BookingRequest,
    cfg: &ClubConfig,
    store: &mut dyn BookingStore,
) -> Result<Booking, ValidationError> {
    request.validate()?;
    let BookingRequest { location, date, time, bay, guests } = request;
    let (Some(location), Some(date), Some(time), Some(bay)) = (location, date, time, bay) else {
        return Err(ValidationError { fields: vec!["request".to_string()] });
    };
    let charges = compute_guest_charges(
        guests.len() as u32,
        cfg.free_guest_passes_per_month,
        cfg.guest_pass_charge,
    );
    let booking = Booking {
        confirmation_code: generate_random_string(10),
        date,
        location,
        bay,
        time,
        guests,
        guest_pass_usage: GuestPassUsage { free: charges.free_used, charged: charges.charged_count },
    };
    store.append(booking.clone());
    Ok(booking)
}
