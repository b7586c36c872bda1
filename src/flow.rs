use std::collections::BTreeSet;
use chrono::NaiveDate;
use rocket::serde::Serialize;
use crate::avail::{find_conflict, Conflict, SlotCandidate};
use crate::booking::{submit_booking, Booking, BookingRequest, BookingStore, Guest, ValidationError};
use crate::config::ClubConfig;
use crate::slot::SlotTime;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub time: SlotTime,
    pub bay: String,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    LocationChosen,
    SlotSelected,
    ReadyToSubmit,
    Submitted,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("location must be chosen before a time slot")]
    MissingLocation,
    #[error("the slot at {} is unavailable", conflict.blocking_time)]
    Conflict { conflict: Conflict },
}

/// One member's booking-in-progress. The engine operations below drive
/// the `Idle → LocationChosen → SlotSelected → ReadyToSubmit → Submitted`
/// progression; the web layer only translates their outcomes into pages
/// and notices.
#[derive(Default, Clone, Debug)]
pub struct BookingFlow {
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub selection: Option<Selection>,
    pub guests: Vec<Guest>,
    /// Confirmation code of the booking just finalized, until the member
    /// touches the form again.
    pub submitted: Option<String>,
}

impl BookingFlow {
    pub fn state(&self) -> FlowState {
        if self.submitted.is_some() {
            return FlowState::Submitted;
        }
        match (&self.location, &self.selection) {
            (None, _) => FlowState::Idle,
            (Some(_), None) => FlowState::LocationChosen,
            (Some(_), Some(_)) => {
                if self.request().validate().is_ok() {
                    FlowState::ReadyToSubmit
                } else {
                    FlowState::SlotSelected
                }
            }
        }
    }

    /// Changing the location discards any pending slot selection. An
    /// unchanged value re-posted by the form is a no-op. The empty string
    /// means no location is chosen.
    pub fn choose_location(&mut self, location: &str) {
        let new = (!location.is_empty()).then(|| location.to_string());
        if self.location == new {
            return;
        }
        self.location = new;
        self.selection = None;
        self.submitted = None;
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        if self.date != date {
            self.submitted = None;
        }
        self.date = date;
    }

    pub fn set_guests(&mut self, guests: Vec<Guest>) {
        self.guests = guests;
    }

    /// A conflict clears the pending selection and leaves the flow in
    /// `LocationChosen`; success replaces any prior selection without
    /// asking. With no location chosen nothing is mutated.
    pub fn select_slot(
        &mut self,
        time: SlotTime,
        bay: &str,
        existing: &[Booking],
        blocked: &BTreeSet<SlotTime>,
    ) -> Result<Selection, SelectError> {
        let Some(location) = self.location.as_deref() else {
            return Err(SelectError::MissingLocation);
        };
        let candidate = SlotCandidate { date: self.date, location, bay, time };
        let conflict = find_conflict(&candidate, existing, blocked);
        self.submitted = None;
        if let Some(conflict) = conflict {
            self.selection = None;
            return Err(SelectError::Conflict { conflict });
        }
        let selection = Selection { time, bay: bay.to_string() };
        self.selection = Some(selection.clone());
        Ok(selection)
    }

    /// Finalize the booking: validate, build the record, append it to the
    /// store and reset the flow for the next booking. Validation failure
    /// leaves the flow untouched.
    pub fn submit(
        &mut self,
        cfg: &ClubConfig,
        store: &mut dyn BookingStore,
    ) -> Result<Booking, ValidationError> {
        let booking = submit_booking(self.request(), cfg, store)?;
        *self = BookingFlow {
            submitted: Some(booking.confirmation_code.clone()),
            ..Default::default()
        };
        Ok(booking)
    }

    fn request(&self) -> BookingRequest {
        BookingRequest {
            location: self.location.clone(),
            date: self.date,
            time: self.selection.as_ref().map(|s| s.time),
            bay: self.selection.as_ref().map(|s| s.bay.clone()),
            guests: self.guests.clone(),
        }
    }
}
