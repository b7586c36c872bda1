use std::fmt::{Display, Formatter};

pub const SLOT_MINUTES: u16 = 30;
pub const DAY_MINUTES: u16 = 24 * 60;

/// One tick of the daily booking grid, stored as minutes since midnight.
///
/// The grid itself is half-hour granular (48 ticks per day), the 12-hour
/// `"H:MM AM|PM"` display form is a pure projection of the stored value.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct SlotTime(u16);

/// Malformed time display string. This is a caller bug, not user input
/// gone wrong: the web layer only ever submits values it rendered itself.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid time display string: {0:?}")]
pub struct FormatError(pub String);

impl SlotTime {
    /// Parse a `"H:MM AM|PM"` display string. 12 AM maps to hour 0,
    /// 12 PM stays 12, other PM hours add 12.
    pub fn parse(display: &str) -> Result<Self, FormatError> {
        let err = || FormatError(display.to_string());
        let (hour_minute, period) = display.split_once(' ').ok_or_else(err)?;
        let (hour_str, minute_str) = hour_minute.split_once(':').ok_or_else(err)?;
        if minute_str.len() != 2 {
            return Err(err());
        }
        let hour = hour_str.parse::<u16>().map_err(|_| err())?;
        let minute = minute_str.parse::<u16>().map_err(|_| err())?;
        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(err());
        }
        let hour = match period {
            "AM" => if hour == 12 { 0 } else { hour },
            "PM" => if hour == 12 { 12 } else { hour + 12 },
            _ => return Err(err()),
        };
        Ok(SlotTime(hour * 60 + minute))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    /// The immediately following slot, wrapping at midnight.
    pub fn next(&self) -> SlotTime {
        SlotTime((self.0 + SLOT_MINUTES) % DAY_MINUTES)
    }

    /// All 48 ticks of the daily grid in ascending order.
    pub fn grid() -> impl Iterator<Item = SlotTime> {
        (0..DAY_MINUTES / SLOT_MINUTES).map(|n| SlotTime(n * SLOT_MINUTES))
    }
}

impl Display for SlotTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hour = self.0 / 60;
        let minute = self.0 % 60;
        let period = if hour >= 12 { "PM" } else { "AM" };
        let display_hour = if hour > 12 { hour - 12 } else if hour == 0 { 12 } else { hour };
        write!(f, "{display_hour}:{minute:02} {period}")
    }
}

// Slot times travel through JSON, templates and config files in their
// display form, same as the booking sheet shows them.
impl serde::Serialize for SlotTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> serde::Deserialize<'de> for SlotTime {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        SlotTime::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_grid_round_trip() {
    let mut count = 0;
    for slot in SlotTime::grid() {
        assert_eq!(SlotTime::parse(&slot.to_string()), Ok(slot));
        assert_eq!(slot.minutes() % SLOT_MINUTES, 0);
        count += 1;
    }
    assert_eq!(count, 48);
}

#[test]
fn test_parse() {
    assert_eq!(SlotTime::parse("12:00 AM").unwrap().minutes(), 0);
    assert_eq!(SlotTime::parse("12:30 PM").unwrap().minutes(), 12 * 60 + 30);
    assert_eq!(SlotTime::parse("1:00 PM").unwrap().minutes(), 13 * 60);
    assert_eq!(SlotTime::parse("11:30 PM").unwrap().minutes(), 23 * 60 + 30);
    // well-formed minutes off the half-hour grid still parse, the grid
    // itself only ever produces the 48 aligned values
    assert_eq!(SlotTime::parse("9:15 AM").unwrap().minutes(), 9 * 60 + 15);
    for bad in ["", "10:00", "10:00AM", "10:0 AM", "13:00 PM", "0:30 AM", "9:61 AM", "ten AM", "10:00 XM"] {
        assert!(SlotTime::parse(bad).is_err(), "{bad:?} should not parse");
    }
}

#[test]
fn test_next_wraps_at_midnight() {
    assert_eq!(SlotTime::parse("9:00 AM").unwrap().next().to_string(), "9:30 AM");
    assert_eq!(SlotTime::parse("11:30 AM").unwrap().next().to_string(), "12:00 PM");
    assert_eq!(SlotTime::parse("11:30 PM").unwrap().next().to_string(), "12:00 AM");
}
