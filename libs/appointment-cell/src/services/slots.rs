// libs/appointment-cell/src/services/slots.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::{BookedSlot, SlotAvailability, SlotWindow, SLOT_MINUTES};

/// First and last bookable slot start of the day, UTC.
pub const DAY_OPENS: (u32, u32) = (9, 0);
pub const DAY_LAST_SLOT: (u32, u32) = (21, 0);

pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}

fn at(date: NaiveDate, (hour, minute): (u32, u32)) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(time))
}

/// Slot starts 09:00, 09:30, ... 21:00.
pub fn daily_grid(date: NaiveDate) -> Vec<DateTime<Utc>> {
    let first = at(date, DAY_OPENS);
    let last = at(date, DAY_LAST_SLOT);

    let mut slots = Vec::new();
    let mut current = first;
    while current <= last {
        slots.push(current);
        current += Duration::minutes(SLOT_MINUTES);
    }
    slots
}

/// Marks each grid slot taken when an upcoming booking overlaps it.
pub fn grid_availability(date: NaiveDate, booked: &[BookedSlot]) -> Vec<SlotAvailability> {
    daily_grid(date)
        .into_iter()
        .map(|start| {
            let window = SlotWindow::starting_at(start);
            let taken = booked
                .iter()
                .any(|b| b.slot().overlaps(&window));
            SlotAvailability {
                time: start.format("%H:%M").to_string(),
                start_time: start,
                available: !taken,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn booked_at(h: u32, m: u32) -> BookedSlot {
        BookedSlot {
            appointment_type_id: 1,
            start_time: at(date(), (h, m)),
        }
    }

    #[test]
    fn grid_covers_opening_hours() {
        let grid = daily_grid(date());
        assert_eq!(grid.len(), 25);
        assert_eq!(grid[0].format("%H:%M").to_string(), "09:00");
        assert_eq!(grid[24].format("%H:%M").to_string(), "21:00");
    }

    #[test]
    fn booked_slot_is_unavailable_and_neighbours_free() {
        let slots = grid_availability(date(), &[booked_at(9, 0)]);
        assert!(!slots[0].available);
        assert!(slots[1].available);
    }

    #[test]
    fn off_grid_booking_blocks_two_slots() {
        let slots = grid_availability(date(), &[booked_at(9, 15)]);
        assert!(!slots[0].available);
        assert!(!slots[1].available);
        assert!(slots[2].available);
    }

    #[test]
    fn empty_day_is_open() {
        let slots = grid_availability(date(), &[]);
        assert!(slots.iter().all(|s| s.available));
    }
}
