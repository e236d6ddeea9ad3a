//! Ballot slot scheduler.
//!
//! One deterministic pass over the paid registrants, in first-deposit order:
//!
//! ```text
//! start[i] = ballot + i × (slot + buffer)
//! end[i]   = start[i] + slot
//! ```
//!
//! Earlier depositors get earlier windows. Windows never overlap.

use crate::error::TicketingError;
use crate::types::{AccountId, PurchaseSlot, SlotAssignment};
use chrono::{DateTime, TimeDelta, Utc};

/// Assign a purchase window to every paid registrant
///
/// # Errors
///
/// - [`TicketingError::ZeroSlotDuration`] if `slot_duration_secs` is zero
/// - [`TicketingError::ArithmeticOverflow`] if a window would fall outside
///   the representable time range
pub fn allocate_slots(
    paid: &[AccountId],
    ballot_instant: DateTime<Utc>,
    slot_duration_secs: u64,
    buffer_secs: u64,
) -> Result<Vec<SlotAssignment>, TicketingError> {
    if slot_duration_secs == 0 {
        return Err(TicketingError::ZeroSlotDuration);
    }

    let stride = slot_duration_secs
        .checked_add(buffer_secs)
        .ok_or(TicketingError::ArithmeticOverflow)?;
    let slot = seconds(slot_duration_secs)?;

    paid.iter()
        .enumerate()
        .map(|(position, buyer)| {
            let offset = u64::try_from(position)
                .ok()
                .and_then(|i| i.checked_mul(stride))
                .ok_or(TicketingError::ArithmeticOverflow)?;
            let start = ballot_instant
                .checked_add_signed(seconds(offset)?)
                .ok_or(TicketingError::ArithmeticOverflow)?;
            let end = start
                .checked_add_signed(slot)
                .ok_or(TicketingError::ArithmeticOverflow)?;

            Ok(SlotAssignment {
                buyer: *buyer,
                slot: PurchaseSlot { start, end },
            })
        })
        .collect()
}

fn seconds(secs: u64) -> Result<TimeDelta, TicketingError> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or(TicketingError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairsale_testing::epoch;
    use proptest::prelude::*;

    #[test]
    fn test_fifo_windows() {
        let (a, b, c) = (AccountId::new(), AccountId::new(), AccountId::new());
        let schedule = allocate_slots(&[a, b, c], epoch(), 3600, 1800).unwrap();

        assert_eq!(
            schedule.iter().map(|s| s.buyer).collect::<Vec<_>>(),
            vec![a, b, c]
        );
        assert_eq!(schedule[0].slot.start, epoch());
        assert_eq!(schedule[0].slot.end, epoch() + TimeDelta::seconds(3600));
        assert_eq!(schedule[1].slot.start, epoch() + TimeDelta::seconds(5400));
        assert_eq!(schedule[2].slot.start, epoch() + TimeDelta::seconds(10_800));
    }

    #[test]
    fn test_empty_ballot() {
        assert_eq!(allocate_slots(&[], epoch(), 60, 0), Ok(Vec::new()));
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        assert_eq!(
            allocate_slots(&[AccountId::new()], epoch(), 0, 60),
            Err(TicketingError::ZeroSlotDuration)
        );
    }

    #[test]
    fn test_overflow_is_rejected() {
        let paid = [AccountId::new(), AccountId::new()];
        assert_eq!(
            allocate_slots(&paid, epoch(), u64::MAX, 1),
            Err(TicketingError::ArithmeticOverflow)
        );
    }

    proptest! {
        #[test]
        fn prop_windows_are_disjoint_and_sized(
            registrants in 1_usize..40,
            slot in 1_u64..100_000,
            buffer in 0_u64..100_000,
        ) {
            let paid: Vec<AccountId> = (0..registrants).map(|_| AccountId::new()).collect();
            let schedule = allocate_slots(&paid, epoch(), slot, buffer).unwrap();

            prop_assert_eq!(schedule.len(), paid.len());
            for window in schedule.windows(2) {
                prop_assert!(window[0].slot.end <= window[1].slot.start);
                prop_assert!(window[0].slot.start < window[1].slot.start);
            }
            for assignment in &schedule {
                let length = assignment.slot.end - assignment.slot.start;
                prop_assert_eq!(length.num_seconds(), i64::try_from(slot).unwrap());
            }
        }
    }
}
