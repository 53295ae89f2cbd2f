//! Published wrist status.
//!
//! Each field is a single atomic so readers always observe a whole value
//! written by one task, never a torn one. The sensor task owns the magnitude
//! and the alert task owns every other field.

use alert_core::delivery::{DeliveryReceipt, DeliveryRoute};
use alert_core::link::LinkStatus;
use alert_core::orchestrator::AlertState;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

const LINK_PAIRED: u8 = 0b01;
const LINK_REACHABLE: u8 = 0b10;

/// Latest user-acceleration magnitude as `f32` bits.
static MAGNITUDE_BITS: AtomicU32 = AtomicU32::new(0);
static ALERT_STATE: AtomicU8 = AtomicU8::new(0);
static CONTACT_MISSING: AtomicBool = AtomicBool::new(false);
static RETRY_AVAILABLE: AtomicBool = AtomicBool::new(false);
static LINK_FLAGS: AtomicU8 = AtomicU8::new(0);
static DELIVERED_DIRECT: AtomicU32 = AtomicU32::new(0);
static DELIVERED_QUEUED: AtomicU32 = AtomicU32::new(0);
static DELIVERY_FAILED: AtomicU32 = AtomicU32::new(0);

/// Point-in-time copy of every published field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StatusSnapshot {
    pub magnitude: f32,
    pub state: AlertState,
    pub contact_missing: bool,
    pub retry_available: bool,
    pub link: LinkStatus,
    pub delivered_direct: u32,
    pub delivered_queued: u32,
    pub delivery_failed: u32,
}

#[allow(clippy::cast_possible_truncation)]
pub fn record_magnitude(magnitude: f64) {
    MAGNITUDE_BITS.store((magnitude as f32).to_bits(), Ordering::Relaxed);
}

pub fn record_state(state: AlertState, contact_missing: bool, retry_available: bool) {
    ALERT_STATE.store(state.code(), Ordering::Relaxed);
    CONTACT_MISSING.store(contact_missing, Ordering::Relaxed);
    RETRY_AVAILABLE.store(retry_available, Ordering::Relaxed);
}

pub fn record_link(status: LinkStatus) {
    LINK_FLAGS.store(pack_link(status), Ordering::Relaxed);
}

pub fn record_receipt(receipt: &DeliveryReceipt) {
    let counter = match receipt.route {
        Some(DeliveryRoute::Direct) => &DELIVERED_DIRECT,
        Some(DeliveryRoute::StoreAndForward) => &DELIVERED_QUEUED,
        None => &DELIVERY_FAILED,
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> StatusSnapshot {
    let flags = LINK_FLAGS.load(Ordering::Relaxed);
    StatusSnapshot {
        magnitude: f32::from_bits(MAGNITUDE_BITS.load(Ordering::Relaxed)),
        state: AlertState::from_code(ALERT_STATE.load(Ordering::Relaxed)),
        contact_missing: CONTACT_MISSING.load(Ordering::Relaxed),
        retry_available: RETRY_AVAILABLE.load(Ordering::Relaxed),
        link: unpack_link(flags),
        delivered_direct: DELIVERED_DIRECT.load(Ordering::Relaxed),
        delivered_queued: DELIVERED_QUEUED.load(Ordering::Relaxed),
        delivery_failed: DELIVERY_FAILED.load(Ordering::Relaxed),
    }
}

fn pack_link(status: LinkStatus) -> u8 {
    let mut flags = 0;
    if status.paired {
        flags |= LINK_PAIRED;
    }
    if status.reachable {
        flags |= LINK_REACHABLE;
    }
    flags
}

fn unpack_link(flags: u8) -> LinkStatus {
    LinkStatus {
        paired: flags & LINK_PAIRED != 0,
        reachable: flags & LINK_REACHABLE != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_core::AlertError;

    // The statics are process-wide and the coordinator tests write them too,
    // so only fields nothing else touches are compared exactly.
    #[test]
    fn snapshot_reflects_recorded_values() {
        record_magnitude(2.5);
        let before = snapshot();
        record_receipt(&DeliveryReceipt::delivered(DeliveryRoute::StoreAndForward));
        record_receipt(&DeliveryReceipt::failed(AlertError::TransportFailure));

        let after = snapshot();
        assert!((after.magnitude - 2.5).abs() < f32::EPSILON);
        assert!(after.delivered_queued > before.delivered_queued);
        assert!(after.delivery_failed > before.delivery_failed);
    }

    #[test]
    fn link_flags_round_trip() {
        for (paired, reachable) in [(false, false), (true, false), (true, true)] {
            let status = LinkStatus { paired, reachable };
            assert_eq!(unpack_link(pack_link(status)), status);
        }
    }
}
