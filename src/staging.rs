//! Fixed-capacity staging area handing records from lookup workers over to a batch flusher.
//!
//! Every slot moves through a four-state cycle:
//!
//! ```text
//!   Free --allocate--> Reserved --write_and_mark_ready--> Ready --take_ready--> Flushing --recycle--> Free
//! ```
//!
//! A slot being flushed is neither allocatable nor flushable again, so a flusher can only ever recycle the slots it
//! claimed itself.
//!
//! The state lives in a single atomic cell per slot, so a scan never observes a half-updated combination. Only the
//! producer that reserved a slot writes its payload, and it publishes the payload with a release store of `Ready`;
//! the flusher picks it up with an acquire load. The payload cell itself carries a mutex which is never contended in
//! a correct protocol run: it only makes concurrent misuse of the same slot id harmless.

use std::fmt::Display;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::StagingError;

pub const DEFAULT_SLOTS: usize = 1000;
pub const MAX_SLOTS: usize = 100_000;

/// One-based slot identifier within a [`StagingSlotBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(usize);

impl SlotId {
    #[inline]
    pub fn get(self) -> usize {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 - 1
    }
}

impl Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Available for allocation.
    Free     = 0,
    /// Owned by the producer that allocated it; the payload is being written.
    Reserved = 1,
    /// Payload published, waiting for the flusher.
    Ready    = 2,
    /// Payload handed to a batch insert that has not completed yet.
    Flushing = 3,
}

impl SlotState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Free,
            1 => Self::Reserved,
            2 => Self::Ready,
            3 => Self::Flushing,
            _ => unreachable!("invalid slot state value {v}"),
        }
    }
}

struct Slot<R> {
    state:   AtomicU8,
    payload: Mutex<Option<R>>,
}

impl<R> Slot<R> {
    fn new() -> Self {
        Self {
            state:   AtomicU8::new(SlotState::Free as u8),
            payload: Mutex::new(None),
        }
    }

    #[inline]
    fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn transition(&self, from: SlotState, to: SlotState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

pub struct StagingSlotBuffer<R> {
    name:  &'static str,
    slots: Box<[Slot<R>]>,
}

impl<R> StagingSlotBuffer<R>
where
    R: Send + 'static,
{
    /// Create a buffer with `capacity` slots. A capacity of zero or above [`MAX_SLOTS`] silently falls back to
    /// [`DEFAULT_SLOTS`].
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = if capacity == 0 || capacity > MAX_SLOTS {
            DEFAULT_SLOTS
        }
        else {
            capacity
        };

        Self {
            name,
            slots: (0..capacity).map(|_| Slot::new()).collect(),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, id: SlotId) -> Result<&Slot<R>, StagingError> {
        if id.0 == 0 {
            return Err(StagingError::UnknownSlot(id));
        }
        self.slots.get(id.index()).ok_or(StagingError::UnknownSlot(id))
    }

    /// Reserve the first free slot.
    ///
    /// The scan is linear. Each candidate is claimed with a compare-and-swap, so two concurrent callers can never be
    /// handed the same slot.
    pub fn allocate(&self) -> Result<SlotId, StagingError> {
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.state() == SlotState::Free && slot.transition(SlotState::Free, SlotState::Reserved) {
                return Ok(SlotId(idx + 1));
            }
        }
        Err(StagingError::Exhausted)
    }

    /// Store `payload` into a reserved slot and publish it to the flusher.
    ///
    /// Fails without touching anything if the slot is not currently reserved. That is a caller bug, not a transient
    /// condition.
    pub fn write_and_mark_ready(&self, id: SlotId, payload: R) -> Result<(), StagingError> {
        let slot = self.slot(id)?;
        let mut guard = slot.payload.lock();
        if slot.state() != SlotState::Reserved {
            return Err(StagingError::NotReserved(id));
        }
        *guard = Some(payload);
        slot.state.store(SlotState::Ready as u8, Ordering::Release);
        Ok(())
    }

    /// Give a reservation back without writing anything.
    pub fn abandon(&self, id: SlotId) -> Result<(), StagingError> {
        if self.slot(id)?.transition(SlotState::Reserved, SlotState::Free) {
            Ok(())
        }
        else {
            Err(StagingError::NotReserved(id))
        }
    }

    /// Allocate a slot, fill it and mark it ready in one go.
    pub fn stage(&self, payload: R) -> Result<SlotId, StagingError> {
        let id = self.allocate()?;
        if let Err(err) = self.write_and_mark_ready(id, payload) {
            // Only reachable if someone else wrote into our reservation.
            let _ = self.abandon(id);
            return Err(err);
        }
        debug!("[{}] staged into slot {id}", self.name);
        Ok(id)
    }

    pub fn state_of(&self, id: SlotId) -> Option<SlotState> {
        self.slot(id).ok().map(Slot::state)
    }

    /// Ids of all slots currently published for flushing.
    pub fn ready_slots(&self) -> Vec<SlotId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state() == SlotState::Ready)
            .map(|(idx, _)| SlotId(idx + 1))
            .collect()
    }

    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|s| s.state() == SlotState::Free).count()
    }

    /// Claim the given ready slots for flushing and move their payloads out. Returns the ids actually claimed along
    /// with their payloads; slots which are no longer `Ready` are skipped. Claimed slots stay `Flushing` until
    /// [`recycle`](Self::recycle)d.
    pub(crate) fn take_ready(&self, ids: &[SlotId]) -> (Vec<SlotId>, Vec<R>) {
        let mut claimed = Vec::with_capacity(ids.len());
        let mut payloads = Vec::with_capacity(ids.len());
        for id in ids {
            let Ok(slot) = self.slot(*id)
            else {
                continue;
            };
            if !slot.transition(SlotState::Ready, SlotState::Flushing) {
                continue;
            }
            claimed.push(*id);
            if let Some(payload) = slot.payload.lock().take() {
                payloads.push(payload);
            }
        }
        (claimed, payloads)
    }

    /// Return claimed slots to the free pool.
    pub(crate) fn recycle(&self, ids: &[SlotId]) {
        for id in ids {
            if let Ok(slot) = self.slot(*id) {
                if !slot.transition(SlotState::Flushing, SlotState::Free) {
                    debug!("[{}] slot {id} was not being flushed at recycle time", self.name);
                }
            }
        }
    }
}
