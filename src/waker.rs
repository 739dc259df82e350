//! A waker that does nothing.
//!
//! Every primitive this crate exports decides whether to suspend by looking at the thread-local
//! [`Runtime`](crate::runtime::Runtime)'s own indices, not by relying on a real wake-up callback —
//! the driver resumes a task because its id came back out of `sleeping`/`waiters`, never because
//! some `Waker::wake()` fired. Polling therefore never needs a waker that does anything; this one
//! exists only because [`Future::poll`](core::future::Future::poll) requires a [`Context`].

use core::task::{RawWaker, RawWakerVTable, Waker};

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);

fn clone(_: *const ()) -> RawWaker {
    RawWaker::new(core::ptr::null(), &VTABLE)
}
fn no_op(_: *const ()) {}

/// Build a [`Waker`] whose `wake`/`wake_by_ref` do nothing.
pub fn noop_waker() -> Waker {
    // SAFETY: the vtable's functions never dereference the data pointer.
    unsafe { Waker::from_raw(RawWaker::new(core::ptr::null(), &VTABLE)) }
}
