use std::rc::{Rc, Weak};

/// The measurement a timer currently has in flight.
///
/// Holds the issuing context weakly: a timer never keeps its context alive.
pub(crate) struct InFlight<C> {
    context: Weak<C>,
    stopped: bool,
}

impl<C> InFlight<C> {
    pub(crate) fn new(context: &Rc<C>) -> Self {
        Self {
            context: Rc::downgrade(context),
            stopped: false,
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.stopped = true;
    }
}

/// Upgrades the in-flight context, detaching the measurement if the context is gone.
pub(crate) fn live_context<C>(in_flight: &mut Option<InFlight<C>>, label: &str) -> Option<Rc<C>> {
    let context = in_flight.as_ref()?.context.upgrade();
    if context.is_none() {
        log::warn!("{label} timer: execution context dropped with a measurement in flight; discarding it");
        *in_flight = None;
    }
    context
}
