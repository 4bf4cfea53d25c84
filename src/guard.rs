use crate::platform::InboundEvent;

/// The one identity allowed to use the bot. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal(pub u64);

/// An event whose sender has been checked against the [`Principal`].
///
/// Only [`Principal::authorize`] can build one, so handlers that take an
/// `Authorized` cannot run for anyone else.
#[derive(Debug)]
pub struct Authorized(InboundEvent);

impl Authorized {
    pub fn event(&self) -> &InboundEvent {
        &self.0
    }

    pub fn into_event(self) -> InboundEvent {
        self.0
    }
}

impl Principal {
    pub fn is_authorized(&self, event: &InboundEvent) -> bool {
        event.sender_id() == self.0
    }

    pub fn authorize(&self, event: InboundEvent) -> Option<Authorized> {
        if self.is_authorized(&event) {
            Some(Authorized(event))
        } else {
            None
        }
    }
}
