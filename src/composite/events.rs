//! Change events and subscriptions.

use std::fmt;

use crate::composite::layer::LayerKind;

/// Emitted when the effective value of a key changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// Layer now supplying the value, or the mutated layer when the key became unset.
    pub layer: LayerKind,
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

type Predicate = dyn Fn(&str) -> bool + Send + Sync;
type Handler = dyn Fn(&ChangeEvent) + Send + Sync;

pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    predicate: Box<Predicate>,
    handler: Box<Handler>,
}

impl Subscriber {
    pub(crate) fn new<P, H>(id: SubscriptionId, predicate: P, handler: H) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
        H: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        Self {
            id,
            predicate: Box::new(predicate),
            handler: Box::new(handler),
        }
    }

    pub(crate) fn deliver(&self, event: &ChangeEvent) {
        if (self.predicate)(&event.key) {
            (self.handler)(event);
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}
