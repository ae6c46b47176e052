use std::fmt;

/// Handle returned by [`Observable::subscribe`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Box<dyn FnMut(&T, &T)>;

/// A value whose every assignment notifies listeners with `(new, old)`.
///
/// Notifications are synchronous. While the value is held (see
/// [`Observable::hold`]) assignments are coalesced and listeners fire once on
/// release, receiving the value from before the hold as `old`.
pub struct Observable<T> {
    value: T,
    listeners: Vec<(ListenerId, Listener<T>)>,
    next_listener: u64,
    holds: usize,
    before_hold: Option<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            listeners: Vec::new(),
            next_listener: 0,
            holds: 0,
            before_hold: None,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Assign and notify; returns the previous value
    pub fn set(&mut self, value: T) -> T {
        let old = std::mem::replace(&mut self.value, value);
        if self.holds > 0 {
            if self.before_hold.is_none() {
                self.before_hold = Some(old.clone());
            }
        } else {
            self.notify(&old);
        }
        old
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&T, &T) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Defer notifications until the matching [`Observable::release`]
    pub fn hold(&mut self) {
        self.holds += 1;
    }

    pub fn release(&mut self) {
        self.holds = self.holds.saturating_sub(1);
        if self.holds == 0
            && let Some(old) = self.before_hold.take()
        {
            self.notify(&old);
        }
    }

    /// Drop deferred assignments made during a hold without notifying
    pub(crate) fn release_silently(&mut self) {
        self.holds = self.holds.saturating_sub(1);
        if self.holds == 0 {
            self.before_hold = None;
        }
    }

    fn notify(&mut self, old: &T) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.value, old);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
