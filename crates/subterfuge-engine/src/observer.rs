//! Tick-changed notifications.
//!
//! Listeners are called synchronously, in registration order, once per
//! settled tick. They receive a shared borrow of the state, so they cannot
//! re-enter the time machine.

use std::fmt;

use subterfuge_state::prelude::*;

/// Which way the time machine moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Forward,
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Reverse => f.write_str("reverse"),
        }
    }
}

/// Payload delivered to listeners after each tick settles.
#[derive(Debug, Clone, Copy)]
pub struct TickChanged<'a> {
    pub direction: Direction,
    pub tick: Tick,
    pub state: &'a GameState,
}

/// Returned by [`ObserverList::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type Listener = Box<dyn FnMut(&TickChanged<'_>)>;

/// Ordered list of tick listeners.
#[derive(Default)]
pub struct ObserverList {
    listeners: Vec<(ListenerHandle, Listener)>,
    next_handle: u64,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TickChanged<'_>) + 'static) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle);
        self.next_handle += 1;
        self.listeners.push((handle, Box::new(listener)));
        handle
    }

    /// Remove a listener. Returns `false` if the handle is unknown.
    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify(&mut self, event: &TickChanged<'_>) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_run_in_order_until_unsubscribed() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut list = ObserverList::new();

        let a = {
            let seen = Rc::clone(&seen);
            list.subscribe(move |e| seen.borrow_mut().push(("a", e.tick.raw())))
        };
        {
            let seen = Rc::clone(&seen);
            list.subscribe(move |e| seen.borrow_mut().push(("b", e.tick.raw())));
        }

        let state = GameState::new();
        list.notify(&TickChanged {
            direction: Direction::Forward,
            tick: Tick::new(1),
            state: &state,
        });
        assert!(list.unsubscribe(a));
        assert!(!list.unsubscribe(a));
        list.notify(&TickChanged {
            direction: Direction::Reverse,
            tick: Tick::new(0),
            state: &state,
        });

        assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1), ("b", 0)]);
        assert_eq!(list.len(), 1);
    }
}
