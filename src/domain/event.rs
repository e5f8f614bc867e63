//! Synchronous publish/subscribe.
//!
//! Listeners receive a mutable context (the graph, for node events) and the
//! event payload. Dispatch iterates a snapshot of the listener list, so a
//! listener may add or remove listeners, or mutate the graph, mid-trigger.

use std::fmt;
use std::rc::Rc;

/// What a listener asks the dispatcher to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop dispatch for the current trigger call.
    Capture,
}

pub type Listener<C, D> = Rc<dyn Fn(&mut C, &D) -> Flow>;

pub struct Event<C, D> {
    name: &'static str,
    listeners: Vec<Listener<C, D>>,
}

impl<C, D> Clone for Event<C, D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            listeners: self.listeners.clone(),
        }
    }
}

impl<C, D> fmt::Debug for Event<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<C, D> Event<C, D> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers a listener. Returns false if this exact listener is already registered.
    pub fn add(&mut self, listener: Listener<C, D>) -> bool {
        if self.listeners.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    pub fn remove(&mut self, listener: &Listener<C, D>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Rc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Copy of the current listener list, for dispatch outside a borrow of `self`.
    pub fn snapshot(&self) -> Vec<Listener<C, D>> {
        self.listeners.clone()
    }

    /// Calls every listener in registration order until one captures.
    pub fn trigger(&self, context: &mut C, data: &D) -> Flow {
        dispatch(&self.snapshot(), context, data)
    }
}

/// Runs a listener snapshot in order; stops at the first `Flow::Capture`.
pub fn dispatch<C, D>(listeners: &[Listener<C, D>], context: &mut C, data: &D) -> Flow {
    for listener in listeners {
        if listener(context, data) == Flow::Capture {
            return Flow::Capture;
        }
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn given_three_listeners_when_second_captures_then_third_not_called() {
        let calls = Rc::new(Cell::new(0u32));
        let third_called = Rc::new(Cell::new(false));
        let mut event: Event<Vec<u32>, u32> = Event::new("test");

        let c = Rc::clone(&calls);
        event.add(Rc::new(move |log: &mut Vec<u32>, data: &u32| {
            c.set(c.get() + 1);
            log.push(*data);
            Flow::Continue
        }));
        let c = Rc::clone(&calls);
        event.add(Rc::new(move |log: &mut Vec<u32>, data: &u32| {
            c.set(c.get() + 1);
            log.push(*data * 10);
            Flow::Capture
        }));
        let t = Rc::clone(&third_called);
        event.add(Rc::new(move |_: &mut Vec<u32>, _: &u32| {
            t.set(true);
            Flow::Continue
        }));

        let mut log = Vec::new();
        let flow = event.trigger(&mut log, &7);

        assert_eq!(flow, Flow::Capture);
        assert_eq!(calls.get(), 2);
        assert!(!third_called.get());
        assert_eq!(log, vec![7, 70]);
    }

    #[test]
    fn given_same_listener_twice_when_adding_then_deduplicated() {
        let mut event: Event<(), ()> = Event::new("dedupe");
        let listener: Listener<(), ()> = Rc::new(|_: &mut (), _: &()| Flow::Continue);

        assert!(event.add(Rc::clone(&listener)));
        assert!(!event.add(Rc::clone(&listener)));
        assert_eq!(event.len(), 1);
        assert!(event.remove(&listener));
        assert!(event.is_empty());
    }
}
