/// The kind of key event, named as it appears in ECP paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// `POST /keypress/{key}`
    Press,
    /// `POST /keydown/{key}`
    Down,
    /// `POST /keyup/{key}`
    Up,
}

impl KeyAction {
    /// The ECP path segment for this action
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Press => "keypress",
            Self::Down => "keydown",
            Self::Up => "keyup",
        }
    }
}

impl std::fmt::Display for KeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded key command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Press, down or up
    pub action: KeyAction,
    /// The decoded key name, e.g. `Select` or `Lit_a`
    pub key: String,
}

/// Something that wants to hear about key events
pub trait Callback {
    /// Handle one key event
    fn on_key_event(&self, action: KeyAction, key: &str);
}

impl<F: Fn(KeyAction, &str)> Callback for F {
    fn on_key_event(&self, action: KeyAction, key: &str) {
        self(action, key);
    }
}

/// Fans key events out to every registered observer, in order
#[derive(Default)]
pub struct Dispatcher {
    observers: Vec<Box<dyn Callback>>,
}

impl Dispatcher {
    /// Create a dispatcher with no observers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; there is no way to remove one
    pub fn register(&mut self, observer: Box<dyn Callback>) {
        self.observers.push(observer);
    }

    /// Call every observer, synchronously, in registration order
    pub fn dispatch(&self, event: &KeyEvent) {
        for observer in &self.observers {
            observer.on_key_event(event.action, &event.key);
        }
    }

    /// How many observers are registered
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether there are no observers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn observers_called_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut d = Dispatcher::new();
        for n in 0..3 {
            let seen = seen.clone();
            d.register(Box::new(move |a: KeyAction, k: &str| {
                seen.borrow_mut().push(format!("{n} {a} {k}"));
            }));
        }
        assert_eq!(d.len(), 3);

        d.dispatch(&KeyEvent {
            action: KeyAction::Down,
            key: "Select".to_string(),
        });

        assert_eq!(
            *seen.borrow(),
            vec!["0 keydown Select", "1 keydown Select", "2 keydown Select"]
        );
    }

    #[test]
    fn same_observer_twice_called_twice() {
        let count = Rc::new(RefCell::new(0));
        let mut d = Dispatcher::new();
        for _ in 0..2 {
            let count = count.clone();
            d.register(Box::new(move |_: KeyAction, _: &str| {
                *count.borrow_mut() += 1;
            }));
        }
        d.dispatch(&KeyEvent {
            action: KeyAction::Press,
            key: "Home".to_string(),
        });
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn no_observers() {
        let d = Dispatcher::new();
        assert!(d.is_empty());
        d.dispatch(&KeyEvent {
            action: KeyAction::Up,
            key: "Back".to_string(),
        });
    }

    #[test]
    fn action_names() {
        assert_eq!(KeyAction::Press.to_string(), "keypress");
        assert_eq!(KeyAction::Down.as_str(), "keydown");
        assert_eq!(KeyAction::Up.as_str(), "keyup");
    }
}
