use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::info;

use crate::auth::{AuthError, AuthProvider, Identity};

type Listener = Rc<RefCell<dyn FnMut(Option<&Identity>)>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Observable signed-in identity. Subscribers get the current value right
/// away and every later transition.
pub struct SessionManager<'a> {
    auth: &'a dyn AuthProvider,
    current: RefCell<Option<Identity>>,
    registry: Rc<RefCell<Registry>>,
}

/// Handle returned by [`SessionManager::subscribe`].
#[must_use = "dropping a subscription keeps the listener attached; call unsubscribe to detach"]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl<'a> SessionManager<'a> {
    /// Starts from whatever session the provider restored.
    pub fn new(auth: &'a dyn AuthProvider) -> Self {
        Self {
            auth,
            current: RefCell::new(auth.current_user()),
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(Option<&Identity>) + 'static,
    {
        let listener: Listener = Rc::new(RefCell::new(on_change));
        let id = {
            let mut registry = self.registry.borrow_mut();
            registry.next_id += 1;
            let id = registry.next_id;
            registry.listeners.push((id, Rc::clone(&listener)));
            id
        };
        let current = self.current();
        (&mut *listener.borrow_mut())(current.as_ref());
        Subscription {
            registry: Rc::downgrade(&self.registry),
            id,
        }
    }

    pub fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self.auth.register(email, password)?;
        self.transition(Some(identity.clone()));
        Ok(identity)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self.auth.sign_in(email, password)?;
        self.transition(Some(identity.clone()));
        Ok(identity)
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out()?;
        self.transition(None);
        Ok(())
    }

    fn transition(&self, next: Option<Identity>) {
        if *self.current.borrow() == next {
            return;
        }
        match &next {
            Some(identity) => info!(user_id = %identity.user_id, "session started"),
            None => info!("session ended"),
        }
        *self.current.borrow_mut() = next.clone();

        let snapshot = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect::<Vec<_>>();
        for listener in snapshot {
            if let Ok(mut callback) = listener.try_borrow_mut() {
                (&mut *callback)(next.as_ref());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::SessionManager;
    use crate::auth::{AuthError, AuthProvider, Identity};
    use crate::testing::MemoryAuth;

    type Seen = Rc<RefCell<Vec<Option<String>>>>;

    fn recorder() -> (Seen, impl FnMut(Option<&Identity>) + 'static) {
        let seen: Seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let callback = move |identity: Option<&Identity>| {
            sink.borrow_mut()
                .push(identity.map(|identity| identity.user_id.clone()));
        };
        (seen, callback)
    }

    #[test]
    fn subscribe_replays_current_identity_immediately() {
        let auth = MemoryAuth::default();
        auth.register("ana@example.com", "secret1").expect("register");
        let session = SessionManager::new(&auth);
        let (seen, callback) = recorder();
        let _subscription = session.subscribe(callback);
        assert_eq!(*seen.borrow(), vec![Some("user-1".to_string())]);
    }

    #[test]
    fn listeners_fire_only_on_transitions() {
        let auth = MemoryAuth::default();
        let session = SessionManager::new(&auth);
        let (seen, callback) = recorder();
        let _subscription = session.subscribe(callback);

        session.register("ana@example.com", "secret1").expect("register");
        session.sign_in("ana@example.com", "secret1").expect("same user");
        session.sign_out().expect("sign out");
        session.sign_out().expect("second sign out");

        assert_eq!(
            *seen.borrow(),
            vec![None, Some("user-1".to_string()), None]
        );
    }

    #[test]
    fn failed_sign_in_keeps_state_and_surfaces_message() {
        let auth = MemoryAuth::default();
        let session = SessionManager::new(&auth);
        let (seen, callback) = recorder();
        let _subscription = session.subscribe(callback);

        let err = session
            .sign_in("ana@example.com", "wrong-pass")
            .expect_err("unknown account");
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(session.current().is_none());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn unsubscribe_detaches_listener() {
        let auth = MemoryAuth::default();
        let session = SessionManager::new(&auth);
        let (seen, callback) = recorder();
        let subscription = session.subscribe(callback);
        subscription.unsubscribe();

        session.register("ana@example.com", "secret1").expect("register");
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn unsubscribe_after_manager_dropped_is_a_no_op() {
        let auth = MemoryAuth::default();
        let (seen, callback) = recorder();
        let subscription = {
            let session = SessionManager::new(&auth);
            session.subscribe(callback)
        };
        subscription.unsubscribe();
        assert_eq!(Rc::strong_count(&seen), 1);
    }
}
