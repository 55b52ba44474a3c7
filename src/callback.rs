use std::cell::RefCell;
use std::rc::Rc;

type Callback<A> = Box<dyn FnMut(A)>;

/// A shared, replaceable callback
///
/// Armed timers hold a clone of the slot and look up the callback when they
/// fire, so swapping the callback never requires rearming a timer.
pub(crate) struct CallbackSlot<A> {
    inner: Rc<RefCell<Option<Callback<A>>>>,
}

impl<A> CallbackSlot<A> {
    pub(crate) fn new(callback: impl FnMut(A) + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Some(Box::new(callback)))),
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            inner: Rc::new(RefCell::new(None)),
        }
    }

    pub(crate) fn replace(&self, callback: impl FnMut(A) + 'static) {
        *self.inner.borrow_mut() = Some(Box::new(callback));
    }

    pub(crate) fn is_set(&self) -> bool {
        self.inner.borrow().is_some()
    }

    /// Call the current callback, if there is one
    ///
    /// The callback is taken out of the slot while it runs. If it installs a
    /// replacement during the call, the replacement is kept.
    pub(crate) fn invoke(&self, arg: A) {
        let taken = self.inner.borrow_mut().take();

        if let Some(mut callback) = taken {
            callback(arg);

            let mut slot = self.inner.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }
}

impl<A> Clone for CallbackSlot<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
