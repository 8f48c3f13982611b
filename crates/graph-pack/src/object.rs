//! Shared handles to persisted objects.

use std::cell::{BorrowError, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::Saveable;

/// A shared, interior-mutable handle to a [`Saveable`] object.
///
/// Identity is pointer identity: two handles are equal when they point at the
/// same instance, which is what the codec uses to detect repeated objects and
/// cycles. Graphs that contain cycles keep themselves alive; hold back-edges as
/// [`WeakObjectRef`] where that matters.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<dyn Saveable>>);

impl ObjectRef {
    /// Wraps a value in a new shared handle.
    pub fn new<T: Saveable>(value: T) -> Self {
        let cell: Rc<RefCell<dyn Saveable>> = Rc::new(RefCell::new(value));
        Self(cell)
    }

    /// Immutably borrows the object.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, dyn Saveable> {
        self.0.borrow()
    }

    /// Mutably borrows the object.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Saveable> {
        self.0.borrow_mut()
    }

    pub fn try_borrow(&self) -> Result<Ref<'_, dyn Saveable>, BorrowError> {
        self.0.try_borrow()
    }

    /// Returns the class id of the referenced object.
    pub fn class_id(&self) -> String {
        self.0.borrow().class_id().to_owned()
    }

    /// Borrows the object as a `T`, if that is its concrete type.
    pub fn downcast_ref<T: Saveable>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.0.borrow(), |obj| obj.as_any().downcast_ref::<T>()).ok()
    }

    /// Mutably borrows the object as a `T`, if that is its concrete type.
    pub fn downcast_mut<T: Saveable>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.0.borrow_mut(), |obj| {
            obj.as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    /// Returns `true` if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    /// Address used as the identity key while encoding.
    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(obj) => write!(f, "ObjectRef({} @ {:p})", obj.class_id(), self.addr()),
            Err(_) => write!(f, "ObjectRef(<borrowed> @ {:p})", self.addr()),
        }
    }
}

/// A non-owning handle created by [`ObjectRef::downgrade`].
#[derive(Clone)]
pub struct WeakObjectRef(Weak<RefCell<dyn Saveable>>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakObjectRef")
    }
}
