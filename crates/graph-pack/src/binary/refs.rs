//! Object id table and deferred reference patches.
//!
//! An id is reserved together with its blank instance as soon as the record
//! header has been read, so pointers back into an object that is still being
//! filled resolve to the same instance. Pointers to ids that have not
//! appeared yet turn the whole field into a [`MissingReference`], applied once
//! every id it waits for has been finished.

use std::collections::{BTreeSet, HashMap};

use crate::constants::TypeTag;
use crate::error::{Corruption, GraphError};
use crate::{FieldValue, ObjectRef};

/// One object position inside a decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Ready(Option<ObjectRef>),
    /// Points at an id the stream has not defined yet.
    Missing(i32),
}

impl Slot {
    fn missing(&self) -> Option<i32> {
        match self {
            Slot::Missing(id) => Some(*id),
            Slot::Ready(_) => None,
        }
    }
}

/// An object-bearing field value whose slots may still be unresolved.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingValue {
    Object(Slot),
    Array(Vec<Slot>),
    Array2D(Vec<Vec<Slot>>),
    Homogeneous { class_id: String, items: Vec<Slot> },
}

impl PendingValue {
    /// Distinct ids this value still waits for, in ascending order.
    fn awaited(&self) -> BTreeSet<i32> {
        match self {
            PendingValue::Object(slot) => slot.missing().into_iter().collect(),
            PendingValue::Array(items) | PendingValue::Homogeneous { items, .. } => {
                items.iter().filter_map(Slot::missing).collect()
            }
            PendingValue::Array2D(rows) => rows.iter().flatten().filter_map(Slot::missing).collect(),
        }
    }
}

/// A field that could not be applied when it was read.
#[derive(Debug)]
pub struct MissingReference {
    pub owner: ObjectRef,
    pub name: String,
    pub value: PendingValue,
    /// Number of distinct ids still outstanding.
    pub awaiting: usize,
}

/// Per-stream id → instance table.
#[derive(Debug, Default)]
pub struct PointerTable {
    objects: HashMap<i32, ObjectRef>,
    order: Vec<ObjectRef>,
    patches: Vec<Option<MissingReference>>,
    waiting_on: HashMap<i32, Vec<usize>>,
    open: usize,
}

impl PointerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects reserved so far.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Patches not yet applied.
    pub fn pending(&self) -> usize {
        self.open
    }

    pub fn get(&self, id: i32) -> Option<&ObjectRef> {
        self.objects.get(&id)
    }

    /// Objects in the order their records started.
    pub fn objects(&self) -> &[ObjectRef] {
        &self.order
    }

    /// Binds `id` to `instance` before its fields are read.
    pub fn reserve(&mut self, id: i32, instance: ObjectRef) -> Result<(), GraphError> {
        if self.objects.contains_key(&id) {
            return Err(Corruption::DuplicateObjectId(id).into());
        }
        self.objects.insert(id, instance.clone());
        self.order.push(instance);
        Ok(())
    }

    /// The slot for a pointer to `id`.
    pub fn slot(&self, id: i32) -> Slot {
        match self.objects.get(&id) {
            Some(obj) => Slot::Ready(Some(obj.clone())),
            None => Slot::Missing(id),
        }
    }

    /// Applies `value` to `owner` now if every slot is resolved, otherwise
    /// parks it until the missing ids are finished.
    pub fn apply_or_defer(
        &mut self,
        owner: &ObjectRef,
        name: String,
        value: PendingValue,
    ) -> Result<(), GraphError> {
        let awaited = self.awaited_now(&value);
        if awaited.is_empty() {
            let value = self.resolve(value)?;
            owner.borrow_mut().apply_field(&name, value);
            return Ok(());
        }
        let index = self.patches.len();
        log::trace!(
            "deferring `{}.{}` until objects {:?} are read",
            owner.class_id(),
            name,
            awaited
        );
        for id in &awaited {
            self.waiting_on.entry(*id).or_default().push(index);
        }
        self.patches.push(Some(MissingReference {
            owner: owner.clone(),
            name,
            value,
            awaiting: awaited.len(),
        }));
        self.open += 1;
        Ok(())
    }

    /// Marks `id` as fully read and applies every patch that was only
    /// waiting for it.
    pub fn finish(&mut self, id: i32) -> Result<(), GraphError> {
        let Some(waiting) = self.waiting_on.remove(&id) else {
            return Ok(());
        };
        for index in waiting {
            let ready = match self.patches.get_mut(index).and_then(Option::as_mut) {
                Some(patch) => {
                    patch.awaiting = patch.awaiting.saturating_sub(1);
                    patch.awaiting == 0
                }
                None => false,
            };
            if !ready {
                continue;
            }
            let Some(patch) = self.patches.get_mut(index).and_then(Option::take) else {
                continue;
            };
            self.open -= 1;
            log::trace!(
                "resolved `{}.{}` after object {}",
                patch.owner.class_id(),
                patch.name,
                id
            );
            let value = self.resolve(patch.value)?;
            patch.owner.borrow_mut().apply_field(&patch.name, value);
        }
        Ok(())
    }

    /// Fails with the lowest id some patch is still waiting for.
    pub fn check_complete(&self) -> Result<(), GraphError> {
        match self.waiting_on.keys().min() {
            Some(&id) => Err(GraphError::DanglingReference { id }),
            None => Ok(()),
        }
    }

    /// Resolves a root-level slot once the stream is over.
    pub fn resolve_root(&self, slot: Slot) -> Result<ObjectRef, GraphError> {
        match slot {
            Slot::Ready(Some(obj)) => Ok(obj),
            Slot::Ready(None) => Err(Corruption::UnexpectedObjectTag(TypeTag::ObjectNull.as_u8()).into()),
            Slot::Missing(id) => self
                .objects
                .get(&id)
                .cloned()
                .ok_or(GraphError::DanglingReference { id }),
        }
    }

    /// Ids in `value` that are not even reserved yet.
    fn awaited_now(&self, value: &PendingValue) -> BTreeSet<i32> {
        value
            .awaited()
            .into_iter()
            .filter(|id| !self.objects.contains_key(id))
            .collect()
    }

    fn resolve_slot(&self, slot: Slot) -> Result<Option<ObjectRef>, GraphError> {
        match slot {
            Slot::Ready(obj) => Ok(obj),
            Slot::Missing(id) => self
                .objects
                .get(&id)
                .cloned()
                .map(Some)
                .ok_or(GraphError::DanglingReference { id }),
        }
    }

    fn resolve_slots(&self, slots: Vec<Slot>) -> Result<Vec<Option<ObjectRef>>, GraphError> {
        slots.into_iter().map(|slot| self.resolve_slot(slot)).collect()
    }

    fn resolve(&self, value: PendingValue) -> Result<FieldValue, GraphError> {
        Ok(match value {
            PendingValue::Object(slot) => FieldValue::Object(self.resolve_slot(slot)?),
            PendingValue::Array(items) => FieldValue::ObjectArray(self.resolve_slots(items)?),
            PendingValue::Array2D(rows) => FieldValue::ObjectArray2D(
                rows.into_iter()
                    .map(|row| self.resolve_slots(row))
                    .collect::<Result<_, _>>()?,
            ),
            PendingValue::Homogeneous { class_id, items } => FieldValue::HomogeneousObjectArray {
                class_id,
                items: self.resolve_slots(items)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldWriter, Saveable};

    #[derive(Default)]
    struct Sink {
        seen: Vec<(String, FieldValue)>,
    }

    impl Saveable for Sink {
        fn class_id(&self) -> &str {
            "Sink"
        }

        fn save(&self, _out: &mut FieldWriter) {}

        fn apply_field(&mut self, name: &str, value: FieldValue) {
            self.seen.push((name.to_owned(), value));
        }
    }

    fn seen(obj: &ObjectRef) -> Vec<(String, FieldValue)> {
        obj.downcast_ref::<Sink>().unwrap().seen.clone()
    }

    #[test]
    fn reserved_ids_resolve_immediately() {
        let mut table = PointerTable::new();
        let owner = ObjectRef::new(Sink::default());
        table.reserve(0, owner.clone()).unwrap();
        let value = PendingValue::Object(table.slot(0));
        table.apply_or_defer(&owner, "me".into(), value).unwrap();
        assert_eq!(seen(&owner), vec![("me".into(), FieldValue::Object(Some(owner.clone())))]);
        assert_eq!(table.pending(), 0);
    }

    #[test]
    fn patch_waits_for_every_distinct_id() {
        let mut table = PointerTable::new();
        let owner = ObjectRef::new(Sink::default());
        table.reserve(0, owner.clone()).unwrap();
        let value = PendingValue::Array(vec![table.slot(1), table.slot(2), table.slot(1)]);
        table.apply_or_defer(&owner, "items".into(), value).unwrap();
        assert_eq!(table.pending(), 1);

        let one = ObjectRef::new(Sink::default());
        table.reserve(1, one.clone()).unwrap();
        table.finish(1).unwrap();
        assert!(seen(&owner).is_empty());
        assert_eq!(table.check_complete(), Err(GraphError::DanglingReference { id: 2 }));

        let two = ObjectRef::new(Sink::default());
        table.reserve(2, two.clone()).unwrap();
        table.finish(2).unwrap();
        assert_eq!(
            seen(&owner),
            vec![(
                "items".into(),
                FieldValue::ObjectArray(vec![Some(one.clone()), Some(two), Some(one)])
            )]
        );
        assert_eq!(table.check_complete(), Ok(()));
    }

    #[test]
    fn duplicate_reservation_is_corruption() {
        let mut table = PointerTable::new();
        table.reserve(4, ObjectRef::new(Sink::default())).unwrap();
        let err = table.reserve(4, ObjectRef::new(Sink::default())).unwrap_err();
        assert_eq!(err, GraphError::CorruptStream(Corruption::DuplicateObjectId(4)));
    }

    #[test]
    fn unknown_root_is_dangling() {
        let table = PointerTable::new();
        assert_eq!(
            table.resolve_root(Slot::Missing(9)).unwrap_err(),
            GraphError::DanglingReference { id: 9 }
        );
    }
}
