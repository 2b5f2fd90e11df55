//! Generational object storage

use synavis_core::ObjectId;

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena-based storage for scene objects
///
/// Removing an object bumps its slot's generation, so handles to it stop
/// resolving even after the slot is reused.
pub struct ObjectArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: u32,
}

impl<T> ObjectArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Insert an object, reusing a freed slot when one exists
    pub fn insert(&mut self, value: T) -> ObjectId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return ObjectId::from_parts(index, slot.generation);
        }
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        ObjectId::from_parts(self.slots.len() as u32 - 1, 1)
    }

    #[inline]
    pub fn get(&self, id: ObjectId) -> Option<&T> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Remove an object, invalidating every handle to it
    pub fn remove(&mut self, id: ObjectId) -> Option<T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let out = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(id.index());
        self.live -= 1;
        Some(out)
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live objects in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (ObjectId::from_parts(index as u32, slot.generation), value))
        })
    }
}

impl<T> Default for ObjectArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
