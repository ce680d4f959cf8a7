//! Slot arena holding every runtime value, and the tracing collector
//! that reclaims whatever a turn left unreachable.

use bit_vec::BitVec;
use log::debug;

use crate::value::Value;

/// Stable identity of one heap-allocated value. Handles stay valid for
/// as long as the value is reachable from the collector root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub marked: usize,
    pub swept: usize,
}

/// Registry of live values. Freed slots are recycled through a free
/// list, so handle indices stay stable across sweeps.
pub struct Heap {
    slots: Vec<Option<Value>>,
    free: Vec<u32>,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn alloc(&mut self, value: Value) -> Handle {
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(value);
                Handle(index)
            }
            None => {
                self.slots.push(Some(value));
                Handle(self.slots.len() as u32 - 1)
            }
        }
    }

    pub fn get(&self, handle: Handle) -> &Value {
        match &self.slots[handle.index()] {
            Some(value) => value,
            None => unreachable!("dangling handle"),
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut Value {
        match &mut self.slots[handle.index()] {
            Some(value) => value,
            None => unreachable!("dangling handle"),
        }
    }

    /// Number of currently occupied slots.
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Stop-the-world mark-and-sweep from `root`. Marks are a bitset
    /// keyed by slot index, so cyclic structures terminate; the
    /// worklist keeps deep structures off the native stack.
    pub fn collect(&mut self, root: Handle) -> SweepStats {
        let mut marks = BitVec::from_elem(self.slots.len(), false);
        let mut worklist = vec![root];
        let mut marked = 0;
        while let Some(handle) = worklist.pop() {
            if marks.get(handle.index()) == Some(true) {
                continue;
            }
            marks.set(handle.index(), true);
            marked += 1;
            self.trace(handle, &mut worklist);
        }

        let mut swept = 0;
        for index in 0..self.slots.len() {
            if self.slots[index].is_some() && marks.get(index) != Some(true) {
                self.slots[index] = None;
                self.free.push(index as u32);
                swept += 1;
            }
        }
        debug!("gc: marked {marked} values, swept {swept}");
        SweepStats { marked, swept }
    }

    fn trace(&self, handle: Handle, worklist: &mut Vec<Handle>) {
        match self.get(handle) {
            Value::Number(_) | Value::Boolean(_) | Value::Symbol(_) | Value::Builtin(_) => {}
            Value::Pair(pair) => {
                worklist.extend(pair.car);
                worklist.extend(pair.cdr);
            }
            Value::Closure(closure) => {
                worklist.extend(closure.params.iter().copied().flatten());
                worklist.extend(closure.body.iter().copied().flatten());
                worklist.push(closure.env);
            }
            Value::Scope(frame) => {
                worklist.extend(frame.parent);
                worklist.extend(frame.vars.values().copied().flatten());
            }
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Frame;
    use crate::value::Pair;

    fn cons(heap: &mut Heap, car: Option<Handle>, cdr: Option<Handle>) -> Handle {
        heap.alloc(Value::Pair(Pair { car, cdr }))
    }

    #[test]
    fn alloc_recycles_swept_slots() {
        let mut heap = Heap::new();
        let root = heap.alloc(Value::Scope(Frame::new(None)));
        let dead = heap.alloc(Value::Number(1));
        heap.collect(root);
        let reused = heap.alloc(Value::Number(2));
        assert_eq!(reused, dead);
        assert_eq!(heap.live(), 2);
    }

    #[test]
    fn collect_keeps_values_reachable_through_pairs() {
        let mut heap = Heap::new();
        let one = heap.alloc(Value::Number(1));
        let two = heap.alloc(Value::Number(2));
        let tail = cons(&mut heap, Some(two), None);
        let list = cons(&mut heap, Some(one), Some(tail));

        let mut frame = Frame::new(None);
        frame.vars.insert(crate::intern::Interner::new().intern("x"), Some(list));
        let root = heap.alloc(Value::Scope(frame));

        let stats = heap.collect(root);
        assert_eq!(stats.marked, 5);
        assert_eq!(stats.swept, 0);
        assert_eq!(heap.live(), 5);
    }

    #[test]
    fn collect_sweeps_unreachable_values() {
        let mut heap = Heap::new();
        let root = heap.alloc(Value::Scope(Frame::new(None)));
        heap.alloc(Value::Number(10));
        let garbage_tail = cons(&mut heap, None, None);
        cons(&mut heap, Some(garbage_tail), None);

        let stats = heap.collect(root);
        assert_eq!(stats.swept, 3);
        assert_eq!(heap.live(), 1);
    }

    #[test]
    fn collect_terminates_on_cycles() {
        let mut heap = Heap::new();
        let a = cons(&mut heap, None, None);
        let b = cons(&mut heap, None, Some(a));
        if let Value::Pair(pair) = heap.get_mut(a) {
            pair.cdr = Some(b);
        }
        let root = heap.alloc(Value::Scope(Frame::new(None)));

        let stats = heap.collect(root);
        assert_eq!(stats.swept, 2);
        assert_eq!(heap.live(), 1);
    }

    #[test]
    fn reachable_cycle_survives_and_is_marked_once() {
        let mut heap = Heap::new();
        let a = cons(&mut heap, None, None);
        if let Value::Pair(pair) = heap.get_mut(a) {
            pair.cdr = Some(a);
        }
        let mut frame = Frame::new(None);
        frame.vars.insert(crate::intern::Interner::new().intern("loop"), Some(a));
        let root = heap.alloc(Value::Scope(frame));

        let stats = heap.collect(root);
        assert_eq!(stats.marked, 2);
        assert_eq!(heap.live(), 2);
    }
}
