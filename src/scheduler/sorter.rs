use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use crate::scheduler::Event;

/// An event in one of the sorter's lists.
#[derive(Debug, Clone, Copy)]
pub struct SortedEvent {
    /// Absolute system time of the event.
    pub time: f64,
    pub event: Event,
    /// Counter of `event.particle2` when the event was pushed.
    pub counter: u64,
}

impl SortedEvent {
    pub fn new(time: f64, event: Event, counter: u64) -> Self {
        SortedEvent { time, event, counter }
    }

    /// Total order: time, then particles, source, type and source ID.
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.event.particle1.cmp(&other.event.particle1))
            .then(self.event.particle2.cmp(&other.event.particle2))
            .then(self.event.source.cmp(&other.event.source))
            .then(self.event.event_type.cmp(&other.event.event_type))
            .then(self.event.source_id.cmp(&other.event.source_id))
    }
}

impl PartialEq for SortedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for SortedEvent {}

impl PartialOrd for SortedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_cmp(other)
    }
}

/// Marks tree slots that hold no list.
const EMPTY_SLOT: usize = usize::MAX;

/// Per-particle event lists ordered by a complete binary tree over their minima.
///
/// List `i < n` belongs to particle `i`, list `n` holds the system events.
/// Pair events are deleted lazily: every particle carries a counter that is
/// bumped when the particle is invalidated, and an event whose partner
/// counter no longer matches is discarded when it reaches the top.
#[derive(Debug, Clone, Default)]
pub struct EventSorter {
    lists: Vec<BinaryHeap<Reverse<SortedEvent>>>,
    counters: Vec<u64>,
    tree: Vec<usize>,
    leaves: usize,
}

impl EventSorter {
    pub fn new(n: usize) -> Self {
        let mut sorter = EventSorter::default();
        sorter.resize(n);
        sorter
    }

    /// Drops every event and sizes the sorter for `n` particles.
    pub fn resize(&mut self, n: usize) {
        let lists = n + 1;
        self.lists = vec![BinaryHeap::new(); lists];
        self.counters = vec![0; n];
        self.leaves = lists.next_power_of_two();
        self.tree = vec![EMPTY_SLOT; 2 * self.leaves];
        for list in 0..lists {
            self.tree[self.leaves + list] = list;
        }
        self.rebuild_tree();
    }

    /// Number of particle lists.
    pub fn n(&self) -> usize {
        self.counters.len()
    }

    pub fn system_list(&self) -> usize {
        self.n()
    }

    pub fn counter(&self, id: usize) -> u64 {
        self.counters[id]
    }

    pub fn len(&self, list: usize) -> usize {
        self.lists[list].len()
    }

    /// Adds an event to a list. The tree is not touched, call
    /// [`EventSorter::update`] once the list is complete.
    pub fn push(&mut self, list: usize, event: SortedEvent) {
        self.lists[list].push(Reverse(event));
    }

    /// Drops every event of a particle and outdates all events naming it as partner.
    pub fn invalidate(&mut self, id: usize) {
        self.lists[id].clear();
        self.counters[id] += 1;
        self.update(id);
    }

    pub fn clear_list(&mut self, list: usize) {
        self.lists[list].clear();
        self.update(list);
    }

    fn is_stale(&self, event: &SortedEvent) -> bool {
        match event.event.particle2 {
            Some(partner) => self.counters.get(partner).map_or(true, |&c| c != event.counter),
            None => false,
        }
    }

    fn minimum(&self, slot: usize) -> Option<&SortedEvent> {
        if slot == EMPTY_SLOT {
            return None;
        }
        self.lists[slot].peek().map(|Reverse(event)| event)
    }

    /// Winner of two slots; empty lists lose, ties go to the left.
    fn winner(&self, left: usize, right: usize) -> usize {
        match (self.minimum(left), self.minimum(right)) {
            (_, None) => left,
            (None, Some(_)) => right,
            (Some(l), Some(r)) => {
                if r < l {
                    right
                } else {
                    left
                }
            }
        }
    }

    /// Replays the matches above the leaf of `list`.
    pub fn update(&mut self, list: usize) {
        let mut node = (self.leaves + list) / 2;
        while node > 0 {
            let winner = self.winner(self.tree[2 * node], self.tree[2 * node + 1]);
            self.tree[node] = winner;
            node /= 2;
        }
    }

    /// Replays every match, bottom up.
    pub fn rebuild_tree(&mut self) {
        for node in (1..self.leaves).rev() {
            self.tree[node] = self.winner(self.tree[2 * node], self.tree[2 * node + 1]);
        }
    }

    /// The earliest valid event, discarding outdated ones on the way.
    pub fn top(&mut self) -> Option<SortedEvent> {
        loop {
            let list = self.tree[1];
            let event = *self.minimum(list)?;
            if !self.is_stale(&event) {
                return Some(event);
            }
            self.lists[list].pop();
            self.update(list);
        }
    }

    /// Removes the earliest valid event.
    pub fn pop(&mut self) -> Option<SortedEvent> {
        let event = self.top()?;
        let list = self.tree[1];
        self.lists[list].pop();
        self.update(list);
        Some(event)
    }
}
