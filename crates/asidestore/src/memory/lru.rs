//! Byte-weighted LRU list backing the in-process key-value store
//!
//! Entries live in a slab and are threaded on an intrusive doubly-linked
//! list, head = most recently used. Every entry carries a weight and the
//! list never holds more total weight than its capacity.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use ahash::RandomState;

struct Node<K, V> {
    key: K,
    value: V,
    weight: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU list bounded by total entry weight
pub struct LruCache<K, V> {
    map: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: u64,
    used: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty list holding at most `capacity` weight units
    pub fn new(capacity: u64) -> Self {
        Self {
            map: HashMap::with_hasher(RandomState::new()),
            nodes: Vec::new(),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
            used: 0,
        }
    }

    /// Look up `key` and mark it most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Weight currently charged to `key`, without touching recency
    pub fn weight_of<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.nodes[idx].as_ref().map(|node| node.weight)
    }

    /// Insert or replace `key`, evicting from the tail until the list fits.
    ///
    /// `weight` must not exceed the capacity. Returns the number of entries
    /// evicted to make room.
    pub fn put(&mut self, key: K, value: V, weight: u64) -> usize {
        debug_assert!(weight <= self.capacity);

        if let Some(&idx) = self.map.get(&key) {
            if let Some(node) = &mut self.nodes[idx] {
                self.used = self.used - node.weight + weight;
                node.value = value;
                node.weight = weight;
            }
            self.move_to_front(idx);
            return self.shrink_to_capacity();
        }

        let mut evicted = 0;
        while self.used + weight > self.capacity && self.evict() {
            evicted += 1;
        }

        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            weight,
            prev: None,
            next: self.head,
        });

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }

        self.used += weight;
        self.map.insert(key, idx);
        evicted
    }

    /// Remove `key`, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.free_node(idx);
        self.used -= node.weight;
        Some(node.value)
    }

    /// Change the capacity, evicting as needed. Returns the eviction count.
    pub fn set_capacity(&mut self, capacity: u64) -> usize {
        self.capacity = capacity;
        let mut evicted = 0;
        while self.used > self.capacity && self.evict() {
            evicted += 1;
        }
        evicted
    }

    /// Weight budget
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Total weight of resident entries
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
        self.used = 0;
    }

    // Keeps the head, so an entry that was just written is never its own victim.
    fn shrink_to_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.used > self.capacity && self.tail != self.head && self.evict() {
            evicted += 1;
        }
        evicted
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }

        self.unlink(idx);

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn evict(&mut self) -> bool {
        let Some(tail_idx) = self.tail else {
            return false;
        };
        self.unlink(tail_idx);
        match self.nodes[tail_idx].take() {
            Some(node) => {
                self.map.remove(&node.key);
                self.used -= node.weight;
                self.free_node(tail_idx);
                true
            }
            None => false,
        }
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }

    fn free_node(&mut self, idx: usize) {
        self.free_list.push(idx);
    }
}
