//! Fixed-capacity container for the K nearest candidates.

use std::cmp::Ordering;

/// What happened to an offered candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Offer<T> {
    /// Retained without displacing anything.
    Inserted,
    /// Retained; the returned candidate was evicted to make room.
    Evicted(T),
    /// Not retained; the candidate is handed back.
    Rejected(T),
}

impl<T> Offer<T> {
    pub fn is_retained(&self) -> bool {
        !matches!(self, Offer::Rejected(_))
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    item: T,
    distance: f64,
}

/// Keeps the `capacity` smallest-distance candidates offered to it.
///
/// Entries are held in ascending distance order. Equal distances keep their
/// offer order, so an earlier offer ranks ahead of a later one and the later
/// one is evicted first. Distances compare with [`f64::total_cmp`]; NaN sorts
/// after every other value.
///
/// # Examples
///
/// ```rust
/// use geoscan::compute::spatial::topk::BoundedTopK;
///
/// let mut top = BoundedTopK::new(2);
/// top.offer("far", 30.0);
/// top.offer("near", 10.0);
/// top.offer("middle", 20.0);
///
/// let ranked: Vec<_> = top.drain().into_iter().map(|(item, _)| item).collect();
/// assert_eq!(ranked, vec!["near", "middle"]);
/// ```
#[derive(Debug, Clone)]
pub struct BoundedTopK<T> {
    capacity: usize,
    entries: Vec<Entry<T>>,
}

impl<T> BoundedTopK<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity.saturating_add(1).min(1024)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once `capacity` candidates are held.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Distance of the candidate that would be evicted next.
    pub fn worst_distance(&self) -> Option<f64> {
        self.entries.last().map(|entry| entry.distance)
    }

    /// Insert a candidate, evicting the worst one if the capacity is exceeded.
    pub fn offer(&mut self, item: T, distance: f64) -> Offer<T> {
        if self.capacity == 0 {
            return Offer::Rejected(item);
        }

        if self.is_full()
            && let Some(worst) = self.worst_distance()
            && distance.total_cmp(&worst) != Ordering::Less
        {
            return Offer::Rejected(item);
        }

        let position = self
            .entries
            .partition_point(|entry| entry.distance.total_cmp(&distance) != Ordering::Greater);
        self.entries.insert(position, Entry { item, distance });

        if self.entries.len() > self.capacity {
            match self.entries.pop() {
                Some(evicted) => Offer::Evicted(evicted.item),
                None => Offer::Inserted,
            }
        } else {
            Offer::Inserted
        }
    }

    /// Remove the first held candidate matching `predicate`.
    pub fn remove_first(&mut self, predicate: impl Fn(&T) -> bool) -> Option<(T, f64)> {
        let position = self.entries.iter().position(|entry| predicate(&entry.item))?;
        let entry = self.entries.remove(position);
        Some((entry.item, entry.distance))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over the held candidates in ascending distance order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> {
        self.entries.iter().map(|entry| (&entry.item, entry.distance))
    }

    /// Remove and return every candidate, nearest first.
    pub fn drain(&mut self) -> Vec<(T, f64)> {
        self.entries
            .drain(..)
            .map(|entry| (entry.item, entry.distance))
            .collect()
    }
}
