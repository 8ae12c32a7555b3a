//! Uniform bucket grid over the arena for neighbor and collision queries.

use cellsim_core::{Arena, CellId, Position};

/// Each bucket holds `(id, position)` for the cells inside it, in insertion
/// order. Callers must `relocate` on every move and `remove` before dropping
/// a cell; the index has no other way to learn about either.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    bucket_size: i32,
    columns: i32,
    rows: i32,
    buckets: Vec<Vec<(CellId, Position)>>,
    len: usize,
}

impl SpatialIndex {
    pub fn new(arena: &Arena) -> Self {
        let columns = arena.width / arena.bucket_size + 1;
        let rows = arena.height / arena.bucket_size + 1;
        Self {
            bucket_size: arena.bucket_size,
            columns,
            rows,
            buckets: vec![Vec::new(); (columns * rows) as usize],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }

    /// Bucket coordinates of a position, clamped into the grid
    pub fn bucket_of(&self, pos: Position) -> (i32, i32) {
        let bx = pos.x.div_euclid(self.bucket_size).clamp(0, self.columns - 1);
        let by = pos.y.div_euclid(self.bucket_size).clamp(0, self.rows - 1);
        (bx, by)
    }

    fn slot(&self, bx: i32, by: i32) -> usize {
        (bx * self.rows + by) as usize
    }

    fn slot_of(&self, pos: Position) -> usize {
        let (bx, by) = self.bucket_of(pos);
        self.slot(bx, by)
    }

    pub fn insert(&mut self, id: CellId, pos: Position) {
        let slot = self.slot_of(pos);
        self.buckets[slot].push((id, pos));
        self.len += 1;
    }

    /// Returns false if the id was not indexed at `pos`'s bucket.
    pub fn remove(&mut self, id: CellId, pos: Position) -> bool {
        let slot = self.slot_of(pos);
        let bucket = &mut self.buckets[slot];
        match bucket.iter().position(|(entry, _)| *entry == id) {
            Some(i) => {
                bucket.remove(i);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Record a move from `old` to `new`. Only changes bucket membership when
    /// the bucket actually changes; the stored position is always refreshed.
    pub fn relocate(&mut self, id: CellId, old: Position, new: Position) {
        let old_slot = self.slot_of(old);
        let new_slot = self.slot_of(new);

        if old_slot == new_slot {
            if let Some(entry) = self.buckets[old_slot].iter_mut().find(|(e, _)| *e == id) {
                entry.1 = new;
            }
            return;
        }

        let bucket = &mut self.buckets[old_slot];
        if let Some(i) = bucket.iter().position(|(entry, _)| *entry == id) {
            bucket.remove(i);
            self.buckets[new_slot].push((id, new));
        }
    }

    /// Every indexed cell in the 3x3 block of buckets around `pos`'s bucket,
    /// column-major, clamped at the arena edges.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = (CellId, Position)> + '_ {
        let (bx, by) = self.bucket_of(pos);
        let xs = (bx - 1).max(0)..=(bx + 1).min(self.columns - 1);
        xs.flat_map(move |i| {
            let ys = (by - 1).max(0)..=(by + 1).min(self.rows - 1);
            ys.map(move |j| self.slot(i, j))
        })
        .flat_map(move |slot| self.buckets[slot].iter().copied())
    }

    /// Id of an indexed cell sitting exactly on `pos`, other than `exclude`
    pub fn occupant_at(&self, pos: Position, exclude: Option<CellId>) -> Option<CellId> {
        self.neighbors(pos)
            .find(|(id, p)| *p == pos && Some(*id) != exclude)
            .map(|(id, _)| id)
    }

    pub fn contains(&self, id: CellId, pos: Position) -> bool {
        self.buckets[self.slot_of(pos)]
            .iter()
            .any(|(entry, p)| *entry == id && *p == pos)
    }
}
