//! Uniform grid over the XZ plane for broad-phase neighbor lookup.
//!
//! Each entity is registered in exactly one cell, the one containing its
//! center. [`SpatialIndex::query`] returns every id registered in the 3×3
//! block of cells around the query point. That is a superset of the entities
//! whose center lies within one cell width of the point; callers still run an
//! exact AABB test on the result.
//!
//! Cell keys pack the signed cell coordinates into the two halves of a `u64`,
//! so distinct cells never share a key and the key decodes back to its
//! coordinates.

use std::collections::HashMap;

use crate::entity::EntityId;

/// Default cell width, larger than the biggest expected entity footprint.
pub const DEFAULT_CELL_SIZE: f64 = 8.0;

/// Packed cell coordinate.
pub type CellKey = u64;

/// Pack `(cx, cz)` into a key: `[cx: i32 | cz: i32]`.
#[inline]
pub fn pack_cell(cx: i32, cz: i32) -> CellKey {
    ((cx as u32 as u64) << 32) | cz as u32 as u64
}

/// Inverse of [`pack_cell`].
#[inline]
pub fn unpack_cell(key: CellKey) -> (i32, i32) {
    ((key >> 32) as u32 as i32, key as u32 as i32)
}

// ---------------------------------------------------------------------------
// SpatialIndex
// ---------------------------------------------------------------------------

/// Uniform-grid spatial hash keyed by entity id.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    /// Cell key -> ids registered in that cell, in insertion order.
    cells: HashMap<CellKey, Vec<EntityId>>,
    /// Reverse map so `remove`/`update` need no position.
    membership: HashMap<EntityId, CellKey>,
}

impl SpatialIndex {
    /// Create an empty index. Non-positive or non-finite sizes fall back to
    /// [`DEFAULT_CELL_SIZE`].
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            membership: HashMap::new(),
        }
    }

    /// Cell width in world units.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Cell coordinates containing `(x, z)`.
    ///
    /// Coordinates outside the `i32` cell range saturate at the edge cells.
    pub fn cell_coords(&self, x: f64, z: f64) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (z / self.cell_size).floor() as i32,
        )
    }

    /// Key of the cell containing `(x, z)`.
    pub fn cell_key(&self, x: f64, z: f64) -> CellKey {
        let (cx, cz) = self.cell_coords(x, z);
        pack_cell(cx, cz)
    }

    /// Register `id` at `(x, z)`. Re-inserting a known id moves it.
    pub fn insert(&mut self, id: EntityId, x: f64, z: f64) {
        let key = self.cell_key(x, z);
        if let Some(&old) = self.membership.get(&id) {
            if old == key {
                return;
            }
            self.detach(&id, old);
        }
        self.cells.entry(key).or_default().push(id.clone());
        self.membership.insert(id, key);
    }

    /// Unregister `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: &EntityId) {
        if let Some(key) = self.membership.remove(id) {
            self.detach(id, key);
        }
    }

    /// Move `id` to `(x, z)`.
    ///
    /// Does nothing when the cell is unchanged or the id was never inserted.
    pub fn update(&mut self, id: &EntityId, x: f64, z: f64) {
        let Some(&old) = self.membership.get(id) else {
            return;
        };
        let key = self.cell_key(x, z);
        if old == key {
            return;
        }
        self.detach(id, old);
        self.cells.entry(key).or_default().push(id.clone());
        self.membership.insert(id.clone(), key);
    }

    /// Ids in the 3×3 cell neighborhood of `(x, z)`.
    pub fn query(&self, x: f64, z: f64) -> Vec<EntityId> {
        let mut out = Vec::new();
        self.query_into(x, z, &mut out);
        out
    }

    /// Like [`query`](Self::query) but reuses `buf` (cleared first).
    ///
    /// Each cell is visited once, even where saturation at the `i32` edge
    /// folds neighbor offsets onto the same key.
    pub fn query_into(&self, x: f64, z: f64, buf: &mut Vec<EntityId>) {
        buf.clear();
        let (cx, cz) = self.cell_coords(x, z);
        let mut visited = [0 as CellKey; 9];
        let mut count = 0;
        for dx in -1..=1 {
            for dz in -1..=1 {
                let key = pack_cell(cx.saturating_add(dx), cz.saturating_add(dz));
                if visited[..count].contains(&key) {
                    continue;
                }
                visited[count] = key;
                count += 1;
                if let Some(ids) = self.cells.get(&key) {
                    buf.extend(ids.iter().cloned());
                }
            }
        }
    }

    /// The cell `id` is registered in, if any.
    pub fn cell_of(&self, id: &EntityId) -> Option<CellKey> {
        self.membership.get(id).copied()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.membership.contains_key(id)
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.membership.len()
    }

    /// Whether no ids are registered.
    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    /// Number of non-empty cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.membership.clear();
    }

    fn detach(&mut self, id: &EntityId, key: CellKey) {
        if let Some(ids) = self.cells.get_mut(&key) {
            ids.retain(|other| other != id);
            if ids.is_empty() {
                self.cells.remove(&key);
            }
        }
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}
