use crate::api::types::LineId;
use crate::components::line::LinePiece;

/// Line piece storage using a flat Vec, in spawn order.
/// Pieces are addressed by `LineId`; nothing outside the arena holds a
/// reference to a piece across ticks.
pub struct LineArena {
    pieces: Vec<LinePiece>,
    next_id: u32,
}

impl LineArena {
    pub fn new() -> Self {
        Self {
            pieces: Vec::with_capacity(64),
            next_id: 1,
        }
    }

    /// Reserve the next unused id. Ids wrap back to 1 after
    /// `LineId::MAX_PACKED`, skipping any still on the board.
    pub fn alloc_id(&mut self) -> LineId {
        loop {
            let id = LineId(self.next_id);
            self.next_id = if self.next_id >= LineId::MAX_PACKED {
                1
            } else {
                self.next_id + 1
            };
            if self.get(id).is_none() {
                return id;
            }
        }
    }

    pub fn insert(&mut self, piece: LinePiece) {
        self.pieces.push(piece);
    }

    /// Remove a piece by id, keeping the order of the rest.
    pub fn remove(&mut self, id: LineId) -> Option<LinePiece> {
        let idx = self.pieces.iter().position(|p| p.id() == id)?;
        Some(self.pieces.remove(idx))
    }

    pub fn get(&self, id: LineId) -> Option<&LinePiece> {
        self.pieces.iter().find(|p| p.id() == id)
    }

    pub fn get_mut(&mut self, id: LineId) -> Option<&mut LinePiece> {
        self.pieces.iter_mut().find(|p| p.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinePiece> {
        self.pieces.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LinePiece> {
        self.pieces.iter_mut()
    }

    pub fn ids(&self) -> Vec<LineId> {
        self.pieces.iter().map(|p| p.id()).collect()
    }

    /// Drop every piece that has exited and finished lingering.
    /// Returns the ids removed.
    pub fn sweep_finished(&mut self) -> Vec<LineId> {
        let mut removed = Vec::new();
        self.pieces.retain(|p| {
            let done = p.is_finished();
            if done {
                removed.push(p.id());
            }
            !done
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Drop all pieces. Ids keep counting from where they were.
    pub fn clear(&mut self) {
        self.pieces.clear();
    }
}

impl Default for LineArena {
    fn default() -> Self {
        Self::new()
    }
}
