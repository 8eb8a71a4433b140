//! Writes a finished classification grid back into the world a batch at a
//! time, so no single tick does all of a region's writes.

use std::sync::Arc;

use glam::IVec3;

use crate::constants::CHUNK_SIZE;
use crate::inference::ClassificationGrid;
use crate::registry::TaskHandle;
use crate::tables::CategoryTables;
use crate::world::{WorldMut, chunk_coords};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutatorState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationEvent {
    Progress { percent: u32, changed: usize },
    Completed { changed: usize },
    Cancelled,
}

pub struct BatchedWorldMutator {
    grid: ClassificationGrid,
    origin_x: i32,
    origin_z: i32,
    task: TaskHandle,
    tables: Arc<CategoryTables>,
    batch_size: usize,
    next_index: usize,
    changed: usize,
    next_threshold: u32,
    state: MutatorState,
}

impl BatchedWorldMutator {
    pub fn new(
        grid: ClassificationGrid,
        origin_x: i32,
        origin_z: i32,
        task: TaskHandle,
        tables: Arc<CategoryTables>,
        batch_size: usize,
    ) -> Self {
        Self {
            grid,
            origin_x,
            origin_z,
            task,
            tables,
            batch_size: batch_size.max(1),
            next_index: 0,
            changed: 0,
            next_threshold: 10,
            state: MutatorState::Idle,
        }
    }

    pub fn state(&self) -> MutatorState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            MutatorState::Completed | MutatorState::Cancelled
        )
    }

    pub fn processed(&self) -> usize {
        self.next_index
    }

    pub fn changed(&self) -> usize {
        self.changed
    }

    /// Runs one batch. Cancellation is only checked here, before any write,
    /// so a batch that has started always finishes.
    pub fn step<W: WorldMut + ?Sized>(&mut self, world: &mut W) -> Vec<MutationEvent> {
        if self.is_finished() {
            return Vec::new();
        }
        if self.task.is_cancelled() {
            self.state = MutatorState::Cancelled;
            tracing::info!(
                "Generation for requester {} cancelled after {} cells",
                self.task.requester(),
                self.next_index
            );
            return vec![MutationEvent::Cancelled];
        }
        self.state = MutatorState::Running;

        let total = self.grid.len();
        let end = (self.next_index + self.batch_size).min(total);
        let min_y = world.min_y();

        for index in self.next_index..end {
            let (x, row, z) = self.grid.cell(index);
            let pos = IVec3::new(
                self.origin_x + x as i32,
                row as i32 + min_y,
                self.origin_z + z as i32,
            );
            let block = self.tables.decode(self.grid.get(x, row, z));
            // Covers air replacing air as well.
            if world.block(pos) == block {
                continue;
            }
            match world.set_block(pos, block, false) {
                Ok(()) => self.changed += 1,
                Err(err) => tracing::warn!(
                    "Error setting block at {},{},{}: {}",
                    pos.x,
                    pos.y,
                    pos.z,
                    err
                ),
            }
        }
        self.next_index = end;

        let mut events = Vec::new();
        let done = self.next_index >= total;
        let percent = if total == 0 {
            100
        } else {
            (self.next_index as u64 * 100 / total as u64) as u32
        };
        if percent >= self.next_threshold || done {
            events.push(MutationEvent::Progress {
                percent,
                changed: self.changed,
            });
            self.next_threshold = (percent / 10 + 1) * 10;
        }

        if done {
            self.state = MutatorState::Completed;
            self.refresh_region(world);
            tracing::info!(
                "Generation for requester {} complete, {} blocks changed",
                self.task.requester(),
                self.changed
            );
            events.push(MutationEvent::Completed {
                changed: self.changed,
            });
        }
        events
    }

    fn refresh_region<W: WorldMut + ?Sized>(&self, world: &mut W) {
        let (min_cx, min_cz) = chunk_coords(self.origin_x, self.origin_z);
        let (max_cx, max_cz) = chunk_coords(
            self.origin_x + CHUNK_SIZE - 1,
            self.origin_z + CHUNK_SIZE - 1,
        );
        for cx in min_cx..=max_cx {
            for cz in min_cz..=max_cz {
                world.refresh_chunk(cx, cz);
            }
        }
    }
}
