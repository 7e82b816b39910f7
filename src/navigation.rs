use crate::entities::Cell;
use crate::world::GridWorld;
use std::collections::VecDeque;

/// Breadth-first step distances from every open cell to a target.
pub struct DistanceMap {
    width: usize,
    distances: Vec<Option<usize>>,
}

impl DistanceMap {
    /// Floods the open cells of the world starting at `target`.
    ///
    /// Recomputed whenever a target moves, which is cheap enough for maze sized grids.
    pub fn from_target(world: &GridWorld, target: Cell) -> DistanceMap {
        let width = world.width();
        let mut distances = vec![None; width * world.height()];

        if world.is_open(target) {
            let mut frontier = VecDeque::from([target]);
            distances[target.y * width + target.x] = Some(0);

            while let Some(cell) = frontier.pop_front() {
                let next = distances[cell.y * width + cell.x].map(|distance| distance + 1);
                for neighbor in world.open_neighbors(cell) {
                    let index = neighbor.y * width + neighbor.x;
                    if distances[index].is_none() {
                        distances[index] = next;
                        frontier.push_back(neighbor);
                    }
                }
            }
        }

        DistanceMap { width, distances }
    }

    /// Steps to the target, or `None` if it cannot be reached from `cell`.
    pub fn distance(&self, cell: Cell) -> Option<usize> {
        if cell.x >= self.width {
            return None;
        }
        self.distances
            .get(cell.y * self.width + cell.x)
            .copied()
            .flatten()
    }

    /// The open neighbours of `from` that are one step closer to the target.
    pub fn downhill(&self, world: &GridWorld, from: Cell) -> Vec<Cell> {
        let Some(current) = self.distance(from) else {
            return Vec::new();
        };

        world
            .open_neighbors(from)
            .into_iter()
            .filter(|neighbor| {
                self.distance(*neighbor)
                    .is_some_and(|distance| distance < current)
            })
            .collect()
    }
}
