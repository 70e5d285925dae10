use crate::models::{ActorId, Direction, MotionState};
use crate::movement::Mover;
use crate::world::TileMap;

/// Detached movement simulator used by the search and the path watcher.
/// Never attached to a real actor.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    motion: MotionState,
    ignore: &'a [ActorId],
}

impl<'a> Cursor<'a> {
    pub fn new(motion: MotionState, ignore: &'a [ActorId]) -> Self {
        Self { motion, ignore }
    }

    /// Walks `moves` in order. On refusal returns the index of the failing
    /// move and leaves the cursor where it stopped.
    pub fn replay<M: TileMap + ?Sized>(&mut self, map: &M, moves: &[Direction]) -> Result<(), usize> {
        for (i, dir) in moves.iter().enumerate() {
            if !self.step(map, *dir) {
                return Err(i);
            }
        }
        Ok(())
    }
}

impl Mover for Cursor<'_> {
    fn motion(&self) -> MotionState {
        self.motion
    }

    fn set_motion(&mut self, motion: MotionState) {
        self.motion = motion;
    }

    fn ignored(&self) -> &[ActorId] {
        self.ignore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMap;

    #[test]
    fn replay_reports_first_refused_move() {
        let m = GridMap::from_ascii(&["..#"]).unwrap();
        let mut c = Cursor::new(MotionState::at(0, 0, 0), &[]);
        assert_eq!(c.replay(&m, &[Direction::East, Direction::East]), Err(1));
        assert_eq!(c.motion().x, 1);
    }

    #[test]
    fn replay_matches_single_steps() {
        let m = GridMap::from_ascii(&["...", "...", "..."]).unwrap();
        let moves = [Direction::South, Direction::East, Direction::East, Direction::South];
        let mut c = Cursor::new(MotionState::at(0, 0, 0), &[]);
        assert!(c.replay(&m, &moves).is_ok());
        assert_eq!((c.motion().x, c.motion().y), (2, 2));
    }
}
