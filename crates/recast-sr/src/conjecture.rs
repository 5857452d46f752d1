//! Choice points of a backtracking search.
//!
//! The matcher never unwinds partial state. Every choice it makes (a Star
//! length, a Stuff candidate, a MatchAny alternative, a collection element)
//! goes through a [`Conjecture`], which replays the same decisions on the
//! next attempt up to the last one that still has alternatives, and advances
//! that one. A failed attempt is simply started over from the root with the
//! next conjecture, so enumeration order is the order of the options offered.

#[derive(Clone, Copy, Debug)]
struct Choice {
    taken: usize,
    count: usize,
}

#[derive(Debug, Default)]
pub struct Conjecture {
    choices: Vec<Choice>,
    cursor: usize,
}

impl Conjecture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start replaying from the first decision.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Pick one of `count` options. `None` when there is nothing to pick.
    pub fn choose(&mut self, count: usize) -> Option<usize> {
        if count == 0 {
            return None;
        }
        let taken = match self.choices.get(self.cursor) {
            Some(choice) => {
                debug_assert_eq!(
                    choice.count, count,
                    "decision {} replayed with a different number of options",
                    self.cursor
                );
                choice.taken
            }
            None => {
                self.choices.push(Choice { taken: 0, count });
                0
            }
        };
        self.cursor += 1;
        Some(taken)
    }

    /// Move to the next untried combination.
    ///
    /// Decisions after the point where the last attempt failed were never
    /// reached and are dropped. Returns `false` once every combination has
    /// been tried.
    pub fn advance(&mut self) -> bool {
        self.choices.truncate(self.cursor);
        while let Some(last) = self.choices.last_mut() {
            if last.taken + 1 < last.count {
                last.taken += 1;
                return true;
            }
            self.choices.pop();
        }
        false
    }

    /// Number of decisions made in the current attempt.
    pub fn depth(&self) -> usize {
        self.cursor
    }
}
