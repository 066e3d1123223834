use crate::stream::{BoxedSeekStream, SeekStream};

///
/// Intersect
///
/// K-way merge join with skip-ahead: repeatedly seek every lane to the
/// highest current value and yield only when all lanes agree on it exactly.
/// On posting-list-shaped inputs this jumps straight past runs that cannot
/// match instead of advancing one value at a time.
///
/// An empty lane list yields nothing. Any lane exhausting ends the stream:
/// the remaining intersection is necessarily empty.
///

pub struct Intersect<'a, T> {
    lanes: Vec<Lane<'a, T>>,
    primed: bool,
    done: bool,
}

struct Lane<'a, T> {
    stream: BoxedSeekStream<'a, T>,
    current: Option<T>,
}

impl<'a, T> Lane<'a, T>
where
    T: Clone + Ord,
{
    fn pull(&mut self) {
        self.current = self.stream.next();
    }

    /// Skip ahead to `to` if this lane is currently behind it.
    fn advance_to(&mut self, to: &T) {
        if self.current.as_ref().is_some_and(|v| v < to) {
            self.stream.seek(to);
            self.pull();
        }
    }
}

impl<'a, T> Intersect<'a, T>
where
    T: Clone + Ord,
{
    #[must_use]
    pub fn new(streams: Vec<BoxedSeekStream<'a, T>>) -> Self {
        let lanes = streams
            .into_iter()
            .map(|stream| Lane {
                stream,
                current: None,
            })
            .collect();

        Self {
            lanes,
            primed: false,
            done: false,
        }
    }

    fn prime(&mut self) {
        for lane in &mut self.lanes {
            lane.pull();
        }
        self.primed = true;
    }
}

impl<T> SeekStream for Intersect<'_, T>
where
    T: Clone + Ord,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.done || self.lanes.is_empty() {
            self.done = true;
            return None;
        }
        if !self.primed {
            self.prime();
        }

        loop {
            // One exhausted lane empties the whole intersection.
            if self.lanes.iter().any(|lane| lane.current.is_none()) {
                self.done = true;
                return None;
            }

            let Some(highest) = self
                .lanes
                .iter()
                .filter_map(|lane| lane.current.as_ref())
                .max()
                .cloned()
            else {
                self.done = true;
                return None;
            };

            let aligned = self
                .lanes
                .iter()
                .all(|lane| lane.current.as_ref() == Some(&highest));
            if aligned {
                for lane in &mut self.lanes {
                    lane.pull();
                }
                return Some(highest);
            }

            for lane in &mut self.lanes {
                lane.advance_to(&highest);
            }
        }
    }

    fn seek(&mut self, to: &T) {
        if self.done {
            return;
        }
        if !self.primed {
            // Not started yet: forward the hint so the first pulls begin at
            // the lower bound.
            for lane in &mut self.lanes {
                lane.stream.seek(to);
            }
            return;
        }

        for lane in &mut self.lanes {
            lane.advance_to(to);
        }
    }
}
