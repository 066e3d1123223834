use crate::stream::{BoxedSeekStream, SeekStream};

///
/// Union
///
/// Sorted merge over many ascending streams: yields the lowest current
/// value, advances every lane sitting on it, and ends only once every lane
/// is exhausted. Values shared by several lanes are produced once.
///

pub struct Union<'a, T> {
    lanes: Vec<Lane<'a, T>>,
    primed: bool,
}

struct Lane<'a, T> {
    stream: BoxedSeekStream<'a, T>,
    current: Option<T>,
}

impl<'a, T> Union<'a, T>
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
        }
    }

    fn prime(&mut self) {
        for lane in &mut self.lanes {
            lane.current = lane.stream.next();
        }
        self.primed = true;
    }
}

impl<T> SeekStream for Union<'_, T>
where
    T: Clone + Ord,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if !self.primed {
            self.prime();
        }

        let lowest = self
            .lanes
            .iter()
            .filter_map(|lane| lane.current.as_ref())
            .min()
            .cloned()?;

        for lane in &mut self.lanes {
            if lane.current.as_ref() == Some(&lowest) {
                lane.current = lane.stream.next();
            }
        }

        Some(lowest)
    }

    fn seek(&mut self, to: &T) {
        if !self.primed {
            for lane in &mut self.lanes {
                lane.stream.seek(to);
            }
            return;
        }

        for lane in &mut self.lanes {
            if lane.current.as_ref().is_some_and(|v| v < to) {
                lane.stream.seek(to);
                lane.current = lane.stream.next();
            }
        }
    }
}
