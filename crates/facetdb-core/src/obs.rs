//! Metrics boundary.
//!
//! Store and query paths record `MetricsEvent`s through a sink; the default
//! sink accumulates process-local counters. Tests (or embedders) install a
//! scoped sink override to observe events directly.

use serde::Serialize;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static STATE: RefCell<MetricsCounters> = RefCell::new(MetricsCounters::default());
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    EntityCreated,
    EntityRemoved,
    RecordsWritten { count: u64 },
    RecordUnset,
    Search { lanes: u64 },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

///
/// MetricsCounters
///
/// Snapshot of the process-local counters.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MetricsCounters {
    pub entities_created: u64,
    pub entities_removed: u64,
    pub records_written: u64,
    pub records_unset: u64,
    pub searches: u64,
    pub search_lanes: u64,
}

/// Default sink writing into the process-local counter state.
struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        STATE.with(|state| {
            let mut m = state.borrow_mut();
            match event {
                MetricsEvent::EntityCreated => {
                    m.entities_created = m.entities_created.saturating_add(1);
                }
                MetricsEvent::EntityRemoved => {
                    m.entities_removed = m.entities_removed.saturating_add(1);
                }
                MetricsEvent::RecordsWritten { count } => {
                    m.records_written = m.records_written.saturating_add(count);
                }
                MetricsEvent::RecordUnset => {
                    m.records_unset = m.records_unset.saturating_add(1);
                }
                MetricsEvent::Search { lanes } => {
                    m.searches = m.searches.saturating_add(1);
                    m.search_lanes = m.search_lanes.saturating_add(lanes);
                }
            }
        });
    }
}

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GlobalMetricsSink.record(event),
    }
}

/// Run a closure with a temporary metrics sink override. The previous sink
/// is restored on every exit path, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0.take();
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

/// Snapshot the current counters.
#[must_use]
pub fn metrics_report() -> MetricsCounters {
    STATE.with(|state| *state.borrow())
}

/// Reset all counters.
pub fn metrics_reset_all() {
    STATE.with(|state| {
        *state.borrow_mut() = MetricsCounters::default();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        cell::Cell,
        panic::{AssertUnwindSafe, catch_unwind},
    };

    struct CountingSink {
        calls: Cell<u64>,
    }

    impl MetricsSink for CountingSink {
        fn record(&self, _: MetricsEvent) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    fn counting_sink() -> Rc<CountingSink> {
        Rc::new(CountingSink {
            calls: Cell::new(0),
        })
    }

    #[test]
    fn global_counters_accumulate_per_event() {
        metrics_reset_all();

        record(MetricsEvent::EntityCreated);
        record(MetricsEvent::RecordsWritten { count: 3 });
        record(MetricsEvent::Search { lanes: 2 });
        record(MetricsEvent::Search { lanes: 1 });

        let report = metrics_report();
        assert_eq!(report.entities_created, 1);
        assert_eq!(report.records_written, 3);
        assert_eq!(report.searches, 2);
        assert_eq!(report.search_lanes, 3);
    }

    #[test]
    fn reset_clears_every_counter() {
        record(MetricsEvent::EntityCreated);
        metrics_reset_all();

        assert_eq!(metrics_report(), MetricsCounters::default());
    }

    #[test]
    fn override_routes_events_away_from_the_global_state() {
        metrics_reset_all();
        let sink = counting_sink();

        with_metrics_sink(sink.clone(), || {
            record(MetricsEvent::EntityCreated);
            record(MetricsEvent::EntityRemoved);
        });

        assert_eq!(sink.calls.get(), 2);
        assert_eq!(metrics_report(), MetricsCounters::default());

        // Override gone: the global state sees events again.
        record(MetricsEvent::EntityCreated);
        assert_eq!(metrics_report().entities_created, 1);
        assert_eq!(sink.calls.get(), 2);
    }

    #[test]
    fn nested_overrides_restore_the_outer_sink() {
        metrics_reset_all();
        let outer = counting_sink();
        let inner = counting_sink();

        with_metrics_sink(outer.clone(), || {
            record(MetricsEvent::EntityCreated);

            with_metrics_sink(inner.clone(), || {
                record(MetricsEvent::EntityCreated);
            });

            record(MetricsEvent::EntityCreated);
        });

        assert_eq!(outer.calls.get(), 2);
        assert_eq!(inner.calls.get(), 1);
    }

    #[test]
    fn override_is_restored_on_panic() {
        metrics_reset_all();
        let sink = counting_sink();

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(sink.clone(), || {
                record(MetricsEvent::EntityCreated);
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();

        assert!(panicked);
        assert_eq!(sink.calls.get(), 1);

        record(MetricsEvent::EntityRemoved);
        assert_eq!(metrics_report().entities_removed, 1);
    }
}
