//! Bus behaviour under concurrent use from several threads.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use roc_events::{EnemyKilled, EventBus, ScoreChanged};

#[test]
fn concurrent_fires_reach_every_handler() {
    let bus = Arc::new(EventBus::new());
    let total = Arc::new(AtomicU64::new(0));
    for _ in 0..3 {
        let total = Arc::clone(&total);
        bus.subscribe::<EnemyKilled, _>(move |e| {
            total.fetch_add(u64::from(e.points), Ordering::SeqCst);
        });
    }

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                for _ in 0..100 {
                    bus.fire(EnemyKilled { points: 1 });
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(total.load(Ordering::SeqCst), 1200);
    assert_eq!(bus.subscriber_count::<EnemyKilled>(), 3);
}

#[test]
fn subscribers_churn_while_other_threads_fire() {
    let bus = Arc::new(EventBus::new());
    let seen = Arc::new(AtomicU64::new(0));
    let sink = Arc::clone(&seen);
    bus.subscribe::<ScoreChanged, _>(move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    let firing = {
        let bus = Arc::clone(&bus);
        thread::spawn(move || {
            for score in 0..200 {
                bus.fire(ScoreChanged { score });
            }
        })
    };
    let churning = {
        let bus = Arc::clone(&bus);
        thread::spawn(move || {
            for _ in 0..200 {
                let id = bus.subscribe::<ScoreChanged, _>(|_| {});
                bus.unsubscribe::<ScoreChanged>(id);
            }
        })
    };
    firing.join().unwrap();
    churning.join().unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 200);
    assert_eq!(bus.subscriber_count::<ScoreChanged>(), 1);
}
