use super::*;
use loom::sync::Arc;
use loom::thread;

/// Two producers race for slots; every pushed value must land exactly once.
#[test]
fn concurrent_pushes_all_land() {
    loom::model(|| {
        let ring = Arc::new(Ring::with_capacity(4).unwrap());

        let handles: Vec<_> = [0u32, 2]
            .into_iter()
            .map(|base| {
                let ring = ring.clone();
                thread::spawn(move || {
                    // Four pushes total into four slots: none may report full.
                    assert!(ring.try_push(base).is_ok());
                    assert!(ring.try_push(base + 1).is_ok());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut got = Vec::new();
        while let Some(value) = ring.try_pop() {
            got.push(value);
        }
        got.sort_unstable();
        assert_eq!(got, vec![0, 1, 2, 3]);
    });
}

/// Two consumers race for two elements; each element goes to exactly one.
#[test]
fn concurrent_pops_take_distinct_elements() {
    loom::model(|| {
        let ring = Arc::new(Ring::with_capacity(4).unwrap());
        ring.try_push(7).unwrap();
        ring.try_push(8).unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let ring = ring.clone();
                thread::spawn(move || ring.try_pop())
            })
            .collect();

        let mut got: Vec<u32> = handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .collect();
        got.sort_unstable();
        assert_eq!(got, vec![7, 8]);
    });
}

/// The release store on `seq` publishes the payload to the popping thread in
/// every interleaving, in order.
#[test]
fn producer_consumer_fifo() {
    loom::model(|| {
        let ring = Arc::new(Ring::with_capacity(4).unwrap());

        let producer = {
            let ring = ring.clone();
            thread::spawn(move || {
                for i in 0..3 {
                    while ring.try_push(i).is_err() {
                        thread::yield_now();
                    }
                }
            })
        };

        let mut got = Vec::new();
        while got.len() < 3 {
            match ring.try_pop() {
                Some(value) => got.push(value),
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();
        assert_eq!(got, vec![0, 1, 2]);
    });
}
