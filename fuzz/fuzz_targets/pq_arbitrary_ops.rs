#![no_main]

use libfuzzer_sys::fuzz_target;
use queuekit::config::QueueConfig;
use queuekit::queue::pq::PriorityQueue;

// Fuzz arbitrary push/pop sequences against a sorted-model oracle.
//
// The small configuration keeps buffers tiny so short inputs already reach
// min-buffer flushes, backend splits, and refills.
fuzz_target!(|data: &[u8]| {
    let cfg = match QueueConfig::try_new(64, 4) {
        Ok(cfg) => cfg,
        Err(_) => return,
    };
    let mut pq: PriorityQueue<i64> = PriorityQueue::with_config(cfg);
    let mut model: Vec<i64> = Vec::new();

    let mut idx = 0;
    while idx + 2 < data.len() {
        let op = data[idx] % 4;
        let key = i64::from(u16::from_le_bytes([data[idx + 1], data[idx + 2]])) + 1;
        idx += 3;

        match op {
            // push dominates so the queue actually grows
            0 | 1 | 2 => {
                pq.push(key);
                let pos = model.partition_point(|&m| m <= key);
                model.insert(pos, key);
            }
            _ => {
                if !model.is_empty() {
                    assert_eq!(pq.pop(), model.remove(0));
                }
            }
        }
        assert_eq!(pq.len(), model.len());
    }

    for expected in model {
        assert_eq!(pq.pop(), expected);
    }
    assert!(pq.is_empty());
});
