use chrono::{TimeZone, Utc};
use eventflow_core::EventRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random walks over `event_count` event names, one walk per case.
///
/// Seeded so repeated runs measure the same log.
pub fn generate_synthetic_log(case_count: usize, event_count: usize, walk_len: usize) -> Vec<EventRecord> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut log = Vec::with_capacity(case_count * walk_len);
    for case in 0..case_count {
        let case_id = format!("case_{case}");
        let mut current = 0;
        for step in 0..walk_len {
            let timestamp = Utc.timestamp_opt(step as i64, 0).single().unwrap_or_default();
            log.push(EventRecord::new(format!("event_{current}"), case_id.clone(), timestamp));
            // Mostly move forward so the graph looks like a funnel.
            current = if rng.gen_bool(0.8) {
                (current + 1) % event_count
            } else {
                rng.gen_range(0..event_count)
            };
        }
    }
    log
}
