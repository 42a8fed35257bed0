//! Scoped worker pool

use std::panic;
use std::sync::Mutex;
use std::thread;

/// Apply `f` to every item on up to `workers` threads.
///
/// Results come back in input order. Runs inline when one worker or one
/// item is enough. A panic in `f` is re-raised on the calling thread.
pub fn map_parallel<T, R, F>(workers: usize, items: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));
    if workers == 1 {
        return items.into_iter().map(f).collect();
    }

    let total = items.len();
    let queue = Mutex::new(items.into_iter().enumerate());
    let f = &f;
    let queue = &queue;

    let mut indexed: Vec<(usize, R)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let next = match queue.lock() {
                            Ok(mut q) => q.next(),
                            Err(poisoned) => poisoned.into_inner().next(),
                        };
                        let Some((index, item)) = next else { break };
                        done.push((index, f(item)));
                    }
                    done
                })
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        for handle in handles {
            match handle.join() {
                Ok(done) => results.extend(done),
                Err(payload) => panic::resume_unwind(payload),
            }
        }
        results
    });

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}
