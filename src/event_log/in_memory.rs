use super::*;
use parking_lot::{Condvar, Mutex};

pub struct InMemoryLog {
    events: Mutex<Vec<Event>>,
    new_event: Condvar,
}

impl Reader for InMemoryLog {
    fn get_start_offset(&self) -> Result<Offset> {
        Ok(0)
    }

    fn read(
        &self,
        start: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>> {
        let start_idx = usize::try_from(start)?;

        let mut events = self.events.lock();

        if events.len() <= start_idx {
            if let Some(timeout) = timeout {
                self.new_event.wait_for(&mut events, timeout);
            } else {
                self.new_event.wait(&mut events);
            }
        }

        let data: Vec<_> = events
            .get(start_idx..)
            .unwrap_or(&[])
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, details)| LogEvent {
                offset: start + i as Offset,
                details: details.clone(),
            })
            .collect();

        Ok(WithOffset {
            offset: start + data.len() as Offset,
            data,
        })
    }
}

impl Writer for InMemoryLog {
    fn write(&self, new_events: &[Event]) -> Result<Offset> {
        let mut events = self.events.lock();
        events.extend_from_slice(new_events);
        self.new_event.notify_all();
        Ok(events.len() as Offset)
    }
}

pub fn new_in_memory_shared() -> (SharedWriter, SharedReader) {
    let log = Arc::new(InMemoryLog {
        events: Mutex::new(Vec::new()),
        new_event: Condvar::new(),
    });
    (log.clone(), log)
}
