//! Default event validation.

use crate::error::{Error, Result};
use crate::message::Event;

/// A caller-supplied validator overriding [`validate_event`].
pub type Validator = Box<dyn Fn(&Event) -> Result<()> + Send + Sync>;

/// The default structural validation applied to every non-snapshot event
/// passed to `EventStore::commit`: `type` is non-empty, at least one of
/// `aggregate_id`/`saga_id` is set, and `saga_version` is defined whenever
/// `saga_id` is.
pub fn validate_event(event: &Event) -> Result<()> {
    if event.message_type.is_empty() {
        return Err(Error::InvalidEvent("event type must not be empty".into()));
    }
    if event.aggregate_id.is_none() && event.saga_id.is_none() {
        return Err(Error::InvalidEvent(
            "event must carry at least one of aggregate_id or saga_id".into(),
        ));
    }
    if event.saga_id.is_some() && event.saga_version.is_none() {
        return Err(Error::InvalidEvent(
            "event carrying saga_id must also carry saga_version".into(),
        ));
    }
    Ok(())
}

/// Validates that `before_event` (the anchor for `EventStorage::get_saga_events`)
/// carries a `saga_version`.
pub fn validate_before_event(before_event: &Event) -> Result<()> {
    if before_event.saga_version.is_none() {
        return Err(Error::InvalidArgument(
            "before_event must carry saga_version".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn rejects_empty_type() {
        let mut event = Message::new("").with_aggregate_id("a1");
        event.message_type.clear();
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn rejects_event_with_neither_aggregate_nor_saga_id() {
        let event = Message::new("x");
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn rejects_saga_id_without_saga_version() {
        let event = Message::new("x").with_saga_id("s1");
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn accepts_well_formed_event() {
        let event = Message::new("x").with_aggregate_id("a1").with_aggregate_version(1);
        assert!(validate_event(&event).is_ok());

        let event = Message::new("x").with_saga_id("s1").with_saga_version(0);
        assert!(validate_event(&event).is_ok());
    }
}
