//! Property test for the replay-equivalence law:
//! replaying a committed event stream must reproduce the state observed
//! live.

use async_trait::async_trait;
use eventure_core::{Aggregate, AggregateState, Command, Event, EventStream, Id, Result};
use proptest::prelude::*;

#[derive(Default)]
struct Counter {
    state: AggregateState,
    total: i64,
}

#[async_trait]
impl Aggregate for Counter {
    fn state(&self) -> &AggregateState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut AggregateState {
        &mut self.state
    }

    async fn handle(&mut self, cmd: Command) -> Result<()> {
        let amount = cmd.payload.and_then(|v| v.as_i64()).unwrap_or(0);
        self.emit("adjusted", Some(serde_json::json!(amount)));
        Ok(())
    }

    fn mutate(&mut self, event: &Event) {
        if event.message_type == "adjusted" {
            self.total += event.payload.as_ref().and_then(|v| v.as_i64()).unwrap_or(0);
        }
    }
}

fn new_counter(id: &str) -> Counter {
    Counter {
        state: AggregateState::new(Id::from(id)),
        total: 0,
    }
}

proptest! {
    #[test]
    fn replay_reproduces_live_state(amounts in proptest::collection::vec(-100i64..100, 0..50)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let mut live = new_counter("c1");
            for amount in &amounts {
                live.handle(Command::new("adjust").with_payload(serde_json::json!(amount)))
                    .await
                    .unwrap();
            }

            let events: EventStream = live.changes().to_vec();
            let mut replayed = new_counter("c1");
            eventure_core::apply_history(&mut replayed, &events);

            prop_assert_eq!(replayed.version(), live.version());
            prop_assert_eq!(replayed.total, live.total);
            Ok(())
        })?;
    }
}
