//! Ledger worker: turns request events into ledger calls and response events.
//!
//! A single processor drains the request subject in order, which is what
//! serializes all ledger mutations.

use anyhow::Result;
use futures_util::StreamExt;

use crate::bus::{publish_response, Bus};
use crate::event::{
    ChangedAnnounce, ChangedKarma, CheckedBoard, CheckedKarma, Event, RequestBumpKarma,
    RequestChangeAnnounce, RequestCheckBoard, RequestCheckKarma,
};
use crate::ledger::{Ledger, LedgerStore};
use crate::logging::{
    debug, error, info, log_discarded_event, log_transport_failure, obj, v_str, Domain,
};
use crate::shutdown::Shutdown;

pub struct Processor<S> {
    ledger: Ledger<S>,
}

impl<S: LedgerStore> Processor<S> {
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    /// Apply one request. Returns the response to publish, if any.
    ///
    /// A karma change yields no response when nothing changed or when the
    /// guild has announcements turned off; the mutation still happens.
    pub fn handle(&mut self, event: Event) -> Result<Option<Event>> {
        let response = match event {
            Event::RequestChangeAnnounce(RequestChangeAnnounce { react_to, guild_id, no_announce }) => {
                self.ledger.set_announce(&guild_id, !no_announce)?;
                info(
                    Domain::Ledger,
                    "announce_changed",
                    obj(&[("guild_id", v_str(&guild_id)), ("announce", (!no_announce).into())]),
                );
                Some(Event::ChangedAnnounce(ChangedAnnounce { react_to }))
            }
            Event::RequestBumpKarma(RequestBumpKarma { reply_to, guild_id, subjects }) => {
                let bumped = self.ledger.bump_karma(&guild_id, &subjects)?;
                if bumped.entries.is_empty() || !bumped.announce {
                    None
                } else {
                    Some(Event::ChangedKarma(ChangedKarma {
                        reply_to,
                        announce: bumped.announce,
                        entries: bumped.entries,
                    }))
                }
            }
            Event::RequestCheckKarma(RequestCheckKarma { reply_to, guild_id, names }) => {
                let entries = self.ledger.check_karma(&guild_id, &names)?;
                Some(Event::CheckedKarma(CheckedKarma { reply_to, entries }))
            }
            Event::RequestCheckLeaderboard(RequestCheckBoard { reply_to, guild_id, limit }) => {
                let board = self.ledger.leaderboard(&guild_id, limit)?;
                Some(Event::CheckedLeaderboard(CheckedBoard { reply_to, board }))
            }
            Event::RequestCheckLoserboard(RequestCheckBoard { reply_to, guild_id, limit }) => {
                let board = self.ledger.loserboard(&guild_id, limit)?;
                Some(Event::CheckedLoserboard(CheckedBoard { reply_to, board }))
            }
            other => anyhow::bail!("{} is not a request", other.name()),
        };
        Ok(response)
    }

    /// Drain `request_subject` until shutdown.
    pub async fn run(mut self, bus: &dyn Bus, request_subject: &str, mut shutdown: Shutdown) -> Result<()> {
        let mut requests = bus.subscribe(request_subject).await?;
        info(Domain::System, "processor_started", obj(&[("subject", v_str(request_subject))]));

        loop {
            let delivery = tokio::select! {
                _ = shutdown.wait() => break,
                next = requests.next() => match next {
                    Some(d) => d,
                    None => {
                        info(Domain::Bus, "request_stream_closed", obj(&[]));
                        break;
                    }
                },
            };

            let event = match Event::decode(&delivery.payload) {
                Ok(event) => event,
                Err(err) => {
                    log_discarded_event(&delivery.subject, &err);
                    continue;
                }
            };
            debug(Domain::Event, "request", obj(&[("kind", v_str(event.name()))]));

            match self.handle(event) {
                Ok(Some(response)) => {
                    if let Err(err) = publish_response(bus, &response).await {
                        log_transport_failure(Domain::Bus, "publish_response", &err);
                    }
                }
                Ok(None) => {}
                Err(err) => error(
                    Domain::Ledger,
                    "request_failed",
                    obj(&[("subject", v_str(&delivery.subject)), ("msg", v_str(&err.to_string()))]),
                ),
            }
        }

        info(Domain::System, "processor_stopped", obj(&[]));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Entry, ReactTo, ReplyTo};
    use crate::ledger::MemoryStore;
    use crate::subject::Subject;

    fn processor() -> Processor<MemoryStore> {
        Processor::new(Ledger::new(MemoryStore::default()))
    }

    fn reply() -> ReplyTo {
        ReplyTo { channel_id: "c".into() }
    }

    fn bump(subjects: Vec<Subject>) -> Event {
        Event::RequestBumpKarma(RequestBumpKarma { reply_to: reply(), guild_id: "g".into(), subjects })
    }

    fn announce(on: bool) -> Event {
        Event::RequestChangeAnnounce(RequestChangeAnnounce {
            react_to: ReactTo { channel_id: "c".into(), message_id: "m".into() },
            guild_id: "g".into(),
            no_announce: !on,
        })
    }

    #[test]
    fn bump_replies_with_resulting_karma() {
        let mut p = processor();
        let out = p.handle(bump(vec![Subject::new("rust", 2)])).unwrap();
        assert_eq!(
            out,
            Some(Event::ChangedKarma(ChangedKarma {
                reply_to: reply(),
                announce: true,
                entries: vec![Entry::new("rust", 2)],
            }))
        );
    }

    #[test]
    fn announce_off_suppresses_reply_but_mutates() {
        let mut p = processor();
        assert!(matches!(p.handle(announce(false)).unwrap(), Some(Event::ChangedAnnounce(_))));
        assert_eq!(p.handle(bump(vec![Subject::new("rust", 1)])).unwrap(), None);
        assert_eq!(p.ledger().store().karma("g", "rust").unwrap(), Some(1));

        p.handle(announce(true)).unwrap();
        assert!(p.handle(bump(vec![Subject::new("rust", 1)])).unwrap().is_some());
    }

    #[test]
    fn overflowing_bump_fails_and_keeps_balance() {
        let mut p = processor();
        let payload = br#"{"request_bump_karma":{"reply_to":{"channel_id":"c"},"guild_id":"g",
            "subjects":[{"name":"a","karma":9223372036854775807}]}}"#;
        assert!(p.handle(Event::decode(payload).unwrap()).unwrap().is_some());
        assert!(p.handle(Event::decode(payload).unwrap()).is_err());
        assert_eq!(p.ledger().store().karma("g", "a").unwrap(), Some(i64::MAX));

        assert!(p.handle(bump(vec![Subject::new("b", 1)])).unwrap().is_some());
    }

    #[test]
    fn net_zero_bump_has_no_reply() {
        let mut p = processor();
        let out = p
            .handle(bump(vec![Subject::new("alice", 2), Subject::new("alice", -2)]))
            .unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn check_and_boards() {
        let mut p = processor();
        p.handle(bump(vec![Subject::new("a", 5), Subject::new("b", 3), Subject::new("c", 5)]))
            .unwrap();

        let out = p
            .handle(Event::RequestCheckKarma(RequestCheckKarma {
                reply_to: reply(),
                guild_id: "g".into(),
                names: vec!["b".into(), "zed".into()],
            }))
            .unwrap();
        assert_eq!(
            out,
            Some(Event::CheckedKarma(CheckedKarma {
                reply_to: reply(),
                entries: vec![Entry::new("b", 3), Entry::new("zed", 0)],
            }))
        );

        let out = p
            .handle(Event::RequestCheckLoserboard(RequestCheckBoard {
                reply_to: reply(),
                guild_id: "g".into(),
                limit: 1,
            }))
            .unwrap();
        assert_eq!(
            out,
            Some(Event::CheckedLoserboard(CheckedBoard { reply_to: reply(), board: vec![Entry::new("b", 3)] }))
        );
    }

    #[test]
    fn responses_are_rejected_as_requests() {
        let mut p = processor();
        let stray = Event::ChangedAnnounce(ChangedAnnounce {
            react_to: ReactTo { channel_id: "c".into(), message_id: "m".into() },
        });
        assert!(p.handle(stray).is_err());
    }
}
