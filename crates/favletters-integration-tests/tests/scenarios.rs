//! Multi-tab scenarios over the in-process bus.
//!
//! Engines are driven by hand: a manual clock plus an explicit pump that
//! delivers every pending message until the bus is quiet.

use favletters_core::{
    Engine, EngineConfig, Inbox, LocalBus, LocalEndpoint, LocalInbox, ManualClock, MemoryStore,
    TextStore, Transport,
};
use favletters_node::FileStore;
use proptest::prelude::*;

const KEY: &str = "favletters_text";

struct Tab<S: TextStore = MemoryStore> {
    engine: Engine<LocalEndpoint, S, ManualClock>,
    inbox: LocalInbox,
}

fn open_tab<S: TextStore>(bus: &LocalBus, clock: &ManualClock, store: S) -> Tab<S> {
    let endpoint = bus.join();
    let inbox = endpoint.subscribe().unwrap();
    let engine = Engine::start(EngineConfig::default(), endpoint, store, clock.clone()).unwrap();
    Tab { engine, inbox }
}

/// Deliver until no tab has anything left to read.
fn pump<S: TextStore>(tabs: &mut [&mut Tab<S>]) {
    loop {
        let mut delivered = false;
        for tab in tabs.iter_mut() {
            while let Some(message) = tab.inbox.try_next() {
                tab.engine.on_message(message);
                delivered = true;
            }
        }
        if !delivered {
            break;
        }
    }
}

fn heartbeat_all<S: TextStore>(tabs: &mut [&mut Tab<S>]) {
    for tab in tabs.iter_mut() {
        tab.engine.heartbeat_tick().unwrap();
    }
    pump(tabs);
}

#[test]
fn newcomer_adopts_running_text_over_stale_storage() {
    let bus = LocalBus::new();
    let clock = ManualClock::new(1_000);

    let mut x = open_tab(&bus, &clock, MemoryStore::new());
    clock.advance(100);
    let mut y = open_tab(&bus, &clock, MemoryStore::with_value(KEY, "old"));
    assert_eq!(y.engine.text(), "old");

    pump(&mut [&mut x, &mut y]);

    assert_eq!(y.engine.text(), "FAV");
    assert_eq!(y.engine.store().get(KEY).unwrap().as_deref(), Some("FAV"));
    assert_eq!(x.engine.text(), "FAV");
}

#[test]
fn promotion_reorders_every_tab() {
    let bus = LocalBus::new();
    let clock = ManualClock::new(1_000);

    let mut y = open_tab(&bus, &clock, MemoryStore::new());
    clock.advance(1_000);
    let mut x = open_tab(&bus, &clock, MemoryStore::new());
    heartbeat_all(&mut [&mut y, &mut x]);

    assert_eq!(y.engine.local_index(), Some(0));
    assert_eq!(x.engine.local_index(), Some(1));

    let priority = x.engine.promote().unwrap();
    assert_eq!(priority, -1);
    pump(&mut [&mut y, &mut x]);

    assert_eq!(x.engine.local_index(), Some(0));
    assert_eq!(y.engine.local_index(), Some(1));
    assert_eq!(x.engine.ranking(), y.engine.ranking());
}

#[test]
fn silent_tab_is_evicted_after_threshold() {
    let bus = LocalBus::new();
    let clock = ManualClock::new(1_000);

    let mut a = open_tab(&bus, &clock, MemoryStore::new());
    let mut b = open_tab(&bus, &clock, MemoryStore::new());
    let mut gone = open_tab(&bus, &clock, MemoryStore::new());
    heartbeat_all(&mut [&mut a, &mut b, &mut gone]);
    assert_eq!(a.engine.peer_count(), 3);

    let gone_id = gone.engine.identity().id().clone();
    drop(gone);

    clock.advance(3_000);
    heartbeat_all(&mut [&mut a, &mut b]);
    assert!(a.engine.eviction_tick().is_empty());
    assert_eq!(a.engine.peer_count(), 3);

    clock.advance(1);
    assert_eq!(a.engine.eviction_tick(), vec![gone_id.clone()]);
    assert_eq!(b.engine.eviction_tick(), vec![gone_id]);
    assert_eq!(a.engine.peer_count(), 2);
    assert_eq!(b.engine.view().status_line(), "2 Active Tabs");
}

#[test]
fn each_tab_shows_the_letter_at_its_rank() {
    let bus = LocalBus::new();
    let clock = ManualClock::new(1_000);

    let mut x = open_tab(&bus, &clock, MemoryStore::new());
    clock.advance(50);
    let mut y = open_tab(&bus, &clock, MemoryStore::new());
    heartbeat_all(&mut [&mut x, &mut y]);

    x.engine.set_local_text("ABC").unwrap();
    pump(&mut [&mut x, &mut y]);

    let view = y.engine.view();
    assert_eq!(view.text, "ABC");
    assert_eq!(view.local_index, Some(1));
    assert_eq!(view.glyph, Some('B'));
    assert_eq!(view.icon().glyph, 'B');
    assert_eq!(x.engine.view().glyph, Some('A'));
}

#[test]
fn lone_tab_past_text_end_has_blank_icon() {
    let bus = LocalBus::new();
    let clock = ManualClock::new(0);
    let mut a = open_tab(&bus, &clock, MemoryStore::new());
    a.engine.set_local_text("").unwrap();

    let view = a.engine.view();
    assert_eq!(view.glyph, None);
    assert!(view.icon().is_blank());
    assert_eq!(view.status_line(), "1 Active Tab");
}

#[test]
fn tabs_sharing_a_file_store_see_the_same_text() {
    let dir = tempfile::tempdir().unwrap();
    let bus = LocalBus::new();
    let clock = ManualClock::new(1_000);

    let mut a = open_tab(&bus, &clock, FileStore::open(dir.path()).unwrap());
    a.engine.set_local_text("HELLO").unwrap();
    drop(a);

    // A tab opened later with nobody else around recovers the text from disk.
    let b = open_tab(&bus, &clock, FileStore::open(dir.path()).unwrap());
    assert_eq!(b.engine.text(), "HELLO");
}

#[tokio::test]
async fn inbox_wakes_on_publish() {
    let bus = LocalBus::new();
    let clock = ManualClock::new(0);

    let mut listener = open_tab(&bus, &clock, MemoryStore::new());
    let mut speaker = open_tab(&bus, &clock, MemoryStore::new());
    // Drain the startup chatter.
    pump(&mut [&mut listener, &mut speaker]);

    speaker.engine.set_local_text("PING").unwrap();
    let message = listener.inbox.next().await.unwrap();
    assert_eq!(message.kind(), "text_update");
    listener.engine.on_message(message);
    assert_eq!(listener.engine.text(), "PING");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn promoted_tab_leads_everywhere(
        tab_count in 2usize..6,
        promotions in proptest::collection::vec(0usize..6, 1..8),
    ) {
        let bus = LocalBus::new();
        let clock = ManualClock::new(10_000);

        let mut tabs: Vec<Tab> = (0..tab_count)
            .map(|_| {
                clock.advance(1);
                open_tab(&bus, &clock, MemoryStore::new())
            })
            .collect();
        {
            let mut refs: Vec<&mut Tab> = tabs.iter_mut().collect();
            heartbeat_all(&mut refs);
        }

        for pick in promotions {
            let index = pick % tab_count;
            let priority = tabs[index].engine.promote().unwrap();
            {
                let mut refs: Vec<&mut Tab> = tabs.iter_mut().collect();
                pump(&mut refs);
            }

            let leader = tabs[index].engine.identity().id().clone();
            let expected = tabs[0].engine.ranking();
            prop_assert_eq!(&expected[0], &leader);

            for (i, tab) in tabs.iter().enumerate() {
                prop_assert_eq!(tab.engine.ranking(), expected.clone());
                if i != index {
                    prop_assert!(tab.engine.priority() > priority);
                }
            }
            prop_assert_eq!(tabs[index].engine.local_index(), Some(0));
        }
    }

    #[test]
    fn last_edit_wins_everywhere(edits in proptest::collection::vec((0usize..3, "[A-Z ]{0,6}"), 1..10)) {
        let bus = LocalBus::new();
        let clock = ManualClock::new(0);
        let mut tabs: Vec<Tab> = (0..3).map(|_| open_tab(&bus, &clock, MemoryStore::new())).collect();

        let mut last = String::new();
        for (author, text) in edits {
            tabs[author].engine.set_local_text(text.clone()).unwrap();
            last = text;
            let mut refs: Vec<&mut Tab> = tabs.iter_mut().collect();
            pump(&mut refs);
        }

        for tab in &tabs {
            prop_assert_eq!(tab.engine.text(), last.as_str());
        }
    }
}
