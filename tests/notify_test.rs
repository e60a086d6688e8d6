use anyhow::anyhow;
use capture_inbox::store::MemoryStore;
use capture_inbox::{
    CaptureFilter, CaptureInbox, CapturePatch, CaptureSource, NewCapture, PromotionTarget,
    Subscription,
};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<(&'static str, usize)>>>;

fn inbox() -> Arc<CaptureInbox> {
    Arc::new(CaptureInbox::new(Arc::new(MemoryStore::new())))
}

fn record(inbox: &CaptureInbox, log: &Log, name: &'static str) -> Subscription {
    let log = log.clone();
    inbox.subscribe(move |count| {
        log.lock().unwrap().push((name, count));
        Ok(())
    })
}

fn capture(raw: &str) -> NewCapture {
    NewCapture::new(CaptureSource::Text, raw)
}

#[test]
fn subscribe_replays_current_count_once() {
    let inbox = inbox();
    inbox.save(capture("a"));
    inbox.save(capture("b"));

    let log = Log::default();
    let _sub = record(&inbox, &log, "badge");
    assert_eq!(*log.lock().unwrap(), vec![("badge", 2)]);
}

#[test]
fn save_notifies_all_subscribers_in_registration_order() {
    let inbox = inbox();
    let log = Log::default();
    let _a = record(&inbox, &log, "badge");
    let _b = record(&inbox, &log, "list");
    log.lock().unwrap().clear();

    inbox.save(capture("buy milk"));
    assert_eq!(*log.lock().unwrap(), vec![("badge", 1), ("list", 1)]);
}

#[test]
fn every_count_changing_mutation_notifies() {
    let inbox = inbox();
    let log = Log::default();
    let _sub = record(&inbox, &log, "badge");

    let a = inbox.save(capture("a"));
    let b = inbox.save(capture("b"));
    let c = inbox.save(capture("c"));
    inbox.promote(&a.id, PromotionTarget::Task);
    inbox.discard(&b.id);
    inbox.update(&c.id, CapturePatch::transcript("t"));
    inbox.delete(&c.id);

    let counts: Vec<usize> = log.lock().unwrap().iter().map(|(_, n)| *n).collect();
    assert_eq!(counts, vec![0, 1, 2, 3, 2, 1, 1, 0]);
}

#[test]
fn no_ops_do_not_notify() {
    let inbox = inbox();
    let item = inbox.save(capture("a"));
    inbox.promote(&item.id, PromotionTarget::Note);

    let log = Log::default();
    let _sub = record(&inbox, &log, "badge");
    inbox.update("missing", CapturePatch::transcript("t"));
    inbox.delete("missing");
    inbox.discard(&item.id);
    inbox.clear_discarded();
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn unsubscribed_callbacks_stop_receiving() {
    let inbox = inbox();
    let log = Log::default();
    let badge = record(&inbox, &log, "badge");
    let _list = record(&inbox, &log, "list");
    badge.unsubscribe();
    badge.unsubscribe();
    log.lock().unwrap().clear();

    inbox.save(capture("a"));
    assert_eq!(*log.lock().unwrap(), vec![("list", 1)]);
    assert_eq!(inbox.hub().len(), 1);
}

#[test]
fn failing_subscriber_does_not_affect_others_or_the_save() {
    let inbox = inbox();
    let log = Log::default();
    let _bad = inbox.subscribe(|count| {
        if count > 0 {
            return Err(anyhow!("view unmounted"));
        }
        Ok(())
    });
    let _panicky = inbox.subscribe(|count| {
        if count > 0 {
            panic!("render crashed");
        }
        Ok(())
    });
    let _good = record(&inbox, &log, "badge");

    let item = inbox.save(capture("still saved"));
    assert_eq!(item.sync_error, None);
    assert_eq!(inbox.get_all(CaptureFilter::all()).len(), 1);
    assert_eq!(*log.lock().unwrap(), vec![("badge", 0), ("badge", 1)]);
}

#[test]
fn subscriber_can_unsubscribe_itself_and_read_the_inbox() {
    let inbox = inbox();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::default();

    let seen_cb = seen.clone();
    let slot_cb = slot.clone();
    let inbox_cb = Arc::downgrade(&inbox);
    let sub = inbox.subscribe(move |count| {
        // reading back from inside the callback must not deadlock
        let listed = inbox_cb
            .upgrade()
            .map(|i| i.get_all(CaptureFilter::all()).len())
            .unwrap_or_default();
        seen_cb.lock().unwrap().push((count, listed));
        if count >= 1 {
            if let Some(sub) = slot_cb.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        }
        Ok(())
    });
    *slot.lock().unwrap() = Some(sub);

    inbox.save(capture("a"));
    inbox.save(capture("b"));
    assert_eq!(*seen.lock().unwrap(), vec![(0, 0), (1, 1)]);
    assert!(inbox.hub().is_empty());
}
