//! Observable record holding the session's gram
//!
//! The record is the only shared mutable state in the application. Views
//! subscribe to it and receive a full snapshot after every update.
//!
//! # Usage
//!
//! ```ignore
//! let record = Record::new(MarkdownTransform::new());
//! let _subscription = record.subscribe(|gram| println!("{}", gram.header));
//! record.update(GramPatch::new().header("Hello"));
//! ```

use super::model::{Field, FieldValue, Gram, GramPatch};
use crate::markup::TextTransform;
use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback = Rc<dyn Fn(&Gram)>;

struct Subscriber {
    id: u64,
    callback: Callback,
}

/// Single observable container for the document.
pub struct Record {
    gram: RefCell<Gram>,
    transform: Box<dyn TextTransform>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<u64>,
    /// Set while subscribers are being notified
    broadcasting: Cell<bool>,
    /// Patches submitted from inside a broadcast
    queued: RefCell<VecDeque<GramPatch>>,
}

impl Record {
    /// Create the record with the startup document.
    pub fn new(transform: impl TextTransform + 'static) -> Rc<Self> {
        let gram = Gram::initial(&transform);
        Self::with_gram(gram, transform)
    }

    /// Create the record around an existing gram.
    pub fn with_gram(gram: Gram, transform: impl TextTransform + 'static) -> Rc<Self> {
        Rc::new(Self {
            gram: RefCell::new(gram),
            transform: Box::new(transform),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            broadcasting: Cell::new(false),
            queued: RefCell::new(VecDeque::new()),
        })
    }

    /// Merge `patch` and notify every subscriber with the new snapshot.
    ///
    /// Subscribers are notified even when nothing changed. An update issued
    /// from inside a subscriber runs after the current broadcast finishes.
    pub fn update(&self, patch: GramPatch) {
        self.queued.borrow_mut().push_back(patch);
        if self.broadcasting.get() {
            debug!("Update queued behind running broadcast");
            return;
        }

        self.broadcasting.set(true);
        while let Some(patch) = self.next_queued() {
            let snapshot = {
                let mut gram = self.gram.borrow_mut();
                patch.apply(&mut gram, self.transform.as_ref());
                gram.clone()
            };

            let callbacks: Vec<Callback> = self
                .subscribers
                .borrow()
                .iter()
                .map(|s| Rc::clone(&s.callback))
                .collect();
            for callback in callbacks {
                callback(&snapshot);
            }
        }
        self.broadcasting.set(false);
    }

    fn next_queued(&self) -> Option<GramPatch> {
        self.queued.borrow_mut().pop_front()
    }

    /// Register a callback for every future update.
    ///
    /// The callback stays registered until the returned `Subscription` is dropped.
    pub fn subscribe(self: &Rc<Self>, callback: impl Fn(&Gram) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            callback: Rc::new(callback),
        });
        Subscription {
            id,
            record: Rc::downgrade(self),
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|s| s.id != id);
    }

    /// Current value of one field.
    pub fn get(&self, field: Field) -> FieldValue {
        self.gram.borrow().get(field)
    }

    /// Current header text.
    pub fn header(&self) -> String {
        self.gram.borrow().header.clone()
    }

    /// Clone of the whole document.
    pub fn snapshot(&self) -> Gram {
        self.gram.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("gram", &self.gram.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Keeps a callback registered on a `Record`; unregisters on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    record: Weak<Record>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(record) = self.record.upgrade() {
            record.unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gram::{ColorScheme, FontFamily, FontSize, TextAlign};
    use crate::markup::PlainTransform;

    fn record() -> Rc<Record> {
        Record::new(PlainTransform)
    }

    #[test]
    fn test_last_write_wins_per_field() {
        let record = record();
        record.update(GramPatch::new().header("a").footer("x"));
        record.update(GramPatch::new().header("b"));
        record.update(GramPatch::new().font_size(FontSize::Medium).footer("y"));
        record.update(GramPatch::new().header("c").font_size(FontSize::Large));

        assert_eq!(record.get(Field::Header), FieldValue::Text("c".into()));
        assert_eq!(record.get(Field::Footer), FieldValue::Text("y".into()));
        assert_eq!(
            record.get(Field::FontSize),
            FieldValue::FontSize(FontSize::Large)
        );
        assert_eq!(
            record.get(Field::FontFamily),
            FieldValue::FontFamily(FontFamily::Serif)
        );
    }

    #[test]
    fn test_every_subscriber_sees_full_snapshot() {
        let record = record();
        let seen_a = Rc::new(RefCell::new(Vec::new()));
        let seen_b = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen_a);
        let _a = record.subscribe(move |gram| sink.borrow_mut().push(gram.clone()));
        let sink = Rc::clone(&seen_b);
        let _b = record.subscribe(move |gram| sink.borrow_mut().push(gram.clone()));

        record.update(
            GramPatch::new()
                .header("Both")
                .text_align(TextAlign::Right)
                .color_scheme(ColorScheme::Dark),
        );

        for seen in [&seen_a, &seen_b] {
            let seen = seen.borrow();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].header, "Both");
            assert_eq!(seen[0].text_align, TextAlign::Right);
            assert_eq!(seen[0].color_scheme, ColorScheme::Dark);
        }
    }

    #[test]
    fn test_update_without_change_still_notifies() {
        let record = record();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let _sub = record.subscribe(move |_| counter.set(counter.get() + 1));

        let header = record.header();
        record.update(GramPatch::new().header(header.clone()));
        record.update(GramPatch::new().header(header));
        record.update(GramPatch::new());

        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_body_never_observed_stale() {
        let record = record();
        let ok = Rc::new(Cell::new(true));
        let flag = Rc::clone(&ok);
        let _sub = record.subscribe(move |gram| {
            if gram.body != PlainTransform.transform(&gram.body_raw) {
                flag.set(false);
            }
        });

        record.update(GramPatch::new().body_raw("one"));
        record.update(GramPatch::new().body_raw("one\ntwo"));
        record.update(GramPatch::new().header("no body change"));

        assert!(ok.get());
        assert_eq!(record.snapshot().body.blocks.len(), 2);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let record = record();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let sub = record.subscribe(move |_| counter.set(counter.get() + 1));
        assert_eq!(record.subscriber_count(), 1);

        record.update(GramPatch::new());
        drop(sub);
        record.update(GramPatch::new());

        assert_eq!(count.get(), 1);
        assert_eq!(record.subscriber_count(), 0);
    }

    #[test]
    fn test_nested_update_runs_after_broadcast() {
        let record = record();
        let log = Rc::new(RefCell::new(Vec::new()));

        let weak = Rc::downgrade(&record);
        let sink = Rc::clone(&log);
        let _first = record.subscribe(move |gram| {
            sink.borrow_mut().push(format!("first:{}", gram.header));
            if gram.header == "outer" {
                if let Some(record) = weak.upgrade() {
                    record.update(GramPatch::new().header("inner"));
                }
            }
        });
        let sink = Rc::clone(&log);
        let _second = record.subscribe(move |gram| {
            sink.borrow_mut().push(format!("second:{}", gram.header));
        });

        record.update(GramPatch::new().header("outer"));

        assert_eq!(
            *log.borrow(),
            vec![
                "first:outer".to_string(),
                "second:outer".to_string(),
                "first:inner".to_string(),
                "second:inner".to_string(),
            ]
        );
        assert_eq!(record.header(), "inner");
    }

    #[test]
    fn test_subscription_outliving_record_is_harmless() {
        let record = record();
        let sub = record.subscribe(|_| {});
        drop(record);
        drop(sub);
    }
}
