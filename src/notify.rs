// ============================================
// src/notify.rs
// プロパティ変更通知とリスト変更通知
// ============================================

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// 通知で渡されるプロパティ名
pub type PropertyName = &'static str;

/// `subscribe` の戻り値。解除に使う
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Rc<RefCell<dyn FnMut(PropertyName)>>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` なら全プロパティを受け取る
    filter: Option<PropertyName>,
    callback: Callback,
}

impl Subscriber {
    fn wants(&self, name: PropertyName) -> bool {
        self.filter.is_none_or(|f| f == name)
    }
}

#[derive(Default)]
struct Inner {
    subscribers: Vec<Subscriber>,
    pending: VecDeque<PropertyName>,
    dispatching: bool,
    next_id: u64,
}

/// プロパティ変更の通知元
///
/// クローンしても同じ購読者リストを共有する。UI スレッド専用 (`Rc`)。
/// コールバックの中から同じ `Notifier` に `notify` しても再帰はせず、
/// キューに積まれて今の通知が終わったあとに順番に配られる。
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Rc<RefCell<Inner>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定プロパティの変更だけを受け取る
    pub fn subscribe<F>(&self, name: PropertyName, callback: F) -> SubscriptionId
    where
        F: FnMut(PropertyName) + 'static,
    {
        self.add(Some(name), Rc::new(RefCell::new(callback)))
    }

    /// すべてのプロパティ変更を受け取る
    pub fn subscribe_all<F>(&self, callback: F) -> SubscriptionId
    where
        F: FnMut(PropertyName) + 'static,
    {
        self.add(None, Rc::new(RefCell::new(callback)))
    }

    fn add(&self, filter: Option<PropertyName>, callback: Callback) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.subscribers.push(Subscriber {
            id,
            filter,
            callback,
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.inner.borrow().subscribers.iter().any(|s| s.id == id)
    }

    /// MARK:変更を通知する
    ///
    /// 保存フィールドを持たない派生プロパティ (表示用の文字列など) も
    /// これで明示的に通知する。
    pub fn notify(&self, name: PropertyName) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.pending.push_back(name);
            if inner.dispatching {
                // 配信中なら外側のループに任せる
                return;
            }
            inner.dispatching = true;
        }
        let _guard = DispatchGuard(self);

        loop {
            let next = self.inner.borrow_mut().pending.pop_front();
            let Some(name) = next else { break };

            // 借用を手放してから呼ぶ (コールバック内で subscribe / notify できるように)
            let targets: Vec<(SubscriptionId, Callback)> = self
                .inner
                .borrow()
                .subscribers
                .iter()
                .filter(|s| s.wants(name))
                .map(|s| (s.id, Rc::clone(&s.callback)))
                .collect();

            for (id, callback) in targets {
                // 配信中に解除されたものは飛ばす
                if !self.is_subscribed(id) {
                    continue;
                }
                (&mut *callback.borrow_mut())(name);
            }
        }
    }

    pub fn notify_all(&self, names: &[PropertyName]) {
        for &name in names {
            self.notify(name);
        }
    }

    /// MARK:値が変わったときだけ書き込んで通知する
    ///
    /// 同じ値なら何もせず `false` を返す。
    pub fn set<T: PartialEq>(&self, slot: &mut T, value: T, name: PropertyName) -> bool {
        if *slot == value {
            return false;
        }
        *slot = value;
        self.notify(name);
        true
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// コールバックが panic しても配信中フラグを戻す
struct DispatchGuard<'a>(&'a Notifier);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.0.inner.borrow_mut();
        inner.dispatching = false;
        inner.pending.clear();
    }
}

// --------------------------------------------------
// 変更通知付きリスト
// --------------------------------------------------

/// `ObservableList` が発行するイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Added(usize),
    Removed(usize),
    Cleared,
}

/// 追加・削除・全消去を購読者に知らせる順序付きコンテナ
pub struct ObservableList<T> {
    items: Vec<T>,
    listeners: Vec<Box<dyn FnMut(ListChange)>>,
}

impl<T> ObservableList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(ListChange) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, change: ListChange) {
        for listener in &mut self.listeners {
            listener(change);
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        let index = self.items.len() - 1;
        self.emit(ListChange::Added(index));
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.emit(ListChange::Removed(index));
        Some(item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.emit(ListChange::Cleared);
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// 要素自身の変更は要素側で通知すること
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a ObservableList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder(notifier: &Notifier) -> Rc<RefCell<Vec<PropertyName>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        notifier.subscribe_all(move |name| sink.borrow_mut().push(name));
        log
    }

    #[test]
    fn set_notifies_only_on_change() {
        let notifier = Notifier::new();
        let log = recorder(&notifier);
        let mut value = 1;

        assert!(notifier.set(&mut value, 2, "value"));
        assert!(!notifier.set(&mut value, 2, "value"));

        assert_eq!(value, 2);
        assert_eq!(*log.borrow(), vec!["value"]);
    }

    #[test]
    fn named_subscription_filters_other_properties() {
        let notifier = Notifier::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        notifier.subscribe("score_text", move |_| *counter.borrow_mut() += 1);

        notifier.notify("view_state");
        notifier.notify("score_text");

        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn nested_notify_is_queued_in_order() {
        let notifier = Notifier::new();
        let log = recorder(&notifier);

        let inner = notifier.clone();
        notifier.subscribe("first", move |_| inner.notify("second"));
        notifier.notify("first");
        notifier.notify("third");

        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let notifier = Notifier::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        let id = notifier.subscribe_all(move |_| *counter.borrow_mut() += 1);

        notifier.notify("a");
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify("a");

        assert_eq!(*hits.borrow(), 1);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_added_during_dispatch_sees_later_notifications() {
        let notifier = Notifier::new();
        let late = Rc::new(RefCell::new(Vec::new()));
        let added = Cell::new(false);
        let handle = notifier.clone();
        let sink = Rc::clone(&late);
        notifier.subscribe("first", move |_| {
            if !added.replace(true) {
                let sink = Rc::clone(&sink);
                handle.subscribe_all(move |name| sink.borrow_mut().push(name));
                handle.notify("second");
            }
        });

        notifier.notify("first");

        // 追加された時点で配信中だった "first" は届かない
        assert_eq!(*late.borrow(), vec!["second"]);
        assert_eq!(notifier.subscriber_count(), 2);
    }

    #[test]
    fn subscriber_removed_during_dispatch_is_skipped() {
        let notifier = Notifier::new();
        let victim: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let handle = notifier.clone();
        let target = Rc::clone(&victim);
        notifier.subscribe_all(move |_| {
            if let Some(id) = target.take() {
                handle.unsubscribe(id);
            }
        });

        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = notifier.subscribe_all(move |_| counter.set(counter.get() + 1));
        victim.set(Some(id));

        notifier.notify("a");
        assert_eq!(hits.get(), 0);
        notifier.notify("a");
        assert_eq!(hits.get(), 0);
        assert_eq!(notifier.subscriber_count(), 1);
    }

    #[test]
    fn list_emits_changes() {
        let mut list = ObservableList::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        list.subscribe(move |change| sink.borrow_mut().push(change));

        list.push("a");
        list.push("b");
        assert_eq!(list.remove(0), Some("a"));
        assert_eq!(list.remove(5), None);
        list.clear();

        assert_eq!(
            *log.borrow(),
            vec![
                ListChange::Added(0),
                ListChange::Added(1),
                ListChange::Removed(0),
                ListChange::Cleared,
            ]
        );
        assert!(list.is_empty());
    }
}
