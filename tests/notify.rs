mod common;

use common::{FakeBoard, MemStorage};
use reach_param_repo::demo;
use reach_param_repo::ParameterStore;
use std::cell::RefCell;
use std::rc::Rc;

fn board_store(storage: &mut MemStorage) -> (ParameterStore<&mut MemStorage>, Rc<RefCell<FakeBoard>>) {
    let board = Rc::new(RefCell::new(FakeBoard::default()));
    let mut store = ParameterStore::new(demo::SCHEMA, storage);
    demo::register_board_hooks(&mut store, board.clone()).unwrap();
    store.init();
    (store, board)
}

mod poll {
    use crate::common::{MemStorage, RecordingNotifier};
    use pretty_assertions::assert_eq;
    use reach_param_repo::demo::{self, ParamId};
    use reach_param_repo::value::RECORD_SIZE;
    use reach_param_repo::{NotificationConfig, NotificationMonitor, ParameterValue, Payload};

    #[test]
    fn first_poll_pushes_everything() {
        let mut storage = MemStorage::new();
        let (mut store, _board) = crate::board_store(&mut storage);
        let mut monitor = NotificationMonitor::new(&demo::NOTIFICATIONS);
        let mut notifier = RecordingNotifier::subscribed();

        assert_eq!(monitor.poll(&mut store, 0, &mut notifier), 8);
        assert_eq!(notifier.ids(), vec![1, 2, 4, 5, 6, 7, 8, 9]);
        assert_eq!(notifier.sent[0].len(), RECORD_SIZE);
        assert_eq!(
            ParameterValue::from_record(&notifier.sent[0]),
            Ok(ParameterValue::new(
                ParamId::TimezoneEnabled as u32,
                0,
                Payload::Bool(true)
            ))
        );

        // nothing changed
        assert_eq!(monitor.poll(&mut store, 5000, &mut notifier), 0);
    }

    #[test]
    fn minimum_period() {
        let mut storage = MemStorage::new();
        let (mut store, board) = crate::board_store(&mut storage);
        let mut monitor = NotificationMonitor::new(&demo::NOTIFICATIONS);
        let mut notifier = RecordingNotifier::subscribed();
        monitor.poll(&mut store, 1000, &mut notifier);
        notifier.sent.clear();

        board.borrow_mut().uptime_ms = 1050;
        assert_eq!(monitor.poll(&mut store, 1050, &mut notifier), 0);

        board.borrow_mut().uptime_ms = 1100;
        assert_eq!(monitor.poll(&mut store, 1100, &mut notifier), 1);
        assert_eq!(notifier.ids(), vec![ParamId::Uptime as u32]);
    }

    #[test]
    fn period_across_wraparound() {
        let mut storage = MemStorage::new();
        let (mut store, board) = crate::board_store(&mut storage);
        let mut monitor = NotificationMonitor::new(&demo::NOTIFICATIONS);
        let mut notifier = RecordingNotifier::subscribed();
        monitor.poll(&mut store, u32::MAX - 10, &mut notifier);
        notifier.sent.clear();

        board.borrow_mut().uptime_ms = 500;
        assert_eq!(monitor.poll(&mut store, 50, &mut notifier), 0);
        assert_eq!(monitor.poll(&mut store, 89, &mut notifier), 1);
    }

    static INTERVAL: [NotificationConfig; 1] = [NotificationConfig {
        parameter_id: ParamId::IdentifyInterval as u32,
        minimum_period_ms: 0,
        minimum_delta: 0.5,
    }];

    #[test]
    fn minimum_delta() {
        let mut storage = MemStorage::new();
        let (mut store, _board) = crate::board_store(&mut storage);
        let mut monitor = NotificationMonitor::new(&INTERVAL);
        let mut notifier = RecordingNotifier::subscribed();
        assert_eq!(monitor.poll(&mut store, 0, &mut notifier), 1);

        let id = ParamId::IdentifyInterval as u32;
        store
            .write(ParameterValue::new(id, 1, Payload::Float32(1.25)))
            .unwrap();
        assert_eq!(monitor.poll(&mut store, 1, &mut notifier), 0);

        // compared against the last pushed value, not the last polled one
        store
            .write(ParameterValue::new(id, 2, Payload::Float32(1.5)))
            .unwrap();
        assert_eq!(monitor.poll(&mut store, 2, &mut notifier), 1);

        store
            .write(ParameterValue::new(id, 3, Payload::Float32(0.75)))
            .unwrap();
        assert_eq!(monitor.poll(&mut store, 3, &mut notifier), 1);
    }

    static NAME: [NotificationConfig; 2] = [
        NotificationConfig {
            parameter_id: ParamId::UserDeviceName as u32,
            minimum_period_ms: 0,
            minimum_delta: 100.0,
        },
        NotificationConfig {
            parameter_id: 9999,
            minimum_period_ms: 0,
            minimum_delta: 0.0,
        },
    ];

    #[test]
    fn strings_on_any_change() {
        let mut storage = MemStorage::new();
        let (mut store, _board) = crate::board_store(&mut storage);
        let mut monitor = NotificationMonitor::new(&NAME);
        let mut notifier = RecordingNotifier::subscribed();
        assert_eq!(monitor.poll(&mut store, 0, &mut notifier), 1);

        store
            .write(ParameterValue::new(
                ParamId::UserDeviceName as u32,
                1,
                Payload::String("a".into()),
            ))
            .unwrap();
        assert_eq!(monitor.poll(&mut store, 1, &mut notifier), 1);
        assert_eq!(monitor.poll(&mut store, 2, &mut notifier), 0);
        assert_eq!(notifier.ids(), vec![0, 0]);
    }

    #[test]
    fn without_subscriber() {
        let mut storage = MemStorage::new();
        let (mut store, _board) = crate::board_store(&mut storage);
        let mut monitor = NotificationMonitor::new(&demo::NOTIFICATIONS);
        let mut notifier = RecordingNotifier::default();

        assert_eq!(monitor.poll(&mut store, 0, &mut notifier), 0);

        // failed pushes are retried
        notifier.subscribed = true;
        assert_eq!(monitor.poll(&mut store, 1, &mut notifier), 8);
    }

    #[test]
    fn clear() {
        let mut storage = MemStorage::new();
        let (mut store, _board) = crate::board_store(&mut storage);
        let mut monitor = NotificationMonitor::new(&demo::NOTIFICATIONS);
        let mut notifier = RecordingNotifier::subscribed();
        assert_eq!(monitor.configs().len(), 8);

        assert_eq!(monitor.poll(&mut store, 0, &mut notifier), 8);
        monitor.clear();
        assert_eq!(monitor.poll(&mut store, 1, &mut notifier), 8);
    }
}
