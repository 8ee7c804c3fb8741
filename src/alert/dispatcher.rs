use std::{collections::VecDeque, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::utils::format_duration;

use super::{
    priority, AlertAction, AlertError, AlertEvent, AlertTask, Color, IndicatorDevice,
    IndicatorError,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const EVENT_CAPACITY: usize = 64;

/// Executes alert tasks one at a time on a dedicated worker task, so a
/// blink lasting several seconds never holds up the sampling loop.
///
/// Requests are queued on an unbounded channel and run strictly in the order
/// they were made. A request whose color outranks the one currently shown
/// cuts the current task short; nothing is ever dropped or reordered.
pub struct AlertDispatcher {
    tx: mpsc::UnboundedSender<AlertTask>,
    events: broadcast::Sender<AlertEvent>,
    cancel_token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

enum Outcome {
    Completed,
    Preempted(Color),
    Cancelled,
}

impl AlertDispatcher {
    pub fn spawn<I>(indicator: I) -> Self
    where
        I: IndicatorDevice + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(alert_worker(indicator, rx, cancel_token.clone()));

        Self {
            tx,
            events,
            cancel_token,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queue an alert. Never waits for the indicator.
    pub fn request(
        &self,
        color: Color,
        action: AlertAction,
        duration: Duration,
    ) -> Result<(), AlertError> {
        if self.cancel_token.is_cancelled() {
            return Err(AlertError::Closed);
        }

        let task = AlertTask::new(color, action, duration);
        let event = AlertEvent::from(&task);
        self.tx.send(task).map_err(|_| AlertError::Closed)?;

        // No subscribers is fine.
        let _ = self.events.send(event);
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    /// Stop the worker. The task being shown is cut short, queued tasks are
    /// discarded unexecuted, and the indicator is switched off before this
    /// returns. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(err) = handle.await {
                log_error!("alert worker failed to join: {err}");
            }
        }
    }
}

async fn alert_worker<I: IndicatorDevice>(
    mut indicator: I,
    mut rx: mpsc::UnboundedReceiver<AlertTask>,
    cancel_token: CancellationToken,
) {
    // Tasks that arrived while another one was running, in arrival order.
    let mut backlog: VecDeque<AlertTask> = VecDeque::new();

    loop {
        let task = match backlog.pop_front() {
            Some(task) => task,
            None => tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                next = rx.recv() => match next {
                    Some(task) => task,
                    None => break,
                },
            },
        };

        if cancel_token.is_cancelled() {
            backlog.push_front(task);
            break;
        }

        log_debug!(
            "{:?} {} for {}",
            task.action,
            task.color,
            format_duration(task.duration)
        );

        match execute(&mut indicator, &task, &mut rx, &mut backlog, &cancel_token).await {
            Ok(Outcome::Completed) => {}
            Ok(Outcome::Preempted(by)) => {
                log_info!("{} alert cut short by {by} alert", task.color);
            }
            Ok(Outcome::Cancelled) => break,
            Err(err) => {
                log_error!("{} alert abandoned: {err}", task.color);
            }
        }
    }

    rx.close();
    let mut discarded = backlog.len();
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        log_info!("discarded {discarded} queued alert(s) on shutdown");
    }

    if let Err(err) = indicator.all_off() {
        log_warn!("failed to switch indicator off on shutdown: {err}");
    }
    log_info!("alert worker shutting down");
}

async fn execute<I: IndicatorDevice>(
    indicator: &mut I,
    task: &AlertTask,
    rx: &mut mpsc::UnboundedReceiver<AlertTask>,
    backlog: &mut VecDeque<AlertTask>,
    cancel_token: &CancellationToken,
) -> Result<Outcome, IndicatorError> {
    match task.action {
        AlertAction::Blink => indicator.start_blinking(task.color)?,
        AlertAction::Hold => indicator.turn_on(task.color)?,
    }

    let deadline = time::sleep(task.duration);
    tokio::pin!(deadline);
    let mut receiving = true;

    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break Outcome::Cancelled,
            _ = &mut deadline => break Outcome::Completed,
            next = rx.recv(), if receiving => match next {
                Some(next) => {
                    let preempts = next.color != task.color
                        && priority::can_supersede(Some(task.color), next.color);
                    let color = next.color;
                    backlog.push_back(next);
                    if preempts {
                        break Outcome::Preempted(color);
                    }
                }
                None => receiving = false,
            },
        }
    };

    indicator.turn_off(task.color)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use tokio::time::Instant;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        On(Color),
        Off(Color),
        Blink(Color),
    }

    #[derive(Clone, Default)]
    struct FakeIndicator {
        calls: Arc<StdMutex<Vec<(Instant, Call)>>>,
        failing: Option<Color>,
    }

    impl FakeIndicator {
        fn failing_on(color: Color) -> Self {
            Self {
                failing: Some(color),
                ..Self::default()
            }
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push((Instant::now(), call));
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().iter().map(|(_, c)| *c).collect()
        }

        fn timed_calls(&self) -> Vec<(Instant, Call)> {
            self.calls.lock().unwrap().clone()
        }

        /// Calls made for actual tasks, without the shutdown cleanup.
        fn task_calls(&self) -> Vec<Call> {
            let calls = self.calls();
            let cleanup: Vec<Call> = Color::ALL.iter().map(|c| Call::Off(*c)).collect();
            if calls.ends_with(&cleanup) {
                calls[..calls.len() - cleanup.len()].to_vec()
            } else {
                calls
            }
        }
    }

    fn unplugged() -> IndicatorError {
        std::io::Error::new(std::io::ErrorKind::NotConnected, "unplugged").into()
    }

    impl IndicatorDevice for FakeIndicator {
        fn turn_on(&mut self, color: Color) -> Result<(), IndicatorError> {
            if self.failing == Some(color) {
                return Err(unplugged());
            }
            self.record(Call::On(color));
            Ok(())
        }

        fn turn_off(&mut self, color: Color) -> Result<(), IndicatorError> {
            self.record(Call::Off(color));
            Ok(())
        }

        fn start_blinking(&mut self, color: Color) -> Result<(), IndicatorError> {
            if self.failing == Some(color) {
                return Err(unplugged());
            }
            self.record(Call::Blink(color));
            Ok(())
        }
    }

    const TEN: Duration = Duration::from_secs(10);

    #[tokio::test(start_paused = true)]
    async fn runs_tasks_in_fifo_order() {
        let indicator = FakeIndicator::default();
        let dispatcher = AlertDispatcher::spawn(indicator.clone());

        dispatcher.request(Color::Yellow, AlertAction::Blink, TEN).unwrap();
        dispatcher.request(Color::Yellow, AlertAction::Hold, TEN).unwrap();
        dispatcher.request(Color::Red, AlertAction::Blink, TEN).unwrap();

        time::sleep(Duration::from_secs(35)).await;

        // Red was queued before the first yellow task finished receiving,
        // so it preempts yellow but still runs after both yellows in order.
        let calls = indicator.calls();
        assert_eq!(calls[0], Call::Blink(Color::Yellow));
        assert_eq!(calls.last(), Some(&Call::Off(Color::Red)));
        let blink_or_on: Vec<Call> = calls
            .iter()
            .copied()
            .filter(|c| !matches!(c, Call::Off(_)))
            .collect();
        assert_eq!(
            blink_or_on,
            vec![
                Call::Blink(Color::Yellow),
                Call::On(Color::Yellow),
                Call::Blink(Color::Red)
            ]
        );

        dispatcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn each_task_lasts_its_duration() {
        let indicator = FakeIndicator::default();
        let dispatcher = AlertDispatcher::spawn(indicator.clone());
        let start = Instant::now();

        dispatcher.request(Color::Green, AlertAction::Hold, TEN).unwrap();
        time::sleep(Duration::from_secs(1)).await;
        dispatcher.request(Color::Green, AlertAction::Blink, Duration::from_secs(5)).unwrap();
        time::sleep(Duration::from_secs(20)).await;

        let timed = indicator.timed_calls();
        let offsets: Vec<(u64, Call)> = timed
            .iter()
            .map(|(at, call)| ((*at - start).as_secs(), *call))
            .collect();
        assert_eq!(
            offsets,
            vec![
                (0, Call::On(Color::Green)),
                (10, Call::Off(Color::Green)),
                (10, Call::Blink(Color::Green)),
                (15, Call::Off(Color::Green)),
            ]
        );

        dispatcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn higher_priority_cuts_current_task_short() {
        let indicator = FakeIndicator::default();
        let dispatcher = AlertDispatcher::spawn(indicator.clone());
        let start = Instant::now();

        dispatcher.request(Color::Yellow, AlertAction::Blink, TEN).unwrap();
        time::sleep(Duration::from_secs(2)).await;
        dispatcher.request(Color::Red, AlertAction::Blink, TEN).unwrap();
        time::sleep(Duration::from_secs(1)).await;

        let timed = indicator.timed_calls();
        assert_eq!(timed.len(), 3);
        assert_eq!(timed[1].1, Call::Off(Color::Yellow));
        assert_eq!((timed[1].0 - start).as_secs(), 2);
        assert_eq!(timed[2].1, Call::Blink(Color::Red));

        dispatcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn lower_priority_waits_its_turn() {
        let indicator = FakeIndicator::default();
        let dispatcher = AlertDispatcher::spawn(indicator.clone());
        let start = Instant::now();

        dispatcher.request(Color::Red, AlertAction::Blink, TEN).unwrap();
        time::sleep(Duration::from_secs(2)).await;
        dispatcher.request(Color::Yellow, AlertAction::Blink, TEN).unwrap();
        time::sleep(Duration::from_secs(12)).await;

        let timed = indicator.timed_calls();
        assert_eq!(timed[1].1, Call::Off(Color::Red));
        assert_eq!((timed[1].0 - start).as_secs(), 10);
        assert_eq!(timed[2].1, Call::Blink(Color::Yellow));

        dispatcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn indicator_failure_skips_to_next_task() {
        let indicator = FakeIndicator::failing_on(Color::Green);
        let dispatcher = AlertDispatcher::spawn(indicator.clone());

        dispatcher.request(Color::Green, AlertAction::Blink, TEN).unwrap();
        dispatcher.request(Color::Yellow, AlertAction::Blink, TEN).unwrap();
        time::sleep(Duration::from_secs(11)).await;

        assert_eq!(
            indicator.calls(),
            vec![Call::Blink(Color::Yellow), Call::Off(Color::Yellow)]
        );

        dispatcher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_right_after_requests_keeps_fifo_prefix() {
        let indicator = FakeIndicator::default();
        let dispatcher = AlertDispatcher::spawn(indicator.clone());

        dispatcher.request(Color::Yellow, AlertAction::Blink, TEN).unwrap();
        dispatcher.request(Color::Yellow, AlertAction::Hold, TEN).unwrap();
        dispatcher.request(Color::Yellow, AlertAction::Blink, TEN).unwrap();
        dispatcher.shutdown().await;

        let full = [
            Call::Blink(Color::Yellow),
            Call::Off(Color::Yellow),
            Call::On(Color::Yellow),
            Call::Off(Color::Yellow),
            Call::Blink(Color::Yellow),
            Call::Off(Color::Yellow),
        ];
        let executed = indicator.task_calls();
        assert!(executed.len() % 2 == 0);
        assert_eq!(executed.as_slice(), &full[..executed.len()]);

        // Indicator is left dark.
        let calls = indicator.calls();
        assert!(calls.ends_with(&[
            Call::Off(Color::Red),
            Call::Off(Color::Green),
            Call::Off(Color::Yellow)
        ]));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_is_bounded_while_task_runs() {
        let indicator = FakeIndicator::default();
        let dispatcher = AlertDispatcher::spawn(indicator.clone());

        dispatcher
            .request(Color::Green, AlertAction::Hold, Duration::from_secs(3600))
            .unwrap();
        time::sleep(Duration::from_secs(1)).await;

        let start = Instant::now();
        dispatcher.shutdown().await;
        assert!(Instant::now() - start < Duration::from_secs(1));
        assert_eq!(indicator.task_calls(), vec![Call::On(Color::Green), Call::Off(Color::Green)]);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_after_shutdown_are_rejected() {
        let dispatcher = AlertDispatcher::spawn(FakeIndicator::default());
        dispatcher.shutdown().await;
        dispatcher.shutdown().await;

        assert_eq!(
            dispatcher.request(Color::Red, AlertAction::Blink, TEN),
            Err(AlertError::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_every_request() {
        let dispatcher = AlertDispatcher::spawn(FakeIndicator::default());
        let mut events = dispatcher.subscribe();

        dispatcher.request(Color::Red, AlertAction::Blink, TEN).unwrap();
        dispatcher.request(Color::Green, AlertAction::Hold, TEN).unwrap();

        let first = events.recv().await.unwrap();
        let second = events.recv().await.unwrap();
        assert_eq!((first.color, first.action), (Color::Red, AlertAction::Blink));
        assert_eq!((second.color, second.action), (Color::Green, AlertAction::Hold));
        assert_eq!(second.duration_secs, 10);

        dispatcher.shutdown().await;
    }
}
