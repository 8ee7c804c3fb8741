use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    alert::AlertDispatcher,
    sensing::{DisplayPowerSensor, TablePositionSensor},
};

use super::loop_worker::Workmon;

pub struct MonitorController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    dispatcher: Option<Arc<AlertDispatcher>>,
}

impl MonitorController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            dispatcher: None,
        }
    }

    pub fn start_monitoring<D, T>(&mut self, workmon: Workmon<D, T>) -> Result<()>
    where
        D: DisplayPowerSensor + 'static,
        T: TablePositionSensor + 'static,
    {
        if self.handle.is_some() {
            bail!("monitoring already active");
        }

        let cancel_token = CancellationToken::new();
        self.dispatcher = Some(workmon.dispatcher());
        self.handle = Some(tokio::spawn(workmon.run(cancel_token.clone())));
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the loop, wait for it, then shut the alert dispatcher down so the
    /// indicator ends up dark.
    pub async fn stop_monitoring(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let joined = match self.handle.take() {
            Some(handle) => handle.await.context("monitoring loop task failed to join"),
            None => Ok(()),
        };

        if let Some(dispatcher) = self.dispatcher.take() {
            info!("shutting down alert dispatcher");
            dispatcher.shutdown().await;
        }

        joined
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use tokio::time;

    use super::*;
    use crate::{
        alert::{AlertAction, AlertError, Color, IndicatorDevice, IndicatorError},
        monitor::Maximums,
        sensing::SensorError,
        settings::Settings,
    };

    struct Plug(Option<bool>);

    #[async_trait]
    impl DisplayPowerSensor for Plug {
        async fn is_on(&mut self) -> Option<bool> {
            self.0
        }
    }

    struct Desk(bool);

    #[async_trait]
    impl TablePositionSensor for Desk {
        async fn is_up(&mut self) -> Result<bool, SensorError> {
            Ok(self.0)
        }
    }

    #[derive(Clone, Default)]
    struct Lamp(Arc<Mutex<Vec<(Color, bool)>>>);

    impl IndicatorDevice for Lamp {
        fn turn_on(&mut self, color: Color) -> Result<(), IndicatorError> {
            self.0.lock().unwrap().push((color, true));
            Ok(())
        }

        fn turn_off(&mut self, color: Color) -> Result<(), IndicatorError> {
            self.0.lock().unwrap().push((color, false));
            Ok(())
        }
    }

    fn workmon(dispatcher: &Arc<AlertDispatcher>) -> Workmon<Plug, Desk> {
        let maximums = Maximums::try_from(&Settings {
            sample_interval_secs: 1,
            ..Settings::default()
        })
        .unwrap();
        Workmon::new(Plug(Some(true)), Desk(true), maximums, Arc::clone(dispatcher))
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let dispatcher = Arc::new(AlertDispatcher::spawn(Lamp::default()));
        let mut controller = MonitorController::new();

        controller.start_monitoring(workmon(&dispatcher)).unwrap();
        assert!(controller.is_running());
        assert!(controller.start_monitoring(workmon(&dispatcher)).is_err());

        controller.stop_monitoring().await.unwrap();
        assert!(!controller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_darkens_the_indicator_and_closes_the_dispatcher() {
        let lamp = Lamp::default();
        let dispatcher = Arc::new(AlertDispatcher::spawn(lamp.clone()));
        let mut controller = MonitorController::new();
        controller.start_monitoring(workmon(&dispatcher)).unwrap();

        dispatcher
            .request(Color::Yellow, AlertAction::Blink, Duration::from_secs(60))
            .unwrap();
        time::sleep(Duration::from_secs(3)).await;

        time::timeout(Duration::from_secs(1), controller.stop_monitoring())
            .await
            .expect("stop did not finish in time")
            .unwrap();

        let calls = lamp.0.lock().unwrap().clone();
        assert_eq!(calls.first(), Some(&(Color::Yellow, true)));
        for color in Color::ALL {
            assert!(calls.contains(&(color, false)), "{color} was left on");
        }
        assert_eq!(
            dispatcher.request(Color::Red, AlertAction::Blink, Duration::from_secs(1)),
            Err(AlertError::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_start_is_fine() {
        let mut controller = MonitorController::new();
        controller.stop_monitoring().await.unwrap();
    }
}
