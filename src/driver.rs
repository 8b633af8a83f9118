use crate::state::FieldSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Capability set a numerical scheme provides to the driver.
///
/// The driver never looks inside the kernel: it only asks for the clock,
/// grants steps and collects snapshots.
pub trait SimKernel {
    /// Prepares the kernel for stepping. Returns false if it cannot run.
    fn init(&mut self) -> bool;
    fn current_time(&self) -> f64;
    fn max_time(&self) -> f64;
    fn advance_one_step(&mut self);
    fn snapshot_fields(&self) -> FieldSet;
    fn describe_status(&self) -> String;
}

// Caller-contract violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("simulation driver: not initialized")]
    NotInitialized,
    #[error("simulation driver: already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Initialized,
}

pub struct SimulationDriver<K: SimKernel> {
    kernel: K,
    duration_bound: f64,
    lifecycle: Lifecycle,
}

impl<K: SimKernel> SimulationDriver<K> {
    /// `duration_bound` is the configured simulated duration; a negative
    /// value makes the run unbounded.
    pub fn new(kernel: K, duration_bound: f64) -> Self {
        SimulationDriver {
            kernel,
            duration_bound,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    fn assert_initialized(&self) -> Result<(), LifecycleError> {
        match self.lifecycle {
            Lifecycle::Initialized => Ok(()),
            Lifecycle::Uninitialized => Err(LifecycleError::NotInitialized),
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Delegates to the kernel's own initialization. A kernel that reports
    /// failure leaves the driver uninitialized.
    pub fn initialize(&mut self) -> Result<bool, LifecycleError> {
        if self.lifecycle == Lifecycle::Initialized {
            return Err(LifecycleError::AlreadyInitialized);
        }

        if self.kernel.init() {
            self.lifecycle = Lifecycle::Initialized;
            info!("Simulation kernel initialized");
            Ok(true)
        } else {
            warn!("Simulation kernel reported initialization failure");
            Ok(false)
        }
    }

    pub fn current_time(&self) -> Result<f64, LifecycleError> {
        self.assert_initialized()?;
        Ok(self.kernel.current_time())
    }

    pub fn max_time(&self) -> Result<f64, LifecycleError> {
        self.assert_initialized()?;
        Ok(self.kernel.max_time())
    }

    pub fn is_time_bounded(&self) -> bool {
        self.duration_bound >= 0.0
    }

    /// Executes one kernel step unless a time-bounded run is exhausted.
    /// Returns false, without stepping, once `current_time >= max_time`.
    pub fn step_if_budget_remains(&mut self) -> Result<bool, LifecycleError> {
        self.assert_initialized()?;

        if self.is_time_bounded() && self.kernel.current_time() >= self.kernel.max_time() {
            debug!(
                "Time budget exhausted at t={} (max {})",
                self.kernel.current_time(),
                self.kernel.max_time()
            );
            return Ok(false);
        }

        self.kernel.advance_one_step();
        Ok(true)
    }

    /// Fields at the current simulation time.
    pub fn snapshot(&self) -> Result<FieldSet, LifecycleError> {
        self.assert_initialized()?;
        Ok(self.kernel.snapshot_fields())
    }

    pub fn report_status(&self) -> Result<(), LifecycleError> {
        self.assert_initialized()?;
        info!("{}", self.kernel.describe_status());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Kernel advancing by a fixed time increment and counting the steps it was granted
    struct ScriptedKernel {
        init_ok: bool,
        dt: f64,
        max_time: f64,
        time: f64,
        steps: usize,
    }

    impl ScriptedKernel {
        fn new(dt: f64, max_time: f64) -> Self {
            ScriptedKernel {
                init_ok: true,
                dt,
                max_time,
                time: 0.0,
                steps: 0,
            }
        }
    }

    impl SimKernel for ScriptedKernel {
        fn init(&mut self) -> bool {
            self.init_ok
        }

        fn current_time(&self) -> f64 {
            self.time
        }

        fn max_time(&self) -> f64 {
            self.max_time
        }

        fn advance_one_step(&mut self) {
            self.time += self.dt;
            self.steps += 1;
        }

        fn snapshot_fields(&self) -> FieldSet {
            FieldSet {
                eta: vec![self.time as f32; 4],
                u: vec![0.0; 6],
                v: vec![0.0; 6],
            }
        }

        fn describe_status(&self) -> String {
            format!("t={}", self.time)
        }
    }

    fn initialized(kernel: ScriptedKernel, bound: f64) -> SimulationDriver<ScriptedKernel> {
        let mut driver = SimulationDriver::new(kernel, bound);
        assert_eq!(driver.initialize(), Ok(true));
        driver
    }

    #[test]
    fn test_bounded_run_stops_at_max_time() {
        let mut driver = initialized(ScriptedKernel::new(2.5, 10.0), 10.0);

        let mut accepted = 0;
        while driver.step_if_budget_remains().unwrap() {
            accepted += 1;
            assert!(accepted <= 4);
        }

        assert_eq!(accepted, 4);
        assert_eq!(driver.current_time().unwrap(), 10.0);
        assert_eq!(driver.kernel.steps, 4);

        // Exhausted runs stay exhausted and never step again
        assert_eq!(driver.step_if_budget_remains(), Ok(false));
        assert_eq!(driver.kernel.steps, 4);
    }

    #[test]
    fn test_bounded_run_steps_while_below_bound() {
        let mut driver = initialized(ScriptedKernel::new(3.0, 10.0), 10.0);

        for expected_time in [3.0, 6.0, 9.0, 12.0] {
            assert_eq!(driver.step_if_budget_remains(), Ok(true));
            assert_eq!(driver.current_time().unwrap(), expected_time);
        }
        assert_eq!(driver.step_if_budget_remains(), Ok(false));
        assert_eq!(driver.kernel.steps, 4);
    }

    #[test]
    fn test_unbounded_run_always_steps() {
        let mut driver = initialized(ScriptedKernel::new(5.0, 10.0), -1.0);

        for n in 1..=10 {
            assert_eq!(driver.step_if_budget_remains(), Ok(true));
            assert_eq!(driver.kernel.steps, n);
        }
        assert!(driver.current_time().unwrap() > driver.max_time().unwrap());
    }

    #[test]
    fn test_operations_before_initialize() {
        let mut driver = SimulationDriver::new(ScriptedKernel::new(1.0, 1.0), 1.0);

        assert_eq!(driver.current_time(), Err(LifecycleError::NotInitialized));
        assert_eq!(driver.max_time(), Err(LifecycleError::NotInitialized));
        assert_eq!(
            driver.step_if_budget_remains(),
            Err(LifecycleError::NotInitialized)
        );
        assert_eq!(driver.snapshot(), Err(LifecycleError::NotInitialized));
        assert_eq!(driver.report_status(), Err(LifecycleError::NotInitialized));
        assert_eq!(driver.kernel.steps, 0);
    }

    #[test]
    fn test_double_initialize() {
        let mut driver = initialized(ScriptedKernel::new(1.0, 1.0), 1.0);
        assert_eq!(driver.initialize(), Err(LifecycleError::AlreadyInitialized));
        assert_eq!(driver.lifecycle, Lifecycle::Initialized);
    }

    #[test]
    fn test_failed_initialize_stays_uninitialized() {
        let mut kernel = ScriptedKernel::new(1.0, 1.0);
        kernel.init_ok = false;
        let mut driver = SimulationDriver::new(kernel, 1.0);

        assert_eq!(driver.initialize(), Ok(false));
        assert_eq!(driver.lifecycle, Lifecycle::Uninitialized);
        assert_eq!(driver.current_time(), Err(LifecycleError::NotInitialized));

        driver.kernel.init_ok = true;
        assert_eq!(driver.initialize(), Ok(true));
    }

    #[test]
    fn test_snapshot_does_not_step() {
        let mut driver = initialized(ScriptedKernel::new(1.0, 5.0), 5.0);
        driver.step_if_budget_remains().unwrap();

        let first = driver.snapshot().unwrap();
        let second = driver.snapshot().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.eta, vec![1.0; 4]);
        assert_eq!(driver.kernel.steps, 1);
    }
}
