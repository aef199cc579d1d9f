//! # Clock Module
//!
//! Sorgente del tempo corrente per il calcolo delle directory per data.
//! Iniettabile per rendere deterministici i test.

use chrono::{DateTime, Local};
use std::fmt::Debug;

/// Provides the wall-clock time used when a file date is not requested
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Local>;
}

/// Real system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}
