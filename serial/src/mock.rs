//! Host-side stand-ins for the peripheral, GPIO and execution context.
//!
//! All three share one [`MockState`] so tests can observe the relative
//! order of data-register writes, direction changes and pin levels.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicUsize, Ordering};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::vec::Vec;

use common::sync::NoopIrq;

use crate::hal::gpio::{GpioController, GpioError, PinLevel, PullMode};
use crate::hal::interrupt::{ExecutionContext, Preemption};
use crate::hal::serial::{
    Direction, SerialError, SerialFormat, SerialPeripheral, Status, TxInterrupts,
};
use crate::platform::Platform;

/// Transmit FIFO level at or below which the mock reports transmit-ready.
const TX_WATERMARK: usize = 2;
const PIN_COUNT: u8 = 34;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PowerUp(u32),
    ShutDown,
    Format(SerialFormat),
    SingleWire(bool),
    Direction(Direction),
    TxInterrupts(TxInterrupts),
    Data(u16),
    /// Data register read with nothing received.
    Underrun,
    FlushRx,
    Receiver(bool),
    Cts(u8),
    Output(u8),
    Pull(u8, PullMode),
    Pin(u8, PinLevel),
}

#[derive(Debug)]
pub struct MockState {
    fifo_depth: usize,
    enabled: AtomicBool,
    /// Transmitter output is held (nothing ever shifts out).
    stalled: AtomicBool,
    /// Written units leave the shifter at once.
    instant: AtomicBool,
    idle: AtomicBool,
    ninth_bit_out: AtomicBool,
    /// Units written and not yet shifted out.
    tx_pending: AtomicUsize,
    tx_mode: AtomicU8,
    divisor: AtomicU32,
    preemption: AtomicU8,
    yields: AtomicUsize,
    rx: Mutex<VecDeque<u16>>,
    events: Mutex<Vec<Event>>,
}

impl MockState {
    /// A peripheral with a `fifo_depth`-deep transmit side. Depth 1 is a
    /// plain data register.
    pub fn new(fifo_depth: usize) -> Arc<Self> {
        Arc::new(Self {
            fifo_depth,
            enabled: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            instant: AtomicBool::new(false),
            idle: AtomicBool::new(false),
            ninth_bit_out: AtomicBool::new(false),
            tx_pending: AtomicUsize::new(0),
            tx_mode: AtomicU8::new(0),
            divisor: AtomicU32::new(0),
            preemption: AtomicU8::new(2),
            yields: AtomicUsize::new(0),
            rx: Mutex::new(VecDeque::new()),
            events: Mutex::new(Vec::new()),
        })
    }

    fn log(&self, event: Event) {
        self.events().push(event);
    }

    pub fn events(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn take_events(&self) -> Vec<Event> {
        core::mem::take(&mut *self.events())
    }

    /// Units written to the data register, with their 9th bit.
    pub fn wire(&self) -> Vec<u16> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                Event::Data(word) => Some(*word),
                _ => None,
            })
            .collect()
    }

    /// Levels driven onto `pin`, oldest first.
    pub fn pin_history(&self, pin: u8) -> Vec<PinLevel> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                Event::Pin(p, level) if *p == pin => Some(*level),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, wanted: &Event) -> Option<usize> {
        self.events().iter().position(|event| event == wanted)
    }

    pub fn divisor(&self) -> u32 {
        self.divisor.load(Ordering::SeqCst)
    }

    /// Units arriving on the wire. Bit 8 is the 9th bit.
    pub fn receive(&self, words: &[u16]) {
        let mut rx = self.rx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rx.extend(words.iter().copied());
    }

    pub fn rx_pending(&self) -> usize {
        self.rx.lock().map(|rx| rx.len()).unwrap_or(0)
    }

    pub fn set_idle(&self, idle: bool) {
        self.idle.store(idle, Ordering::SeqCst);
    }

    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub fn set_instant(&self, instant: bool) {
        self.instant.store(instant, Ordering::SeqCst);
    }

    /// Let `count` written units leave the shifter.
    pub fn shift_out(&self, count: usize) {
        let _ = self
            .tx_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                Some(pending.saturating_sub(count))
            });
    }

    pub fn tx_pending(&self) -> usize {
        self.tx_pending.load(Ordering::SeqCst)
    }

    pub fn set_preemption(&self, preemption: Preemption) {
        let raw = match preemption {
            Preemption::Masked => 0,
            Preemption::Preemptible => 1,
            Preemption::Cooperative => 2,
        };
        self.preemption.store(raw, Ordering::SeqCst);
    }

    pub fn yields(&self) -> usize {
        self.yields.load(Ordering::SeqCst)
    }

    pub fn tx_mode(&self) -> TxInterrupts {
        match self.tx_mode.load(Ordering::SeqCst) {
            1 => TxInterrupts::Active,
            2 => TxInterrupts::Completing,
            _ => TxInterrupts::Inactive,
        }
    }

    fn tx_ready(&self) -> bool {
        if self.stalled.load(Ordering::SeqCst) {
            return false;
        }
        let pending = self.tx_pending();
        if self.fifo_depth > 1 {
            pending <= TX_WATERMARK
        } else {
            pending == 0
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockUart(pub Arc<MockState>);

impl SerialPeripheral for MockUart {
    fn tx_fifo_depth(&self) -> usize {
        self.0.fifo_depth
    }

    fn min_divisor(&self) -> u32 {
        if self.has_fifo() { 32 } else { 1 }
    }

    fn divisor(&self, baud_rate: u32) -> Result<u32, SerialError> {
        if baud_rate == 0 {
            return Err(SerialError::InvalidConfig);
        }
        Ok(1_000_000 / baud_rate)
    }

    fn is_enabled(&self) -> bool {
        self.0.enabled.load(Ordering::SeqCst)
    }

    fn power_up(&self, divisor: u32) {
        self.0.divisor.store(divisor, Ordering::SeqCst);
        self.0.enabled.store(true, Ordering::SeqCst);
        self.0.tx_mode.store(0, Ordering::SeqCst);
        self.0.log(Event::PowerUp(divisor));
    }

    fn shut_down(&self) {
        self.0.tx_mode.store(0, Ordering::SeqCst);
        self.0.log(Event::ShutDown);
    }

    fn apply_format(&self, format: SerialFormat) {
        self.0.log(Event::Format(format));
    }

    fn set_single_wire(&self, enabled: bool) {
        self.0.log(Event::SingleWire(enabled));
    }

    fn set_direction(&self, direction: Direction) {
        self.0.log(Event::Direction(direction));
    }

    fn status(&self) -> Status {
        let mut status = Status::empty();
        let pending = self.0.tx_pending();
        let stalled = self.0.stalled.load(Ordering::SeqCst);
        status.set(Status::TX_READY, self.0.tx_ready());
        status.set(Status::TX_COMPLETE, !stalled && pending == 0);
        status.set(Status::RX_READY, self.0.rx_pending() > 0);
        status.set(Status::IDLE, self.0.idle.load(Ordering::SeqCst));
        status
    }

    fn tx_interrupts(&self) -> TxInterrupts {
        self.0.tx_mode()
    }

    fn set_tx_interrupts(&self, mode: TxInterrupts) {
        let raw = match mode {
            TxInterrupts::Inactive => 0,
            TxInterrupts::Active => 1,
            TxInterrupts::Completing => 2,
        };
        if self.0.tx_mode.swap(raw, Ordering::SeqCst) != raw {
            self.0.log(Event::TxInterrupts(mode));
        }
    }

    fn rx_fifo_count(&self) -> usize {
        let pending = self.0.rx_pending();
        if self.has_fifo() {
            pending.min(self.0.fifo_depth)
        } else {
            pending.min(1)
        }
    }

    fn tx_fifo_count(&self) -> usize {
        self.0.tx_pending()
    }

    fn ninth_bit_received(&self) -> bool {
        self.0
            .rx
            .lock()
            .ok()
            .and_then(|rx| rx.front().copied())
            .is_some_and(|word| word & 0x100 != 0)
    }

    fn read_data(&self) -> u8 {
        let word = self
            .0
            .rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        match word {
            Some(word) => word as u8,
            None => {
                self.0.log(Event::Underrun);
                0
            }
        }
    }

    fn set_ninth_bit(&self, bit: bool) {
        self.0.ninth_bit_out.store(bit, Ordering::SeqCst);
    }

    fn write_data(&self, byte: u8) {
        let ninth = if self.0.ninth_bit_out.load(Ordering::SeqCst) { 0x100 } else { 0 };
        if !self.0.instant.load(Ordering::SeqCst) {
            self.0.tx_pending.fetch_add(1, Ordering::SeqCst);
        }
        self.0.log(Event::Data(u16::from(byte) | ninth));
    }

    fn flush_rx_fifo(&self) {
        self.0
            .rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        self.0.idle.store(false, Ordering::SeqCst);
        self.0.log(Event::FlushRx);
    }

    fn set_receiver_enabled(&self, enabled: bool) {
        self.0.log(Event::Receiver(enabled));
    }

    fn route_cts(&self, pin: u8) -> bool {
        if self.has_fifo() && (pin == 18 || pin == 20) {
            self.0.log(Event::Cts(pin));
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockGpio(pub Arc<MockState>);

impl MockGpio {
    fn check(pin: u8) -> Result<(), GpioError> {
        if pin < PIN_COUNT {
            Ok(())
        } else {
            Err(GpioError::InvalidPin)
        }
    }
}

impl GpioController for MockGpio {
    type Pin = u8;
    type Error = GpioError;

    fn set_output(&mut self, pin: u8) -> Result<(), GpioError> {
        Self::check(pin)?;
        self.0.log(Event::Output(pin));
        Ok(())
    }

    fn set_pull(&mut self, pin: u8, pull: PullMode) -> Result<(), GpioError> {
        Self::check(pin)?;
        self.0.log(Event::Pull(pin, pull));
        Ok(())
    }

    fn set_high(&mut self, pin: u8) -> Result<(), GpioError> {
        Self::check(pin)?;
        self.0.log(Event::Pin(pin, PinLevel::High));
        Ok(())
    }

    fn set_low(&mut self, pin: u8) -> Result<(), GpioError> {
        Self::check(pin)?;
        self.0.log(Event::Pin(pin, PinLevel::Low));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MockContext(pub Arc<MockState>);

impl ExecutionContext for MockContext {
    fn preemption(&self) -> Preemption {
        match self.0.preemption.load(Ordering::SeqCst) {
            0 => Preemption::Masked,
            1 => Preemption::Preemptible,
            _ => Preemption::Cooperative,
        }
    }

    fn yield_now(&self) {
        self.0.yields.fetch_add(1, Ordering::SeqCst);
        std::thread::yield_now();
    }
}

pub struct MockPlatform;

impl MockPlatform {
    /// Peripheral, GPIO and context sharing a fresh state.
    pub fn parts(fifo_depth: usize) -> (Arc<MockState>, MockUart, MockGpio, MockContext) {
        let state = MockState::new(fifo_depth);
        (
            state.clone(),
            MockUart(state.clone()),
            MockGpio(state.clone()),
            MockContext(state),
        )
    }
}

impl Platform for MockPlatform {
    type Uart = MockUart;
    type Gpio = MockGpio;
    type Context = MockContext;
    type Irq = NoopIrq;

    fn name() -> &'static str {
        "mock"
    }

    fn tx_pin() -> u8 {
        1
    }

    unsafe fn uart() -> MockUart {
        MockUart(MockState::new(1))
    }

    unsafe fn gpio() -> MockGpio {
        MockGpio(MockState::new(1))
    }

    fn context() -> MockContext {
        MockContext(MockState::new(1))
    }
}
