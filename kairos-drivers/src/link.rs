//! Auxiliary serial link
//!
//! Duplex byte transport between the control loop and the auxiliary
//! controller. Received bytes arrive by interrupt and are parked in a
//! lock-free queue until the control loop gets around to them, so the
//! interrupt handler finishes in constant time. Transmission is the
//! reverse: rare, short, and synchronous, spinning on the hardware ready
//! flag from foreground code only.
//!
//! [`AuxLink::init`] splits the port into the two halves once at startup:
//!
//! ```ignore
//! static RX_QUEUE: StaticCell<Queue<u8, RX_QUEUE_LEN>> = StaticCell::new();
//! static LINK_STATS: LinkStats = LinkStats::new();
//!
//! let (aux, isr) = AuxLink::init(
//!     port,
//!     RX_QUEUE.init(Queue::new()),
//!     &LINK_STATS,
//!     SerialConfig::default(),
//! );
//! // `isr` moves into the USART interrupt handler, `aux` into the
//! // control loop; the vector binding is the board crate's job.
//! ```
//!
//! The queue is single producer, single consumer: the tail index is
//! written only by the interrupt handler and the head index only by the
//! foreground, which is what makes the lock-free sharing sound.

use core::convert::Infallible;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use heapless::spsc::{Consumer, Producer, Queue};

use kairos_core::calibration::CommandSink;
use kairos_hal::serial::{RxRegister, SerialConfig, SerialPort, TxRegister};

/// Receive queue length in bytes
///
/// The queue stores one byte less than its length, so this holds 31
/// received bytes, about 2.7 ms of wire time at 115200 baud. The control
/// loop drains the queue every cycle, which runs an order of magnitude
/// faster than that.
pub const RX_QUEUE_LEN: usize = 32;

/// Process-lifetime link counters
///
/// Lives in a `static` next to the receive queue. Written from interrupt
/// context, read from foreground.
pub struct LinkStats {
    rx_dropped: AtomicU32,
}

impl LinkStats {
    /// Create a zeroed counter block
    pub const fn new() -> Self {
        Self {
            rx_dropped: AtomicU32::new(0),
        }
    }

    /// Total received bytes dropped to a full queue
    pub fn rx_dropped(&self) -> u32 {
        self.rx_dropped.load(Ordering::Relaxed)
    }

    /// Count one dropped byte
    ///
    /// Only the interrupt handler writes this counter, so a separate load
    /// and store cannot lose an increment, and it stays usable on cores
    /// without atomic read-modify-write instructions.
    fn record_rx_drop(&self) {
        let count = self.rx_dropped.load(Ordering::Relaxed);
        self.rx_dropped.store(count.wrapping_add(1), Ordering::Relaxed);
    }
}

impl Default for LinkStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Foreground half of the auxiliary link
///
/// Owned by the control loop. Transmits synchronously and drains the
/// receive queue without blocking.
pub struct AuxLink<'a, Tx, const N: usize = RX_QUEUE_LEN> {
    tx: Tx,
    rx_queue: Consumer<'a, u8, N>,
    stats: &'a LinkStats,
}

/// Interrupt half of the auxiliary link
///
/// Owned by the receive-complete interrupt handler, which calls
/// [`on_rx_interrupt`](Self::on_rx_interrupt) once per received byte.
pub struct LinkIsr<'a, Rx, const N: usize = RX_QUEUE_LEN> {
    rx: Rx,
    rx_queue: Producer<'a, u8, N>,
    stats: &'a LinkStats,
}

impl<'a, Tx: TxRegister, const N: usize> AuxLink<'a, Tx, N> {
    /// Bring up the port and split it into its two halves
    ///
    /// Applies the baud configuration, discards anything left in the
    /// receive queue, and enables the receive-complete interrupt. After
    /// this returns, received bytes start landing in the queue as soon
    /// as the board crate binds the interrupt. The handles are the only
    /// way to reach the link, so no traffic can flow through an
    /// unconfigured port.
    pub fn init<P>(
        mut port: P,
        queue: &'a mut Queue<u8, N>,
        stats: &'a LinkStats,
        config: SerialConfig,
    ) -> (Self, LinkIsr<'a, P::Rx, N>)
    where
        P: SerialPort<Tx = Tx>,
    {
        port.configure(config);
        while queue.dequeue().is_some() {}
        port.enable_rx_interrupt();

        let (producer, consumer) = queue.split();
        let (tx, rx) = port.split();

        (
            Self {
                tx,
                rx_queue: consumer,
                stats,
            },
            LinkIsr {
                rx,
                rx_queue: producer,
                stats,
            },
        )
    }

    /// Transmit one byte, spinning until the hardware accepts it
    ///
    /// The wait is bounded by one frame time at the configured baud rate.
    /// Foreground only; the interrupt handler must never transmit.
    pub fn put_byte(&mut self, byte: u8) {
        while !self.tx.tx_ready() {
            core::hint::spin_loop();
        }
        self.tx.write(byte);
    }

    /// Transmit every byte of a string
    pub fn send_str(&mut self, s: &str) {
        for &byte in s.as_bytes() {
            self.put_byte(byte);
        }
    }

    /// Take the oldest received byte, or `None` if the queue is empty
    ///
    /// Never blocks. Bytes come out in wire arrival order.
    pub fn get_byte(&mut self) -> Option<u8> {
        self.rx_queue.dequeue()
    }

    /// Whether at least one received byte is waiting
    pub fn has_byte(&self) -> bool {
        self.rx_queue.ready()
    }

    /// Received bytes dropped so far to a full queue
    ///
    /// A rising value means the control loop is not draining the queue
    /// fast enough and higher-level messages may arrive corrupted.
    pub fn rx_dropped(&self) -> u32 {
        self.stats.rx_dropped()
    }
}

/// Formatted output straight onto the wire, used for command strings
/// and diagnostics aimed at the auxiliary controller.
impl<Tx: TxRegister, const N: usize> fmt::Write for AuxLink<'_, Tx, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.send_str(s);
        Ok(())
    }
}

/// Command lines go out newline-terminated; transmission spins rather
/// than fails, so the sink has no error case.
impl<Tx: TxRegister, const N: usize> CommandSink for AuxLink<'_, Tx, N> {
    type Error = Infallible;

    fn push(&mut self, command: &str) -> Result<(), Infallible> {
        self.send_str(command);
        self.put_byte(b'\n');
        Ok(())
    }
}

impl<Rx: RxRegister, const N: usize> LinkIsr<'_, Rx, N> {
    /// Handle one receive-complete interrupt
    ///
    /// Reads the data register exactly once, which also clears the
    /// interrupt condition, and queues the byte. When the queue is full
    /// the byte is dropped and counted; the handler never waits for the
    /// consumer. Constant time, no allocation.
    pub fn on_rx_interrupt(&mut self) {
        let byte = self.rx.read();
        if self.rx_queue.enqueue(byte).is_err() {
            self.stats.record_rx_drop();
            #[cfg(feature = "defmt")]
            defmt::warn!("aux link rx queue full, dropped {=u8:x}", byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::fmt::Write;
    use heapless::Vec;

    /// Transmit register that records writes and can simulate a busy
    /// shift register for a number of polls
    struct FakeTx {
        busy_polls: Cell<u32>,
        written: Vec<u8, 64>,
        baud: Option<u32>,
        rx_irq_enabled: bool,
    }

    impl FakeTx {
        fn idle() -> Self {
            Self {
                busy_polls: Cell::new(0),
                written: Vec::new(),
                baud: None,
                rx_irq_enabled: false,
            }
        }
    }

    impl TxRegister for FakeTx {
        fn tx_ready(&self) -> bool {
            let remaining = self.busy_polls.get();
            if remaining == 0 {
                true
            } else {
                self.busy_polls.set(remaining - 1);
                false
            }
        }

        fn write(&mut self, byte: u8) {
            let _ = self.written.push(byte);
        }
    }

    /// Receive register delivering whatever the test put on the wire
    struct FakeRx {
        wire: u8,
    }

    impl RxRegister for FakeRx {
        fn read(&mut self) -> u8 {
            self.wire
        }
    }

    struct FakePort {
        tx: FakeTx,
        rx: FakeRx,
    }

    impl FakePort {
        fn new() -> Self {
            Self {
                tx: FakeTx::idle(),
                rx: FakeRx { wire: 0 },
            }
        }
    }

    impl SerialPort for FakePort {
        type Tx = FakeTx;
        type Rx = FakeRx;

        fn configure(&mut self, config: SerialConfig) {
            self.tx.baud = Some(config.baudrate);
        }

        fn enable_rx_interrupt(&mut self) {
            self.tx.rx_irq_enabled = true;
        }

        fn split(self) -> (FakeTx, FakeRx) {
            (self.tx, self.rx)
        }
    }

    fn receive<const N: usize>(isr: &mut LinkIsr<'_, FakeRx, N>, byte: u8) {
        isr.rx.wire = byte;
        isr.on_rx_interrupt();
    }

    #[test]
    fn test_init_configures_port_and_enables_rx_interrupt() {
        let mut queue: Queue<u8, RX_QUEUE_LEN> = Queue::new();
        let stats = LinkStats::new();
        let (aux, _isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        assert_eq!(aux.tx.baud, Some(115200));
        assert!(aux.tx.rx_irq_enabled);
        assert_eq!(aux.rx_dropped(), 0);
    }

    #[test]
    fn test_init_discards_stale_bytes() {
        let mut queue: Queue<u8, RX_QUEUE_LEN> = Queue::new();
        queue.enqueue(0xAA).unwrap();
        queue.enqueue(0xBB).unwrap();

        let stats = LinkStats::new();
        let (mut aux, _isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        assert!(!aux.has_byte());
        assert_eq!(aux.get_byte(), None);
    }

    #[test]
    fn test_put_byte_spins_until_hardware_ready() {
        let mut queue: Queue<u8, RX_QUEUE_LEN> = Queue::new();
        let stats = LinkStats::new();
        let mut port = FakePort::new();
        port.tx.busy_polls = Cell::new(3);

        let (mut aux, _isr) = AuxLink::init(port, &mut queue, &stats, SerialConfig::default());
        aux.put_byte(0x55);

        assert_eq!(&aux.tx.written[..], &[0x55]);
        assert_eq!(aux.tx.busy_polls.get(), 0);
    }

    #[test]
    fn test_bytes_come_out_in_arrival_order() {
        let mut queue: Queue<u8, RX_QUEUE_LEN> = Queue::new();
        let stats = LinkStats::new();
        let (mut aux, mut isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        receive(&mut isr, b'a');
        receive(&mut isr, b'b');
        receive(&mut isr, b'c');

        assert!(aux.has_byte());
        assert_eq!(aux.get_byte(), Some(b'a'));
        assert_eq!(aux.get_byte(), Some(b'b'));
        assert_eq!(aux.get_byte(), Some(b'c'));
        assert_eq!(aux.get_byte(), None);
        assert!(!aux.has_byte());
    }

    #[test]
    fn test_full_queue_drops_incoming_byte() {
        // Length 5 queue holds 4 bytes; the fifth arrival must be the
        // one discarded, leaving the first four untouched.
        let mut queue: Queue<u8, 5> = Queue::new();
        let stats = LinkStats::new();
        let (mut aux, mut isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        for byte in 1..=5 {
            receive(&mut isr, byte);
        }

        assert_eq!(aux.rx_dropped(), 1);
        assert_eq!(aux.get_byte(), Some(1));
        assert_eq!(aux.get_byte(), Some(2));
        assert_eq!(aux.get_byte(), Some(3));
        assert_eq!(aux.get_byte(), Some(4));
        assert_eq!(aux.get_byte(), None);
    }

    #[test]
    fn test_rx_dropped_counts_every_overflow() {
        let mut queue: Queue<u8, 5> = Queue::new();
        let stats = LinkStats::new();
        let (aux, mut isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        for byte in 0..7 {
            receive(&mut isr, byte);
        }

        assert_eq!(aux.rx_dropped(), 3);
    }

    #[test]
    fn test_queue_recovers_after_overflow() {
        let mut queue: Queue<u8, 5> = Queue::new();
        let stats = LinkStats::new();
        let (mut aux, mut isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        for byte in 1..=5 {
            receive(&mut isr, byte);
        }
        assert_eq!(aux.get_byte(), Some(1));

        receive(&mut isr, 6);
        assert_eq!(aux.get_byte(), Some(2));
        assert_eq!(aux.get_byte(), Some(3));
        assert_eq!(aux.get_byte(), Some(4));
        assert_eq!(aux.get_byte(), Some(6));
        assert_eq!(aux.rx_dropped(), 1);
    }

    #[test]
    fn test_pops_interleaved_with_pushes_keep_order() {
        let mut queue: Queue<u8, RX_QUEUE_LEN> = Queue::new();
        let stats = LinkStats::new();
        let (mut aux, mut isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        receive(&mut isr, 10);
        receive(&mut isr, 11);
        assert_eq!(aux.get_byte(), Some(10));
        receive(&mut isr, 12);
        receive(&mut isr, 13);
        assert_eq!(aux.get_byte(), Some(11));
        assert_eq!(aux.get_byte(), Some(12));
        assert_eq!(aux.get_byte(), Some(13));
        assert_eq!(aux.get_byte(), None);
    }

    #[test]
    fn test_send_str_transmits_every_byte() {
        let mut queue: Queue<u8, RX_QUEUE_LEN> = Queue::new();
        let stats = LinkStats::new();
        let (mut aux, _isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        aux.send_str("G28");
        assert_eq!(&aux.tx.written[..], b"G28");
    }

    #[test]
    fn test_fmt_write_goes_out_the_transmit_path() {
        let mut queue: Queue<u8, RX_QUEUE_LEN> = Queue::new();
        let stats = LinkStats::new();
        let (mut aux, _isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        write!(aux, "T{}", 3).unwrap();
        assert_eq!(&aux.tx.written[..], b"T3");
    }

    #[test]
    fn test_command_sink_terminates_lines() {
        let mut queue: Queue<u8, RX_QUEUE_LEN> = Queue::new();
        let stats = LinkStats::new();
        let (mut aux, _isr) =
            AuxLink::init(FakePort::new(), &mut queue, &stats, SerialConfig::default());

        aux.push("G92E0").unwrap();
        assert_eq!(&aux.tx.written[..], b"G92E0\n");
    }
}
