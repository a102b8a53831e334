//! Register-level serial port abstractions
//!
//! Provides traits for duplex serial hardware driven one byte at a time:
//! a transmit register with a ready flag, and a receive register read from
//! the RX interrupt handler. Buffering and flow decisions live above these
//! traits, in the driver layer.

/// Serial transmit register
///
/// Implementations expose the data register and its empty flag for the
/// specific chip. Writing while [`tx_ready`](TxRegister::tx_ready) is false
/// overwrites the byte still being shifted out, so callers must check first.
pub trait TxRegister {
    /// Whether the data register can accept another byte
    fn tx_ready(&self) -> bool;

    /// Write one byte to the data register
    fn write(&mut self, byte: u8);
}

/// Serial receive register
///
/// Implementations expose the receive data register for the specific chip.
pub trait RxRegister {
    /// Read the received byte, releasing the hardware buffer slot
    ///
    /// Only meaningful when the hardware has flagged a received byte,
    /// which is the case inside the RX interrupt handler.
    fn read(&mut self) -> u8;
}

/// Duplex serial peripheral
///
/// Owns both directions of one port until [`split`](SerialPort::split)
/// hands the transmit half to the control loop and the receive half to
/// the interrupt handler.
pub trait SerialPort {
    /// Transmit half produced by [`split`](SerialPort::split)
    type Tx: TxRegister;
    /// Receive half produced by [`split`](SerialPort::split)
    type Rx: RxRegister;

    /// Apply baud rate and frame settings to the hardware
    fn configure(&mut self, config: SerialConfig);

    /// Unmask the receive-complete interrupt for this port
    fn enable_rx_interrupt(&mut self);

    /// Consume the peripheral, separating the two directions
    fn split(self) -> (Self::Tx, Self::Rx);
}

/// Serial port configuration
///
/// Frame format is fixed at 8 data bits, no parity, one stop bit, which
/// is what every peer device on the auxiliary port speaks.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { baudrate: 115200 }
    }
}

/// Clock divisor for a baud rate generator running at 8x oversampling
///
/// Rounds to the nearest divisor rather than truncating, halving the worst
/// case frequency error. The result goes straight into the chip's baud rate
/// register.
pub fn clock_divisor(clock_hz: u32, baudrate: u32) -> u16 {
    let divisor = (clock_hz + baudrate * 4) / (baudrate * 8);
    divisor.saturating_sub(1) as u16
}
