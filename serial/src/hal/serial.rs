//! Serial Port (UART) Hardware Abstraction Layer.
//!
//! This module defines the platform-independent view of a serial
//! peripheral: the frame format, the status flags the interrupt
//! handler looks at, and the [`SerialPeripheral`] capability trait the
//! buffered channel drives.

use bitflags::bitflags;

/// Serial port configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Baud rate in bits per second.
    pub baud_rate: u32,
    /// Number of data bits per frame.
    pub data_bits: DataBits,
    /// Parity checking mode.
    pub parity: Parity,
    /// Number of stop bits.
    pub stop_bits: StopBits,
}

impl SerialConfig {
    /// Create a standard 8N1 configuration at the specified baud rate.
    ///
    /// 8N1 means: 8 data bits, no parity, 1 stop bit.
    pub const fn new_8n1(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl Default for SerialConfig {
    /// Default configuration: 115200 baud, 8N1.
    fn default() -> Self {
        Self::new_8n1(115200)
    }
}

/// Number of data bits per frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
    /// Nine data bits, carried in `u16` slots.
    Nine,
}

/// Parity mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Parity {
    /// No parity bit.
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Number of stop bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StopBits {
    /// One stop bit.
    One,
    /// Two stop bits.
    Two,
}

/// Serial port errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SerialError {
    /// Invalid configuration parameter.
    InvalidConfig,
    /// The frame format is not supported by the peripheral.
    UnsupportedFormat,
}

bitflags! {
    /// Frame format and line options.
    ///
    /// The low nibble follows the peripheral's parity/length encoding:
    /// parity is counted as a data bit, so 8E1 is a 9-bit frame.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct SerialFormat: u32 {
        /// Odd parity (only meaningful with `PARITY_ENABLE`).
        const PARITY_ODD = 0x01;
        /// Generate and check a parity bit.
        const PARITY_ENABLE = 0x02;
        /// Nine-bit frames. Without parity or nine-bit mode the 9th bit is
        /// always 1, which gives 8N2.
        const NINE_BITS = 0x04;
        /// Nine data bits plus parity (ten-bit frames).
        const NINE_BIT_PARITY = 0x08;
        /// Invert the receive line.
        const RX_INVERT = 0x10;
        /// Invert the transmit line.
        const TX_INVERT = 0x20;
        /// Carry the 9th bit through the buffers as data.
        const NINE_BIT_MODE = 0x80;
        /// Hardware two-stop-bit mode, where the peripheral has it.
        const TWO_STOP_BITS = 0x100;
        /// Single-wire half duplex on the transmit pin.
        const HALF_DUPLEX = 0x200;
    }
}

impl SerialFormat {
    pub const FORMAT_7E1: Self = Self::PARITY_ENABLE;
    pub const FORMAT_7O1: Self = Self::PARITY_ENABLE.union(Self::PARITY_ODD);
    pub const FORMAT_8N1: Self = Self::empty();
    pub const FORMAT_8N2: Self = Self::NINE_BITS;
    pub const FORMAT_8E1: Self = Self::NINE_BITS.union(Self::PARITY_ENABLE);
    pub const FORMAT_8O1: Self = Self::FORMAT_8E1.union(Self::PARITY_ODD);
    pub const FORMAT_9N1: Self = Self::NINE_BIT_MODE.union(Self::NINE_BITS);
    pub const FORMAT_9E1: Self = Self::FORMAT_9N1
        .union(Self::NINE_BIT_PARITY)
        .union(Self::PARITY_ENABLE);
    pub const FORMAT_9O1: Self = Self::FORMAT_9E1.union(Self::PARITY_ODD);

    /// Frame length and parity bits, without the line options.
    pub const fn frame(self) -> Self {
        Self::from_bits_truncate(self.bits() & 0x0F)
    }
}

impl TryFrom<SerialConfig> for SerialFormat {
    type Error = SerialError;

    fn try_from(config: SerialConfig) -> Result<Self, Self::Error> {
        let base = match (config.data_bits, config.parity) {
            // Seven bits only exist with parity filling the 8th
            (DataBits::Seven, Parity::None) => return Err(SerialError::UnsupportedFormat),
            (DataBits::Seven, Parity::Even) => Self::FORMAT_7E1,
            (DataBits::Seven, Parity::Odd) => Self::FORMAT_7O1,
            (DataBits::Eight, Parity::None) => match config.stop_bits {
                StopBits::One => Self::FORMAT_8N1,
                // 9th bit held high doubles as the second stop bit
                StopBits::Two => return Ok(Self::FORMAT_8N2),
            },
            (DataBits::Eight, Parity::Even) => Self::FORMAT_8E1,
            (DataBits::Eight, Parity::Odd) => Self::FORMAT_8O1,
            (DataBits::Nine, Parity::None) => Self::FORMAT_9N1,
            (DataBits::Nine, Parity::Even) => Self::FORMAT_9E1,
            (DataBits::Nine, Parity::Odd) => Self::FORMAT_9O1,
        };

        Ok(match config.stop_bits {
            StopBits::One => base,
            StopBits::Two => base | Self::TWO_STOP_BITS,
        })
    }
}

bitflags! {
    /// Peripheral status flags the interrupt handler acts on.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Status: u8 {
        /// The transmit data register (or FIFO) can take another unit.
        const TX_READY = 1 << 0;
        /// The last unit has been shifted out onto the wire.
        const TX_COMPLETE = 1 << 1;
        /// Received data is waiting (or the receive FIFO hit its watermark).
        const RX_READY = 1 << 2;
        /// The receive line went idle.
        const IDLE = 1 << 3;
    }
}

/// Which transmit interrupts are enabled. Receive interrupts stay on in
/// every mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxInterrupts {
    /// No transmit interrupts.
    Inactive,
    /// Transmit-ready: the ring is being drained.
    Active,
    /// Transmit-complete: the ring is empty, the last unit is in flight.
    Completing,
}

/// Direction of a single-wire (half-duplex) line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Receive,
    Transmit,
}

/// Capability set of one interrupt-driven serial peripheral.
///
/// All methods take `&self`: the peripheral is shared between the
/// interrupt handler and foreground code, and register access is
/// inherently interior-mutable. Implementations must not block.
pub trait SerialPeripheral {
    /// Units the hardware transmit side holds. `1` is a plain data register.
    fn tx_fifo_depth(&self) -> usize;

    /// True when the peripheral buffers in a multi-slot hardware FIFO.
    fn has_fifo(&self) -> bool {
        self.tx_fifo_depth() > 1
    }

    /// Smallest baud divisor the peripheral accepts.
    fn min_divisor(&self) -> u32;

    /// Compute the baud divisor for `baud_rate`.
    fn divisor(&self, baud_rate: u32) -> Result<u32, SerialError>;

    /// Whether the peripheral's clock gate is on.
    fn is_enabled(&self) -> bool;

    /// Ungate the clock, program the divisor, enable the transmitter and
    /// receiver with [`TxInterrupts::Inactive`], and unmask the interrupt.
    fn power_up(&self, divisor: u32);

    /// Mask the interrupt, disable transmitter and receiver, and clear any
    /// leftover error status. The clock gate is left on.
    fn shut_down(&self);

    /// Program parity, frame length, inversion and stop bits.
    fn apply_format(&self, format: SerialFormat);

    /// Enter or leave single-wire loopback with direction override.
    fn set_single_wire(&self, enabled: bool);

    /// Drive the single-wire direction control.
    fn set_direction(&self, direction: Direction);

    fn status(&self) -> Status;

    fn tx_interrupts(&self) -> TxInterrupts;

    fn set_tx_interrupts(&self, mode: TxInterrupts);

    /// Units waiting in the receive FIFO, or 0/1 for a single data register.
    fn rx_fifo_count(&self) -> usize;

    /// Units waiting in the transmit FIFO, or 0/1 for a single data register.
    fn tx_fifo_count(&self) -> usize;

    /// The 9th bit of the unit about to be read. Must be sampled before
    /// [`read_data`](Self::read_data).
    fn ninth_bit_received(&self) -> bool;

    fn read_data(&self) -> u8;

    /// Set the 9th bit of the next unit. Must precede
    /// [`write_data`](Self::write_data).
    fn set_ninth_bit(&self, bit: bool);

    fn write_data(&self, byte: u8);

    /// Discard the hardware receive FIFO, recovering from an underrun.
    fn flush_rx_fifo(&self);

    /// Gate the receiver and its interrupts.
    fn set_receiver_enabled(&self, enabled: bool);

    /// Route CTS to `pin`. Returns false (and disables CTS) when the pin
    /// has no hardware route.
    fn route_cts(&self, pin: u8) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_8n1_is_empty_format() {
        let format = SerialFormat::try_from(SerialConfig::default()).unwrap();
        assert_eq!(format, SerialFormat::FORMAT_8N1);
        assert_eq!(format.bits(), 0);
    }

    #[test]
    fn test_format_bit_values() {
        assert_eq!(SerialFormat::FORMAT_7O1.bits(), 0x03);
        assert_eq!(SerialFormat::FORMAT_8N2.bits(), 0x04);
        assert_eq!(SerialFormat::FORMAT_8E1.bits(), 0x06);
        assert_eq!(SerialFormat::FORMAT_8O1.bits(), 0x07);
        assert_eq!(SerialFormat::FORMAT_9N1.bits(), 0x84);
        assert_eq!(SerialFormat::FORMAT_9E1.bits(), 0x8E);
        assert_eq!(SerialFormat::FORMAT_9O1.bits(), 0x8F);
        assert_eq!(SerialFormat::HALF_DUPLEX.bits(), 0x200);
    }

    #[test]
    fn test_config_conversion() {
        let config = SerialConfig {
            baud_rate: 9600,
            data_bits: DataBits::Nine,
            parity: Parity::Odd,
            stop_bits: StopBits::One,
        };
        assert_eq!(SerialFormat::try_from(config), Ok(SerialFormat::FORMAT_9O1));

        let config = SerialConfig {
            stop_bits: StopBits::Two,
            ..SerialConfig::new_8n1(9600)
        };
        assert_eq!(SerialFormat::try_from(config), Ok(SerialFormat::FORMAT_8N2));

        let config = SerialConfig {
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            ..SerialConfig::new_8n1(9600)
        };
        assert_eq!(
            SerialFormat::try_from(config),
            Ok(SerialFormat::FORMAT_8E1 | SerialFormat::TWO_STOP_BITS)
        );
    }

    #[test]
    fn test_seven_bits_need_parity() {
        let config = SerialConfig {
            data_bits: DataBits::Seven,
            ..SerialConfig::default()
        };
        assert_eq!(
            SerialFormat::try_from(config),
            Err(SerialError::UnsupportedFormat)
        );
    }

    #[test]
    fn test_frame_strips_line_options() {
        let format = SerialFormat::FORMAT_8N2 | SerialFormat::HALF_DUPLEX | SerialFormat::RX_INVERT;
        assert_eq!(format.frame(), SerialFormat::FORMAT_8N2);
    }
}
