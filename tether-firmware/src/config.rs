//! Host link configuration

use embassy_rp::uart::Config as UartConfig;

/// UART transmit ring size
pub const TX_BUFFER_SIZE: usize = 256;

/// UART receive ring size
pub const RX_BUFFER_SIZE: usize = 256;

/// Serial settings for the host link
///
/// Ring sizes are fixed at compile time by [`TX_BUFFER_SIZE`] and
/// [`RX_BUFFER_SIZE`] since they back static buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Baud rate
    pub baud_rate: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { baud_rate: 115_200 }
    }
}

impl LinkConfig {
    /// UART settings: 8 data bits, no parity, one stop bit
    pub fn uart_config(&self) -> UartConfig {
        let mut config = UartConfig::default();
        config.baudrate = self.baud_rate;
        config
    }
}
