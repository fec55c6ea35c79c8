//! Tether firmware
//!
//! Runs the tether message engine on an RP2040, talking to the host over
//! UART0 (GPIO0 TX, GPIO1 RX). The engine is polled from a single task
//! that yields between iterations, so other tasks can share the core.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUart, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use tether_core::Server;

use crate::app::Demo;
use crate::clock::EmbassyClock;
use crate::config::{LinkConfig, RX_BUFFER_SIZE, TX_BUFFER_SIZE};
use crate::stream::SerialStream;

mod app;
mod clock;
mod config;
mod stream;

/// Host link as seen by the engine
type HostStream = SerialStream<BufferedUart>;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; TX_BUFFER_SIZE]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; RX_BUFFER_SIZE]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Tether firmware starting...");

    let p = embassy_rp::init(Default::default());

    let link = LinkConfig::default();
    info!("Host link: {}", link);

    let tx_buf = TX_BUF.init([0u8; TX_BUFFER_SIZE]);
    let rx_buf = RX_BUF.init([0u8; RX_BUFFER_SIZE]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, link.uart_config());
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);

    spawner.spawn(server_task(uart)).unwrap();

    info!("Server task spawned, firmware running");
}

/// Engine loop: one poll per executor turn
#[embassy_executor::task]
async fn server_task(uart: BufferedUart) {
    let mut server: Server<_, _, _> =
        Server::new(HostStream::new(uart), EmbassyClock, Demo::new());

    loop {
        server.poll();
        embassy_futures::yield_now().await;
    }
}
