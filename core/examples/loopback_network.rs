// Loopback network example
//
// Builds a small network over in-process links, with one receiver drained by a
// background polling thread, and prints the topology.
//
//   cargo run -p comms-core --example loopback_network

use comms_core::{
    loopback, Channel, CommsError, Network, PollingConfig, Receiver, Result, ThreadedReceiver,
    Transmitter,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn main() -> Result<()> {
    comms_core::telemetry::init_tracing()?;

    // Telemetry: a slow sensor feed polled in the background, fanned in with a command echo
    let (sensor_tx, sensor_rx) = loopback("sensor.feed", "sensor.in");
    let sensor_rx = sensor_rx.with_wait(Duration::from_millis(20));
    let polled = Arc::new(ThreadedReceiver::new(
        sensor_rx,
        PollingConfig::from_env()
            .with_poll_interval(Duration::from_millis(5))
            .with_capacity(64),
    )?);

    let (cmd_tx, cmd_rx) = loopback("cmd.out", "cmd.echo");
    let polled_link: Arc<dyn Receiver> = polled.clone();
    let echo_link: Arc<dyn Receiver> = Arc::new(cmd_rx);
    let cmd_link: Arc<dyn Transmitter> = Arc::new(cmd_tx);

    let network = Network::builder("demo")
        .channel(
            "telemetry",
            Channel::fan_in(vec![polled_link, echo_link], cmd_link)?,
        )
        .build()?;

    let telemetry = network
        .channel("telemetry")
        .ok_or_else(|| CommsError::Config("telemetry channel missing".into()))?;

    for i in 0..3 {
        sensor_tx.send(format!("reading {}", i).as_bytes())?;
    }
    telemetry.send_to(b"calibrate", "cmd.out")?;
    std::thread::sleep(Duration::from_millis(100));

    for (address, message) in telemetry.receive() {
        match message? {
            Some(bytes) => info!(address = %address, message = %String::from_utf8_lossy(&bytes), "Received"),
            None => info!(address = %address, "Nothing pending"),
        }
    }
    while let Some(bytes) = telemetry.receive_from("sensor.in")? {
        info!(message = %String::from_utf8_lossy(&bytes), "Drained sensor backlog");
    }

    info!(stats = ?polled.stats(), "Polling stats");
    println!("{}", network.topology().to_json()?);

    network.close()?;
    Ok(())
}
