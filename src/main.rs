//! Gateway binary: wires configuration, the MQTT transport, the radio link
//! watcher and the session driver together.

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fm100_gateway::config::GatewayConfig;
use fm100_gateway::mqtt::{DeviceId, MqttTransport, TelemetryPublisher};
use fm100_gateway::session::SessionDriver;
use fm100_gateway::{LinkManager, Result};

#[derive(Debug, Parser)]
#[command(name = "fm100-gateway", about = "BLE to MQTT gateway for the FM100 thermometer")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "fm100-gateway.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = GatewayConfig::load(&args.config)?;
    let address = config.peripheral_address()?;
    let device_id = DeviceId::from_mac(&config.device.mac);

    info!("Bridging {} as {}", address, device_id);

    let (transport, _mqtt_loop) = MqttTransport::connect(&config.mqtt);
    let publisher = TelemetryPublisher::new(transport, device_id, config.mqtt.client_name.clone());

    let driver = SessionDriver::new(publisher, config.device.name.clone());

    let (events_tx, events_rx) = mpsc::channel(8);
    let link = LinkManager::new(address).await?;

    let session_task = tokio::spawn(driver.run(events_rx));
    link.run(events_tx).await?;
    let _ = session_task.await;

    Ok(())
}
