//! The `discover` command.

use std::time::Duration;

use raumfeld_api::PropertyChange;
use raumfeld_stream::{
    NotificationListener, StreamConfig, SubscriptionManager, UpnpSubscriber,
};
use tokio::sync::mpsc;

use crate::bridge::DeviceSource;
use crate::config::DiscoverArgs;
use crate::error::Result;

/// Which kinds of change have been seen so far
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventTally {
    pub volume: bool,
    pub mute: bool,
    pub power: bool,
}

impl EventTally {
    /// Record `change`; true if it is the first of its kind
    pub fn record(&mut self, change: &PropertyChange) -> bool {
        let seen = match change {
            PropertyChange::VolumeChanged { .. } => &mut self.volume,
            PropertyChange::MuteChanged { .. } => &mut self.mute,
            PropertyChange::PowerStateChanged { .. } => &mut self.power,
        };
        !std::mem::replace(seen, true)
    }

    pub fn is_complete(&self) -> bool {
        self.volume && self.mute && self.power
    }
}

/// List the speakers, subscribe to them and print events until one of each
/// kind has arrived or `args.wait` seconds have passed.
pub async fn run(args: DiscoverArgs) -> Result<EventTally> {
    let devices = DeviceSource::Discover {
        timeout: Duration::from_secs(args.timeout),
    }
    .load()
    .await?;

    if devices.is_empty() {
        println!("No Raumfeld speakers found.");
        return Ok(EventTally::default());
    }

    println!("Found {} speaker(s):", devices.len());
    for device in &devices {
        println!("  {} ({})", device.name, device.id);
        println!("    location:   {}", device.location);
        println!("    local addr: {}", device.local_addr);
    }

    let config = StreamConfig {
        callback_port_range: (args.port_start, args.port_end),
        ..StreamConfig::default()
    };
    let (tx, mut events) = mpsc::unbounded_channel();
    let listener = NotificationListener::start(config.callback_port_range, tx).await?;
    let manager = SubscriptionManager::for_listener(UpnpSubscriber::default(), &listener, config);

    let report = manager.refresh(&devices).await;
    for failure in &report.failures {
        println!("  ! {}", failure);
    }
    println!(
        "\nWaiting up to {}s for volume, mute and power events...",
        args.wait
    );

    let mut tally = EventTally::default();
    let deadline = tokio::time::sleep(Duration::from_secs(args.wait));
    tokio::pin!(deadline);

    while !tally.is_complete() {
        tokio::select! {
            _ = &mut deadline => {
                println!("Timed out.");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                tally.record(&event.change);
                println!("  {}: {:?}", event.speaker_id, event.change);
            }
        }
    }

    listener.shutdown().await;
    Ok(tally)
}
