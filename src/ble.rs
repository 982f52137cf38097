//! btleplug backed [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central as _, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::TransportError;
use crate::transport::{DeviceAdvertisement, Link, RemoteService, Transport, bounded_or_cleanup};

const LOOKUP_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct BleTransport {
    adapter: Adapter,
    scan_duration: Duration,
}

impl BleTransport {
    /// Opens the adapter at `index` in the platform's adapter list.
    pub async fn new(index: usize, scan_duration: Duration) -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .nth(index)
            .ok_or(TransportError::NoAdapter)?;
        if let Ok(info) = adapter.adapter_info().await {
            debug!("Using adapter {}", info);
        }
        Ok(BleTransport {
            adapter,
            scan_duration,
        })
    }

    async fn cached(&self, address: BDAddr) -> Result<Option<Peripheral>, TransportError> {
        Ok(self
            .adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.address() == address))
    }

    async fn unseen(&self, targets: &[BDAddr]) -> Result<Vec<BDAddr>, TransportError> {
        let known: Vec<BDAddr> = self
            .adapter
            .peripherals()
            .await?
            .iter()
            .map(|p| p.address())
            .collect();
        Ok(unseen(targets, &known))
    }
}

fn parse_targets(addresses: &[String]) -> Vec<BDAddr> {
    addresses
        .iter()
        .filter_map(|address| match address.parse::<BDAddr>() {
            Ok(bd_addr) => Some(bd_addr),
            Err(_) => {
                debug!("Not scanning for unparsable address {}", address);
                None
            }
        })
        .collect()
}

fn unseen(targets: &[BDAddr], known: &[BDAddr]) -> Vec<BDAddr> {
    targets
        .iter()
        .filter(|target| !known.contains(target))
        .copied()
        .collect()
}

#[async_trait]
impl Transport for BleTransport {
    type Link = BleLink;

    async fn scan(&self) -> Result<Vec<DeviceAdvertisement>, TransportError> {
        info!("Scanning for {} seconds", self.scan_duration.as_secs());
        self.adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(self.scan_duration).await;
        self.adapter.stop_scan().await?;

        let mut advertisements = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            match peripheral.properties().await {
                Ok(Some(properties)) => advertisements.push(DeviceAdvertisement {
                    address: properties.address.to_string(),
                    name: properties.local_name,
                }),
                Ok(None) => {}
                Err(err) => debug!("Skipping peripheral {}: {}", peripheral.address(), err),
            }
        }
        Ok(advertisements)
    }

    /// Scans once until every target has been seen or `timeout` passes.
    /// Targets still missing afterwards fail on their own in `connect`.
    async fn prepare(&self, addresses: &[String], timeout: Duration) -> Result<(), TransportError> {
        let targets = parse_targets(addresses);
        if self.unseen(&targets).await?.is_empty() {
            return Ok(());
        }

        debug!("Scanning for {} target(s)", targets.len());
        self.adapter.start_scan(ScanFilter::default()).await?;
        let found = tokio::time::timeout(timeout, async {
            loop {
                if self.unseen(&targets).await?.is_empty() {
                    return Ok::<_, TransportError>(());
                }
                tokio::time::sleep(LOOKUP_POLL_INTERVAL).await;
            }
        })
        .await;
        if let Err(err) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", err);
        }

        match found {
            Ok(result) => result,
            Err(_) => {
                for missing in self.unseen(&targets).await.unwrap_or_default() {
                    warn!("{} not seen within {:?}", missing, timeout);
                }
                Ok(())
            }
        }
    }

    async fn connect(&self, address: &str, timeout: Duration) -> Result<BleLink, TransportError> {
        let bd_addr: BDAddr = address
            .parse()
            .map_err(|_| TransportError::InvalidAddress(address.to_string()))?;
        let peripheral = self
            .cached(bd_addr)
            .await?
            .ok_or_else(|| TransportError::NotFound(address.to_string()))?;

        debug!("Connecting to {}", address);
        let handle = &peripheral;
        bounded_or_cleanup(
            timeout,
            async {
                handle.connect().await?;
                handle.discover_services().await?;
                Ok::<_, TransportError>(())
            },
            move || async move {
                if let Err(err) = handle.disconnect().await {
                    warn!("Failed to disconnect from {}: {}", address, err);
                }
            },
        )
        .await?;
        Ok(BleLink { peripheral })
    }
}

pub struct BleLink {
    peripheral: Peripheral,
}

impl BleLink {
    fn characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Characteristic, TransportError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or(TransportError::MissingCharacteristic {
                service,
                characteristic,
            })
    }
}

#[async_trait]
impl Link for BleLink {
    async fn services(&self) -> Result<Vec<RemoteService>, TransportError> {
        if !self.peripheral.is_connected().await? {
            return Err(TransportError::Disconnected);
        }
        Ok(self
            .peripheral
            .services()
            .into_iter()
            .map(|service| RemoteService {
                uuid: service.uuid,
                characteristics: service.characteristics.iter().map(|c| c.uuid).collect(),
            })
            .collect())
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, TransportError> {
        let characteristic = self.characteristic(service, characteristic)?;
        Ok(self.peripheral.read(&characteristic).await?)
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), TransportError> {
        let characteristic = self.characteristic(service, characteristic)?;
        self.peripheral
            .write(&characteristic, value, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
