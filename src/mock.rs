//! Simulated transport with scripted peripherals for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TransportError;
use crate::protocol::{POWER_CHARACTERISTIC, POWER_SERVICE};
use crate::transport::{DeviceAdvertisement, Link, RemoteService, Transport};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Scan,
    Prepare(Vec<String>),
    Connect(String),
    Services(String),
    Read(String),
    Write(String, Vec<u8>),
    Disconnect(String),
}

#[derive(Clone, Debug)]
pub struct MockPeripheral {
    services: Vec<RemoteService>,
    value: Arc<Mutex<Vec<u8>>>,
    connect_latency: Duration,
    read_latency: Duration,
    fail_read: bool,
}

impl MockPeripheral {
    /// A genuine base station currently reporting `value`.
    pub fn lighthouse(value: u8) -> Self {
        MockPeripheral {
            services: vec![RemoteService {
                uuid: POWER_SERVICE,
                characteristics: vec![POWER_CHARACTERISTIC],
            }],
            value: Arc::new(Mutex::new(vec![value])),
            connect_latency: Duration::ZERO,
            read_latency: Duration::ZERO,
            fail_read: false,
        }
    }

    pub fn with_services(services: Vec<RemoteService>) -> Self {
        MockPeripheral {
            services,
            ..Self::lighthouse(0x00)
        }
    }

    pub fn connect_latency(mut self, latency: Duration) -> Self {
        self.connect_latency = latency;
        self
    }

    /// Keeps the link busy for `latency` on every read.
    pub fn read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = latency;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_read = true;
        self
    }

    pub fn value(&self) -> Vec<u8> {
        self.value.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MockTransport {
    advertisements: Vec<DeviceAdvertisement>,
    peripherals: HashMap<String, MockPeripheral>,
    calls: Arc<Mutex<Vec<Call>>>,
    links: Arc<LinkCounter>,
}

/// Tracks how many links are open at once.
#[derive(Debug, Default)]
struct LinkCounter {
    open: AtomicUsize,
    peak: AtomicUsize,
}

impl LinkCounter {
    fn opened(&self) {
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(open, Ordering::SeqCst);
    }

    fn closed(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advertise(mut self, address: &str, name: Option<&str>) -> Self {
        self.advertisements.push(DeviceAdvertisement {
            address: address.to_string(),
            name: name.map(str::to_string),
        });
        self
    }

    pub fn peripheral(mut self, address: &str, peripheral: MockPeripheral) -> Self {
        self.peripherals.insert(address.to_string(), peripheral);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connected_to(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Connect(address) => Some(address),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Write(address, value) => Some((address, value)),
                _ => None,
            })
            .collect()
    }

    pub fn open_links(&self) -> usize {
        self.links.open.load(Ordering::SeqCst)
    }

    /// Highest number of links that were open at the same time.
    pub fn peak_links(&self) -> usize {
        self.links.peak.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Link = MockLink;

    async fn scan(&self) -> Result<Vec<DeviceAdvertisement>, TransportError> {
        self.record(Call::Scan);
        Ok(self.advertisements.clone())
    }

    async fn prepare(&self, addresses: &[String], _timeout: Duration) -> Result<(), TransportError> {
        self.record(Call::Prepare(addresses.to_vec()));
        Ok(())
    }

    async fn connect(&self, address: &str, timeout: Duration) -> Result<MockLink, TransportError> {
        self.record(Call::Connect(address.to_string()));
        let peripheral = self
            .peripherals
            .get(address)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(address.to_string()))?;
        if !peripheral.connect_latency.is_zero() {
            tokio::time::timeout(timeout, tokio::time::sleep(peripheral.connect_latency))
                .await
                .map_err(|_| TransportError::Timeout(timeout))?;
        }
        self.links.opened();
        Ok(MockLink {
            address: address.to_string(),
            peripheral,
            calls: Arc::clone(&self.calls),
            links: Arc::clone(&self.links),
        })
    }
}

pub struct MockLink {
    address: String,
    peripheral: MockPeripheral,
    calls: Arc<Mutex<Vec<Call>>>,
    links: Arc<LinkCounter>,
}

impl MockLink {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, service: Uuid, characteristic: Uuid) -> Result<(), TransportError> {
        let present = self
            .peripheral
            .services
            .iter()
            .any(|s| s.uuid == service && s.characteristics.contains(&characteristic));
        if present {
            Ok(())
        } else {
            Err(TransportError::MissingCharacteristic {
                service,
                characteristic,
            })
        }
    }
}

#[async_trait]
impl Link for MockLink {
    async fn services(&self) -> Result<Vec<RemoteService>, TransportError> {
        self.record(Call::Services(self.address.clone()));
        Ok(self.peripheral.services.clone())
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, TransportError> {
        self.record(Call::Read(self.address.clone()));
        self.check(service, characteristic)?;
        if !self.peripheral.read_latency.is_zero() {
            tokio::time::sleep(self.peripheral.read_latency).await;
        }
        if self.peripheral.fail_read {
            return Err(TransportError::Disconnected);
        }
        Ok(self.peripheral.value())
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), TransportError> {
        self.record(Call::Write(self.address.clone(), value.to_vec()));
        self.check(service, characteristic)?;
        *self.peripheral.value.lock().unwrap() = value.to_vec();
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.record(Call::Disconnect(self.address.clone()));
        self.links.closed();
        Ok(())
    }
}
