//! User facing output, either the classic `>>` prefixed lines or JSON lines.

use serde_derive::Serialize;

use crate::discovery::DiscoveryEvent;
use crate::dispatch::{DispatchResult, Outcome};
use crate::protocol::Command;
use crate::qualify::{Qualification, QualifiedDevice};

#[derive(Debug, Serialize)]
struct QualificationMessage<'a> {
    address: &'a str,
    qualified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct DispatchMessage<'a> {
    address: &'a str,
    command: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Reporter {
    json: bool,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Reporter { json }
    }

    pub fn discovery_start(&self, create_shortcuts: bool) {
        if self.json {
            return;
        }
        println!(">> MODE: discover suitable LightHouse V2");
        if create_shortcuts {
            println!("         and create desktop shortcuts");
        }
        println!();
        println!(">> Discovering BLE devices...");
    }

    pub fn discovery_event(&self, event: DiscoveryEvent<'_>) {
        match event {
            DiscoveryEvent::Candidate(advertisement) if !self.json => println!(
                ">> Found potential Valve LightHouse at '{}' with name '{}'...",
                advertisement.address,
                advertisement.name.as_deref().unwrap_or_default()
            ),
            DiscoveryEvent::Candidate(_) => {}
            DiscoveryEvent::Outcome(outcome) if self.json => {
                println!("{}", to_json(&qualification_message(outcome)));
            }
            DiscoveryEvent::Outcome(outcome) => {
                match outcome {
                    Qualification::Qualified(device) => {
                        println!("   OK: This seems to be a valid LightHouse V2.");
                        println!("   Device power state: {}", device.observed_state);
                    }
                    Qualification::NotQualified { reason, .. } => {
                        println!("   ERROR: {}.", capitalize(&reason.to_string()));
                    }
                    Qualification::ConnectionError { error, .. } => {
                        println!(">> ERROR: {}", error);
                    }
                }
                println!();
            }
        }
    }

    pub fn discovery_summary(&self, devices: &[QualifiedDevice]) {
        if self.json {
            return;
        }
        if devices.is_empty() {
            println!(">> Sorry, no suitable LightHouse V2 found.");
        } else {
            println!(">> OK: At least one compatible LightHouse V2 was found.");
            for device in devices {
                println!("   * {}", device.address);
            }
        }
        println!();
    }

    pub fn shortcuts(&self, created: &[std::path::PathBuf]) {
        if self.json {
            return;
        }
        for path in created {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            println!("   * OK: {} was created successfully.", name);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.json {
            println!(">> WARNING: {}", message);
        }
    }

    pub fn invalid_addresses(&self, invalid: &[String]) {
        if invalid.is_empty() || self.json {
            return;
        }
        println!("   * Invalid MAC address format: {}", invalid.join(", "));
    }

    pub fn dispatch_start(&self, command: Command, addresses: &[String]) {
        if self.json {
            return;
        }
        println!(">> MODE: switch LightHouse {}", command);
        for address in addresses {
            println!("   * {}", address);
        }
        println!();
    }

    pub fn dispatch_results(&self, command: Command, results: &[DispatchResult]) {
        for result in results {
            if self.json {
                println!("{}", to_json(&dispatch_message(command, result)));
                continue;
            }
            match &result.outcome {
                Outcome::Success { state } => {
                    println!("   {}: LightHouse is now {}.", result.address, state)
                }
                Outcome::Failure(error) => println!(">> ERROR: {}: {}", result.address, error),
            }
        }
    }
}

fn qualification_message(outcome: &Qualification) -> QualificationMessage<'_> {
    match outcome {
        Qualification::Qualified(device) => QualificationMessage {
            address: &device.address,
            qualified: true,
            state: Some(device.observed_state.as_str()),
            reason: None,
        },
        Qualification::NotQualified { address, reason } => QualificationMessage {
            address,
            qualified: false,
            state: None,
            reason: Some(reason.to_string()),
        },
        Qualification::ConnectionError { address, error } => QualificationMessage {
            address,
            qualified: false,
            state: None,
            reason: Some(error.to_string()),
        },
    }
}

fn dispatch_message(command: Command, result: &DispatchResult) -> DispatchMessage<'_> {
    let (ok, state, error) = match &result.outcome {
        Outcome::Success { state } => (true, Some(state.as_str()), None),
        Outcome::Failure(error) => (false, None, Some(error.to_string())),
    };
    DispatchMessage {
        address: &result.address,
        command: command.to_string().to_lowercase(),
        ok,
        state,
        error,
    }
}

fn to_json<T: serde::Serialize>(message: &T) -> String {
    serde_json::to_string(message).unwrap_or_else(|err| format!("{{\"error\":\"{err}\"}}"))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
