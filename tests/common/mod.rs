#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use assetfetch::{
    source::Source,
    transport::{Payload, Transport, TransportError},
    FetchOptions,
};
use async_trait::async_trait;

pub enum Scripted {
    Body(Vec<u8>),
    Typed(Vec<u8>, &'static str),
    Fail(TransportError),
    Hang,
}

/// Transport double answering from a fixed script and recording every locator it is asked for.
#[derive(Default)]
pub struct ScriptedTransport {
    script: HashMap<String, Scripted>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, locator: &str, response: Scripted) -> Self {
        self.script.insert(locator.to_string(), response);
        self
    }

    pub fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn retrieve(&self, source: &Source, _timeout: Duration) -> Result<Payload, TransportError> {
        self.calls.lock().unwrap().push(source.locator.clone());
        match self.script.get(&source.locator) {
            Some(Scripted::Body(bytes)) => Ok(Payload::new(bytes.clone())),
            Some(Scripted::Typed(bytes, ct)) => Ok(Payload { bytes: bytes.clone(), content_type: Some(ct.to_string()) }),
            Some(Scripted::Fail(err)) => Err(err.clone()),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Payload::default())
            }
            None => Err(TransportError::Network(format!("unscripted locator {}", source.locator))),
        }
    }
}

pub fn quick_options() -> FetchOptions {
    FetchOptions { timeout: Duration::from_secs(2), attempt_delay: Duration::ZERO, reuse_existing: true }
}

pub fn bytes(len: usize) -> Vec<u8> { vec![0xAB; len] }
