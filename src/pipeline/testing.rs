//! Test helpers shared by the pipeline test modules.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::HookError;
use crate::pipeline::hooks::Consume;

/// Consume hook that records every item it sees.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    items: Arc<Mutex<Vec<u32>>>,
}

impl Recorder {
    pub(crate) fn hook(&self) -> Recorder {
        self.clone()
    }

    pub(crate) fn items(&self) -> Vec<u32> {
        self.items.lock().unwrap().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[async_trait]
impl Consume<u32> for Recorder {
    async fn consume(&self, item: Arc<u32>) -> Result<(), HookError> {
        self.items.lock().unwrap().push(*item);
        Ok(())
    }
}

/// Polls `cond` until it holds; panics after a generous deadline.
pub(crate) async fn eventually(cond: impl Fn() -> bool) {
    let wait = async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("condition not reached within 5s");
}
