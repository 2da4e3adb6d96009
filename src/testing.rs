// In-crate fakes for the external collaborators, shared by the unit tests

use crate::audio::{AudioBackend, PreviewHandle, StatusSender};
use crate::deck::Rank;
use crate::error::{AudioError, AudioResult, ServiceError, ServiceResult};
use crate::export::{CollectionApi, Profile};
use crate::ranking::RankingService;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

#[derive(Default)]
struct AudioState {
    log: Vec<String>,
    live: usize,
    max_live: usize,
    failing: HashSet<String>,
    fail_play: bool,
    senders: Vec<StatusSender>,
}

/// Records every backend call in order and counts live handles
#[derive(Clone, Default)]
pub struct FakeAudioBackend {
    state: Arc<Mutex<AudioState>>,
}

impl FakeAudioBackend {
    pub fn fail_on(&self, reference: &str) {
        self.state.lock().unwrap().failing.insert(reference.to_string());
    }

    pub fn fail_play(&self, fail: bool) {
        self.state.lock().unwrap().fail_play = fail;
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }

    pub fn last_sender(&self) -> Option<StatusSender> {
        self.state.lock().unwrap().senders.last().cloned()
    }
}

impl FakeAudioBackend {
    fn open(&self, reference: &str, status: StatusSender) -> AudioResult<Box<dyn PreviewHandle>> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("load:{}", reference));

        if state.failing.contains(reference) {
            return Err(AudioError::Fetch {
                reference: reference.to_string(),
                reason: "404".to_string(),
            });
        }

        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        state.senders.push(status);

        Ok(Box::new(FakeHandle {
            reference: reference.to_string(),
            state: self.state.clone(),
            loaded: true,
        }))
    }
}

#[async_trait]
impl AudioBackend for FakeAudioBackend {
    async fn load(&self, reference: &str, status: StatusSender) -> AudioResult<Box<dyn PreviewHandle>> {
        self.open(reference, status)
    }
}

struct FakeHandle {
    reference: String,
    state: Arc<Mutex<AudioState>>,
    loaded: bool,
}

impl FakeHandle {
    fn record(&self, op: &str) {
        self.state.lock().unwrap().log.push(format!("{}:{}", op, self.reference));
    }
}

#[async_trait]
impl PreviewHandle for FakeHandle {
    async fn play(&mut self) -> AudioResult<()> {
        self.record("play");
        if self.state.lock().unwrap().fail_play {
            return Err(AudioError::Output("device busy".to_string()));
        }
        Ok(())
    }

    async fn pause(&mut self) -> AudioResult<()> {
        self.record("pause");
        Ok(())
    }

    async fn stop(&mut self) -> AudioResult<()> {
        self.record("stop");
        Ok(())
    }

    async fn unload(&mut self) {
        if self.loaded {
            self.loaded = false;
            self.record("unload");
            self.state.lock().unwrap().live -= 1;
        }
    }
}

/// Ranking service that remembers every submission. Calls can be held back
/// with `hold()` until `release_all()` to simulate a slow network.
#[derive(Clone)]
pub struct RecordingRankingService {
    calls: Arc<Mutex<Vec<(String, u8, Option<String>)>>>,
    gate: Arc<Semaphore>,
    gated: Arc<Mutex<bool>>,
    fail: Arc<Mutex<bool>>,
}

impl Default for RecordingRankingService {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            gate: Arc::new(Semaphore::new(0)),
            gated: Arc::default(),
            fail: Arc::default(),
        }
    }
}

impl RecordingRankingService {
    pub fn calls(&self) -> Vec<(String, u8, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn hold(&self) {
        *self.gated.lock().unwrap() = true;
    }

    pub fn release_all(&self) {
        self.gate.add_permits(1024);
    }

    pub fn fail(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait]
impl RankingService for RecordingRankingService {
    async fn submit_rank(&self, item_id: &str, rank: Rank, user_id: Option<&str>) -> ServiceResult<()> {
        let gated = *self.gated.lock().unwrap();
        if gated {
            let _permit = self.gate.acquire().await.unwrap();
        }

        self.calls
            .lock()
            .unwrap()
            .push((item_id.to_string(), rank.get(), user_id.map(str::to_string)));

        if *self.fail.lock().unwrap() {
            return Err(ServiceError::Status {
                endpoint: format!("/rankings/{}/{}", item_id, rank),
                status: 500,
            });
        }
        Ok(())
    }
}

/// Which collection API step should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Profile,
    Create,
    AddEntries,
}

#[derive(Clone, Default)]
pub struct FakeCollectionApi {
    calls: Arc<Mutex<Vec<String>>>,
    entries: Arc<Mutex<Vec<Vec<String>>>>,
    fail_at: Arc<Mutex<Option<FailAt>>>,
}

impl FakeCollectionApi {
    pub fn fail_at(&self, step: FailAt) {
        *self.fail_at.lock().unwrap() = Some(step);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<Vec<String>> {
        self.entries.lock().unwrap().clone()
    }

    fn check(&self, step: FailAt) -> ServiceResult<()> {
        if *self.fail_at.lock().unwrap() == Some(step) {
            return Err(ServiceError::Request(format!("{:?} failed", step)));
        }
        Ok(())
    }
}

#[async_trait]
impl CollectionApi for FakeCollectionApi {
    async fn get_profile(&self) -> ServiceResult<Profile> {
        self.calls.lock().unwrap().push("profile".to_string());
        self.check(FailAt::Profile)?;
        Ok(Profile {
            id: "user-1".to_string(),
            display_name: None,
        })
    }

    async fn create_collection(
        &self,
        owner_id: &str,
        name: &str,
        _description: &str,
        public: bool,
    ) -> ServiceResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create:{}:{}:{}", owner_id, name, public));
        self.check(FailAt::Create)?;
        Ok("playlist-1".to_string())
    }

    async fn add_entries(&self, collection_id: &str, uris: &[String]) -> ServiceResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("add:{}:{}", collection_id, uris.len()));
        self.check(FailAt::AddEntries)?;
        self.entries.lock().unwrap().push(uris.to_vec());
        Ok(())
    }
}
