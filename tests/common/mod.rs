//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use patchbay::device::Device;
use patchbay::persistence::{MemoryDao, Persistence};
use patchbay::{
    Bank, BankChange, ComponentData, Config, CurrentSelection, NotificationBus, Observer, Param,
    Patch, PatchChange, PatchId, PatchbayError, Result, Session,
};

/// What a [`RecordingDevice`] has been asked to do
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub loads: Vec<PatchId>,
    pub params: Vec<Param>,
    pub fail: bool,
}

/// Device that records loads and can be told to refuse them
#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    pub log: Arc<Mutex<DeviceLog>>,
}

impl Device for RecordingDevice {
    fn load(&mut self, patch: &Patch) -> Result<()> {
        let mut log = self.log.lock();
        if log.fail {
            return Err(PatchbayError::DeviceLoad {
                patch: patch.name.clone(),
                reason: "device offline".to_string(),
            });
        }
        log.loads.push(patch.id());
        Ok(())
    }

    fn set_param(&mut self, param: &Param) -> Result<()> {
        self.log.lock().params.push(param.clone());
        Ok(())
    }
}

/// Shared view of a [`FlakyDao`]
#[derive(Debug, Default)]
pub struct DaoState {
    pub inner: MemoryDao,
    pub writes: usize,
    pub fail_writes: bool,
}

/// In-memory DAO that counts writes and can be told to fail them
#[derive(Debug, Clone, Default)]
pub struct FlakyDao {
    pub state: Arc<Mutex<DaoState>>,
}

impl FlakyDao {
    pub fn with(inner: MemoryDao) -> Self {
        Self {
            state: Arc::new(Mutex::new(DaoState {
                inner,
                ..DaoState::default()
            })),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut MemoryDao) -> Result<R>) -> Result<R> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(PatchbayError::Persistence {
                reason: "disk full".to_string(),
                path: None,
                source: None,
            });
        }
        state.writes += 1;
        f(&mut state.inner)
    }
}

impl Persistence for FlakyDao {
    fn load_all(&self) -> Result<Vec<Bank>> {
        self.state.lock().inner.load_all()
    }

    fn save_bank(&mut self, bank: &Bank, position: usize) -> Result<()> {
        self.write(|dao| dao.save_bank(bank, position))
    }

    fn delete_bank(&mut self, bank: &Bank) -> Result<()> {
        self.write(|dao| dao.delete_bank(bank))
    }

    fn load_current(&self) -> Result<Option<CurrentSelection>> {
        self.state.lock().inner.load_current()
    }

    fn save_current(&mut self, selection: &CurrentSelection) -> Result<()> {
        self.write(|dao| dao.save_current(selection))
    }

    fn load_component_data(&self, key: &str) -> Result<Option<ComponentData>> {
        self.state.lock().inner.load_component_data(key)
    }

    fn save_component_data(&mut self, key: &str, data: &ComponentData) -> Result<()> {
        self.write(|dao| dao.save_component_data(key, data))
    }

    fn delete_component_data(&mut self, key: &str) -> Result<()> {
        self.write(|dao| dao.delete_component_data(key))
    }
}

/// Observer that writes every callback it receives as one line
#[derive(Debug, Default)]
pub struct Recorder {
    pub token: Option<String>,
    pub events: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_token(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token.to_string()),
            ..Self::default()
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Observer for Recorder {
    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn on_bank_update(&self, change: &BankChange, _token: Option<&str>) {
        self.events
            .lock()
            .push(format!("bank {} {} @{}", change.update, change.bank.name, change.index));
    }

    fn on_patch_update(&self, change: &PatchChange, _token: Option<&str>) {
        self.events
            .lock()
            .push(format!("patch {} {} @{}", change.update, change.patch.name, change.index));
    }

    fn on_current_change(&self, patch: &Patch, _token: Option<&str>) {
        self.events.lock().push(format!("current {}", patch.name));
    }

    fn on_param_value_change(&self, param: &Param, _token: Option<&str>) {
        self.events
            .lock()
            .push(format!("param {} = {}", param.path, param.value));
    }
}

/// Observer that reads the session from inside its callbacks
#[derive(Default)]
pub struct Inspector {
    pub session: Mutex<Weak<Session>>,
    pub seen_current: Mutex<Vec<String>>,
}

impl Observer for Inspector {
    fn on_bank_update(&self, _change: &BankChange, _token: Option<&str>) {
        if let Some(session) = self.session.lock().upgrade() {
            if let Ok(bank) = session.current().bank() {
                self.seen_current.lock().push(bank.name);
            }
        }
    }
}

/// Bank named `name` with patches `<name>0`, `<name>1`, ...
pub fn bank(name: &str, patches: usize) -> Bank {
    let mut bank = Bank::new(name);
    for i in 0..patches {
        bank.append(Patch::new(format!("{}{}", name, i)))
            .expect("fresh patch ids are unique");
    }
    bank
}

/// Everything a test needs to poke at a running session
pub struct Harness {
    pub session: Arc<Session>,
    pub device: RecordingDevice,
    pub dao: FlakyDao,
    pub recorder: Arc<Recorder>,
}

impl Harness {
    pub fn open(banks: Vec<Bank>, selection: CurrentSelection) -> Self {
        let device = RecordingDevice::default();
        let dao = FlakyDao::with(MemoryDao::with_banks(banks).with_current(selection));
        let bus = Arc::new(NotificationBus::new());
        let recorder = Recorder::new();
        bus.register(recorder.clone());

        let session = Session::open(
            &Config::default(),
            Box::new(device.clone()),
            Box::new(dao.clone()),
            bus,
        )
        .expect("session opens");

        Self {
            session: Arc::new(session),
            device,
            dao,
            recorder,
        }
    }

    pub fn bank_names(&self) -> Vec<String> {
        self.session
            .snapshot()
            .into_iter()
            .map(|bank| bank.name)
            .collect()
    }

    pub fn current_names(&self) -> (String, String) {
        let current = self.session.current();
        (
            current.bank().expect("current bank").name,
            current.patch().expect("current patch").name,
        )
    }

    pub fn writes(&self) -> usize {
        self.dao.state.lock().writes
    }
}
